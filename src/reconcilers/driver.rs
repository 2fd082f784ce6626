// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! The Kibana deployment driver.
//!
//! One pass of the driver composes the pod template from its versioned
//! strategy, folds every rollout-forcing input into the config checksum,
//! reconciles the Deployment and Service, and maintains the TLS material.
//! The order of API calls within one owner's reconcile is fixed: keystore,
//! CA material, config secret, Deployment, Service; the caller updates
//! status afterwards.

use std::time::Duration;

use anyhow::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cacerts;
use crate::checksum::ConfigChecksum;
use crate::constants::CA_FILE_NAME;
use crate::context::Context;
use crate::crd::Kibana;
use crate::deployment::{
    build_deployment, build_labels, build_service, deployment_needs_update, selector_labels,
    service_needs_update, update_deployment, update_service, DeploymentParams,
};
use crate::errors::parse_version;
use crate::events::{self, EventReason};
use crate::keystore;
use crate::labels::{AUTH_SECRET_WATCH, CA_CERT_WATCH, CONFIG_CHECKSUM_LABEL};
use crate::names::NamespacedName;
use crate::pod_template::{add_es_certs, add_http_certs, build_pod_template, PodTemplateParams};
use crate::reconcilers::resources::{is_not_found, reconcile_resource};
use crate::watches::{Handler, NamedWatch, WatchedKind};

/// Outcome of one driver pass.
pub struct DriverResults {
    /// The reconciled Deployment, absent when nothing was driven.
    pub deployment: Option<Deployment>,
    /// Delay until work becomes due again (CA rotation).
    pub requeue_after: Option<Duration>,
}

/// Registry name of the CA-cert watch for the given owner.
pub(crate) fn ca_watch_name(owner: &NamespacedName) -> String {
    format!("{}-{}-{CA_CERT_WATCH}", owner.namespace, owner.name)
}

/// Registry name of the auth-secret watch for the given owner.
pub(crate) fn auth_watch_name(owner: &NamespacedName) -> String {
    format!("{}-{}-{AUTH_SECRET_WATCH}", owner.namespace, owner.name)
}

/// Resolve the CA secret reference of the backend. A plain name points into
/// the owner's namespace; a `namespace/name` reference points at a remote
/// cluster's CA, which is mirrored locally before mounting.
fn resolve_ca_secret(kb: &Kibana) -> Option<NamespacedName> {
    let reference = kb.spec.elasticsearch.ca_cert_secret.as_deref()?;
    if reference.is_empty() {
        return None;
    }
    let owner_namespace = kb.namespace().unwrap_or_default();
    match reference.split_once('/') {
        Some((namespace, name)) => Some(NamespacedName::new(namespace, name)),
        None => Some(NamespacedName::new(owner_namespace, reference)),
    }
}

/// Fetch a secret, tolerating 404 with a warning event.
async fn get_secret_or_warn(
    ctx: &Context,
    kb: &Kibana,
    id: &NamespacedName,
    what: &str,
) -> Result<Option<Secret>> {
    let api: Api<Secret> = Api::namespaced(ctx.client.clone(), &id.namespace);
    match api.get(&id.name).await {
        Ok(secret) => Ok(Some(secret)),
        Err(e) if is_not_found(&e) => {
            events::warning(
                &ctx.recorder,
                kb,
                EventReason::Unexpected,
                format!("{what} secret not found: {id}"),
            )
            .await;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Drive the Deployment and Service of a managed instance towards its spec.
///
/// # Errors
///
/// Configuration errors ([`crate::errors::ConfigError`]) fail this iteration
/// without requeue; API errors surface to the scheduler's error policy.
pub async fn reconcile_deployment_driver(ctx: &Arc<Context>, kb: &Kibana) -> Result<DriverResults> {
    let owner = NamespacedName::from_obj(kb);

    // 1. nothing to drive without a configured backend
    if !kb.spec.elasticsearch.is_configured() {
        info!(owner = %owner, "No Elasticsearch backend configured, nothing to drive yet");
        return Ok(DriverResults {
            deployment: None,
            requeue_after: None,
        });
    }

    let version = parse_version(&kb.spec.version)?;
    let mut checksum = ConfigChecksum::new();

    // 2. keystore resources from the secure-settings reference;
    //    the secret revision rolls the pods on change
    let keystore_resources =
        keystore::reconcile_keystore(&ctx.client, &ctx.recorder, &ctx.watches, kb).await?;
    if let Some(resources) = &keystore_resources {
        checksum.write_str(&resources.version);
    }

    // 3. CA material: watch the referenced secret, mirror it locally when it
    //    lives in another namespace, fold its bytes into the checksum
    let mut mounted_ca_secret = None;
    if let Some(ca_ref) = resolve_ca_secret(kb) {
        ctx.watches.add_handler(
            WatchedKind::Secret,
            &ca_watch_name(&owner),
            Handler::Named(NamedWatch {
                watched: vec![ca_ref.clone()],
                watcher: owner.clone(),
            }),
        );

        let local_name = if ca_ref.namespace == owner.namespace {
            match get_secret_or_warn(ctx, kb, &ca_ref, "CA certificate").await? {
                Some(secret) => {
                    if let Some(ByteString(ca_pem)) =
                        secret.data.as_ref().and_then(|d| d.get(CA_FILE_NAME))
                    {
                        checksum.write(ca_pem);
                    }
                    Some(ca_ref.name.clone())
                }
                None => None,
            }
        } else {
            // remote cluster CA: maintain the namespace-local mirror
            match cacerts::reconcile_ca_mirror(&ctx.client, kb, &ca_ref).await? {
                Some(mirror) => {
                    if let Some(ByteString(ca_pem)) =
                        mirror.data.as_ref().and_then(|d| d.get(CA_FILE_NAME))
                    {
                        checksum.write(ca_pem);
                    }
                    mirror.metadata.name
                }
                None => None,
            }
        };
        mounted_ca_secret = local_name;
    } else {
        ctx.watches.remove_handler(WatchedKind::Secret, &ca_watch_name(&owner));
    }

    // 4. credentials by secret reference are not reloadable either
    let auth = kb.spec.elasticsearch.auth.as_ref();
    if let Some(secret_ref) = auth.and_then(|a| a.secret_key_ref.as_ref()) {
        let secret_id = NamespacedName::new(&owner.namespace, &secret_ref.name);
        ctx.watches.add_handler(
            WatchedKind::Secret,
            &auth_watch_name(&owner),
            Handler::Named(NamedWatch {
                watched: vec![secret_id.clone()],
                watcher: owner.clone(),
            }),
        );
        if let Some(secret) = get_secret_or_warn(ctx, kb, &secret_id, "Credentials").await? {
            if let Some(ByteString(password)) =
                secret.data.as_ref().and_then(|d| d.get(&secret_ref.key))
            {
                checksum.write(password);
            }
        }
    } else {
        ctx.watches.remove_handler(WatchedKind::Secret, &auth_watch_name(&owner));
        // inline credentials live in the pod template itself, no hashing needed
    }

    // 5. maintain the instance's own HTTP CA; rotation schedules a requeue
    let (_http_ca, next_rotation) =
        cacerts::reconcile_http_ca(&ctx.client, kb, ctx.parameters.ca_rotate_before).await?;

    // 6. render and reconcile the configuration secret; Kibana cannot reload
    //    it at runtime, so its bytes join the checksum
    let rendered_config =
        crate::config_settings::reconcile_config_secret(&ctx.client, kb, &version).await?;
    checksum.write(rendered_config.as_bytes());

    // 7. compose the pod template and stamp the checksum label
    let mut labels = build_labels(&kb.name_any());
    let digest = checksum.finish();
    labels.insert(CONFIG_CHECKSUM_LABEL.to_string(), digest.clone());
    debug!(owner = %owner, checksum = %digest, "Computed config checksum");

    let mut pod_template = build_pod_template(&PodTemplateParams {
        name: &kb.name_any(),
        version: &version,
        version_str: &kb.spec.version,
        custom_image: kb.spec.image.as_deref(),
        es_url: &kb.spec.elasticsearch.url,
        auth,
        keystore: keystore_resources.as_ref(),
        user_template: kb.spec.pod_template.as_ref(),
        labels,
    })?;
    if let Some(ca_secret) = &mounted_ca_secret {
        add_es_certs(&mut pod_template, ca_secret);
    }
    add_http_certs(
        &mut pod_template,
        &cacerts::http_ca_secret_name(&kb.name_any()),
    );
    crate::config_settings::add_config_volume(
        &mut pod_template,
        &crate::config_settings::config_secret_name(&kb.name_any()),
    );

    // 8. reconcile the Deployment; rollout is gated on the checksum label
    let expected = build_deployment(DeploymentParams {
        name: kb.deployment_name(),
        namespace: owner.namespace.clone(),
        replicas: kb.spec.node_count,
        labels: build_labels(&kb.name_any()),
        selector: selector_labels(&kb.name_any()),
        pod_template,
    });

    let deployments: Api<Deployment> = Api::namespaced(ctx.client.clone(), &owner.namespace);
    let preexisting = match deployments.get(&kb.deployment_name()).await {
        Ok(_) => true,
        Err(e) if is_not_found(&e) => false,
        Err(e) => return Err(e.into()),
    };
    if !preexisting {
        // pair the upcoming create with an expectation so the next reconcile
        // does not run against a stale cache
        ctx.expectations.expect_creations(&owner, 1);
    }
    let reconciled = match reconcile_resource(
        &ctx.client,
        kb,
        expected,
        deployment_needs_update,
        update_deployment,
    )
    .await
    {
        Ok(deployment) => {
            if !preexisting {
                events::normal(
                    &ctx.recorder,
                    kb,
                    EventReason::Created,
                    format!("Created deployment {}", kb.deployment_name()),
                )
                .await;
            }
            deployment
        }
        Err(e) => {
            if !preexisting {
                // the create never happened, cancel the expectation
                ctx.expectations.creation_observed(&owner);
            }
            return Err(e);
        }
    };

    // 9. reconcile the Service, preserving server-assigned fields
    reconcile_resource(
        &ctx.client,
        kb,
        build_service(kb),
        service_needs_update,
        update_service,
    )
    .await?;

    Ok(DriverResults {
        deployment: Some(reconciled),
        requeue_after: Some(next_rotation),
    })
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod driver_tests;
