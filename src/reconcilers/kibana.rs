// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! The Kibana reconcile scheduler.
//!
//! One invocation of [`reconcile_kibana`] runs the gates in a fixed order:
//! pause annotation, controller-version compatibility, finalizers, pending
//! expectations. Only then is the deployment driver allowed to touch the
//! cluster, and the status subresource is written last. Configuration
//! errors fail the iteration without a requeue: the resource is retried
//! only when the user edits the spec.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::FutureExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use serde_json::json;
use tracing::{debug, error, info};

use crate::annotations::{controller_version_allows, is_paused};
use crate::constants::{
    CONFLICT_REQUEUE_SECS, EXPECTATIONS_REQUEUE_SECS, PAUSE_REQUEUE_SECS,
};
use crate::context::Context;
use crate::crd::{Kibana, KibanaHealth, KibanaStatus};
use crate::errors::ConfigError;
use crate::es::cache::ClientCache;
use crate::events::{self, EventReason};
use crate::expectations::Expectations;
use crate::finalizers::{handle_finalizers, Finalizer};
use crate::keystore;
use crate::labels::{CONTROLLER_VERSION_ANNOTATION, ES_CLIENT_CACHE_FINALIZER};
use crate::names::NamespacedName;
use crate::reconcilers::driver::reconcile_deployment_driver;
use crate::reconcilers::resources::{is_conflict, patch_status};
use crate::watches::{WatchRegistry, WatchedKind};

/// Derive the status subresource from the reconciled Deployment.
#[must_use]
pub fn compute_status(deployment: &Deployment) -> KibanaStatus {
    let available_nodes = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);
    KibanaStatus {
        available_nodes,
        health: if available_nodes >= 1 {
            KibanaHealth::Green
        } else {
            KibanaHealth::Red
        },
    }
}

/// Finalizer dropping all in-memory state kept for an owner: cached
/// Elasticsearch client values, expectations, and the driver's secret
/// watches.
#[must_use]
pub fn es_cache_finalizer(
    cache: Arc<ClientCache>,
    expectations: Arc<Expectations>,
    watches: Arc<WatchRegistry>,
    owner: NamespacedName,
) -> Finalizer {
    Finalizer::new(ES_CLIENT_CACHE_FINALIZER, move || {
        let cache = Arc::clone(&cache);
        let expectations = Arc::clone(&expectations);
        let watches = Arc::clone(&watches);
        let owner = owner.clone();
        async move {
            cache.forget(&owner);
            expectations.forget(&owner);
            for name in [
                crate::reconcilers::driver::ca_watch_name(&owner),
                crate::reconcilers::driver::auth_watch_name(&owner),
            ] {
                watches.remove_handler(WatchedKind::Secret, &name);
            }
            Ok(())
        }
        .boxed()
    })
}

/// Record the running operator version on the resource so older builds step
/// aside. Skipped when the annotation already matches.
async fn stamp_controller_version(ctx: &Context, kb: &Kibana) -> Result<()> {
    let current = ctx.operator_version.to_string();
    let recorded = kb
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(CONTROLLER_VERSION_ANNOTATION));
    if recorded == Some(&current) {
        return Ok(());
    }

    let api: Api<Kibana> =
        Api::namespaced(ctx.client.clone(), &kb.namespace().unwrap_or_default());
    let patch = json!({ "metadata": { "annotations": { CONTROLLER_VERSION_ANNOTATION: current } } });
    api.patch(&kb.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Update the status subresource and emit health events.
async fn update_status(ctx: &Context, kb: &Kibana, deployment: &Deployment) -> Result<Action> {
    let new_status = compute_status(deployment);
    if kb.status.as_ref() == Some(&new_status) {
        return Ok(Action::await_change());
    }

    if new_status.is_degraded(kb.status.as_ref()) {
        events::warning(
            &ctx.recorder,
            kb,
            EventReason::Unhealthy,
            "Kibana health degraded".to_string(),
        )
        .await;
    } else if kb.status.as_ref().map(|s| s.health) != Some(new_status.health) {
        events::normal(
            &ctx.recorder,
            kb,
            EventReason::StateChange,
            format!("Kibana health is {:?}", new_status.health),
        )
        .await;
    }

    let namespace = kb.namespace().unwrap_or_default();
    match patch_status::<Kibana>(
        &ctx.client,
        &namespace,
        &kb.name_any(),
        serde_json::to_value(&new_status)?,
    )
    .await
    {
        Ok(()) => Ok(Action::await_change()),
        Err(e) if is_conflict(&e) => {
            debug!(owner = %kb.name_any(), "Status update conflict, requeueing");
            Ok(Action::requeue(Duration::from_secs(CONFLICT_REQUEUE_SECS)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Reconcile one Kibana resource.
///
/// # Errors
///
/// Returns an error for unexpected API failures; the caller's error policy
/// translates those into a delayed requeue.
pub async fn reconcile_kibana(kb: Arc<Kibana>, ctx: Arc<Context>) -> Result<Action> {
    let iteration = ctx.next_iteration();
    let start = Instant::now();
    let owner = NamespacedName::from_obj(kb.as_ref());
    info!(iteration, owner = %owner, "Start reconcile iteration");
    ctx.metrics.reconciliations_total.inc();

    let result = reconcile_inner(&kb, &ctx, &owner).await;

    ctx.metrics
        .reconciliation_duration
        .observe(start.elapsed().as_secs_f64());
    if result.is_err() {
        ctx.metrics.reconciliation_errors_total.inc();
    }
    info!(iteration, owner = %owner, took = ?start.elapsed(), "End reconcile iteration");
    result
}

async fn reconcile_inner(
    kb: &Arc<Kibana>,
    ctx: &Arc<Context>,
    owner: &NamespacedName,
) -> Result<Action> {
    // 1. pause gate
    if is_paused(&kb.metadata) {
        info!(owner = %owner, "Paused: skipping reconciliation");
        events::normal(
            &ctx.recorder,
            kb.as_ref(),
            EventReason::Delayed,
            "Reconciliation paused via annotation".to_string(),
        )
        .await;
        return Ok(Action::requeue(Duration::from_secs(PAUSE_REQUEUE_SECS)));
    }

    // 2. a newer operator owns this resource: skip without requeue
    if !controller_version_allows(&kb.metadata, &ctx.operator_version) {
        return Ok(Action::await_change());
    }
    stamp_controller_version(ctx, kb).await?;

    // 3. finalizers; stop here when the resource is going away
    let finalizers = vec![
        keystore::secure_settings_finalizer(Arc::clone(&ctx.watches), owner.clone()),
        es_cache_finalizer(
            Arc::clone(&ctx.es_client_cache),
            Arc::clone(&ctx.expectations),
            Arc::clone(&ctx.watches),
            owner.clone(),
        ),
    ];
    if handle_finalizers(&ctx.client, kb.as_ref(), &finalizers).await? {
        info!(owner = %owner, "Resource deleted, finalizers done");
        events::normal(
            &ctx.recorder,
            kb.as_ref(),
            EventReason::Deleted,
            "Released watches and cached state".to_string(),
        )
        .await;
        return Ok(Action::await_change());
    }

    // 4. short-circuit while expected events are still in flight
    if !ctx.expectations.satisfied(owner) {
        debug!(owner = %owner, "Expectations not satisfied yet, requeueing");
        return Ok(Action::requeue(Duration::from_secs(EXPECTATIONS_REQUEUE_SECS)));
    }

    // 5. drive the workload
    let results = match reconcile_deployment_driver(ctx, kb).await {
        Ok(results) => results,
        Err(e) if e.is::<ConfigError>() => {
            error!(owner = %owner, error = %e, "Invalid configuration, not requeueing");
            events::warning(
                &ctx.recorder,
                kb.as_ref(),
                EventReason::Unexpected,
                format!("Invalid configuration: {e}"),
            )
            .await;
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e),
    };

    // 6. status last; conflicts requeue once
    let action = match &results.deployment {
        Some(deployment) => update_status(ctx, kb, deployment).await?,
        None => Action::await_change(),
    };

    match results.requeue_after {
        Some(after) if !after.is_zero() => Ok(Action::requeue(after)),
        _ => Ok(action),
    }
}

#[cfg(test)]
#[path = "kibana_tests.rs"]
mod kibana_tests;
