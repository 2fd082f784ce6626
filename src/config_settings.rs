// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Kibana configuration file management.
//!
//! A minimal `kibana.yml` is rendered per instance and stored in an
//! owner-referenced secret mounted at the Kibana configuration directory.
//! Connection settings (endpoint, credentials, TLS) stay in the pod
//! environment where the versioned strategy puts them; the file only carries
//! what has no environment equivalent. Its bytes are folded into the config
//! checksum, so an edit rolls the pods.

use anyhow::Result;
use k8s_openapi::api::core::v1::{
    PodTemplateSpec, Secret, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::{Client, ResourceExt};
use serde_yaml::{Mapping, Value};

use crate::constants::CONFIG_MOUNT_PATH;
use crate::crd::Kibana;
use crate::reconcilers::resources::reconcile_resource;

/// The Kibana configuration settings file.
pub const SETTINGS_FILENAME: &str = "kibana.yml";

/// Name of the volume projecting the configuration secret.
const CONFIG_VOLUME_NAME: &str = "kibana-config";

/// License management UI is operator-managed from 7.6.0 on.
fn license_ui_configurable() -> semver::Version {
    semver::Version::new(7, 6, 0)
}

/// Name of the secret holding the rendered configuration.
#[must_use]
pub fn config_secret_name(owner_name: &str) -> String {
    format!("{owner_name}-kb-config")
}

/// Render the `kibana.yml` contents for an instance.
///
/// # Errors
///
/// Returns an error if YAML serialization fails, which a well-formed
/// settings mapping never does.
pub fn render_settings(kb: &Kibana, version: &semver::Version) -> Result<String> {
    let mut settings = Mapping::new();
    settings.insert(
        Value::from("server.name"),
        Value::from(kb.name_any()),
    );
    // bind on all interfaces; the Service fronts the pods
    settings.insert(Value::from("server.host"), Value::from("0"));

    if *version >= license_ui_configurable() {
        // licensing is driven through the operator, hide the manual UI
        settings.insert(
            Value::from("xpack.license_management.ui.enabled"),
            Value::from(false),
        );
    }

    Ok(serde_yaml::to_string(&Value::Mapping(settings))?)
}

/// Reconcile the configuration secret and return its rendered contents,
/// which the caller folds into the config checksum.
///
/// # Errors
///
/// Returns an error if rendering or the secret write fails.
pub async fn reconcile_config_secret(
    client: &Client,
    kb: &Kibana,
    version: &semver::Version,
) -> Result<String> {
    let rendered = render_settings(kb, version)?;

    let expected = Secret {
        metadata: ObjectMeta {
            name: Some(config_secret_name(&kb.name_any())),
            namespace: kb.namespace(),
            labels: Some(crate::deployment::build_labels(&kb.name_any())),
            ..Default::default()
        },
        data: Some(
            [(
                SETTINGS_FILENAME.to_string(),
                ByteString(rendered.clone().into_bytes()),
            )]
            .into(),
        ),
        ..Default::default()
    };

    reconcile_resource(
        client,
        kb,
        expected,
        |expected, actual| expected.data != actual.data,
        |expected, actual| actual.data.clone_from(&expected.data),
    )
    .await?;

    Ok(rendered)
}

/// Mount the configuration secret at the Kibana config directory.
pub fn add_config_volume(template: &mut PodTemplateSpec, secret_name: &str) {
    let Some(spec) = template.spec.as_mut() else {
        return;
    };

    spec.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: CONFIG_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            optional: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    });

    for container in &mut spec.containers {
        container.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
            name: CONFIG_VOLUME_NAME.to_string(),
            mount_path: CONFIG_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }
}

#[cfg(test)]
#[path = "config_settings_tests.rs"]
mod config_settings_tests;
