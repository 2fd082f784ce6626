// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Versioned Kibana pod template composition.
//!
//! Pure functions from the declared spec to a `PodTemplateSpec`. The only
//! version-dependent part is how the Elasticsearch endpoint is handed to
//! Kibana: 6.x below 6.6 still uses the singular `ELASTICSEARCH_URL`
//! variable, everything newer uses `ELASTICSEARCH_HOSTS`. The user-provided
//! pod template fragment is merged in last so user intent always wins.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource, HTTPGetAction,
    PodSpec, PodTemplateSpec, Probe, SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::constants::{
    CA_FILE_NAME, DEFAULT_IMAGE_REPOSITORY, DEFAULT_MEMORY_LIMIT, ES_CERTS_MOUNT_PATH,
    KIBANA_CONTAINER_NAME, KIBANA_HTTP_PORT, PROBE_FAILURE_THRESHOLD, PROBE_INITIAL_DELAY_SECS,
    PROBE_PERIOD_SECS, PROBE_SUCCESS_THRESHOLD, PROBE_TIMEOUT_SECS,
};
use crate::crd::ElasticsearchAuth;
use crate::errors::ConfigError;
use crate::keystore::{KeystoreResources, DATA_VOLUME_NAME};

/// Name of the volume carrying the mirrored Elasticsearch CA certificates.
const ES_CERTS_VOLUME_NAME: &str = "elasticsearch-certs";

/// Name of the volume carrying the instance's own HTTP certificates.
const HTTP_CERTS_VOLUME_NAME: &str = "http-certs";

/// How the Elasticsearch endpoint is passed to a given Kibana version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvStrategy {
    /// `ELASTICSEARCH_URL`, used by 6.x below 6.6.
    Url,
    /// `ELASTICSEARCH_HOSTS`, used by 6.6+ and 7.x/8.x.
    Hosts,
}

impl EnvStrategy {
    /// Environment variable name carrying the Elasticsearch endpoint.
    #[must_use]
    pub fn env_name(self) -> &'static str {
        match self {
            EnvStrategy::Url => "ELASTICSEARCH_URL",
            EnvStrategy::Hosts => "ELASTICSEARCH_HOSTS",
        }
    }
}

/// Select the environment strategy for a parsed, supported version.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedVersion`] for majors outside {6, 7, 8}.
pub fn env_strategy(version: &semver::Version) -> Result<EnvStrategy, ConfigError> {
    match version.major {
        6 if version.minor < 6 => Ok(EnvStrategy::Url),
        6 | 7 | 8 => Ok(EnvStrategy::Hosts),
        _ => Err(ConfigError::UnsupportedVersion {
            version: version.to_string(),
        }),
    }
}

/// Resolve the container image: the custom image if set, otherwise the
/// default repository tagged with the declared version.
#[must_use]
pub fn image_name(custom_image: Option<&str>, version: &str) -> String {
    match custom_image {
        Some(image) if !image.is_empty() => image.to_string(),
        _ => format!("{DEFAULT_IMAGE_REPOSITORY}:{version}"),
    }
}

/// Inputs of the pod template composer.
pub struct PodTemplateParams<'a> {
    /// Name of the owning Kibana resource, used for labels.
    pub name: &'a str,
    /// Parsed, validated stack version.
    pub version: &'a semver::Version,
    /// Version string as declared (image tag).
    pub version_str: &'a str,
    /// Optional custom image.
    pub custom_image: Option<&'a str>,
    /// Elasticsearch endpoint URL.
    pub es_url: &'a str,
    /// Optional credentials for the backend.
    pub auth: Option<&'a ElasticsearchAuth>,
    /// Keystore resources, if secure settings are configured.
    pub keystore: Option<&'a KeystoreResources>,
    /// User-provided pod template fragment, merged last.
    pub user_template: Option<&'a PodTemplateSpec>,
    /// Labels applied to the pod template (also the deployment selector).
    pub labels: BTreeMap<String, String>,
}

fn default_probe() -> Probe {
    Probe {
        failure_threshold: Some(PROBE_FAILURE_THRESHOLD),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECS),
        period_seconds: Some(PROBE_PERIOD_SECS),
        success_threshold: Some(PROBE_SUCCESS_THRESHOLD),
        timeout_seconds: Some(PROBE_TIMEOUT_SECS),
        http_get: Some(HTTPGetAction {
            path: Some("/".to_string()),
            port: IntOrString::Int(KIBANA_HTTP_PORT),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn default_resources() -> k8s_openapi::api::core::v1::ResourceRequirements {
    let memory: BTreeMap<String, Quantity> =
        [("memory".to_string(), Quantity(DEFAULT_MEMORY_LIMIT.to_string()))].into();
    k8s_openapi::api::core::v1::ResourceRequirements {
        requests: Some(memory.clone()),
        limits: Some(memory),
        ..Default::default()
    }
}

/// Environment variables handing the backend endpoint and credentials to Kibana.
fn backend_env(
    strategy: EnvStrategy,
    es_url: &str,
    auth: Option<&ElasticsearchAuth>,
) -> Result<Vec<EnvVar>, ConfigError> {
    let mut env = vec![EnvVar {
        name: strategy.env_name().to_string(),
        value: Some(es_url.to_string()),
        ..Default::default()
    }];

    let Some(auth) = auth else {
        return Ok(env);
    };
    if !auth.is_well_formed() {
        return Err(ConfigError::AmbiguousAuth);
    }

    if let Some(inline) = &auth.inline {
        env.push(EnvVar {
            name: "ELASTICSEARCH_USERNAME".to_string(),
            value: Some(inline.username.clone()),
            ..Default::default()
        });
        env.push(EnvVar {
            name: "ELASTICSEARCH_PASSWORD".to_string(),
            value: Some(inline.password.clone()),
            ..Default::default()
        });
    } else if let Some(secret_ref) = &auth.secret_key_ref {
        // the key doubles as the user name; the password comes from the secret
        env.push(EnvVar {
            name: "ELASTICSEARCH_USERNAME".to_string(),
            value: Some(secret_ref.key.clone()),
            ..Default::default()
        });
        env.push(EnvVar {
            name: "ELASTICSEARCH_PASSWORD".to_string(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret_ref.name.clone(),
                    key: secret_ref.key.clone(),
                    optional: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    Ok(env)
}

/// Compose the pod template for a Kibana deployment.
///
/// # Errors
///
/// Returns a [`ConfigError`] for unsupported versions or ambiguous auth.
pub fn build_pod_template(params: &PodTemplateParams<'_>) -> Result<PodTemplateSpec, ConfigError> {
    let strategy = env_strategy(params.version)?;
    let image = image_name(params.custom_image, params.version_str);

    let mut volumes = vec![Volume {
        name: DATA_VOLUME_NAME.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }];
    let mut init_containers = Vec::new();

    if let Some(keystore) = params.keystore {
        volumes.push(keystore.volume.clone());
        let mut init = keystore.init_container.clone();
        init.image = Some(image.clone());
        init_containers.push(init);
    }

    let main_container = Container {
        name: KIBANA_CONTAINER_NAME.to_string(),
        image: Some(image),
        env: Some(backend_env(strategy, params.es_url, params.auth)?),
        ports: Some(vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: KIBANA_HTTP_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        readiness_probe: Some(default_probe()),
        liveness_probe: Some(default_probe()),
        resources: Some(default_resources()),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME_NAME.to_string(),
            mount_path: crate::constants::DATA_MOUNT_PATH.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let mut template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(params.labels.clone()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            automount_service_account_token: Some(false),
            containers: vec![main_container],
            init_containers: if init_containers.is_empty() {
                None
            } else {
                Some(init_containers)
            },
            volumes: Some(volumes),
            ..Default::default()
        }),
    };

    if let Some(user) = params.user_template {
        merge_user_template(&mut template, user);
    }
    Ok(template)
}

/// Mount the mirrored Elasticsearch CA into every container and point Kibana
/// at it. Any change to the CA bytes is picked up through the config
/// checksum, not here.
pub fn add_es_certs(template: &mut PodTemplateSpec, ca_secret_name: &str) {
    let Some(spec) = template.spec.as_mut() else {
        return;
    };

    spec.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: ES_CERTS_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(ca_secret_name.to_string()),
            optional: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    });

    let mount = VolumeMount {
        name: ES_CERTS_VOLUME_NAME.to_string(),
        mount_path: ES_CERTS_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    };
    let ssl_env = [
        EnvVar {
            name: "ELASTICSEARCH_SSL_CERTIFICATEAUTHORITIES".to_string(),
            value: Some(format!("{ES_CERTS_MOUNT_PATH}/{CA_FILE_NAME}")),
            ..Default::default()
        },
        EnvVar {
            name: "ELASTICSEARCH_SSL_VERIFICATIONMODE".to_string(),
            value: Some("certificate".to_string()),
            ..Default::default()
        },
    ];

    for container in spec
        .containers
        .iter_mut()
        .chain(spec.init_containers.iter_mut().flatten())
    {
        container
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .push(mount.clone());
        container
            .env
            .get_or_insert_with(Vec::new)
            .extend(ssl_env.iter().cloned());
    }
}

/// Mount the managed instance's own HTTP certificates read-only. No
/// environment is injected; consumers of the endpoint pick the CA up from
/// the published secret instead.
pub fn add_http_certs(template: &mut PodTemplateSpec, secret_name: &str) {
    let Some(spec) = template.spec.as_mut() else {
        return;
    };

    spec.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: HTTP_CERTS_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            optional: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    });

    for container in &mut spec.containers {
        container.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
            name: HTTP_CERTS_VOLUME_NAME.to_string(),
            mount_path: crate::constants::HTTP_CERTS_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }
}

/// Merge the user-provided pod template over the generated one.
///
/// User labels override generated ones; the user container named "kibana"
/// is merged into the generated main container (scalar fields override, env
/// and mounts append); any other user containers, init containers, volumes
/// and image pull secrets are appended.
fn merge_user_template(base: &mut PodTemplateSpec, user: &PodTemplateSpec) {
    if let Some(user_meta) = &user.metadata {
        let base_meta = base.metadata.get_or_insert_with(ObjectMeta::default);
        if let Some(user_labels) = &user_meta.labels {
            base_meta
                .labels
                .get_or_insert_with(BTreeMap::new)
                .extend(user_labels.clone());
        }
        if let Some(user_annotations) = &user_meta.annotations {
            base_meta
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .extend(user_annotations.clone());
        }
    }

    let Some(user_spec) = &user.spec else {
        return;
    };
    let base_spec = base.spec.get_or_insert_with(PodSpec::default);

    for user_container in &user_spec.containers {
        if user_container.name == KIBANA_CONTAINER_NAME {
            if let Some(main) = base_spec
                .containers
                .iter_mut()
                .find(|c| c.name == KIBANA_CONTAINER_NAME)
            {
                merge_container(main, user_container);
                continue;
            }
        }
        base_spec.containers.push(user_container.clone());
    }

    if let Some(user_init) = &user_spec.init_containers {
        base_spec
            .init_containers
            .get_or_insert_with(Vec::new)
            .extend(user_init.clone());
    }
    if let Some(user_volumes) = &user_spec.volumes {
        base_spec
            .volumes
            .get_or_insert_with(Vec::new)
            .extend(user_volumes.clone());
    }
    if let Some(automount) = user_spec.automount_service_account_token {
        base_spec.automount_service_account_token = Some(automount);
    }
    if let Some(sa) = &user_spec.service_account_name {
        base_spec.service_account_name = Some(sa.clone());
    }
    if let Some(node_selector) = &user_spec.node_selector {
        base_spec
            .node_selector
            .get_or_insert_with(BTreeMap::new)
            .extend(node_selector.clone());
    }
    if let Some(affinity) = &user_spec.affinity {
        base_spec.affinity = Some(affinity.clone());
    }
    if let Some(tolerations) = &user_spec.tolerations {
        base_spec
            .tolerations
            .get_or_insert_with(Vec::new)
            .extend(tolerations.clone());
    }
}

/// Merge a user container over the generated main container.
fn merge_container(base: &mut Container, user: &Container) {
    if let Some(image) = &user.image {
        base.image = Some(image.clone());
    }
    if let Some(resources) = &user.resources {
        base.resources = Some(resources.clone());
    }
    if let Some(env) = &user.env {
        base.env.get_or_insert_with(Vec::new).extend(env.clone());
    }
    if let Some(mounts) = &user.volume_mounts {
        base.volume_mounts
            .get_or_insert_with(Vec::new)
            .extend(mounts.clone());
    }
    if let Some(probe) = &user.readiness_probe {
        base.readiness_probe = Some(probe.clone());
    }
    if let Some(probe) = &user.liveness_probe {
        base.liveness_probe = Some(probe.clone());
    }
    if let Some(command) = &user.command {
        base.command = Some(command.clone());
    }
    if let Some(args) = &user.args {
        base.args = Some(args.clone());
    }
}

#[cfg(test)]
#[path = "pod_template_tests.rs"]
mod pod_template_tests;
