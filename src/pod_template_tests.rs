// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Unit tests for `pod_template.rs`

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::crd::{ElasticsearchAuth, InlineAuth, SecretKeyRef};
use crate::errors::{parse_version, ConfigError};
use crate::pod_template::{
    add_es_certs, build_pod_template, env_strategy, image_name, EnvStrategy, PodTemplateParams,
};

fn labels() -> BTreeMap<String, String> {
    [
        ("kibana.k8s.elastic.co/name".to_string(), "main".to_string()),
        ("common.k8s.elastic.co/type".to_string(), "kibana".to_string()),
    ]
    .into()
}

fn params<'a>(version: &'a semver::Version, version_str: &'a str) -> PodTemplateParams<'a> {
    PodTemplateParams {
        name: "main",
        version,
        version_str,
        custom_image: None,
        es_url: "https://es.default.svc:9200",
        auth: None,
        keystore: None,
        user_template: None,
        labels: labels(),
    }
}

fn main_container(template: &PodTemplateSpec) -> &Container {
    template
        .spec
        .as_ref()
        .unwrap()
        .containers
        .iter()
        .find(|c| c.name == "kibana")
        .expect("main container")
}

fn env_names(container: &Container) -> Vec<&str> {
    container
        .env
        .as_ref()
        .map(|env| env.iter().map(|e| e.name.as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn test_version_dispatch() {
    // 6.5.0 still uses the singular URL variable
    let v = parse_version("6.5.0").unwrap();
    assert_eq!(env_strategy(&v).unwrap(), EnvStrategy::Url);

    // 6.6.0 switched to ELASTICSEARCH_HOSTS
    let v = parse_version("6.6.0").unwrap();
    assert_eq!(env_strategy(&v).unwrap(), EnvStrategy::Hosts);

    let v = parse_version("7.0.0").unwrap();
    assert_eq!(env_strategy(&v).unwrap(), EnvStrategy::Hosts);

    let v = parse_version("8.2.0").unwrap();
    assert_eq!(env_strategy(&v).unwrap(), EnvStrategy::Hosts);

    // unsupported major is a configuration error
    assert!(matches!(
        parse_version("5.6.0"),
        Err(ConfigError::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_env_var_by_version() {
    let v65 = parse_version("6.5.0").unwrap();
    let template = build_pod_template(&params(&v65, "6.5.0")).unwrap();
    let env = env_names(main_container(&template));
    assert!(env.contains(&"ELASTICSEARCH_URL"));
    assert!(!env.contains(&"ELASTICSEARCH_HOSTS"));

    let v70 = parse_version("7.0.0").unwrap();
    let template = build_pod_template(&params(&v70, "7.0.0")).unwrap();
    let env = env_names(main_container(&template));
    assert!(env.contains(&"ELASTICSEARCH_HOSTS"));
    assert!(!env.contains(&"ELASTICSEARCH_URL"));
}

#[test]
fn test_image_defaulting() {
    assert_eq!(
        image_name(None, "7.6.0"),
        "docker.elastic.co/kibana/kibana:7.6.0"
    );
    assert_eq!(image_name(Some(""), "7.6.0"), "docker.elastic.co/kibana/kibana:7.6.0");
    assert_eq!(image_name(Some("custom/kibana:1"), "7.6.0"), "custom/kibana:1");

    let v = parse_version("7.6.0").unwrap();
    let mut p = params(&v, "7.6.0");
    p.custom_image = Some("custom/kibana:1");
    let template = build_pod_template(&p).unwrap();
    assert_eq!(main_container(&template).image.as_deref(), Some("custom/kibana:1"));
}

#[test]
fn test_probe_and_port_defaults() {
    let v = parse_version("7.6.0").unwrap();
    let template = build_pod_template(&params(&v, "7.6.0")).unwrap();
    let container = main_container(&template);

    let probe = container.readiness_probe.as_ref().unwrap();
    assert_eq!(probe.failure_threshold, Some(3));
    assert_eq!(probe.initial_delay_seconds, Some(10));
    assert_eq!(probe.period_seconds, Some(10));
    assert_eq!(probe.success_threshold, Some(1));
    assert_eq!(probe.timeout_seconds, Some(5));
    let http_get = probe.http_get.as_ref().unwrap();
    assert_eq!(http_get.path.as_deref(), Some("/"));

    let ports = container.ports.as_ref().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].container_port, 5601);
    assert_eq!(ports[0].name.as_deref(), Some("http"));

    // liveness mirrors readiness
    assert_eq!(container.liveness_probe, container.readiness_probe);

    let resources = container.resources.as_ref().unwrap();
    assert_eq!(
        resources.limits.as_ref().unwrap().get("memory").unwrap().0,
        "1Gi"
    );
}

#[test]
fn test_automount_defaults_to_false() {
    let v = parse_version("7.6.0").unwrap();
    let template = build_pod_template(&params(&v, "7.6.0")).unwrap();
    assert_eq!(
        template.spec.as_ref().unwrap().automount_service_account_token,
        Some(false)
    );
}

#[test]
fn test_inline_auth_env() {
    let v = parse_version("7.6.0").unwrap();
    let auth = ElasticsearchAuth {
        inline: Some(InlineAuth {
            username: "elastic".to_string(),
            password: "changeme".to_string(),
        }),
        secret_key_ref: None,
    };
    let mut p = params(&v, "7.6.0");
    p.auth = Some(&auth);
    let template = build_pod_template(&p).unwrap();
    let env = main_container(&template).env.as_ref().unwrap();

    let user = env.iter().find(|e| e.name == "ELASTICSEARCH_USERNAME").unwrap();
    assert_eq!(user.value.as_deref(), Some("elastic"));
    let password = env.iter().find(|e| e.name == "ELASTICSEARCH_PASSWORD").unwrap();
    assert_eq!(password.value.as_deref(), Some("changeme"));
    assert!(password.value_from.is_none());
}

#[test]
fn test_secret_ref_auth_env() {
    let v = parse_version("7.6.0").unwrap();
    let auth = ElasticsearchAuth {
        inline: None,
        secret_key_ref: Some(SecretKeyRef {
            name: "es-elastic-user".to_string(),
            key: "elastic".to_string(),
        }),
    };
    let mut p = params(&v, "7.6.0");
    p.auth = Some(&auth);
    let template = build_pod_template(&p).unwrap();
    let env = main_container(&template).env.as_ref().unwrap();

    let password = env.iter().find(|e| e.name == "ELASTICSEARCH_PASSWORD").unwrap();
    assert!(password.value.is_none());
    let selector = password
        .value_from
        .as_ref()
        .unwrap()
        .secret_key_ref
        .as_ref()
        .unwrap();
    assert_eq!(selector.name, "es-elastic-user");
    assert_eq!(selector.key, "elastic");
}

#[test]
fn test_ambiguous_auth_is_config_error() {
    let v = parse_version("7.6.0").unwrap();
    let auth = ElasticsearchAuth {
        inline: Some(InlineAuth::default()),
        secret_key_ref: Some(SecretKeyRef {
            name: "creds".to_string(),
            key: "elastic".to_string(),
        }),
    };
    let mut p = params(&v, "7.6.0");
    p.auth = Some(&auth);
    assert!(matches!(
        build_pod_template(&p),
        Err(ConfigError::AmbiguousAuth)
    ));
}

#[test]
fn test_es_certs_mount_and_env() {
    let v = parse_version("7.6.0").unwrap();
    let mut template = build_pod_template(&params(&v, "7.6.0")).unwrap();
    add_es_certs(&mut template, "main-es-ca");

    let volumes = template.spec.as_ref().unwrap().volumes.as_ref().unwrap();
    assert!(volumes
        .iter()
        .any(|v| v.secret.as_ref().and_then(|s| s.secret_name.as_deref()) == Some("main-es-ca")));

    let env = main_container(&template).env.as_ref().unwrap();
    let ca_env = env
        .iter()
        .find(|e| e.name == "ELASTICSEARCH_SSL_CERTIFICATEAUTHORITIES")
        .unwrap();
    assert_eq!(
        ca_env.value.as_deref(),
        Some("/usr/share/kibana/config/elasticsearch-certs/ca.pem")
    );
    let mode = env
        .iter()
        .find(|e| e.name == "ELASTICSEARCH_SSL_VERIFICATIONMODE")
        .unwrap();
    assert_eq!(mode.value.as_deref(), Some("certificate"));

    let mounts = main_container(&template).volume_mounts.as_ref().unwrap();
    assert!(mounts
        .iter()
        .any(|m| m.mount_path == "/usr/share/kibana/config/elasticsearch-certs"
            && m.read_only == Some(true)));
}

#[test]
fn test_user_template_merge() {
    let v = parse_version("7.6.0").unwrap();
    let user = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some([("custom".to_string(), "label".to_string())].into()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![
                Container {
                    name: "kibana".to_string(),
                    env: Some(vec![EnvVar {
                        name: "LOGGING_VERBOSE".to_string(),
                        value: Some("true".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                Container {
                    name: "sidecar".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }),
    };

    let mut p = params(&v, "7.6.0");
    p.user_template = Some(&user);
    let template = build_pod_template(&p).unwrap();

    // user labels are added on top of the defaults
    let template_labels = template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
    assert_eq!(template_labels.get("custom").map(String::as_str), Some("label"));
    assert_eq!(
        template_labels.get("kibana.k8s.elastic.co/name").map(String::as_str),
        Some("main")
    );

    // the kibana container was merged, not duplicated
    let spec = template.spec.as_ref().unwrap();
    assert_eq!(
        spec.containers.iter().filter(|c| c.name == "kibana").count(),
        1
    );
    // user env was appended to the generated env
    let env = env_names(main_container(&template));
    assert!(env.contains(&"LOGGING_VERBOSE"));
    assert!(env.contains(&"ELASTICSEARCH_HOSTS"));

    // the sidecar was appended
    assert!(spec.containers.iter().any(|c| c.name == "sidecar"));
}

#[test]
fn test_user_label_override_wins() {
    let v = parse_version("7.6.0").unwrap();
    let user = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(
                [("kibana.k8s.elastic.co/name".to_string(), "overridden".to_string())].into(),
            ),
            ..Default::default()
        }),
        spec: None,
    };

    let mut p = params(&v, "7.6.0");
    p.user_template = Some(&user);
    let template = build_pod_template(&p).unwrap();
    let template_labels = template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
    assert_eq!(
        template_labels.get("kibana.k8s.elastic.co/name").map(String::as_str),
        Some("overridden")
    );
}
