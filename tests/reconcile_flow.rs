// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! End-to-end tests of the desired-state pipeline: from a Kibana spec to the
//! Deployment and Service the operator would write, without a cluster.

use std::collections::BTreeMap;

use elasticop::checksum::ConfigChecksum;
use elasticop::crd::{
    ElasticsearchAuth, ElasticsearchBackend, InlineAuth, Kibana, KibanaSpec,
};
use elasticop::deployment::{
    build_deployment, build_labels, build_service, deployment_needs_update, pod_template_checksum,
    selector_labels, DeploymentParams,
};
use elasticop::errors::parse_version;
use elasticop::labels::CONFIG_CHECKSUM_LABEL;
use elasticop::pod_template::{add_es_certs, build_pod_template, PodTemplateParams};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

fn sample_kibana() -> Kibana {
    Kibana {
        metadata: ObjectMeta {
            name: Some("main".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("00000000-0000-0000-0000-000000000001".to_string()),
            ..Default::default()
        },
        spec: KibanaSpec {
            version: "7.6.0".to_string(),
            image: None,
            node_count: 1,
            elasticsearch: ElasticsearchBackend {
                url: "https://main-es-http.default.svc:9200".to_string(),
                auth: Some(ElasticsearchAuth {
                    inline: Some(InlineAuth {
                        username: "elastic".to_string(),
                        password: "changeme".to_string(),
                    }),
                    secret_key_ref: None,
                }),
                ca_cert_secret: Some("main-es-http-certs-public".to_string()),
            },
            secure_settings: None,
            expose: String::new(),
            pod_template: None,
        },
        status: None,
    }
}

/// Build the Deployment the driver would reconcile for the given CA bytes.
fn desired_deployment(kb: &Kibana, ca_bytes: &[u8]) -> Deployment {
    let version = parse_version(&kb.spec.version).unwrap();

    let mut checksum = ConfigChecksum::new();
    checksum.write(ca_bytes);
    let digest = checksum.finish();

    let mut labels = build_labels("main");
    labels.insert(CONFIG_CHECKSUM_LABEL.to_string(), digest);

    let mut pod_template = build_pod_template(&PodTemplateParams {
        name: "main",
        version: &version,
        version_str: &kb.spec.version,
        custom_image: kb.spec.image.as_deref(),
        es_url: &kb.spec.elasticsearch.url,
        auth: kb.spec.elasticsearch.auth.as_ref(),
        keystore: None,
        user_template: kb.spec.pod_template.as_ref(),
        labels,
    })
    .unwrap();
    add_es_certs(&mut pod_template, "main-es-http-certs-public");

    build_deployment(DeploymentParams {
        name: kb.deployment_name(),
        namespace: "default".to_string(),
        replicas: kb.spec.node_count,
        labels: build_labels("main"),
        selector: selector_labels("main"),
        pod_template,
    })
}

#[test]
fn test_fixed_desired_state_is_stable() {
    // inline auth + CA secret present + no secure settings: two consecutive
    // builds carry exactly one checksum value and an identical Deployment
    let kb = sample_kibana();
    let first = desired_deployment(&kb, b"ca-bytes");
    let second = desired_deployment(&kb, b"ca-bytes");

    assert_eq!(first, second);
    assert!(!deployment_needs_update(&second, &first));

    let checksum = pod_template_checksum(&first).unwrap();
    assert_eq!(checksum.len(), 56);
    assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_ca_change_rolls_the_deployment() {
    let kb = sample_kibana();
    let before = desired_deployment(&kb, b"");
    let after = desired_deployment(&kb, b"some-secret");

    let checksum_before = pod_template_checksum(&before).unwrap();
    let checksum_after = pod_template_checksum(&after).unwrap();
    assert_ne!(checksum_before, checksum_after);
    assert_eq!(checksum_after.len(), 56);

    // the changed checksum is exactly what forces the rollout
    assert!(deployment_needs_update(&after, &before));
}

#[test]
fn test_deployment_and_service_shape() {
    let kb = sample_kibana();
    let deployment = desired_deployment(&kb, b"ca");

    assert_eq!(deployment.metadata.name.as_deref(), Some("main-kb"));
    let spec = deployment.spec.as_ref().unwrap();
    assert_eq!(spec.replicas, Some(1));
    assert_eq!(spec.revision_history_limit, Some(0));

    let containers = &spec.template.spec.as_ref().unwrap().containers;
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].name, "kibana");
    assert_eq!(
        containers[0].image.as_deref(),
        Some("docker.elastic.co/kibana/kibana:7.6.0")
    );

    let service = build_service(&kb);
    assert_eq!(service.metadata.name.as_deref(), Some("main-kb-http"));
    let svc_spec = service.spec.as_ref().unwrap();
    assert_eq!(svc_spec.type_.as_deref(), Some("ClusterIP"));
    assert_eq!(svc_spec.ports.as_ref().unwrap()[0].port, 5601);

    let expected_selector: BTreeMap<String, String> = [
        ("kibana.k8s.elastic.co/name".to_string(), "main".to_string()),
        ("common.k8s.elastic.co/type".to_string(), "kibana".to_string()),
    ]
    .into();
    assert_eq!(svc_spec.selector.as_ref(), Some(&expected_selector));
}

#[test]
fn test_version_strategies_across_majors() {
    let mut kb = sample_kibana();

    let env_of = |kb: &Kibana| {
        let version = parse_version(&kb.spec.version).unwrap();
        let template = build_pod_template(&PodTemplateParams {
            name: "main",
            version: &version,
            version_str: &kb.spec.version,
            custom_image: None,
            es_url: &kb.spec.elasticsearch.url,
            auth: None,
            keystore: None,
            user_template: None,
            labels: build_labels("main"),
        })
        .unwrap();
        template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
    };

    kb.spec.version = "6.5.0".to_string();
    assert!(env_of(&kb).contains(&"ELASTICSEARCH_URL".to_string()));

    kb.spec.version = "6.6.0".to_string();
    assert!(env_of(&kb).contains(&"ELASTICSEARCH_HOSTS".to_string()));

    kb.spec.version = "7.0.0".to_string();
    assert!(env_of(&kb).contains(&"ELASTICSEARCH_HOSTS".to_string()));

    kb.spec.version = "5.6.0".to_string();
    assert!(parse_version(&kb.spec.version).is_err());
}
