// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Unit tests for `deployment.rs`

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{PodTemplateSpec, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::crd_tests::kibana;
use crate::deployment::{
    build_deployment, build_labels, build_service, deployment_needs_update, get_service_type,
    pod_template_checksum, selector_labels, service_needs_update, set_service_defaults,
    update_service, DeploymentParams,
};
use crate::labels::CONFIG_CHECKSUM_LABEL;

fn deployment_with_checksum(checksum: &str, replicas: i32) -> k8s_openapi::api::apps::v1::Deployment {
    let mut labels = build_labels("main");
    labels.insert(CONFIG_CHECKSUM_LABEL.to_string(), checksum.to_string());
    build_deployment(DeploymentParams {
        name: "main-kb".to_string(),
        namespace: "default".to_string(),
        replicas,
        labels: build_labels("main"),
        selector: selector_labels("main"),
        pod_template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(labels),
                ..Default::default()
            }),
            spec: None,
        },
    })
}

#[test]
fn test_deployment_shape() {
    let deployment = deployment_with_checksum("abc", 2);
    assert_eq!(deployment.metadata.name.as_deref(), Some("main-kb"));
    let spec = deployment.spec.as_ref().unwrap();
    assert_eq!(spec.revision_history_limit, Some(0));
    assert_eq!(spec.replicas, Some(2));
    assert_eq!(
        spec.selector.match_labels.as_ref().unwrap().get("kibana.k8s.elastic.co/name"),
        Some(&"main".to_string())
    );
    assert_eq!(pod_template_checksum(&deployment), Some("abc"));
}

#[test]
fn test_same_checksum_means_no_rollout() {
    let expected = deployment_with_checksum("abc", 1);
    let actual = deployment_with_checksum("abc", 1);
    assert!(!deployment_needs_update(&expected, &actual));
}

#[test]
fn test_checksum_change_forces_update() {
    let expected = deployment_with_checksum("def", 1);
    let actual = deployment_with_checksum("abc", 1);
    assert!(deployment_needs_update(&expected, &actual));
}

#[test]
fn test_replica_change_forces_update() {
    let expected = deployment_with_checksum("abc", 3);
    let actual = deployment_with_checksum("abc", 1);
    assert!(deployment_needs_update(&expected, &actual));
}

#[test]
fn test_get_service_type() {
    assert_eq!(get_service_type(""), "ClusterIP");
    assert_eq!(get_service_type("NodePort"), "NodePort");
    assert_eq!(get_service_type("LoadBalancer"), "LoadBalancer");
    assert_eq!(get_service_type("SomethingElse"), "ClusterIP");
    assert_eq!(get_service_type("ClusterIP"), "ClusterIP");
}

#[test]
fn test_build_service_defaults() {
    let kb = kibana("main", "default");
    let svc = build_service(&kb);

    assert_eq!(svc.metadata.name.as_deref(), Some("main-kb-http"));
    let spec = svc.spec.as_ref().unwrap();
    assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
    let ports = spec.ports.as_ref().unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, 5601);
    let selector = spec.selector.as_ref().unwrap();
    assert_eq!(selector.get("kibana.k8s.elastic.co/name"), Some(&"main".to_string()));
    assert_eq!(selector.get("common.k8s.elastic.co/type"), Some(&"kibana".to_string()));
}

#[test]
fn test_build_service_respects_expose() {
    let mut kb = kibana("main", "default");
    kb.spec.expose = "LoadBalancer".to_string();
    let svc = build_service(&kb);
    assert_eq!(svc.spec.as_ref().unwrap().type_.as_deref(), Some("LoadBalancer"));
}

#[test]
fn test_set_service_defaults_preserves_existing() {
    let existing_labels: BTreeMap<String, String> = [("keep".to_string(), "me".to_string())].into();
    let existing_selector: BTreeMap<String, String> = [("sel".to_string(), "x".to_string())].into();
    let existing_ports = vec![ServicePort {
        port: 9999,
        ..Default::default()
    }];

    let svc = Service {
        metadata: ObjectMeta {
            labels: Some(existing_labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(existing_selector.clone()),
            ports: Some(existing_ports.clone()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let defaulted = set_service_defaults(
        svc,
        build_labels("main"),
        selector_labels("main"),
        vec![ServicePort {
            port: 5601,
            ..Default::default()
        }],
    );

    // only empty fields are filled: everything pre-existing is preserved
    assert_eq!(defaulted.metadata.labels, Some(existing_labels));
    let spec = defaulted.spec.unwrap();
    assert_eq!(spec.selector, Some(existing_selector));
    assert_eq!(spec.ports, Some(existing_ports));
}

#[test]
fn test_set_service_defaults_fills_empty() {
    let svc = Service::default();
    let defaulted = set_service_defaults(
        svc,
        build_labels("main"),
        selector_labels("main"),
        vec![ServicePort {
            port: 5601,
            ..Default::default()
        }],
    );
    assert!(defaulted.metadata.labels.is_some());
    let spec = defaulted.spec.unwrap();
    assert_eq!(spec.ports.unwrap()[0].port, 5601);
    assert_eq!(spec.selector, Some(selector_labels("main")));
}

#[test]
fn test_update_service_preserves_server_assigned_fields() {
    let kb = kibana("main", "default");
    let expected = build_service(&kb);

    let mut actual = expected.clone();
    {
        let spec = actual.spec.as_mut().unwrap();
        spec.cluster_ip = Some("10.0.0.42".to_string());
        spec.cluster_ips = Some(vec!["10.0.0.42".to_string()]);
        let port = &mut spec.ports.as_mut().unwrap()[0];
        port.node_port = Some(31234);
        port.target_port = Some(IntOrString::Int(5601));
    }

    update_service(&expected, &mut actual);

    let spec = actual.spec.as_ref().unwrap();
    assert_eq!(spec.cluster_ip.as_deref(), Some("10.0.0.42"));
    let port = &spec.ports.as_ref().unwrap()[0];
    assert_eq!(port.node_port, Some(31234));
    assert_eq!(port.target_port, Some(IntOrString::Int(5601)));
}

#[test]
fn test_service_needs_update_ignores_server_fields() {
    let kb = kibana("main", "default");
    let expected = build_service(&kb);

    let mut actual = expected.clone();
    {
        let spec = actual.spec.as_mut().unwrap();
        spec.cluster_ip = Some("10.0.0.42".to_string());
        spec.ports.as_mut().unwrap()[0].node_port = Some(31234);
    }
    assert!(!service_needs_update(&expected, &actual));

    // a type change is a real drift
    actual.spec.as_mut().unwrap().type_ = Some("NodePort".to_string());
    assert!(service_needs_update(&expected, &actual));
}

#[test]
fn test_two_reconciles_produce_identical_deployment() {
    // given a fixed desired state, building twice yields identical objects,
    // and the update predicate reports no work on the second pass
    let first = deployment_with_checksum("abc", 1);
    let second = deployment_with_checksum("abc", 1);
    assert_eq!(first, second);
    assert!(!deployment_needs_update(&second, &first));
}
