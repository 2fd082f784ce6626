// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Kubernetes resource builders for Kibana deployments.
//!
//! Pure functions from the composed pod template to the Deployment and
//! Service objects the operator reconciles. All functions are side-effect
//! free and easily testable.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{PodTemplateSpec, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::constants::KIBANA_HTTP_PORT;
use crate::crd::Kibana;
use crate::labels::{
    CONFIG_CHECKSUM_LABEL, K8S_MANAGED_BY, K8S_NAME, KIBANA_NAME_LABEL, MANAGED_BY_ELASTICOP,
    TYPE_LABEL, TYPE_LABEL_VALUE,
};
use kube::ResourceExt;

/// Labels identifying resources owned by the given Kibana instance.
/// Also used as the Deployment selector and the Service selector.
#[must_use]
pub fn build_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(KIBANA_NAME_LABEL.into(), name.into());
    labels.insert(TYPE_LABEL.into(), TYPE_LABEL_VALUE.into());
    labels.insert(K8S_NAME.into(), TYPE_LABEL_VALUE.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_ELASTICOP.into());
    labels
}

/// Selector labels only (a strict subset of [`build_labels`]); pods must
/// keep matching the selector even when cosmetic labels evolve.
#[must_use]
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(KIBANA_NAME_LABEL.into(), name.into());
    labels.insert(TYPE_LABEL.into(), TYPE_LABEL_VALUE.into());
    labels
}

/// Inputs of the Deployment builder.
pub struct DeploymentParams {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
    pub selector: BTreeMap<String, String>,
    pub pod_template: PodTemplateSpec,
}

/// Build the expected Deployment.
///
/// `revisionHistoryLimit` is zero: old replica sets carry no value here and
/// only slow down garbage collection.
#[must_use]
pub fn build_deployment(params: DeploymentParams) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(params.name),
            namespace: Some(params.namespace),
            labels: Some(params.labels),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            revision_history_limit: Some(0),
            replicas: Some(params.replicas),
            selector: LabelSelector {
                match_labels: Some(params.selector),
                ..Default::default()
            },
            template: params.pod_template,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Checksum label of a Deployment's pod template, if present.
#[must_use]
pub fn pod_template_checksum(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()?
        .template
        .metadata
        .as_ref()?
        .labels
        .as_ref()?
        .get(CONFIG_CHECKSUM_LABEL)
        .map(String::as_str)
}

/// Update predicate of the Deployment: a write is needed when the pod
/// template checksum differs (forcing a rollout) or the replica count
/// changed. Label-only changes are applied without touching the pod
/// template, so they never roll pods.
#[must_use]
pub fn deployment_needs_update(expected: &Deployment, actual: &Deployment) -> bool {
    if pod_template_checksum(expected) != pod_template_checksum(actual) {
        return true;
    }
    let replicas = |d: &Deployment| d.spec.as_ref().and_then(|s| s.replicas);
    if replicas(expected) != replicas(actual) {
        return true;
    }
    expected.metadata.labels != actual.metadata.labels
}

/// Copy the desired state onto the live Deployment, preserving everything
/// the API server populated.
pub fn update_deployment(expected: &Deployment, actual: &mut Deployment) {
    actual.metadata.labels.clone_from(&expected.metadata.labels);
    if let (Some(expected_spec), Some(actual_spec)) = (&expected.spec, &mut actual.spec) {
        actual_spec.replicas = expected_spec.replicas;
        actual_spec.template = expected_spec.template.clone();
        actual_spec.revision_history_limit = expected_spec.revision_history_limit;
    } else {
        actual.spec.clone_from(&expected.spec);
    }
}

/// Map the `expose` spec field to a Kubernetes Service type.
/// Empty and unknown values fall back to ClusterIP.
#[must_use]
pub fn get_service_type(expose: &str) -> &'static str {
    match expose {
        "NodePort" => "NodePort",
        "LoadBalancer" => "LoadBalancer",
        _ => "ClusterIP",
    }
}

/// Build the expected HTTP Service for the instance.
#[must_use]
pub fn build_service(kb: &Kibana) -> Service {
    let name = kb.name_any();
    let svc = Service {
        metadata: ObjectMeta {
            name: Some(kb.http_service_name()),
            namespace: kb.namespace(),
            labels: Some(build_labels(&name)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(get_service_type(&kb.spec.expose).to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    set_service_defaults(
        svc,
        build_labels(&name),
        selector_labels(&name),
        vec![ServicePort {
            name: Some("http".to_string()),
            protocol: Some("TCP".to_string()),
            port: KIBANA_HTTP_PORT,
            ..Default::default()
        }],
    )
}

/// Fill only the empty fields of a Service with defaults: existing labels,
/// selector and ports always win.
#[must_use]
pub fn set_service_defaults(
    mut svc: Service,
    default_labels: BTreeMap<String, String>,
    default_selector: BTreeMap<String, String>,
    default_ports: Vec<ServicePort>,
) -> Service {
    if svc.metadata.labels.as_ref().is_none_or(BTreeMap::is_empty) {
        svc.metadata.labels = Some(default_labels);
    }
    let spec = svc.spec.get_or_insert_with(ServiceSpec::default);
    if spec.selector.as_ref().is_none_or(BTreeMap::is_empty) {
        spec.selector = Some(default_selector);
    }
    if spec.ports.as_ref().is_none_or(Vec::is_empty) {
        spec.ports = Some(default_ports);
    }
    svc
}

/// Update predicate of the Service: compare only the fields the operator
/// owns, ignoring everything the API server assigns.
#[must_use]
pub fn service_needs_update(expected: &Service, actual: &Service) -> bool {
    let spec = |s: &Service| s.spec.clone().unwrap_or_default();
    let expected_spec = spec(expected);
    let actual_spec = spec(actual);

    if expected_spec.type_ != actual_spec.type_ || expected_spec.selector != actual_spec.selector {
        return true;
    }
    let port_key = |p: &ServicePort| (p.name.clone(), p.port, p.protocol.clone());
    let expected_ports: Vec<_> = expected_spec.ports.iter().flatten().map(port_key).collect();
    let actual_ports: Vec<_> = actual_spec.ports.iter().flatten().map(port_key).collect();
    expected_ports != actual_ports
}

/// Copy the desired Service state onto the live object, preserving the
/// server-assigned `clusterIP`, and per-port `nodePort`/`targetPort` where
/// the expected Service leaves them zero.
pub fn update_service(expected: &Service, actual: &mut Service) {
    actual.metadata.labels.clone_from(&expected.metadata.labels);

    let Some(expected_spec) = &expected.spec else {
        return;
    };
    let previous = actual.spec.take().unwrap_or_default();
    let mut new_spec = expected_spec.clone();

    // ClusterIP is immutable and server-assigned
    if new_spec.cluster_ip.as_ref().is_none_or(String::is_empty) {
        new_spec.cluster_ip.clone_from(&previous.cluster_ip);
        new_spec.cluster_ips.clone_from(&previous.cluster_ips);
    }

    if let Some(ports) = &mut new_spec.ports {
        for port in ports.iter_mut() {
            let matching = previous
                .ports
                .iter()
                .flatten()
                .find(|p| p.port == port.port);
            if let Some(existing) = matching {
                if port.node_port.is_none() {
                    port.node_port = existing.node_port;
                }
                if port.target_port.is_none() {
                    port.target_port.clone_from(&existing.target_port);
                }
            }
        }
    }

    actual.spec = Some(new_spec);
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod deployment_tests;
