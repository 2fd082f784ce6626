// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions for Elastic-stack workloads.
//!
//! This module defines the `Kibana` custom resource managed by elasticop,
//! together with the auxiliary types describing how a Kibana deployment
//! connects to its Elasticsearch backend.
//!
//! # Example: a minimal Kibana resource
//!
//! ```yaml
//! apiVersion: kibana.k8s.elastic.co/v1alpha1
//! kind: Kibana
//! metadata:
//!   name: kibana-sample
//! spec:
//!   version: 7.6.0
//!   nodeCount: 1
//!   elasticsearch:
//!     url: https://elasticsearch-sample-es-http.default.svc:9200
//!     auth:
//!       secretKeyRef:
//!         name: elasticsearch-sample-es-elastic-user
//!         key: elastic
//!     caCertSecret: elasticsearch-sample-es-http-certs-public
//! ```

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use kube::ResourceExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{DEPLOYMENT_SUFFIX, HTTP_SERVICE_SUFFIX};

/// Inline basic-auth credentials for the Elasticsearch backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InlineAuth {
    /// User name.
    pub username: String,
    /// Password. Stored verbatim in the resource; prefer `secretKeyRef`
    /// for anything beyond experimentation.
    pub password: String,
}

/// Reference to a key inside a Kubernetes secret holding a password.
///
/// The referenced secret must live in the same namespace as the Kibana
/// resource. The key name doubles as the user name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Name of the secret.
    pub name: String,
    /// Key within the secret whose value is the password.
    pub key: String,
}

/// Authentication towards the Elasticsearch backend.
///
/// Exactly one of `inline` or `secretKeyRef` may be set. Declaring both is a
/// configuration error surfaced at reconcile time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchAuth {
    /// Credentials spelled out in the spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineAuth>,

    /// Credentials read from a secret key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyRef>,
}

impl ElasticsearchAuth {
    /// True if any credentials are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inline.is_some() || self.secret_key_ref.is_some()
    }

    /// True if at most one arm is active.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !(self.inline.is_some() && self.secret_key_ref.is_some())
    }
}

/// Connection details for the Elasticsearch cluster backing this Kibana.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElasticsearchBackend {
    /// URL of the Elasticsearch HTTP endpoint.
    #[serde(default)]
    pub url: String,

    /// Credentials used by Kibana to talk to Elasticsearch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<ElasticsearchAuth>,

    /// Name of a secret (same namespace) holding the CA certificate of the
    /// Elasticsearch HTTP endpoint under the `ca.pem` key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert_secret: Option<String>,
}

impl ElasticsearchBackend {
    /// A backend counts as configured as soon as a URL or credentials are set.
    /// An entirely empty backend means "nothing to drive yet" and the driver
    /// returns successfully without creating workload resources.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() || self.auth.as_ref().is_some_and(ElasticsearchAuth::is_configured)
    }
}

/// Reference to a user-provided secret whose entries are loaded into the
/// Kibana keystore by an init container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecureSettingsRef {
    /// Name of the secret (same namespace).
    pub secret_name: String,
}

/// `Kibana` declares a desired Kibana deployment wired to an Elasticsearch
/// cluster. The operator owns the Deployment and Service derived from it and
/// only ever writes the status subresource of the Kibana object itself.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kibana.k8s.elastic.co",
    version = "v1alpha1",
    kind = "Kibana",
    namespaced,
    status = "KibanaStatus",
    shortname = "kb"
)]
#[serde(rename_all = "camelCase")]
pub struct KibanaSpec {
    /// Elastic stack version, e.g. "7.6.0". Must parse as semver with a
    /// major version in {6, 7, 8}.
    pub version: String,

    /// Custom container image overriding the default
    /// `docker.elastic.co/kibana/kibana:<version>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Desired number of Kibana pods.
    #[serde(default)]
    #[schemars(range(min = 0))]
    pub node_count: i32,

    /// The Elasticsearch cluster this Kibana connects to.
    #[serde(default)]
    pub elasticsearch: ElasticsearchBackend,

    /// Secure settings propagated into the Kibana keystore.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_settings: Option<SecureSettingsRef>,

    /// Service type used to expose Kibana: `ClusterIP`, `NodePort` or
    /// `LoadBalancer`. Empty or unknown values fall back to `ClusterIP`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expose: String,

    /// Partial pod template merged over the operator-generated one.
    /// User labels win, the container named "kibana" is merged with the
    /// generated main container, everything else is appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_template: Option<PodTemplateSpec>,
}

/// Health of a Kibana deployment as observed from its pods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KibanaHealth {
    /// No pod is available.
    #[default]
    Red,
    /// At least one pod is available.
    Green,
}

/// Status subresource of a `Kibana` object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KibanaStatus {
    /// Number of available pods backing this Kibana.
    #[serde(default)]
    pub available_nodes: i32,

    /// Aggregated health.
    #[serde(default)]
    pub health: KibanaHealth,
}

impl KibanaStatus {
    /// True if this (new) status is a degradation of `old`: the instance
    /// was green and no longer is. Anything that is not green counts as
    /// degraded; a `None` old status means the instance was still pending
    /// and going red is not a regression.
    #[must_use]
    pub fn is_degraded(&self, old: Option<&KibanaStatus>) -> bool {
        old.is_some_and(|o| o.health == KibanaHealth::Green) && self.health != KibanaHealth::Green
    }
}

impl Kibana {
    /// Name of the Deployment owned by this resource.
    #[must_use]
    pub fn deployment_name(&self) -> String {
        format!("{}-{DEPLOYMENT_SUFFIX}", self.name_any())
    }

    /// Name of the HTTP Service owned by this resource.
    #[must_use]
    pub fn http_service_name(&self) -> String {
        format!("{}-{HTTP_SERVICE_SUFFIX}", self.name_any())
    }
}
