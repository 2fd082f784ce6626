// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! HTTP plumbing shared by all versioned Elasticsearch clients.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::error::{ApiError, EsError};
use super::{DialerFn, UserAuth};
use crate::constants::ES_CLIENT_TIMEOUT_SECS;

/// Connection state shared by the versioned client implementations.
///
/// A fresh client is created per reconcile to pick up rotated credentials;
/// idle connections are closed when the client is dropped, so discarded
/// clients do not leak sockets.
pub(crate) struct BaseClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Option<UserAuth>,
    ca_certs: Vec<Vec<u8>>,
    pub(crate) version: semver::Version,
}

impl BaseClient {
    pub(crate) fn new(
        dialer: Option<&DialerFn>,
        endpoint: &str,
        auth: Option<UserAuth>,
        version: semver::Version,
        ca_certs: Vec<Vec<u8>>,
    ) -> Result<Self, EsError> {
        let url = Url::parse(endpoint)?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(ES_CLIENT_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(60));

        if let Some(tls) = super::tls::client_config(&ca_certs)? {
            builder = builder.use_preconfigured_tls(tls);
        }

        // the dialer can redirect the endpoint host to an arbitrary socket
        // address (port-forwarding in tests)
        if let (Some(dialer), Some(host)) = (dialer, url.host_str()) {
            if let Some(addr) = dialer(host) {
                builder = builder.resolve(host, addr);
            }
        }

        Ok(BaseClient {
            http: builder.build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth,
            ca_certs,
            version,
        })
    }

    /// True if the other client targets the same cluster with the same
    /// identity: version, endpoint, user and CA set (by byte identity).
    pub(crate) fn equal(&self, other: &BaseClient) -> bool {
        self.version == other.version
            && self.endpoint == other.endpoint
            && self.auth == other.auth
            && self.ca_certs == other.ca_certs
    }

    pub(crate) fn descriptor(&self) -> super::ClientDescriptor {
        super::ClientDescriptor {
            version: self.version.clone(),
            endpoint: self.endpoint.clone(),
            user: self.auth.as_ref().map(|a| a.name.clone()),
            ca_certs: self.ca_certs.clone(),
        }
    }

    /// Perform a request; statuses outside 2xx become an [`ApiError`] unless
    /// listed in `tolerated` (the cluster-health wait call treats 408 as a
    /// normal response and decodes the body the same as a 200).
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        tolerated: &[u16],
    ) -> Result<String, EsError> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(method = %method, url = %url, "Elasticsearch API request");

        let mut request = self
            .http
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8");
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.name, Some(&auth.password));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        if !(200..300).contains(&status) && !tolerated.contains(&status) {
            return Err(ApiError {
                status,
                body: serde_json::from_str(&text).ok(),
            }
            .into());
        }
        Ok(text)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, EsError> {
        let text = self.send(Method::GET, path, None, &[]).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// GET that decodes the body even for the tolerated statuses.
    pub(crate) async fn get_tolerating<T: DeserializeOwned>(
        &self,
        path: &str,
        tolerated: &[u16],
    ) -> Result<T, EsError> {
        let text = self.send(Method::GET, path, None, tolerated).await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) async fn put(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), EsError> {
        self.send(Method::PUT, path, body.as_ref(), &[]).await?;
        Ok(())
    }

    pub(crate) async fn post_unit(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), EsError> {
        self.send(Method::POST, path, body.as_ref(), &[]).await?;
        Ok(())
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, EsError> {
        let text = self.send(Method::POST, path, body.as_ref(), &[]).await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), EsError> {
        self.send(Method::DELETE, path, None, &[]).await?;
        Ok(())
    }
}

// Version-independent API operations, shared by all client implementations.
impl BaseClient {
    pub(crate) async fn get_cluster_info(&self) -> Result<super::model::Info, EsError> {
        self.get("/").await
    }

    pub(crate) async fn get_cluster_health(&self) -> Result<super::model::Health, EsError> {
        self.get("/_cluster/health").await
    }

    /// Wait for all pending cluster events. The zero timeout makes a 408 the
    /// expected outcome on a busy cluster; its body decodes like a 200.
    pub(crate) async fn get_cluster_health_wait_for_all_events(
        &self,
    ) -> Result<super::model::Health, EsError> {
        self.get_tolerating("/_cluster/health?wait_for_events=languid&timeout=0s", &[408])
            .await
    }

    pub(crate) async fn get_cluster_routing_allocation(
        &self,
    ) -> Result<super::model::ClusterRoutingAllocation, EsError> {
        self.get("/_cluster/settings").await
    }

    pub(crate) async fn update_settings(
        &self,
        settings: serde_json::Value,
    ) -> Result<(), EsError> {
        self.put("/_cluster/settings", Some(settings)).await
    }

    pub(crate) async fn exclude_from_shard_allocation(&self, nodes: &str) -> Result<(), EsError> {
        self.update_settings(serde_json::json!({
            "transient": { "cluster.routing.allocation.exclude._name": nodes }
        }))
        .await
    }

    pub(crate) async fn update_allocation_enable(&self, value: &str) -> Result<(), EsError> {
        self.update_settings(serde_json::json!({
            "transient": { "cluster.routing.allocation.enable": value }
        }))
        .await
    }

    pub(crate) async fn synced_flush(&self) -> Result<(), EsError> {
        self.post_unit("/_flush/synced", None).await
    }

    pub(crate) async fn flush(&self) -> Result<(), EsError> {
        self.post_unit("/_flush", None).await
    }

    pub(crate) async fn get_nodes(&self) -> Result<super::model::Nodes, EsError> {
        // restrict the call to minimal node information
        self.get("/_nodes/_all/no-metrics").await
    }

    pub(crate) async fn get_nodes_stats(&self) -> Result<super::model::NodesStats, EsError> {
        self.get("/_nodes/_all/stats/os").await
    }

    pub(crate) async fn reload_secure_settings(&self) -> Result<(), EsError> {
        self.post_unit("/_nodes/reload_secure_settings", None).await
    }

    /// True iff the current master node runs 7.x or above. A cluster without
    /// a known master is considered not bootstrapped, not an error.
    pub(crate) async fn cluster_bootstrapped_for_zen2(&self) -> Result<bool, EsError> {
        let response: super::model::Nodes = self.get("/_nodes/_master").await?;
        let Some(master) = response.nodes.values().next() else {
            return Ok(false);
        };
        master.is_v7_or_above().map_err(|e| {
            EsError::Unexpected(format!(
                "master node reports unparsable version '{}': {e}",
                master.version
            ))
        })
    }
}
