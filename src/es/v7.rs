// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Client for the Elasticsearch 7.x API family.

use async_trait::async_trait;

use super::error::EsError;
use super::http::BaseClient;
use super::model::{
    ClusterRoutingAllocation, ClusterState, Health, Info, License, LicenseResponse,
    LicenseUpdateRequest, LicenseUpdateResponse, Nodes, NodesStats, StartBasicResponse,
    StartTrialResponse,
};
use super::{ClientDescriptor, Elasticsearch};
use crate::constants::DEFAULT_VOTING_CONFIG_EXCLUSIONS_TIMEOUT;

/// First version accepting voting-config exclusions by node *name* query
/// parameter; the deprecated path-segment form applies below it.
fn node_names_api_cutover() -> semver::Version {
    semver::Version::new(7, 8, 0)
}

pub struct ClientV7 {
    base: BaseClient,
}

impl ClientV7 {
    pub(crate) fn new(base: BaseClient) -> Self {
        ClientV7 { base }
    }

    pub(crate) fn base(&self) -> &BaseClient {
        &self.base
    }

    /// The exclusions path changed at 7.8.0: before, node names are path
    /// segments and a timeout parameter is accepted; from 7.8.0 on, node
    /// names move to the `node_names` query parameter.
    pub(crate) async fn add_voting_config_exclusions_versioned(
        &self,
        node_names: &[String],
        timeout: &str,
    ) -> Result<(), EsError> {
        let path = if self.base.version >= node_names_api_cutover() {
            format!(
                "/_cluster/voting_config_exclusions?node_names={}",
                node_names.join(",")
            )
        } else {
            let timeout = if timeout.is_empty() {
                DEFAULT_VOTING_CONFIG_EXCLUSIONS_TIMEOUT
            } else {
                timeout
            };
            format!(
                "/_cluster/voting_config_exclusions/{}?timeout={timeout}",
                node_names.join(",")
            )
        };
        self.base.post_unit(&path, None).await
    }

    pub(crate) async fn delete_voting_config_exclusions_impl(
        &self,
        wait_for_removal: bool,
    ) -> Result<(), EsError> {
        let path =
            format!("/_cluster/voting_config_exclusions?wait_for_removal={wait_for_removal}");
        self.base.delete(&path).await
    }
}

#[async_trait]
impl Elasticsearch for ClientV7 {
    fn version(&self) -> &semver::Version {
        &self.base.version
    }

    fn descriptor(&self) -> ClientDescriptor {
        self.base.descriptor()
    }

    async fn get_cluster_info(&self) -> Result<Info, EsError> {
        self.base.get_cluster_info().await
    }

    async fn get_cluster_health(&self) -> Result<Health, EsError> {
        self.base.get_cluster_health().await
    }

    async fn get_cluster_health_wait_for_all_events(&self) -> Result<Health, EsError> {
        self.base.get_cluster_health_wait_for_all_events().await
    }

    async fn get_cluster_state(&self) -> Result<ClusterState, EsError> {
        Err(EsError::NotSupported {
            operation: "cluster state",
            major: 7,
        })
    }

    async fn get_cluster_routing_allocation(&self) -> Result<ClusterRoutingAllocation, EsError> {
        self.base.get_cluster_routing_allocation().await
    }

    async fn update_settings(&self, settings: serde_json::Value) -> Result<(), EsError> {
        self.base.update_settings(settings).await
    }

    async fn exclude_from_shard_allocation(&self, nodes: &str) -> Result<(), EsError> {
        self.base.exclude_from_shard_allocation(nodes).await
    }

    async fn enable_shard_allocation(&self) -> Result<(), EsError> {
        self.base.update_allocation_enable("all").await
    }

    async fn disable_replica_shards_allocation(&self) -> Result<(), EsError> {
        self.base.update_allocation_enable("primaries").await
    }

    async fn set_minimum_master_nodes(&self, n: i32) -> Result<(), EsError> {
        // zen1 settings are accepted for backwards compatibility on 7.x
        self.base
            .update_settings(serde_json::json!({
                "transient": { "discovery.zen.minimum_master_nodes": n },
                "persistent": { "discovery.zen.minimum_master_nodes": n }
            }))
            .await
    }

    async fn add_voting_config_exclusions(
        &self,
        node_names: &[String],
        timeout: &str,
    ) -> Result<(), EsError> {
        self.add_voting_config_exclusions_versioned(node_names, timeout)
            .await
    }

    async fn delete_voting_config_exclusions(
        &self,
        wait_for_removal: bool,
    ) -> Result<(), EsError> {
        self.delete_voting_config_exclusions_impl(wait_for_removal)
            .await
    }

    async fn cluster_bootstrapped_for_zen2(&self) -> Result<bool, EsError> {
        self.base.cluster_bootstrapped_for_zen2().await
    }

    async fn synced_flush(&self) -> Result<(), EsError> {
        self.base.synced_flush().await
    }

    async fn flush(&self) -> Result<(), EsError> {
        self.base.flush().await
    }

    async fn get_nodes(&self) -> Result<Nodes, EsError> {
        self.base.get_nodes().await
    }

    async fn get_nodes_stats(&self) -> Result<NodesStats, EsError> {
        self.base.get_nodes_stats().await
    }

    async fn get_license(&self) -> Result<License, EsError> {
        let response: LicenseResponse = self.base.get("/_license").await?;
        Ok(response.license)
    }

    async fn update_license(
        &self,
        licenses: LicenseUpdateRequest,
    ) -> Result<LicenseUpdateResponse, EsError> {
        self.base
            .post(
                "/_license?acknowledge=true",
                Some(serde_json::to_value(licenses)?),
            )
            .await
    }

    async fn start_basic(&self) -> Result<StartBasicResponse, EsError> {
        self.base
            .post("/_license/start_basic?acknowledge=true", None)
            .await
    }

    async fn start_trial(&self) -> Result<StartTrialResponse, EsError> {
        self.base
            .post("/_license/start_trial?acknowledge=true", None)
            .await
    }

    async fn reload_secure_settings(&self) -> Result<(), EsError> {
        self.base.reload_secure_settings().await
    }
}
