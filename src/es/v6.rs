// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Client for the Elasticsearch 6.x API family.

use async_trait::async_trait;

use super::error::EsError;
use super::http::BaseClient;
use super::model::{
    ClusterRoutingAllocation, ClusterState, Health, Info, License, LicenseResponse,
    LicenseUpdateRequest, LicenseUpdateResponse, Nodes, NodesStats, StartBasicResponse,
    StartTrialResponse,
};
use super::{ClientDescriptor, Elasticsearch};

pub struct ClientV6 {
    base: BaseClient,
}

impl ClientV6 {
    pub(crate) fn new(base: BaseClient) -> Self {
        ClientV6 { base }
    }
}

#[async_trait]
impl Elasticsearch for ClientV6 {
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
        self.base
            .get("/_cluster/state/master_node,nodes,routing_table")
            .await
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
        // both transient and persistent, so the quorum survives restarts
        self.base
            .update_settings(serde_json::json!({
                "transient": { "discovery.zen.minimum_master_nodes": n },
                "persistent": { "discovery.zen.minimum_master_nodes": n }
            }))
            .await
    }

    async fn add_voting_config_exclusions(
        &self,
        _node_names: &[String],
        _timeout: &str,
    ) -> Result<(), EsError> {
        Err(EsError::NotSupported {
            operation: "voting config exclusions",
            major: 6,
        })
    }

    async fn delete_voting_config_exclusions(
        &self,
        _wait_for_removal: bool,
    ) -> Result<(), EsError> {
        Err(EsError::NotSupported {
            operation: "voting config exclusions",
            major: 6,
        })
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
        let response: LicenseResponse = self.base.get("/_xpack/license").await?;
        Ok(response.license)
    }

    async fn update_license(
        &self,
        licenses: LicenseUpdateRequest,
    ) -> Result<LicenseUpdateResponse, EsError> {
        self.base
            .post(
                "/_xpack/license?acknowledge=true",
                Some(serde_json::to_value(licenses)?),
            )
            .await
    }

    async fn start_basic(&self) -> Result<StartBasicResponse, EsError> {
        self.base
            .post("/_xpack/license/start_basic?acknowledge=true", None)
            .await
    }

    async fn start_trial(&self) -> Result<StartTrialResponse, EsError> {
        self.base
            .post("/_xpack/license/start_trial?acknowledge=true", None)
            .await
    }

    async fn reload_secure_settings(&self) -> Result<(), EsError> {
        self.base.reload_secure_settings().await
    }
}
