// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Client for the Elasticsearch 8.x API family.
//!
//! 8.x is a strict descendant of the 7.8+ surface: the synced flush and the
//! zen1 minimum-master-nodes setting are gone, everything else matches the
//! 7.x client, to which this one delegates.

use async_trait::async_trait;

use super::error::EsError;
use super::http::BaseClient;
use super::model::{
    ClusterRoutingAllocation, ClusterState, Health, Info, License, LicenseUpdateRequest,
    LicenseUpdateResponse, Nodes, NodesStats, StartBasicResponse, StartTrialResponse,
};
use super::v7::ClientV7;
use super::{ClientDescriptor, Elasticsearch};

pub struct ClientV8 {
    v7: ClientV7,
}

impl ClientV8 {
    pub(crate) fn new(base: BaseClient) -> Self {
        ClientV8 {
            v7: ClientV7::new(base),
        }
    }
}

#[async_trait]
impl Elasticsearch for ClientV8 {
    fn version(&self) -> &semver::Version {
        &self.v7.base().version
    }

    fn descriptor(&self) -> ClientDescriptor {
        self.v7.base().descriptor()
    }

    async fn get_cluster_info(&self) -> Result<Info, EsError> {
        self.v7.get_cluster_info().await
    }

    async fn get_cluster_health(&self) -> Result<Health, EsError> {
        self.v7.get_cluster_health().await
    }

    async fn get_cluster_health_wait_for_all_events(&self) -> Result<Health, EsError> {
        self.v7.get_cluster_health_wait_for_all_events().await
    }

    async fn get_cluster_state(&self) -> Result<ClusterState, EsError> {
        Err(EsError::NotSupported {
            operation: "cluster state",
            major: 8,
        })
    }

    async fn get_cluster_routing_allocation(&self) -> Result<ClusterRoutingAllocation, EsError> {
        self.v7.get_cluster_routing_allocation().await
    }

    async fn update_settings(&self, settings: serde_json::Value) -> Result<(), EsError> {
        self.v7.update_settings(settings).await
    }

    async fn exclude_from_shard_allocation(&self, nodes: &str) -> Result<(), EsError> {
        self.v7.exclude_from_shard_allocation(nodes).await
    }

    async fn enable_shard_allocation(&self) -> Result<(), EsError> {
        self.v7.enable_shard_allocation().await
    }

    async fn disable_replica_shards_allocation(&self) -> Result<(), EsError> {
        self.v7.disable_replica_shards_allocation().await
    }

    async fn set_minimum_master_nodes(&self, _n: i32) -> Result<(), EsError> {
        Err(EsError::NotSupported {
            operation: "minimum master nodes",
            major: 8,
        })
    }

    async fn add_voting_config_exclusions(
        &self,
        node_names: &[String],
        timeout: &str,
    ) -> Result<(), EsError> {
        // always the node_names query form: 8.x is past the 7.8 cutover
        self.v7
            .add_voting_config_exclusions_versioned(node_names, timeout)
            .await
    }

    async fn delete_voting_config_exclusions(
        &self,
        wait_for_removal: bool,
    ) -> Result<(), EsError> {
        self.v7
            .delete_voting_config_exclusions_impl(wait_for_removal)
            .await
    }

    async fn cluster_bootstrapped_for_zen2(&self) -> Result<bool, EsError> {
        self.v7.cluster_bootstrapped_for_zen2().await
    }

    async fn synced_flush(&self) -> Result<(), EsError> {
        Err(EsError::NotSupported {
            operation: "synced flush",
            major: 8,
        })
    }

    async fn flush(&self) -> Result<(), EsError> {
        self.v7.flush().await
    }

    async fn get_nodes(&self) -> Result<Nodes, EsError> {
        self.v7.get_nodes().await
    }

    async fn get_nodes_stats(&self) -> Result<NodesStats, EsError> {
        self.v7.get_nodes_stats().await
    }

    async fn get_license(&self) -> Result<License, EsError> {
        self.v7.get_license().await
    }

    async fn update_license(
        &self,
        licenses: LicenseUpdateRequest,
    ) -> Result<LicenseUpdateResponse, EsError> {
        self.v7.update_license(licenses).await
    }

    async fn start_basic(&self) -> Result<StartBasicResponse, EsError> {
        self.v7.start_basic().await
    }

    async fn start_trial(&self) -> Result<StartTrialResponse, EsError> {
        self.v7.start_trial().await
    }

    async fn reload_secure_settings(&self) -> Result<(), EsError> {
        self.v7.reload_secure_settings().await
    }
}
