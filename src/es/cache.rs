// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Per-cluster cached client.
//!
//! The reconcile loop re-applies the same idempotent settings over and over:
//! shard-allocation excludes, minimum master nodes, voting-config
//! exclusions. The cached wrapper memoizes the last successfully-applied
//! value of each per owner and skips the API round-trip when the requested
//! value matches. Correctness under errors is preserved by invalidating the
//! cached value on any API failure, so the next call necessarily hits the
//! server.
//!
//! Cache entries live until an explicit [`ClientCache::forget`], which is
//! bound to the owner's deletion finalizer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::EsError;
use super::model::{
    ClusterRoutingAllocation, ClusterState, Health, Info, License, LicenseUpdateRequest,
    LicenseUpdateResponse, Nodes, NodesStats, StartBasicResponse, StartTrialResponse,
};
use super::{ClientDescriptor, Elasticsearch};
use crate::names::NamespacedName;

/// Last-applied values of the cached setter APIs for one owner.
/// `None` means unknown: the next call must do a real round-trip.
#[derive(Default)]
struct CachedState {
    shard_allocation_excludes: Option<String>,
    minimum_master_nodes: Option<i32>,
    /// Sorted node names; `Some(vec![])` means "known to be empty", which is
    /// distinct from `None` (never observed or invalidated).
    voting_config_exclusions: Option<Vec<String>>,
}

/// Table of cached per-owner state. One instance lives for the whole
/// operator process; entries are created on first use.
#[derive(Default)]
pub struct ClientCache {
    states: RwLock<HashMap<NamespacedName, Arc<Mutex<CachedState>>>>,
}

impl ClientCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a freshly-built client with the cached state of the given owner.
    #[must_use]
    pub fn cached(
        &self,
        owner: &NamespacedName,
        client: Arc<dyn Elasticsearch>,
    ) -> CachedClient {
        CachedClient {
            state: self.state_for(owner),
            owner: owner.clone(),
            inner: client,
        }
    }

    /// Drop all cached state for an owner. Called from the owner's finalizer.
    pub fn forget(&self, owner: &NamespacedName) {
        self.states
            .write()
            .expect("client cache lock poisoned")
            .remove(owner);
    }

    fn state_for(&self, owner: &NamespacedName) -> Arc<Mutex<CachedState>> {
        if let Some(state) = self
            .states
            .read()
            .expect("client cache lock poisoned")
            .get(owner)
        {
            return Arc::clone(state);
        }
        let mut states = self.states.write().expect("client cache lock poisoned");
        Arc::clone(states.entry(owner.clone()).or_default())
    }
}

/// A client wrapper that suppresses idempotent setter calls whose value
/// matches the last successful application for this owner.
pub struct CachedClient {
    state: Arc<Mutex<CachedState>>,
    owner: NamespacedName,
    inner: Arc<dyn Elasticsearch>,
}

#[async_trait]
impl Elasticsearch for CachedClient {
    fn version(&self) -> &semver::Version {
        self.inner.version()
    }

    fn descriptor(&self) -> ClientDescriptor {
        self.inner.descriptor()
    }

    async fn get_cluster_info(&self) -> Result<Info, EsError> {
        self.inner.get_cluster_info().await
    }

    async fn get_cluster_health(&self) -> Result<Health, EsError> {
        self.inner.get_cluster_health().await
    }

    async fn get_cluster_health_wait_for_all_events(&self) -> Result<Health, EsError> {
        self.inner.get_cluster_health_wait_for_all_events().await
    }

    async fn get_cluster_state(&self) -> Result<ClusterState, EsError> {
        self.inner.get_cluster_state().await
    }

    async fn get_cluster_routing_allocation(&self) -> Result<ClusterRoutingAllocation, EsError> {
        self.inner.get_cluster_routing_allocation().await
    }

    async fn update_settings(&self, settings: serde_json::Value) -> Result<(), EsError> {
        self.inner.update_settings(settings).await
    }

    async fn exclude_from_shard_allocation(&self, nodes: &str) -> Result<(), EsError> {
        let mut state = self.state.lock().await;
        if state.shard_allocation_excludes.as_deref() == Some(nodes) {
            debug!(owner = %self.owner, nodes, "Shard allocation excludes unchanged, skipping API call");
            return Ok(());
        }
        match self.inner.exclude_from_shard_allocation(nodes).await {
            Ok(()) => {
                state.shard_allocation_excludes = Some(nodes.to_string());
                Ok(())
            }
            Err(e) => {
                state.shard_allocation_excludes = None;
                Err(e)
            }
        }
    }

    async fn enable_shard_allocation(&self) -> Result<(), EsError> {
        self.inner.enable_shard_allocation().await
    }

    async fn disable_replica_shards_allocation(&self) -> Result<(), EsError> {
        self.inner.disable_replica_shards_allocation().await
    }

    async fn set_minimum_master_nodes(&self, n: i32) -> Result<(), EsError> {
        let mut state = self.state.lock().await;
        if state.minimum_master_nodes == Some(n) {
            debug!(owner = %self.owner, n, "Minimum master nodes unchanged, skipping API call");
            return Ok(());
        }
        match self.inner.set_minimum_master_nodes(n).await {
            Ok(()) => {
                state.minimum_master_nodes = Some(n);
                Ok(())
            }
            Err(e) => {
                state.minimum_master_nodes = None;
                Err(e)
            }
        }
    }

    async fn add_voting_config_exclusions(
        &self,
        node_names: &[String],
        timeout: &str,
    ) -> Result<(), EsError> {
        let mut sorted: Vec<String> = node_names.to_vec();
        sorted.sort();

        let mut state = self.state.lock().await;
        if state.voting_config_exclusions.as_ref() == Some(&sorted) {
            debug!(owner = %self.owner, "Voting config exclusions unchanged, skipping API call");
            return Ok(());
        }
        match self.inner.add_voting_config_exclusions(&sorted, timeout).await {
            Ok(()) => {
                state.voting_config_exclusions = Some(sorted);
                Ok(())
            }
            Err(e) => {
                state.voting_config_exclusions = None;
                Err(e)
            }
        }
    }

    async fn delete_voting_config_exclusions(
        &self,
        wait_for_removal: bool,
    ) -> Result<(), EsError> {
        let mut state = self.state.lock().await;
        if state.voting_config_exclusions.as_ref().is_some_and(Vec::is_empty) {
            debug!(owner = %self.owner, "Voting config exclusions known empty, skipping API call");
            return Ok(());
        }
        match self
            .inner
            .delete_voting_config_exclusions(wait_for_removal)
            .await
        {
            Ok(()) => {
                state.voting_config_exclusions = Some(Vec::new());
                Ok(())
            }
            Err(e) => {
                state.voting_config_exclusions = None;
                Err(e)
            }
        }
    }

    async fn cluster_bootstrapped_for_zen2(&self) -> Result<bool, EsError> {
        self.inner.cluster_bootstrapped_for_zen2().await
    }

    async fn synced_flush(&self) -> Result<(), EsError> {
        self.inner.synced_flush().await
    }

    async fn flush(&self) -> Result<(), EsError> {
        self.inner.flush().await
    }

    async fn get_nodes(&self) -> Result<Nodes, EsError> {
        self.inner.get_nodes().await
    }

    async fn get_nodes_stats(&self) -> Result<NodesStats, EsError> {
        self.inner.get_nodes_stats().await
    }

    async fn get_license(&self) -> Result<License, EsError> {
        self.inner.get_license().await
    }

    async fn update_license(
        &self,
        licenses: LicenseUpdateRequest,
    ) -> Result<LicenseUpdateResponse, EsError> {
        self.inner.update_license(licenses).await
    }

    async fn start_basic(&self) -> Result<StartBasicResponse, EsError> {
        self.inner.start_basic().await
    }

    async fn start_trial(&self) -> Result<StartTrialResponse, EsError> {
        self.inner.start_trial().await
    }

    async fn reload_secure_settings(&self) -> Result<(), EsError> {
        self.inner.reload_secure_settings().await
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
