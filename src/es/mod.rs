// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Versioned Elasticsearch HTTP client.
//!
//! One [`Elasticsearch`] trait abstracts the REST differences between the
//! 6.x, 7.x and 8.x API families; the implementation is selected once, at
//! construction, from the declared cluster version. All implementations
//! share a common base handling transport, auth, timeouts and error mapping.
//!
//! Version-dependent surface at a glance:
//!
//! | Operation | 6.x | 7.x | 8.x |
//! |---|---|---|---|
//! | license API | `/_xpack/license` | `/_license` | `/_license` |
//! | minimum master nodes | zen settings | accepted (bwc) | error |
//! | voting config exclusions | error | path / `node_names` at 7.8 | `node_names` |
//! | synced flush | `/_flush/synced` | `/_flush/synced` | error |
//!
//! A fresh client is constructed per reconcile so rotated credentials are
//! picked up; dropping the client closes its idle connections.

pub mod cache;
pub mod error;
pub mod model;

mod http;
mod tls;
mod v6;
mod v7;
mod v8;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

pub use error::{ApiError, EsError};
use http::BaseClient;
use model::{
    ClusterRoutingAllocation, ClusterState, Health, Info, License, LicenseUpdateRequest,
    LicenseUpdateResponse, Nodes, NodesStats, StartBasicResponse, StartTrialResponse,
};
pub use v6::ClientV6;
pub use v7::ClientV7;
pub use v8::ClientV8;

/// Maps an endpoint host name to an override socket address, standing in for
/// a custom network dialer (used by port-forwarding test setups).
pub type DialerFn = Arc<dyn Fn(&str) -> Option<SocketAddr> + Send + Sync>;

/// Basic-auth credentials of the operator's Elasticsearch user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAuth {
    pub name: String,
    pub password: String,
}

/// Identity of a client handle. Two clients are interchangeable iff their
/// descriptors are equal: same version, endpoint, user, and CA certificates
/// (by byte identity).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientDescriptor {
    pub version: semver::Version,
    pub endpoint: String,
    pub user: Option<String>,
    pub ca_certs: Vec<Vec<u8>>,
}

/// The capability set every versioned client implements.
///
/// Every call runs under the default 3-minute timeout of the underlying
/// transport. Operations missing from an API family return
/// [`EsError::NotSupported`] without a network round-trip.
#[async_trait]
pub trait Elasticsearch: Send + Sync {
    /// The cluster version this client was built for.
    fn version(&self) -> &semver::Version;

    /// Identity of this handle, for equality checks.
    fn descriptor(&self) -> ClientDescriptor;

    /// True if the other client is bound to the same (version, endpoint,
    /// user, CA set).
    fn equal(&self, other: &dyn Elasticsearch) -> bool {
        self.descriptor() == other.descriptor()
    }

    async fn get_cluster_info(&self) -> Result<Info, EsError>;
    async fn get_cluster_health(&self) -> Result<Health, EsError>;
    /// Cluster health with `wait_for_events=languid&timeout=0s`; a 408 is
    /// decoded as a normal response.
    async fn get_cluster_health_wait_for_all_events(&self) -> Result<Health, EsError>;
    /// Cluster state; removed from the surface after 6.x.
    async fn get_cluster_state(&self) -> Result<ClusterState, EsError>;

    async fn get_cluster_routing_allocation(&self) -> Result<ClusterRoutingAllocation, EsError>;
    async fn update_settings(&self, settings: serde_json::Value) -> Result<(), EsError>;
    /// Configure transient allocation excludes for a comma-separated list of
    /// node names.
    async fn exclude_from_shard_allocation(&self, nodes: &str) -> Result<(), EsError>;
    async fn enable_shard_allocation(&self) -> Result<(), EsError>;
    async fn disable_replica_shards_allocation(&self) -> Result<(), EsError>;
    /// Set `discovery.zen.minimum_master_nodes`. Only meaningful on 6.x;
    /// accepted for backwards compatibility on 7.x; an error on 8.x.
    async fn set_minimum_master_nodes(&self, n: i32) -> Result<(), EsError>;

    /// Add Zen2 voting config exclusions (7.x+). An empty timeout selects
    /// the default where the API takes one.
    async fn add_voting_config_exclusions(
        &self,
        node_names: &[String],
        timeout: &str,
    ) -> Result<(), EsError>;
    /// Delete all Zen2 voting config exclusions (7.x+).
    async fn delete_voting_config_exclusions(&self, wait_for_removal: bool)
        -> Result<(), EsError>;
    /// True iff the current master runs 7.x or above.
    async fn cluster_bootstrapped_for_zen2(&self) -> Result<bool, EsError>;

    /// Synced flush; removed in the 8.x API family.
    async fn synced_flush(&self) -> Result<(), EsError>;
    async fn flush(&self) -> Result<(), EsError>;

    async fn get_nodes(&self) -> Result<Nodes, EsError>;
    async fn get_nodes_stats(&self) -> Result<NodesStats, EsError>;

    async fn get_license(&self) -> Result<License, EsError>;
    async fn update_license(
        &self,
        licenses: LicenseUpdateRequest,
    ) -> Result<LicenseUpdateResponse, EsError>;
    async fn start_basic(&self) -> Result<StartBasicResponse, EsError>;
    async fn start_trial(&self) -> Result<StartTrialResponse, EsError>;

    /// Decrypt and re-read the keystore on every node; only reloadable
    /// secure settings take effect.
    async fn reload_secure_settings(&self) -> Result<(), EsError>;
}

/// Create a client for the target cluster, selecting the implementation
/// matching the major version.
///
/// `ca_certs` are PEM bundles the server chain is verified against (with
/// hostname verification disabled, since pod DNS names are not predictable).
/// An empty list leaves the default transport verification in place.
///
/// # Errors
///
/// Fails for unsupported major versions or unusable TLS material.
pub fn new_client(
    dialer: Option<&DialerFn>,
    endpoint: &str,
    auth: Option<UserAuth>,
    version: semver::Version,
    ca_certs: Vec<Vec<u8>>,
) -> Result<Arc<dyn Elasticsearch>, EsError> {
    let major = version.major;
    let base = BaseClient::new(dialer, endpoint, auth, version, ca_certs)?;
    match major {
        6 => Ok(Arc::new(ClientV6::new(base))),
        7 => Ok(Arc::new(ClientV7::new(base))),
        8 => Ok(Arc::new(ClientV8::new(base))),
        _ => Err(EsError::UnsupportedVersion { major }),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
