// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Wire models of the Elasticsearch REST API.
//!
//! Only the fields the operator actually reads are modeled; everything else
//! passes through untouched. Serde defaults keep the models tolerant of the
//! considerable response-shape drift between 6.x, 7.x and 8.x.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root endpoint (`GET /`) response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: String,
    #[serde(default)]
    pub version: InfoVersion,
}

/// Version block of the root endpoint response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InfoVersion {
    #[serde(default)]
    pub number: String,
}

/// Cluster health color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthColor {
    #[default]
    Red,
    Yellow,
    Green,
}

/// `GET /_cluster/health` response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub status: HealthColor,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: i32,
    #[serde(default)]
    pub number_of_data_nodes: i32,
    #[serde(default)]
    pub active_primary_shards: i32,
    #[serde(default)]
    pub active_shards: i32,
    #[serde(default)]
    pub relocating_shards: i32,
    #[serde(default)]
    pub initializing_shards: i32,
    #[serde(default)]
    pub unassigned_shards: i32,
    #[serde(default)]
    pub number_of_pending_tasks: i32,
}

/// Subset of `GET /_cluster/state` (6.x only).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterState {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub master_node: String,
    #[serde(default)]
    pub nodes: HashMap<String, ClusterStateNode>,
}

/// A node entry of the cluster state.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterStateNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub transport_address: String,
}

impl ClusterState {
    /// Name of the current master node, if the cluster state knows one.
    #[must_use]
    pub fn master_node_name(&self) -> Option<&str> {
        self.nodes.get(&self.master_node).map(|n| n.name.as_str())
    }
}

/// `GET /_nodes/...` response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Nodes {
    #[serde(default)]
    pub nodes: HashMap<String, Node>,
}

/// A node entry of the nodes API.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Node {
    /// True iff the node runs Elasticsearch 7 or above.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the reported version is not semver.
    pub fn is_v7_or_above(&self) -> Result<bool, semver::Error> {
        let version = semver::Version::parse(&self.version)?;
        Ok(version.major >= 7)
    }
}

/// `GET /_nodes/_all/stats/os` response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodesStats {
    #[serde(default)]
    pub nodes: HashMap<String, NodeStats>,
}

/// Per-node stats entry; only the OS block is read.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeStats {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub os: serde_json::Value,
}

/// An Elasticsearch license as returned by the license API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date_in_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date_in_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issued_to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
}

/// Wrapper of the `GET /_license` response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LicenseResponse {
    #[serde(default)]
    pub license: License,
}

/// Body of a license update request.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LicenseUpdateRequest {
    pub licenses: Vec<License>,
}

/// Response of a license update request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LicenseUpdateResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub license_status: String,
}

/// Response of `POST /_license/start_basic`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StartBasicResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub basic_was_started: bool,
    #[serde(default)]
    pub error_message: String,
}

/// Response of `POST /_license/start_trial`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StartTrialResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub trial_was_started: bool,
    #[serde(default)]
    pub error_message: String,
}

/// `GET /_cluster/settings` routing allocation view.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterRoutingAllocation {
    #[serde(default)]
    pub transient: AllocationSettings,
    #[serde(default)]
    pub persistent: AllocationSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AllocationSettings {
    #[serde(default)]
    pub cluster: ClusterRoutingSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterRoutingSettings {
    #[serde(default)]
    pub routing: RoutingSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoutingSettings {
    #[serde(default)]
    pub allocation: RoutingAllocationSettings,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoutingAllocationSettings {
    #[serde(default)]
    pub enable: String,
    #[serde(default)]
    pub exclude: AllocationExclude,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AllocationExclude {
    #[serde(rename = "_name", default)]
    pub name: String,
}

impl ClusterRoutingAllocation {
    /// The transient allocation-enable value, empty when unset.
    #[must_use]
    pub fn allocation_enable(&self) -> &str {
        &self.transient.cluster.routing.allocation.enable
    }

    /// The transient shard-allocation exclude list, empty when unset.
    #[must_use]
    pub fn excluded_nodes(&self) -> &str {
        &self.transient.cluster.routing.allocation.exclude.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_parsing() {
        let body = r#"{
            "cluster_name": "main",
            "status": "green",
            "timed_out": false,
            "number_of_nodes": 3,
            "number_of_data_nodes": 3,
            "active_primary_shards": 10,
            "active_shards": 20
        }"#;
        let health: Health = serde_json::from_str(body).unwrap();
        assert_eq!(health.status, HealthColor::Green);
        assert_eq!(health.number_of_nodes, 3);
    }

    #[test]
    fn test_health_timed_out_body() {
        // a 408 on wait_for_events still carries a decodable body
        let body = r#"{"cluster_name": "main", "status": "yellow", "timed_out": true}"#;
        let health: Health = serde_json::from_str(body).unwrap();
        assert!(health.timed_out);
        assert_eq!(health.status, HealthColor::Yellow);
    }

    #[test]
    fn test_node_version_check() {
        let node = Node {
            name: "node-0".to_string(),
            version: "7.5.0".to_string(),
            roles: vec!["master".to_string()],
        };
        assert!(node.is_v7_or_above().unwrap());

        let node = Node {
            version: "6.8.2".to_string(),
            ..Default::default()
        };
        assert!(!node.is_v7_or_above().unwrap());

        let node = Node {
            version: "unknown".to_string(),
            ..Default::default()
        };
        assert!(node.is_v7_or_above().is_err());
    }

    #[test]
    fn test_cluster_state_master_resolution() {
        let body = r#"{
            "cluster_name": "main",
            "master_node": "abc123",
            "nodes": {
                "abc123": {"name": "main-es-0", "transport_address": "10.0.0.1:9300"},
                "def456": {"name": "main-es-1", "transport_address": "10.0.0.2:9300"}
            }
        }"#;
        let state: ClusterState = serde_json::from_str(body).unwrap();
        assert_eq!(state.master_node_name(), Some("main-es-0"));
    }

    #[test]
    fn test_routing_allocation_parsing() {
        let body = r#"{
            "transient": {
                "cluster": {
                    "routing": {
                        "allocation": {
                            "enable": "all",
                            "exclude": {"_name": "node-0,node-1"}
                        }
                    }
                }
            }
        }"#;
        let allocation: ClusterRoutingAllocation = serde_json::from_str(body).unwrap();
        assert_eq!(allocation.allocation_enable(), "all");
        assert_eq!(allocation.excluded_nodes(), "node-0,node-1");
    }

    #[test]
    fn test_license_roundtrip() {
        let license = License {
            uid: "893361dc-9749-4997-93cb-802e3d7fa4xx".to_string(),
            r#type: "platinum".to_string(),
            issue_date_in_millis: Some(1548115200000),
            expiry_date_in_millis: Some(1561247999999),
            issued_to: "test".to_string(),
            issuer: "elasticsearch".to_string(),
            max_nodes: Some(100),
            signature: "xx".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&LicenseUpdateRequest {
            licenses: vec![license.clone()],
        })
        .unwrap();
        assert!(json.contains("\"platinum\""));

        let parsed: LicenseResponse =
            serde_json::from_str(&format!("{{\"license\": {}}}", serde_json::to_string(&license).unwrap()))
                .unwrap();
        assert_eq!(parsed.license, license);
    }
}
