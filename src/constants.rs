// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Global constants for the elasticop operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the Kibana CRD
pub const API_GROUP: &str = "kibana.k8s.elastic.co";

/// API version for the Kibana CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "kibana.k8s.elastic.co/v1alpha1";

/// Kind name for the `Kibana` resource
pub const KIND_KIBANA: &str = "Kibana";

// ============================================================================
// Kibana Constants
// ============================================================================

/// HTTP port served by Kibana
pub const KIBANA_HTTP_PORT: i32 = 5601;

/// Name of the main Kibana container
pub const KIBANA_CONTAINER_NAME: &str = "kibana";

/// Name of the keystore init container
pub const INIT_KEYSTORE_CONTAINER_NAME: &str = "init-keystore";

/// Default container registry and image, completed with the declared version
pub const DEFAULT_IMAGE_REPOSITORY: &str = "docker.elastic.co/kibana/kibana";

/// Keystore binary shipped in the Kibana image
pub const KIBANA_KEYSTORE_BIN: &str = "bin/kibana-keystore";

/// Default memory request and limit for the Kibana container
pub const DEFAULT_MEMORY_LIMIT: &str = "1Gi";

/// Suffix appended to the owner name for the Deployment
pub const DEPLOYMENT_SUFFIX: &str = "kb";

/// Suffix appended to the owner name for the HTTP Service
pub const HTTP_SERVICE_SUFFIX: &str = "kb-http";

// ============================================================================
// Mount Paths
// ============================================================================

/// Kibana configuration directory
pub const CONFIG_MOUNT_PATH: &str = "/usr/share/kibana/config";

/// Kibana data directory (keystore is propagated here by the init container)
pub const DATA_MOUNT_PATH: &str = "/usr/share/kibana/data";

/// Mount point of the user-provided secure settings secret
pub const SECURE_SETTINGS_MOUNT_PATH: &str = "/mnt/elastic-internal/secure-settings";

/// Mount point of the managed instance's own HTTP certificates
pub const HTTP_CERTS_MOUNT_PATH: &str = "/mnt/elastic-internal/http-certs";

/// Mount point of the mirrored Elasticsearch CA certificates
pub const ES_CERTS_MOUNT_PATH: &str = "/usr/share/kibana/config/elasticsearch-certs";

/// File name of the CA certificate inside CA secrets
pub const CA_FILE_NAME: &str = "ca.pem";

// ============================================================================
// Kubernetes Health Check Constants
// ============================================================================

/// Readiness/liveness probe initial delay (wait for Kibana to start)
pub const PROBE_INITIAL_DELAY_SECS: i32 = 10;

/// Probe period (how often to check)
pub const PROBE_PERIOD_SECS: i32 = 10;

/// Probe timeout
pub const PROBE_TIMEOUT_SECS: i32 = 5;

/// Probe failure threshold
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;

/// Probe success threshold
pub const PROBE_SUCCESS_THRESHOLD: i32 = 1;

// ============================================================================
// Controller Constants
// ============================================================================

/// Requeue duration while an owner is paused (10 seconds)
pub const PAUSE_REQUEUE_SECS: u64 = 10;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration after an update conflict
pub const CONFLICT_REQUEUE_SECS: u64 = 1;

/// Requeue duration while waiting for expectations to be satisfied
pub const EXPECTATIONS_REQUEUE_SECS: u64 = 5;

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Elasticsearch Client Constants
// ============================================================================

/// Default timeout applied to every Elasticsearch API call (3 minutes)
pub const ES_CLIENT_TIMEOUT_SECS: u64 = 180;

/// Default timeout for adding voting config exclusions (pre-7.8 path form)
pub const DEFAULT_VOTING_CONFIG_EXCLUSIONS_TIMEOUT: &str = "30s";

// ============================================================================
// Certificate Constants
// ============================================================================

/// Validity of the self-signed HTTP CA (1 year)
pub const CA_VALIDITY_DAYS: i64 = 365;

/// Default time before expiry at which the HTTP CA is rotated (24 hours)
pub const CA_ROTATE_BEFORE_SECS: u64 = 24 * 60 * 60;

/// Naming convention for the public HTTP certs secret of an Elasticsearch cluster
pub const ES_HTTP_CERTS_PUBLIC_SUFFIX: &str = "es-http-certs-public";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default port for the Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for the metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
