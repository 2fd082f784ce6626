// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every reconcile receives an `Arc<Context>` carrying the Kubernetes
//! client, the dynamic watch registry, the expectation tracker, the cached
//! Elasticsearch client state and the metrics registry. All of it is cheap
//! to clone and safe for concurrent use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kube::runtime::events::Recorder;
use kube::Client;

use crate::es::cache::ClientCache;
use crate::expectations::Expectations;
use crate::metrics::Metrics;
use crate::roles::Parameters;
use crate::watches::WatchRegistry;

/// Shared state of the operator process.
pub struct Context {
    /// Kubernetes client for API operations.
    pub client: Client,

    /// Event recorder for user-visible state changes.
    pub recorder: Recorder,

    /// Dynamic watch registry (secrets, pods, referenced clusters).
    pub watches: Arc<WatchRegistry>,

    /// In-flight creation/deletion expectations.
    pub expectations: Arc<Expectations>,

    /// Cached Elasticsearch client state per owner.
    pub es_client_cache: Arc<ClientCache>,

    /// Prometheus metrics.
    pub metrics: Metrics,

    /// Operator startup parameters.
    pub parameters: Parameters,

    /// Version of the running operator build, for the controller-version gate.
    pub operator_version: semver::Version,

    iteration: AtomicU64,
}

impl Context {
    #[must_use]
    pub fn new(
        client: Client,
        recorder: Recorder,
        parameters: Parameters,
        operator_version: semver::Version,
    ) -> Self {
        Context {
            client,
            recorder,
            watches: Arc::new(WatchRegistry::new()),
            expectations: Arc::new(Expectations::new()),
            es_client_cache: Arc::new(ClientCache::new()),
            metrics: Metrics::new(),
            parameters,
            operator_version,
            iteration: AtomicU64::new(0),
        }
    }

    /// Next reconcile iteration number, for tracing.
    pub fn next_iteration(&self) -> u64 {
        self.iteration.fetch_add(1, Ordering::Relaxed) + 1
    }
}
