// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Prometheus metrics and the metrics HTTP server.

use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use tracing::info;

use crate::constants::{METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH};

/// Operator metrics, registered against a dedicated registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub reconciliations_total: IntCounter,
    pub reconciliation_errors_total: IntCounter,
    pub reconciliation_duration: Histogram,
    pub es_cache_hits_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create and register all metrics.
    ///
    /// # Panics
    ///
    /// Panics if a metric is registered twice, which only happens on a
    /// programming error at startup.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let reconciliations_total = IntCounter::new(
            "elasticop_reconciliations_total",
            "Total number of reconcile iterations",
        )
        .expect("valid metric");
        let reconciliation_errors_total = IntCounter::new(
            "elasticop_reconciliation_errors_total",
            "Total number of failed reconcile iterations",
        )
        .expect("valid metric");
        let reconciliation_duration = Histogram::with_opts(HistogramOpts::new(
            "elasticop_reconciliation_duration_seconds",
            "Wall-clock duration of reconcile iterations",
        ))
        .expect("valid metric");
        let es_cache_hits_total = IntCounter::new(
            "elasticop_es_cache_hits_total",
            "Elasticsearch setter calls suppressed by the client cache",
        )
        .expect("valid metric");

        registry
            .register(Box::new(reconciliations_total.clone()))
            .expect("unique metric");
        registry
            .register(Box::new(reconciliation_errors_total.clone()))
            .expect("unique metric");
        registry
            .register(Box::new(reconciliation_duration.clone()))
            .expect("unique metric");
        registry
            .register(Box::new(es_cache_hits_total.clone()))
            .expect("unique metric");

        Metrics {
            registry,
            reconciliations_total,
            reconciliation_errors_total,
            reconciliation_duration,
            es_cache_hits_total,
        }
    }

    /// Render the registry in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Serve the metrics endpoint until the process exits.
///
/// # Errors
///
/// Returns an error if binding the listen address fails.
pub async fn serve(metrics: Metrics, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{METRICS_SERVER_BIND_ADDRESS}:{port}").parse()?;
    let app = Router::new().route(
        METRICS_SERVER_PATH,
        get(move || {
            let metrics = metrics.clone();
            async move { metrics.render() }
        }),
    );

    info!(%addr, "Starting metrics server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render() {
        let metrics = Metrics::new();
        metrics.reconciliations_total.inc();
        metrics.reconciliations_total.inc();
        metrics.es_cache_hits_total.inc();

        let rendered = metrics.render();
        assert!(rendered.contains("elasticop_reconciliations_total 2"));
        assert!(rendered.contains("elasticop_es_cache_hits_total 1"));
    }
}
