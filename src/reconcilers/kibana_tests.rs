// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Unit tests for `kibana.rs`

use std::sync::Arc;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};

use super::{compute_status, es_cache_finalizer};
use crate::crd::KibanaHealth;
use crate::es::cache::ClientCache;
use crate::expectations::Expectations;
use crate::labels::ES_CLIENT_CACHE_FINALIZER;
use crate::names::NamespacedName;
use crate::watches::WatchRegistry;

fn deployment_with_available(available: Option<i32>) -> Deployment {
    Deployment {
        status: Some(DeploymentStatus {
            available_replicas: available,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn test_compute_status_green() {
    let status = compute_status(&deployment_with_available(Some(2)));
    assert_eq!(status.available_nodes, 2);
    assert_eq!(status.health, KibanaHealth::Green);
}

#[test]
fn test_compute_status_red() {
    let status = compute_status(&deployment_with_available(Some(0)));
    assert_eq!(status.available_nodes, 0);
    assert_eq!(status.health, KibanaHealth::Red);

    let status = compute_status(&deployment_with_available(None));
    assert_eq!(status.health, KibanaHealth::Red);

    let status = compute_status(&Deployment::default());
    assert_eq!(status.health, KibanaHealth::Red);
}

#[test]
fn test_health_transition_events() {
    // replicas 0 -> 1: pending to green, not a degradation
    let pending_to_green = compute_status(&deployment_with_available(Some(1)));
    assert!(!pending_to_green.is_degraded(None));

    // replicas 1 -> 0: green to red fires Unhealthy
    let green = compute_status(&deployment_with_available(Some(1)));
    let red = compute_status(&deployment_with_available(Some(0)));
    assert!(red.is_degraded(Some(&green)));
}

#[tokio::test]
async fn test_es_cache_finalizer_clears_owner_state() {
    let cache = Arc::new(ClientCache::new());
    let expectations = Arc::new(Expectations::new());
    let watches = Arc::new(WatchRegistry::new());
    let owner = NamespacedName::new("default", "main");

    expectations.expect_creations(&owner, 1);
    assert!(!expectations.satisfied(&owner));

    let finalizer = es_cache_finalizer(
        Arc::clone(&cache),
        Arc::clone(&expectations),
        Arc::clone(&watches),
        owner.clone(),
    );
    assert_eq!(finalizer.name, ES_CLIENT_CACHE_FINALIZER);

    (finalizer.execute)().await.unwrap();
    assert!(expectations.satisfied(&owner));

    // idempotent
    (finalizer.execute)().await.unwrap();
}
