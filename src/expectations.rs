// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! In-flight creation/deletion expectations.
//!
//! The Kubernetes client cache can lag behind the apiserver: a resource
//! created during one reconciliation may not show up in a list issued by the
//! next one, tempting the controller to create it twice. Expectations
//! mitigate this: the reconciler increments a per-owner counter before every
//! create/delete it issues, the watch layer decrements it when the matching
//! event is observed, and reconciliation short-circuits (requeue) until both
//! counters are back to zero.
//!
//! Counters never go negative: a decrement at zero is a leftover event from
//! a previous controller incarnation and is ignored. Each owner's counters
//! also carry a TTL (5 minutes); once exceeded they reset to zero, so a
//! missed event cannot wedge an owner forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::names::NamespacedName;

/// Default expectations time-to-live for events that never arrive.
pub const EXPECTATIONS_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-owner creation/deletion expectations. Safe for concurrent use.
pub struct Expectations {
    counters: RwLock<HashMap<NamespacedName, Arc<Counters>>>,
    ttl: Duration,
}

impl Default for Expectations {
    fn default() -> Self {
        Self::new()
    }
}

impl Expectations {
    /// Expectations with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(EXPECTATIONS_TTL)
    }

    /// Expectations with a custom TTL (used in tests).
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Expectations {
            counters: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Record `n` expected creations for the owner.
    pub fn expect_creations(&self, owner: &NamespacedName, n: i64) {
        self.get_or_create(owner).add_creations(n);
    }

    /// Record `n` expected deletions for the owner.
    pub fn expect_deletions(&self, owner: &NamespacedName, n: i64) {
        self.get_or_create(owner).add_deletions(n);
    }

    /// Observe one creation event, cancelling one expected creation.
    pub fn creation_observed(&self, owner: &NamespacedName) {
        self.get_or_create(owner).add_creations(-1);
    }

    /// Observe one deletion event, cancelling one expected deletion.
    pub fn deletion_observed(&self, owner: &NamespacedName) {
        self.get_or_create(owner).add_deletions(-1);
    }

    /// True when no creations or deletions are pending for the owner,
    /// i.e. the local cache can be considered in sync.
    #[must_use]
    pub fn satisfied(&self, owner: &NamespacedName) -> bool {
        let (creations, deletions) = self.get_or_create(owner).get(self.ttl);
        creations == 0 && deletions == 0
    }

    /// Drop all state for the owner. Called from the owner's finalizer.
    pub fn forget(&self, owner: &NamespacedName) {
        self.counters
            .write()
            .expect("expectations lock poisoned")
            .remove(owner);
    }

    fn get_or_create(&self, owner: &NamespacedName) -> Arc<Counters> {
        if let Some(counters) = self
            .counters
            .read()
            .expect("expectations lock poisoned")
            .get(owner)
        {
            return Arc::clone(counters);
        }
        let mut map = self.counters.write().expect("expectations lock poisoned");
        Arc::clone(map.entry(owner.clone()).or_insert_with(|| Arc::new(Counters::new())))
    }
}

/// Atomic creation/deletion counters with a last-activity timestamp.
struct Counters {
    creations: AtomicI64,
    deletions: AtomicI64,
    // milliseconds since `epoch`, updated on every add
    last_activity_ms: AtomicI64,
    epoch: Instant,
}

impl Counters {
    fn new() -> Self {
        Counters {
            creations: AtomicI64::new(0),
            deletions: AtomicI64::new(0),
            last_activity_ms: AtomicI64::new(0),
            epoch: Instant::now(),
        }
    }

    fn touch(&self) {
        let elapsed = i64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }

    fn expired(&self, ttl: Duration) -> bool {
        let elapsed = i64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(i64::MAX);
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        elapsed - last > i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn add_creations(&self, value: i64) {
        Self::add(&self.creations, value);
        self.touch();
    }

    fn add_deletions(&self, value: i64) {
        Self::add(&self.deletions, value);
        self.touch();
    }

    /// Add with a zero floor: a decrement that would go negative is undone.
    fn add(counter: &AtomicI64, value: i64) {
        let new = counter.fetch_add(value, Ordering::AcqRel) + value;
        if new < 0 && value < 0 {
            counter.fetch_add(-value, Ordering::AcqRel);
        }
    }

    fn get(&self, ttl: Duration) -> (i64, i64) {
        if self.expired(ttl) {
            self.creations.store(0, Ordering::Release);
            self.deletions.store(0, Ordering::Release);
            self.touch();
        }
        (
            self.creations.load(Ordering::Acquire).max(0),
            self.deletions.load(Ordering::Acquire).max(0),
        )
    }
}

#[cfg(test)]
#[path = "expectations_tests.rs"]
mod expectations_tests;
