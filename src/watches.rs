// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Dynamic watch registry.
//!
//! Reconcilers register interest in secondary objects (secrets, pods,
//! referenced clusters) at runtime: a watch is installed when a reconcile
//! discovers a reference and revoked by a finalizer when the owner goes
//! away. The registry holds named, pluggable event handlers keyed by
//! resource kind and translates observed events into reconcile requests.
//!
//! Handlers never block: they map an event to zero or more owner identities,
//! and the operator wiring (see `main.rs`) feeds those into the controller's
//! work queue via `Controller::watches` mappers.
//!
//! Concurrency: a single reader-writer lock protects the handler maps.
//! Registration changes are rare, event dispatch is hot.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::expectations::Expectations;
use crate::names::NamespacedName;

/// Kinds of secondary objects the registry can watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatchedKind {
    Secret,
    Pod,
    Deployment,
    Service,
    Elasticsearch,
}

/// Identity of the controller owner of an event object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerInfo {
    pub kind: String,
    pub name: String,
}

/// Metadata extracted from the object an event is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventMeta {
    /// Namespace and name of the event object.
    pub id: NamespacedName,
    /// Controller owner reference, if any.
    pub owner: Option<OwnerInfo>,
}

impl EventMeta {
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        EventMeta {
            id: NamespacedName::new(namespace, name),
            owner: None,
        }
    }

    #[must_use]
    pub fn with_owner(mut self, kind: &str, name: &str) -> Self {
        self.owner = Some(OwnerInfo {
            kind: kind.to_string(),
            name: name.to_string(),
        });
        self
    }
}

/// An observed event on a watched kind.
#[derive(Clone, Debug)]
pub enum WatchEvent {
    Created(EventMeta),
    Updated { old: EventMeta, new: EventMeta },
    Deleted(EventMeta),
    Generic(EventMeta),
}

impl WatchEvent {
    /// Metadata of the event, both arms for updates.
    fn metas(&self) -> Vec<&EventMeta> {
        match self {
            WatchEvent::Created(m) | WatchEvent::Deleted(m) | WatchEvent::Generic(m) => vec![m],
            WatchEvent::Updated { old, new } => vec![old, new],
        }
    }
}

/// Mapper function of a [`Handler::FunctionMap`] registration.
pub type MapperFn = Arc<dyn Fn(&WatchEvent) -> Vec<NamespacedName> + Send + Sync>;

/// Exact-identity watch: when the watched object changes, enqueue the watcher.
#[derive(Clone, Debug)]
pub struct NamedWatch {
    /// Identities to match against the event object.
    pub watched: Vec<NamespacedName>,
    /// Owner to enqueue on a match.
    pub watcher: NamespacedName,
}

/// Handler strategies for a watch registration.
#[derive(Clone)]
pub enum Handler {
    /// Match the exact namespace/name of the event object.
    Named(NamedWatch),
    /// Match the controller owner reference against a kind, enqueue the owner.
    Owner { owner_kind: String },
    /// Arbitrary mapping from event to reconcile requests.
    FunctionMap(MapperFn),
    /// Decrement the owner's expectation counters; enqueues nothing.
    ExpectationObserver {
        owner_kind: String,
        expectations: Arc<Expectations>,
    },
}

impl Handler {
    fn handle(&self, event: &WatchEvent) -> Vec<NamespacedName> {
        match self {
            Handler::Named(watch) => {
                let mut requests = Vec::new();
                for meta in event.metas() {
                    if watch.watched.contains(&meta.id) && !requests.contains(&watch.watcher) {
                        requests.push(watch.watcher.clone());
                    }
                }
                requests
            }
            Handler::Owner { owner_kind } => event
                .metas()
                .into_iter()
                .filter_map(|meta| {
                    meta.owner
                        .as_ref()
                        .filter(|o| o.kind == *owner_kind)
                        .map(|o| NamespacedName::new(&meta.id.namespace, &o.name))
                })
                .fold(Vec::new(), |mut acc, req| {
                    if !acc.contains(&req) {
                        acc.push(req);
                    }
                    acc
                }),
            Handler::FunctionMap(mapper) => mapper(event),
            Handler::ExpectationObserver {
                owner_kind,
                expectations,
            } => {
                let observe = |meta: &EventMeta, deletion: bool| {
                    if let Some(owner) = meta.owner.as_ref().filter(|o| o.kind == *owner_kind) {
                        let key = NamespacedName::new(&meta.id.namespace, &owner.name);
                        if deletion {
                            expectations.deletion_observed(&key);
                        } else {
                            expectations.creation_observed(&key);
                        }
                    }
                };
                match event {
                    WatchEvent::Created(meta) => observe(meta, false),
                    WatchEvent::Deleted(meta) => observe(meta, true),
                    WatchEvent::Updated { .. } | WatchEvent::Generic(_) => {}
                }
                Vec::new()
            }
        }
    }
}

/// Registry of named event handlers per watched kind.
///
/// Names are unique within a kind; adding a handler under an existing name
/// replaces it, removal of an unknown name is a no-op.
#[derive(Default)]
pub struct WatchRegistry {
    handlers: RwLock<BTreeMap<WatchedKind, BTreeMap<String, Handler>>>,
}

impl WatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the handler registered under `name` for `kind`.
    pub fn add_handler(&self, kind: WatchedKind, name: &str, handler: Handler) {
        self.handlers
            .write()
            .expect("watch registry lock poisoned")
            .entry(kind)
            .or_default()
            .insert(name.to_string(), handler);
    }

    /// Remove the handler registered under `name` for `kind`, if present.
    pub fn remove_handler(&self, kind: WatchedKind, name: &str) {
        let mut handlers = self.handlers.write().expect("watch registry lock poisoned");
        if let Some(for_kind) = handlers.get_mut(&kind) {
            for_kind.remove(name);
        }
    }

    /// True if a handler is registered under `name` for `kind`.
    #[must_use]
    pub fn has_handler(&self, kind: WatchedKind, name: &str) -> bool {
        self.handlers
            .read()
            .expect("watch registry lock poisoned")
            .get(&kind)
            .is_some_and(|for_kind| for_kind.contains_key(name))
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: WatchedKind) -> usize {
        self.handlers
            .read()
            .expect("watch registry lock poisoned")
            .get(&kind)
            .map_or(0, BTreeMap::len)
    }

    /// Forward an event to every handler registered for its kind and collect
    /// the deduplicated reconcile requests.
    #[must_use]
    pub fn dispatch(&self, kind: WatchedKind, event: &WatchEvent) -> Vec<NamespacedName> {
        let handlers = self.handlers.read().expect("watch registry lock poisoned");
        let mut requests = Vec::new();
        if let Some(for_kind) = handlers.get(&kind) {
            for handler in for_kind.values() {
                for request in handler.handle(event) {
                    if !requests.contains(&request) {
                        requests.push(request);
                    }
                }
            }
        }
        requests
    }
}

#[cfg(test)]
#[path = "watches_tests.rs"]
mod watches_tests;
