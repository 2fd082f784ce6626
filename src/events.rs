// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Kubernetes event emission.
//!
//! Every user-visible state change goes through this module so the set of
//! event reasons stays closed and greppable.

use kube::runtime::events::{Event, EventType, Recorder};
use kube::runtime::reflector::ObjectRef;
use kube::Resource;
use tracing::warn;

/// The closed set of event reasons emitted by this operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventReason {
    /// A managed resource was created.
    Created,
    /// A managed resource was deleted.
    Deleted,
    /// Reconciliation was postponed (pause, expectations).
    Delayed,
    /// Health degraded from green.
    Unhealthy,
    /// A referenced object is missing or in an unexpected state.
    Unexpected,
    /// The managed instance changed state.
    StateChange,
}

impl EventReason {
    /// CamelCase reason string as it appears on the Event object.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventReason::Created => "Created",
            EventReason::Deleted => "Deleted",
            EventReason::Delayed => "Delayed",
            EventReason::Unhealthy => "Unhealthy",
            EventReason::Unexpected => "Unexpected",
            EventReason::StateChange => "StateChange",
        }
    }
}

/// Publish a Normal event for the given object.
pub async fn normal<K>(recorder: &Recorder, obj: &K, reason: EventReason, note: String)
where
    K: Resource<DynamicType = ()>,
{
    publish(recorder, obj, EventType::Normal, reason, note).await;
}

/// Publish a Warning event for the given object.
pub async fn warning<K>(recorder: &Recorder, obj: &K, reason: EventReason, note: String)
where
    K: Resource<DynamicType = ()>,
{
    publish(recorder, obj, EventType::Warning, reason, note).await;
}

async fn publish<K>(
    recorder: &Recorder,
    obj: &K,
    type_: EventType,
    reason: EventReason,
    note: String,
) where
    K: Resource<DynamicType = ()>,
{
    let event = Event {
        type_,
        reason: reason.as_str().to_string(),
        note: Some(note),
        action: reason.as_str().to_string(),
        secondary: None,
    };
    // Failing to record an event must never fail a reconciliation.
    if let Err(e) = recorder.publish(&event, &ObjectRef::from_obj(obj).into()).await {
        warn!(reason = reason.as_str(), error = %e, "Failed to publish event");
    }
}
