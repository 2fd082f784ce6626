// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Pause and controller-version annotation handling.
//!
//! Two annotations gate every reconciliation:
//!
//! - `common.k8s.elastic.co/pause` suspends all work for a resource (and,
//!   through the parent composite named by `common.k8s.elastic.co/stack`,
//!   for every member of a stack). The parser is deliberately forgiving:
//!   empty or unparsable values count as "not paused" so a typo can never
//!   freeze a resource silently.
//! - `common.k8s.elastic.co/controller-version` records which operator build
//!   last reconciled the resource. An older build must not fight a newer one
//!   over the same object, so reconciliation is skipped when the annotation
//!   is ahead of the running build.

use std::collections::BTreeMap;

use kube::api::ObjectMeta;
use tracing::{debug, warn};

use crate::labels::{CONTROLLER_VERSION_ANNOTATION, PAUSE_ANNOTATION, STACK_ANNOTATION};

/// Parse a bool-ish annotation value. Accepts the usual spellings of
/// true/false plus "1"/"0"; anything else is logged and treated as false.
fn parse_bool_annotation(key: &str, value: &str) -> bool {
    match value {
        "true" | "True" | "TRUE" | "1" => true,
        "" | "false" | "False" | "FALSE" | "0" => false,
        other => {
            warn!(
                annotation = key,
                value = other,
                "Unparsable boolean annotation value, treating as false"
            );
            false
        }
    }
}

fn annotation_is_true(annotations: Option<&BTreeMap<String, String>>, key: &str) -> bool {
    annotations
        .and_then(|a| a.get(key))
        .is_some_and(|v| parse_bool_annotation(key, v))
}

/// True if the pause annotation is set on the given object metadata.
#[must_use]
pub fn is_paused(meta: &ObjectMeta) -> bool {
    annotation_is_true(meta.annotations.as_ref(), PAUSE_ANNOTATION)
}

/// True if the object or its declared parent composite is paused.
///
/// `parent_annotations` are the annotations of the composite resource named
/// by the stack annotation, if the caller resolved one; members of a stack
/// inherit the pause flag of the whole stack.
#[must_use]
pub fn is_paused_with_parent(
    meta: &ObjectMeta,
    parent_annotations: Option<&BTreeMap<String, String>>,
) -> bool {
    is_paused(meta) || annotation_is_true(parent_annotations, PAUSE_ANNOTATION)
}

/// Name of the parent composite declared on the object, if any.
#[must_use]
pub fn parent_stack_name(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(STACK_ANNOTATION))
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

/// Decide whether this operator build may reconcile the resource.
///
/// Returns `false` when the controller-version annotation carries a version
/// strictly newer than `current`: a newer operator has taken over and this
/// build must step aside (skip, no requeue). A missing or unparsable
/// annotation never blocks reconciliation.
#[must_use]
pub fn controller_version_allows(meta: &ObjectMeta, current: &semver::Version) -> bool {
    let Some(recorded) = meta
        .annotations
        .as_ref()
        .and_then(|a| a.get(CONTROLLER_VERSION_ANNOTATION))
    else {
        return true;
    };

    match semver::Version::parse(recorded) {
        Ok(recorded) if recorded > *current => {
            debug!(
                recorded = %recorded,
                current = %current,
                "Resource was last reconciled by a newer operator, skipping"
            );
            false
        }
        Ok(_) => true,
        Err(e) => {
            warn!(
                value = %recorded,
                error = %e,
                "Unparsable controller-version annotation, proceeding"
            );
            true
        }
    }
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod annotations_tests;
