// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Namespaced object identity.

use std::fmt;

use kube::{Resource, ResourceExt};

/// Identity of a namespaced Kubernetes object, used as the key of
/// expectations, watch registrations and cached client state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        NamespacedName {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a live object.
    #[must_use]
    pub fn from_obj<K>(obj: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        NamespacedName {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
