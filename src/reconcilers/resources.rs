// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Generic resource creation and update helpers.
//!
//! Reconcilers describe the resource they expect and how to detect drift;
//! this module owns the fetch/create/update mechanics. The update predicate
//! is a custom closure because server-populated fields (ClusterIP, NodePort,
//! targetPort) must be preserved when the expected resource leaves them
//! zero, which rules out blind equality.
//!
//! # Example
//!
//! ```rust,ignore
//! let reconciled = reconcile_resource(
//!     &client,
//!     &kibana,
//!     expected_deployment,
//!     |expected, actual| pod_template_hash(expected) != pod_template_hash(actual),
//!     |expected, actual| actual.spec = expected.spec.clone(),
//! ).await?;
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, info};

/// True if the error is a 404 from the API server.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// True if the error is a 409 conflict from the API server.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

/// Create the expected resource or update the live one in place.
///
/// The expected resource is owner-referenced to `owner` before creation so
/// garbage collection ties its lifecycle to the owner. When the resource
/// already exists, `needs_update(expected, actual)` decides whether a write
/// happens at all, and `update_reconciled(expected, actual)` copies the
/// desired state onto the live object, leaving server-populated fields
/// untouched.
///
/// Returns the reconciled resource as the API server knows it.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API operation fails.
pub async fn reconcile_resource<T, O, N, U>(
    client: &Client,
    owner: &O,
    mut expected: T,
    needs_update: N,
    update_reconciled: U,
) -> Result<T>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
    O: Resource<DynamicType = ()>,
    N: FnOnce(&T, &T) -> bool,
    U: FnOnce(&T, &mut T),
{
    let name = expected
        .meta()
        .name
        .clone()
        .ok_or_else(|| anyhow::anyhow!("expected resource must have a name"))?;
    let namespace = expected.namespace().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);

    if let Some(owner_ref) = owner.controller_owner_ref(&()) {
        expected
            .meta_mut()
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(owner_ref);
    }

    match api.get(&name).await {
        Ok(mut actual) => {
            if needs_update(&expected, &actual) {
                update_reconciled(&expected, &mut actual);
                info!("Updating {} {}/{}", T::kind(&()), namespace, name);
                let updated = api.replace(&name, &PostParams::default(), &actual).await?;
                Ok(updated)
            } else {
                debug!(
                    "{} {}/{} is up to date, skipping write",
                    T::kind(&()),
                    namespace,
                    name
                );
                Ok(actual)
            }
        }
        Err(e) if is_not_found(&e) => {
            info!("Creating {} {}/{}", T::kind(&()), namespace, name);
            let created = api.create(&PostParams::default(), &expected).await?;
            Ok(created)
        }
        Err(e) => Err(e.into()),
    }
}

/// Patch only the status subresource of a resource.
///
/// # Errors
///
/// Returns an error if the patch fails; a 409 conflict is surfaced as-is so
/// the caller can decide to requeue.
pub async fn patch_status<T>(
    client: &Client,
    namespace: &str,
    name: &str,
    status: serde_json::Value,
) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    api.patch_status(
        name,
        &PatchParams::default(),
        &Patch::Merge(serde_json::json!({ "status": status })),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
