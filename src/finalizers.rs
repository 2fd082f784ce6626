// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Generic finalizer management for Kubernetes resources.
//!
//! A finalizer is a named cleanup action attached to an owner. On every
//! reconcile the set of currently-relevant finalizers is compared to what is
//! declared on the object: missing names are written, and once the object is
//! marked for deletion each matching action runs and its name is dropped
//! only on success. Kubernetes deletes the object when the set is empty.
//!
//! The well-known finalizers of this operator release dynamic secret watches
//! and forget cached Elasticsearch client state, so neither outlives the
//! owner that created them.

use anyhow::Result;
use futures::future::BoxFuture;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::{error, info};

/// A named cleanup action bound to an owner's lifecycle.
pub struct Finalizer {
    /// Finalizer name as written into the object metadata.
    pub name: String,
    /// Cleanup body executed on owner deletion. Must be idempotent.
    pub execute: Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>,
}

impl Finalizer {
    pub fn new<F>(name: &str, execute: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Finalizer {
            name: name.to_string(),
            execute: Box::new(execute),
        }
    }
}

/// Reconcile the finalizer set of a resource.
///
/// When the resource is live, installs any of the given finalizer names that
/// are not yet declared (idempotent). When the resource carries a deletion
/// timestamp, executes every matching cleanup and removes the names that
/// succeeded; failed cleanups keep their name in place so deletion is
/// retried on the next reconcile.
///
/// Returns `true` if the resource is being deleted (the caller should stop
/// reconciling after this).
///
/// # Errors
///
/// Returns an error if a cleanup action fails or a metadata patch fails.
pub async fn handle_finalizers<T>(
    client: &Client,
    resource: &T,
    finalizers: &[Finalizer],
) -> Result<bool>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let declared = resource.meta().finalizers.clone().unwrap_or_default();

    let deleting = resource.meta().deletion_timestamp.is_some();
    if !deleting {
        let missing: Vec<&Finalizer> = finalizers
            .iter()
            .filter(|f| !declared.contains(&f.name))
            .collect();
        if !missing.is_empty() {
            let mut updated = declared;
            for finalizer in &missing {
                info!(
                    finalizer = %finalizer.name,
                    resource = %format!("{namespace}/{name}"),
                    "Adding finalizer"
                );
                updated.push(finalizer.name.clone());
            }
            patch_finalizers::<T>(client, &namespace, &name, updated).await?;
        }
        return Ok(false);
    }

    info!("{} {}/{} is being deleted", T::kind(&()), namespace, name);

    let mut remaining = declared.clone();
    let mut first_failure = None;
    for finalizer in finalizers {
        if !declared.contains(&finalizer.name) {
            continue;
        }
        info!(
            finalizer = %finalizer.name,
            resource = %format!("{namespace}/{name}"),
            "Running finalizer"
        );
        match (finalizer.execute)().await {
            Ok(()) => remaining.retain(|f| f != &finalizer.name),
            Err(e) => {
                error!(
                    finalizer = %finalizer.name,
                    resource = %format!("{namespace}/{name}"),
                    error = %e,
                    "Finalizer failed, keeping it for retry"
                );
                first_failure.get_or_insert(e);
            }
        }
    }

    if remaining != declared {
        patch_finalizers::<T>(client, &namespace, &name, remaining).await?;
    }

    match first_failure {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

async fn patch_finalizers<T>(
    client: &Client,
    namespace: &str,
    name: &str,
    finalizers: Vec<String>,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_finalizer_executes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let finalizer = Finalizer::new("finalizer.kibana.k8s.elastic.co/test", move || {
            let counted = Arc::clone(&counted);
            Box::pin(async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(async {
            (finalizer.execute)().await.unwrap();
            (finalizer.execute)().await.unwrap();
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
