// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Keystore propagation for user-provided secure settings.
//!
//! Kibana reads sensitive settings from its own keystore file rather than
//! from the configuration. Users hand the operator a secret; an init
//! container projects it into a fresh keystore before the main container
//! starts. The referenced secret is watched so any change requeues the owner,
//! and its resource version is folded into the config checksum so the change
//! also rolls the Deployment.

use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use k8s_openapi::api::core::v1::{
    Container, Secret, SecretVolumeSource, Volume, VolumeMount,
};
use kube::runtime::events::Recorder;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

use crate::constants::{
    DATA_MOUNT_PATH, INIT_KEYSTORE_CONTAINER_NAME, KIBANA_KEYSTORE_BIN,
    SECURE_SETTINGS_MOUNT_PATH,
};
use crate::crd::Kibana;
use crate::events::{self, EventReason};
use crate::finalizers::Finalizer;
use crate::labels::{SECURE_SETTINGS_FINALIZER, SECURE_SETTINGS_WATCH};
use crate::names::NamespacedName;
use crate::reconcilers::resources::is_not_found;
use crate::watches::{Handler, NamedWatch, WatchRegistry, WatchedKind};

/// Name of the volume projecting the secure-settings secret.
const SECURE_SETTINGS_VOLUME_NAME: &str = "elastic-internal-secure-settings";

/// Name of the data volume shared between init and main container.
pub const DATA_VOLUME_NAME: &str = "kibana-data";

/// Resources contributed to the pod template by the keystore builder.
pub struct KeystoreResources {
    /// Read-only volume projecting the user secret.
    pub volume: Volume,
    /// Init container creating the keystore from the projected files.
    pub init_container: Container,
    /// Resource version of the secret, folded into the config checksum.
    pub version: String,
}

/// Registry name of the secure-settings watch for the given owner.
#[must_use]
pub fn watch_name(owner: &NamespacedName) -> String {
    format!("{}-{}-{SECURE_SETTINGS_WATCH}", owner.namespace, owner.name)
}

/// Shell script run by the init container. Creates an empty keystore, then
/// feeds every projected file into it keyed by file name.
fn init_script() -> String {
    format!(
        r#"#!/usr/bin/env bash
set -eu

echo "Initializing keystore."
{KIBANA_KEYSTORE_BIN} create
for filename in {SECURE_SETTINGS_MOUNT_PATH}/*; do
  [[ -e "$filename" ]] || continue
  key=$(basename "$filename")
  echo "Adding $key to the keystore."
  {KIBANA_KEYSTORE_BIN} add "$key" --stdin < "$filename"
done
"#
    )
}

/// Build the init container emitting the keystore.
fn init_container() -> Container {
    Container {
        name: INIT_KEYSTORE_CONTAINER_NAME.to_string(),
        // image is filled in with the main container image at template assembly
        command: Some(vec![
            "/usr/bin/env".to_string(),
            "bash".to_string(),
            "-c".to_string(),
            init_script(),
        ]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: SECURE_SETTINGS_VOLUME_NAME.to_string(),
                mount_path: SECURE_SETTINGS_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: DATA_VOLUME_NAME.to_string(),
                mount_path: DATA_MOUNT_PATH.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

/// Reconcile the secure-settings keystore resources for an owner.
///
/// Without a secure-settings reference this releases any previously
/// registered watch and contributes nothing to the pod. With one, the
/// referenced secret is watched (so later changes requeue the owner) and,
/// when present, turned into a volume plus init container. A missing secret
/// emits a Warning event and contributes nothing; the watch stays in place
/// and the reconcile fires again when the secret appears.
///
/// # Errors
///
/// Returns an error if fetching the secret fails with anything but 404.
pub async fn reconcile_keystore(
    client: &Client,
    recorder: &Recorder,
    watches: &WatchRegistry,
    kb: &Kibana,
) -> Result<Option<KeystoreResources>> {
    let owner = NamespacedName::from_obj(kb);

    let Some(secure_settings) = kb.spec.secure_settings.as_ref() else {
        watches.remove_handler(WatchedKind::Secret, &watch_name(&owner));
        return Ok(None);
    };

    let secret_id = NamespacedName::new(&owner.namespace, &secure_settings.secret_name);
    watches.add_handler(
        WatchedKind::Secret,
        &watch_name(&owner),
        Handler::Named(NamedWatch {
            watched: vec![secret_id.clone()],
            watcher: owner.clone(),
        }),
    );

    let secrets: Api<Secret> = Api::namespaced(client.clone(), &owner.namespace);
    let secret = match secrets.get(&secure_settings.secret_name).await {
        Ok(secret) => secret,
        Err(e) if is_not_found(&e) => {
            events::warning(
                recorder,
                kb,
                EventReason::Unexpected,
                format!("Secure settings secret not found: {secret_id}"),
            )
            .await;
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    debug!(secret = %secret_id, "Projecting secure settings into keystore");

    let volume = Volume {
        name: SECURE_SETTINGS_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secure_settings.secret_name.clone()),
            optional: Some(false),
            ..Default::default()
        }),
        ..Default::default()
    };

    Ok(Some(KeystoreResources {
        volume,
        init_container: init_container(),
        version: secret.resource_version().unwrap_or_default(),
    }))
}

/// Finalizer releasing the secure-settings watch when the owner is deleted.
#[must_use]
pub fn secure_settings_finalizer(
    watches: Arc<WatchRegistry>,
    owner: NamespacedName,
) -> Finalizer {
    Finalizer::new(SECURE_SETTINGS_FINALIZER, move || {
        let watches = Arc::clone(&watches);
        let owner = owner.clone();
        async move {
            watches.remove_handler(WatchedKind::Secret, &watch_name(&owner));
            Ok(())
        }
        .boxed()
    })
}

#[cfg(test)]
#[path = "keystore_tests.rs"]
mod keystore_tests;
