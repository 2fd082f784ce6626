// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! TLS material management.
//!
//! Two concerns live here:
//!
//! 1. **Mirroring** — the CA of the remote Elasticsearch cluster must be
//!    mountable by Kibana pods, so a same-namespace copy of the remote CA
//!    secret is maintained, owner-referenced to the managed instance. The
//!    copy is updated whenever the byte contents diverge.
//! 2. **Rotation** — the managed instance's own HTTP endpoint is backed by a
//!    self-signed CA. Each reconcile computes the time to expiry; inside the
//!    `rotate_before` window the CA is regenerated, and the caller receives
//!    the delay until the next rotation becomes due so it can schedule a
//!    requeue.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client, ResourceExt};
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose};
use tracing::{debug, info};

use crate::constants::{CA_FILE_NAME, CA_VALIDITY_DAYS};
use crate::crd::Kibana;
use crate::names::NamespacedName;
use crate::reconcilers::resources::{is_not_found, reconcile_resource};

/// Key of the CA certificate in the internal HTTP CA secret.
const CA_CERT_KEY: &str = "tls.crt";
/// Key of the CA private key in the internal HTTP CA secret.
const CA_KEY_KEY: &str = "tls.key";

/// Name of the same-namespace mirror of the remote cluster CA secret.
#[must_use]
pub fn mirror_secret_name(owner_name: &str) -> String {
    format!("{owner_name}-es-ca")
}

/// Conventional name of the public HTTP certs secret published by an
/// Elasticsearch cluster of the given name.
#[must_use]
pub fn remote_ca_secret_name(es_cluster_name: &str) -> String {
    format!("{es_cluster_name}-{}", crate::constants::ES_HTTP_CERTS_PUBLIC_SUFFIX)
}

/// Name of the secret holding the managed instance's self-signed HTTP CA.
#[must_use]
pub fn http_ca_secret_name(owner_name: &str) -> String {
    format!("{owner_name}-kb-http-ca-internal")
}

/// Mirror the remote cluster's CA secret into the owner's namespace.
///
/// Returns the reconciled mirror, or `None` when the remote secret does not
/// exist (not an error: the watch on the remote secret re-triggers the
/// reconcile once it appears).
///
/// # Errors
///
/// Returns an error if reading the remote secret fails with anything but
/// 404 or the mirror write fails.
pub async fn reconcile_ca_mirror(
    client: &Client,
    kb: &Kibana,
    remote: &NamespacedName,
) -> Result<Option<Secret>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &remote.namespace);
    let remote_secret = match secrets.get(&remote.name).await {
        Ok(secret) => secret,
        Err(e) if is_not_found(&e) => {
            debug!(remote = %remote, "Remote CA secret not found, skipping mirror");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let expected = Secret {
        metadata: ObjectMeta {
            name: Some(mirror_secret_name(&kb.name_any())),
            namespace: kb.namespace(),
            labels: Some(crate::deployment::build_labels(&kb.name_any())),
            ..Default::default()
        },
        data: remote_secret.data.clone(),
        ..Default::default()
    };

    let reconciled = reconcile_resource(
        client,
        kb,
        expected,
        |expected, actual| expected.data != actual.data,
        |expected, actual| actual.data.clone_from(&expected.data),
    )
    .await?;
    Ok(Some(reconciled))
}

/// A parsed view of the HTTP CA secret.
pub struct HttpCa {
    /// PEM-encoded CA certificate.
    pub cert_pem: String,
    /// Seconds until the certificate expires (zero if already expired).
    pub expires_in: Duration,
}

fn generate_ca(owner_name: &str) -> Result<(String, String)> {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, format!("{owner_name}-kb-http-ca"));
    dn.push(DnType::OrganizationName, "elasticop".to_string());
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(CA_VALIDITY_DAYS);

    let key_pair = KeyPair::generate().context("failed to generate HTTP CA key")?;
    let cert = params
        .self_signed(&key_pair)
        .context("failed to self-sign HTTP CA certificate")?;
    Ok((cert.pem(), key_pair.serialize_pem()))
}

/// Seconds until the PEM certificate expires, zero if already expired.
fn time_to_expiry(cert_pem: &[u8]) -> Result<Duration> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(cert_pem)
        .map_err(|e| anyhow::anyhow!("failed to parse CA PEM: {e}"))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| anyhow::anyhow!("failed to parse CA certificate: {e}"))?;
    let not_after = cert.validity().not_after.timestamp();
    let now = chrono::Utc::now().timestamp();
    Ok(Duration::from_secs(u64::try_from((not_after - now).max(0)).unwrap_or(0)))
}

/// Reconcile the self-signed HTTP CA of the managed instance.
///
/// A missing, unreadable or soon-to-expire CA is (re)generated. Returns the
/// current CA and the delay after which the next rotation is due; the caller
/// schedules a requeue at that time.
///
/// # Errors
///
/// Returns an error if secret access or certificate generation fails.
pub async fn reconcile_http_ca(
    client: &Client,
    kb: &Kibana,
    rotate_before: Duration,
) -> Result<(HttpCa, Duration)> {
    let namespace = kb.namespace().unwrap_or_default();
    let name = http_ca_secret_name(&kb.name_any());
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    let existing = match secrets.get(&name).await {
        Ok(secret) => {
            let cert = secret
                .data
                .as_ref()
                .and_then(|d| d.get(CA_CERT_KEY))
                .map(|ByteString(bytes)| bytes.clone());
            match cert {
                Some(bytes) => match time_to_expiry(&bytes) {
                    Ok(expires_in) if expires_in > rotate_before => Some((bytes, expires_in)),
                    Ok(_) => {
                        info!(secret = %name, "HTTP CA inside rotation window, rotating");
                        None
                    }
                    Err(e) => {
                        info!(secret = %name, error = %e, "HTTP CA unreadable, rotating");
                        None
                    }
                },
                None => None,
            }
        }
        Err(e) if is_not_found(&e) => None,
        Err(e) => return Err(e.into()),
    };

    let (cert_pem, expires_in) = match existing {
        Some((bytes, expires_in)) => (String::from_utf8_lossy(&bytes).into_owned(), expires_in),
        None => {
            let (cert_pem, key_pem) = generate_ca(&kb.name_any())?;
            let mut data: BTreeMap<String, ByteString> = BTreeMap::new();
            data.insert(CA_CERT_KEY.to_string(), ByteString(cert_pem.clone().into_bytes()));
            data.insert(CA_KEY_KEY.to_string(), ByteString(key_pem.into_bytes()));
            // expose the cert under ca.pem as well for mounting convenience
            data.insert(CA_FILE_NAME.to_string(), ByteString(cert_pem.clone().into_bytes()));

            let expected = Secret {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(namespace.clone()),
                    labels: Some(crate::deployment::build_labels(&kb.name_any())),
                    ..Default::default()
                },
                data: Some(data),
                ..Default::default()
            };
            reconcile_resource(
                client,
                kb,
                expected,
                |_, _| true,
                |expected, actual| actual.data.clone_from(&expected.data),
            )
            .await?;

            let expires_in = time_to_expiry(cert_pem.as_bytes())?;
            (cert_pem, expires_in)
        }
    };

    // requeue when the rotation window opens
    let next_rotation = expires_in.saturating_sub(rotate_before);
    Ok((HttpCa { cert_pem, expires_in }, next_rotation))
}

#[cfg(test)]
#[path = "cacerts_tests.rs"]
mod cacerts_tests;
