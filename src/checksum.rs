// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Rollout-forcing configuration checksum.
//!
//! Kibana cannot reload CA files, credentials or keystore contents at
//! runtime; a change to any of them must roll the Deployment. All such
//! inputs are folded into a single SHA-224 digest written to a pod-template
//! label, so the Deployment's pod template (and only it) changes whenever a
//! rollout is required.

use sha2::{Digest, Sha224};

/// Accumulates the byte inputs that force a pod rotation.
#[derive(Default)]
pub struct ConfigChecksum {
    hasher: Sha224,
}

impl ConfigChecksum {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold raw bytes (CA certificates, credential secret values) into the digest.
    pub fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Fold a resource version (secure-settings secret revision) into the digest.
    pub fn write_str(&mut self, s: &str) {
        self.hasher.update(s.as_bytes());
    }

    /// Hex digest, suitable as a label value (56 characters).
    #[must_use]
    pub fn finish(self) -> String {
        let digest = self.hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}
