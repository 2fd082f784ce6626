// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Operator-level error types.
//!
//! Elasticsearch API errors live in [`crate::es::error`]; this module covers
//! configuration problems detected while reconciling a managed instance.
//! Configuration errors fail the current iteration without a requeue: the
//! resource will only be retried once the user edits the spec.

use thiserror::Error;

/// Errors caused by an invalid Kibana spec.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The declared version does not parse as semver.
    #[error("invalid version '{version}': {source}")]
    InvalidVersion {
        /// The version string as declared in the spec
        version: String,
        /// The underlying parse error
        #[source]
        source: semver::Error,
    },

    /// The declared version parses but its major is not supported.
    #[error("unsupported Elastic stack version '{version}': supported majors are 6, 7 and 8")]
    UnsupportedVersion {
        /// The version string as declared in the spec
        version: String,
    },

    /// Both inline credentials and a secret reference were declared.
    #[error("elasticsearch auth must declare at most one of inline credentials or secretKeyRef")]
    AmbiguousAuth,
}

/// Parse and validate the version declared on a managed instance.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the version does not parse or its major is
/// outside the supported set.
pub fn parse_version(version: &str) -> Result<semver::Version, ConfigError> {
    let v = semver::Version::parse(version).map_err(|source| ConfigError::InvalidVersion {
        version: version.to_string(),
        source,
    })?;
    match v.major {
        6 | 7 | 8 => Ok(v),
        _ => Err(ConfigError::UnsupportedVersion {
            version: version.to_string(),
        }),
    }
}
