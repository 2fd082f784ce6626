// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Operator roles and startup parameters.
//!
//! The operator binary can run in one or more roles. A namespace operator
//! reconciles resources in a set of namespaces, a global operator handles
//! cluster-wide concerns, and a webhook-only process serves admission
//! requests without reconciling anything. `all` combines every role in a
//! single process, which is the default for small installations.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::constants::{CA_ROTATE_BEFORE_SECS, METRICS_SERVER_PORT};

/// A role this operator process can assume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// Reconcile namespaced resources.
    Namespace,
    /// Handle cluster-wide concerns (licensing, CRD upkeep).
    Global,
    /// Serve the validating webhook only.
    Webhook,
    /// All of the above in one process.
    All,
}

impl Role {
    /// The canonical spelling used on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Namespace => "namespace",
            Role::Global => "global",
            Role::Webhook => "webhook",
            Role::All => "all",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "namespace" => Ok(Role::Namespace),
            "global" => Ok(Role::Global),
            "webhook" => Ok(Role::Webhook),
            "all" => Ok(Role::All),
            other => bail!("unknown operator role '{other}'"),
        }
    }
}

/// Validate a list of role names as given on the command line.
///
/// # Errors
///
/// Fails if any element is outside {namespace, global, webhook, all}.
pub fn validate_roles(roles: &[String]) -> Result<Vec<Role>> {
    roles.iter().map(|r| r.parse()).collect()
}

/// Startup parameters shared by all controllers.
#[derive(Clone)]
pub struct Parameters {
    /// Image of the running operator, recorded for telemetry.
    pub operator_image: String,
    /// Port of the Prometheus metrics endpoint.
    pub metrics_port: u16,
    /// How long before HTTP CA expiry a rotation is triggered.
    pub ca_rotate_before: std::time::Duration,
    /// Optional override mapping Elasticsearch service hosts to alternative
    /// socket addresses. Stands in for a custom dialer; used by
    /// port-forwarding test setups.
    pub dialer: Option<crate::es::DialerFn>,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            operator_image: String::new(),
            metrics_port: METRICS_SERVER_PORT,
            ca_rotate_before: std::time::Duration::from_secs(CA_ROTATE_BEFORE_SECS),
            dialer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(roles: &[&str]) -> Vec<String> {
        roles.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_validate_roles_accepts_known_subsets() {
        for roles in [
            vec!["namespace"],
            vec!["global"],
            vec!["webhook"],
            vec!["all"],
            vec!["namespace", "webhook"],
            vec!["namespace", "global", "webhook", "all"],
            vec![],
        ] {
            assert!(validate_roles(&strings(&roles)).is_ok(), "{roles:?}");
        }
    }

    #[test]
    fn test_validate_roles_rejects_unknown() {
        for roles in [
            vec!["cluster"],
            vec!["namespace", "operator"],
            vec![""],
            vec!["Namespace"],
        ] {
            assert!(validate_roles(&strings(&roles)).is_err(), "{roles:?}");
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Namespace, Role::Global, Role::Webhook, Role::All] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }
}
