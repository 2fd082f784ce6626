// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Reconciliation controllers.
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** resource changes (primary and dynamically-registered
//!    secondary objects) via the Kubernetes API
//! 2. **Reconcile** the observed state against the declared spec
//! 3. **Update** owned Deployments, Services and Secrets
//! 4. **Status** is reported back on the owner's status subresource
//!
//! [`kibana`] owns the scheduler gates (pause, version compatibility,
//! finalizers, expectations), [`driver`] does the actual workload driving,
//! and [`resources`] holds the generic create-or-update machinery shared by
//! everything that writes Kubernetes objects.

pub mod driver;
pub mod kibana;
pub mod resources;

pub use driver::reconcile_deployment_driver;
pub use kibana::reconcile_kibana;
