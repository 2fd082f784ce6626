// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and elasticop-specific
//! labels/annotations to ensure consistency across all resources created by
//! the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Value for `app.kubernetes.io/managed-by` on resources created by this operator
pub const MANAGED_BY_ELASTICOP: &str = "elasticop";

// ============================================================================
// Elastic-Specific Labels
// ============================================================================

/// Label carrying the name of the owning Kibana resource
pub const KIBANA_NAME_LABEL: &str = "kibana.k8s.elastic.co/name";

/// Label carrying the kind of the managed instance (always "kibana" here)
pub const TYPE_LABEL: &str = "common.k8s.elastic.co/type";

/// Value of [`TYPE_LABEL`] for Kibana-owned resources
pub const TYPE_LABEL_VALUE: &str = "kibana";

/// Pod template label carrying the rollout-forcing configuration checksum
pub const CONFIG_CHECKSUM_LABEL: &str = "kibana.k8s.elastic.co/config-checksum";

// ============================================================================
// Elastic-Specific Annotations
// ============================================================================

/// Annotation suspending reconciliation when set to a true-ish value
pub const PAUSE_ANNOTATION: &str = "common.k8s.elastic.co/pause";

/// Annotation naming the parent composite (stack) resource, if any.
/// The pause annotation of the parent applies to its members.
pub const STACK_ANNOTATION: &str = "common.k8s.elastic.co/stack";

/// Annotation recording the operator version that last reconciled the resource
pub const CONTROLLER_VERSION_ANNOTATION: &str = "common.k8s.elastic.co/controller-version";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer releasing the secure-settings secret watch on deletion
pub const SECURE_SETTINGS_FINALIZER: &str = "finalizer.kibana.k8s.elastic.co/secure-settings";

/// Finalizer dropping the cached Elasticsearch client state on deletion
pub const ES_CLIENT_CACHE_FINALIZER: &str = "finalizer.kibana.k8s.elastic.co/es-client-cache";

// ============================================================================
// Watch Names
// ============================================================================

/// Name of the dynamic watch on the secure-settings secret
pub const SECURE_SETTINGS_WATCH: &str = "secure-settings";

/// Name of the dynamic watch on the referenced CA certificate secret
pub const CA_CERT_WATCH: &str = "ca-cert";

/// Name of the dynamic watch on the credentials secret (secretKeyRef auth)
pub const AUTH_SECRET_WATCH: &str = "auth-secret";
