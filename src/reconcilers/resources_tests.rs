// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

use crate::reconcilers::resources::{is_conflict, is_not_found};

fn api_error(code: u16) -> kube::Error {
    kube::Error::Api(Box::new(kube::core::Status {
        status: Some(kube::core::response::StatusSummary::Failure),
        message: String::new(),
        reason: String::new(),
        code,
        metadata: None,
        details: None,
    }))
}

#[test]
fn test_is_not_found() {
    assert!(is_not_found(&api_error(404)));
    assert!(!is_not_found(&api_error(409)));
    assert!(!is_not_found(&api_error(500)));
}

#[test]
fn test_is_conflict() {
    assert!(is_conflict(&api_error(409)));
    assert!(!is_conflict(&api_error(404)));
    assert!(!is_conflict(&api_error(422)));
}
