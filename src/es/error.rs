// Copyright (c) 2025 The elasticop authors
// SPDX-License-Identifier: MIT

//! Elasticsearch client error types.
//!
//! Responses outside the 2xx range become a structured [`ApiError`] carrying
//! the status code and the parsed JSON error body Elasticsearch ships with
//! most failures. Reconcilers branch on the predicates rather than status
//! literals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parsed Elasticsearch error body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: ErrorCause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// A single cause inside an Elasticsearch error body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type", default)]
    pub r#type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Box<ErrorCause>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_cause: Vec<ErrorCause>,
}

/// A non-2xx response from the Elasticsearch API.
#[derive(Error, Debug)]
#[error("elasticsearch API error, status {status}: {}", self.reason())]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Parsed error body, when the response carried one.
    pub body: Option<ErrorResponse>,
}

impl ApiError {
    /// The error reason, or "unknown" when the body was unparsable.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.body
            .as_ref()
            .map_or("unknown", |b| b.error.reason.as_str())
    }
}

/// Any failure of the Elasticsearch client.
#[derive(Error, Debug)]
pub enum EsError {
    /// The server answered outside the 2xx range.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never produced a response (connect, timeout, decode).
    #[error("elasticsearch request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured endpoint does not parse as a URL.
    #[error("invalid elasticsearch endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The response body did not decode into the expected model.
    #[error("failed to decode elasticsearch response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The operation does not exist for this Elasticsearch version.
    #[error("{operation} is not supported in Elasticsearch {major}.x")]
    NotSupported {
        operation: &'static str,
        major: u64,
    },

    /// The declared major version has no client implementation.
    #[error("no client implementation for Elasticsearch major version {major}")]
    UnsupportedVersion { major: u64 },

    /// Building the TLS configuration failed.
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// The server sent something the client cannot make sense of.
    #[error("unexpected elasticsearch response: {0}")]
    Unexpected(String),
}

impl EsError {
    fn status(&self) -> Option<u16> {
        match self {
            EsError::Api(api) => Some(api.status),
            _ => None,
        }
    }

    /// True for an HTTP 404 response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for an HTTP 409 response.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// True for an HTTP 403 response.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// True for an HTTP 401 response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// True for an HTTP 408 response.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status() == Some(408)
    }

    /// True for any 4xx response.
    #[must_use]
    pub fn is_4xx(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> EsError {
        EsError::Api(ApiError { status, body: None })
    }

    #[test]
    fn test_predicates() {
        assert!(api_error(404).is_not_found());
        assert!(api_error(409).is_conflict());
        assert!(api_error(403).is_forbidden());
        assert!(api_error(401).is_unauthorized());
        assert!(api_error(408).is_timeout());

        for status in [400, 404, 409, 499] {
            assert!(api_error(status).is_4xx(), "{status}");
        }
        for status in [200, 301, 500, 503] {
            assert!(!api_error(status).is_4xx(), "{status}");
        }

        let not_api = EsError::UnsupportedVersion { major: 5 };
        assert!(!not_api.is_not_found());
        assert!(!not_api.is_4xx());
    }

    #[test]
    fn test_error_body_parsing() {
        let body = r#"{
            "error": {
                "root_cause": [{"type": "index_not_found_exception", "reason": "no such index"}],
                "type": "index_not_found_exception",
                "reason": "no such index",
                "caused_by": {"type": "inner", "reason": "deeper"}
            },
            "status": 404
        }"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.r#type, "index_not_found_exception");
        assert_eq!(parsed.error.root_cause.len(), 1);
        assert_eq!(parsed.error.caused_by.as_ref().unwrap().reason, "deeper");
        assert_eq!(parsed.status, Some(404));

        let err = ApiError {
            status: 404,
            body: Some(parsed),
        };
        assert_eq!(err.reason(), "no such index");
    }

    #[test]
    fn test_unparsable_body_reason() {
        let err = ApiError {
            status: 502,
            body: None,
        };
        assert_eq!(err.reason(), "unknown");
    }
}
