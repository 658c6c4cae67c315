//! Response templates selected by a decision.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

/// Status, headers and body returned for one outcome.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseTemplate {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Fixed template for faults while assembling a response.
    pub fn internal_error() -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Internal Server Error")
        );
        Self::new(status, HeaderMap::new(), body)
    }
}

/// Templates for every outcome.
#[derive(Debug, Clone)]
pub struct ResponseSet {
    pub allowed: ResponseTemplate,
    pub denied: ResponseTemplate,
    pub internal_error: ResponseTemplate,
}

impl ResponseSet {
    pub fn new(allowed: ResponseTemplate, denied: ResponseTemplate) -> Self {
        Self {
            allowed,
            denied,
            internal_error: ResponseTemplate::internal_error(),
        }
    }
}
