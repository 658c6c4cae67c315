//! Request handling and conversion.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Extract the policy-relevant view of a request (host, path, query, headers)
//! - Read the body, bounded, for debug logging only
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The path is percent-decoded once here, so every rule sees the same value
//! - A path whose escapes are not UTF-8 is rejected rather than rewritten
//! - A body that cannot be read is an internal error, not a denial

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::policy::request::{parse_query, CheckRequest};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Upper bound on buffered request bodies.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Generates a fresh UUID v4 for every request without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Request ID of an incoming request, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Failure turning a transport request into a [`CheckRequest`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("request path '{0}' does not decode to UTF-8")]
    InvalidPath(String),
}

/// Build the policy view of an incoming request.
pub async fn into_check_request(request: Request<Body>, body_limit: usize) -> Result<CheckRequest, RequestError> {
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let raw_path = parts.uri.path();
    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| RequestError::InvalidPath(raw_path.to_string()))?
        .into_owned();
    let query = parts.uri.query().map(parse_query).unwrap_or_default();

    let body = axum::body::to_bytes(body, body_limit)
        .await
        .map_err(RequestError::Body)?;

    Ok(CheckRequest {
        method: parts.method.as_str().to_string(),
        host,
        path,
        query,
        headers: parts.headers,
        body,
    })
}
