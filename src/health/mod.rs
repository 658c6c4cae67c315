//! Liveness endpoint.
//!
//! The process is live as long as it can answer; there are no backends or
//! dependencies to check. Only `GET` is accepted.

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};

pub const LIVENESS_PATH: &str = "/healthz";

/// `200 OK` for GET, `405` for anything else.
pub async fn liveness(method: Method) -> Response {
    if method == Method::GET {
        (StatusCode::OK, "OK").into_response()
    } else {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET")],
            "Method Not Allowed",
        )
            .into_response()
    }
}
