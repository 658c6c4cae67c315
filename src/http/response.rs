//! Response assembly from decision templates.
//!
//! # Responsibilities
//! - Turn a [`ResponseTemplate`] into a transport response
//! - Default the content type for non-empty bodies
//!
//! # Design Decisions
//! - Templates are validated at load, so building should not fail; if it
//!   does, the fixed internal-error template is served instead

use axum::body::Body;
use axum::http::{header, HeaderValue, Response};

use crate::policy::ResponseTemplate;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Build the response for a template.
pub fn render(template: &ResponseTemplate) -> Result<Response<Body>, axum::http::Error> {
    let mut builder = Response::builder().status(template.status);

    if let Some(headers) = builder.headers_mut() {
        headers.extend(template.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        if !template.body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
    }

    builder.body(Body::from(template.body.clone()))
}

/// Build the response for a template, falling back to the internal-error template.
pub fn render_or_internal(template: &ResponseTemplate, internal: &ResponseTemplate) -> Response<Body> {
    match render(template) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build response from template");
            let mut response = Response::new(Body::from(internal.body.clone()));
            *response.status_mut() = internal.status;
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
            response
        }
    }
}
