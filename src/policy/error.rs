//! Per-request authorization errors.
//!
//! Every variant is recoverable: the requirement composer logs it and counts
//! the check as failed. None of these ever reach the response body.

use thiserror::Error;

use crate::policy::request::ParamLocation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("empty {location} param '{name}' in request")]
    MissingParameter { location: ParamLocation, name: String },

    #[error("malformed token field '{0}'")]
    MalformedToken(String),

    #[error("missing mandatory field '{0}' in token")]
    MissingMandatoryField(String),

    #[error("missing signature field in token")]
    MissingSignature,

    #[error("missing expiration field in token")]
    MissingExpiration,

    #[error("invalid expiration time '{0}'")]
    InvalidExpiration(String),

    #[error("token has expired")]
    Expired,

    #[error("unable to get protected value from {0}")]
    MissingProtectedValue(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid ip '{0}' in list received")]
    InvalidAddress(String),

    #[error("expected exactly one address after filtering trusted networks")]
    AmbiguousList,

    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,
}
