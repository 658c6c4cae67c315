//! Signed token validation.
//!
//! # Token Format
//! ```text
//! exp=1735689600~acl=/videos/*~hmac=3f9a...e1
//! └──────── digest prefix ─────┘     └ signature (hex) ┘
//! ```
//!
//! The signed payload is `<digest prefix>~url=<protected value>`, hashed with a
//! keyed hash and hex-encoded.
//!
//! # Design Decisions
//! - The digest/signature boundary is the first `~hmac=`
//! - Expiration is exclusive: a token is dead at `now == exp`
//! - Signatures are compared in constant time

use std::str::FromStr;

use hmac::digest::{InvalidLength, KeyInit};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::policy::error::AuthorizationError;

const SIGNATURE_MARKER: &str = "~hmac=";
const EXPIRATION_FIELD: &str = "exp";

/// Keyed-hash algorithms accepted for signed tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HmacAlgorithm {
    pub const NAMES: &'static [&'static str] = &["md5", "sha1", "sha256", "sha512"];

    /// Hex-encoded keyed hash of `payload`.
    pub fn sign_hex(&self, key: &[u8], payload: &[u8]) -> Result<String, InvalidLength> {
        match self {
            HmacAlgorithm::Md5 => mac_hex::<Hmac<Md5>>(key, payload),
            HmacAlgorithm::Sha1 => mac_hex::<Hmac<Sha1>>(key, payload),
            HmacAlgorithm::Sha256 => mac_hex::<Hmac<Sha256>>(key, payload),
            HmacAlgorithm::Sha512 => mac_hex::<Hmac<Sha512>>(key, payload),
        }
    }
}

impl FromStr for HmacAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HmacAlgorithm::Md5),
            "sha1" => Ok(HmacAlgorithm::Sha1),
            "sha256" => Ok(HmacAlgorithm::Sha256),
            "sha512" => Ok(HmacAlgorithm::Sha512),
            other => Err(other.to_string()),
        }
    }
}

fn mac_hex<M: Mac + KeyInit>(key: &[u8], payload: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = <M as Mac>::new_from_slice(key)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Validates `key=value~...~hmac=<hex>` tokens against a protected value.
#[derive(Clone)]
pub struct TokenValidator {
    algorithm: HmacAlgorithm,
    key: Vec<u8>,
    mandatory_fields: Vec<String>,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .field("mandatory_fields", &self.mandatory_fields)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(algorithm: HmacAlgorithm, key: Vec<u8>, mandatory_fields: Vec<String>) -> Self {
        Self {
            algorithm,
            key,
            mandatory_fields,
        }
    }

    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    /// Validate `token` for `protected` at time `now_unix`.
    pub fn validate(&self, token: &str, protected: &str, now_unix: i64) -> Result<(), AuthorizationError> {
        let fields = parse_fields(token)?;

        for mandatory in &self.mandatory_fields {
            if !fields.iter().any(|(key, _)| key == mandatory) {
                return Err(AuthorizationError::MissingMandatoryField(mandatory.clone()));
            }
        }

        let (digest, received) = token
            .split_once(SIGNATURE_MARKER)
            .ok_or(AuthorizationError::MissingSignature)?;

        let exp = fields
            .iter()
            .find(|(key, _)| *key == EXPIRATION_FIELD)
            .map(|(_, value)| *value)
            .ok_or(AuthorizationError::MissingExpiration)?;
        let exp: i64 = exp
            .parse()
            .map_err(|_| AuthorizationError::InvalidExpiration(exp.to_string()))?;

        if now_unix >= exp {
            return Err(AuthorizationError::Expired);
        }

        let expected = self.sign(digest, protected)?;
        if !received.is_empty() && bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
            Ok(())
        } else {
            Err(AuthorizationError::SignatureMismatch)
        }
    }

    /// Signature for a digest prefix bound to a protected value.
    ///
    /// A key the hash rejects yields `SignatureMismatch`, never an empty signature.
    pub fn sign(&self, digest: &str, protected: &str) -> Result<String, AuthorizationError> {
        let payload = format!("{digest}~url={protected}");
        self.algorithm
            .sign_hex(&self.key, payload.as_bytes())
            .map_err(|_| AuthorizationError::SignatureMismatch)
    }

    /// Build a complete token from ordered fields. Used by signers and tests.
    pub fn issue(&self, fields: &[(&str, &str)], protected: &str) -> Result<String, AuthorizationError> {
        let digest = fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("~");
        let signature = self.sign(&digest, protected)?;
        Ok(format!("{digest}{SIGNATURE_MARKER}{signature}"))
    }
}

/// Split a token into its `key=value` fields, in order.
fn parse_fields(token: &str) -> Result<Vec<(&str, &str)>, AuthorizationError> {
    token
        .split('~')
        .map(|segment| {
            segment
                .split_once('=')
                .ok_or_else(|| AuthorizationError::MalformedToken(segment.to_string()))
        })
        .collect()
}
