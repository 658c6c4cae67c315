//! Configuration schema definitions.
//!
//! This module defines the raw configuration document exactly as written by
//! operators. Everything that needs checking (enums, references, patterns)
//! stays a plain string here; `validation.rs` checks it and
//! `policy::Engine::from_config` compiles it into separate runtime types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DoorkeeperConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Listen address (e.g., "0.0.0.0").
    pub address: String,

    /// Listen port, as a number or a string.
    pub port: Port,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request rewrites applied before checks, in order.
    pub modifiers: Vec<ModifierConfig>,

    /// Named authorization rules.
    pub authorizations: Vec<AuthorizationConfig>,

    /// Requirements evaluated in order; the first failure denies.
    pub request_auth_requirements: Vec<RequirementConfig>,

    /// Allowed and denied response templates.
    pub response: ResponseConfig,
}

impl Default for DoorkeeperConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            address: "0.0.0.0".to_string(),
            port: Port::Number(8000),
            timeouts: TimeoutConfig::default(),
            modifiers: Vec::new(),
            authorizations: Vec::new(),
            request_auth_requirements: Vec::new(),
            response: ResponseConfig::default(),
        }
    }
}

impl DoorkeeperConfig {
    /// `address:port` to bind. Only meaningful after validation.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Port written either as `8000` or `"8000"`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

impl Port {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Port::Number(n) => Some(*n),
            Port::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Number(n) => write!(f, "{n}"),
            Port::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds; also bounds policy evaluation.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// A request modifier (`Path` or `Header`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModifierConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub path: Option<PathModifierConfig>,
    pub header: Option<HeaderModifierConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PathModifierConfig {
    pub pattern: Option<String>,
    pub replace: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderModifierConfig {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub replace: String,
}

/// A named authorization rule (`HMAC`, `IPLIST` or `MATCH`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthorizationConfig {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub param: Option<ParamConfig>,
    pub hmac: Option<HmacConfig>,
    pub ip_list: Option<IpListConfig>,
    #[serde(rename = "match")]
    pub match_: Option<MatchConfig>,
}

/// Where the checked value comes from (`Header` or `Query`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamConfig {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HmacConfig {
    /// Only `URL` is supported.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub mandatory_fields: Vec<String>,
    /// Hex-encoded key.
    pub encryption_key: Option<String>,
    /// md5, sha1, sha256 or sha512.
    pub encryption_algorithm: Option<String>,
    pub url: HmacUrlConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HmacUrlConfig {
    /// `Path` or `Header`.
    pub from: String,
    /// Header name when `from` is `Header`.
    pub name: String,
    pub early_encode: bool,
    pub lower_encode: bool,
}

impl Default for HmacUrlConfig {
    fn default() -> Self {
        Self {
            from: "Path".to_string(),
            name: String::new(),
            early_encode: false,
            lower_encode: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IpListConfig {
    pub cidr: Option<String>,
    pub trusted_networks: Vec<String>,
    pub separator: String,
    pub reverse: bool,
}

impl Default for IpListConfig {
    fn default() -> Self {
        Self {
            cidr: None,
            trusted_networks: Vec::new(),
            separator: ",".to_string(),
            reverse: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchConfig {
    pub pattern: Option<String>,
    pub reverse: bool,
}

/// A requirement: `all` or `any` over named authorizations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RequirementConfig {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub authorizations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub allowed: ResponseTemplateConfig,
    pub denied: ResponseTemplateConfig,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            allowed: ResponseTemplateConfig {
                status_code: 200,
                ..Default::default()
            },
            denied: ResponseTemplateConfig {
                status_code: 403,
                headers: BTreeMap::new(),
                body: "Unauthorized".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseTemplateConfig {
    pub status_code: u16,
    pub headers: BTreeMap<String, HeaderValues>,
    pub body: String,
}

/// One header value or several.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn values(&self) -> &[String] {
        match self {
            HeaderValues::One(v) => std::slice::from_ref(v),
            HeaderValues::Many(vs) => vs,
        }
    }
}
