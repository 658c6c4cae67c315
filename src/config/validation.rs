//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Presence and enum checks on every modifier, rule and requirement
//! - Referential integrity (requirements reference existing rules)
//! - Value ranges (status codes, port, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DoorkeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before anything is compiled; compilation only sees checked documents

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{
    AuthorizationConfig, DoorkeeperConfig, ModifierConfig, RequirementConfig, ResponseTemplateConfig,
};
use crate::policy::request::ParamLocation;
use crate::policy::requirement::Combinator;
use crate::policy::token::HmacAlgorithm;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration document.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{scope}: missing required field '{field}'")]
    MissingField { scope: String, field: &'static str },

    #[error("{scope}: invalid {field} '{value}' (expected one of: {expected})")]
    InvalidValue {
        scope: String,
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("duplicate authorization name '{0}'")]
    DuplicateRule(String),

    #[error("requirement '{requirement}' references unknown authorization '{rule}'")]
    UnknownRule { requirement: String, rule: String },

    #[error("requirement '{0}' references no authorizations")]
    EmptyRequirement(String),

    #[error("no authorizations configured")]
    NoRules,

    #[error("no request auth requirements configured")]
    NoRequirements,

    #[error("{scope}: status code {code} out of range 100-599")]
    StatusCode { scope: String, code: u16 },

    #[error("{scope}: invalid pattern: {source}")]
    InvalidPattern {
        scope: String,
        #[source]
        source: regex::Error,
    },

    #[error("{scope}: invalid network '{value}': {source}")]
    InvalidNetwork {
        scope: String,
        value: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    #[error("{scope}: encryption key is not valid hex: {source}")]
    InvalidKey {
        scope: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("{scope}: invalid header '{header}'")]
    InvalidHeader { scope: String, header: String },

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("timeouts.requestSecs must be greater than zero")]
    ZeroTimeout,
}

/// Authorization kinds as written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Hmac,
    IpList,
    Match,
}

impl RuleKind {
    pub const NAMES: &'static str = "HMAC, IPLIST, MATCH";

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hmac" => Some(RuleKind::Hmac),
            "iplist" => Some(RuleKind::IpList),
            "match" => Some(RuleKind::Match),
            _ => None,
        }
    }
}

/// Modifier kinds as written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Path,
    Header,
}

impl ModifierKind {
    pub const NAMES: &'static str = "Path, Header";

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "path" => Some(ModifierKind::Path),
            "header" => Some(ModifierKind::Header),
            _ => None,
        }
    }
}

pub fn parse_location(value: &str) -> Option<ParamLocation> {
    match value.to_ascii_lowercase().as_str() {
        "header" => Some(ParamLocation::Header),
        "query" => Some(ParamLocation::Query),
        _ => None,
    }
}

pub fn parse_combinator(value: &str) -> Option<Combinator> {
    match value.to_ascii_lowercase().as_str() {
        "all" => Some(Combinator::All),
        "any" => Some(Combinator::Any),
        _ => None,
    }
}

/// Location label used in error messages, e.g. `authorizations[2] "ip-check"`.
pub fn scope(section: &str, index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{section}[{index}] \"{name}\""),
        None => format!("{section}[{index}]"),
    }
}

/// Validate the whole document, collecting every problem.
pub fn validate_config(config: &DoorkeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidValue {
            scope: "root".to_string(),
            field: "logLevel",
            value: config.log_level.clone(),
            expected: LOG_LEVELS.join(", "),
        });
    }

    if config.port.as_u16().is_none() {
        errors.push(ValidationError::InvalidPort(config.port.to_string()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for (index, modifier) in config.modifiers.iter().enumerate() {
        validate_modifier(index, modifier, &mut errors);
    }

    if config.authorizations.is_empty() {
        errors.push(ValidationError::NoRules);
    }

    let mut names = HashSet::new();
    for (index, auth) in config.authorizations.iter().enumerate() {
        if let Some(name) = auth.name.as_deref() {
            if !names.insert(name) {
                errors.push(ValidationError::DuplicateRule(name.to_string()));
            }
        }
        validate_authorization(index, auth, &mut errors);
    }

    if config.request_auth_requirements.is_empty() {
        errors.push(ValidationError::NoRequirements);
    }

    for (index, requirement) in config.request_auth_requirements.iter().enumerate() {
        validate_requirement(index, requirement, &names, &mut errors);
    }

    validate_status("response.allowed", &config.response.allowed, &mut errors);
    validate_status("response.denied", &config.response.denied, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_modifier(index: usize, modifier: &ModifierConfig, errors: &mut Vec<ValidationError>) {
    let scope = scope("modifiers", index, None);

    let Some(kind) = modifier.kind.as_deref() else {
        errors.push(ValidationError::MissingField { scope, field: "type" });
        return;
    };

    match ModifierKind::parse(kind) {
        Some(ModifierKind::Path) => match &modifier.path {
            Some(path) if path.pattern.is_some() => {}
            Some(_) => errors.push(ValidationError::MissingField { scope, field: "path.pattern" }),
            None => errors.push(ValidationError::MissingField { scope, field: "path" }),
        },
        Some(ModifierKind::Header) => match &modifier.header {
            Some(header) => {
                if header.name.as_deref().map_or(true, str::is_empty) {
                    errors.push(ValidationError::MissingField {
                        scope: scope.clone(),
                        field: "header.name",
                    });
                }
                if header.pattern.is_none() {
                    errors.push(ValidationError::MissingField { scope, field: "header.pattern" });
                }
            }
            None => errors.push(ValidationError::MissingField { scope, field: "header" }),
        },
        None => errors.push(ValidationError::InvalidValue {
            scope,
            field: "type",
            value: kind.to_string(),
            expected: ModifierKind::NAMES.to_string(),
        }),
    }
}

fn validate_authorization(index: usize, auth: &AuthorizationConfig, errors: &mut Vec<ValidationError>) {
    let name = auth.name.as_deref().filter(|n| !n.is_empty());
    let scope = scope("authorizations", index, name);

    if name.is_none() {
        errors.push(ValidationError::MissingField {
            scope: scope.clone(),
            field: "name",
        });
    }

    match &auth.param {
        Some(param) => {
            match param.kind.as_deref() {
                Some(kind) if parse_location(kind).is_none() => errors.push(ValidationError::InvalidValue {
                    scope: scope.clone(),
                    field: "param.type",
                    value: kind.to_string(),
                    expected: "Header, Query".to_string(),
                }),
                Some(_) => {}
                None => errors.push(ValidationError::MissingField {
                    scope: scope.clone(),
                    field: "param.type",
                }),
            }
            if param.name.as_deref().map_or(true, str::is_empty) {
                errors.push(ValidationError::MissingField {
                    scope: scope.clone(),
                    field: "param.name",
                });
            }
        }
        None => errors.push(ValidationError::MissingField {
            scope: scope.clone(),
            field: "param",
        }),
    }

    let Some(kind) = auth.kind.as_deref() else {
        errors.push(ValidationError::MissingField { scope, field: "type" });
        return;
    };

    match RuleKind::parse(kind) {
        Some(RuleKind::Hmac) => validate_hmac(&scope, auth, errors),
        Some(RuleKind::IpList) => match &auth.ip_list {
            Some(ip_list) => {
                if ip_list.cidr.is_none() {
                    errors.push(ValidationError::MissingField {
                        scope: scope.clone(),
                        field: "ipList.cidr",
                    });
                }
                if ip_list.separator.is_empty() {
                    errors.push(ValidationError::MissingField { scope, field: "ipList.separator" });
                }
            }
            None => errors.push(ValidationError::MissingField { scope, field: "ipList" }),
        },
        Some(RuleKind::Match) => match &auth.match_ {
            Some(m) if m.pattern.is_some() => {}
            Some(_) => errors.push(ValidationError::MissingField { scope, field: "match.pattern" }),
            None => errors.push(ValidationError::MissingField { scope, field: "match" }),
        },
        None => errors.push(ValidationError::InvalidValue {
            scope,
            field: "type",
            value: kind.to_string(),
            expected: RuleKind::NAMES.to_string(),
        }),
    }
}

fn validate_hmac(scope: &str, auth: &AuthorizationConfig, errors: &mut Vec<ValidationError>) {
    let Some(hmac) = &auth.hmac else {
        errors.push(ValidationError::MissingField {
            scope: scope.to_string(),
            field: "hmac",
        });
        return;
    };

    if let Some(kind) = hmac.kind.as_deref() {
        if !kind.eq_ignore_ascii_case("url") {
            errors.push(ValidationError::InvalidValue {
                scope: scope.to_string(),
                field: "hmac.type",
                value: kind.to_string(),
                expected: "URL".to_string(),
            });
        }
    }

    if hmac.encryption_key.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::MissingField {
            scope: scope.to_string(),
            field: "hmac.encryptionKey",
        });
    }

    match hmac.encryption_algorithm.as_deref() {
        Some(algorithm) if algorithm.parse::<HmacAlgorithm>().is_err() => {
            errors.push(ValidationError::InvalidValue {
                scope: scope.to_string(),
                field: "hmac.encryptionAlgorithm",
                value: algorithm.to_string(),
                expected: HmacAlgorithm::NAMES.join(", "),
            });
        }
        Some(_) => {}
        None => errors.push(ValidationError::MissingField {
            scope: scope.to_string(),
            field: "hmac.encryptionAlgorithm",
        }),
    }

    match parse_location(&hmac.url.from) {
        Some(ParamLocation::Header) if hmac.url.name.is_empty() => {
            errors.push(ValidationError::MissingField {
                scope: scope.to_string(),
                field: "hmac.url.name",
            });
        }
        Some(ParamLocation::Header) => {}
        _ if hmac.url.from.eq_ignore_ascii_case("path") => {}
        _ => errors.push(ValidationError::InvalidValue {
            scope: scope.to_string(),
            field: "hmac.url.from",
            value: hmac.url.from.clone(),
            expected: "Path, Header".to_string(),
        }),
    }
}

fn validate_requirement(
    index: usize,
    requirement: &RequirementConfig,
    rule_names: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    let name = requirement.name.as_deref().filter(|n| !n.is_empty());
    let scope = scope("requestAuthRequirements", index, name);

    if name.is_none() {
        errors.push(ValidationError::MissingField {
            scope: scope.clone(),
            field: "name",
        });
    }

    match requirement.kind.as_deref() {
        Some(kind) if parse_combinator(kind).is_none() => errors.push(ValidationError::InvalidValue {
            scope: scope.clone(),
            field: "type",
            value: kind.to_string(),
            expected: "all, any".to_string(),
        }),
        Some(_) => {}
        None => errors.push(ValidationError::MissingField {
            scope: scope.clone(),
            field: "type",
        }),
    }

    let label = name.map_or(scope, str::to_string);
    if requirement.authorizations.is_empty() {
        errors.push(ValidationError::EmptyRequirement(label.clone()));
    }

    for rule in &requirement.authorizations {
        if !rule_names.contains(rule.as_str()) {
            errors.push(ValidationError::UnknownRule {
                requirement: label.clone(),
                rule: rule.clone(),
            });
        }
    }
}

fn validate_status(scope: &str, template: &ResponseTemplateConfig, errors: &mut Vec<ValidationError>) {
    if !(100..=599).contains(&template.status_code) {
        errors.push(ValidationError::StatusCode {
            scope: scope.to_string(),
            code: template.status_code,
        });
    }
}
