//! Compilation of a validated document into the runtime policy engine.
//!
//! # Responsibilities
//! - Compile regexes, CIDR blocks, keys and header names exactly once
//! - Resolve requirement → rule names into indices
//! - Build the immutable [`Engine`]
//!
//! # Design Decisions
//! - Never mutates the parsed document; produces separate compiled types
//! - Collects every compile error before failing, like validation does

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use ipnet::IpNet;
use regex::Regex;

use crate::config::loader::ConfigError;
use crate::config::schema::{
    AuthorizationConfig, DoorkeeperConfig, HmacConfig, IpListConfig, ModifierConfig, ResponseTemplateConfig,
};
use crate::config::validation::{
    parse_combinator, parse_location, scope, validate_config, ModifierKind, RuleKind, ValidationError,
};
use crate::policy::engine::Engine;
use crate::policy::modifier::{Modifier, ModifierPipeline};
use crate::policy::request::{ParamLocation, ParamSource};
use crate::policy::requirement::Requirement;
use crate::policy::response::{ResponseSet, ResponseTemplate};
use crate::policy::strategy::{AuthorizationRule, NetworkList, PatternMatch, ProtectedValue, SignedToken, Strategy};
use crate::policy::token::{HmacAlgorithm, TokenValidator};

/// Validate and compile the document into an [`Engine`].
pub fn compile(config: &DoorkeeperConfig) -> Result<Engine, ConfigError> {
    validate_config(config)?;

    let mut errors = Vec::new();

    let modifiers: Vec<Modifier> = config
        .modifiers
        .iter()
        .enumerate()
        .filter_map(|(index, modifier)| compile_modifier(index, modifier, &mut errors))
        .collect();

    let rules: Vec<AuthorizationRule> = config
        .authorizations
        .iter()
        .enumerate()
        .filter_map(|(index, auth)| compile_rule(index, auth, &mut errors))
        .collect();

    let rule_index: HashMap<&str, usize> = config
        .authorizations
        .iter()
        .enumerate()
        .filter_map(|(index, auth)| auth.name.as_deref().map(|name| (name, index)))
        .collect();

    let mut requirements = Vec::with_capacity(config.request_auth_requirements.len());
    for (index, requirement) in config.request_auth_requirements.iter().enumerate() {
        let name = requirement.name.clone().unwrap_or_default();
        let scope = scope("requestAuthRequirements", index, Some(&name));

        let Some(combinator) = requirement.kind.as_deref().and_then(parse_combinator) else {
            errors.push(ValidationError::MissingField { scope, field: "type" });
            continue;
        };

        let mut indices = Vec::with_capacity(requirement.authorizations.len());
        for rule in &requirement.authorizations {
            match rule_index.get(rule.as_str()) {
                Some(&i) => indices.push(i),
                None => errors.push(ValidationError::UnknownRule {
                    requirement: name.clone(),
                    rule: rule.clone(),
                }),
            }
        }
        requirements.push(Requirement::new(name, combinator, indices));
    }

    let allowed = compile_template("response.allowed", &config.response.allowed, &mut errors);
    let denied = compile_template("response.denied", &config.response.denied, &mut errors);

    match (allowed, denied) {
        (Some(allowed), Some(denied)) if errors.is_empty() => Ok(Engine::new(
            ModifierPipeline::new(modifiers),
            rules,
            requirements,
            ResponseSet::new(allowed, denied),
        )),
        _ => Err(ConfigError::Validation(errors)),
    }
}

fn compile_pattern(scope: &str, pattern: &str, errors: &mut Vec<ValidationError>) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(source) => {
            errors.push(ValidationError::InvalidPattern {
                scope: scope.to_string(),
                source,
            });
            None
        }
    }
}

fn compile_network(scope: &str, value: &str, errors: &mut Vec<ValidationError>) -> Option<IpNet> {
    match value.trim().parse::<IpNet>() {
        Ok(net) => Some(net),
        Err(source) => {
            errors.push(ValidationError::InvalidNetwork {
                scope: scope.to_string(),
                value: value.to_string(),
                source,
            });
            None
        }
    }
}

fn compile_modifier(index: usize, config: &ModifierConfig, errors: &mut Vec<ValidationError>) -> Option<Modifier> {
    let scope = scope("modifiers", index, None);

    match config.kind.as_deref().and_then(ModifierKind::parse)? {
        ModifierKind::Path => {
            let path = config.path.as_ref()?;
            let pattern = compile_pattern(&scope, path.pattern.as_deref()?, errors)?;
            Some(Modifier::Path {
                pattern,
                replace: path.replace.clone(),
            })
        }
        ModifierKind::Header => {
            let header = config.header.as_ref()?;
            let raw_name = header.name.as_deref()?;
            let name = match HeaderName::from_bytes(raw_name.as_bytes()) {
                Ok(name) => Some(name),
                Err(_) => {
                    errors.push(ValidationError::InvalidHeader {
                        scope: scope.clone(),
                        header: raw_name.to_string(),
                    });
                    None
                }
            };
            let pattern = compile_pattern(&scope, header.pattern.as_deref()?, errors);
            Some(Modifier::Header {
                name: name?,
                pattern: pattern?,
                replace: header.replace.clone(),
            })
        }
    }
}

fn compile_rule(index: usize, config: &AuthorizationConfig, errors: &mut Vec<ValidationError>) -> Option<AuthorizationRule> {
    let name = config.name.as_deref()?;
    let scope = scope("authorizations", index, Some(name));

    let param = config.param.as_ref()?;
    let location = param.kind.as_deref().and_then(parse_location)?;
    let param = ParamSource::new(location, param.name.as_deref()?);

    let strategy = match config.kind.as_deref().and_then(RuleKind::parse)? {
        RuleKind::Hmac => Strategy::SignedToken(compile_signed_token(&scope, config.hmac.as_ref()?, errors)?),
        RuleKind::IpList => Strategy::NetworkList(compile_network_list(&scope, config.ip_list.as_ref()?, errors)?),
        RuleKind::Match => {
            let m = config.match_.as_ref()?;
            let pattern = compile_pattern(&scope, m.pattern.as_deref()?, errors)?;
            Strategy::PatternMatch(PatternMatch::new(pattern, m.reverse))
        }
    };

    Some(AuthorizationRule::new(name, param, strategy))
}

fn compile_signed_token(scope: &str, config: &HmacConfig, errors: &mut Vec<ValidationError>) -> Option<SignedToken> {
    let algorithm: HmacAlgorithm = config.encryption_algorithm.as_deref()?.parse().ok()?;

    let key = match hex::decode(config.encryption_key.as_deref()?.trim()) {
        Ok(key) => key,
        Err(source) => {
            errors.push(ValidationError::InvalidKey {
                scope: scope.to_string(),
                source,
            });
            return None;
        }
    };

    let protected = match parse_location(&config.url.from) {
        Some(ParamLocation::Header) => ProtectedValue::Header(config.url.name.clone()),
        _ => ProtectedValue::Path,
    };

    Some(SignedToken::new(
        TokenValidator::new(algorithm, key, config.mandatory_fields.clone()),
        protected,
        config.url.early_encode,
        config.url.lower_encode,
    ))
}

fn compile_network_list(scope: &str, config: &IpListConfig, errors: &mut Vec<ValidationError>) -> Option<NetworkList> {
    let target = compile_network(scope, config.cidr.as_deref()?, errors);
    let trusted: Vec<Option<IpNet>> = config
        .trusted_networks
        .iter()
        .map(|net| compile_network(scope, net, errors))
        .collect();

    let target = target?;
    let trusted = trusted.into_iter().collect::<Option<Vec<_>>>()?;
    Some(NetworkList::new(target, trusted, config.separator.clone(), config.reverse))
}

fn compile_template(
    scope: &str,
    config: &ResponseTemplateConfig,
    errors: &mut Vec<ValidationError>,
) -> Option<ResponseTemplate> {
    let status = StatusCode::from_u16(config.status_code).ok()?;

    let mut headers = HeaderMap::new();
    let mut valid = true;
    for (name, values) in &config.headers {
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            errors.push(ValidationError::InvalidHeader {
                scope: scope.to_string(),
                header: name.clone(),
            });
            valid = false;
            continue;
        };

        for value in values.values() {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(header_name.clone(), value);
                }
                Err(_) => {
                    errors.push(ValidationError::InvalidHeader {
                        scope: scope.to_string(),
                        header: name.clone(),
                    });
                    valid = false;
                }
            }
        }
    }

    valid.then(|| ResponseTemplate::new(status, headers, config.body.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    fn compile_str(doc: &str) -> Result<Engine, ConfigError> {
        compile(&parse_config(doc).unwrap())
    }

    const RULES: &str = r#"
authorizations:
  - name: token
    type: HMAC
    param: { type: Header, name: Authorization }
    hmac:
      mandatoryFields: [exp]
      encryptionKey: "6b6579"
      encryptionAlgorithm: sha256
  - name: client
    type: IPLIST
    param: { type: Header, name: X-Forwarded-For }
    ipList: { cidr: 192.168.1.0/24, trustedNetworks: [10.0.0.0/8] }
requestAuthRequirements:
  - name: main
    type: any
    authorizations: [token, client]
response:
  allowed: { statusCode: 200, headers: { x-result: allowed } }
  denied: { statusCode: 401, headers: { x-result: [denied, policy] }, body: nope }
"#;

    #[test]
    fn test_compiles_valid_document() {
        let engine = compile_str(RULES).unwrap();
        assert_eq!(engine.rules().len(), 2);
        assert_eq!(engine.requirements().len(), 1);
        assert_eq!(engine.responses().denied.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            engine
                .responses()
                .denied
                .headers
                .get_all("x-result")
                .iter()
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_regex_and_cidr_are_collected() {
        let doc = r#"
modifiers:
  - type: Path
    path: { pattern: "([unclosed", replace: "" }
authorizations:
  - name: client
    type: IPLIST
    param: { type: Header, name: X-Forwarded-For }
    ipList: { cidr: 192.168.1.0/33, trustedNetworks: [not-a-network] }
  - name: version
    type: MATCH
    param: { type: Query, name: v }
    match: { pattern: "*" }
requestAuthRequirements:
  - name: main
    type: all
    authorizations: [client, version]
"#;
        let Err(ConfigError::Validation(errors)) = compile_str(doc) else {
            panic!("expected validation errors");
        };

        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidPattern { .. }))
                .count(),
            2
        );
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidNetwork { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_invalid_key_and_header() {
        let doc = RULES
            .replace("\"6b6579\"", "\"not-hex\"")
            .replace("x-result: allowed", "\"bad header\": allowed");
        let Err(ConfigError::Validation(errors)) = compile_str(&doc) else {
            panic!("expected validation errors");
        };
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidKey { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidHeader { header, .. } if header == "bad header")));
    }

    #[test]
    fn test_unknown_reference_fails_before_compiling() {
        let doc = RULES.replace("[token, client]", "[token, nobody]");
        let Err(ConfigError::Validation(errors)) = compile_str(&doc) else {
            panic!("expected validation errors");
        };
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::UnknownRule { rule, .. }] if rule == "nobody"
        ));
    }
}
