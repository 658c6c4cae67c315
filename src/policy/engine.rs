//! Decision orchestration.
//!
//! # Responsibilities
//! - Own the compiled modifiers, rules, requirements and templates
//! - Turn one request into one decision
//!
//! # Design Decisions
//! - Immutable after construction; shared across request tasks via `Arc`
//! - Fail-closed: the outcome is Denied unless every requirement passed
//! - The decision borrows its template from the engine; nothing is copied per request

use crate::config::compile::compile;
use crate::config::{ConfigError, DoorkeeperConfig};
use crate::policy::context::CheckContext;
use crate::policy::modifier::ModifierPipeline;
use crate::policy::request::CheckRequest;
use crate::policy::requirement::{evaluate_all, Requirement, Verdict};
use crate::policy::response::{ResponseSet, ResponseTemplate};
use crate::policy::strategy::AuthorizationRule;

/// Final outcome of one authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    Denied,
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
            Outcome::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome with the template to serve.
#[derive(Debug, Clone, Copy)]
pub struct Decision<'e> {
    pub outcome: Outcome,
    pub template: &'e ResponseTemplate,
    /// Name of the requirement that denied the request, if any.
    pub denied_by: Option<&'e str>,
}

/// The compiled policy.
#[derive(Debug)]
pub struct Engine {
    modifiers: ModifierPipeline,
    rules: Vec<AuthorizationRule>,
    requirements: Vec<Requirement>,
    responses: ResponseSet,
}

impl Engine {
    pub fn new(
        modifiers: ModifierPipeline,
        rules: Vec<AuthorizationRule>,
        requirements: Vec<Requirement>,
        responses: ResponseSet,
    ) -> Self {
        Self {
            modifiers,
            rules,
            requirements,
            responses,
        }
    }

    /// Validate and compile a configuration document.
    pub fn from_config(config: &DoorkeeperConfig) -> Result<Self, ConfigError> {
        compile(config)
    }

    /// Rewrite the request, then evaluate requirements in order.
    pub fn decide(&self, request: &mut CheckRequest, ctx: &CheckContext) -> Decision<'_> {
        self.modifiers.apply(request);

        match evaluate_all(&self.requirements, &self.rules, request, ctx) {
            Verdict::Satisfied => Decision {
                outcome: Outcome::Allowed,
                template: &self.responses.allowed,
                denied_by: None,
            },
            Verdict::Failed(requirement) => Decision {
                outcome: Outcome::Denied,
                template: &self.responses.denied,
                denied_by: Some(requirement),
            },
        }
    }

    /// Decision used when the request cannot be processed at all.
    pub fn internal_error(&self) -> Decision<'_> {
        Decision {
            outcome: Outcome::InternalError,
            template: &self.responses.internal_error,
            denied_by: None,
        }
    }

    pub fn modifiers(&self) -> &ModifierPipeline {
        &self.modifiers
    }

    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn responses(&self) -> &ResponseSet {
        &self.responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::policy::token::{HmacAlgorithm, TokenValidator};
    use axum::http::StatusCode;
    use std::time::{Duration, Instant};

    const DOC: &str = r#"
modifiers:
  - type: Path
    path: { pattern: "^/api/v1", replace: "/v2" }
authorizations:
  - name: token
    type: HMAC
    param: { type: Header, name: Authorization }
    hmac:
      mandatoryFields: [exp]
      encryptionKey: "736563726574"
      encryptionAlgorithm: sha256
  - name: version
    type: MATCH
    param: { type: Query, name: v }
    match: { pattern: "^v[0-9]+$" }
requestAuthRequirements:
  - name: signed
    type: all
    authorizations: [token]
  - name: versioned
    type: all
    authorizations: [version]
response:
  allowed: { statusCode: 204 }
  denied: { statusCode: 401, body: denied }
"#;

    fn engine() -> Engine {
        Engine::from_config(&parse_config(DOC).unwrap()).unwrap()
    }

    fn token_for(path: &str) -> String {
        TokenValidator::new(HmacAlgorithm::Sha256, b"secret".to_vec(), vec![])
            .issue(&[("exp", "9999999999")], path)
            .unwrap()
    }

    #[test]
    fn test_allowed_after_path_rewrite() {
        let engine = engine();
        let mut request =
            CheckRequest::new("GET", "example.com", "/api/v1/x?v=v2").with_header("authorization", &token_for("/v2/x"));

        let decision = engine.decide(&mut request, &CheckContext::at(1_700_000_000));

        assert_eq!(request.path, "/v2/x");
        assert_eq!(decision.outcome, Outcome::Allowed);
        assert_eq!(decision.template.status, StatusCode::NO_CONTENT);
        assert_eq!(decision.denied_by, None);
    }

    #[test]
    fn test_token_for_original_path_is_denied() {
        let engine = engine();
        let mut request = CheckRequest::new("GET", "example.com", "/api/v1/x?v=v2")
            .with_header("authorization", &token_for("/api/v1/x"));

        let decision = engine.decide(&mut request, &CheckContext::at(1_700_000_000));

        assert_eq!(decision.outcome, Outcome::Denied);
        assert_eq!(decision.denied_by, Some("signed"));
        assert_eq!(&decision.template.body[..], b"denied");
    }

    #[test]
    fn test_second_requirement_denies() {
        let engine = engine();
        let mut request =
            CheckRequest::new("GET", "example.com", "/api/v1/x?v=beta").with_header("authorization", &token_for("/v2/x"));

        let decision = engine.decide(&mut request, &CheckContext::at(1_700_000_000));

        assert_eq!(decision.outcome, Outcome::Denied);
        assert_eq!(decision.denied_by, Some("versioned"));
    }

    #[test]
    fn test_expired_deadline_fails_closed() {
        let engine = engine();
        let mut request =
            CheckRequest::new("GET", "example.com", "/api/v1/x?v=v2").with_header("authorization", &token_for("/v2/x"));
        let ctx = CheckContext::at(1_700_000_000).with_deadline(Instant::now() - Duration::from_millis(1));

        assert_eq!(engine.decide(&mut request, &ctx).outcome, Outcome::Denied);
    }

    #[test]
    fn test_internal_error_decision() {
        let engine = engine();
        let decision = engine.internal_error();
        assert_eq!(decision.outcome, Outcome::InternalError);
        assert_eq!(decision.template.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(decision.outcome.to_string(), "internal_error");
    }
}
