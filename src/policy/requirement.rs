//! Requirement composition.
//!
//! # Responsibilities
//! - Evaluate the rules a requirement references, in listed order
//! - Combine results with ALL / ANY
//! - Stop at the first failing requirement
//!
//! # Design Decisions
//! - A rule error is logged and counted as `false`, never propagated
//! - Requirements hold resolved rule indices, not names (resolved at load)
//! - Evaluation is generic over [`Check`] so composition is testable in isolation

use crate::policy::context::CheckContext;
use crate::policy::request::CheckRequest;
use crate::policy::strategy::Check;

/// How a requirement combines its rule results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    All,
    Any,
}

impl Combinator {
    fn combine(self, results: &[bool]) -> bool {
        match self {
            Combinator::All => !results.contains(&false),
            Combinator::Any => results.contains(&true),
        }
    }
}

impl std::fmt::Display for Combinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Combinator::All => write!(f, "all"),
            Combinator::Any => write!(f, "any"),
        }
    }
}

/// A named group of rules with a combinator.
#[derive(Debug, Clone)]
pub struct Requirement {
    name: String,
    combinator: Combinator,
    rules: Vec<usize>,
}

impl Requirement {
    /// `rules` are indices into the rule table the requirement is evaluated against.
    pub fn new(name: impl Into<String>, combinator: Combinator, rules: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            combinator,
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Evaluate every referenced rule and combine the results.
    pub fn evaluate<C: Check>(&self, rules: &[C], request: &CheckRequest, ctx: &CheckContext) -> bool {
        let mut results = Vec::with_capacity(self.rules.len());

        for &index in &self.rules {
            let Some(rule) = rules.get(index) else {
                results.push(false);
                continue;
            };

            let passed = match ctx.ensure_within_deadline().and_then(|()| rule.check(request, ctx)) {
                Ok(passed) => passed,
                Err(e) => {
                    tracing::debug!(
                        requirement = %self.name,
                        authorization = %rule.name(),
                        error = %e,
                        "Authorization check could not be evaluated"
                    );
                    false
                }
            };

            tracing::debug!(
                requirement = %self.name,
                authorization = %rule.name(),
                result = passed,
                "Authorization check result"
            );
            results.push(passed);
        }

        self.combinator.combine(&results)
    }
}

/// Outcome of evaluating all requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    Satisfied,
    /// The first requirement that failed; nothing after it was evaluated.
    Failed(&'a str),
}

/// Evaluate requirements in order, stopping at the first failure.
pub fn evaluate_all<'a, C: Check>(
    requirements: &'a [Requirement],
    rules: &[C],
    request: &CheckRequest,
    ctx: &CheckContext,
) -> Verdict<'a> {
    for requirement in requirements {
        if !requirement.evaluate(rules, request, ctx) {
            return Verdict::Failed(requirement.name());
        }
    }
    Verdict::Satisfied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::error::AuthorizationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Check with a fixed result that counts invocations.
    struct Fixed {
        name: &'static str,
        result: Result<bool, AuthorizationError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, result: Result<bool, AuthorizationError>) -> Self {
            Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Check for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn check(&self, _request: &CheckRequest, _ctx: &CheckContext) -> Result<bool, AuthorizationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn request() -> CheckRequest {
        CheckRequest::new("GET", "example.com", "/")
    }

    #[test]
    fn test_all_fails_and_short_circuits_later_requirements() {
        let rules = vec![
            Fixed::new("a", Ok(true)),
            Fixed::new("b", Ok(false)),
            Fixed::new("c", Ok(true)),
        ];
        let requirements = vec![
            Requirement::new("first", Combinator::All, vec![0, 1]),
            Requirement::new("second", Combinator::All, vec![2]),
        ];

        let verdict = evaluate_all(&requirements, &rules, &request(), &CheckContext::at(0));

        assert_eq!(verdict, Verdict::Failed("first"));
        assert_eq!(rules[0].calls(), 1);
        assert_eq!(rules[1].calls(), 1);
        assert_eq!(rules[2].calls(), 0, "later requirement must not be evaluated");
    }

    #[test]
    fn test_any_passes_with_one_success() {
        let rules = vec![Fixed::new("a", Ok(false)), Fixed::new("b", Ok(true))];
        let requirement = Requirement::new("either", Combinator::Any, vec![0, 1]);
        assert!(requirement.evaluate(&rules, &request(), &CheckContext::at(0)));
    }

    #[test]
    fn test_errors_count_as_false() {
        let rules = vec![
            Fixed::new("broken", Err(AuthorizationError::MissingSignature)),
            Fixed::new("ok", Ok(true)),
        ];

        let all = Requirement::new("all", Combinator::All, vec![0, 1]);
        assert!(!all.evaluate(&rules, &request(), &CheckContext::at(0)));

        let any = Requirement::new("any", Combinator::Any, vec![0, 1]);
        assert!(any.evaluate(&rules, &request(), &CheckContext::at(0)));

        let only_broken = Requirement::new("any", Combinator::Any, vec![0]);
        assert!(!only_broken.evaluate(&rules, &request(), &CheckContext::at(0)));
    }

    #[test]
    fn test_requirements_in_order_all_pass() {
        let rules = vec![Fixed::new("a", Ok(true)), Fixed::new("b", Ok(true))];
        let requirements = vec![
            Requirement::new("first", Combinator::Any, vec![0]),
            Requirement::new("second", Combinator::All, vec![0, 1]),
        ];
        assert_eq!(
            evaluate_all(&requirements, &rules, &request(), &CheckContext::at(0)),
            Verdict::Satisfied
        );
        assert_eq!(rules[0].calls(), 2);
    }

    #[test]
    fn test_expired_deadline_fails_closed() {
        let rules = vec![Fixed::new("a", Ok(true))];
        let requirement = Requirement::new("r", Combinator::All, vec![0]);
        let ctx = CheckContext::at(0).with_deadline(std::time::Instant::now());
        assert!(!requirement.evaluate(&rules, &request(), &ctx));
        assert_eq!(rules[0].calls(), 0);
    }
}
