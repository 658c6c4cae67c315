//! Authorization strategies.
//!
//! # Data Flow
//! ```text
//! CheckRequest
//!     → ParamSource::extract (header or query, empty = missing)
//!     → Strategy variant:
//!         - signed_token.rs  (HMAC token bound to path/header)
//!         - network_list.rs  (forwarded IP list vs CIDR blocks)
//!         - pattern_match.rs (regex substring match)
//!     → Ok(true) pass / Ok(false) condition not met / Err(_) not evaluable
//! ```
//!
//! # Design Decisions
//! - Closed set of kinds, chosen once when the config is compiled
//! - Each variant owns its compiled resources (keys, regexes, networks)
//! - No I/O, no shared state: checks are pure functions of request and context

pub mod network_list;
pub mod pattern_match;
pub mod signed_token;

use crate::policy::context::CheckContext;
use crate::policy::error::AuthorizationError;
use crate::policy::request::{CheckRequest, ParamSource};

pub use network_list::NetworkList;
pub use pattern_match::PatternMatch;
pub use signed_token::{ProtectedValue, SignedToken};

/// Anything the requirement composer can evaluate.
pub trait Check: Send + Sync {
    /// Name used in requirement references and logs.
    fn name(&self) -> &str;

    /// `Ok(false)` means the rule condition was not met; `Err` means the
    /// request could not be evaluated. Both count as a failed check.
    fn check(&self, request: &CheckRequest, ctx: &CheckContext) -> Result<bool, AuthorizationError>;
}

/// Compiled strategy, one variant per authorization kind.
#[derive(Debug)]
pub enum Strategy {
    SignedToken(SignedToken),
    NetworkList(NetworkList),
    PatternMatch(PatternMatch),
}

impl Strategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::SignedToken(_) => "HMAC",
            Strategy::NetworkList(_) => "IPLIST",
            Strategy::PatternMatch(_) => "MATCH",
        }
    }
}

/// A named, compiled authorization rule.
#[derive(Debug)]
pub struct AuthorizationRule {
    name: String,
    param: ParamSource,
    strategy: Strategy,
}

impl AuthorizationRule {
    pub fn new(name: impl Into<String>, param: ParamSource, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            param,
            strategy,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn param(&self) -> &ParamSource {
        &self.param
    }
}

impl Check for AuthorizationRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, request: &CheckRequest, ctx: &CheckContext) -> Result<bool, AuthorizationError> {
        let value = self
            .param
            .extract(request)
            .ok_or_else(|| AuthorizationError::MissingParameter {
                location: self.param.location,
                name: self.param.name.clone(),
            })?;

        match &self.strategy {
            Strategy::SignedToken(s) => s.check(value, request, ctx),
            Strategy::NetworkList(s) => s.check(value, ctx),
            Strategy::PatternMatch(s) => Ok(s.check(value)),
        }
    }
}
