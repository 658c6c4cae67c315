//! Per-evaluation context: the clock reading and the deadline.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::policy::error::AuthorizationError;

/// Values every check in one evaluation shares.
///
/// The clock is read once per request so all signed-token rules agree on "now".
#[derive(Debug, Clone, Copy)]
pub struct CheckContext {
    /// Current time in Unix seconds.
    pub now_unix: i64,
    /// Point after which remaining work is abandoned (fail-closed).
    pub deadline: Option<Instant>,
}

impl CheckContext {
    /// Context reading the system clock, without a deadline.
    pub fn now() -> Self {
        let now_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Self {
            now_unix,
            deadline: None,
        }
    }

    /// Context pinned to a given Unix time.
    pub fn at(now_unix: i64) -> Self {
        Self {
            now_unix,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_budget(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Fails once the deadline has passed.
    pub fn ensure_within_deadline(&self) -> Result<(), AuthorizationError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AuthorizationError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
