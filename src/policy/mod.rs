//! Authorization policy subsystem.
//!
//! # Data Flow
//! ```text
//! CheckRequest (built by the HTTP layer)
//!     → modifier.rs (path/header rewrites, in order)
//!     → requirement.rs (requirements in order, first failure denies)
//!         → strategy/ (one compiled rule per authorization)
//!     → engine.rs (Decision: Allowed / Denied / InternalError + template)
//!     → response.rs (template handed back to the HTTP layer)
//! ```
//!
//! # Design Decisions
//! - Everything here is compiled once and immutable afterwards
//! - No I/O; evaluation is synchronous and lock-free
//! - Errors inside a check never escape a requirement; they count as `false`

pub mod context;
pub mod engine;
pub mod error;
pub mod modifier;
pub mod request;
pub mod requirement;
pub mod response;
pub mod strategy;
pub mod token;

pub use context::CheckContext;
pub use engine::{Decision, Engine, Outcome};
pub use error::AuthorizationError;
pub use request::CheckRequest;
pub use response::ResponseTemplate;
