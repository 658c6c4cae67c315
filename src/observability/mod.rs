//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!
//! Fields carried on request events:
//!     request_id, outcome, requirement, authorization
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every per-request event
//! - Authorization errors are debug-level; decisions are info-level

pub mod logging;
