//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML)
//!     → loader.rs (expand ${ENV:NAME}$, parse & deserialize)
//!     → validation.rs (presence, enums, references, ranges)
//!     → compile.rs (regexes, networks, keys, templates → policy::Engine)
//!     → Engine (immutable, shared via Arc with request handlers)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - Raw schema and compiled engine are separate types (two-phase build)
//! - Validation separates syntactic (serde) from semantic checks
//! - Any error is fatal at startup; nothing is partially activated

pub mod compile;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::DoorkeeperConfig;
pub use validation::ValidationError;
