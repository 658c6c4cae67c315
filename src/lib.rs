//! Doorkeeper: an out-of-process HTTP authorization checkpoint.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;

pub use config::schema::DoorkeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use policy::Engine;
