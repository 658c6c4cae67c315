//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the loaded configuration into the policy engine
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only once the engine is ready)

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{ConfigError, DoorkeeperConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::policy::strategy::Check;
use crate::policy::Engine;

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Compile, bind and serve until `shutdown` is triggered.
pub async fn run(config: DoorkeeperConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let engine = Engine::from_config(&config)?;

    tracing::info!(
        modifiers = engine.modifiers().len(),
        authorizations = engine.rules().len(),
        requirements = engine.requirements().len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    for rule in engine.rules() {
        tracing::debug!(
            authorization = rule.name(),
            kind = rule.strategy().kind(),
            param = %rule.param().location,
            "Authorization compiled"
        );
    }
    for requirement in engine.requirements() {
        tracing::debug!(
            requirement = requirement.name(),
            combinator = %requirement.combinator(),
            "Requirement compiled"
        );
    }

    let address = config.bind_address();
    let listener = match TcpListener::bind(address.as_str()).await {
        Ok(listener) => listener,
        Err(source) => return Err(StartupError::Bind { address, source }),
    };

    let server = HttpServer::new(
        Arc::new(engine),
        Duration::from_secs(config.timeouts.request_secs),
    );
    server
        .run(listener, shutdown.wait())
        .await
        .map_err(StartupError::Serve)
}
