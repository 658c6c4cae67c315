//! Doorkeeper (v1)
//!
//! An out-of-process authorization checkpoint. A fronting proxy forwards
//! each request here and serves the allowed or denied response we return.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                    DOORKEEPER                     │
//!                          │                                                   │
//!   Proxy sub-request      │  ┌─────────┐   ┌──────────┐   ┌───────────────┐  │
//!   ───────────────────────┼─▶│  http   │──▶│ modifier │──▶│  requirement  │  │
//!                          │  │ server  │   │ pipeline │   │   composer    │  │
//!                          │  └─────────┘   └──────────┘   └───────┬───────┘  │
//!                          │                                       │          │
//!                          │                                       ▼          │
//!                          │                               ┌───────────────┐  │
//!                          │                               │  strategies   │  │
//!                          │                               │ HMAC/IP/MATCH │  │
//!                          │                               └───────┬───────┘  │
//!   Allowed / Denied       │  ┌─────────┐   ┌──────────┐           │          │
//!   ◀──────────────────────┼──│response │◀──│ decision │◀──────────┘          │
//!                          │  │template │   │          │                      │
//!                          │  └─────────┘   └──────────┘                      │
//!                          │                                                   │
//!                          │  config (YAML → validate → compile) · lifecycle   │
//!                          │  observability (tracing) · /healthz               │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use doorkeeper::config::load_config;
use doorkeeper::lifecycle::{self, signals, Shutdown};
use doorkeeper::observability::logging;

#[derive(Parser)]
#[command(name = "doorkeeper", version)]
#[command(about = "HTTP authorization checkpoint", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "doorkeeper.yaml")]
    config: PathBuf,

    /// Log level; overrides `logLevel` from the config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init(cli.log_level.as_deref().unwrap_or(logging::DEFAULT_LEVEL));
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "doorkeeper starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match lifecycle::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "doorkeeper failed");
            ExitCode::FAILURE
        }
    }
}
