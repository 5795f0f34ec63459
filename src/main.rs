//! RPC service
//!
//! A JSON RPC endpoint with an observability sidecar, built with Tokio and
//! Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 RPC SERVICE                  │
//!                         │                                              │
//!   POST /jsonrpc/v2      │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!   ──────────────────────┼─▶│   net   │──▶│   http    │──▶│   rpc    │  │
//!                         │  │listener │   │ RpcServer │   │dispatcher│  │
//!                         │  └─────────┘   └───────────┘   └────┬─────┘  │
//!                         │                                     ▼        │
//!                         │                               ┌──────────┐   │
//!                         │                               │ handler  │   │
//!                         │                               │  (Echo)  │   │
//!                         │                               └──────────┘   │
//!                         │                                              │
//!   GET /metrics          │  ┌────────────────────────────────────────┐  │
//!   GET /debug/pprof/*    │  │ observability: registry, provider,     │  │
//!   ──────────────────────┼─▶│ profiler, logging, trace propagation   │  │
//!                         │  └────────────────────────────────────────┘  │
//!                         │  ┌────────────────────────────────────────┐  │
//!                         │  │ lifecycle: App, run group, signals     │  │
//!                         │  └────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rpc_service::config::{load_or_default, ServiceConfig};
use rpc_service::observability::logging::init_logging;
use rpc_service::App;

#[derive(Parser)]
#[command(name = "rpc-service")]
#[command(version, about = "JSON RPC service with an observability sidecar", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "RPC_SERVICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ServiceConfig::default().observability);
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rpc-service starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        observability_enabled = config.observability.enabled,
        observability_address = %config.observability.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        shutdown_timeout_secs = config.shutdown.timeout_secs,
        "Configuration loaded"
    );

    let mut app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start service");
            return ExitCode::FAILURE;
        }
    };

    app.run().await;
    ExitCode::SUCCESS
}
