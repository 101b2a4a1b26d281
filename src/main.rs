//! Stagecast server binary
//!
//! ## Environment variables
//!
//! | Variable                      | Required | Description                               |
//! |-------------------------------|----------|-------------------------------------------|
//! | `ATXP_CONNECTION_STRING`      | Yes      | Account connection string (with token)    |
//! | `PORT`                        | No       | Listen port (default: 3001)               |
//! | `STAGECAST_BIND_ADDRESS`      | No       | Bind address, overrides `PORT`            |
//! | `STAGECAST_CONFIG`            | No       | Path to a TOML config file                |
//! | `STAGECAST_CORS_ORIGINS`      | No       | Comma-separated allowed origins           |
//! | `STAGECAST_CALL_TIMEOUT_SECS` | No       | Per tool call timeout (0 = none)          |
//! | `STAGECAST_LOG_JSON`          | No       | Emit JSON logs                            |
//! | `RUST_LOG`                    | No       | Log filter (default: info,stagecast=debug)|

use anyhow::{Context, Result};
use clap::Parser;
use stagecast::config::{AppConfig, Overrides};
use stagecast::{
    create_app, AppState, BroadcastRegistry, InMemorySubmissions, McpClientFactory,
    PipelineOrchestrator, StageReporter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stagecast")]
#[command(about = "Staged tool pipeline with live SSE progress")]
#[command(version)]
struct CliArgs {
    /// TOML config file
    #[arg(long, env = "STAGECAST_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Account connection string
    #[arg(long, env = "ATXP_CONNECTION_STRING", hide_env_values = true)]
    connection_string: Option<String>,

    /// Bind address (overrides --port)
    #[arg(long, env = "STAGECAST_BIND_ADDRESS", value_name = "HOST:PORT")]
    bind_address: Option<String>,

    /// Port to listen on (default: 3001)
    #[arg(long, short, env = "PORT")]
    port: Option<u16>,

    /// Payment network for the account
    #[arg(long, env = "STAGECAST_NETWORK")]
    network: Option<String>,

    /// Allowed CORS origins
    #[arg(long, env = "STAGECAST_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Option<Vec<String>>,

    /// Per tool call timeout in seconds (0 = none)
    #[arg(long, env = "STAGECAST_CALL_TIMEOUT_SECS")]
    call_timeout_secs: Option<u64>,

    /// Interval between SSE keep-alive comments
    #[arg(long, env = "STAGECAST_KEEPALIVE_SECS")]
    keepalive_secs: Option<u64>,

    /// Frames buffered per progress observer
    #[arg(long, env = "STAGECAST_OBSERVER_BUFFER")]
    observer_buffer: Option<usize>,

    /// Directory with a built frontend to serve
    #[arg(long, env = "STAGECAST_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Primary (image) tool server URL
    #[arg(long, env = "STAGECAST_PRIMARY_ENDPOINT")]
    primary_endpoint: Option<String>,

    /// Dependent (file storage) tool server URL
    #[arg(long, env = "STAGECAST_DEPENDENT_ENDPOINT")]
    dependent_endpoint: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "STAGECAST_LOG_JSON")]
    log_json: bool,
}

impl CliArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            connection_string: self.connection_string.clone(),
            bind_address: self.bind_address.clone(),
            port: self.port,
            network: self.network.clone(),
            cors_origins: self.cors_origins.clone(),
            call_timeout_secs: self.call_timeout_secs,
            keepalive_secs: self.keepalive_secs,
            observer_buffer: self.observer_buffer,
            static_dir: self.static_dir.clone(),
            primary_endpoint: self.primary_endpoint.clone(),
            dependent_endpoint: self.dependent_endpoint.clone(),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stagecast=debug"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = AppConfig::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;
    let account = config.account().context("Failed to parse ATXP_CONNECTION_STRING")?;

    info!(
        bind = %config.bind_address,
        network = %account.network(),
        account = account.account_id().unwrap_or("unknown"),
        "Starting Stagecast"
    );

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let registry = Arc::new(BroadcastRegistry::new());
    let clients = McpClientFactory::new().context("Failed to build HTTP client")?;
    let orchestrator = PipelineOrchestrator::new(
        StageReporter::new(Arc::clone(&registry)),
        Arc::new(clients),
        account,
        config.primary_service(),
        config.dependent_service(),
        Arc::new(InMemorySubmissions::new()),
    )
    .with_call_timeout(config.call_timeout);

    // ── HTTP Server ───────────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let state = AppState::new(registry, Arc::new(orchestrator))
        .with_config(&config)
        .with_shutdown(shutdown.clone());
    let app = create_app(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!(address = %config.bind_address, "Stagecast listening");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")?;

    info!("Stagecast shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
