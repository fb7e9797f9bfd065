//! CLI module for the subgate server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as the `server` subcommand of the unified
//! subgate CLI.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use subgate_config::{
    CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};
use subgate_store::{CustomerManager, RecordStore};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::state::AppState;

/// Subgate server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "subgate-server", version, about = "Subscription gateway server")]
pub struct ServerArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "subgate.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the subscription gateway with the given arguments.
///
/// This is the main entry point for the server CLI, used by both the
/// standalone binary and the unified subgate CLI.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // A missing config file falls back to defaults so overrides alone are
    // enough to run; an unreadable or malformed one is still an error.
    let mut config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        Config::default()
    };
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);

    if config.admin.password == "changeme" {
        warn!("admin password is the default; set admin.password before exposing the server");
    }

    let mut store = RecordStore::open(&config.storage.path)?;
    if let Some(secs) = config.storage.lock_timeout_secs {
        store = store.with_lock_timeout(Duration::from_secs(secs));
    }
    let manager = Arc::new(CustomerManager::new(store));

    let listen: SocketAddr = config.server.listen.parse()?;
    let state = AppState::new(manager, Arc::new(config.clone()));
    let app = crate::router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(
        listen = %listen,
        base_url = %config.server.base_url,
        storage = %config.storage.path.display(),
        "subgate listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("subgate shut down");
    Ok(())
}

/// Resolves when SIGINT or (on unix) SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_new(base_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            // pretty is default
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}
