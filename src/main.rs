//! Unified subgate CLI.
//!
//! This binary provides a unified interface to the gateway components:
//! - `subgate server` - Run the subscription gateway HTTP server
//! - `subgate customers` - Manage customer records against the store
//!
//! Each subcommand can also be run as a standalone binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Subgate unified CLI.
#[derive(Parser)]
#[command(
    name = "subgate",
    version,
    about = "Proxy subscription gateway",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the subscription gateway server.
    #[command(name = "server", alias = "serve")]
    Server(Box<subgate_server::ServerArgs>),

    /// Manage customer records.
    #[command(name = "customers", alias = "customer")]
    Customers(subgate_store::cli::CustomerArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => subgate_server::cli::run(*args).await,
        Commands::Customers(args) => subgate_store::cli::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
