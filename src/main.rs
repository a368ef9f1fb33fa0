//! Granary CLI Entry Point
//!
//! This is the main binary entry point for the Granary CLI.
//! It provides three subcommands:
//! - `serve` - MCP server mode (for AI agent integration)
//! - `list` - List all databases in the storage directory
//! - `info` - Show details for one database
//!
//! All output to stdout is JSON-only. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use granary::mcp::{self, GranaryServer};
use granary::{catalog, Store};

/// Granary - Agent-First SQLite Database Manager
#[derive(Parser)]
#[command(name = "granary")]
#[command(about = "Agent-first SQLite database manager with self-documenting schemas")]
#[command(version)]
struct Cli {
    /// Storage directory for database files (overrides GRANARY_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdio (for AI agent integration)
    Serve,

    /// List all databases in the storage directory
    List,

    /// Show details for one database
    Info {
        /// Database name
        database: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries protocol/result JSON only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = Store::resolve(cli.data_dir);

    match cli.command {
        Commands::Serve => {
            let server = GranaryServer::new(store);
            if let Err(e) = mcp::serve(server).await {
                tracing::error!(error = %e, "server terminated");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Commands::List => emit(catalog::list_databases(&store)),
        Commands::Info { database } => emit(catalog::get_database_info(&store, &database)),
    }
}

fn emit<T: serde::Serialize>(result: granary::Result<T>) -> ExitCode {
    match result {
        Ok(payload) => {
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize output");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error = serde_json::json!({
                "status": "error",
                "error_code": e.error_code(),
                "message": e.message(),
            });
            println!("{}", serde_json::to_string_pretty(&error).unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}
