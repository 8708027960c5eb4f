//! # Main: CLI Entry Point
//!
//! Routes subcommands to the ledger. `serve` starts the REST API; the entity
//! subcommands (`get`, `list`, `create`, `update`, `delete`, `history`,
//! `verify`, `status`) run one ledger operation against PostgreSQL and print
//! JSON to stdout. `fields` prints a kind's tracked field table and needs no
//! database.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection.
//! - `--config` / `FLEETLEDGER_CONFIG`: TOML settings file.
//! - `--actor` / `FLEETLEDGER_ACTOR`: actor recorded on writes.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fleetledger::EntityKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "fleetledger",
    about = "Fleet asset records with field-level audit history"
)]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Path to a TOML settings file
    #[arg(long, env = "FLEETLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Actor id recorded as updated_by / changed_by on writes
    #[arg(long, env = "FLEETLEDGER_ACTOR")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Listen port (overrides [server] port)
        #[arg(long)]
        port: Option<u16>,
        /// Serve from an in-process store instead of PostgreSQL
        #[arg(long)]
        memory: bool,
    },
    /// Create the fleet tables if they do not exist
    Migrate,
    /// Print one entity
    Get { kind: EntityKind, id: String },
    /// Print every entity of a kind
    List { kind: EntityKind },
    /// Create an entity from field=value assignments
    Create {
        kind: EntityKind,
        /// Field assignment, e.g. --set truckNumber=M-12 (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Update an entity and record field history
    Update {
        kind: EntityKind,
        id: String,
        /// Field assignment, e.g. --set status=Active (repeatable; empty value clears)
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },
    /// Delete an entity and its history
    Delete { kind: EntityKind, id: String },
    /// Print an entity's field history, newest first
    History { kind: EntityKind, id: String },
    /// Record this week's verification for an entity
    Verify { kind: EntityKind, id: String },
    /// Print service-overdue and verification flags
    Status { kind: EntityKind, id: String },
    /// Print the tracked fields of a kind
    Fields { kind: EntityKind },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for containers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Fields { kind } => cli::print_fields(&cli, *kind),
        Commands::Serve { port, memory } => cli::run_serve(&cli, *port, *memory),
        Commands::Migrate => cli::run_migrate(&cli),
        _ => cli::run_entity_command(&cli),
    }
}
