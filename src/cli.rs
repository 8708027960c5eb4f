//! # CLI Execution Functions
//!
//! Execution logic for each subcommand, kept out of `main.rs`. Entity
//! commands print JSON to stdout; progress and warnings go to stderr.

use anyhow::Result;
use fleetledger::api::{self, AppState};
use fleetledger::clock::SystemClock;
use fleetledger::config::{self, Settings};
use fleetledger::store::{EntityStore, MemoryStore, PgStore};
use fleetledger::{EntityKind, FleetLedger, NoActor, Payload, StaticActor, UpdateOutcome};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Cli, Commands};

fn database_url(cli: &Cli) -> Result<&str> {
    cli.database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required (set via --database-url or env)"))
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    config::load(cli.config.as_deref())
}

fn build_ledger(cli: &Cli, store: Arc<dyn EntityStore>, settings: &Settings) -> FleetLedger {
    let ledger = FleetLedger::new(store)
        .with_settings(settings)
        .with_clock(Arc::new(SystemClock));
    match cli.actor.as_deref() {
        Some(actor) => ledger.with_actor_resolver(Arc::new(StaticActor(actor.to_string()))),
        None => ledger.with_actor_resolver(Arc::new(NoActor)),
    }
}

/// Parse `field=value` assignments. An empty value clears the field.
pub fn parse_assignments(items: &[String]) -> Result<Payload> {
    let mut payload = Payload::new();
    for item in items {
        let (field, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected FIELD=VALUE, got '{}'", item))?;
        let field = field.trim();
        if field.is_empty() {
            anyhow::bail!("empty field name in '{}'", item);
        }
        let value = if value.is_empty() {
            Value::Null
        } else {
            Value::String(value.to_string())
        };
        payload.insert(field.to_string(), value);
    }
    Ok(payload)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Server ──────────────────────────────────────────────────────

pub fn run_serve(cli: &Cli, port: Option<u16>, memory: bool) -> Result<()> {
    let mut settings = load_settings(cli)?;
    if let Some(port) = port {
        settings.server.port = port;
    }
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let store: Arc<dyn EntityStore> = if memory {
            warn!("serving from an in-process store; data is lost on exit");
            Arc::new(MemoryStore::new())
        } else {
            let pg = PgStore::connect(database_url(cli)?).await?;
            pg.apply_schema().await?;
            Arc::new(pg)
        };
        let ledger = build_ledger(cli, store, &settings);
        api::run(AppState::new(ledger), &settings.server).await
    })
}

pub fn run_migrate(cli: &Cli) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pg = PgStore::connect(database_url(cli)?).await?;
        pg.apply_schema().await?;
        info!("fleet tables ready");
        Ok::<(), anyhow::Error>(())
    })
}

// ── Entity Commands ─────────────────────────────────────────────

pub fn run_entity_command(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pg = PgStore::connect(database_url(cli)?).await?;
        let ledger = build_ledger(cli, Arc::new(pg), &settings);

        match &cli.command {
            Commands::Get { kind, id } => print_json(&ledger.get(*kind, id).await?),
            Commands::List { kind } => {
                let rows = ledger.list(*kind).await?;
                eprintln!("{} {}", rows.len(), kind);
                print_json(&rows)
            }
            Commands::Create { kind, set } => {
                let payload = parse_assignments(set)?;
                let row = ledger.create(*kind, &payload, None).await?;
                eprintln!("Created {} {}", kind, row.id);
                print_json(&row)
            }
            Commands::Update { kind, id, set } => {
                let payload = parse_assignments(set)?;
                let outcome = ledger.update(*kind, id, &payload, None).await?;
                if let UpdateOutcome::UpdatedWithAuditWarning { diffs, error, .. } = &outcome {
                    eprintln!(
                        "Warning: entity updated but {} history row(s) were not recorded: {}",
                        diffs.len(),
                        error
                    );
                }
                print_json(outcome.entity())
            }
            Commands::Delete { kind, id } => {
                ledger.delete(*kind, id).await?;
                eprintln!("Deleted {} {}", kind, id);
                Ok(())
            }
            Commands::History { kind, id } => print_json(&ledger.history(*kind, id).await?),
            Commands::Verify { kind, id } => print_json(&ledger.verify(*kind, id, None).await?),
            Commands::Status { kind, id } => print_json(&ledger.status(*kind, id).await?),
            Commands::Serve { .. } | Commands::Migrate | Commands::Fields { .. } => {
                anyhow::bail!("not an entity command")
            }
        }
    })
}

pub fn print_fields(cli: &Cli, kind: EntityKind) -> Result<()> {
    let settings = load_settings(cli)?;
    let cfg = kind.config();
    println!("{} ({}, history in {})", kind, cfg.table, cfg.history_table);
    println!("{:<22} {:<22} {}", "FIELD", "COLUMN", "TYPE");
    for spec in cfg.fields {
        println!(
            "{:<22} {:<22} {}",
            spec.logical_name, spec.storage_column, spec.field_type
        );
    }
    for column in cfg.untracked {
        println!("{:<22} {:<22} untracked", column, column);
    }
    println!(
        "service overdue after {} days",
        settings.service.threshold_days(kind)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_split_on_first_equals() {
        let payload = parse_assignments(&[
            "status=In Shop".to_string(),
            "notes=a=b".to_string(),
            "assignedOperator=".to_string(),
        ])
        .unwrap();
        assert_eq!(payload["status"], "In Shop");
        assert_eq!(payload["notes"], "a=b");
        assert_eq!(payload["assignedOperator"], Value::Null);
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignments(&["status".to_string()]).is_err());
        assert!(parse_assignments(&["=x".to_string()]).is_err());
    }
}
