//! Trip Ledger - admin tool
//!
//! Repair and inspection commands run against the ledger database.
//!
//! # Usage
//!
//! ```bash
//! # Apply the embedded migrations
//! ledger-admin migrate
//!
//! # Check the database connection
//! ledger-admin health
//!
//! # Rebuild a trip's settlements from its splits
//! ledger-admin recalculate --trip-id 0191c2d4-...
//!
//! # Print a trip's current settlements
//! LEDGER_DATABASE_URL=postgres://... ledger-admin settlements --trip-id 0191c2d4-...
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use app_ledger::{init_tracing, LedgerConfig, LedgerService, SnapshotLoader, TracingNotifier};
use core_kernel::{HealthCheckable, TripId};
use infra_cache::TripSnapshotCache;
use infra_db::{create_pool, run_migrations, PostgresLedgerStore};

#[derive(Parser, Debug)]
#[command(name = "ledger-admin")]
#[command(about = "Maintenance commands for the trip ledger")]
struct Cli {
    /// Database connection string; overrides `LEDGER_DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild a trip's settlements from its splits
    Recalculate(TripArgs),
    /// Print a trip's settlements
    Settlements(TripArgs),
    /// Apply pending migrations
    Migrate,
    /// Check that the database answers
    Health,
}

#[derive(Args, Debug)]
struct TripArgs {
    #[arg(long)]
    trip_id: Uuid,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::from_env().context("loading configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    config.validate()?;
    init_tracing(&config)?;

    let pool = create_pool(config.database())
        .await
        .context("connecting to the database")?;

    match cli.command {
        Command::Migrate => {
            run_migrations(&pool).await?;
            println!("Migrations applied");
        }
        Command::Health => {
            let result = PostgresLedgerStore::new(pool).health_check().await;
            println!(
                "{} {:?} ({}ms){}",
                result.adapter_id,
                result.status,
                result.latency_ms,
                result.message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default()
            );
            if !result.is_healthy() {
                anyhow::bail!("database is unhealthy");
            }
        }
        Command::Recalculate(args) => {
            let service = ledger_service(pool, &config).await?;
            let aggregation = service
                .recalculate_settlements(TripId::from_uuid(args.trip_id))
                .await?;
            println!(
                "Recalculated {} settlements, total {}",
                aggregation.balances.len(),
                aggregation.total()
            );
            if !aggregation.orphaned.is_empty() {
                println!("Ignored {} orphaned splits", aggregation.orphaned.len());
            }
        }
        Command::Settlements(args) => {
            let service = ledger_service(pool, &config).await?;
            let summary = service
                .get_settlements(TripId::from_uuid(args.trip_id))
                .await?;
            for row in &summary.rows {
                println!(
                    "{:<38} {:<24} {:>12}",
                    row.settlement.member_id.to_string(),
                    row.member_name.as_deref().unwrap_or("-"),
                    row.settlement.amount.to_string()
                );
            }
            println!("{:<38} {:<24} {:>12}", "", "total", summary.total.to_string());
        }
    }

    Ok(())
}

async fn ledger_service(
    pool: infra_db::DatabasePool,
    config: &LedgerConfig,
) -> anyhow::Result<LedgerService> {
    let store = Arc::new(PostgresLedgerStore::new(pool));
    let cache_store = config.cache_store().await.context("connecting to the cache")?;
    let cache = TripSnapshotCache::new(cache_store, config.cache_ttl());
    let snapshots = SnapshotLoader::new(store.clone(), cache);
    Ok(LedgerService::new(store, snapshots, Arc::new(TracingNotifier)))
}
