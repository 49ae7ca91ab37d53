//! pgevents demo
//!
//! Creates a table, attaches a listener to it, and inserts a row every few
//! seconds, logging each change the listener reports.

mod config;
mod shutdown;
mod writer;

use clap::Parser;
use config::{ConfigLoader, Overrides};
use pgevents_core::Listener;
use pgevents_core::statements::TableName;
use shutdown::shutdown_signal;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use writer::{ExampleRow, RowWriter, ensure_table};

/// pgevents demo - watch a table's row changes arrive over LISTEN/NOTIFY
#[derive(Parser, Debug)]
#[command(name = "pgevents-demo")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an optional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the table to create, attach and write to
    #[arg(short, long)]
    table: Option<String>,

    /// Override the number of seconds between inserted rows
    #[arg(short, long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting pgevents-demo v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let loader = ConfigLoader::new(
        args.config.as_ref(),
        Overrides {
            table: args.table,
            interval_secs: args.interval_secs,
        },
    );
    let loaded_config = loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let table = TableName::parse(&loaded_config.writer.table)?;

    // The application's own pool, separate from the listener's connections
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&loaded_config.listener.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    ensure_table(&db_pool, &table.qualified()).await?;

    let listener = Listener::open(loaded_config.listener).await?;
    listener.attach(&loaded_config.writer.table).await?;

    listener.on_event(|event| match event.decode_data::<ExampleRow>() {
        Ok(row) => tracing::info!(
            table = %event.table,
            action = %event.action,
            id = row.id,
            name = %row.name,
            created_at = %row.created_at,
            "Row changed"
        ),
        Err(e) => tracing::warn!(error = %e, data = %event.data, "Unexpected row shape"),
    });
    listener.on_reconnect(|| {
        tracing::warn!("Listener reconnected, changes made during the outage were not reported");
    });

    // Write rows until asked to stop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let writer = RowWriter::new(
        db_pool.clone(),
        table.qualified(),
        loaded_config.writer.interval,
    );
    let writer_handle = tokio::spawn(writer.run(shutdown_rx));

    shutdown_signal().await?;

    shutdown_tx.send_replace(true);
    writer_handle.await?;

    listener.close().await;

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Demo shutdown complete");

    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
