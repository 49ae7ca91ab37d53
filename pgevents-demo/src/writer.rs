//! The demo's row writer: keeps inserting rows so the listener has
//! something to report.

use serde::Deserialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// A row of the demo table, as carried in `TableEvent::data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExampleRow {
    pub id: i32,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Create the demo table if it does not exist yet.
///
/// `table` must already be a quoted identifier.
pub async fn ensure_table(pool: &PgPool, table: &str) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id serial PRIMARY KEY,
            name text NOT NULL,
            created_at timestamptz NOT NULL,
            updated_at timestamptz NOT NULL
        )"
    ))
    .execute(pool)
    .await?;
    Ok(())
}

pub struct RowWriter {
    pool: PgPool,
    table: String,
    interval: std::time::Duration,
}

impl RowWriter {
    /// `table` must already be a quoted identifier.
    pub fn new(pool: PgPool, table: String, interval: std::time::Duration) -> Self {
        Self {
            pool,
            table,
            interval,
        }
    }

    /// Insert `example-row-<i>` every interval until shutdown.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(table = %self.table, interval = ?self.interval, "RowWriter started");

        let mut ticker = tokio::time::interval(self.interval);
        let mut i: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("RowWriter received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let name = format!("example-row-{i}");
                    match self.insert(&name).await {
                        Ok(()) => debug!(%name, "Inserted row"),
                        Err(e) => error!(error = %e, %name, "Failed to insert row"),
                    }
                    i += 1;
                }
            }
        }

        info!("RowWriter shutdown complete");
    }

    async fn insert(&self, name: &str) -> Result<(), sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(&format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES ($1, $2, $3)",
            self.table
        ))
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
