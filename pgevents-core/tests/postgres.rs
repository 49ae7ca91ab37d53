//! End-to-end checks against a live PostgreSQL.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use pgevents_core::{Action, Listener, ListenerConfig, TableEvent};
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::mpsc;

const SCHEMA: &str = "pgevents_test";

async fn setup(table: &str, columns: &str) -> (PgPool, ListenerConfig) {
    let config = ListenerConfig::from_env().expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&config.database_url).await.unwrap();
    sqlx::raw_sql(&format!(
        "CREATE SCHEMA IF NOT EXISTS {SCHEMA}; \
         DROP TABLE IF EXISTS {SCHEMA}.{table}; \
         CREATE TABLE {SCHEMA}.{table} ({columns});"
    ))
    .execute(&pool)
    .await
    .unwrap();
    (pool, config)
}

/// Forward events for `table` only; other tests publish on the same channel.
fn collect(listener: &Listener, table: &'static str) -> mpsc::UnboundedReceiver<TableEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    listener.on_event(move |event| {
        if event.table == table {
            let _ = tx.send(event.clone());
        }
    });
    rx
}

async fn next(rx: &mut mpsc::UnboundedReceiver<TableEvent>) -> TableEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("listener dropped the callback")
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_insert_on_attached_table_is_delivered() {
    let (pool, config) = setup("orders", "id integer primary key, total numeric(10, 2)").await;
    let listener = Listener::open(config).await.unwrap();
    listener.attach(&format!("{SCHEMA}.orders")).await.unwrap();
    let mut rx = collect(&listener, "orders");

    sqlx::query(&format!("INSERT INTO {SCHEMA}.orders (id, total) VALUES (1, 9.99)"))
        .execute(&pool)
        .await
        .unwrap();

    let event = next(&mut rx).await;
    assert_eq!(event.table, "orders");
    assert_eq!(event.action, Action::Insert);
    let row: serde_json::Value = event.decode_data().unwrap();
    assert_eq!(row["id"], 1);
    assert_eq!(row["total"].as_f64(), Some(9.99));

    listener.close().await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_update_and_delete_carry_new_and_old_rows() {
    let (pool, config) = setup("accounts", "id integer primary key, name text").await;
    let listener = Listener::open(config).await.unwrap();
    listener.attach(&format!("{SCHEMA}.accounts")).await.unwrap();
    let mut rx = collect(&listener, "accounts");

    for statement in [
        "INSERT INTO pgevents_test.accounts VALUES (7, 'before')",
        "UPDATE pgevents_test.accounts SET name = 'after' WHERE id = 7",
        "DELETE FROM pgevents_test.accounts WHERE id = 7",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    let inserted = next(&mut rx).await;
    let updated = next(&mut rx).await;
    let deleted = next(&mut rx).await;

    assert_eq!(inserted.action, Action::Insert);
    assert_eq!(updated.action, Action::Update);
    assert_eq!(deleted.action, Action::Delete);

    let updated_row: serde_json::Value = updated.decode_data().unwrap();
    assert_eq!(updated_row["name"], "after");
    let deleted_row: serde_json::Value = deleted.decode_data().unwrap();
    assert_eq!(deleted_row["id"], 7);
    assert_eq!(deleted_row["name"], "after");

    listener.close().await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_reattach_keeps_a_single_trigger() {
    let (pool, config) = setup("reattached", "id integer primary key").await;
    let listener = Listener::open(config).await.unwrap();
    let table = format!("{SCHEMA}.reattached");

    listener.attach(&table).await.unwrap();
    listener.attach(&table).await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM pg_trigger t \
         JOIN pg_class c ON c.oid = t.tgrelid \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = $1 AND c.relname = 'reattached' AND t.tgname = 'reattached_events'",
    )
    .bind(SCHEMA)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    // One trigger means one notification per row.
    let mut rx = collect(&listener, "reattached");
    sqlx::query(&format!("INSERT INTO {table} VALUES (1)"))
        .execute(&pool)
        .await
        .unwrap();
    next(&mut rx).await;
    assert!(
        tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .is_err()
    );

    listener.close().await;
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_attach_missing_table_fails_without_closing_listener() {
    let (_pool, config) = setup("survivor", "id integer primary key").await;
    let listener = Listener::open(config).await.unwrap();

    assert!(
        listener
            .attach(&format!("{SCHEMA}.does_not_exist"))
            .await
            .is_err()
    );
    listener.attach(&format!("{SCHEMA}.survivor")).await.unwrap();

    listener.close().await;
}

async fn sessions(pool: &PgPool, application_name: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM pg_stat_activity WHERE application_name = $1")
            .bind(application_name)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn test_close_releases_both_connections() {
    let (pool, mut config) = setup("released", "id integer primary key").await;
    let name = format!("pgevents-close-{}", std::process::id());
    config.application_name = name.clone();

    let listener = Listener::open(config).await.unwrap();
    assert_eq!(sessions(&pool, &name).await, 2);

    listener.close().await;

    // Backends leave pg_stat_activity shortly after the client disconnects.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while sessions(&pool, &name).await > 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "listener connections still open after close"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
