//! Installs the notify procedure and attaches per-table triggers.

use crate::error::ListenerError;
use crate::framework::StatementExecutor;
use crate::statements::{TableName, attach_statements, procedure};
use std::sync::Arc;
use tracing::{debug, info};

/// Issues the DDL that makes a table publish its row changes.
///
/// Nothing is retried; failures are returned with the failing step attached.
#[derive(Clone)]
pub struct TriggerInstaller {
    executor: Arc<dyn StatementExecutor>,
}

impl TriggerInstaller {
    pub fn new(executor: Arc<dyn StatementExecutor>) -> Self {
        Self { executor }
    }

    /// Create or replace `pgevents_notify_event()`.
    pub async fn install_procedure(&self) -> Result<(), ListenerError> {
        self.executor
            .execute(&procedure())
            .await
            .map_err(ListenerError::InstallProcedure)?;
        debug!("Notify procedure installed");
        Ok(())
    }

    /// Replace the `<table>_events` trigger on `table`.
    ///
    /// Attaching the same table twice leaves exactly one trigger behind.
    pub async fn attach(&self, table: &str) -> Result<(), ListenerError> {
        let name = TableName::parse(table)?;
        self.executor
            .execute_in_transaction(&attach_statements(&name))
            .await
            .map_err(|source| ListenerError::Attach {
                table: table.to_owned(),
                source,
            })?;
        info!(table = %name, trigger = %name.trigger_name(), "Attached listener to table");
        Ok(())
    }

    pub async fn close(&self) {
        self.executor.close().await;
    }
}
