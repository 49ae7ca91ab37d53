use async_trait::async_trait;
use sqlx::PgPool;

/// Runs DDL against the database on behalf of the trigger installer.
#[async_trait]
pub trait StatementExecutor: Send + Sync + 'static {
    /// Execute a single statement, which may contain a procedure body.
    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error>;

    /// Execute `statements` in order inside one transaction.
    async fn execute_in_transaction(&self, statements: &[String]) -> Result<(), sqlx::Error>;

    /// Release the underlying connection(s).
    async fn close(&self);
}

/// A dedicated pool, exclusively owned by one listener.
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

#[async_trait]
impl StatementExecutor for DatabaseProcessor {
    async fn execute(&self, statement: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn execute_in_transaction(&self, statements: &[String]) -> Result<(), sqlx::Error> {
        // A multi-statement simple query runs as one implicit transaction:
        // the first failing statement rolls back everything before it.
        let batch = statements.join(";\n");
        sqlx::raw_sql(&batch).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
