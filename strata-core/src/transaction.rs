//! Migration batch transactions.

use tracing::debug;

use crate::connection::Connection;
use crate::error::MigrateResult;
use crate::executor::Executor;
use crate::statement::Statement;

/// Statement that opens a migration transaction.
pub const BEGIN_SQL: &str = "BEGIN";
/// Statement that commits a migration transaction.
pub const COMMIT_SQL: &str = "COMMIT";

/// Wraps a migration batch in `BEGIN`/`COMMIT` when transactions are enabled.
///
/// There is no rollback orchestration: a failing batch leaves the transaction
/// open for the caller to abort, and with transactions disabled every prior
/// statement stays applied.
#[derive(Debug, Clone, Copy)]
pub struct TransactionCoordinator {
    enabled: bool,
}

impl TransactionCoordinator {
    /// Create a coordinator.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether batches run inside a transaction.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open the batch transaction.
    pub async fn begin<C: Connection>(&self, executor: &Executor<C>) -> MigrateResult<()> {
        if self.enabled {
            debug!("Beginning migration transaction");
            executor.execute(&Statement::new(BEGIN_SQL)).await?;
        }
        Ok(())
    }

    /// Commit the batch transaction.
    pub async fn commit<C: Connection>(&self, executor: &Executor<C>) -> MigrateResult<()> {
        if self.enabled {
            debug!("Committing migration transaction");
            executor.execute(&Statement::new(COMMIT_SQL)).await?;
        }
        Ok(())
    }

    /// Run statements in order between `begin` and `commit`.
    ///
    /// Stops at the first failure; the commit is then never issued.
    pub async fn run_batch<C: Connection>(
        &self,
        executor: &Executor<C>,
        statements: &[Statement],
    ) -> MigrateResult<()> {
        self.begin(executor).await?;
        for statement in statements {
            executor.execute(statement).await?;
        }
        self.commit(executor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::PlaceholderStyle;
    use crate::testing::RecordingConnection;

    fn executor(conn: RecordingConnection) -> Executor<RecordingConnection> {
        Executor::new(conn, PlaceholderStyle::Numbered, false)
    }

    #[tokio::test]
    async fn test_batch_is_wrapped() {
        let exec = executor(RecordingConnection::new());
        let batch = [Statement::new("CREATE TABLE a (x INT)"), Statement::new("CREATE TABLE b (y INT)")];

        TransactionCoordinator::new(true)
            .run_batch(&exec, &batch)
            .await
            .unwrap();

        assert_eq!(
            exec.connection().sql_log(),
            vec!["BEGIN", "CREATE TABLE a (x INT)", "CREATE TABLE b (y INT)", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn test_failure_skips_commit() {
        let exec = executor(RecordingConnection::new().reject_matching("TABLE b"));
        let batch = [
            Statement::new("CREATE TABLE a (x INT)"),
            Statement::new("CREATE TABLE b (y INT)"),
            Statement::new("CREATE TABLE c (z INT)"),
        ];

        let result = TransactionCoordinator::new(true).run_batch(&exec, &batch).await;

        assert!(result.is_err());
        assert_eq!(
            exec.connection().sql_log(),
            vec!["BEGIN", "CREATE TABLE a (x INT)", "CREATE TABLE b (y INT)"]
        );
    }

    #[tokio::test]
    async fn test_disabled_runs_autonomously() {
        let exec = executor(RecordingConnection::new());
        TransactionCoordinator::new(false)
            .run_batch(&exec, &[Statement::new("SELECT 1")])
            .await
            .unwrap();

        assert_eq!(exec.connection().sql_log(), vec!["SELECT 1"]);
    }
}
