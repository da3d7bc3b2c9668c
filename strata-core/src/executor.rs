//! Statement dispatch with placeholder rewriting and dry-run support.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::connection::{Connection, ConnectionFailure};
use crate::error::{MigrateError, MigrateResult};
use crate::statement::{PlaceholderStyle, Statement, count_markers};
use crate::value::Row;

/// Runs statements against a single connection.
///
/// In dry-run mode statements are logged and journaled but never reach the
/// connection; every call still succeeds.
pub struct Executor<C> {
    connection: C,
    style: PlaceholderStyle,
    dry_run: bool,
    journal: Mutex<Vec<Statement>>,
}

impl<C: Connection> Executor<C> {
    /// Create an executor.
    pub fn new(connection: C, style: PlaceholderStyle, dry_run: bool) -> Self {
        Self {
            connection,
            style,
            dry_run,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Whether statements are withheld from the connection.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Get the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Statements recorded in dry-run mode, with placeholders already rewritten.
    pub fn journal(&self) -> Vec<Statement> {
        self.journal.lock().clone()
    }

    /// Rewrite the statement's markers into the engine syntax.
    ///
    /// A template that uses `?` markers must bind exactly one value per
    /// marker. SQL without markers is passed through with its parameters, so
    /// engine-native placeholders still work.
    pub fn prepare(&self, statement: &Statement) -> MigrateResult<Statement> {
        let markers = count_markers(&statement.sql);
        if markers > 0 && markers != statement.params.len() {
            return Err(MigrateError::invalid_spec(format!(
                "statement has {} parameter markers but {} values: {}",
                markers,
                statement.params.len(),
                statement.sql
            )));
        }
        Ok(Statement::with_params(
            self.style.rewrite(&statement.sql),
            statement.params.clone(),
        ))
    }

    /// Execute a DDL/DML statement and return the affected row count.
    pub async fn execute(&self, statement: &Statement) -> MigrateResult<u64> {
        let prepared = self.prepare(statement)?;

        if self.dry_run {
            self.record(prepared);
            return Ok(0);
        }

        debug!(sql = %prepared.sql, params = prepared.params.len(), "Executing statement");
        self.connection
            .execute(&prepared.sql, &prepared.params)
            .await
            .map_err(|e| normalize_failure(&prepared.sql, e))
    }

    /// Execute a read query and return its rows.
    pub async fn query(&self, statement: &Statement) -> MigrateResult<Vec<Row>> {
        let prepared = self.prepare(statement)?;

        if self.dry_run {
            self.record(prepared);
            return Ok(Vec::new());
        }

        debug!(sql = %prepared.sql, params = prepared.params.len(), "Executing query");
        self.connection
            .query(&prepared.sql, &prepared.params)
            .await
            .map_err(|e| normalize_failure(&prepared.sql, e))
    }

    /// Close the connection. A no-op in dry-run mode.
    pub async fn close(&self) -> MigrateResult<()> {
        if self.dry_run {
            info!("[DRY RUN] close connection");
            return Ok(());
        }
        self.connection
            .close()
            .await
            .map_err(|e| normalize_failure("", e))
    }

    fn record(&self, statement: Statement) {
        info!(sql = %statement.sql, params = ?statement.params, "[DRY RUN]");
        self.journal.lock().push(statement);
    }
}

fn normalize_failure(sql: &str, failure: ConnectionFailure) -> MigrateError {
    match failure {
        ConnectionFailure::Transport(msg) => MigrateError::Connection(msg),
        ConnectionFailure::Rejected(msg) => MigrateError::sql(sql, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConnection;
    use crate::value::Value;

    #[tokio::test]
    async fn test_rewrites_before_dispatch() {
        let executor = Executor::new(RecordingConnection::new(), PlaceholderStyle::Numbered, false);
        let stmt = Statement::new("INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?)")
            .bind(1)
            .bind("two");

        executor.execute(&stmt).await.unwrap();

        let sent = executor.connection().statements();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sql, "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2)");
        assert_eq!(sent[0].params, vec![Value::Int(1), Value::from("two")]);
    }

    #[tokio::test]
    async fn test_marker_count_must_match_values() {
        let executor = Executor::new(RecordingConnection::new(), PlaceholderStyle::Numbered, false);

        let err = executor
            .execute(&Statement::new("UPDATE \"t\" SET \"a\" = ? WHERE \"id\" = ?").bind(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSpec(ref msg) if msg.contains("2 parameter markers but 1")));

        let err = executor
            .query(&Statement::new("SELECT ?").bind(1).bind(2))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidSpec(_)));
        assert!(executor.connection().statements().is_empty());

        // Markers inside literals do not count; pre-numbered SQL passes through
        executor
            .execute(&Statement::new("SELECT '?', $1").bind(1))
            .await
            .unwrap();
        assert_eq!(executor.connection().statements().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_never_reaches_connection() {
        let conn = RecordingConnection::new().reject_matching("DROP");
        let executor = Executor::new(conn, PlaceholderStyle::Numbered, true);

        executor.execute(&Statement::new("DROP TABLE \"t\"")).await.unwrap();
        let rows = executor.query(&Statement::new("SELECT 1")).await.unwrap();

        assert!(rows.is_empty());
        assert!(executor.connection().statements().is_empty());
        assert_eq!(executor.journal().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_normalized() {
        let conn = RecordingConnection::new().reject_matching("bogus");
        let executor = Executor::new(conn, PlaceholderStyle::Numbered, false);

        let err = executor
            .execute(&Statement::new("SELECT bogus WHERE x = ?").bind(1))
            .await
            .unwrap_err();
        assert_eq!(err.failing_statement(), Some("SELECT bogus WHERE x = $1"));

        let conn = RecordingConnection::new().disconnected();
        let executor = Executor::new(conn, PlaceholderStyle::Numbered, false);
        let err = executor.query(&Statement::new("SELECT 1")).await.unwrap_err();
        assert!(err.is_connection_error());
    }
}
