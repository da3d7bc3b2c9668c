//! In-memory connection for exercising drivers without a database.
//!
//! ```rust
//! use strata_core::testing::RecordingConnection;
//! use strata_core::value::Row;
//!
//! let conn = RecordingConnection::new()
//!     .respond("SHOW search_path", vec![Row::new().with("search_path", "public")])
//!     .reject_matching("DROP DATABASE");
//! # let _ = conn;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::connection::{Connection, ConnectionFailure};
use crate::statement::Statement;
use crate::value::{Row, Value};

type Responder = Arc<dyn Fn(&[Value], &[Statement]) -> Vec<Row> + Send + Sync>;

#[derive(Default)]
struct Inner {
    statements: Mutex<Vec<Statement>>,
    responders: Mutex<Vec<(String, Responder)>>,
    rejections: Mutex<Vec<String>>,
    disconnected: Mutex<bool>,
    closed: Mutex<bool>,
}

/// A scripted [`Connection`] that records everything it receives.
///
/// Clones share the same recording, so a test can keep a handle after moving
/// one into a driver.
#[derive(Clone, Default)]
pub struct RecordingConnection {
    inner: Arc<Inner>,
}

impl RecordingConnection {
    /// Create a connection that accepts everything and returns no rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `pattern` with fixed rows.
    pub fn respond(self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.respond_with(pattern, move |_, _| rows.clone())
    }

    /// Answer queries containing `pattern` from a closure receiving the bound
    /// parameters and every statement received so far.
    pub fn respond_with<F>(self, pattern: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&[Value], &[Statement]) -> Vec<Row> + Send + Sync + 'static,
    {
        self.inner
            .responders
            .lock()
            .push((pattern.into(), Arc::new(responder)));
        self
    }

    /// Reject statements containing `pattern`. Rejected statements are still recorded.
    pub fn reject_matching(self, pattern: impl Into<String>) -> Self {
        self.inner.rejections.lock().push(pattern.into());
        self
    }

    /// Fail every call with a transport error.
    pub fn disconnected(self) -> Self {
        *self.inner.disconnected.lock() = true;
        self
    }

    /// Every statement that reached the connection, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.inner.statements.lock().clone()
    }

    /// SQL text of every statement that reached the connection.
    pub fn sql_log(&self) -> Vec<String> {
        self.inner
            .statements
            .lock()
            .iter()
            .map(|s| s.sql.clone())
            .collect()
    }

    /// Number of received statements containing `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.inner
            .statements
            .lock()
            .iter()
            .filter(|s| s.sql.contains(pattern))
            .count()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.lock()
    }

    fn receive(&self, sql: &str, params: &[Value]) -> Result<(), ConnectionFailure> {
        if *self.inner.disconnected.lock() {
            return Err(ConnectionFailure::transport("connection refused"));
        }

        self.inner
            .statements
            .lock()
            .push(Statement::with_params(sql, params.to_vec()));

        let rejected = self
            .inner
            .rejections
            .lock()
            .iter()
            .any(|pattern| sql.contains(pattern.as_str()));
        if rejected {
            return Err(ConnectionFailure::rejected(format!(
                "statement rejected: {}",
                sql
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionFailure> {
        self.receive(sql, params)?;
        Ok(0)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionFailure> {
        self.receive(sql, params)?;

        let responder = self
            .inner
            .responders
            .lock()
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, responder)| responder.clone());

        Ok(match responder {
            Some(responder) => {
                let history = self.statements();
                responder(params, &history)
            }
            None => Vec::new(),
        })
    }

    async fn close(&self) -> Result<(), ConnectionFailure> {
        *self.inner.closed.lock() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_responds() {
        let conn = RecordingConnection::new().respond("SELECT", vec![Row::new().with("one", 1)]);
        let handle = conn.clone();

        let rows = conn.query("SELECT 1 AS one", &[]).await.unwrap();
        conn.execute("CREATE TABLE t (a INT)", &[]).await.unwrap();

        assert_eq!(rows[0].get("one"), Some(&Value::Int(1)));
        assert_eq!(handle.sql_log(), vec!["SELECT 1 AS one", "CREATE TABLE t (a INT)"]);
        assert_eq!(handle.count_matching("CREATE TABLE"), 1);
    }

    #[tokio::test]
    async fn test_rejections_and_close() {
        let conn = RecordingConnection::new().reject_matching("DROP");

        let err = conn.execute("DROP TABLE t", &[]).await.unwrap_err();
        assert!(matches!(err, ConnectionFailure::Rejected(_)));
        assert_eq!(conn.statements().len(), 1);

        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }
}
