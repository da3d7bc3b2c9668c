//! The engine connection seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::value::{Row, Value};

/// Failure reported by a [`Connection`], before it is attached to a statement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The transport or authentication failed.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The engine rejected the statement.
    #[error("{0}")]
    Rejected(String),
}

impl ConnectionFailure {
    /// Create a transport failure.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a rejection.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// A single logical connection to the engine.
///
/// SQL handed to a connection already uses the engine's placeholder syntax.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionFailure>;

    /// Execute a read query and return its rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionFailure>;

    /// Close the connection.
    async fn close(&self) -> Result<(), ConnectionFailure>;
}
