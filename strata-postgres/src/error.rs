//! Error types for PostgreSQL operations.

use strata_core::{ConnectionFailure, MigrateError};
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),

    /// Type conversion error.
    #[error("type conversion error: {0}")]
    TypeConversion(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Config(_) | Self::Connection(_) => true,
            Self::Postgres(e) => e.as_db_error().is_none() && e.is_closed(),
            _ => false,
        }
    }
}

impl From<PgError> for ConnectionFailure {
    fn from(err: PgError) -> Self {
        if err.is_connection_error() {
            return ConnectionFailure::Transport(err.to_string());
        }
        match err {
            PgError::Postgres(e) => match e.as_db_error() {
                Some(db) => ConnectionFailure::Rejected(format!(
                    "{}: {} (SQLSTATE {})",
                    db.severity(),
                    db.message(),
                    db.code().code()
                )),
                None => ConnectionFailure::Rejected(e.to_string()),
            },
            other => ConnectionFailure::Rejected(other.to_string()),
        }
    }
}

impl From<PgError> for MigrateError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Config(msg) => MigrateError::Config(msg),
            other if other.is_connection_error() => MigrateError::Connection(other.to_string()),
            PgError::Postgres(e) => MigrateError::Connection(e.to_string()),
            other => MigrateError::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));

        let err = PgError::connection("connection refused");
        assert!(err.is_connection_error());

        let err = PgError::type_conversion("bad int");
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_into_connection_failure() {
        let failure: ConnectionFailure = PgError::connection("reset by peer").into();
        assert!(matches!(failure, ConnectionFailure::Transport(_)));

        let failure: ConnectionFailure = PgError::query("wrong parameter count").into();
        assert!(matches!(failure, ConnectionFailure::Rejected(_)));
    }

    #[test]
    fn test_into_migrate_error() {
        let err: MigrateError = PgError::config("missing host").into();
        assert!(matches!(err, MigrateError::Config(_)));

        let err: MigrateError = PgError::connection("refused").into();
        assert!(err.is_connection_error());
    }
}
