//! Error types for migration operations.

use std::fmt;

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// One step of the ordered column-alteration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStep {
    /// Set or drop `NOT NULL`.
    Nullability,
    /// Add or drop the `<table>_<column>_key` unique constraint.
    Unique,
    /// Set or drop the column default.
    Default,
    /// Change the column type with a cast.
    Type,
}

impl ChangeStep {
    /// Human readable name of the step.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullability => "not null",
            Self::Unique => "unique",
            Self::Default => "default",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for ChangeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deferred foreign key that could not be applied.
#[derive(Debug)]
pub struct ForeignKeyFailure {
    /// Constraint name.
    pub name: String,
    /// The error the engine reported.
    pub error: MigrateError,
}

/// Errors that can occur while building or executing schema changes.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Transport or authentication failure reported by the engine connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// The engine rejected a statement.
    #[error("SQL error: {message} (statement: {statement})")]
    Sql {
        /// The statement text as dispatched.
        statement: String,
        /// Engine-provided message.
        message: String,
    },

    /// An abstract column type has no mapping in the dialect.
    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    /// A step of the column-alteration protocol failed; later steps were not attempted.
    #[error("changing column '{column}' failed at the {step} step: {source}")]
    Sequencing {
        /// Column being altered.
        column: String,
        /// The step that failed.
        step: ChangeStep,
        /// Underlying failure.
        #[source]
        source: Box<MigrateError>,
    },

    /// One or more deferred foreign keys failed after the owning table was created.
    #[error("{} of {} foreign keys failed to apply", .failed.len(), .failed.len() + .applied.len())]
    ForeignKeys {
        /// Constraint names that were applied.
        applied: Vec<String>,
        /// Constraints that failed.
        failed: Vec<ForeignKeyFailure>,
    },

    /// The caller supplied an invalid table or column specification.
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    /// Invalid driver configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MigrateError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a SQL error carrying the failing statement.
    pub fn sql(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sql {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(ty: impl Into<String>) -> Self {
        Self::UnsupportedType(ty.into())
    }

    /// Create an invalid specification error.
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a failure of one column-alteration step.
    pub fn sequencing(column: impl Into<String>, step: ChangeStep, source: MigrateError) -> Self {
        Self::Sequencing {
            column: column.into(),
            step,
            source: Box::new(source),
        }
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Sequencing { source, .. } => source.is_connection_error(),
            _ => false,
        }
    }

    /// The statement text the engine rejected, if any.
    pub fn failing_statement(&self) -> Option<&str> {
        match self {
            Self::Sql { statement, .. } => Some(statement.as_str()),
            Self::Sequencing { source, .. } => source.failing_statement(),
            _ => None,
        }
    }
}
