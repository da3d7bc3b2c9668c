//! Driver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};
use crate::schema::TrackingKind;

/// The engine's default schema.
pub const DEFAULT_SCHEMA: &str = "public";

/// Configuration injected into a driver at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Target schema; prepended to the search path when it is not the default.
    pub schema: String,
    /// Use the engine's simple (text) protocol for parameterless reads.
    pub native: bool,
    /// Wrap migration batches in a transaction.
    pub transactions: bool,
    /// Log statements instead of executing them.
    pub dry_run: bool,
    /// Name of the migrations tracking table.
    pub migrations_table: String,
    /// Name of the seeds tracking table.
    pub seeds_table: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            native: false,
            transactions: true,
            dry_run: false,
            migrations_table: "migrations".to_string(),
            seeds_table: "seeds".to_string(),
        }
    }
}

impl DriverConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Select the simple-query protocol.
    pub fn native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }

    /// Disable batch transactions.
    pub fn disable_transactions(mut self) -> Self {
        self.transactions = false;
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the migrations tracking table name.
    pub fn migrations_table(mut self, name: impl Into<String>) -> Self {
        self.migrations_table = name.into();
        self
    }

    /// Set the seeds tracking table name.
    pub fn seeds_table(mut self, name: impl Into<String>) -> Self {
        self.seeds_table = name.into();
        self
    }

    /// Whether the configured schema is the engine default.
    pub fn uses_default_schema(&self) -> bool {
        self.schema == DEFAULT_SCHEMA
    }

    /// Tracking table name for a kind.
    pub fn tracking_table(&self, kind: TrackingKind) -> &str {
        match kind {
            TrackingKind::Migrations => &self.migrations_table,
            TrackingKind::Seeds => &self.seeds_table,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.schema.trim().is_empty() {
            return Err(MigrateError::config("schema must not be empty"));
        }
        if self.migrations_table.trim().is_empty() || self.seeds_table.trim().is_empty() {
            return Err(MigrateError::config("tracking table names must not be empty"));
        }
        if self.migrations_table == self.seeds_table {
            return Err(MigrateError::config(format!(
                "migrations and seeds share the table name '{}'",
                self.migrations_table
            )));
        }
        Ok(())
    }
}
