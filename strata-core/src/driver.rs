//! The operation surface every dialect driver implements.

use async_trait::async_trait;

use crate::error::MigrateResult;
use crate::schema::{
    ColumnChange, ColumnSpec, DropOptions, ForeignKeySpec, IndexSpec, SequenceOptions, TableSpec,
    TrackingKind, TrackingRecord,
};
use crate::statement::Statement;
use crate::value::{Row, Value};

/// Schema-change operations for one engine.
///
/// Every operation resolves to exactly one success or one failure. Statements
/// are issued strictly in order; a step is never sent before the previous one
/// has succeeded.
#[async_trait]
pub trait MigrationDriver: Send + Sync {
    /// Create a table, then apply any foreign keys declared on its columns.
    async fn create_table(&self, table: &TableSpec) -> MigrateResult<()>;

    /// Drop a table.
    async fn drop_table(&self, table: &str, options: DropOptions) -> MigrateResult<()>;

    /// Add a column, then apply its foreign key if declared.
    async fn add_column(&self, table: &str, column: &ColumnSpec) -> MigrateResult<()>;

    /// Drop a column.
    async fn remove_column(&self, table: &str, column: &str) -> MigrateResult<()>;

    /// Rename a column.
    async fn rename_column(&self, table: &str, from: &str, to: &str) -> MigrateResult<()>;

    /// Rename a table.
    async fn rename_table(&self, from: &str, to: &str) -> MigrateResult<()>;

    /// Alter a column through the ordered not-null → unique → default → type protocol.
    async fn change_column(
        &self,
        table: &str,
        column: &str,
        change: &ColumnChange,
    ) -> MigrateResult<()>;

    /// Add a foreign key constraint.
    async fn add_foreign_key(&self, foreign_key: &ForeignKeySpec) -> MigrateResult<()>;

    /// Drop a foreign key constraint.
    async fn remove_foreign_key(&self, table: &str, name: &str) -> MigrateResult<()>;

    /// Create an index.
    async fn add_index(&self, index: &IndexSpec) -> MigrateResult<()>;

    /// Drop an index.
    async fn remove_index(&self, name: &str) -> MigrateResult<()>;

    /// Create a database.
    async fn create_database(&self, name: &str) -> MigrateResult<()>;

    /// Drop a database.
    async fn drop_database(&self, name: &str, options: DropOptions) -> MigrateResult<()>;

    /// Create a sequence.
    async fn create_sequence(&self, name: &str, options: SequenceOptions) -> MigrateResult<()>;

    /// Drop a sequence.
    async fn drop_sequence(&self, name: &str, options: DropOptions) -> MigrateResult<()>;

    /// Ensure the migrations tracking table exists.
    async fn create_migrations_table(&self) -> MigrateResult<()>;

    /// Ensure the seeds tracking table exists.
    async fn create_seeds_table(&self) -> MigrateResult<()>;

    /// Read the rows of a tracking table, oldest first.
    async fn applied_records(&self, kind: TrackingKind) -> MigrateResult<Vec<TrackingRecord>>;

    /// Insert one row with bound values.
    async fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> MigrateResult<()>;

    /// Execute raw SQL written with neutral `?` markers.
    async fn run_sql(&self, statement: Statement) -> MigrateResult<u64>;

    /// Run a row-returning query written with neutral `?` markers.
    async fn all(&self, statement: Statement) -> MigrateResult<Vec<Row>>;

    /// Open the transaction for a migration batch.
    async fn start_migration(&self) -> MigrateResult<()>;

    /// Commit the transaction of a migration batch.
    async fn end_migration(&self) -> MigrateResult<()>;

    /// Close the connection.
    async fn close(&self) -> MigrateResult<()>;
}
