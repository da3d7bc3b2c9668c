//! PostgreSQL migration driver.

use async_trait::async_trait;
use parking_lot::Mutex;
use strata_core::{
    ColumnChange, ColumnSpec, Connection, DriverConfig, DropOptions, Executor,
    ForeignKeyFailure, ForeignKeySpec, IndexSpec, MigrateError, MigrateResult, MigrationDriver,
    PlaceholderStyle, Row, SchemaContext, SequenceOptions, Statement, TableSpec, TrackingKind,
    TrackingRecord, TransactionCoordinator, Value,
};
use tracing::{debug, info, warn};

use crate::bootstrap::{Bootstrap, BootstrapOutcome};
use crate::config::PgConfig;
use crate::connection::PgConnection;
use crate::ddl::DdlBuilder;

/// Migration driver for PostgreSQL.
///
/// Generic over the connection so it can run against a live server or the
/// in-memory recorder.
pub struct PgDriver<C = PgConnection> {
    config: DriverConfig,
    executor: Executor<C>,
    transactions: TransactionCoordinator,
    ddl: DdlBuilder,
    context: Mutex<SchemaContext>,
}

impl PgDriver<PgConnection> {
    /// Connect to a server and build a driver.
    pub async fn connect(pg_config: &PgConfig, config: DriverConfig) -> MigrateResult<Self> {
        config.validate()?;
        let connection = PgConnection::connect(pg_config, config.native).await?;
        Self::new(connection, config)
    }
}

impl<C: Connection> PgDriver<C> {
    /// Build a driver over an open connection.
    pub fn new(connection: C, config: DriverConfig) -> MigrateResult<Self> {
        config.validate()?;

        info!(
            schema = %config.schema,
            transactions = config.transactions,
            dry_run = config.dry_run,
            "PostgreSQL driver initialized"
        );

        Ok(Self {
            executor: Executor::new(connection, PlaceholderStyle::Numbered, config.dry_run),
            transactions: TransactionCoordinator::new(config.transactions),
            ddl: DdlBuilder::new(),
            context: Mutex::new(SchemaContext::new(config.schema.clone())),
            config,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Get the statement executor.
    pub fn executor(&self) -> &Executor<C> {
        &self.executor
    }

    /// Get the DDL builder.
    pub fn ddl(&self) -> &DdlBuilder {
        &self.ddl
    }

    /// Current schema and search path.
    pub fn schema_context(&self) -> SchemaContext {
        self.context.lock().clone()
    }

    /// Run statements inside a migration transaction.
    pub async fn run_batch(&self, statements: &[Statement]) -> MigrateResult<()> {
        self.transactions.run_batch(&self.executor, statements).await
    }

    async fn execute(&self, statement: &Statement) -> MigrateResult<()> {
        self.executor.execute(statement).await.map(|_| ())
    }

    /// Attempt every foreign key, collecting the failures.
    async fn apply_foreign_keys(&self, foreign_keys: Vec<(String, Statement)>) -> MigrateResult<()> {
        let mut applied = Vec::new();
        let mut failed = Vec::new();

        for (name, statement) in foreign_keys {
            match self.executor.execute(&statement).await {
                Ok(_) => applied.push(name),
                Err(error) => {
                    warn!(constraint = %name, error = %error, "Failed to apply foreign key");
                    failed.push(ForeignKeyFailure { name, error });
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::ForeignKeys { applied, failed })
        }
    }

    async fn bootstrap(&self, kind: TrackingKind) -> MigrateResult<BootstrapOutcome> {
        let table = self.config.tracking_table(kind);
        let outcome = Bootstrap::new(&self.executor, &self.ddl, &self.config.schema)
            .ensure_table(table)
            .await?;
        *self.context.lock() = outcome.context.clone();
        Ok(outcome)
    }

    fn tracking_schema(&self) -> Option<&str> {
        (!self.config.uses_default_schema()).then_some(self.config.schema.as_str())
    }
}

#[async_trait]
impl<C: Connection> MigrationDriver for PgDriver<C> {
    async fn create_table(&self, table: &TableSpec) -> MigrateResult<()> {
        let ddl = self.ddl.create_table(table)?;
        debug!(table = %table.name, foreign_keys = ddl.foreign_keys.len(), "Creating table");

        self.execute(&ddl.create).await?;
        self.apply_foreign_keys(ddl.foreign_keys).await
    }

    async fn drop_table(&self, table: &str, options: DropOptions) -> MigrateResult<()> {
        self.execute(&self.ddl.drop_table(table, options)).await
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> MigrateResult<()> {
        let ddl = self.ddl.add_column(table, column)?;
        self.execute(&ddl.add).await?;
        self.apply_foreign_keys(ddl.foreign_key.into_iter().collect())
            .await
    }

    async fn remove_column(&self, table: &str, column: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.remove_column(table, column)).await
    }

    async fn rename_column(&self, table: &str, from: &str, to: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.rename_column(table, from, to)).await
    }

    async fn rename_table(&self, from: &str, to: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.rename_table(from, to)).await
    }

    async fn change_column(
        &self,
        table: &str,
        column: &str,
        change: &ColumnChange,
    ) -> MigrateResult<()> {
        let steps = self.ddl.change_column(table, column, change)?;
        for (step, statement) in steps {
            debug!(table = %table, column = %column, step = %step, "Changing column");
            self.execute(&statement)
                .await
                .map_err(|e| MigrateError::sequencing(column, step, e))?;
        }
        Ok(())
    }

    async fn add_foreign_key(&self, foreign_key: &ForeignKeySpec) -> MigrateResult<()> {
        self.execute(&self.ddl.add_foreign_key(foreign_key)?).await
    }

    async fn remove_foreign_key(&self, table: &str, name: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.remove_foreign_key(table, name)).await
    }

    async fn add_index(&self, index: &IndexSpec) -> MigrateResult<()> {
        self.execute(&self.ddl.add_index(index)?).await
    }

    async fn remove_index(&self, name: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.remove_index(name)).await
    }

    async fn create_database(&self, name: &str) -> MigrateResult<()> {
        self.execute(&self.ddl.create_database(name)).await
    }

    async fn drop_database(&self, name: &str, options: DropOptions) -> MigrateResult<()> {
        self.execute(&self.ddl.drop_database(name, options)?).await
    }

    async fn create_sequence(&self, name: &str, options: SequenceOptions) -> MigrateResult<()> {
        self.execute(&self.ddl.create_sequence(name, options)).await
    }

    async fn drop_sequence(&self, name: &str, options: DropOptions) -> MigrateResult<()> {
        self.execute(&self.ddl.drop_sequence(name, options)).await
    }

    async fn create_migrations_table(&self) -> MigrateResult<()> {
        self.bootstrap(TrackingKind::Migrations).await.map(|_| ())
    }

    async fn create_seeds_table(&self) -> MigrateResult<()> {
        self.bootstrap(TrackingKind::Seeds).await.map(|_| ())
    }

    async fn applied_records(&self, kind: TrackingKind) -> MigrateResult<Vec<TrackingRecord>> {
        let table = self.config.tracking_table(kind);
        let select = self.ddl.select_tracking(self.tracking_schema(), table);
        let rows = self.executor.query(&select).await?;
        rows.iter()
            .map(|row| {
                tracking_record(row)
                    .ok_or_else(|| MigrateError::sql(&select.sql, "malformed tracking row"))
            })
            .collect()
    }

    async fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> MigrateResult<()> {
        self.execute(&self.ddl.insert(table, columns, values)?).await
    }

    async fn run_sql(&self, statement: Statement) -> MigrateResult<u64> {
        self.executor.execute(&statement).await
    }

    async fn all(&self, statement: Statement) -> MigrateResult<Vec<Row>> {
        self.executor.query(&statement).await
    }

    async fn start_migration(&self) -> MigrateResult<()> {
        self.transactions.begin(&self.executor).await
    }

    async fn end_migration(&self) -> MigrateResult<()> {
        self.transactions.commit(&self.executor).await
    }

    async fn close(&self) -> MigrateResult<()> {
        self.executor.close().await
    }
}

fn tracking_record(row: &Row) -> Option<TrackingRecord> {
    Some(TrackingRecord {
        id: row.get("id").and_then(Value::as_i64)?,
        name: row.get_str("name")?.to_string(),
        run_on: row.get("run_on").and_then(Value::as_timestamp)?,
    })
}
