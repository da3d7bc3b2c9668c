//! PostgreSQL connection.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use strata_core::{Connection, ConnectionFailure, Row, Value};
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error, info};

use crate::config::PgConfig;
use crate::error::{PgError, PgResult};
use crate::types::{row_from_pg, row_from_simple, values_to_params};

/// A single PostgreSQL session.
///
/// Parameterless statements go through the simple-query protocol so raw SQL
/// may contain several statements. With `native` set, parameterless reads use
/// it too and return every value as text.
pub struct PgConnection {
    client: Client,
    native: bool,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl PgConnection {
    /// Open a connection.
    pub async fn connect(config: &PgConfig, native: bool) -> PgResult<Self> {
        let (client, connection) = config.to_pg_config().connect(NoTls).await?;

        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection terminated");
            }
        });

        info!(url = %config.redacted_url(), "PostgreSQL connection established");

        Ok(Self {
            client,
            native,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        })
    }

    /// Wrap a client whose connection task is driven elsewhere.
    pub fn from_client(client: Client, native: bool) -> Self {
        Self {
            client,
            native,
            task: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether parameterless reads use the simple-query protocol.
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Get the underlying tokio-postgres client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn ensure_open(&self) -> PgResult<()> {
        if self.closed.load(Ordering::Acquire) || self.client.is_closed() {
            return Err(PgError::connection("connection is closed"));
        }
        Ok(())
    }

    async fn run_execute(&self, sql: &str, params: &[Value]) -> PgResult<u64> {
        self.ensure_open()?;

        if params.is_empty() {
            debug!(sql = %sql, "Executing batch");
            self.client.batch_execute(sql).await?;
            return Ok(0);
        }

        let stmt = self.client.prepare(sql).await?;
        let bound = values_to_params(params, stmt.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        Ok(self.client.execute(&stmt, &refs).await?)
    }

    async fn run_query(&self, sql: &str, params: &[Value]) -> PgResult<Vec<Row>> {
        self.ensure_open()?;

        if self.native && params.is_empty() {
            debug!(sql = %sql, "Executing simple query");
            let messages = self.client.simple_query(sql).await?;
            return Ok(messages
                .iter()
                .filter_map(|message| match message {
                    SimpleQueryMessage::Row(row) => Some(row_from_simple(row)),
                    _ => None,
                })
                .collect());
        }

        let stmt = self.client.prepare(sql).await?;
        let bound = values_to_params(params, stmt.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        self.client
            .query(&stmt, &refs)
            .await?
            .iter()
            .map(row_from_pg)
            .collect()
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, ConnectionFailure> {
        self.run_execute(sql, params).await.map_err(Into::into)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ConnectionFailure> {
        self.run_query(sql, params).await.map_err(Into::into)
    }

    async fn close(&self) -> Result<(), ConnectionFailure> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        info!("PostgreSQL connection closed");
        Ok(())
    }
}
