//! Tracking-table bootstrap.
//!
//! Before the migrations or seeds table is touched the session is prepared:
//! the server version decides whether `IF NOT EXISTS` may be used, the
//! configured schema is put on the search path, and the catalog is consulted
//! so that the table is only created when it is missing.

use std::fmt;

use strata_core::schema::tracking_table;
use strata_core::{
    Connection, DEFAULT_SCHEMA, Executor, MigrateResult, Row, SchemaContext, Statement,
    quote_identifier,
};
use tracing::{debug, info};

use crate::ddl::DdlBuilder;

/// Query reporting the server banner.
pub const VERSION_QUERY: &str = "SELECT version() AS version";

/// Query reporting the session search path.
pub const SEARCH_PATH_QUERY: &str = "SHOW search_path";

/// Catalog lookup for a table in a schema.
pub const TABLE_EXISTS_QUERY: &str = "SELECT table_name::text AS table_name \
     FROM information_schema.tables WHERE table_name = ? AND table_schema = ?";

/// First release that accepts `CREATE TABLE IF NOT EXISTS`.
pub const IF_NOT_EXISTS_SINCE: ServerVersion = ServerVersion::new(9, 1, 0);

/// A PostgreSQL server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl ServerVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the banner returned by `version()`, e.g.
    /// `PostgreSQL 15.4 (Debian 15.4-1) on x86_64-pc-linux-gnu, ...`.
    pub fn parse(banner: &str) -> Option<Self> {
        let token = banner.split_whitespace().nth(1)?;
        let mut parts = token.split('.').map(leading_number);

        let major = parts.next().flatten()?;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);

        Some(Self::new(major, minor, patch))
    }

    /// Whether `CREATE TABLE IF NOT EXISTS` is available.
    pub fn supports_if_not_exists(&self) -> bool {
        *self >= IF_NOT_EXISTS_SINCE
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Numeric prefix of a version component (`16beta1` → 16).
fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Compute the search path for a schema.
///
/// A non-default schema always ends up first, double-quoted; an existing
/// entry naming it is moved rather than repeated. An empty path falls back to
/// the schema alone.
pub fn resolve_search_path(current: &str, schema: &str) -> Vec<String> {
    let mut entries: Vec<String> = current
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect();

    if schema != DEFAULT_SCHEMA {
        entries.retain(|entry| unquote(entry) != schema);
        entries.insert(0, quote_identifier(schema));
    }

    if entries.is_empty() {
        entries.push(quote_identifier(schema));
    }

    entries
}

fn unquote(entry: &str) -> String {
    match entry.strip_prefix('"').and_then(|e| e.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => entry.to_string(),
    }
}

/// `SET search_path TO ...` for resolved entries.
pub fn set_search_path(entries: &[String]) -> Statement {
    Statement::new(format!("SET search_path TO {}", entries.join(", ")))
}

/// What a bootstrap run found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Parsed server version, if the banner was available.
    pub version: Option<ServerVersion>,
    /// Session context after the search path was applied.
    pub context: SchemaContext,
    /// Whether a `CREATE TABLE` was issued.
    pub created: bool,
}

/// Prepares the session and ensures one tracking table exists.
pub struct Bootstrap<'a, C> {
    executor: &'a Executor<C>,
    ddl: &'a DdlBuilder,
    schema: &'a str,
}

impl<'a, C: Connection> Bootstrap<'a, C> {
    /// Create a bootstrap run for a schema.
    pub fn new(executor: &'a Executor<C>, ddl: &'a DdlBuilder, schema: &'a str) -> Self {
        Self {
            executor,
            ddl,
            schema,
        }
    }

    /// Read the server version. Unknown in dry-run.
    pub async fn server_version(&self) -> MigrateResult<Option<ServerVersion>> {
        let rows = self.executor.query(&Statement::new(VERSION_QUERY)).await?;
        Ok(first_str(&rows, "version").and_then(ServerVersion::parse))
    }

    /// Resolve and apply the search path.
    pub async fn apply_search_path(&self) -> MigrateResult<SchemaContext> {
        let rows = self.executor.query(&Statement::new(SEARCH_PATH_QUERY)).await?;
        let current = first_str(&rows, "search_path").unwrap_or_default();

        let entries = resolve_search_path(current, self.schema);
        self.executor.execute(&set_search_path(&entries)).await?;

        debug!(search_path = %entries.join(", "), "Applied search path");
        Ok(SchemaContext {
            schema: self.schema.to_string(),
            search_path: entries,
        })
    }

    /// Check the catalog for a table in the configured schema.
    pub async fn table_exists(&self, table: &str) -> MigrateResult<bool> {
        let lookup = Statement::new(TABLE_EXISTS_QUERY)
            .bind(table)
            .bind(self.schema);
        let rows = self.executor.query(&lookup).await?;
        Ok(!rows.is_empty())
    }

    /// Run the full sequence for one tracking table.
    pub async fn ensure_table(&self, table: &str) -> MigrateResult<BootstrapOutcome> {
        let version = self.server_version().await?;
        let if_not_exists = version.is_some_and(|v| v.supports_if_not_exists());
        info!(
            version = %version.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into()),
            if_not_exists,
            "Resolved server version"
        );

        let context = self.apply_search_path().await?;

        if self.table_exists(table).await? {
            debug!(table = %table, schema = %self.schema, "Tracking table already exists");
            return Ok(BootstrapOutcome {
                version,
                context,
                created: false,
            });
        }

        let mut spec = tracking_table(table);
        if self.schema != DEFAULT_SCHEMA {
            spec = spec.schema(self.schema);
        }
        if if_not_exists {
            spec = spec.if_not_exists();
        }

        let ddl = self.ddl.create_table(&spec)?;
        self.executor.execute(&ddl.create).await?;
        info!(table = %table, schema = %self.schema, "Created tracking table");

        Ok(BootstrapOutcome {
            version,
            context,
            created: true,
        })
    }
}

fn first_str<'r>(rows: &'r [Row], column: &str) -> Option<&'r str> {
    rows.first().and_then(|row| row.get_str(column))
}
