//! # Strata
//!
//! PostgreSQL dialect backend for schema migrations.
//!
//! Strata turns abstract table and column descriptions into PostgreSQL DDL,
//! executes it with transactional discipline and bootstraps the tables that
//! record which migrations and seeds have run.
//!
//! Strata provides:
//! - A dialect-neutral schema model and the [`MigrationDriver`] operation surface
//! - PostgreSQL type mapping, DDL generation and tracking-table bootstrap
//! - Placeholder rewriting and a dry-run mode that never touches the database
//! - A completion-handler [`adapter`] for callers that prefer callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pg = PgConfig::from_url("postgresql://localhost/mydb")?;
//!     let driver = PgDriver::connect(&pg, DriverConfig::default()).await?;
//!
//!     driver.create_migrations_table().await?;
//!     driver
//!         .add_column("users", &ColumnSpec::new("nickname", DataType::String).length(64))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod adapter;

pub use strata_core;
pub use strata_postgres;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strata_core::prelude::*;
    pub use strata_postgres::prelude::*;
}

// Re-export key types at the crate root
pub use strata_core::{
    DriverConfig, MigrateError, MigrateResult, MigrationDriver, Row, Statement, Value,
};
pub use strata_postgres::{PgConfig, PgDriver};
