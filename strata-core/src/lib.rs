//! # strata-core
//!
//! Dialect-neutral building blocks for the Strata migration backend.
//!
//! This crate provides:
//! - The schema model handed to drivers ([`TableSpec`], [`ColumnSpec`], [`ForeignKeySpec`], ...)
//! - The [`TypeMapper`] seam and the default type mapping
//! - Column normalization and identifier/literal quoting
//! - Placeholder rewriting and the dry-run aware [`Executor`]
//! - The [`TransactionCoordinator`] for migration batches
//! - The [`MigrationDriver`] operation surface and [`DriverConfig`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ TableSpec    │────▶│ Normalizer     │────▶│ DDL Builder │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                                                    │
//!                                                    ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │ Transactions   │────▶│ Executor    │
//!                      └────────────────┘     └─────────────┘
//!                                                    │
//!                                                    ▼
//!                                             ┌─────────────┐
//!                                             │ Connection  │
//!                                             └─────────────┘
//! ```
//!
//! The DDL builder and the tracking-table bootstrap live in the dialect crates.

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod schema;
pub mod statement;
pub mod testing;
pub mod transaction;
pub mod types;
pub mod value;

pub use config::{DEFAULT_SCHEMA, DriverConfig};
pub use connection::{Connection, ConnectionFailure};
pub use driver::MigrationDriver;
pub use error::{ChangeStep, ForeignKeyFailure, MigrateError, MigrateResult};
pub use executor::Executor;
pub use normalize::{NormalizedTable, PrimaryKey, normalize_table, quote_identifier, quote_literal};
pub use schema::{
    ColumnChange, ColumnSpec, DataType, DefaultChange, DefaultValue, DropBehavior, DropOptions,
    ForeignKeyRef, ForeignKeyRules, ForeignKeySpec, IndexSpec, Length, ReferentialAction,
    SchemaContext, SequenceOptions, SortKey, TableSpec, TrackingKind, TrackingRecord,
};
pub use statement::{PlaceholderStyle, Statement};
pub use transaction::TransactionCoordinator;
pub use types::{DefaultTypeMapper, TypeMapper, default_type_token};
pub use value::{Row, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::DriverConfig;
    pub use crate::driver::MigrationDriver;
    pub use crate::error::{MigrateError, MigrateResult};
    pub use crate::schema::{
        ColumnChange, ColumnSpec, DataType, ForeignKeyRef, ForeignKeySpec, IndexSpec,
        ReferentialAction, SortKey, TableSpec,
    };
    pub use crate::statement::Statement;
    pub use crate::value::{Row, Value};
}
