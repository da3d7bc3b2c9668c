//! Engine-neutral descriptions of tables, columns and constraints.
//!
//! These types are what migration authors hand to a [`MigrationDriver`](crate::MigrationDriver).
//! They carry no SQL; each dialect turns them into statements.
//!
//! ```rust
//! use strata_core::schema::{ColumnSpec, DataType, TableSpec};
//!
//! let table = TableSpec::new("users")
//!     .column(ColumnSpec::new("id", DataType::Integer).primary_key().auto_increment())
//!     .column(ColumnSpec::new("email", DataType::String).length(255).not_null().unique());
//!
//! assert_eq!(table.columns.len(), 2);
//! ```

use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Abstract column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Fixed-length character data.
    Char,
    /// Variable-length, usually bounded, character data.
    String,
    /// Unbounded text.
    Text,
    /// 16-bit integer.
    SmallInteger,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInteger,
    /// Floating point number.
    Real,
    /// Exact numeric.
    Decimal,
    /// Boolean.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Timestamp.
    Timestamp,
    /// Binary large object.
    Blob,
    /// Binary data.
    Binary,
    /// JSON document.
    Json,
    /// Binary JSON document.
    Jsonb,
    /// UUID.
    Uuid,
    /// A dialect-specific type token, e.g. `inet`.
    Custom(String),
}

impl DataType {
    /// Check whether this is one of the integer types.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::SmallInteger | Self::Integer | Self::BigInteger)
    }

    /// Check whether string defaults on this type must be quoted.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Char | Self::String | Self::Text)
    }
}

impl From<&str> for DataType {
    fn from(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "char" => Self::Char,
            "string" => Self::String,
            "text" => Self::Text,
            "smallint" | "small_integer" => Self::SmallInteger,
            "int" | "integer" => Self::Integer,
            "bigint" | "big_integer" => Self::BigInteger,
            "real" => Self::Real,
            "decimal" => Self::Decimal,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "blob" => Self::Blob,
            "binary" => Self::Binary,
            "json" => Self::Json,
            "jsonb" => Self::Jsonb,
            "uuid" => Self::Uuid,
            _ => Self::Custom(token.trim().to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(token) => f.write_str(token),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Length or precision attached to a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Length {
    /// `(n)`
    Size(u32),
    /// `(precision, scale)`
    Precision(u32, u32),
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(n) => write!(f, "({})", n),
            Self::Precision(p, s) => write!(f, "({}, {})", p, s),
        }
    }
}

/// Physical sort-key strategy for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Ordered, prefix-based sort key.
    Compound,
    /// Multi-dimensional sort key; dominates `Compound` when mixed.
    Interleaved,
}

/// Action taken on referencing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// `NO ACTION`
    #[default]
    NoAction,
    /// `RESTRICT`
    Restrict,
    /// `CASCADE`
    Cascade,
    /// `SET NULL`
    SetNull,
    /// `SET DEFAULT`
    SetDefault,
}

impl ReferentialAction {
    /// SQL keyword(s) for the action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Referential actions for a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForeignKeyRules {
    /// `ON DELETE` action.
    #[serde(default)]
    pub on_delete: ReferentialAction,
    /// `ON UPDATE` action.
    #[serde(default)]
    pub on_update: ReferentialAction,
}

/// Column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// A literal; strings are quoted and escaped, everything else is emitted as-is.
    Literal(Value),
    /// A raw SQL expression such as `now()`.
    Expression(String),
}

impl DefaultValue {
    /// A raw SQL expression default.
    pub fn expression(sql: impl Into<String>) -> Self {
        Self::Expression(sql.into())
    }
}

macro_rules! literal_default_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DefaultValue {
                fn from(v: $ty) -> Self {
                    Self::Literal(v.into())
                }
            }
        )*
    };
}

literal_default_from!(Value, bool, i32, i64, f64, String, &str);

/// A foreign key declared inline on a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Constraint name.
    pub name: String,
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// Referential actions.
    #[serde(default)]
    pub rules: ForeignKeyRules,
}

impl ForeignKeyRef {
    /// Reference `table(column)` under the given constraint name.
    pub fn new(name: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            column: column.into(),
            rules: ForeignKeyRules::default(),
        }
    }

    /// Set the `ON DELETE` action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.rules.on_delete = action;
        self
    }

    /// Set the `ON UPDATE` action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.rules.on_update = action;
        self
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Abstract type.
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Optional length or precision.
    #[serde(default)]
    pub length: Option<Length>,
    /// `Some(true)` emits `NOT NULL`.
    #[serde(default)]
    pub not_null: Option<bool>,
    /// `Some(true)` emits `UNIQUE`.
    #[serde(default)]
    pub unique: Option<bool>,
    /// Part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Auto-incrementing integer.
    #[serde(default)]
    pub auto_increment: bool,
    /// Column default.
    #[serde(default)]
    pub default_value: Option<DefaultValue>,
    /// Inline foreign key, applied after the table exists.
    #[serde(default)]
    pub foreign_key: Option<ForeignKeyRef>,
    /// Sort-key strategy.
    #[serde(default)]
    pub sort_key: Option<SortKey>,
}

impl ColumnSpec {
    /// Create a nullable column of the given type.
    pub fn new(name: impl Into<String>, data_type: impl Into<DataType>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            length: None,
            not_null: None,
            unique: None,
            primary_key: false,
            auto_increment: false,
            default_value: None,
            foreign_key: None,
            sort_key: None,
        }
    }

    /// Set a size, e.g. `VARCHAR(255)`.
    pub fn length(mut self, size: u32) -> Self {
        self.length = Some(Length::Size(size));
        self
    }

    /// Set precision and scale, e.g. `DECIMAL(10, 2)`.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.length = Some(Length::Precision(precision, scale));
        self
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = Some(true);
        self
    }

    /// Mark the column `UNIQUE`.
    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }

    /// Add the column to the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Make the column auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set the column default.
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Declare an inline foreign key.
    pub fn references(mut self, foreign_key: ForeignKeyRef) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// Set the sort-key strategy.
    pub fn sort_key(mut self, strategy: SortKey) -> Self {
        self.sort_key = Some(strategy);
        self
    }
}

/// Table definition for `create_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Target schema; unqualified when `None`.
    #[serde(default)]
    pub schema: Option<String>,
    /// Columns in declaration order.
    pub columns: IndexMap<String, ColumnSpec>,
    /// Emit `IF NOT EXISTS`.
    #[serde(default)]
    pub if_not_exists: bool,
}

impl TableSpec {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: IndexMap::new(),
            if_not_exists: false,
        }
    }

    /// Qualify the table with a schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Append a column; a column with the same name is replaced in place.
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.insert(column.name.clone(), column);
        self
    }

    /// Emit `IF NOT EXISTS`.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

/// Foreign key constraint between two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// Constraint name.
    pub name: String,
    /// Referencing table.
    pub table: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Source column → referenced column, in order.
    pub mapping: IndexMap<String, String>,
    /// Referential actions.
    #[serde(default)]
    pub rules: ForeignKeyRules,
}

impl ForeignKeySpec {
    /// Create a foreign key with no columns yet.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        referenced_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            referenced_table: referenced_table.into(),
            mapping: IndexMap::new(),
            rules: ForeignKeyRules::default(),
        }
    }

    /// Map a source column to a referenced column.
    pub fn map(mut self, column: impl Into<String>, referenced: impl Into<String>) -> Self {
        self.mapping.insert(column.into(), referenced.into());
        self
    }

    /// Set referential actions.
    pub fn rules(mut self, rules: ForeignKeyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Expand an inline column reference into a full constraint.
    pub fn from_column(table: impl Into<String>, column: &str, fk: &ForeignKeyRef) -> Self {
        Self::new(fk.name.clone(), table, fk.table.clone())
            .map(column, fk.column.clone())
            .rules(fk.rules)
    }
}

/// Default-value change in `change_column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultChange {
    /// `SET DEFAULT`
    Set(DefaultValue),
    /// `DROP DEFAULT`
    Drop,
}

/// Attributes to alter on an existing column; absent attributes are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// `Some(true)` sets `NOT NULL`, `Some(false)` drops it.
    #[serde(default)]
    pub not_null: Option<bool>,
    /// `Some(true)` adds the unique constraint, `Some(false)` drops it.
    #[serde(default)]
    pub unique: Option<bool>,
    /// Default change.
    #[serde(default)]
    pub default_value: Option<DefaultChange>,
    /// New column type.
    #[serde(default, rename = "type")]
    pub data_type: Option<DataType>,
    /// Length for the new type.
    #[serde(default)]
    pub length: Option<Length>,
    /// Custom `USING` expression for the type change.
    #[serde(default)]
    pub using: Option<String>,
}

impl ColumnChange {
    /// An empty change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or drop `NOT NULL`.
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = Some(not_null);
        self
    }

    /// Add or drop the unique constraint.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    /// Set the default.
    pub fn default_value(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default_value = Some(DefaultChange::Set(value.into()));
        self
    }

    /// Drop the default.
    pub fn drop_default(mut self) -> Self {
        self.default_value = Some(DefaultChange::Drop);
        self
    }

    /// Change the type.
    pub fn data_type(mut self, data_type: impl Into<DataType>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Length for the new type.
    pub fn length(mut self, size: u32) -> Self {
        self.length = Some(Length::Size(size));
        self
    }

    /// Custom cast expression for the type change.
    pub fn using(mut self, expression: impl Into<String>) -> Self {
        self.using = Some(expression.into());
        self
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// `UNIQUE` index.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Create a non-unique index.
    pub fn new<I, S>(name: impl Into<String>, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Make the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// `CASCADE` / `RESTRICT` on drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropBehavior {
    /// Drop dependent objects.
    Cascade,
    /// Refuse if dependent objects exist.
    Restrict,
}

impl DropBehavior {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// Options for `drop_table`, `drop_database` and `drop_sequence`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropOptions {
    /// Emit `IF EXISTS`.
    #[serde(default)]
    pub if_exists: bool,
    /// Trailing `CASCADE` / `RESTRICT`.
    #[serde(default)]
    pub behavior: Option<DropBehavior>,
}

impl DropOptions {
    /// Emit `IF EXISTS`.
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Append `CASCADE`.
    pub fn cascade(mut self) -> Self {
        self.behavior = Some(DropBehavior::Cascade);
        self
    }

    /// Append `RESTRICT`.
    pub fn restrict(mut self) -> Self {
        self.behavior = Some(DropBehavior::Restrict);
        self
    }
}

/// Options for `create_sequence`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOptions {
    /// Temporary sequence.
    #[serde(default)]
    pub temp: bool,
    /// Emit `IF NOT EXISTS`.
    #[serde(default)]
    pub if_not_exists: bool,
    /// `START WITH`
    #[serde(default)]
    pub start: Option<i64>,
    /// `INCREMENT BY`
    #[serde(default)]
    pub increment: Option<i64>,
}

impl SequenceOptions {
    /// Create a temporary sequence.
    pub fn temp(mut self) -> Self {
        self.temp = true;
        self
    }

    /// Emit `IF NOT EXISTS`.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Set the start value.
    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the increment.
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }
}

/// Which bookkeeping table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    /// Applied migrations.
    Migrations,
    /// Applied seeds.
    Seeds,
}

/// A row of a tracking table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Auto-increment id.
    pub id: i64,
    /// Migration or seed name.
    pub name: String,
    /// When it ran.
    pub run_on: NaiveDateTime,
}

/// Column layout shared by both tracking tables.
pub fn tracking_table(name: impl Into<String>) -> TableSpec {
    TableSpec::new(name)
        .column(
            ColumnSpec::new("id", DataType::Integer)
                .not_null()
                .primary_key()
                .auto_increment(),
        )
        .column(ColumnSpec::new("name", DataType::String).length(255).not_null())
        .column(ColumnSpec::new("run_on", DataType::DateTime).not_null())
}

/// The active schema and search path of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContext {
    /// Configured schema.
    pub schema: String,
    /// Resolved search path entries, already quoted as the engine expects.
    pub search_path: Vec<String>,
}

impl SchemaContext {
    /// Context for a schema whose search path has not been read yet.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            search_path: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_is_preserved() {
        let table = TableSpec::new("events")
            .column(ColumnSpec::new("b", DataType::Integer))
            .column(ColumnSpec::new("a", DataType::Integer));

        let names: Vec<_> = table.columns.keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_data_type_tokens() {
        assert_eq!(DataType::from("string"), DataType::String);
        assert_eq!(DataType::from("BIGINT"), DataType::BigInteger);
        assert_eq!(DataType::from("inet"), DataType::Custom("inet".into()));
        assert!(DataType::SmallInteger.is_integer());
        assert!(!DataType::Text.is_integer());
    }

    #[test]
    fn test_foreign_key_from_column() {
        let fk = ForeignKeyRef::new("posts_author_fk", "users", "id")
            .on_delete(ReferentialAction::Cascade);
        let spec = ForeignKeySpec::from_column("posts", "author_id", &fk);

        assert_eq!(spec.table, "posts");
        assert_eq!(spec.referenced_table, "users");
        assert_eq!(spec.mapping.get("author_id").map(String::as_str), Some("id"));
        assert_eq!(spec.rules.on_delete, ReferentialAction::Cascade);
        assert_eq!(spec.rules.on_update, ReferentialAction::NoAction);
    }

    #[test]
    fn test_tracking_table_layout() {
        let table = tracking_table("migrations");
        let names: Vec<_> = table.columns.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "name", "run_on"]);
        assert!(table.columns["id"].auto_increment);
        assert_eq!(table.columns["name"].length, Some(Length::Size(255)));
    }

    #[test]
    fn test_column_spec_deserialize() {
        let column: ColumnSpec = serde_json::from_str(
            r#"{"name": "title", "type": "string", "length": 80, "not_null": true}"#,
        )
        .unwrap();
        assert_eq!(column.data_type, DataType::String);
        assert_eq!(column.length, Some(Length::Size(80)));
        assert_eq!(column.not_null, Some(true));
    }
}
