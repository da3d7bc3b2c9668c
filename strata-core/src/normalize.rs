//! Column specification normalization and SQL quoting helpers.

use crate::error::{MigrateError, MigrateResult};
use crate::schema::{ColumnSpec, SortKey, TableSpec};

/// Quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    format!("'{}'", escaped)
}

/// Quote a possibly schema-qualified name.
pub fn qualified_name(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(name)),
        None => quote_identifier(name),
    }
}

/// How the primary key of a table is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// No primary key column.
    None,
    /// Exactly one column; emitted inline on that column.
    Inline(String),
    /// Several columns; emitted once as a table-level constraint.
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Whether `column` gets an inline `PRIMARY KEY`.
    pub fn is_inline(&self, column: &str) -> bool {
        matches!(self, Self::Inline(name) if name == column)
    }
}

/// A validated table ready for DDL generation.
#[derive(Debug, Clone)]
pub struct NormalizedTable<'a> {
    /// The source specification.
    pub spec: &'a TableSpec,
    /// Quoted, possibly schema-qualified table name.
    pub quoted_name: String,
    /// Primary key layout.
    pub primary_key: PrimaryKey,
    /// Dominant sort-key strategy and its columns in declaration order.
    pub sort_key: Option<(SortKey, Vec<String>)>,
}

impl NormalizedTable<'_> {
    /// Columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.spec.columns.values()
    }
}

/// Validate a column in isolation.
pub fn validate_column(column: &ColumnSpec) -> MigrateResult<()> {
    if column.name.trim().is_empty() {
        return Err(MigrateError::invalid_spec("column name must not be empty"));
    }
    if column.auto_increment && !column.data_type.is_integer() {
        return Err(MigrateError::invalid_spec(format!(
            "column '{}' is auto-increment but has non-integer type {}",
            column.name, column.data_type
        )));
    }
    Ok(())
}

/// Validate a table and work out its primary key and sort-key layout.
pub fn normalize_table(spec: &TableSpec) -> MigrateResult<NormalizedTable<'_>> {
    if spec.name.trim().is_empty() {
        return Err(MigrateError::invalid_spec("table name must not be empty"));
    }
    if spec.columns.is_empty() {
        return Err(MigrateError::invalid_spec(format!(
            "table '{}' has no columns",
            spec.name
        )));
    }

    for (key, column) in &spec.columns {
        validate_column(column)?;
        if key != &column.name {
            return Err(MigrateError::invalid_spec(format!(
                "column key '{}' does not match column name '{}'",
                key, column.name
            )));
        }
    }

    let pk_columns: Vec<String> = spec
        .columns
        .values()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();

    let primary_key = match pk_columns.len() {
        0 => PrimaryKey::None,
        1 => PrimaryKey::Inline(pk_columns.into_iter().next().unwrap_or_default()),
        _ => PrimaryKey::Composite(pk_columns),
    };

    let mut strategy = None;
    let mut sort_columns = Vec::new();
    for column in spec.columns.values() {
        if let Some(key) = column.sort_key {
            if strategy != Some(SortKey::Interleaved) {
                strategy = Some(key);
            }
            sort_columns.push(column.name.clone());
        }
    }

    Ok(NormalizedTable {
        spec,
        quoted_name: qualified_name(spec.schema.as_deref(), &spec.name),
        primary_key,
        sort_key: strategy.map(|s| (s, sort_columns)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(qualified_name(Some("app"), "users"), "\"app\".\"users\"");
    }

    #[test]
    fn test_single_primary_key_is_inline() {
        let table = TableSpec::new("users")
            .column(ColumnSpec::new("id", DataType::Integer).primary_key())
            .column(ColumnSpec::new("name", DataType::String));

        let normalized = normalize_table(&table).unwrap();
        assert_eq!(normalized.primary_key, PrimaryKey::Inline("id".into()));
        assert!(normalized.primary_key.is_inline("id"));
    }

    #[test]
    fn test_composite_primary_key_keeps_order() {
        let table = TableSpec::new("memberships")
            .column(ColumnSpec::new("user_id", DataType::Integer).primary_key())
            .column(ColumnSpec::new("note", DataType::Text))
            .column(ColumnSpec::new("group_id", DataType::Integer).primary_key());

        let normalized = normalize_table(&table).unwrap();
        assert_eq!(
            normalized.primary_key,
            PrimaryKey::Composite(vec!["user_id".into(), "group_id".into()])
        );
        assert!(!normalized.primary_key.is_inline("user_id"));
    }

    #[test]
    fn test_interleaved_dominates() {
        let table = TableSpec::new("facts")
            .column(ColumnSpec::new("a", DataType::Integer).sort_key(SortKey::Compound))
            .column(ColumnSpec::new("b", DataType::Integer).sort_key(SortKey::Interleaved))
            .column(ColumnSpec::new("c", DataType::Integer).sort_key(SortKey::Compound));

        let normalized = normalize_table(&table).unwrap();
        let (strategy, columns) = normalized.sort_key.unwrap();
        assert_eq!(strategy, SortKey::Interleaved);
        assert_eq!(columns, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rejects_invalid_specs() {
        assert!(normalize_table(&TableSpec::new("empty")).is_err());

        let table = TableSpec::new("t")
            .column(ColumnSpec::new("name", DataType::Text).auto_increment());
        assert!(matches!(
            normalize_table(&table),
            Err(MigrateError::InvalidSpec(_))
        ));
    }
}
