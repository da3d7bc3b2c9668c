//! DDL generation for PostgreSQL.

use strata_core::normalize::{qualified_name, validate_column};
use strata_core::{
    ChangeStep, ColumnChange, ColumnSpec, DefaultChange, DefaultValue, DropBehavior, DropOptions,
    ForeignKeySpec, IndexSpec, MigrateError, MigrateResult, PrimaryKey, SequenceOptions, Statement,
    TableSpec, TypeMapper, Value, normalize_table, quote_identifier, quote_literal,
};

use crate::types::PgTypeMapper;

/// Statements produced for a `create_table` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDdl {
    /// The `CREATE TABLE` statement.
    pub create: Statement,
    /// Foreign keys to apply after the table exists, keyed by constraint name.
    pub foreign_keys: Vec<(String, Statement)>,
}

/// Statements produced for an `add_column` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDdl {
    /// The `ALTER TABLE ... ADD COLUMN` statement.
    pub add: Statement,
    /// Foreign key to apply after the column exists.
    pub foreign_key: Option<(String, Statement)>,
}

/// SQL generator for PostgreSQL.
///
/// Every method is pure; nothing here touches a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdlBuilder {
    mapper: PgTypeMapper,
}

impl DdlBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the type mapper.
    pub fn mapper(&self) -> &PgTypeMapper {
        &self.mapper
    }

    /// Generate CREATE TABLE plus deferred foreign keys.
    ///
    /// Sort-key columns append an `[INTERLEAVED|COMPOUND] SORTKEY (...)`
    /// clause. That clause is Amazon Redshift syntax; stock PostgreSQL rejects
    /// it, so only declare sort keys when the target is Redshift.
    pub fn create_table(&self, spec: &TableSpec) -> MigrateResult<TableDdl> {
        let table = normalize_table(spec)?;

        let mut definitions = Vec::new();
        for column in table.columns() {
            let inline_pk = table.primary_key.is_inline(&column.name);
            definitions.push(self.column_definition(column, inline_pk)?);
        }

        if let PrimaryKey::Composite(columns) = &table.primary_key {
            definitions.push(format!("PRIMARY KEY ({})", quote_list(columns)));
        }

        let mut sql = format!(
            "CREATE TABLE {}{} ({})",
            if spec.if_not_exists { "IF NOT EXISTS " } else { "" },
            table.quoted_name,
            definitions.join(", ")
        );

        if let Some((strategy, columns)) = &table.sort_key {
            sql.push_str(&format!(
                " {} SORTKEY ({})",
                self.mapper.sort_key_token(*strategy),
                quote_list(columns)
            ));
        }

        let foreign_keys = table
            .columns()
            .filter_map(|column| {
                column.foreign_key.as_ref().map(|fk| {
                    let fk = ForeignKeySpec::from_column(spec.name.clone(), &column.name, fk);
                    self.foreign_key_on(&table.quoted_name, &fk)
                        .map(|statement| (fk.name.clone(), statement))
                })
            })
            .collect::<MigrateResult<Vec<_>>>()?;

        Ok(TableDdl {
            create: Statement::new(sql),
            foreign_keys,
        })
    }

    /// Generate a column definition.
    pub fn column_definition(&self, column: &ColumnSpec, inline_pk: bool) -> MigrateResult<String> {
        validate_column(column)?;

        let serial = if column.auto_increment {
            self.mapper.serial_type(&column.data_type)
        } else {
            None
        };

        let mut parts = vec![quote_identifier(&column.name)];
        match serial {
            Some(serial) => parts.push(serial.to_string()),
            None => {
                let mut sql_type = self.mapper.map_type(&column.data_type)?.into_owned();
                if let Some(length) = column.length {
                    sql_type.push_str(&length.to_string());
                }
                parts.push(sql_type);
            }
        }

        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
        }

        if column.not_null == Some(true) {
            parts.push("NOT NULL".to_string());
        }

        if column.unique == Some(true) && !inline_pk {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &column.default_value {
            parts.push(format!("DEFAULT {}", default_sql(default)));
        }

        Ok(parts.join(" "))
    }

    /// Generate DROP TABLE.
    pub fn drop_table(&self, table: &str, options: DropOptions) -> Statement {
        drop_statement("TABLE", table, options)
    }

    /// Generate ALTER TABLE ADD COLUMN plus a deferred foreign key.
    pub fn add_column(&self, table: &str, column: &ColumnSpec) -> MigrateResult<ColumnDdl> {
        let definition = self.column_definition(column, column.primary_key)?;
        let quoted = quote_identifier(table);

        let foreign_key = column
            .foreign_key
            .as_ref()
            .map(|fk| {
                let fk = ForeignKeySpec::from_column(table, &column.name, fk);
                self.foreign_key_on(&quoted, &fk)
                    .map(|statement| (fk.name.clone(), statement))
            })
            .transpose()?;

        Ok(ColumnDdl {
            add: Statement::new(format!("ALTER TABLE {} ADD COLUMN {}", quoted, definition)),
            foreign_key,
        })
    }

    /// Generate ALTER TABLE DROP COLUMN.
    pub fn remove_column(&self, table: &str, column: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_identifier(table),
            quote_identifier(column)
        ))
    }

    /// Generate ALTER TABLE RENAME COLUMN.
    pub fn rename_column(&self, table: &str, from: &str, to: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_identifier(table),
            quote_identifier(from),
            quote_identifier(to)
        ))
    }

    /// Generate ALTER TABLE RENAME TO.
    pub fn rename_table(&self, from: &str, to: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_identifier(from),
            quote_identifier(to)
        ))
    }

    /// Generate the ordered steps of a column change.
    ///
    /// Steps run in the order not null, unique, default, type; each is present
    /// only when its attribute is set. All types are mapped up front so an
    /// unsupported type fails before any statement is issued.
    pub fn change_column(
        &self,
        table: &str,
        column: &str,
        change: &ColumnChange,
    ) -> MigrateResult<Vec<(ChangeStep, Statement)>> {
        let quoted_table = quote_identifier(table);
        let quoted_column = quote_identifier(column);
        let alter = format!("ALTER TABLE {} ALTER COLUMN {}", quoted_table, quoted_column);
        let mut steps = Vec::new();

        if let Some(not_null) = change.not_null {
            let action = if not_null { "SET NOT NULL" } else { "DROP NOT NULL" };
            steps.push((
                ChangeStep::Nullability,
                Statement::new(format!("{} {}", alter, action)),
            ));
        }

        if let Some(unique) = change.unique {
            let constraint = quote_identifier(&format!("{}_{}_key", table, column));
            let sql = if unique {
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                    quoted_table, constraint, quoted_column
                )
            } else {
                format!("ALTER TABLE {} DROP CONSTRAINT {}", quoted_table, constraint)
            };
            steps.push((ChangeStep::Unique, Statement::new(sql)));
        }

        if let Some(default) = &change.default_value {
            let sql = match default {
                DefaultChange::Set(value) => format!("{} SET DEFAULT {}", alter, default_sql(value)),
                DefaultChange::Drop => format!("{} DROP DEFAULT", alter),
            };
            steps.push((ChangeStep::Default, Statement::new(sql)));
        }

        if let Some(data_type) = &change.data_type {
            let mut sql_type = self.mapper.map_type(data_type)?.into_owned();
            if let Some(length) = change.length {
                sql_type.push_str(&length.to_string());
            }
            let using = change
                .using
                .clone()
                .unwrap_or_else(|| format!("{}::{}", quoted_column, sql_type));
            steps.push((
                ChangeStep::Type,
                Statement::new(format!("{} TYPE {} USING ({})", alter, sql_type, using)),
            ));
        }

        Ok(steps)
    }

    /// Generate ALTER TABLE ADD CONSTRAINT ... FOREIGN KEY.
    pub fn add_foreign_key(&self, fk: &ForeignKeySpec) -> MigrateResult<Statement> {
        self.foreign_key_on(&quote_identifier(&fk.table), fk)
    }

    fn foreign_key_on(&self, quoted_table: &str, fk: &ForeignKeySpec) -> MigrateResult<Statement> {
        if fk.mapping.is_empty() {
            return Err(MigrateError::invalid_spec(format!(
                "foreign key '{}' maps no columns",
                fk.name
            )));
        }

        let columns: Vec<&String> = fk.mapping.keys().collect();
        let referenced: Vec<&String> = fk.mapping.values().collect();

        Ok(Statement::new(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quoted_table,
            quote_identifier(&fk.name),
            quote_list(&columns),
            quote_identifier(&fk.referenced_table),
            quote_list(&referenced),
            fk.rules.on_delete.as_sql(),
            fk.rules.on_update.as_sql()
        )))
    }

    /// Generate ALTER TABLE DROP CONSTRAINT.
    pub fn remove_foreign_key(&self, table: &str, name: &str) -> Statement {
        Statement::new(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            quote_identifier(table),
            quote_identifier(name)
        ))
    }

    /// Generate CREATE INDEX.
    pub fn add_index(&self, index: &IndexSpec) -> MigrateResult<Statement> {
        if index.columns.is_empty() {
            return Err(MigrateError::invalid_spec(format!(
                "index '{}' has no columns",
                index.name
            )));
        }
        Ok(Statement::new(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            quote_identifier(&index.name),
            quote_identifier(&index.table),
            quote_list(&index.columns)
        )))
    }

    /// Generate DROP INDEX.
    pub fn remove_index(&self, name: &str) -> Statement {
        Statement::new(format!("DROP INDEX {}", quote_identifier(name)))
    }

    /// Generate CREATE DATABASE.
    pub fn create_database(&self, name: &str) -> Statement {
        Statement::new(format!("CREATE DATABASE {}", quote_identifier(name)))
    }

    /// Generate DROP DATABASE.
    pub fn drop_database(&self, name: &str, options: DropOptions) -> MigrateResult<Statement> {
        if options.behavior.is_some() {
            return Err(MigrateError::invalid_spec(
                "DROP DATABASE does not accept CASCADE or RESTRICT",
            ));
        }
        Ok(drop_statement("DATABASE", name, options))
    }

    /// Generate CREATE SEQUENCE.
    pub fn create_sequence(&self, name: &str, options: SequenceOptions) -> Statement {
        let mut sql = format!(
            "CREATE {}SEQUENCE {}{}",
            if options.temp { "TEMP " } else { "" },
            if options.if_not_exists { "IF NOT EXISTS " } else { "" },
            quote_identifier(name)
        );
        if let Some(increment) = options.increment {
            sql.push_str(&format!(" INCREMENT BY {}", increment));
        }
        if let Some(start) = options.start {
            sql.push_str(&format!(" START WITH {}", start));
        }
        Statement::new(sql)
    }

    /// Generate DROP SEQUENCE.
    pub fn drop_sequence(&self, name: &str, options: DropOptions) -> Statement {
        drop_statement("SEQUENCE", name, options)
    }

    /// Generate INSERT with one bound parameter per value.
    pub fn insert(&self, table: &str, columns: &[&str], values: Vec<Value>) -> MigrateResult<Statement> {
        if columns.is_empty() {
            return Err(MigrateError::invalid_spec(format!(
                "insert into '{}' names no columns",
                table
            )));
        }
        if columns.len() != values.len() {
            return Err(MigrateError::invalid_spec(format!(
                "insert into '{}' has {} columns but {} values",
                table,
                columns.len(),
                values.len()
            )));
        }

        let markers = vec!["?"; columns.len()].join(", ");
        Ok(Statement::with_params(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(table),
                quote_list(columns),
                markers
            ),
            values,
        ))
    }

    /// Generate the read of a tracking table, oldest first.
    pub fn select_tracking(&self, schema: Option<&str>, table: &str) -> Statement {
        Statement::new(format!(
            "SELECT id, name, run_on FROM {} ORDER BY run_on, id",
            qualified_name(schema, table)
        ))
    }
}

/// Render a column default.
///
/// Strings are quoted with embedded quotes doubled; other literals are
/// emitted as-is and expressions verbatim.
pub fn default_sql(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Expression(expression) => expression.clone(),
        DefaultValue::Literal(value) => match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            // Bare NaN or inf would parse as identifiers
            Value::Float(f) if f.is_nan() => "'NaN'".to_string(),
            Value::Float(f) if f.is_infinite() => {
                let literal = if f.is_sign_positive() { "'Infinity'" } else { "'-Infinity'" };
                literal.to_string()
            }
            Value::Float(f) => f.to_string(),
            Value::String(s) => quote_literal(s),
            Value::Timestamp(ts) => quote_literal(&ts.to_string()),
            Value::Json(j) => quote_literal(&j.to_string()),
        },
    }
}

fn drop_statement(kind: &str, name: &str, options: DropOptions) -> Statement {
    let mut sql = format!(
        "DROP {} {}{}",
        kind,
        if options.if_exists { "IF EXISTS " } else { "" },
        quote_identifier(name)
    );
    match options.behavior {
        Some(DropBehavior::Cascade) => sql.push_str(" CASCADE"),
        Some(DropBehavior::Restrict) => sql.push_str(" RESTRICT"),
        None => {}
    }
    Statement::new(sql)
}

fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}
