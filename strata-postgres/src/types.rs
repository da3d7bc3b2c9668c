//! Type mapping and value conversions for PostgreSQL.

use std::borrow::Cow;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use strata_core::{DataType, MigrateError, MigrateResult, Row, TypeMapper, Value, default_type_token};
use tokio_postgres::types::{FromSql, ToSql, Type};
use uuid::Uuid;

use crate::error::{PgError, PgResult};

/// Custom type tokens PostgreSQL understands natively.
const NATIVE_TOKENS: &[&str] = &[
    "bigserial",
    "bit",
    "bit varying",
    "bytea",
    "character varying",
    "cidr",
    "citext",
    "double precision",
    "hstore",
    "inet",
    "interval",
    "macaddr",
    "money",
    "numeric",
    "point",
    "serial",
    "smallserial",
    "timestamptz",
    "timetz",
    "tsquery",
    "tsvector",
    "varchar",
    "xml",
];

/// Type mapper for PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgTypeMapper;

impl PgTypeMapper {
    /// Create a new mapper.
    pub fn new() -> Self {
        Self
    }

    /// Serial type used for an auto-increment integer column.
    pub fn serial_type(&self, data_type: &DataType) -> Option<&'static str> {
        match data_type {
            DataType::SmallInteger => Some("SMALLSERIAL"),
            DataType::Integer => Some("SERIAL"),
            DataType::BigInteger => Some("BIGSERIAL"),
            _ => None,
        }
    }

    fn dialect_token(&self, data_type: &DataType) -> Option<Cow<'static, str>> {
        match data_type {
            DataType::String => Some(Cow::Borrowed("VARCHAR")),
            DataType::DateTime => Some(Cow::Borrowed("TIMESTAMP")),
            DataType::Blob | DataType::Binary => Some(Cow::Borrowed("BYTEA")),
            DataType::Json => Some(Cow::Borrowed("JSON")),
            DataType::Jsonb => Some(Cow::Borrowed("JSONB")),
            DataType::Uuid => Some(Cow::Borrowed("UUID")),
            DataType::Custom(token) => native_token(token),
            _ => None,
        }
    }
}

/// Resolve a custom token, including array forms such as `inet[]`.
fn native_token(token: &str) -> Option<Cow<'static, str>> {
    let token = token.trim().to_ascii_lowercase();
    if let Some(element) = token.strip_suffix("[]") {
        return native_token(element).map(|t| Cow::Owned(format!("{}[]", t)));
    }
    let element = DataType::from(token.as_str());
    if !matches!(element, DataType::Custom(_)) {
        return PgTypeMapper
            .dialect_token(&element)
            .or_else(|| default_type_token(&element).map(Cow::Borrowed));
    }
    NATIVE_TOKENS
        .contains(&token.as_str())
        .then(|| Cow::Owned(token.to_ascii_uppercase()))
}

impl TypeMapper for PgTypeMapper {
    fn map_type(&self, data_type: &DataType) -> MigrateResult<Cow<'static, str>> {
        self.dialect_token(data_type)
            .or_else(|| default_type_token(data_type).map(Cow::Borrowed))
            .ok_or_else(|| MigrateError::unsupported_type(data_type.to_string()))
    }
}

/// Convert a value into a parameter of the type the server expects.
pub fn value_to_sql(value: &Value, ty: &Type) -> PgResult<Box<dyn ToSql + Sync + Send>> {
    match value {
        Value::Null => Ok(typed_null(ty)),
        Value::Bool(b) => Ok(Box::new(*b)),
        Value::Int(i) => match *ty {
            Type::INT2 => i16::try_from(*i)
                .map(|v| Box::new(v) as Box<dyn ToSql + Sync + Send>)
                .map_err(|_| PgError::type_conversion(format!("{} does not fit in int2", i))),
            Type::INT4 => i32::try_from(*i)
                .map(|v| Box::new(v) as Box<dyn ToSql + Sync + Send>)
                .map_err(|_| PgError::type_conversion(format!("{} does not fit in int4", i))),
            Type::FLOAT4 => Ok(Box::new(*i as f32)),
            Type::FLOAT8 => Ok(Box::new(*i as f64)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Ok(Box::new(i.to_string())),
            _ => Ok(Box::new(*i)),
        },
        Value::Float(f) => match *ty {
            Type::FLOAT4 => Ok(Box::new(*f as f32)),
            Type::TEXT | Type::VARCHAR => Ok(Box::new(f.to_string())),
            _ => Ok(Box::new(*f)),
        },
        Value::String(s) => Ok(Box::new(s.clone())),
        Value::Timestamp(ts) => match *ty {
            Type::TIMESTAMPTZ => Ok(Box::new(DateTime::<Utc>::from_naive_utc_and_offset(*ts, Utc))),
            Type::TEXT | Type::VARCHAR => Ok(Box::new(ts.to_string())),
            _ => Ok(Box::new(*ts)),
        },
        Value::Json(j) => match *ty {
            Type::TEXT | Type::VARCHAR => Ok(Box::new(j.to_string())),
            _ => Ok(Box::new(j.clone())),
        },
    }
}

fn typed_null(ty: &Type) -> Box<dyn ToSql + Sync + Send> {
    match *ty {
        Type::BOOL => Box::new(Option::<bool>::None),
        Type::INT2 => Box::new(Option::<i16>::None),
        Type::INT4 => Box::new(Option::<i32>::None),
        Type::INT8 => Box::new(Option::<i64>::None),
        Type::FLOAT4 => Box::new(Option::<f32>::None),
        Type::FLOAT8 => Box::new(Option::<f64>::None),
        Type::TIMESTAMP => Box::new(Option::<NaiveDateTime>::None),
        Type::TIMESTAMPTZ => Box::new(Option::<DateTime<Utc>>::None),
        Type::JSON | Type::JSONB => Box::new(Option::<serde_json::Value>::None),
        _ => Box::new(Option::<String>::None),
    }
}

/// Convert values into parameters matching a prepared statement's types.
pub fn values_to_params(
    values: &[Value],
    types: &[Type],
) -> PgResult<Vec<Box<dyn ToSql + Sync + Send>>> {
    if values.len() != types.len() {
        return Err(PgError::query(format!(
            "statement expects {} parameters, got {}",
            types.len(),
            values.len()
        )));
    }
    values
        .iter()
        .zip(types)
        .map(|(value, ty)| value_to_sql(value, ty))
        .collect()
}

/// Convert a driver row into a dialect-neutral row.
pub fn row_from_pg(row: &tokio_postgres::Row) -> PgResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_()).map_err(|e| {
            PgError::type_conversion(format!("failed to read column '{}': {}", column.name(), e))
        })?;
        out.push(column.name(), value);
    }
    Ok(out)
}

/// How a result column is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Json,
    Uuid,
    Inet,
    Bytes,
    TextArray,
    Text,
}

fn column_kind(ty: &Type) -> Option<ColumnKind> {
    let kind = match *ty {
        Type::BOOL => ColumnKind::Bool,
        Type::INT2 => ColumnKind::Int2,
        Type::INT4 => ColumnKind::Int4,
        Type::INT8 => ColumnKind::Int8,
        Type::FLOAT4 => ColumnKind::Float4,
        Type::FLOAT8 => ColumnKind::Float8,
        Type::NUMERIC => ColumnKind::Numeric,
        Type::TIMESTAMP => ColumnKind::Timestamp,
        Type::TIMESTAMPTZ => ColumnKind::TimestampTz,
        Type::DATE => ColumnKind::Date,
        Type::TIME => ColumnKind::Time,
        Type::JSON | Type::JSONB => ColumnKind::Json,
        Type::UUID => ColumnKind::Uuid,
        Type::INET => ColumnKind::Inet,
        Type::BYTEA => ColumnKind::Bytes,
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => ColumnKind::TextArray,
        _ if <String as FromSql>::accepts(ty) => ColumnKind::Text,
        _ => return None,
    };
    Some(kind)
}

fn column_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> PgResult<Value> {
    let kind = column_kind(ty)
        .ok_or_else(|| PgError::type_conversion(format!("unsupported column type '{}'", ty)))?;

    let value = match kind {
        ColumnKind::Bool => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        ColumnKind::Int2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Int(v.into())),
        ColumnKind::Int4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Int(v.into())),
        ColumnKind::Int8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        ColumnKind::Float4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| Value::Float(v.into())),
        ColumnKind::Float8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        // Kept as text so no precision is lost
        ColumnKind::Numeric => row
            .try_get::<_, Option<Decimal>>(idx)?
            .map(|v| Value::String(v.to_string())),
        ColumnKind::Timestamp => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(Value::Timestamp),
        ColumnKind::TimestampTz => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| Value::Timestamp(v.naive_utc())),
        ColumnKind::Date => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| Value::String(v.to_string())),
        ColumnKind::Time => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|v| Value::String(v.to_string())),
        ColumnKind::Json => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Json),
        ColumnKind::Uuid => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(|v| Value::String(v.to_string())),
        ColumnKind::Inet => row
            .try_get::<_, Option<IpAddr>>(idx)?
            .map(|v| Value::String(v.to_string())),
        ColumnKind::Bytes => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(|v| Value::String(bytea_hex(&v))),
        ColumnKind::TextArray => row
            .try_get::<_, Option<Vec<Option<String>>>>(idx)?
            .map(|items| Value::Json(serde_json::Value::from(items))),
        ColumnKind::Text => row.try_get::<_, Option<String>>(idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// PostgreSQL's hex output format for `bytea`.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Convert a simple-query row, where every value arrives as text.
pub fn row_from_simple(row: &tokio_postgres::SimpleQueryRow) -> Row {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = row
            .get(idx)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null);
        out.push(column.name(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(data_type: DataType) -> MigrateResult<String> {
        PgTypeMapper.map_type(&data_type).map(|t| t.into_owned())
    }

    #[test]
    fn test_dialect_tokens() {
        assert_eq!(map(DataType::String).unwrap(), "VARCHAR");
        assert_eq!(map(DataType::DateTime).unwrap(), "TIMESTAMP");
        assert_eq!(map(DataType::Blob).unwrap(), "BYTEA");
        assert_eq!(map(DataType::Binary).unwrap(), "BYTEA");
        assert_eq!(map(DataType::Jsonb).unwrap(), "JSONB");
        assert_eq!(map(DataType::Uuid).unwrap(), "UUID");
    }

    #[test]
    fn test_default_fallthrough() {
        assert_eq!(map(DataType::Integer).unwrap(), "INTEGER");
        assert_eq!(map(DataType::Boolean).unwrap(), "BOOLEAN");
        assert_eq!(map(DataType::Decimal).unwrap(), "DECIMAL");
    }

    #[test]
    fn test_native_custom_tokens() {
        assert_eq!(map(DataType::Custom("inet".into())).unwrap(), "INET");
        assert_eq!(map(DataType::Custom("Interval".into())).unwrap(), "INTERVAL");
        assert_eq!(map(DataType::Custom("text[]".into())).unwrap(), "TEXT[]");
        assert_eq!(map(DataType::Custom("inet[]".into())).unwrap(), "INET[]");
    }

    #[test]
    fn test_unsupported_type() {
        let err = map(DataType::Custom("geography".into())).unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedType(ref t) if t == "geography"));
    }

    #[test]
    fn test_mapping_is_pure() {
        for data_type in [DataType::String, DataType::Custom("money".into()), DataType::Text] {
            assert_eq!(map(data_type.clone()).unwrap(), map(data_type).unwrap());
        }
    }

    #[test]
    fn test_serial_types() {
        assert_eq!(PgTypeMapper.serial_type(&DataType::Integer), Some("SERIAL"));
        assert_eq!(PgTypeMapper.serial_type(&DataType::BigInteger), Some("BIGSERIAL"));
        assert_eq!(PgTypeMapper.serial_type(&DataType::Text), None);
    }

    #[test]
    fn test_value_to_sql() {
        assert!(value_to_sql(&Value::Int(42), &Type::INT4).is_ok());
        assert!(value_to_sql(&Value::Int(i64::MAX), &Type::INT4).is_err());
        assert!(value_to_sql(&Value::String("test".into()), &Type::VARCHAR).is_ok());
        assert!(value_to_sql(&Value::Null, &Type::TIMESTAMP).is_ok());
    }

    #[test]
    fn test_column_kinds() {
        assert_eq!(column_kind(&Type::NUMERIC), Some(ColumnKind::Numeric));
        assert_eq!(column_kind(&Type::UUID), Some(ColumnKind::Uuid));
        assert_eq!(column_kind(&Type::DATE), Some(ColumnKind::Date));
        assert_eq!(column_kind(&Type::INET), Some(ColumnKind::Inet));
        assert_eq!(column_kind(&Type::TEXT_ARRAY), Some(ColumnKind::TextArray));
        assert_eq!(column_kind(&Type::VARCHAR), Some(ColumnKind::Text));
        assert_eq!(column_kind(&Type::NAME), Some(ColumnKind::Text));
    }

    #[test]
    fn test_undecodable_columns_are_not_read_as_null() {
        assert_eq!(column_kind(&Type::POINT), None);
        assert_eq!(column_kind(&Type::INTERVAL), None);
        assert_eq!(column_kind(&Type::INT4_ARRAY), None);
    }

    #[test]
    fn test_bytea_hex() {
        assert_eq!(bytea_hex(&[0xde, 0xad, 0x01]), "\\xdead01");
        assert_eq!(bytea_hex(&[]), "\\x");
    }

    #[test]
    fn test_values_to_params_arity() {
        let err = values_to_params(&[Value::Int(1)], &[Type::INT4, Type::TEXT]);
        assert!(err.is_err());
    }
}
