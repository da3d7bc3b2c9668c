//! Abstract type to SQL type mapping.

use std::borrow::Cow;

use crate::error::{MigrateError, MigrateResult};
use crate::schema::{DataType, SortKey};

/// Maps abstract column types to a dialect's type keywords.
///
/// Implementations must be pure: the same input always yields the same token.
pub trait TypeMapper: Send + Sync {
    /// Map a column type, failing with [`MigrateError::UnsupportedType`] when neither
    /// the dialect nor the default mapping knows it.
    fn map_type(&self, data_type: &DataType) -> MigrateResult<Cow<'static, str>>;

    /// Keyword introducing a sort-key clause of the given strategy.
    fn sort_key_token(&self, strategy: SortKey) -> &'static str {
        match strategy {
            SortKey::Compound => "COMPOUND",
            SortKey::Interleaved => "INTERLEAVED",
        }
    }
}

/// Fallback mapping shared by all dialects.
///
/// Dialect-specific and custom tokens return `None`.
pub fn default_type_token(data_type: &DataType) -> Option<&'static str> {
    match data_type {
        DataType::Char => Some("CHAR"),
        DataType::String => Some("VARCHAR"),
        DataType::Text => Some("TEXT"),
        DataType::SmallInteger => Some("SMALLINT"),
        DataType::Integer => Some("INTEGER"),
        DataType::BigInteger => Some("BIGINT"),
        DataType::Real => Some("REAL"),
        DataType::Decimal => Some("DECIMAL"),
        DataType::Boolean => Some("BOOLEAN"),
        DataType::Date => Some("DATE"),
        DataType::DateTime => Some("TIMESTAMP"),
        DataType::Time => Some("TIME"),
        DataType::Timestamp => Some("TIMESTAMP"),
        DataType::Blob | DataType::Binary => Some("BLOB"),
        DataType::Json | DataType::Jsonb | DataType::Uuid | DataType::Custom(_) => None,
    }
}

/// Mapper that knows only the default mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeMapper;

impl TypeMapper for DefaultTypeMapper {
    fn map_type(&self, data_type: &DataType) -> MigrateResult<Cow<'static, str>> {
        default_type_token(data_type)
            .map(Cow::Borrowed)
            .ok_or_else(|| MigrateError::unsupported_type(data_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let mapper = DefaultTypeMapper;
        assert_eq!(mapper.map_type(&DataType::String).unwrap(), "VARCHAR");
        assert_eq!(mapper.map_type(&DataType::BigInteger).unwrap(), "BIGINT");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mapper = DefaultTypeMapper;
        let err = mapper
            .map_type(&DataType::Custom("geometry".into()))
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedType(ref t) if t == "geometry"));
    }

    #[test]
    fn test_sort_key_tokens() {
        let mapper = DefaultTypeMapper;
        assert_eq!(mapper.sort_key_token(SortKey::Compound), "COMPOUND");
        assert_eq!(mapper.sort_key_token(SortKey::Interleaved), "INTERLEAVED");
    }
}
