//! PostgreSQL built-in store type mappings.

use crate::core::types::ValueType;

use super::mapping::{parse_store_type, RelationalTypeMapping, TypeMappingInfo};

/// Largest length PostgreSQL accepts for `varchar(n)` / `char(n)`.
const MAX_CHAR_LENGTH: u32 = 10_485_760;

/// PostgreSQL store types.
#[derive(Debug, Clone, Default)]
pub struct PostgresTypeMappings;

impl PostgresTypeMappings {
    /// Create the PostgreSQL mapping set.
    pub fn new() -> Self {
        Self
    }

    fn for_value_type(&self, info: &TypeMappingInfo, value_type: &ValueType) -> Option<RelationalTypeMapping> {
        let mapping = match value_type {
            ValueType::Bool => RelationalTypeMapping::new("boolean", ValueType::Bool),
            ValueType::Int16 => RelationalTypeMapping::new("smallint", ValueType::Int16),
            ValueType::Int32 => RelationalTypeMapping::new("integer", ValueType::Int32),
            ValueType::Int64 => RelationalTypeMapping::new("bigint", ValueType::Int64),
            ValueType::Float32 => RelationalTypeMapping::new("real", ValueType::Float32),
            ValueType::Float64 => {
                RelationalTypeMapping::new("double precision", ValueType::Float64)
            }
            ValueType::Decimal => match (info.precision, info.scale) {
                (Some(p), Some(s)) => {
                    RelationalTypeMapping::new(format!("numeric({},{})", p, s), ValueType::Decimal)
                        .with_precision(Some(p), Some(s))
                }
                (Some(p), None) => {
                    RelationalTypeMapping::new(format!("numeric({})", p), ValueType::Decimal)
                        .with_precision(Some(p), None)
                }
                _ => RelationalTypeMapping::new("numeric", ValueType::Decimal),
            },
            ValueType::String => {
                let fixed = info.is_fixed_length.unwrap_or(false);
                match info.size {
                    Some(len) if len > 0 && len <= MAX_CHAR_LENGTH => {
                        let base = if fixed { "character" } else { "character varying" };
                        RelationalTypeMapping::new(format!("{}({})", base, len), ValueType::String)
                            .with_size(Some(len))
                            .fixed_length(fixed)
                    }
                    _ => RelationalTypeMapping::new("text", ValueType::String),
                }
                .unicode(true)
            }
            ValueType::Bytes => RelationalTypeMapping::new("bytea", ValueType::Bytes),
            ValueType::Guid => RelationalTypeMapping::new("uuid", ValueType::Guid),
            ValueType::Date => RelationalTypeMapping::new("date", ValueType::Date),
            ValueType::Time => RelationalTypeMapping::new("time", ValueType::Time),
            ValueType::DateTime => RelationalTypeMapping::new("timestamp", ValueType::DateTime),
            ValueType::DateTimeOffset => {
                RelationalTypeMapping::new("timestamptz", ValueType::DateTimeOffset)
            }
            _ => return None,
        };
        Some(mapping)
    }

    fn for_store_type(&self, info: &TypeMappingInfo, store_type: &str) -> Option<RelationalTypeMapping> {
        let (base, _, _) = parse_store_type(store_type);
        let natural = match base.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => ValueType::Bool,
            "smallint" | "int2" => ValueType::Int16,
            "integer" | "int" | "int4" | "serial" => ValueType::Int32,
            "bigint" | "int8" | "bigserial" => ValueType::Int64,
            "real" | "float4" => ValueType::Float32,
            "double precision" | "float8" => ValueType::Float64,
            "numeric" | "decimal" | "money" => ValueType::Decimal,
            "text" | "varchar" | "character varying" | "char" | "character" | "citext" => {
                ValueType::String
            }
            "bytea" => ValueType::Bytes,
            "uuid" => ValueType::Guid,
            "date" => ValueType::Date,
            "time" | "time without time zone" => ValueType::Time,
            "timestamp" | "timestamp without time zone" => ValueType::DateTime,
            "timestamptz" | "timestamp with time zone" => ValueType::DateTimeOffset,
            _ => return None,
        };

        // A store type that cannot hold the requested logical type needs a
        // converter, which only plugins provide.
        if let Some(requested) = &info.value_type {
            if *requested != natural {
                return None;
            }
        }

        let fixed = matches!(base.as_str(), "char" | "character");
        Some(
            RelationalTypeMapping::new(store_type, natural.clone())
                .with_size(info.size)
                .with_precision(info.precision, info.scale)
                .unicode(natural == ValueType::String)
                .fixed_length(fixed),
        )
    }
}

impl super::ProviderTypeMappings for PostgresTypeMappings {
    fn provider_name(&self) -> &str {
        "postgres"
    }

    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<RelationalTypeMapping> {
        match (&info.store_type_name, &info.value_type) {
            (Some(store_type), _) => self.for_store_type(info, store_type),
            (None, Some(value_type)) => self.for_value_type(info, value_type),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ProviderTypeMappings;
    use super::*;

    fn map(info: TypeMappingInfo) -> Option<String> {
        PostgresTypeMappings::new()
            .find_mapping(&info)
            .map(|m| m.store_type)
    }

    #[test]
    fn test_scalar_defaults() {
        assert_eq!(map(TypeMappingInfo::for_type(ValueType::Bool)).as_deref(), Some("boolean"));
        assert_eq!(map(TypeMappingInfo::for_type(ValueType::Int32)).as_deref(), Some("integer"));
        assert_eq!(
            map(TypeMappingInfo::for_type(ValueType::Float64)).as_deref(),
            Some("double precision")
        );
        assert_eq!(map(TypeMappingInfo::for_type(ValueType::Guid)).as_deref(), Some("uuid"));
        assert_eq!(
            map(TypeMappingInfo::for_type(ValueType::DateTimeOffset)).as_deref(),
            Some("timestamptz")
        );
    }

    #[test]
    fn test_string_facets() {
        assert_eq!(map(TypeMappingInfo::for_type(ValueType::String)).as_deref(), Some("text"));
        assert_eq!(
            map(TypeMappingInfo::for_type(ValueType::String).with_size(Some(50))).as_deref(),
            Some("character varying(50)")
        );
        assert_eq!(
            map(TypeMappingInfo::for_type(ValueType::String)
                .with_size(Some(3))
                .with_fixed_length(Some(true)))
            .as_deref(),
            Some("character(3)")
        );
    }

    #[test]
    fn test_decimal_facets() {
        assert_eq!(map(TypeMappingInfo::for_type(ValueType::Decimal)).as_deref(), Some("numeric"));
        assert_eq!(
            map(TypeMappingInfo::for_type(ValueType::Decimal).with_precision(Some(18), Some(2)))
                .as_deref(),
            Some("numeric(18,2)")
        );
    }

    #[test]
    fn test_store_type_lookup() {
        let mapping = PostgresTypeMappings::new()
            .find_mapping(&TypeMappingInfo::for_store_type("varchar(20)"))
            .unwrap();
        assert_eq!(mapping.value_type, ValueType::String);
        assert_eq!(mapping.size, Some(20));
        assert_eq!(mapping.store_type_name_base, "varchar");

        assert!(map(TypeMappingInfo::for_store_type("geometry")).is_none());
        assert!(map(TypeMappingInfo::for_store_type("text").with_value_type(ValueType::Guid)).is_none());
    }
}
