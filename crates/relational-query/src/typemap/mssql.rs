//! SQL Server built-in store type mappings.

use crate::core::types::ValueType;

use super::mapping::{parse_store_type, RelationalTypeMapping, TypeMappingInfo};

/// Largest bounded `nvarchar(n)` length; anything above uses `max`.
const MAX_UNICODE_LENGTH: u32 = 4000;
/// Largest bounded `varchar(n)` / `varbinary(n)` length.
const MAX_ANSI_LENGTH: u32 = 8000;
/// Default length for string keys and indexed columns.
const KEY_UNICODE_LENGTH: u32 = 450;
/// Default length for ANSI string keys and binary keys.
const KEY_ANSI_LENGTH: u32 = 900;

/// SQL Server store types.
#[derive(Debug, Clone, Default)]
pub struct MssqlTypeMappings;

impl MssqlTypeMappings {
    /// Create the SQL Server mapping set.
    pub fn new() -> Self {
        Self
    }

    fn string_mapping(&self, info: &TypeMappingInfo) -> RelationalTypeMapping {
        let unicode = info.is_unicode.unwrap_or(true);
        let fixed = info.is_fixed_length.unwrap_or(false);
        let (limit, key_len) = if unicode {
            (MAX_UNICODE_LENGTH, KEY_UNICODE_LENGTH)
        } else {
            (MAX_ANSI_LENGTH, KEY_ANSI_LENGTH)
        };
        let base = match (unicode, fixed) {
            (true, true) => "nchar",
            (true, false) => "nvarchar",
            (false, true) => "char",
            (false, false) => "varchar",
        };

        let size = info
            .size
            .or(if info.is_key_or_index { Some(key_len) } else { None })
            .filter(|len| *len > 0 && *len <= limit);

        let store_type = match size {
            Some(len) => format!("{}({})", base, len),
            None if fixed => format!("{}(1)", base),
            None => format!("{}(max)", base),
        };

        RelationalTypeMapping::new(store_type, ValueType::String)
            .with_size(size.or(if fixed { Some(1) } else { None }))
            .unicode(unicode)
            .fixed_length(fixed)
    }

    fn for_value_type(&self, info: &TypeMappingInfo, value_type: &ValueType) -> Option<RelationalTypeMapping> {
        let mapping = match value_type {
            ValueType::Bool => RelationalTypeMapping::new("bit", ValueType::Bool),
            ValueType::Int16 => RelationalTypeMapping::new("smallint", ValueType::Int16),
            ValueType::Int32 => RelationalTypeMapping::new("int", ValueType::Int32),
            ValueType::Int64 => RelationalTypeMapping::new("bigint", ValueType::Int64),
            ValueType::Float32 => RelationalTypeMapping::new("real", ValueType::Float32),
            ValueType::Float64 => RelationalTypeMapping::new("float", ValueType::Float64),
            ValueType::Decimal => {
                let precision = info.precision.unwrap_or(18);
                let scale = info.scale.unwrap_or(2);
                RelationalTypeMapping::new(
                    format!("decimal({},{})", precision, scale),
                    ValueType::Decimal,
                )
                .with_precision(Some(precision), Some(scale))
            }
            ValueType::String => self.string_mapping(info),
            ValueType::Bytes => {
                let size = info
                    .size
                    .or(if info.is_key_or_index { Some(KEY_ANSI_LENGTH) } else { None })
                    .filter(|len| *len > 0 && *len <= MAX_ANSI_LENGTH);
                let store_type = match size {
                    Some(len) => format!("varbinary({})", len),
                    None => "varbinary(max)".to_string(),
                };
                RelationalTypeMapping::new(store_type, ValueType::Bytes).with_size(size)
            }
            ValueType::Guid => RelationalTypeMapping::new("uniqueidentifier", ValueType::Guid),
            ValueType::Date => RelationalTypeMapping::new("date", ValueType::Date),
            ValueType::Time => RelationalTypeMapping::new("time", ValueType::Time),
            ValueType::DateTime => RelationalTypeMapping::new("datetime2", ValueType::DateTime),
            ValueType::DateTimeOffset => {
                RelationalTypeMapping::new("datetimeoffset", ValueType::DateTimeOffset)
            }
            _ => return None,
        };
        Some(mapping)
    }

    fn for_store_type(&self, info: &TypeMappingInfo, store_type: &str) -> Option<RelationalTypeMapping> {
        let (base, _, _) = parse_store_type(store_type);
        let base = base.to_ascii_lowercase();
        let natural = match base.as_str() {
            "bit" => ValueType::Bool,
            "tinyint" | "smallint" => ValueType::Int16,
            "int" => ValueType::Int32,
            "bigint" => ValueType::Int64,
            "real" => ValueType::Float32,
            "float" => ValueType::Float64,
            "decimal" | "numeric" | "money" | "smallmoney" => ValueType::Decimal,
            "nvarchar" | "nchar" | "ntext" | "varchar" | "char" | "text" => ValueType::String,
            "varbinary" | "binary" | "image" | "rowversion" => ValueType::Bytes,
            "uniqueidentifier" => ValueType::Guid,
            "date" => ValueType::Date,
            "time" => ValueType::Time,
            "datetime" | "datetime2" | "smalldatetime" => ValueType::DateTime,
            "datetimeoffset" => ValueType::DateTimeOffset,
            _ => return None,
        };

        if let Some(requested) = &info.value_type {
            if *requested != natural {
                return None;
            }
        }

        let unicode = base.starts_with('n');
        let fixed = matches!(base.as_str(), "nchar" | "char" | "binary");
        Some(
            RelationalTypeMapping::new(store_type, natural)
                .with_size(info.size)
                .with_precision(info.precision, info.scale)
                .unicode(unicode)
                .fixed_length(fixed),
        )
    }
}

impl super::ProviderTypeMappings for MssqlTypeMappings {
    fn provider_name(&self) -> &str {
        "mssql"
    }

    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<RelationalTypeMapping> {
        match (&info.store_type_name, &info.value_type) {
            (Some(store_type), _) => self.for_store_type(info, store_type),
            (None, Some(value_type)) => self.for_value_type(info, value_type),
            (None, None) => None,
        }
    }
}
