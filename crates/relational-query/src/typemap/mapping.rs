//! Store type mappings and the facets used to look them up.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::core::identifier::escape_string_literal;
use crate::core::types::ValueType;
use crate::core::value::SqlValue;

/// Conversion applied between the logical value and the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueConverter {
    /// `true`/`false` stored as `1`/`0`.
    BoolToNumber,
    /// GUID stored as its canonical hyphenated string.
    GuidToString,
    /// Number stored as its decimal string form.
    NumberToString,
}

impl ValueConverter {
    /// Convert a logical value into its stored form.
    pub fn to_provider(&self, value: &SqlValue) -> SqlValue {
        match (self, value) {
            (ValueConverter::BoolToNumber, SqlValue::Bool(b)) => SqlValue::I32(i32::from(*b)),
            (ValueConverter::GuidToString, SqlValue::Uuid(u)) => {
                SqlValue::Text(u.hyphenated().to_string())
            }
            (ValueConverter::NumberToString, v) => match v {
                SqlValue::I16(n) => SqlValue::Text(n.to_string()),
                SqlValue::I32(n) => SqlValue::Text(n.to_string()),
                SqlValue::I64(n) => SqlValue::Text(n.to_string()),
                SqlValue::Decimal(d) => SqlValue::Text(d.to_string()),
                SqlValue::F64(f) => SqlValue::Text(f.to_string()),
                other => other.clone(),
            },
            (_, other) => other.clone(),
        }
    }
}

/// A resolved mapping from a logical type to a concrete store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationalTypeMapping {
    /// Full store type, e.g. `nvarchar(100)`.
    pub store_type: String,
    /// Store type without facets, e.g. `nvarchar`.
    pub store_type_name_base: String,
    /// Logical type this mapping reads and writes.
    pub value_type: ValueType,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub is_unicode: bool,
    pub is_fixed_length: bool,
    /// Conversion between the logical and stored representation.
    pub converter: Option<ValueConverter>,
}

impl RelationalTypeMapping {
    /// Mapping with no facets.
    pub fn new(store_type: impl Into<String>, value_type: ValueType) -> Self {
        let store_type = store_type.into();
        let (base, _, _) = parse_store_type(&store_type);
        Self {
            store_type_name_base: base,
            store_type,
            value_type,
            size: None,
            precision: None,
            scale: None,
            is_unicode: false,
            is_fixed_length: false,
            converter: None,
        }
    }

    /// Set the size facet.
    pub fn with_size(mut self, size: Option<u32>) -> Self {
        self.size = size;
        self
    }

    /// Set precision and scale facets.
    pub fn with_precision(mut self, precision: Option<u32>, scale: Option<u32>) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Mark the mapping as unicode.
    pub fn unicode(mut self, is_unicode: bool) -> Self {
        self.is_unicode = is_unicode;
        self
    }

    /// Mark the mapping as fixed length.
    pub fn fixed_length(mut self, is_fixed_length: bool) -> Self {
        self.is_fixed_length = is_fixed_length;
        self
    }

    /// Attach a value converter.
    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Convert a logical value to the value sent to the database.
    pub fn to_provider_value(&self, value: &SqlValue) -> SqlValue {
        match &self.converter {
            Some(converter) => converter.to_provider(value),
            None => value.clone(),
        }
    }

    /// Render a value as an inline SQL literal for this store type.
    pub fn generate_sql_literal(&self, value: &SqlValue) -> String {
        let value = self.to_provider_value(value);
        let base = self.store_type_name_base.to_ascii_lowercase();

        match &value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => match base.as_str() {
                "bit" => format!("CAST({} AS bit)", i32::from(*b)),
                _ => if *b { "TRUE" } else { "FALSE" }.to_string(),
            },
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => format_float(f64::from(*v)),
            SqlValue::F64(v) => format_float(*v),
            SqlValue::Decimal(d) => d.to_string(),
            SqlValue::Text(s) => {
                let prefix = if self.is_unicode && base.starts_with('n') {
                    "N"
                } else {
                    ""
                };
                format!("{}'{}'", prefix, escape_string_literal(s))
            }
            SqlValue::Bytes(bytes) => {
                let mut hex = String::with_capacity(bytes.len() * 2);
                for b in bytes {
                    let _ = write!(hex, "{:02X}", b);
                }
                if base == "bytea" {
                    format!("'\\x{}'::bytea", hex)
                } else {
                    format!("0x{}", hex)
                }
            }
            SqlValue::Uuid(u) => match base.as_str() {
                "uuid" => format!("'{}'::uuid", u.hyphenated()),
                _ => format!("'{}'", u.hyphenated()),
            },
            SqlValue::DateTime(dt) => match base.as_str() {
                "timestamp" | "timestamptz" => {
                    format!("TIMESTAMP '{}'", dt.format("%Y-%m-%d %H:%M:%S%.f"))
                }
                _ => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.7f")),
            },
            SqlValue::DateTimeOffset(dt) => match base.as_str() {
                "timestamptz" => format!("TIMESTAMPTZ '{}'", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
                _ => format!("'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.7f%:z")),
            },
            SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            SqlValue::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{:E}", v)
    }
}

/// Split a store type name into its base name and facets.
///
/// `nvarchar(100)` → (`nvarchar`, Some(100), None);
/// `decimal(18,2)` → (`decimal`, Some(18), Some(2));
/// `nvarchar(max)` → (`nvarchar`, None, None).
pub fn parse_store_type(store_type: &str) -> (String, Option<u32>, Option<u32>) {
    let trimmed = store_type.trim();
    let Some(open) = trimmed.find('(') else {
        return (trimmed.to_string(), None, None);
    };
    let base = trimmed[..open].trim().to_string();
    let inner = trimmed[open + 1..].trim_end_matches(')');
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u32>().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (base, first, second)
}

/// Facets used to look up a type mapping.
///
/// Either a logical type, an explicit store type name, or both must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMappingInfo {
    pub value_type: Option<ValueType>,
    pub store_type_name: Option<String>,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub is_unicode: Option<bool>,
    pub is_fixed_length: Option<bool>,
    /// Key and index columns get bounded default sizes.
    pub is_key_or_index: bool,
}

impl TypeMappingInfo {
    /// Lookup by logical type alone.
    pub fn for_type(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    /// Lookup by explicit store type name.
    pub fn for_store_type(store_type_name: impl Into<String>) -> Self {
        let store_type_name = store_type_name.into();
        let (_, first, second) = parse_store_type(&store_type_name);
        Self {
            store_type_name: Some(store_type_name),
            size: if second.is_none() { first } else { None },
            precision: if second.is_some() { first } else { None },
            scale: second,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: Option<u32>) -> Self {
        self.size = size;
        self
    }

    pub fn with_precision(mut self, precision: Option<u32>, scale: Option<u32>) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_unicode(mut self, is_unicode: Option<bool>) -> Self {
        self.is_unicode = is_unicode;
        self
    }

    pub fn with_fixed_length(mut self, is_fixed_length: Option<bool>) -> Self {
        self.is_fixed_length = is_fixed_length;
        self
    }

    pub fn with_key_or_index(mut self, is_key_or_index: bool) -> Self {
        self.is_key_or_index = is_key_or_index;
        self
    }

    /// Attach a logical type to a store type lookup.
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Base store type name, lowercased, if an explicit store type was given.
    pub fn store_type_name_base(&self) -> Option<String> {
        self.store_type_name
            .as_deref()
            .map(|s| parse_store_type(s).0.to_ascii_lowercase())
    }
}
