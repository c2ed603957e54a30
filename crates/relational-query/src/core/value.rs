//! SQL values carried by constants and bound parameters.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::ValueType;

/// Owned SQL value.
///
/// Constants embedded in a query and values bound to command parameters
/// both use this representation. Floating point values compare and hash
/// by bit pattern so that expression trees holding them can be used as
/// cache keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real/float4).
    F32(f32),

    /// 64-bit floating point (double precision/float8).
    F64(f64),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeOffset(DateTime<FixedOffset>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Logical type of this value, or `None` for NULL.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => ValueType::Bool,
            SqlValue::I16(_) => ValueType::Int16,
            SqlValue::I32(_) => ValueType::Int32,
            SqlValue::I64(_) => ValueType::Int64,
            SqlValue::F32(_) => ValueType::Float32,
            SqlValue::F64(_) => ValueType::Float64,
            SqlValue::Text(_) => ValueType::String,
            SqlValue::Bytes(_) => ValueType::Bytes,
            SqlValue::Uuid(_) => ValueType::Guid,
            SqlValue::Decimal(_) => ValueType::Decimal,
            SqlValue::DateTime(_) => ValueType::DateTime,
            SqlValue::DateTimeOffset(_) => ValueType::DateTimeOffset,
            SqlValue::Date(_) => ValueType::Date,
            SqlValue::Time(_) => ValueType::Time,
        })
    }

    /// String payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload widened to i64, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            SqlValue::Null => 0,
            SqlValue::Bool(_) => 1,
            SqlValue::I16(_) => 2,
            SqlValue::I32(_) => 3,
            SqlValue::I64(_) => 4,
            SqlValue::F32(_) => 5,
            SqlValue::F64(_) => 6,
            SqlValue::Text(_) => 7,
            SqlValue::Bytes(_) => 8,
            SqlValue::Uuid(_) => 9,
            SqlValue::Decimal(_) => 10,
            SqlValue::DateTime(_) => 11,
            SqlValue::DateTimeOffset(_) => 12,
            SqlValue::Date(_) => 13,
            SqlValue::Time(_) => 14,
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::I16(a), SqlValue::I16(b)) => a == b,
            (SqlValue::I32(a), SqlValue::I32(b)) => a == b,
            (SqlValue::I64(a), SqlValue::I64(b)) => a == b,
            (SqlValue::F32(a), SqlValue::F32(b)) => a.to_bits() == b.to_bits(),
            (SqlValue::F64(a), SqlValue::F64(b)) => a.to_bits() == b.to_bits(),
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            (SqlValue::Uuid(a), SqlValue::Uuid(b)) => a == b,
            (SqlValue::Decimal(a), SqlValue::Decimal(b)) => a == b,
            (SqlValue::DateTime(a), SqlValue::DateTime(b)) => a == b,
            (SqlValue::DateTimeOffset(a), SqlValue::DateTimeOffset(b)) => a == b,
            (SqlValue::Date(a), SqlValue::Date(b)) => a == b,
            (SqlValue::Time(a), SqlValue::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SqlValue {}

impl Hash for SqlValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            SqlValue::Null => {}
            SqlValue::Bool(v) => v.hash(state),
            SqlValue::I16(v) => v.hash(state),
            SqlValue::I32(v) => v.hash(state),
            SqlValue::I64(v) => v.hash(state),
            SqlValue::F32(v) => v.to_bits().hash(state),
            SqlValue::F64(v) => v.to_bits().hash(state),
            SqlValue::Text(v) => v.hash(state),
            SqlValue::Bytes(v) => v.hash(state),
            SqlValue::Uuid(v) => v.hash(state),
            SqlValue::Decimal(v) => v.hash(state),
            SqlValue::DateTime(v) => v.hash(state),
            SqlValue::DateTimeOffset(v) => v.hash(state),
            SqlValue::Date(v) => v.hash(state),
            SqlValue::Time(v) => v.hash(state),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_value_type() {
        assert_eq!(SqlValue::I32(1).value_type(), Some(ValueType::Int32));
        assert_eq!(SqlValue::from("x").value_type(), Some(ValueType::String));
        assert_eq!(SqlValue::Null.value_type(), None);
        assert!(SqlValue::Null.is_null());
    }

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(SqlValue::F64(f64::NAN), SqlValue::F64(f64::NAN));
        assert_ne!(SqlValue::F64(0.0), SqlValue::F64(-0.0));
        assert_ne!(SqlValue::I32(1), SqlValue::I64(1));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(SqlValue::from("a"));
        set.insert(SqlValue::from("a"));
        set.insert(SqlValue::I64(7));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&SqlValue::I32(5)).unwrap();
        assert_eq!(json, r#"{"i32":5}"#);
        let parsed: SqlValue = serde_json::from_str(r#"{"text":"abc"}"#).unwrap();
        assert_eq!(parsed, SqlValue::from("abc"));
        let null: SqlValue = serde_json::from_str(r#""null""#).unwrap();
        assert!(null.is_null());
    }
}
