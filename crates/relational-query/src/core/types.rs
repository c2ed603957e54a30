//! Logical (runtime) types of values produced by expressions.
//!
//! A [`ValueType`] is what an expression evaluates to before any store type
//! is chosen. The type mapping source turns it, plus column facets, into a
//! concrete [`RelationalTypeMapping`](crate::typemap::RelationalTypeMapping).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical type of a value flowing through a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    String,
    Bytes,
    Guid,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    /// Untyped value (raw SQL fragments, `*` projections).
    Object,
    /// A mapped entity, by entity type name.
    Entity(String),
    /// A queryable sequence of elements.
    Sequence(Box<ValueType>),
    /// Result of a GROUP BY: a key plus an enumerable of elements.
    Grouping {
        key: Box<ValueType>,
        element: Box<ValueType>,
    },
}

impl ValueType {
    /// Sequence of the given element type.
    pub fn sequence_of(element: ValueType) -> Self {
        ValueType::Sequence(Box::new(element))
    }

    /// Whether the type is an integral number.
    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::Int16 | ValueType::Int32 | ValueType::Int64)
    }

    /// Whether the type is any number.
    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                ValueType::Float32 | ValueType::Float64 | ValueType::Decimal
            )
    }

    /// Whether values of this type can be stored in a single column.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            ValueType::Object
                | ValueType::Entity(_)
                | ValueType::Sequence(_)
                | ValueType::Grouping { .. }
        )
    }

    /// Element type of a sequence or grouping, if any.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Sequence(element) => Some(element),
            ValueType::Grouping { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int16 => write!(f, "short"),
            ValueType::Int32 => write!(f, "int"),
            ValueType::Int64 => write!(f, "long"),
            ValueType::Float32 => write!(f, "float"),
            ValueType::Float64 => write!(f, "double"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::String => write!(f, "string"),
            ValueType::Bytes => write!(f, "byte[]"),
            ValueType::Guid => write!(f, "Guid"),
            ValueType::Date => write!(f, "DateOnly"),
            ValueType::Time => write!(f, "TimeOnly"),
            ValueType::DateTime => write!(f, "DateTime"),
            ValueType::DateTimeOffset => write!(f, "DateTimeOffset"),
            ValueType::Object => write!(f, "object"),
            ValueType::Entity(name) => write!(f, "{}", name),
            ValueType::Sequence(element) => write!(f, "IQueryable<{}>", element),
            ValueType::Grouping { key, element } => {
                write!(f, "IGrouping<{}, {}>", key, element)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_classification() {
        assert!(ValueType::Int32.is_integer());
        assert!(ValueType::Decimal.is_numeric());
        assert!(!ValueType::Decimal.is_integer());
        assert!(!ValueType::String.is_numeric());
    }

    #[test]
    fn test_display_nested() {
        let grouping = ValueType::Grouping {
            key: Box::new(ValueType::Int32),
            element: Box::new(ValueType::Entity("Order".into())),
        };
        assert_eq!(grouping.to_string(), "IGrouping<int, Order>");
        assert_eq!(
            ValueType::sequence_of(ValueType::String).to_string(),
            "IQueryable<string>"
        );
    }

    #[test]
    fn test_scalar() {
        assert!(ValueType::Guid.is_scalar());
        assert!(!ValueType::Entity("Blog".into()).is_scalar());
        assert_eq!(
            ValueType::sequence_of(ValueType::Int64).element_type(),
            Some(&ValueType::Int64)
        );
    }
}
