//! Logical query model: the input to translation.
//!
//! A [`LogicalQuery`] describes a query over one entity set the way a
//! language-integrated query does (filter, project, order, page, group). Its
//! lambda bodies are [`Expression`] trees whose property accesses refer to
//! the queried entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::expressions::BinaryOperator;

/// Identity of a called method or accessed member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Declaring type, e.g. `String`, `Math`, `DateTime`, `Queryable`.
    pub declaring_type: String,
    pub name: String,
}

impl MethodInfo {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    /// Whether this is `declaring_type.name`.
    pub fn is(&self, declaring_type: &str, name: &str) -> bool {
        self.declaring_type == declaring_type && self.name == name
    }
}

impl std::fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// Lambda body of a logical query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    /// Literal value; its type is inferred from the value when omitted.
    Constant {
        value: SqlValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_type: Option<ValueType>,
    },
    /// Value supplied at execution time through [`LogicalQuery::parameters`].
    Parameter { name: String, value_type: ValueType },
    /// Property of the queried entity.
    Property { name: String },
    /// Method call or member access, static when `instance` is absent.
    MethodCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance: Option<Box<Expression>>,
        method: MethodInfo,
        #[serde(default)]
        arguments: Vec<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not { operand: Box<Expression> },
    Negate { operand: Box<Expression> },
    /// `test ? if_true : if_false`.
    Conditional {
        test: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
}

impl Expression {
    pub fn constant(value: impl Into<SqlValue>) -> Self {
        Expression::Constant {
            value: value.into(),
            value_type: None,
        }
    }

    pub fn parameter(name: impl Into<String>, value_type: ValueType) -> Self {
        Expression::Parameter {
            name: name.into(),
            value_type,
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Expression::Property { name: name.into() }
    }

    pub fn call(
        instance: Option<Expression>,
        declaring_type: &str,
        name: &str,
        arguments: Vec<Expression>,
    ) -> Self {
        Expression::MethodCall {
            instance: instance.map(Box::new),
            method: MethodInfo::new(declaring_type, name),
            arguments,
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Not {
            operand: Box::new(operand),
        }
    }
}

/// Where the rows of a query come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuerySource {
    /// The mapped table of an entity type.
    Entity { entity: String },
    /// Raw SQL producing rows of an entity type. `{0}`, `{1}`, ... in the
    /// text are replaced by parameters bound to `arguments`.
    Sql {
        entity: String,
        sql: String,
        #[serde(default)]
        arguments: Vec<SqlValue>,
    },
}

impl QuerySource {
    pub fn entity_name(&self) -> &str {
        match self {
            QuerySource::Entity { entity } | QuerySource::Sql { entity, .. } => entity,
        }
    }
}

/// Projected value with its result column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExpression {
    pub alias: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expression: Expression,
    #[serde(default)]
    pub descending: bool,
}

/// Aggregate computed per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSelector {
    pub alias: String,
    /// Aggregate method (`Count`, `Sum`, ...), declared on `Enumerable`.
    pub method: String,
    /// Value aggregated over the elements; absent for `Count`.
    #[serde(default)]
    pub selector: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    pub key: Expression,
    #[serde(default = "default_key_alias")]
    pub key_alias: String,
    #[serde(default)]
    pub aggregates: Vec<AggregateSelector>,
}

fn default_key_alias() -> String {
    "Key".to_string()
}

/// A complete query over one entity set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalQuery {
    pub source: QuerySource,
    #[serde(default)]
    pub predicate: Option<Expression>,
    /// Projected values; empty projects every mapped property.
    #[serde(default)]
    pub projection: Vec<NamedExpression>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub skip: Option<Expression>,
    #[serde(default)]
    pub take: Option<Expression>,
    #[serde(default)]
    pub group_by: Option<GroupBy>,
    /// Values of the query's parameters, by name.
    #[serde(default)]
    pub parameters: BTreeMap<String, SqlValue>,
}

impl LogicalQuery {
    /// Query over every row of an entity set.
    pub fn from_entity(entity: impl Into<String>) -> Self {
        Self {
            source: QuerySource::Entity {
                entity: entity.into(),
            },
            predicate: None,
            projection: Vec::new(),
            distinct: false,
            order_by: Vec::new(),
            skip: None,
            take: None,
            group_by: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn filter(mut self, predicate: Expression) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn select(mut self, alias: impl Into<String>, expression: Expression) -> Self {
        self.projection.push(NamedExpression {
            alias: alias.into(),
            expression,
        });
        self
    }

    pub fn order_by(mut self, expression: Expression, descending: bool) -> Self {
        self.order_by.push(OrderBy {
            expression,
            descending,
        });
        self
    }

    pub fn skip(mut self, count: Expression) -> Self {
        self.skip = Some(count);
        self
    }

    pub fn take(mut self, count: Expression) -> Self {
        self.take = Some(count);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_query() {
        let json = r#"{
            "source": { "kind": "entity", "entity": "Blog" },
            "predicate": {
                "kind": "method_call",
                "instance": { "kind": "property", "name": "Title" },
                "method": { "declaring_type": "String", "name": "StartsWith" },
                "arguments": [ { "kind": "constant", "value": { "text": "A" } } ]
            },
            "take": { "kind": "constant", "value": { "i32": 10 } }
        }"#;

        let query: LogicalQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.source.entity_name(), "Blog");
        assert!(query.order_by.is_empty());
        match query.predicate.unwrap() {
            Expression::MethodCall { method, arguments, .. } => {
                assert!(method.is("String", "StartsWith"));
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn test_group_by_defaults() {
        let json = r#"{
            "key": { "kind": "property", "name": "BlogId" },
            "aggregates": [ { "alias": "Count", "method": "Count" } ]
        }"#;
        let group_by: GroupBy = serde_json::from_str(json).unwrap();
        assert_eq!(group_by.key_alias, "Key");
        assert!(group_by.aggregates[0].selector.is_none());
    }
}
