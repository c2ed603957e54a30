//! Construction of SQL expression nodes with type mapping inference.
//!
//! Columns arrive mapped from the model; constants and parameters do not.
//! The factory gives them the mapping of whatever they are compared with or
//! combined with, falling back to the provider's default mapping for their
//! logical type, so that literals and parameters end up with the same store
//! type as the column on the other side.

use std::sync::Arc;

use crate::core::traits::{BuiltinFunction, Dialect};
use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::{QueryError, Result};
use crate::expressions::{
    BinaryOperator, CaseWhenClause, ExpressionKind, SqlExpr, SqlFunctionExpression,
    UnaryOperator,
};
use crate::storage::model::{EntityType, Property};
use crate::typemap::{RelationalTypeMapping, TypeMappingSource};

type Mapping = Option<Arc<RelationalTypeMapping>>;

/// Builds mapped SQL expression nodes for one provider.
pub struct SqlExpressionFactory {
    dialect: Arc<dyn Dialect>,
    type_mapping_source: Arc<dyn TypeMappingSource>,
}

impl SqlExpressionFactory {
    pub fn new(dialect: Arc<dyn Dialect>, type_mapping_source: Arc<dyn TypeMappingSource>) -> Self {
        Self {
            dialect,
            type_mapping_source,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn type_mapping_source(&self) -> &dyn TypeMappingSource {
        self.type_mapping_source.as_ref()
    }

    /// Default mapping for a logical type.
    pub fn find_mapping(&self, value_type: &ValueType) -> Mapping {
        if !value_type.is_scalar() {
            return None;
        }
        self.type_mapping_source.find_mapping_for_type(value_type)
    }

    fn bool_mapping(&self) -> Mapping {
        self.find_mapping(&ValueType::Bool)
    }

    /// Give an unmapped node the default mapping of its logical type.
    pub fn apply_default_type_mapping(&self, expr: &SqlExpr) -> SqlExpr {
        if expr.type_mapping().is_some() {
            return expr.clone();
        }
        let mapping = self.find_mapping(expr.value_type());
        self.apply_type_mapping(expr, mapping)
    }

    /// Give an unmapped node (and its unmapped operands) `mapping`.
    ///
    /// Nodes that already carry a mapping are returned unchanged.
    pub fn apply_type_mapping(&self, expr: &SqlExpr, mapping: Mapping) -> SqlExpr {
        if expr.type_mapping().is_some() || mapping.is_none() {
            return expr.clone();
        }

        match expr.kind() {
            ExpressionKind::Binary(b) if b.operator.is_arithmetic() => SqlExpr::binary(
                b.operator,
                self.apply_type_mapping(&b.left, mapping.clone()),
                self.apply_type_mapping(&b.right, mapping.clone()),
                expr.value_type().clone(),
                mapping,
            ),
            ExpressionKind::Unary(u) if u.operator == UnaryOperator::Negate => SqlExpr::unary(
                u.operator,
                self.apply_type_mapping(&u.operand, mapping.clone()),
                expr.value_type().clone(),
                mapping,
            ),
            ExpressionKind::Case(c) => SqlExpr::case(
                c.operand.clone(),
                c.when_clauses
                    .iter()
                    .map(|w| CaseWhenClause {
                        test: w.test.clone(),
                        result: self.apply_type_mapping(&w.result, mapping.clone()),
                    })
                    .collect(),
                c.else_result
                    .as_ref()
                    .map(|e| self.apply_type_mapping(e, mapping.clone())),
                expr.value_type().clone(),
                mapping,
            ),
            _ => expr.with_type_mapping(mapping),
        }
    }

    /// Mapping shared by two operands: the first one already mapped, else
    /// the default for the first non-object logical type.
    fn infer_mapping(&self, left: &SqlExpr, right: &SqlExpr) -> Mapping {
        left.type_mapping()
            .or_else(|| right.type_mapping())
            .cloned()
            .or_else(|| {
                let value_type = if *left.value_type() == ValueType::Object {
                    right.value_type()
                } else {
                    left.value_type()
                };
                self.find_mapping(value_type)
            })
    }

    pub fn constant(&self, value: SqlValue, value_type: ValueType) -> SqlExpr {
        SqlExpr::constant(value, value_type, None)
    }

    pub fn parameter(&self, name: &str, value_type: ValueType, is_nullable: bool) -> SqlExpr {
        SqlExpr::parameter(name, value_type, None, is_nullable)
    }

    /// Column of a mapped property.
    pub fn column(&self, entity: &EntityType, property: &Property, table_alias: &str) -> Result<SqlExpr> {
        let mapping = self
            .type_mapping_source
            .find_mapping_for_property(entity, property)
            .ok_or_else(|| {
                QueryError::translation(
                    format!("property '{}.{}'", entity.name, property.name),
                    format!(
                        "no {} type mapping for {}",
                        self.dialect.name(),
                        property.value_type
                    ),
                )
            })?;
        Ok(SqlExpr::column(
            property.column(),
            table_alias,
            property.value_type.clone(),
            Some(mapping),
            property.is_nullable,
        ))
    }

    /// Binary operation with operand mappings inferred from each other.
    ///
    /// Comparing with a `NULL` constant becomes `IS NULL` / `IS NOT NULL`.
    pub fn binary(&self, operator: BinaryOperator, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr> {
        if matches!(operator, BinaryOperator::Equal | BinaryOperator::NotEqual) {
            let null_check = if is_null_constant(&right) {
                Some(left.clone())
            } else if is_null_constant(&left) {
                Some(right.clone())
            } else {
                None
            };
            if let Some(operand) = null_check {
                return Ok(if operator == BinaryOperator::Equal {
                    self.is_null(operand)
                } else {
                    self.is_not_null(operand)
                });
            }
        }

        if operator.is_logical() {
            if *left.value_type() != ValueType::Bool || *right.value_type() != ValueType::Bool {
                return Err(QueryError::translation(
                    format!("operator {}", operator.symbol()),
                    format!(
                        "operands must be bool, got {} and {}",
                        left.value_type(),
                        right.value_type()
                    ),
                ));
            }
            return Ok(SqlExpr::binary(
                operator,
                self.apply_default_type_mapping(&left),
                self.apply_default_type_mapping(&right),
                ValueType::Bool,
                self.bool_mapping(),
            ));
        }

        let mapping = self.infer_mapping(&left, &right);
        let left = self.apply_type_mapping(&left, mapping.clone());
        let right = self.apply_type_mapping(&right, mapping.clone());

        if operator.is_comparison() {
            return Ok(SqlExpr::binary(
                operator,
                left,
                right,
                ValueType::Bool,
                self.bool_mapping(),
            ));
        }

        let value_type = if *left.value_type() == ValueType::Object {
            right.value_type().clone()
        } else {
            left.value_type().clone()
        };
        Ok(SqlExpr::binary(operator, left, right, value_type, mapping))
    }

    pub fn equal(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr> {
        self.binary(BinaryOperator::Equal, left, right)
    }

    pub fn and_also(&self, left: SqlExpr, right: SqlExpr) -> Result<SqlExpr> {
        self.binary(BinaryOperator::AndAlso, left, right)
    }

    pub fn not(&self, operand: SqlExpr) -> SqlExpr {
        SqlExpr::unary(
            UnaryOperator::Not,
            self.apply_default_type_mapping(&operand),
            ValueType::Bool,
            self.bool_mapping(),
        )
    }

    pub fn negate(&self, operand: SqlExpr) -> SqlExpr {
        let operand = self.apply_default_type_mapping(&operand);
        let value_type = operand.value_type().clone();
        let mapping = operand.type_mapping().cloned();
        SqlExpr::unary(UnaryOperator::Negate, operand, value_type, mapping)
    }

    pub fn is_null(&self, operand: SqlExpr) -> SqlExpr {
        SqlExpr::unary(
            UnaryOperator::IsNull,
            self.apply_default_type_mapping(&operand),
            ValueType::Bool,
            self.bool_mapping(),
        )
    }

    pub fn is_not_null(&self, operand: SqlExpr) -> SqlExpr {
        SqlExpr::unary(
            UnaryOperator::IsNotNull,
            self.apply_default_type_mapping(&operand),
            ValueType::Bool,
            self.bool_mapping(),
        )
    }

    /// `match LIKE pattern [ESCAPE escape]`; the pattern takes the mapping
    /// of the matched value.
    pub fn like(&self, match_expression: SqlExpr, pattern: SqlExpr, escape_char: Option<SqlExpr>) -> SqlExpr {
        let mapping = self.infer_mapping(&match_expression, &pattern);
        SqlExpr::like(
            self.apply_type_mapping(&match_expression, mapping.clone()),
            self.apply_type_mapping(&pattern, mapping.clone()),
            escape_char.map(|e| self.apply_type_mapping(&e, mapping)),
            self.bool_mapping(),
        )
    }

    /// Searched `CASE`; the result mapping comes from the first mapped result.
    pub fn case(&self, when_clauses: Vec<CaseWhenClause>, else_result: Option<SqlExpr>) -> Result<SqlExpr> {
        let Some(first) = when_clauses.first() else {
            return Err(QueryError::translation("CASE", "at least one WHEN clause is required"));
        };
        let value_type = first.result.value_type().clone();
        let mapping = when_clauses
            .iter()
            .map(|w| &w.result)
            .chain(else_result.iter())
            .find_map(|r| r.type_mapping().cloned())
            .or_else(|| self.find_mapping(&value_type));

        let when_clauses = when_clauses
            .into_iter()
            .map(|w| CaseWhenClause {
                test: self.apply_default_type_mapping(&w.test),
                result: self.apply_type_mapping(&w.result, mapping.clone()),
            })
            .collect();
        let else_result = else_result.map(|e| self.apply_type_mapping(&e, mapping.clone()));

        Ok(SqlExpr::case(None, when_clauses, else_result, value_type, mapping))
    }

    /// Call of a dialect built-in. Arguments get their default mappings; the
    /// result gets `mapping`, or the default mapping of `value_type`.
    ///
    /// Every argument propagates nullability.
    pub fn builtin(
        &self,
        function: BuiltinFunction,
        arguments: Vec<SqlExpr>,
        value_type: ValueType,
        mapping: Mapping,
    ) -> Result<SqlExpr> {
        let shape = self.dialect.function(function);
        let mapping = mapping.or_else(|| self.find_mapping(&value_type));
        let function = if shape.niladic {
            SqlFunctionExpression::niladic(shape.name, false)
        } else {
            let flags = vec![true; arguments.len()];
            let is_nullable = !arguments.is_empty();
            let arguments = arguments
                .iter()
                .map(|a| self.apply_default_type_mapping(a))
                .collect();
            SqlFunctionExpression::new(shape.name, arguments, is_nullable, flags)?
        };
        Ok(SqlExpr::function(function, value_type, mapping))
    }

    /// Aggregate over a `*` argument, such as `COUNT(*)`.
    pub fn aggregate_star(&self, function: BuiltinFunction, value_type: ValueType) -> Result<SqlExpr> {
        let shape = self.dialect.function(function);
        let mapping = self.find_mapping(&value_type);
        let function = SqlFunctionExpression::new(shape.name, vec![SqlExpr::fragment("*")], false, vec![false])?;
        Ok(SqlExpr::function(function, value_type, mapping))
    }
}

impl std::fmt::Debug for SqlExpressionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExpressionFactory")
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

fn is_null_constant(expr: &SqlExpr) -> bool {
    matches!(expr.kind(), ExpressionKind::Constant(c) if c.value.is_null())
}
