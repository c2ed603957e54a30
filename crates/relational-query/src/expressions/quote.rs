//! Builder form of expression trees for cached and precompiled plans.
//!
//! [`SqlExpr::quote`] turns a tree into plain data that serializes with
//! serde; [`QuotedExpression::evaluate`] rebuilds an equal tree. Query roots
//! are always quoted detached from their provider, and function nodes go
//! through their validating constructor again on the way back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::typemap::{RelationalTypeMapping, TypeMappingSource};

use super::{
    BinaryOperator, CaseExpression, CaseWhenClause, ColumnExpression, ConstantExpression,
    ExpressionKind, FromSqlExpression, FunctionArguments, LikeExpression, OrderingExpression,
    ParameterExpression, ProjectionExpression, RelationalGroupByShaperExpression,
    SelectExpression, SqlBinaryExpression, SqlExpr, SqlFragmentExpression,
    SqlFunctionExpression, SqlQueryRootExpression, SqlUnaryExpression, TableExpression,
    UnaryOperator,
};

/// Serializable construction form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedExpression {
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_mapping: Option<RelationalTypeMapping>,
    pub node: QuotedNode,
}

type Quoted = Box<QuotedExpression>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuotedNode {
    Column {
        name: String,
        table_alias: String,
        is_nullable: bool,
    },
    Constant {
        value: SqlValue,
    },
    Parameter {
        name: String,
        is_nullable: bool,
    },
    Binary {
        operator: BinaryOperator,
        left: Quoted,
        right: Quoted,
    },
    Unary {
        operator: UnaryOperator,
        operand: Quoted,
    },
    Like {
        match_expression: Quoted,
        pattern: Quoted,
        escape_char: Option<Quoted>,
    },
    Case {
        operand: Option<Quoted>,
        when_clauses: Vec<(QuotedExpression, QuotedExpression)>,
        else_result: Option<Quoted>,
    },
    Function {
        instance: Option<Quoted>,
        schema: Option<String>,
        name: String,
        /// `None` for a niladic call.
        arguments: Option<Vec<QuotedExpression>>,
        is_built_in: bool,
        is_nullable: bool,
        instance_propagates_nullability: Option<bool>,
        arguments_propagate_nullability: Option<Vec<bool>>,
    },
    Fragment {
        sql: String,
    },
    QueryRoot {
        element_type: String,
        sql: String,
        argument: Quoted,
    },
    GroupByShaper {
        key_selector: Quoted,
        element_selector: Quoted,
        grouping_enumerable: Quoted,
    },
    Select {
        alias: Option<String>,
        is_distinct: bool,
        projection: Vec<QuotedExpression>,
        tables: Vec<QuotedExpression>,
        predicate: Option<Quoted>,
        group_by: Vec<QuotedExpression>,
        having: Option<Quoted>,
        orderings: Vec<QuotedExpression>,
        limit: Option<Quoted>,
        offset: Option<Quoted>,
    },
    Table {
        name: String,
        schema: Option<String>,
        alias: String,
    },
    FromSql {
        sql: String,
        argument: Quoted,
        alias: String,
    },
    Projection {
        expression: Quoted,
        alias: String,
    },
    Ordering {
        expression: Quoted,
        ascending: bool,
    },
}

fn boxed(expr: &SqlExpr) -> Quoted {
    Box::new(expr.quote())
}

fn boxed_opt(expr: &Option<SqlExpr>) -> Option<Quoted> {
    expr.as_ref().map(boxed)
}

fn list(exprs: &[SqlExpr]) -> Vec<QuotedExpression> {
    exprs.iter().map(SqlExpr::quote).collect()
}

impl SqlExpr {
    /// Construction form of this tree.
    pub fn quote(&self) -> QuotedExpression {
        let node = match self.kind() {
            ExpressionKind::Column(c) => QuotedNode::Column {
                name: c.name.clone(),
                table_alias: c.table_alias.clone(),
                is_nullable: c.is_nullable,
            },
            ExpressionKind::Constant(c) => QuotedNode::Constant {
                value: c.value.clone(),
            },
            ExpressionKind::Parameter(p) => QuotedNode::Parameter {
                name: p.name.clone(),
                is_nullable: p.is_nullable,
            },
            ExpressionKind::Binary(b) => QuotedNode::Binary {
                operator: b.operator,
                left: boxed(&b.left),
                right: boxed(&b.right),
            },
            ExpressionKind::Unary(u) => QuotedNode::Unary {
                operator: u.operator,
                operand: boxed(&u.operand),
            },
            ExpressionKind::Like(l) => QuotedNode::Like {
                match_expression: boxed(&l.match_expression),
                pattern: boxed(&l.pattern),
                escape_char: boxed_opt(&l.escape_char),
            },
            ExpressionKind::Case(c) => QuotedNode::Case {
                operand: boxed_opt(&c.operand),
                when_clauses: c
                    .when_clauses
                    .iter()
                    .map(|w| (w.test.quote(), w.result.quote()))
                    .collect(),
                else_result: boxed_opt(&c.else_result),
            },
            ExpressionKind::Function(f) => QuotedNode::Function {
                instance: f.instance().map(boxed),
                schema: f.schema().map(str::to_string),
                name: f.name().to_string(),
                arguments: match f.arguments() {
                    FunctionArguments::Niladic => None,
                    FunctionArguments::WithArguments(args) => Some(list(args)),
                },
                is_built_in: f.is_built_in(),
                is_nullable: f.is_nullable(),
                instance_propagates_nullability: f.instance_propagates_nullability(),
                arguments_propagate_nullability: f
                    .arguments_propagate_nullability()
                    .map(<[bool]>::to_vec),
            },
            ExpressionKind::Fragment(f) => QuotedNode::Fragment { sql: f.sql.clone() },
            ExpressionKind::QueryRoot(r) => QuotedNode::QueryRoot {
                element_type: r.element_type.clone(),
                sql: r.sql.clone(),
                argument: boxed(&r.argument),
            },
            ExpressionKind::GroupByShaper(g) => QuotedNode::GroupByShaper {
                key_selector: boxed(&g.key_selector),
                element_selector: boxed(&g.element_selector),
                grouping_enumerable: boxed(&g.grouping_enumerable),
            },
            ExpressionKind::Select(s) => QuotedNode::Select {
                alias: s.alias.clone(),
                is_distinct: s.is_distinct,
                projection: list(&s.projection),
                tables: list(&s.tables),
                predicate: boxed_opt(&s.predicate),
                group_by: list(&s.group_by),
                having: boxed_opt(&s.having),
                orderings: list(&s.orderings),
                limit: boxed_opt(&s.limit),
                offset: boxed_opt(&s.offset),
            },
            ExpressionKind::Table(t) => QuotedNode::Table {
                name: t.name.clone(),
                schema: t.schema.clone(),
                alias: t.alias.clone(),
            },
            ExpressionKind::FromSql(f) => QuotedNode::FromSql {
                sql: f.sql.clone(),
                argument: boxed(&f.argument),
                alias: f.alias.clone(),
            },
            ExpressionKind::Projection(p) => QuotedNode::Projection {
                expression: boxed(&p.expression),
                alias: p.alias.clone(),
            },
            ExpressionKind::Ordering(o) => QuotedNode::Ordering {
                expression: boxed(&o.expression),
                ascending: o.ascending,
            },
        };

        QuotedExpression {
            value_type: self.value_type().clone(),
            type_mapping: self.type_mapping().map(|m| (**m).clone()),
            node,
        }
    }
}

impl QuotedExpression {
    /// Rebuild the tree with the quoted type mappings.
    pub fn evaluate(&self) -> Result<SqlExpr> {
        self.rebuild(None)
    }

    /// Rebuild the tree, resolving each type mapping again by store type
    /// against `source`. Store types the source does not know keep the
    /// quoted mapping.
    pub fn evaluate_with(&self, source: &dyn TypeMappingSource) -> Result<SqlExpr> {
        self.rebuild(Some(source))
    }

    fn rebuild(&self, source: Option<&dyn TypeMappingSource>) -> Result<SqlExpr> {
        let one = |q: &QuotedExpression| q.rebuild(source);
        let opt = |q: &Option<Quoted>| q.as_deref().map(|q| q.rebuild(source)).transpose();
        let many = |qs: &[QuotedExpression]| {
            qs.iter()
                .map(|q| q.rebuild(source))
                .collect::<Result<Vec<_>>>()
        };

        let kind = match &self.node {
            QuotedNode::Column {
                name,
                table_alias,
                is_nullable,
            } => ExpressionKind::Column(ColumnExpression {
                name: name.clone(),
                table_alias: table_alias.clone(),
                is_nullable: *is_nullable,
            }),
            QuotedNode::Constant { value } => ExpressionKind::Constant(ConstantExpression {
                value: value.clone(),
            }),
            QuotedNode::Parameter { name, is_nullable } => {
                ExpressionKind::Parameter(ParameterExpression {
                    name: name.clone(),
                    is_nullable: *is_nullable,
                })
            }
            QuotedNode::Binary {
                operator,
                left,
                right,
            } => ExpressionKind::Binary(SqlBinaryExpression {
                operator: *operator,
                left: one(left)?,
                right: one(right)?,
            }),
            QuotedNode::Unary { operator, operand } => {
                ExpressionKind::Unary(SqlUnaryExpression {
                    operator: *operator,
                    operand: one(operand)?,
                })
            }
            QuotedNode::Like {
                match_expression,
                pattern,
                escape_char,
            } => ExpressionKind::Like(LikeExpression {
                match_expression: one(match_expression)?,
                pattern: one(pattern)?,
                escape_char: opt(escape_char)?,
            }),
            QuotedNode::Case {
                operand,
                when_clauses,
                else_result,
            } => ExpressionKind::Case(CaseExpression {
                operand: opt(operand)?,
                when_clauses: when_clauses
                    .iter()
                    .map(|(test, result)| {
                        Ok(CaseWhenClause {
                            test: one(test)?,
                            result: one(result)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                else_result: opt(else_result)?,
            }),
            QuotedNode::Function {
                instance,
                schema,
                name,
                arguments,
                is_built_in,
                is_nullable,
                instance_propagates_nullability,
                arguments_propagate_nullability,
            } => {
                let arguments = match arguments {
                    None => FunctionArguments::Niladic,
                    Some(args) => FunctionArguments::WithArguments(many(args)?),
                };
                ExpressionKind::Function(SqlFunctionExpression::from_parts(
                    opt(instance)?,
                    schema.clone(),
                    name.clone(),
                    arguments,
                    *is_built_in,
                    *is_nullable,
                    *instance_propagates_nullability,
                    arguments_propagate_nullability.clone(),
                )?)
            }
            QuotedNode::Fragment { sql } => {
                ExpressionKind::Fragment(SqlFragmentExpression::new(sql.clone()))
            }
            QuotedNode::QueryRoot {
                element_type,
                sql,
                argument,
            } => ExpressionKind::QueryRoot(SqlQueryRootExpression::new(
                element_type.clone(),
                sql.clone(),
                one(argument)?,
                None,
            )),
            QuotedNode::GroupByShaper {
                key_selector,
                element_selector,
                grouping_enumerable,
            } => ExpressionKind::GroupByShaper(RelationalGroupByShaperExpression::new(
                one(key_selector)?,
                one(element_selector)?,
                one(grouping_enumerable)?,
            )),
            QuotedNode::Select {
                alias,
                is_distinct,
                projection,
                tables,
                predicate,
                group_by,
                having,
                orderings,
                limit,
                offset,
            } => ExpressionKind::Select(SelectExpression {
                alias: alias.clone(),
                is_distinct: *is_distinct,
                projection: many(projection)?,
                tables: many(tables)?,
                predicate: opt(predicate)?,
                group_by: many(group_by)?,
                having: opt(having)?,
                orderings: many(orderings)?,
                limit: opt(limit)?,
                offset: opt(offset)?,
            }),
            QuotedNode::Table {
                name,
                schema,
                alias,
            } => ExpressionKind::Table(TableExpression {
                name: name.clone(),
                schema: schema.clone(),
                alias: alias.clone(),
            }),
            QuotedNode::FromSql {
                sql,
                argument,
                alias,
            } => ExpressionKind::FromSql(FromSqlExpression {
                sql: sql.clone(),
                argument: one(argument)?,
                alias: alias.clone(),
            }),
            QuotedNode::Projection { expression, alias } => {
                ExpressionKind::Projection(ProjectionExpression {
                    expression: one(expression)?,
                    alias: alias.clone(),
                })
            }
            QuotedNode::Ordering {
                expression,
                ascending,
            } => ExpressionKind::Ordering(OrderingExpression {
                expression: one(expression)?,
                ascending: *ascending,
            }),
        };

        let type_mapping = self.type_mapping.as_ref().map(|quoted| {
            source
                .and_then(|s| s.find_mapping_for_store_type(&quoted.store_type))
                .filter(|resolved| resolved.value_type == quoted.value_type)
                .unwrap_or_else(|| Arc::new(quoted.clone()))
        });

        Ok(SqlExpr::new(kind, self.value_type.clone(), type_mapping))
    }
}
