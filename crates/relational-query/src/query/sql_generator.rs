//! SQL text generation for translated query trees.
//!
//! Walks a `SELECT` tree and writes provider SQL into a
//! [`RelationalCommandBuilder`]. Parameters are bound once per invariant
//! name, in first-use order; constants are inlined as literals of their
//! store type.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::core::traits::{Dialect, PagingStyle};
use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::{QueryError, Result};
use crate::expressions::{
    BinaryOperator, ExpressionKind, FunctionArguments, SelectExpression, SqlExpr, UnaryOperator,
};
use crate::storage::{RelationalCommand, RelationalCommandBuilder, RelationalParameter};
use crate::typemap::RelationalTypeMapping;

use super::pipeline::RAW_SQL_ARGUMENT;

pub struct QuerySqlGenerator<'a> {
    dialect: &'a dyn Dialect,
    parameter_values: &'a BTreeMap<String, SqlValue>,
    builder: RelationalCommandBuilder,
    /// Invariant name → placeholder already written.
    placeholders: HashMap<String, String>,
}

impl<'a> QuerySqlGenerator<'a> {
    pub fn new(dialect: &'a dyn Dialect, parameter_values: &'a BTreeMap<String, SqlValue>) -> Self {
        Self {
            dialect,
            parameter_values,
            builder: RelationalCommandBuilder::new(),
            placeholders: HashMap::new(),
        }
    }

    /// Generate the command for a top-level `SELECT`.
    pub fn generate(mut self, expression: &SqlExpr) -> Result<RelationalCommand> {
        let ExpressionKind::Select(select) = expression.kind() else {
            return Err(QueryError::Unsupported(format!(
                "cannot generate a command from {}; expected a SelectExpression",
                expression.kind().name()
            )));
        };
        self.generate_select(select)?;

        let command = self.builder.build();
        debug!(
            "Generated {} command with {} parameter(s):\n{}",
            self.dialect.name(),
            command.parameters.len(),
            command.command_text
        );
        Ok(command)
    }

    fn visit(&mut self, expression: &SqlExpr) -> Result<()> {
        match expression.kind() {
            ExpressionKind::Column(c) => {
                let text = format!(
                    "{}.{}",
                    self.dialect.quote_ident(&c.table_alias),
                    self.dialect.quote_ident(&c.name)
                );
                self.builder.append(text);
            }
            ExpressionKind::Constant(c) => {
                let literal = match expression.type_mapping() {
                    Some(mapping) => mapping.generate_sql_literal(&c.value),
                    None => RelationalTypeMapping::new("", expression.value_type().clone())
                        .generate_sql_literal(&c.value),
                };
                self.builder.append(literal);
            }
            ExpressionKind::Parameter(p) => {
                let value = self.parameter_value(&p.name)?;
                let (value, store_type) = match expression.type_mapping() {
                    Some(mapping) => (mapping.to_provider_value(&value), Some(mapping.store_type.clone())),
                    None => (value, None),
                };
                let placeholder = self.bind(&p.name, value, store_type, p.is_nullable)?;
                self.builder.append(placeholder);
            }
            ExpressionKind::Binary(b) => {
                let operator = if b.operator == BinaryOperator::Add && *expression.value_type() == ValueType::String {
                    self.dialect.concat_operator()
                } else {
                    b.operator.sql()
                };
                self.visit_operand(b.operator, &b.left, false)?;
                self.builder.append(format!(" {} ", operator));
                self.visit_operand(b.operator, &b.right, true)?;
            }
            ExpressionKind::Unary(u) => match u.operator {
                UnaryOperator::Not => {
                    self.builder.append("NOT (");
                    self.visit(&u.operand)?;
                    self.builder.append(")");
                }
                UnaryOperator::Negate => {
                    self.builder.append("-");
                    self.visit_wrapped(&u.operand)?;
                }
                UnaryOperator::IsNull => {
                    self.visit_wrapped(&u.operand)?;
                    self.builder.append(" IS NULL");
                }
                UnaryOperator::IsNotNull => {
                    self.visit_wrapped(&u.operand)?;
                    self.builder.append(" IS NOT NULL");
                }
            },
            ExpressionKind::Like(l) => {
                self.visit(&l.match_expression)?;
                self.builder.append(" LIKE ");
                self.visit(&l.pattern)?;
                if let Some(escape) = &l.escape_char {
                    self.builder.append(" ESCAPE ");
                    self.visit(escape)?;
                }
            }
            ExpressionKind::Case(c) => {
                self.builder.append("CASE");
                if let Some(operand) = &c.operand {
                    self.builder.append(" ");
                    self.visit(operand)?;
                }
                self.builder.increment_indent();
                for clause in &c.when_clauses {
                    self.builder.append_line().append("WHEN ");
                    self.visit(&clause.test)?;
                    self.builder.append(" THEN ");
                    self.visit(&clause.result)?;
                }
                if let Some(else_result) = &c.else_result {
                    self.builder.append_line().append("ELSE ");
                    self.visit(else_result)?;
                }
                self.builder.decrement_indent();
                self.builder.append_line().append("END");
            }
            ExpressionKind::Function(f) => {
                if let Some(schema) = f.schema() {
                    let name = format!(
                        "{}.{}",
                        self.dialect.quote_ident(schema),
                        self.dialect.quote_ident(f.name())
                    );
                    self.builder.append(name);
                } else if let Some(instance) = f.instance() {
                    self.visit(instance)?;
                    self.builder.append(format!(".{}", f.name()));
                } else if f.is_built_in() {
                    self.builder.append(f.name());
                } else {
                    let name = self.dialect.quote_ident(f.name());
                    self.builder.append(name);
                }
                if let FunctionArguments::WithArguments(arguments) = f.arguments() {
                    self.builder.append("(");
                    self.visit_list(arguments, ", ")?;
                    self.builder.append(")");
                }
            }
            ExpressionKind::Fragment(f) => {
                self.builder.append(&f.sql);
            }
            ExpressionKind::Select(s) => {
                self.builder.append("(");
                self.builder.append_line().increment_indent();
                self.generate_select(s)?;
                self.builder.decrement_indent();
                self.builder.append_line().append(")");
                if let Some(alias) = &s.alias {
                    let alias = self.dialect.quote_ident(alias);
                    self.builder.append(format!(" AS {}", alias));
                }
            }
            ExpressionKind::Table(t) => {
                let text = format!(
                    "{} AS {}",
                    self.dialect.qualify(t.schema.as_deref(), &t.name),
                    self.dialect.quote_ident(&t.alias)
                );
                self.builder.append(text);
            }
            ExpressionKind::FromSql(f) => {
                self.builder.append("(");
                self.builder.append_line().increment_indent();
                let sql = self.substitute_raw_arguments(&f.sql)?;
                self.builder.append_lines(sql);
                self.builder.decrement_indent();
                let alias = self.dialect.quote_ident(&f.alias);
                self.builder.append(format!(") AS {}", alias));
            }
            ExpressionKind::Projection(p) => {
                self.visit(&p.expression)?;
                let same_name = matches!(p.expression.kind(), ExpressionKind::Column(c) if c.name == p.alias);
                if !same_name {
                    let alias = self.dialect.quote_ident(&p.alias);
                    self.builder.append(format!(" AS {}", alias));
                }
            }
            ExpressionKind::Ordering(o) => {
                self.visit(&o.expression)?;
                if !o.ascending {
                    self.builder.append(" DESC");
                }
            }
            ExpressionKind::QueryRoot(_) | ExpressionKind::GroupByShaper(_) => {
                return Err(QueryError::Unsupported(format!(
                    "{} must be translated before SQL generation",
                    expression.kind().name()
                )));
            }
        }
        Ok(())
    }

    fn generate_select(&mut self, select: &SelectExpression) -> Result<()> {
        let paging = self.dialect.paging_style();
        self.builder.append("SELECT ");
        if select.is_distinct {
            self.builder.append("DISTINCT ");
        }
        let top = paging == PagingStyle::TopOffsetFetch && select.offset.is_none();
        if let (true, Some(limit)) = (top, &select.limit) {
            self.builder.append("TOP(");
            self.visit(limit)?;
            self.builder.append(") ");
        }

        if select.projection.is_empty() {
            self.builder.append("1");
        } else {
            self.visit_list(&select.projection, ", ")?;
        }

        if !select.tables.is_empty() {
            self.builder.append_line().append("FROM ");
            self.visit_list(&select.tables, ", ")?;
        }
        if let Some(predicate) = &select.predicate {
            self.builder.append_line().append("WHERE ");
            self.visit(predicate)?;
        }
        if !select.group_by.is_empty() {
            self.builder.append_line().append("GROUP BY ");
            self.visit_list(&select.group_by, ", ")?;
        }
        if let Some(having) = &select.having {
            self.builder.append_line().append("HAVING ");
            self.visit(having)?;
        }

        if !select.orderings.is_empty() {
            self.builder.append_line().append("ORDER BY ");
            self.visit_list(&select.orderings, ", ")?;
        } else if paging == PagingStyle::TopOffsetFetch && select.offset.is_some() {
            // OFFSET/FETCH is only valid after an ORDER BY.
            self.builder.append_line().append("ORDER BY (SELECT 1)");
        }

        match paging {
            PagingStyle::LimitOffset if select.is_paged() => {
                self.builder.append_line();
                if let Some(limit) = &select.limit {
                    self.builder.append("LIMIT ");
                    self.visit(limit)?;
                }
                if let Some(offset) = &select.offset {
                    if select.limit.is_some() {
                        self.builder.append(" ");
                    }
                    self.builder.append("OFFSET ");
                    self.visit(offset)?;
                }
            }
            PagingStyle::TopOffsetFetch => {
                if let Some(offset) = &select.offset {
                    self.builder.append_line().append("OFFSET ");
                    self.visit(offset)?;
                    self.builder.append(" ROWS");
                    if let Some(limit) = &select.limit {
                        self.builder.append(" FETCH NEXT ");
                        self.visit(limit)?;
                        self.builder.append(" ROWS ONLY");
                    }
                }
            }
            PagingStyle::LimitOffset => {}
        }
        Ok(())
    }

    fn visit_list(&mut self, expressions: &[SqlExpr], separator: &str) -> Result<()> {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.builder.append(separator);
            }
            self.visit(expression)?;
        }
        Ok(())
    }

    /// Operand of a binary operator, parenthesized when precedence requires.
    fn visit_operand(&mut self, parent: BinaryOperator, operand: &SqlExpr, is_right: bool) -> Result<()> {
        let needs_parens = match operand.kind() {
            ExpressionKind::Binary(child) => {
                child.operator.precedence() < parent.precedence()
                    || (child.operator.precedence() == parent.precedence()
                        && (child.operator != parent || (is_right && !parent.is_associative())))
            }
            _ => false,
        };
        if needs_parens {
            self.builder.append("(");
            self.visit(operand)?;
            self.builder.append(")");
            Ok(())
        } else {
            self.visit(operand)
        }
    }

    fn visit_wrapped(&mut self, operand: &SqlExpr) -> Result<()> {
        if matches!(operand.kind(), ExpressionKind::Binary(_)) {
            self.builder.append("(");
            self.visit(operand)?;
            self.builder.append(")");
            Ok(())
        } else {
            self.visit(operand)
        }
    }

    fn parameter_value(&self, name: &str) -> Result<SqlValue> {
        self.parameter_values.get(name).cloned().ok_or_else(|| {
            QueryError::translation(
                format!("parameter '{}'", name),
                "no value was supplied for the parameter",
            )
        })
    }

    /// Placeholder for `name`, adding the parameter on first use.
    fn bind(
        &mut self,
        name: &str,
        value: SqlValue,
        store_type: Option<String>,
        is_nullable: bool,
    ) -> Result<String> {
        if let Some(placeholder) = self.placeholders.get(name) {
            return Ok(placeholder.clone());
        }
        let index = self.builder.parameters().len() + 1;
        let placeholder = self.dialect.param_placeholder(index, name);

        let mut parameter = RelationalParameter::new(name, placeholder.clone(), value).nullable(is_nullable);
        if let Some(store_type) = store_type {
            parameter = parameter.with_store_type(store_type);
        }
        self.builder.add_parameter(parameter)?;
        self.placeholders.insert(name.to_string(), placeholder.clone());
        Ok(placeholder)
    }

    /// Replace `{i}` in raw SQL with the placeholder of argument `i`.
    fn substitute_raw_arguments(&mut self, sql: &str) -> Result<String> {
        let mut out = String::with_capacity(sql.len());
        let mut rest = sql;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}');
            let index = close.and_then(|c| after[..c].parse::<usize>().ok());
            match (close, index) {
                (Some(close), Some(index)) => {
                    let name = format!("{}{}", RAW_SQL_ARGUMENT, index);
                    let value = self.parameter_value(&name)?;
                    let nullable = value.is_null();
                    let placeholder = self.bind(&name, value, None, nullable)?;
                    out.push_str(&placeholder);
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
