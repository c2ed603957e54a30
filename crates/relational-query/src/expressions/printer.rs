//! Debug rendering of expression trees.
//!
//! The output is for logs and diagnostics only; executable SQL comes from
//! [`QuerySqlGenerator`](crate::query::QuerySqlGenerator).

use crate::core::value::SqlValue;
use crate::storage::IndentedStringBuilder;

use super::{ExpressionKind, FunctionArguments, SqlExpr, UnaryOperator};

/// Renders expression trees in a compact, human-readable form.
#[derive(Debug, Default)]
pub struct ExpressionPrinter {
    sb: IndentedStringBuilder,
}

impl ExpressionPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one tree.
    pub fn print_expression(expression: &SqlExpr) -> String {
        let mut printer = Self::new();
        expression.print(&mut printer);
        printer.sb.to_string()
    }

    pub fn append(&mut self, text: &str) -> &mut Self {
        self.sb.append(text);
        self
    }

    pub fn append_line(&mut self, text: &str) -> &mut Self {
        self.sb.append_line(text);
        self
    }

    pub fn visit(&mut self, expression: &SqlExpr) -> &mut Self {
        expression.print(self);
        self
    }

    fn visit_list(&mut self, expressions: &[SqlExpr], separator: &str) {
        for (i, e) in expressions.iter().enumerate() {
            if i > 0 {
                self.append(separator);
            }
            self.visit(e);
        }
    }

    fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.sb.increment_indent();
        f(self);
        self.sb.decrement_indent();
    }
}

impl SqlExpr {
    /// Write the debug form of this node into `printer`.
    pub fn print(&self, printer: &mut ExpressionPrinter) {
        match self.kind() {
            ExpressionKind::Column(c) => {
                printer.append(&format!("{}.{}", c.table_alias, c.name));
            }
            ExpressionKind::Constant(c) => {
                let text = match self.type_mapping() {
                    Some(mapping) => mapping.generate_sql_literal(&c.value),
                    None => print_value(&c.value),
                };
                printer.append(&text);
            }
            ExpressionKind::Parameter(p) => {
                printer.append(&format!("@{}", p.name));
            }
            ExpressionKind::Binary(b) => {
                print_operand(printer, &b.left);
                printer.append(&format!(" {} ", b.operator.symbol()));
                print_operand(printer, &b.right);
            }
            ExpressionKind::Unary(u) => match u.operator {
                UnaryOperator::Not => {
                    printer.append("NOT(").visit(&u.operand).append(")");
                }
                UnaryOperator::Negate => {
                    printer.append("-");
                    print_operand(printer, &u.operand);
                }
                UnaryOperator::IsNull => {
                    printer.visit(&u.operand).append(" IS NULL");
                }
                UnaryOperator::IsNotNull => {
                    printer.visit(&u.operand).append(" IS NOT NULL");
                }
            },
            ExpressionKind::Like(l) => {
                printer
                    .visit(&l.match_expression)
                    .append(" LIKE ")
                    .visit(&l.pattern);
                if let Some(escape) = &l.escape_char {
                    printer.append(" ESCAPE ").visit(escape);
                }
            }
            ExpressionKind::Case(c) => {
                printer.append("CASE");
                if let Some(operand) = &c.operand {
                    printer.append(" ").visit(operand);
                }
                printer.append_line("");
                printer.indented(|p| {
                    for clause in &c.when_clauses {
                        p.append("WHEN ")
                            .visit(&clause.test)
                            .append(" THEN ")
                            .visit(&clause.result)
                            .append_line("");
                    }
                    if let Some(else_result) = &c.else_result {
                        p.append("ELSE ").visit(else_result).append_line("");
                    }
                });
                printer.append("END");
            }
            ExpressionKind::Function(f) => {
                if let Some(schema) = f.schema() {
                    printer.append(&format!("{}.", schema));
                } else if let Some(instance) = f.instance() {
                    printer.visit(instance).append(".");
                }
                printer.append(f.name());
                if let FunctionArguments::WithArguments(args) = f.arguments() {
                    printer.append("(");
                    printer.visit_list(args, ", ");
                    printer.append(")");
                }
            }
            ExpressionKind::Fragment(f) => {
                printer.append(&f.sql);
            }
            ExpressionKind::QueryRoot(root) => {
                printer
                    .append(&format!("SqlQueryRoot<{}>({}, ", root.element_type, root.sql))
                    .visit(&root.argument)
                    .append(")");
            }
            ExpressionKind::GroupByShaper(g) => {
                printer.append_line("RelationalGroupByShaperExpression:");
                printer.append("KeySelector: ").visit(&g.key_selector).append_line(", ");
                printer
                    .append("ElementSelector: ")
                    .visit(&g.element_selector)
                    .append_line(", ");
                printer.append("GroupingEnumerable: ");
                printer.indented(|p| {
                    p.visit(&g.grouping_enumerable);
                });
            }
            ExpressionKind::Select(s) => {
                if s.alias.is_some() {
                    printer.append_line("(");
                    printer.sb.increment_indent();
                }
                printer.append("SELECT ");
                if s.is_distinct {
                    printer.append("DISTINCT ");
                }
                if let Some(limit) = &s.limit {
                    printer.append("TOP(").visit(limit).append(") ");
                }
                if s.projection.is_empty() {
                    printer.append("1");
                } else {
                    printer.visit_list(&s.projection, ", ");
                }
                if !s.tables.is_empty() {
                    printer.append_line("").append("FROM ");
                    printer.visit_list(&s.tables, ", ");
                }
                if let Some(predicate) = &s.predicate {
                    printer.append_line("").append("WHERE ").visit(predicate);
                }
                if !s.group_by.is_empty() {
                    printer.append_line("").append("GROUP BY ");
                    printer.visit_list(&s.group_by, ", ");
                }
                if let Some(having) = &s.having {
                    printer.append_line("").append("HAVING ").visit(having);
                }
                if !s.orderings.is_empty() {
                    printer.append_line("").append("ORDER BY ");
                    printer.visit_list(&s.orderings, ", ");
                }
                if let Some(offset) = &s.offset {
                    printer.append_line("").append("OFFSET ").visit(offset).append(" ROWS");
                }
                if let Some(alias) = &s.alias {
                    printer.sb.decrement_indent();
                    printer.append_line("").append(&format!(") AS {}", alias));
                }
            }
            ExpressionKind::Table(t) => {
                match &t.schema {
                    Some(schema) => printer.append(&format!("{}.{} AS {}", schema, t.name, t.alias)),
                    None => printer.append(&format!("{} AS {}", t.name, t.alias)),
                };
            }
            ExpressionKind::FromSql(f) => {
                printer.append(&format!("{} AS {}", f.sql, f.alias));
            }
            ExpressionKind::Projection(p) => {
                printer.visit(&p.expression);
                let is_same_column = matches!(
                    p.expression.kind(),
                    ExpressionKind::Column(c) if c.name == p.alias
                );
                if !p.alias.is_empty() && !is_same_column {
                    printer.append(&format!(" AS {}", p.alias));
                }
            }
            ExpressionKind::Ordering(o) => {
                printer
                    .visit(&o.expression)
                    .append(if o.ascending { " ASC" } else { " DESC" });
            }
        }
    }
}

fn print_operand(printer: &mut ExpressionPrinter, operand: &SqlExpr) {
    if matches!(operand.kind(), ExpressionKind::Binary(_)) {
        printer.append("(").visit(operand).append(")");
    } else {
        printer.visit(operand);
    }
}

fn print_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => b.to_string(),
        SqlValue::I16(v) => v.to_string(),
        SqlValue::I32(v) => v.to_string(),
        SqlValue::I64(v) => v.to_string(),
        SqlValue::F32(v) => v.to_string(),
        SqlValue::F64(v) => v.to_string(),
        SqlValue::Decimal(d) => d.to_string(),
        SqlValue::Text(s) => format!("'{}'", s),
        other => format!("{:?}", other),
    }
}
