//! Logical query → `SELECT` expression tree.
//!
//! ```text
//! LogicalQuery
//!   source      ──► TableExpression | QueryRoot ──► FromSqlExpression
//!   predicate   ──► WHERE
//!   group_by    ──► GroupByShaper(key, element, grouping enumerable)
//!                     aggregates translated against the enumerable
//!                     ──► GROUP BY key, projection [key, aggregates...]
//!   projection  ──► ProjectionExpression list (all columns when empty)
//!   order_by    ──► OrderingExpression list
//!   skip / take ──► OFFSET / LIMIT
//! ```
//!
//! Dialects that keep search conditions apart from boolean values get the
//! tree rewritten by [`SearchConditionConverter`] as the last step.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::{QueryError, Result};
use crate::expressions::{
    ExpressionKind, ExpressionVisitor, RelationalGroupByShaperExpression, SelectExpression,
    SqlExpr, SqlQueryRootExpression,
};
use crate::storage::model::EntityType;

use super::context::QueryCompilationContext;
use super::expression::{Expression, GroupBy, LogicalQuery, MethodInfo, QuerySource};
use super::search_condition::SearchConditionConverter;
use super::translator::SqlTranslator;

/// Name of the parameter holding raw SQL arguments; argument `i` is bound
/// as `p{i}`.
pub const RAW_SQL_ARGUMENT: &str = "p";

pub struct QueryTranslator<'a> {
    ctx: &'a QueryCompilationContext,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(ctx: &'a QueryCompilationContext) -> Self {
        Self { ctx }
    }

    /// Parameter values of a query, including raw SQL arguments.
    pub fn parameter_values(query: &LogicalQuery) -> BTreeMap<String, SqlValue> {
        let mut values = query.parameters.clone();
        if let QuerySource::Sql { arguments, .. } = &query.source {
            for (i, value) in arguments.iter().enumerate() {
                values.insert(format!("{}{}", RAW_SQL_ARGUMENT, i), value.clone());
            }
        }
        values
    }

    pub fn translate(&self, query: &LogicalQuery) -> Result<SqlExpr> {
        let entity = self.ctx.model().require_entity_type(query.source.entity_name())?;
        let alias = entity.table_alias();
        let translator = SqlTranslator::new(self.ctx, entity, &alias);

        let mut select = SelectExpression::from_table(self.table_source(&query.source, entity, &alias)?);

        if let Some(predicate) = &query.predicate {
            select.predicate = Some(translator.translate_predicate(predicate)?);
        }

        let value_type = match &query.group_by {
            Some(group_by) => {
                if !query.projection.is_empty() {
                    return Err(QueryError::Unsupported(
                        "projection over grouped results; use the group's key and aggregates".into(),
                    ));
                }
                self.apply_group_by(&translator, entity, &mut select, group_by)?;
                ValueType::sequence_of(ValueType::Object)
            }
            None if query.projection.is_empty() => {
                select.projection = self.entity_projection(entity, &alias)?;
                ValueType::sequence_of(ValueType::Entity(entity.name.clone()))
            }
            None => {
                select.projection = query
                    .projection
                    .iter()
                    .map(|p| Ok(SqlExpr::projection(translator.translate(&p.expression)?, p.alias.clone())))
                    .collect::<Result<Vec<_>>>()?;
                ValueType::sequence_of(ValueType::Object)
            }
        };

        select.is_distinct = query.distinct;
        select.orderings = query
            .order_by
            .iter()
            .map(|o| Ok(SqlExpr::ordering(translator.translate(&o.expression)?, !o.descending)))
            .collect::<Result<Vec<_>>>()?;
        select.offset = query.skip.as_ref().map(|s| self.paging_value(&translator, s)).transpose()?;
        select.limit = query.take.as_ref().map(|t| self.paging_value(&translator, t)).transpose()?;

        let mut result = SqlExpr::select(select, value_type);
        if self.ctx.dialect().requires_bool_comparison() {
            result = SearchConditionConverter::new(self.ctx.factory()).visit(&result)?;
        }

        debug!("Translated query over {}:\n{}", entity.name, result);
        Ok(result)
    }

    fn table_source(&self, source: &QuerySource, entity: &EntityType, alias: &str) -> Result<SqlExpr> {
        match source {
            QuerySource::Entity { .. } => Ok(SqlExpr::table(
                entity.table.clone(),
                entity.schema.clone(),
                alias,
            )),
            QuerySource::Sql { sql, .. } => {
                let argument = SqlExpr::parameter(RAW_SQL_ARGUMENT, ValueType::Object, None, false);
                let root = SqlExpr::query_root(SqlQueryRootExpression::new(
                    entity.name.clone(),
                    sql.clone(),
                    argument,
                    Some(self.ctx.query_provider().clone()),
                ));
                root_to_from_sql(&root, alias)
            }
        }
    }

    fn entity_projection(&self, entity: &EntityType, alias: &str) -> Result<Vec<SqlExpr>> {
        entity
            .properties
            .iter()
            .map(|p| {
                let column = self.ctx.factory().column(entity, p, alias)?;
                Ok(SqlExpr::projection(column, p.name.clone()))
            })
            .collect()
    }

    fn apply_group_by(
        &self,
        translator: &SqlTranslator<'_>,
        entity: &EntityType,
        select: &mut SelectExpression,
        group_by: &GroupBy,
    ) -> Result<()> {
        let key = translator.translate(&group_by.key)?;

        let mut elements = select.clone();
        elements.projection = vec![SqlExpr::fragment("*")];
        let grouping_enumerable = SqlExpr::select(
            elements,
            ValueType::sequence_of(ValueType::Entity(entity.name.clone())),
        );
        let shaper = SqlExpr::group_by_shaper(RelationalGroupByShaperExpression::new(
            key.clone(),
            SqlExpr::fragment("*"),
            grouping_enumerable,
        ));
        debug!("Grouping {} by {}", entity.name, key);

        let ExpressionKind::GroupByShaper(grouping) = shaper.kind() else {
            return Err(QueryError::Unsupported("grouping without a shaper".into()));
        };

        let mut projection = vec![SqlExpr::projection(key.clone(), group_by.key_alias.clone())];
        for aggregate in &group_by.aggregates {
            let method = MethodInfo::new("Enumerable", aggregate.method.clone());
            let translated = translator.translate_aggregate(
                &method,
                &grouping.grouping_enumerable,
                aggregate.selector.as_ref(),
            )?;
            projection.push(SqlExpr::projection(translated, aggregate.alias.clone()));
        }

        select.projection = projection;
        select.group_by = vec![key];
        Ok(())
    }

    fn paging_value(&self, translator: &SqlTranslator<'_>, value: &Expression) -> Result<SqlExpr> {
        let translated = translator.translate(value)?;
        if !translated.value_type().is_integer() {
            return Err(QueryError::translation(
                "Skip/Take",
                format!("row count must be an integer, got {}", translated.value_type()),
            ));
        }
        Ok(translated)
    }
}

/// Replace a raw SQL query root with the derived table it reads from.
pub fn root_to_from_sql(root: &SqlExpr, alias: &str) -> Result<SqlExpr> {
    match root.kind() {
        ExpressionKind::QueryRoot(r) => Ok(SqlExpr::from_sql(r.sql.clone(), r.argument.clone(), alias)),
        other => Err(QueryError::Unsupported(format!(
            "{} cannot be used as a table source",
            other.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::ProviderCatalog;
    use crate::expressions::BinaryOperator;
    use crate::query::expression::AggregateSelector;
    use crate::storage::model::{EntityType, Model, Property};

    fn blogs() -> Arc<Model> {
        Arc::new(
            Model::new().with_entity(
                EntityType::new("Blog")
                    .with_table("Blogs")
                    .with_key("BlogId")
                    .with_property(Property::new("BlogId", ValueType::Int32))
                    .with_property(Property::new("Title", ValueType::String).with_max_length(200))
                    .with_property(Property::new("IsActive", ValueType::Bool))
                    .with_property(Property::new("Rating", ValueType::Int32).nullable()),
            ),
        )
    }

    fn session(provider: &str) -> QueryCompilationContext {
        ProviderCatalog::with_builtins()
            .create_session(provider, blogs())
            .unwrap()
    }

    #[test]
    fn test_entity_query_postgres() {
        let query = LogicalQuery::from_entity("Blog")
            .filter(Expression::binary(
                BinaryOperator::Equal,
                Expression::property("Title"),
                Expression::parameter("title", ValueType::String),
            ))
            .order_by(Expression::property("BlogId"), true)
            .take(Expression::constant(10))
            .with_parameter("title", "EF");

        let command = session("postgres").compile(&query).unwrap();
        assert_eq!(
            command.command_text,
            "SELECT \"b\".\"BlogId\", \"b\".\"Title\", \"b\".\"IsActive\", \"b\".\"Rating\"\nFROM \"Blogs\" AS \"b\"\nWHERE \"b\".\"Title\" = $1\nORDER BY \"b\".\"BlogId\" DESC\nLIMIT 10"
        );
        assert_eq!(command.parameters.len(), 1);
        assert_eq!(command.parameters[0].invariant_name, "title");
        assert_eq!(command.parameters[0].store_type.as_deref(), Some("character varying(200)"));
    }

    #[test]
    fn test_bool_predicate_mssql() {
        let query = LogicalQuery::from_entity("Blog")
            .filter(Expression::property("IsActive"))
            .take(Expression::constant(5));

        let command = session("mssql").compile(&query).unwrap();
        assert_eq!(
            command.command_text,
            "SELECT TOP(5) [b].[BlogId], [b].[Title], [b].[IsActive], [b].[Rating]\nFROM [Blogs] AS [b]\nWHERE [b].[IsActive] = CAST(1 AS bit)"
        );
    }

    #[test]
    fn test_bool_predicate_postgres_unchanged() {
        let query = LogicalQuery::from_entity("Blog").filter(Expression::property("IsActive"));
        let command = session("pg").compile(&query).unwrap();
        assert!(command.command_text.ends_with("WHERE \"b\".\"IsActive\""));
    }

    #[test]
    fn test_group_by_builds_shaper_projection() {
        let mut query = LogicalQuery::from_entity("Blog");
        query.group_by = Some(GroupBy {
            key: Expression::property("Rating"),
            key_alias: "Rating".into(),
            aggregates: vec![AggregateSelector {
                alias: "Blogs".into(),
                method: "Count".into(),
                selector: None,
            }],
        });

        let select = session("postgres").translate(&query).unwrap();
        let ExpressionKind::Select(select) = select.kind() else {
            panic!("expected a select");
        };
        assert_eq!(select.group_by.len(), 1);
        assert_eq!(select.projection.len(), 2);
    }

    #[test]
    fn test_group_by_with_projection_rejected() {
        let mut query = LogicalQuery::from_entity("Blog").select("T", Expression::property("Title"));
        query.group_by = Some(GroupBy {
            key: Expression::property("Rating"),
            key_alias: "Key".into(),
            aggregates: Vec::new(),
        });

        let err = session("postgres").translate(&query).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn test_paging_requires_integer() {
        let query = LogicalQuery::from_entity("Blog").take(Expression::constant("ten"));
        let err = session("postgres").translate(&query).unwrap_err();
        assert!(err.to_string().contains("Skip/Take"));
    }

    #[test]
    fn test_raw_sql_arguments_become_parameters() {
        let mut query = LogicalQuery::from_entity("Blog");
        query.source = QuerySource::Sql {
            entity: "Blog".into(),
            sql: "SELECT * FROM \"Blogs\" WHERE \"Rating\" > {0}".into(),
            arguments: vec![SqlValue::I32(3)],
        };

        let values = QueryTranslator::parameter_values(&query);
        assert_eq!(values.get("p0"), Some(&SqlValue::I32(3)));

        let command = session("postgres").compile(&query).unwrap();
        assert!(command
            .command_text
            .contains("FROM (\n    SELECT * FROM \"Blogs\" WHERE \"Rating\" > $1\n) AS \"b\""));
        assert_eq!(command.parameters[0].invariant_name, "p0");
    }

    #[test]
    fn test_unknown_property() {
        let query = LogicalQuery::from_entity("Blog").filter(Expression::property("Missing"));
        let err = session("postgres").translate(&query).unwrap_err();
        assert!(err.to_string().contains("'Missing' is not a mapped property"));
    }
}
