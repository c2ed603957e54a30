//! Per-session compilation state.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::core::traits::Dialect;
use crate::core::value::SqlValue;
use crate::error::Result;
use crate::expressions::{QueryProvider, SqlExpr};
use crate::storage::model::Model;
use crate::storage::RelationalCommand;
use crate::typemap::RelationalTypeMappingSource;

use super::expression::LogicalQuery;
use super::factory::SqlExpressionFactory;
use super::pipeline::QueryTranslator;
use super::sql_generator::QuerySqlGenerator;
use super::translators::{
    AggregateMethodCallTranslator, MethodCallTranslator,
    RelationalAggregateMethodCallTranslatorProvider, RelationalMethodCallTranslatorProvider,
};

/// Query provider recorded on query roots created by a session.
#[derive(Debug, Clone)]
pub struct SessionQueryProvider {
    provider_name: String,
}

impl SessionQueryProvider {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
        }
    }
}

impl QueryProvider for SessionQueryProvider {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

/// Everything one session needs to compile queries: the provider's dialect
/// and type mappings, the model, and the session's translators.
///
/// Created by [`ProviderCatalog::create_session`](crate::core::ProviderCatalog::create_session).
pub struct QueryCompilationContext {
    dialect: Arc<dyn Dialect>,
    type_mapping_source: Arc<RelationalTypeMappingSource>,
    model: Arc<Model>,
    factory: SqlExpressionFactory,
    method_translators: RelationalMethodCallTranslatorProvider,
    aggregate_translators: RelationalAggregateMethodCallTranslatorProvider,
    query_provider: Arc<dyn QueryProvider>,
}

impl QueryCompilationContext {
    pub fn new(
        dialect: Arc<dyn Dialect>,
        type_mapping_source: Arc<RelationalTypeMappingSource>,
        model: Arc<Model>,
        method_translators: RelationalMethodCallTranslatorProvider,
        aggregate_translators: RelationalAggregateMethodCallTranslatorProvider,
    ) -> Self {
        let factory = SqlExpressionFactory::new(dialect.clone(), type_mapping_source.clone());
        let query_provider = Arc::new(SessionQueryProvider::new(dialect.name()));
        Self {
            dialect,
            type_mapping_source,
            model,
            factory,
            method_translators,
            aggregate_translators,
            query_provider,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.dialect.name()
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn type_mapping_source(&self) -> &Arc<RelationalTypeMappingSource> {
        &self.type_mapping_source
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn factory(&self) -> &SqlExpressionFactory {
        &self.factory
    }

    pub fn method_translators(&self) -> &RelationalMethodCallTranslatorProvider {
        &self.method_translators
    }

    pub fn aggregate_translators(&self) -> &RelationalAggregateMethodCallTranslatorProvider {
        &self.aggregate_translators
    }

    pub fn query_provider(&self) -> &Arc<dyn QueryProvider> {
        &self.query_provider
    }

    /// Register additional method translators for this session only.
    pub fn add_method_translators(&mut self, translators: impl IntoIterator<Item = Rc<dyn MethodCallTranslator>>) {
        self.method_translators.add_translators(translators);
    }

    /// Register additional aggregate translators for this session only.
    pub fn add_aggregate_translators(
        &mut self,
        translators: impl IntoIterator<Item = Rc<dyn AggregateMethodCallTranslator>>,
    ) {
        self.aggregate_translators.add_translators(translators);
    }

    /// Translate a logical query into a `SELECT` expression tree.
    pub fn translate(&self, query: &LogicalQuery) -> Result<SqlExpr> {
        QueryTranslator::new(self).translate(query)
    }

    /// Render a translated tree with the given parameter values.
    pub fn generate(&self, select: &SqlExpr, parameters: &BTreeMap<String, SqlValue>) -> Result<RelationalCommand> {
        QuerySqlGenerator::new(self.dialect.as_ref(), parameters).generate(select)
    }

    /// Translate and render a logical query with its own parameter values.
    pub fn compile(&self, query: &LogicalQuery) -> Result<RelationalCommand> {
        let select = self.translate(query)?;
        let parameters = QueryTranslator::parameter_values(query);
        self.generate(&select, &parameters)
    }
}

impl fmt::Debug for QueryCompilationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCompilationContext")
            .field("provider", &self.dialect.name())
            .field("entity_types", &self.model.entity_types.len())
            .field("method_translators", &self.method_translators)
            .field("aggregate_translators", &self.aggregate_translators)
            .finish()
    }
}
