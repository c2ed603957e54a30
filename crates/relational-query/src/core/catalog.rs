//! Provider catalog for explicit dependency injection.
//!
//! The [`ProviderCatalog`] is the registry of everything a provider
//! contributes: its dialect, its store type mappings, and the plugins that
//! extend type mapping and method translation. Sessions are created from it
//! with [`ProviderCatalog::create_session`].
//!
//! Type mapping sources are built once per provider and shared by every
//! session. Translator plugins are instantiated per session, since sessions
//! own their translators.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::drivers::canonical_provider_name;
use crate::error::{QueryError, Result};
use crate::migrations::{HistoryRepositoryOptions, MigrationConnection, RelationalHistoryRepository};
use crate::query::translators::{
    AggregateMethodCallTranslatorPlugin, MethodCallTranslatorPlugin,
    RelationalAggregateMethodCallTranslatorProvider, RelationalMethodCallTranslatorProvider,
};
use crate::query::QueryCompilationContext;
use crate::storage::model::Model;
use crate::typemap::{
    ProviderTypeMappings, RelationalTypeMappingSource, TypeMappingSourcePlugin,
};

use super::traits::Dialect;

/// Creates a fresh method translator plugin for each session.
pub type MethodPluginFactory = Arc<dyn Fn() -> Box<dyn MethodCallTranslatorPlugin> + Send + Sync>;

/// Creates a fresh aggregate translator plugin for each session.
pub type AggregatePluginFactory =
    Arc<dyn Fn() -> Box<dyn AggregateMethodCallTranslatorPlugin> + Send + Sync>;

/// Registry of providers and their extensions.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = ProviderCatalog::with_builtins();
/// let session = catalog.create_session("postgres", Arc::new(model))?;
/// let command = session.compile(&query)?;
/// ```
#[derive(Default)]
pub struct ProviderCatalog {
    dialects: HashMap<String, Arc<dyn Dialect>>,
    type_mappings: HashMap<String, Arc<dyn ProviderTypeMappings>>,
    type_mapping_plugins: HashMap<String, Vec<Arc<dyn TypeMappingSourcePlugin>>>,
    method_plugins: HashMap<String, Vec<MethodPluginFactory>>,
    aggregate_plugins: HashMap<String, Vec<AggregatePluginFactory>>,

    /// Type mapping source per provider, built on first use.
    mapping_sources: DashMap<String, Arc<RelationalTypeMappingSource>>,
}

impl ProviderCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the MSSQL and PostgreSQL providers registered.
    pub fn with_builtins() -> Self {
        use crate::drivers::{MssqlDialect, PostgresDialect};
        use crate::typemap::{MssqlTypeMappings, PostgresTypeMappings};

        let mut catalog = Self::new();
        catalog.register_dialect("mssql", MssqlDialect::new());
        catalog.register_dialect("postgres", PostgresDialect::new());
        catalog.register_type_mappings("mssql", Arc::new(MssqlTypeMappings::new()));
        catalog.register_type_mappings("postgres", Arc::new(PostgresTypeMappings::new()));
        catalog
    }

    /// Resolve provider aliases ("sqlserver", "pg", ...) to the registered name.
    fn resolve_name(provider: &str) -> String {
        canonical_provider_name(provider)
            .map(str::to_string)
            .unwrap_or_else(|| provider.to_string())
    }

    /// Register a dialect by name.
    pub fn register_dialect(&mut self, name: impl Into<String>, dialect: impl Dialect + 'static) {
        self.dialects.insert(name.into(), Arc::new(dialect));
    }

    /// Register a dialect as an Arc (for sharing).
    pub fn register_dialect_arc(&mut self, name: impl Into<String>, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(name.into(), dialect);
    }

    /// Get a dialect by name or alias.
    pub fn get_dialect(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(&Self::resolve_name(name)).cloned()
    }

    /// Get a dialect by name, returning an error if not found.
    pub fn require_dialect(&self, name: &str) -> Result<Arc<dyn Dialect>> {
        self.get_dialect(name).ok_or_else(|| {
            QueryError::Config(format!(
                "Unknown provider: '{}'. Registered providers: {}",
                name,
                self.dialect_names().join(", ")
            ))
        })
    }

    /// Check if a dialect is registered.
    pub fn has_dialect(&self, name: &str) -> bool {
        self.dialects.contains_key(&Self::resolve_name(name))
    }

    /// Get all registered dialect names, sorted.
    pub fn dialect_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register the built-in store type mappings of a provider.
    pub fn register_type_mappings(&mut self, provider: impl Into<String>, mappings: Arc<dyn ProviderTypeMappings>) {
        let provider = Self::resolve_name(&provider.into());
        self.mapping_sources.remove(&provider);
        self.type_mappings.insert(provider, mappings);
    }

    /// Register a type mapping plugin, consulted after the provider's
    /// built-ins and earlier plugins.
    pub fn register_type_mapping_plugin(
        &mut self,
        provider: impl Into<String>,
        plugin: Arc<dyn TypeMappingSourcePlugin>,
    ) {
        let provider = Self::resolve_name(&provider.into());
        self.mapping_sources.remove(&provider);
        self.type_mapping_plugins.entry(provider).or_default().push(plugin);
    }

    /// Register a method translator plugin for a provider.
    pub fn register_method_plugin(&mut self, provider: impl Into<String>, factory: MethodPluginFactory) {
        self.method_plugins
            .entry(Self::resolve_name(&provider.into()))
            .or_default()
            .push(factory);
    }

    /// Register an aggregate translator plugin for a provider.
    pub fn register_aggregate_plugin(&mut self, provider: impl Into<String>, factory: AggregatePluginFactory) {
        self.aggregate_plugins
            .entry(Self::resolve_name(&provider.into()))
            .or_default()
            .push(factory);
    }

    /// Check if store type mappings are registered for a provider.
    pub fn has_type_mappings(&self, provider: &str) -> bool {
        self.type_mappings.contains_key(&Self::resolve_name(provider))
    }

    /// Shared type mapping source of a provider.
    pub fn type_mapping_source(&self, provider: &str) -> Result<Arc<RelationalTypeMappingSource>> {
        let name = Self::resolve_name(provider);
        if let Some(source) = self.mapping_sources.get(&name) {
            return Ok(source.clone());
        }

        let mappings = self.type_mappings.get(&name).cloned().ok_or_else(|| {
            QueryError::Config(format!("No type mappings registered for provider '{}'", name))
        })?;
        let plugins = self.type_mapping_plugins.get(&name).cloned().unwrap_or_default();
        debug!(
            "Building {} type mapping source with {} plugin(s)",
            name,
            plugins.len()
        );

        let source = self
            .mapping_sources
            .entry(name)
            .or_insert_with(|| Arc::new(RelationalTypeMappingSource::with_plugins(mappings, plugins)))
            .clone();
        Ok(source)
    }

    /// Create a query compilation session for a provider over `model`.
    pub fn create_session(&self, provider: &str, model: Arc<Model>) -> Result<QueryCompilationContext> {
        let name = Self::resolve_name(provider);
        let dialect = self.require_dialect(&name)?;
        let type_mapping_source = self.type_mapping_source(&name)?;

        let method_plugins: Vec<Box<dyn MethodCallTranslatorPlugin>> = self
            .method_plugins
            .get(&name)
            .map(|factories| factories.iter().map(|f| f()).collect())
            .unwrap_or_default();
        let aggregate_plugins: Vec<Box<dyn AggregateMethodCallTranslatorPlugin>> = self
            .aggregate_plugins
            .get(&name)
            .map(|factories| factories.iter().map(|f| f()).collect())
            .unwrap_or_default();

        info!(
            "Created {} query session: {} entity type(s), {} method plugin(s), {} aggregate plugin(s)",
            name,
            model.entity_types.len(),
            method_plugins.len(),
            aggregate_plugins.len()
        );

        Ok(QueryCompilationContext::new(
            dialect,
            type_mapping_source,
            model,
            RelationalMethodCallTranslatorProvider::new(&method_plugins),
            RelationalAggregateMethodCallTranslatorProvider::new(&aggregate_plugins),
        ))
    }

    /// History repository for a provider, running its SQL on `connection`.
    pub fn create_history_repository(
        &self,
        provider: &str,
        connection: Arc<dyn MigrationConnection>,
        options: HistoryRepositoryOptions,
    ) -> Result<RelationalHistoryRepository> {
        let dialect = self.require_dialect(provider)?;
        let type_mapping_source = self.type_mapping_source(provider)?;
        RelationalHistoryRepository::new(dialect, type_mapping_source.as_ref(), connection, options)
    }
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("dialects", &self.dialect_names())
            .field("type_mappings", &self.type_mappings.keys().collect::<Vec<_>>())
            .field(
                "method_plugins",
                &self.method_plugins.iter().map(|(k, v)| (k, v.len())).collect::<Vec<_>>(),
            )
            .field(
                "aggregate_plugins",
                &self.aggregate_plugins.iter().map(|(k, v)| (k, v.len())).collect::<Vec<_>>(),
            )
            .finish()
    }
}
