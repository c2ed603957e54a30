//! Type mapping source: logical type + facets → store type mapping.
//!
//! Each provider contributes a [`ProviderTypeMappings`] with its built-in
//! store types. Plugins ([`TypeMappingSourcePlugin`]) registered next to the
//! provider are consulted when the provider has no mapping for a request.
//!
//! # Architecture
//!
//! ```text
//! TypeMappingInfo ──► provider built-ins ──► plugins (in registration order)
//!                          │                      │
//!                          └──── first Some ──────┘──► cached RelationalTypeMapping
//! ```
//!
//! [`RelationalTypeMappingSource`] is shared by every session that uses the
//! provider, so it is `Send + Sync` and caches resolutions in a concurrent map.

mod mapping;
mod mssql;
mod postgres;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::core::types::ValueType;
use crate::storage::model::{EntityType, Property};

pub use mapping::{parse_store_type, RelationalTypeMapping, TypeMappingInfo, ValueConverter};
pub use mssql::MssqlTypeMappings;
pub use postgres::PostgresTypeMappings;

/// Resolves type mappings for a provider.
pub trait TypeMappingSource: Send + Sync {
    /// Find the mapping for the given facets, or `None` when unmapped.
    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<Arc<RelationalTypeMapping>>;

    /// Default mapping for a logical type.
    fn find_mapping_for_type(&self, value_type: &ValueType) -> Option<Arc<RelationalTypeMapping>> {
        self.find_mapping(&TypeMappingInfo::for_type(value_type.clone()))
    }

    /// Mapping for an explicit store type name such as `nvarchar(100)`.
    fn find_mapping_for_store_type(&self, store_type: &str) -> Option<Arc<RelationalTypeMapping>> {
        self.find_mapping(&TypeMappingInfo::for_store_type(store_type))
    }

    /// Mapping for a mapped property, honoring its column facets.
    fn find_mapping_for_property(
        &self,
        entity: &EntityType,
        property: &Property,
    ) -> Option<Arc<RelationalTypeMapping>> {
        self.find_mapping(&property.type_mapping_info(entity.is_key(&property.name)))
    }
}

/// Built-in store type mappings of one provider.
pub trait ProviderTypeMappings: Send + Sync {
    /// Provider identifier (e.g., "postgres", "mssql").
    fn provider_name(&self) -> &str;

    /// Resolve the request against the provider's own store types.
    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<RelationalTypeMapping>;
}

/// Extension point for mappings the provider does not know about.
pub trait TypeMappingSourcePlugin: Send + Sync {
    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<RelationalTypeMapping>;
}

/// Provider mappings plus plugins, with a resolution cache.
pub struct RelationalTypeMappingSource {
    provider: Arc<dyn ProviderTypeMappings>,
    plugins: Vec<Arc<dyn TypeMappingSourcePlugin>>,
    cache: DashMap<TypeMappingInfo, Option<Arc<RelationalTypeMapping>>>,
}

impl RelationalTypeMappingSource {
    /// Create a source over the given provider mappings.
    pub fn new(provider: Arc<dyn ProviderTypeMappings>) -> Self {
        Self {
            provider,
            plugins: Vec::new(),
            cache: DashMap::new(),
        }
    }

    /// Create a source with plugins, consulted in order after the provider.
    pub fn with_plugins(
        provider: Arc<dyn ProviderTypeMappings>,
        plugins: Vec<Arc<dyn TypeMappingSourcePlugin>>,
    ) -> Self {
        Self {
            provider,
            plugins,
            cache: DashMap::new(),
        }
    }

    /// Provider identifier.
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Number of cached resolutions (including cached misses).
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn resolve(&self, info: &TypeMappingInfo) -> Option<RelationalTypeMapping> {
        if let Some(mapping) = self.provider.find_mapping(info) {
            return Some(mapping);
        }

        let mapping = self.plugins.iter().find_map(|plugin| plugin.find_mapping(info));
        if mapping.is_none() {
            debug!(
                "No {} type mapping for {:?} / {:?}",
                self.provider.provider_name(),
                info.value_type,
                info.store_type_name
            );
        }
        mapping
    }
}

impl fmt::Debug for RelationalTypeMappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalTypeMappingSource")
            .field("provider", &self.provider.provider_name())
            .field("plugins", &self.plugins.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl TypeMappingSource for RelationalTypeMappingSource {
    fn find_mapping(&self, info: &TypeMappingInfo) -> Option<Arc<RelationalTypeMapping>> {
        if let Some(cached) = self.cache.get(info) {
            return cached.value().clone();
        }

        let resolved = self.resolve(info).map(Arc::new);
        self.cache.insert(info.clone(), resolved.clone());
        resolved
    }
}
