//! Entity and column metadata consumed by translation.
//!
//! Building a model (conventions, annotations) happens elsewhere; this is the
//! read-only shape the translation pipeline works against.

use serde::{Deserialize, Serialize};

use crate::core::types::ValueType;
use crate::error::{QueryError, Result};
use crate::typemap::TypeMappingInfo;

/// A set of mapped entity types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub entity_types: Vec<EntityType>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type.
    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.entity_types.push(entity);
        self
    }

    /// Find an entity type by name.
    pub fn find_entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    /// Find an entity type by name, returning an error if it is not mapped.
    pub fn require_entity_type(&self, name: &str) -> Result<&EntityType> {
        self.find_entity_type(name).ok_or_else(|| {
            QueryError::translation(name, "entity type is not part of the model")
        })
    }
}

/// A mapped entity type and the table it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Names of the key properties.
    #[serde(default)]
    pub key: Vec<String>,
}

impl EntityType {
    /// Entity mapped to a table of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            schema: None,
            properties: Vec::new(),
            key: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_key(mut self, name: impl Into<String>) -> Self {
        self.key.push(name.into());
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Whether the named property is part of the key.
    pub fn is_key(&self, property: &str) -> bool {
        self.key.iter().any(|k| k == property)
    }

    /// Lower-cased first letter of the table, used as the SQL alias.
    pub fn table_alias(&self) -> String {
        self.table
            .chars()
            .find(|c| c.is_alphabetic())
            .map(|c| c.to_lowercase().to_string())
            .unwrap_or_else(|| "t".to_string())
    }
}

/// A mapped scalar property and its column facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub column_name: Option<String>,
    pub value_type: ValueType,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default)]
    pub is_unicode: Option<bool>,
    #[serde(default)]
    pub is_fixed_length: Option<bool>,
    /// Explicit store type, overriding the provider default.
    #[serde(default)]
    pub column_type: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            column_name: None,
            value_type,
            is_nullable: false,
            max_length: None,
            precision: None,
            scale: None,
            is_unicode: None,
            is_fixed_length: None,
            column_type: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn with_column_name(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn with_unicode(mut self, is_unicode: bool) -> Self {
        self.is_unicode = Some(is_unicode);
        self
    }

    pub fn with_column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Column name, defaulting to the property name.
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.name)
    }

    /// Facets for resolving this property's type mapping.
    pub fn type_mapping_info(&self, is_key: bool) -> TypeMappingInfo {
        let base = match &self.column_type {
            Some(store_type) => TypeMappingInfo::for_store_type(store_type.clone())
                .with_value_type(self.value_type.clone()),
            None => TypeMappingInfo::for_type(self.value_type.clone())
                .with_size(self.max_length)
                .with_precision(self.precision, self.scale),
        };
        base.with_unicode(self.is_unicode)
            .with_fixed_length(self.is_fixed_length)
            .with_key_or_index(is_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> EntityType {
        EntityType::new("Blog")
            .with_table("Blogs")
            .with_key("Id")
            .with_property(Property::new("Id", ValueType::Int32))
            .with_property(
                Property::new("Title", ValueType::String)
                    .with_max_length(200)
                    .with_column_name("title"),
            )
    }

    #[test]
    fn test_lookup() {
        let model = Model::new().with_entity(blog());
        let entity = model.require_entity_type("Blog").unwrap();
        assert_eq!(entity.find_property("Title").unwrap().column(), "title");
        assert!(entity.is_key("Id"));
        assert_eq!(entity.table_alias(), "b");
        assert!(model.require_entity_type("Post").is_err());
    }

    #[test]
    fn test_type_mapping_info_from_facets() {
        let entity = blog();
        let info = entity.find_property("Title").unwrap().type_mapping_info(false);
        assert_eq!(info.value_type, Some(ValueType::String));
        assert_eq!(info.size, Some(200));

        let explicit = Property::new("Price", ValueType::Decimal).with_column_type("money");
        let info = explicit.type_mapping_info(false);
        assert_eq!(info.store_type_name.as_deref(), Some("money"));
        assert_eq!(info.value_type, Some(ValueType::Decimal));
    }

    #[test]
    fn test_model_from_json() {
        let json = r#"{
            "entity_types": [{
                "name": "Blog",
                "table": "Blogs",
                "key": ["Id"],
                "properties": [
                    {"name": "Id", "value_type": "int32"},
                    {"name": "Url", "value_type": "string", "is_nullable": true}
                ]
            }]
        }"#;
        let model: Model = serde_json::from_str(json).unwrap();
        let url = model.entity_types[0].find_property("Url").unwrap();
        assert!(url.is_nullable);
        assert_eq!(url.column(), "Url");
    }
}
