//! History repository over a [`Dialect`] and a [`MigrationConnection`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::connection::{MigrationConnection, Row};
use super::history::{
    AsyncHistoryRepository, HistoryRepository, HistoryRow, LockReleaseBehavior, DEFAULT_TABLE_NAME,
};
use super::lock::DatabaseLock;
use crate::core::identifier::validate_identifier;
use crate::core::traits::Dialect;
use crate::core::types::ValueType;
use crate::core::value::SqlValue;
use crate::error::{QueryError, Result};
use crate::storage::IndentedStringBuilder;
use crate::typemap::{RelationalTypeMapping, TypeMappingInfo, TypeMappingSource};

const MIGRATION_ID_COLUMN: &str = "MigrationId";
const PRODUCT_VERSION_COLUMN: &str = "ProductVersion";
const MIGRATION_ID_MAX_LENGTH: u32 = 150;
const PRODUCT_VERSION_MAX_LENGTH: u32 = 32;

/// Where the history table lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRepositoryOptions {
    pub table_name: String,
    pub schema: Option<String>,
}

impl Default for HistoryRepositoryOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            schema: None,
        }
    }
}

/// [`HistoryRepository`] that renders its SQL through a provider dialect and
/// runs it on a [`MigrationConnection`].
pub struct RelationalHistoryRepository {
    dialect: Arc<dyn Dialect>,
    connection: Arc<dyn MigrationConnection>,
    options: HistoryRepositoryOptions,
    migration_id_mapping: Arc<RelationalTypeMapping>,
    product_version_mapping: Arc<RelationalTypeMapping>,
}

impl RelationalHistoryRepository {
    /// Column store types are resolved once, here.
    pub fn new(
        dialect: Arc<dyn Dialect>,
        type_mappings: &dyn TypeMappingSource,
        connection: Arc<dyn MigrationConnection>,
        options: HistoryRepositoryOptions,
    ) -> Result<Self> {
        validate_identifier(&options.table_name)?;
        if let Some(schema) = &options.schema {
            validate_identifier(schema)?;
        }

        let string_mapping = |max_length: u32, is_key: bool| {
            let info = TypeMappingInfo::for_type(ValueType::String)
                .with_size(Some(max_length))
                .with_key_or_index(is_key);
            type_mappings.find_mapping(&info).ok_or_else(|| {
                QueryError::Config(format!(
                    "Provider '{}' has no mapping for string columns",
                    dialect.name()
                ))
            })
        };
        let migration_id_mapping = string_mapping(MIGRATION_ID_MAX_LENGTH, true)?;
        let product_version_mapping = string_mapping(PRODUCT_VERSION_MAX_LENGTH, false)?;

        Ok(Self {
            dialect,
            connection,
            options,
            migration_id_mapping,
            product_version_mapping,
        })
    }

    pub fn options(&self) -> &HistoryRepositoryOptions {
        &self.options
    }

    fn schema(&self) -> Option<&str> {
        self.options.schema.as_deref()
    }

    fn table_sql(&self) -> String {
        self.dialect.qualify(self.schema(), &self.options.table_name)
    }

    fn lock_resource(&self) -> String {
        match self.schema() {
            Some(schema) => format!("{}.{}", schema, self.options.table_name),
            None => self.options.table_name.clone(),
        }
    }

    fn migration_id_literal(&self, migration_id: &str) -> String {
        self.migration_id_mapping
            .generate_sql_literal(&SqlValue::from(migration_id))
    }

    fn exists_condition(&self, migration_id: &str) -> String {
        format!(
            "EXISTS(SELECT * FROM {} WHERE {} = {})",
            self.table_sql(),
            self.dialect.quote_ident(MIGRATION_ID_COLUMN),
            self.migration_id_literal(migration_id)
        )
    }

    fn applied_migrations_sql(&self) -> String {
        let migration_id = self.dialect.quote_ident(MIGRATION_ID_COLUMN);
        format!(
            "SELECT {}, {}\nFROM {}\nORDER BY {};",
            migration_id,
            self.dialect.quote_ident(PRODUCT_VERSION_COLUMN),
            self.table_sql(),
            migration_id
        )
    }

    fn check_lock_result(&self, result: &SqlValue) -> Result<()> {
        // sp_getapplock reports failure with a negative return code.
        match result.as_i64() {
            Some(code) if code < 0 => Err(QueryError::database(
                format!(
                    "Failed to acquire migrations lock on {} (result {})",
                    self.lock_resource(),
                    code
                ),
                None,
            )),
            _ => Ok(()),
        }
    }

    fn new_lock(&self) -> DatabaseLock {
        DatabaseLock::new(
            self.connection.clone(),
            self.dialect.release_lock_sql(&self.lock_resource()),
            self.lock_release_behavior(),
        )
    }
}

/// Truthiness of an existence probe result.
fn scalar_is_true(value: &SqlValue) -> bool {
    match value {
        SqlValue::Null => false,
        SqlValue::Bool(b) => *b,
        other => other.as_i64().map_or(true, |n| n != 0),
    }
}

fn rows_to_history(rows: Vec<Row>) -> Result<Vec<HistoryRow>> {
    rows.into_iter()
        .map(|row| match (row.first().and_then(SqlValue::as_str), row.get(1).and_then(SqlValue::as_str)) {
            (Some(id), Some(version)) => Ok(HistoryRow::new(id, version)),
            _ => Err(QueryError::database(
                format!("Unexpected history row shape: {:?}", row),
                None,
            )),
        })
        .collect()
}

impl HistoryRepository for RelationalHistoryRepository {
    fn exists(&self) -> Result<bool> {
        let sql = self.dialect.table_exists_sql(self.schema(), &self.options.table_name);
        Ok(scalar_is_true(&self.connection.execute_scalar(&sql)?))
    }

    fn create(&self) -> Result<()> {
        self.connection.execute_non_query(&self.get_create_script())?;
        info!("Created migrations history table {}", self.table_sql());
        Ok(())
    }

    fn create_if_not_exists(&self) -> Result<bool> {
        if self.exists()? {
            debug!("Migrations history table {} already exists", self.table_sql());
            return Ok(false);
        }
        self.create()?;
        Ok(true)
    }

    fn get_applied_migrations(&self) -> Result<Vec<HistoryRow>> {
        if !self.exists()? {
            return Ok(Vec::new());
        }
        rows_to_history(self.connection.query_rows(&self.applied_migrations_sql())?)
    }

    fn acquire_database_lock(&self) -> Result<DatabaseLock> {
        let sql = self.dialect.acquire_lock_sql(&self.lock_resource());
        let result = self.connection.execute_scalar(&sql)?;
        self.check_lock_result(&result)?;
        info!("Acquired migrations lock on {}", self.lock_resource());
        Ok(self.new_lock())
    }

    fn lock_release_behavior(&self) -> LockReleaseBehavior {
        LockReleaseBehavior::Connection
    }

    fn get_create_script(&self) -> String {
        let table = &self.options.table_name;
        let mut builder = IndentedStringBuilder::new();
        builder.append_line(&format!("CREATE TABLE {} (", self.table_sql()));
        builder.increment_indent();
        builder.append_line(&format!(
            "{} {} NOT NULL,",
            self.dialect.quote_ident(MIGRATION_ID_COLUMN),
            self.migration_id_mapping.store_type
        ));
        builder.append_line(&format!(
            "{} {} NOT NULL,",
            self.dialect.quote_ident(PRODUCT_VERSION_COLUMN),
            self.product_version_mapping.store_type
        ));
        builder.append_line(&format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.dialect.quote_ident(&format!("PK_{}", table)),
            self.dialect.quote_ident(MIGRATION_ID_COLUMN)
        ));
        builder.decrement_indent();
        builder.append_line(");");
        builder.to_string()
    }

    fn get_create_if_not_exists_script(&self) -> String {
        let mut script = self.dialect.create_table_if_not_exists(
            self.schema(),
            &self.options.table_name,
            &self.get_create_script(),
        );
        if !script.ends_with('\n') {
            script.push('\n');
        }
        script
    }

    fn get_insert_script(&self, row: &HistoryRow) -> String {
        format!(
            "INSERT INTO {} ({}, {})\nVALUES ({}, {});\n",
            self.table_sql(),
            self.dialect.quote_ident(MIGRATION_ID_COLUMN),
            self.dialect.quote_ident(PRODUCT_VERSION_COLUMN),
            self.migration_id_literal(&row.migration_id),
            self.product_version_mapping
                .generate_sql_literal(&SqlValue::from(row.product_version.as_str()))
        )
    }

    fn get_delete_script(&self, migration_id: &str) -> String {
        format!(
            "DELETE FROM {}\nWHERE {} = {};\n",
            self.table_sql(),
            self.dialect.quote_ident(MIGRATION_ID_COLUMN),
            self.migration_id_literal(migration_id)
        )
    }

    fn get_begin_if_not_exists_script(&self, migration_id: &str) -> String {
        let condition = format!("NOT {}", self.exists_condition(migration_id));
        format!("{}\n", self.dialect.begin_if(&condition))
    }

    fn get_begin_if_exists_script(&self, migration_id: &str) -> String {
        format!("{}\n", self.dialect.begin_if(&self.exists_condition(migration_id)))
    }

    fn get_end_if_script(&self) -> String {
        format!("{}\n", self.dialect.end_if())
    }
}

#[async_trait]
impl AsyncHistoryRepository for RelationalHistoryRepository {
    async fn exists_async(&self) -> Result<bool> {
        let sql = self.dialect.table_exists_sql(self.schema(), &self.options.table_name);
        Ok(scalar_is_true(&self.connection.execute_scalar_async(&sql).await?))
    }

    async fn create_async(&self) -> Result<()> {
        self.connection
            .execute_non_query_async(&self.get_create_script())
            .await?;
        info!("Created migrations history table {}", self.table_sql());
        Ok(())
    }

    async fn create_if_not_exists_async(&self) -> Result<bool> {
        if self.exists_async().await? {
            debug!("Migrations history table {} already exists", self.table_sql());
            return Ok(false);
        }
        self.create_async().await?;
        Ok(true)
    }

    async fn get_applied_migrations_async(&self) -> Result<Vec<HistoryRow>> {
        if !self.exists_async().await? {
            return Ok(Vec::new());
        }
        let rows = self
            .connection
            .query_rows_async(&self.applied_migrations_sql())
            .await?;
        rows_to_history(rows)
    }

    async fn acquire_database_lock_async(&self) -> Result<DatabaseLock> {
        let sql = self.dialect.acquire_lock_sql(&self.lock_resource());
        let result = self.connection.execute_scalar_async(&sql).await?;
        self.check_lock_result(&result)?;
        info!("Acquired migrations lock on {}", self.lock_resource());
        Ok(self.new_lock())
    }
}
