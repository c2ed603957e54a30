//! History script rendering without a live database.

use std::sync::Arc;

use async_trait::async_trait;
use relational_query::migrations::Row;
use relational_query::{
    Config, Dialect, HistoryRepository, HistoryRow, MigrationConnection, ProviderCatalog, QueryError,
    SqlValue,
};

use crate::HistoryScriptKind;

/// Connection for script generation only; every statement is refused.
struct ScriptOnlyConnection;

impl ScriptOnlyConnection {
    fn refuse<T>(sql: &str) -> Result<T, QueryError> {
        Err(QueryError::Unsupported(format!(
            "relq renders scripts and does not execute them: {}",
            sql.lines().next().unwrap_or_default()
        )))
    }
}

#[async_trait]
impl MigrationConnection for ScriptOnlyConnection {
    fn execute_non_query(&self, sql: &str) -> Result<u64, QueryError> {
        Self::refuse(sql)
    }

    fn execute_scalar(&self, sql: &str) -> Result<SqlValue, QueryError> {
        Self::refuse(sql)
    }

    fn query_rows(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        Self::refuse(sql)
    }

    async fn execute_non_query_async(&self, sql: &str) -> Result<u64, QueryError> {
        Self::refuse(sql)
    }

    async fn execute_scalar_async(&self, sql: &str) -> Result<SqlValue, QueryError> {
        Self::refuse(sql)
    }

    async fn query_rows_async(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        Self::refuse(sql)
    }
}

/// Render one history script, followed by the dialect's batch terminator.
pub fn render(
    catalog: &ProviderCatalog,
    provider: &str,
    config: &Config,
    kind: HistoryScriptKind,
    migration_id: Option<&str>,
    product_version: &str,
) -> Result<String, QueryError> {
    let repository = catalog.create_history_repository(
        provider,
        Arc::new(ScriptOnlyConnection),
        config.migrations.history_options(),
    )?;

    let require_id = || {
        migration_id.ok_or_else(|| {
            QueryError::Config(format!("--migration-id is required for {:?} scripts", kind))
        })
    };

    let mut script = match kind {
        HistoryScriptKind::Create => repository.get_create_script(),
        HistoryScriptKind::CreateIfNotExists => repository.get_create_if_not_exists_script(),
        HistoryScriptKind::Insert => {
            repository.get_insert_script(&HistoryRow::new(require_id()?, product_version))
        }
        HistoryScriptKind::Delete => repository.get_delete_script(require_id()?),
    };

    let terminator = catalog.require_dialect(provider)?.batch_terminator();
    if !terminator.is_empty() {
        script.push_str(terminator);
        script.push('\n');
    }
    Ok(script)
}
