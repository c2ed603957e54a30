//! History repository tests against an in-memory connection.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relational_query::migrations::Row;
use relational_query::{
    AsyncHistoryRepository, Config, HistoryRepository, HistoryRepositoryOptions, HistoryRow,
    MigrationConnection, ProviderCatalog, Result, SqlValue,
};

/// Connection that interprets the history scripts it receives well enough to
/// track which tables exist and which migrations were recorded.
#[derive(Default)]
struct InMemoryConnection {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    table_created: bool,
    create_calls: usize,
    rows: BTreeMap<String, String>,
    log: Vec<String>,
}

impl InMemoryConnection {
    fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    fn quoted_values(sql: &str) -> Vec<String> {
        sql.split('\'')
            .enumerate()
            .filter(|(i, _)| i % 2 == 1)
            .map(|(_, v)| v.to_string())
            .collect()
    }
}

#[async_trait]
impl MigrationConnection for InMemoryConnection {
    fn execute_non_query(&self, sql: &str) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());
        if sql.contains("CREATE TABLE") {
            state.create_calls += 1;
            state.table_created = true;
        } else if sql.starts_with("INSERT INTO") {
            let values = Self::quoted_values(sql);
            state.rows.insert(values[0].clone(), values[1].clone());
            return Ok(1);
        } else if sql.starts_with("DELETE FROM") {
            let values = Self::quoted_values(sql);
            return Ok(u64::from(state.rows.remove(&values[0]).is_some()));
        }
        Ok(0)
    }

    fn execute_scalar(&self, sql: &str) -> Result<SqlValue> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());
        if sql.contains("pg_advisory_lock") {
            return Ok(SqlValue::Null);
        }
        Ok(SqlValue::Bool(state.table_created))
    }

    fn query_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());
        Ok(state
            .rows
            .iter()
            .map(|(id, version)| vec![SqlValue::from(id.as_str()), SqlValue::from(version.as_str())])
            .collect())
    }

    async fn execute_non_query_async(&self, sql: &str) -> Result<u64> {
        self.execute_non_query(sql)
    }

    async fn execute_scalar_async(&self, sql: &str) -> Result<SqlValue> {
        self.execute_scalar(sql)
    }

    async fn query_rows_async(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_rows(sql)
    }
}

#[test]
fn test_create_if_not_exists_twice_creates_once() {
    let connection = Arc::new(InMemoryConnection::default());
    let repo = ProviderCatalog::with_builtins()
        .create_history_repository("postgres", connection.clone(), HistoryRepositoryOptions::default())
        .unwrap();

    assert!(!repo.exists().unwrap());
    repo.create_if_not_exists().unwrap();
    repo.create_if_not_exists().unwrap();

    assert!(repo.exists().unwrap());
    assert_eq!(connection.create_calls(), 1);
}

#[test]
fn test_insert_and_delete_round_through_scripts() {
    let connection = Arc::new(InMemoryConnection::default());
    let repo = ProviderCatalog::with_builtins()
        .create_history_repository("postgres", connection.clone(), HistoryRepositoryOptions::default())
        .unwrap();
    repo.create().unwrap();

    for id in ["20240201_AddPosts", "20240101_Init"] {
        connection
            .execute_non_query(&repo.get_insert_script(&HistoryRow::new(id, "8.0.1")))
            .unwrap();
    }
    assert_eq!(
        repo.get_applied_migrations().unwrap(),
        vec![
            HistoryRow::new("20240101_Init", "8.0.1"),
            HistoryRow::new("20240201_AddPosts", "8.0.1"),
        ]
    );

    connection
        .execute_non_query(&repo.get_delete_script("20240201_AddPosts"))
        .unwrap();
    assert_eq!(repo.get_applied_migrations().unwrap().len(), 1);
}

#[test]
fn test_scripts_respect_configured_table() {
    let config = Config::from_yaml(
        "provider: postgres\nmigrations:\n  history_table: schema_history\n  schema: ops\n",
    )
    .unwrap();
    let repo = ProviderCatalog::with_builtins()
        .create_history_repository(
            config.provider_name().unwrap(),
            Arc::new(InMemoryConnection::default()),
            config.migrations.history_options(),
        )
        .unwrap();

    let create = repo.get_create_script();
    assert!(create.starts_with("CREATE TABLE \"ops\".\"schema_history\" ("));
    assert!(create.contains("CONSTRAINT \"PK_schema_history\" PRIMARY KEY (\"MigrationId\")"));

    let begin = repo.get_begin_if_not_exists_script("m1");
    assert_eq!(
        begin,
        "DO $EF$\nBEGIN\n    IF NOT EXISTS(SELECT * FROM \"ops\".\"schema_history\" WHERE \"MigrationId\" = 'm1') THEN\n"
    );
    assert_eq!(repo.get_end_if_script(), "    END IF;\nEND $EF$;\n");
}

#[test]
fn test_unknown_provider_rejected() {
    let result = ProviderCatalog::with_builtins().create_history_repository(
        "oracle",
        Arc::new(InMemoryConnection::default()),
        HistoryRepositoryOptions::default(),
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_async_lock_and_history() {
    let connection = Arc::new(InMemoryConnection::default());
    let repo = ProviderCatalog::with_builtins()
        .create_history_repository("pg", connection.clone(), HistoryRepositoryOptions::default())
        .unwrap();

    let lock = repo.acquire_database_lock_async().await.unwrap();
    assert!(repo.create_if_not_exists_async().await.unwrap());
    assert!(repo.get_applied_migrations_async().await.unwrap().is_empty());
    lock.release_async().await.unwrap();
    lock.release().unwrap();

    let unlocks = connection
        .log()
        .iter()
        .filter(|sql| sql.contains("pg_advisory_unlock"))
        .count();
    assert_eq!(unlocks, 1);
}
