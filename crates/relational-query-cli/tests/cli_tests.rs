//! CLI integration tests for relq.
//!
//! These tests verify argument parsing, command output, and exit codes for
//! the main error classes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the relq binary.
fn cmd() -> Command {
    Command::cargo_bin("relq").unwrap()
}

const QUERY_FILE: &str = r#"{
  "model": {
    "entity_types": [
      {
        "name": "Blog",
        "table": "Blogs",
        "key": ["BlogId"],
        "properties": [
          { "name": "BlogId", "value_type": "int32" },
          { "name": "Title", "value_type": "string", "max_length": 200 }
        ]
      }
    ]
  },
  "query": {
    "source": { "kind": "entity", "entity": "Blog" },
    "predicate": {
      "kind": "binary",
      "operator": "equal",
      "left": { "kind": "property", "name": "BlogId" },
      "right": { "kind": "parameter", "name": "id", "value_type": "int32" }
    },
    "projection": [
      { "alias": "Title", "expression": { "kind": "property", "name": "Title" } }
    ],
    "parameters": { "id": { "i32": 7 } }
  }
}"#;

fn temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("history-script"))
        .stdout(predicate::str::contains("type-map"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("relq"));
}

#[test]
fn test_global_flags_listed() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--dialect"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"));
}

#[test]
fn test_no_subcommand_shows_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// translate
// =============================================================================

#[test]
fn test_translate_postgres() {
    let file = temp_file(QUERY_FILE);
    cmd()
        .args(["--dialect", "postgres", "translate", "--query"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("SELECT \"b\".\"Title\"\nFROM \"Blogs\" AS \"b\""))
        .stdout(predicate::str::contains("WHERE \"b\".\"BlogId\" = $1"));
}

#[test]
fn test_translate_mssql_json_output() {
    let file = temp_file(QUERY_FILE);
    cmd()
        .args(["--dialect", "sqlserver", "--output-json", "translate", "--query"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command_text\""))
        .stdout(predicate::str::contains("[b].[BlogId] = @id"))
        .stdout(predicate::str::contains("\"store_type\": \"int\""));
}

#[test]
fn test_translate_untranslatable_method_exits_with_code_3() {
    let file = temp_file(&QUERY_FILE.replace(
        r#"{ "kind": "property", "name": "Title" }"#,
        r#"{ "kind": "method_call", "instance": { "kind": "property", "name": "Title" }, "method": { "declaring_type": "String", "name": "Soundex" } }"#,
    ));
    cmd()
        .args(["translate", "--query"])
        .arg(file.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("String.Soundex"));
}

#[test]
fn test_translate_invalid_json_exits_with_code_2() {
    let file = temp_file("{ not json");
    cmd()
        .args(["translate", "--query"])
        .arg(file.path())
        .assert()
        .code(2);
}

#[test]
fn test_translate_missing_file_exits_with_code_1() {
    cmd()
        .args(["translate", "--query", "nonexistent_query.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

// =============================================================================
// history-script
// =============================================================================

#[test]
fn test_history_create_script_postgres() {
    cmd()
        .args(["--dialect", "pg", "history-script", "create"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("CREATE TABLE \"__EFMigrationsHistory\" ("))
        .stdout(predicate::str::contains("\"MigrationId\" character varying(150) NOT NULL"));
}

#[test]
fn test_history_insert_script_mssql_has_batch_terminator() {
    cmd()
        .args([
            "--dialect",
            "mssql",
            "history-script",
            "insert",
            "--migration-id",
            "20240101_Init",
            "--product-version",
            "8.0.0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALUES (N'20240101_Init', N'8.0.0');"))
        .stdout(predicate::str::ends_with("GO\n"));
}

#[test]
fn test_history_delete_requires_migration_id() {
    cmd()
        .args(["history-script", "delete"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--migration-id is required"));
}

#[test]
fn test_history_script_uses_configured_table() {
    let config = temp_file("provider: mssql\nmigrations:\n  history_table: schema_history\n  schema: ops\n");
    cmd()
        .arg("--config")
        .arg(config.path())
        .args(["history-script", "create-if-not-exists"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ops].[schema_history]"));
}

// =============================================================================
// type-map
// =============================================================================

#[test]
fn test_type_map_string_per_dialect() {
    cmd()
        .args(["--dialect", "postgres", "type-map", "string", "--max-length", "50"])
        .assert()
        .success()
        .stdout("character varying(50)\n");

    cmd()
        .args(["--dialect", "mssql", "type-map", "string"])
        .assert()
        .success()
        .stdout("nvarchar(max)\n");
}

#[test]
fn test_type_map_decimal_facets() {
    cmd()
        .args(["type-map", "decimal", "--precision", "10", "--scale", "2"])
        .assert()
        .success()
        .stdout("numeric(10,2)\n");
}

#[test]
fn test_type_map_unknown_type_exits_with_code_2() {
    cmd()
        .args(["type-map", "hyperloglog"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown value type"));
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn test_unknown_dialect_exits_with_code_2() {
    cmd()
        .args(["--dialect", "oracle", "type-map", "int32"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let config = temp_file("provider: [unclosed");
    cmd()
        .arg("--config")
        .arg(config.path())
        .args(["type-map", "int32"])
        .assert()
        .code(2);
}

#[test]
fn test_negative_retry_count_exits_with_code_2() {
    let config = temp_file("retry:\n  max_retry_count: -1\n");
    cmd()
        .arg("--config")
        .arg(config.path())
        .args(["type-map", "int32"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_retry_count"));
}
