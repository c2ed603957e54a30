//! End-to-end translation tests: logical query in, provider SQL out.

use std::rc::Rc;
use std::sync::Arc;

use relational_query::expressions::{BinaryOperator, SqlFunctionExpression};
use relational_query::query::translators::{MethodCallTranslator, MethodCallTranslatorPlugin};
use relational_query::query::{
    AggregateSelector, GroupBy, MethodInfo, QuerySource, SqlExpressionFactory,
};
use relational_query::{
    EntityType, Expression, LogicalQuery, Model, Property, ProviderCatalog, QueryError, SqlExpr,
    SqlValue, ValueType,
};

fn model() -> Arc<Model> {
    Arc::new(
        Model::new()
            .with_entity(
                EntityType::new("Blog")
                    .with_table("Blogs")
                    .with_key("BlogId")
                    .with_property(Property::new("BlogId", ValueType::Int32))
                    .with_property(Property::new("Title", ValueType::String).with_max_length(200))
                    .with_property(Property::new("Rating", ValueType::Int32).nullable()),
            )
            .with_entity(
                EntityType::new("Post")
                    .with_table("Posts")
                    .with_schema("blogging")
                    .with_key("PostId")
                    .with_property(Property::new("PostId", ValueType::Int32))
                    .with_property(Property::new("BlogId", ValueType::Int32))
                    .with_property(
                        Property::new("Price", ValueType::Decimal).with_precision(10, 2),
                    ),
            ),
    )
}

fn title_starts_with(prefix: &str) -> Expression {
    Expression::call(
        Some(Expression::property("Title")),
        "String",
        "StartsWith",
        vec![Expression::constant(prefix)],
    )
}

// =============================================================================
// Dialect-specific SQL
// =============================================================================

#[test]
fn test_postgres_paging_and_parameters() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("postgres", model()).unwrap();

    let query = LogicalQuery::from_entity("Blog")
        .filter(Expression::binary(
            BinaryOperator::GreaterThan,
            Expression::property("Rating"),
            Expression::parameter("minRating", ValueType::Int32),
        ))
        .select("Title", Expression::property("Title"))
        .order_by(Expression::property("Title"), false)
        .skip(Expression::constant(20))
        .take(Expression::constant(10))
        .with_parameter("minRating", 3);

    let command = session.compile(&query).unwrap();
    assert_eq!(
        command.command_text,
        "SELECT \"b\".\"Title\"\nFROM \"Blogs\" AS \"b\"\nWHERE \"b\".\"Rating\" > $1\nORDER BY \"b\".\"Title\"\nLIMIT 10 OFFSET 20"
    );
    assert_eq!(command.parameters[0].value, SqlValue::I32(3));
}

#[test]
fn test_mssql_offset_fetch() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("sqlserver", model()).unwrap();

    let query = LogicalQuery::from_entity("Blog")
        .select("Title", Expression::property("Title"))
        .skip(Expression::constant(20))
        .take(Expression::constant(10));

    let command = session.compile(&query).unwrap();
    assert_eq!(
        command.command_text,
        "SELECT [b].[Title]\nFROM [Blogs] AS [b]\nORDER BY (SELECT 1)\nOFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );
}

#[test]
fn test_schema_qualified_table() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("mssql", model()).unwrap();

    let command = session
        .compile(&LogicalQuery::from_entity("Post").select("Id", Expression::property("PostId")))
        .unwrap();
    assert_eq!(
        command.command_text,
        "SELECT [p].[PostId] AS [Id]\nFROM [blogging].[Posts] AS [p]"
    );
}

#[test]
fn test_string_methods_translate_per_dialect() {
    let catalog = ProviderCatalog::with_builtins();
    let query = LogicalQuery::from_entity("Blog")
        .filter(title_starts_with("EF"))
        .select(
            "Len",
            Expression::call(Some(Expression::property("Title")), "String", "Length", vec![]),
        );

    let pg = catalog.create_session("postgres", model()).unwrap().compile(&query).unwrap();
    assert!(pg.command_text.contains("length(\"b\".\"Title\")"), "{}", pg.command_text);
    assert!(pg.command_text.contains("LIKE 'EF%'"), "{}", pg.command_text);

    let ms = catalog.create_session("mssql", model()).unwrap().compile(&query).unwrap();
    assert!(ms.command_text.contains("LEN([b].[Title])"), "{}", ms.command_text);
    assert!(ms.command_text.contains("LIKE N'EF%'"), "{}", ms.command_text);
}

fn title_call(method: &str, parameter: &str) -> Expression {
    Expression::call(
        Some(Expression::property("Title")),
        "String",
        method,
        vec![Expression::parameter(parameter, ValueType::String)],
    )
}

#[test]
fn test_starts_with_parameter_compares_literally() {
    let catalog = ProviderCatalog::with_builtins();
    let query = LogicalQuery::from_entity("Blog")
        .filter(title_call("StartsWith", "prefix"))
        .select("Title", Expression::property("Title"))
        .with_parameter("prefix", "a_");

    let pg = catalog.create_session("postgres", model()).unwrap().compile(&query).unwrap();
    assert!(
        pg.command_text.ends_with("WHERE left(\"b\".\"Title\", length($1)) = $1"),
        "{}",
        pg.command_text
    );
    assert!(!pg.command_text.contains("LIKE"));
    assert_eq!(pg.parameters.len(), 1);
    assert_eq!(pg.parameters[0].value, SqlValue::Text("a_".into()));
    assert_eq!(pg.parameters[0].store_type.as_deref(), Some("character varying(200)"));

    let ms = catalog.create_session("mssql", model()).unwrap().compile(&query).unwrap();
    assert!(
        ms.command_text.ends_with("WHERE LEFT([b].[Title], LEN(@prefix)) = @prefix"),
        "{}",
        ms.command_text
    );
    assert_eq!(ms.parameters[0].store_type.as_deref(), Some("nvarchar(200)"));
}

#[test]
fn test_ends_with_parameter_compares_suffix() {
    let catalog = ProviderCatalog::with_builtins();
    let query = LogicalQuery::from_entity("Blog")
        .filter(title_call("EndsWith", "suffix"))
        .select("Title", Expression::property("Title"))
        .with_parameter("suffix", "%");

    let pg = catalog.create_session("postgres", model()).unwrap().compile(&query).unwrap();
    assert!(
        pg.command_text.ends_with("WHERE right(\"b\".\"Title\", length($1)) = $1"),
        "{}",
        pg.command_text
    );
}

#[test]
fn test_contains_parameter_handles_empty_search_on_mssql() {
    let catalog = ProviderCatalog::with_builtins();
    let query = LogicalQuery::from_entity("Blog")
        .filter(title_call("Contains", "s"))
        .select("Title", Expression::property("Title"))
        .with_parameter("s", "");

    let ms = catalog.create_session("mssql", model()).unwrap().compile(&query).unwrap();
    assert!(ms.command_text.contains("@s LIKE N''"), "{}", ms.command_text);
    assert!(
        ms.command_text.contains("OR CHARINDEX(@s, [b].[Title]) > 0"),
        "{}",
        ms.command_text
    );
    assert_eq!(ms.parameters.len(), 1);

    let pg = catalog.create_session("postgres", model()).unwrap().compile(&query).unwrap();
    assert!(
        pg.command_text.ends_with("WHERE strpos(\"b\".\"Title\", $1) > 0"),
        "{}",
        pg.command_text
    );
}

#[test]
fn test_untranslatable_method_names_method_and_arity() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("postgres", model()).unwrap();
    let query = LogicalQuery::from_entity("Blog").select(
        "S",
        Expression::call(
            Some(Expression::property("Title")),
            "String",
            "Soundex",
            vec![Expression::constant(1)],
        ),
    );

    let err = session.compile(&query).unwrap_err();
    assert!(matches!(err, QueryError::Translation { .. }));
    let message = err.to_string();
    assert!(message.contains("String.Soundex"), "{}", message);
    assert!(message.contains("1 argument"), "{}", message);
}

// =============================================================================
// Grouping and raw SQL
// =============================================================================

#[test]
fn test_group_by_with_aggregates() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("postgres", model()).unwrap();

    let mut query = LogicalQuery::from_entity("Post");
    query.group_by = Some(GroupBy {
        key: Expression::property("BlogId"),
        key_alias: "BlogId".into(),
        aggregates: vec![
            AggregateSelector {
                alias: "Posts".into(),
                method: "Count".into(),
                selector: None,
            },
            AggregateSelector {
                alias: "Total".into(),
                method: "Sum".into(),
                selector: Some(Expression::property("Price")),
            },
        ],
    });

    let command = session.compile(&query).unwrap();
    assert_eq!(
        command.command_text,
        "SELECT \"p\".\"BlogId\", COUNT(*) AS \"Posts\", SUM(\"p\".\"Price\") AS \"Total\"\nFROM \"blogging\".\"Posts\" AS \"p\"\nGROUP BY \"p\".\"BlogId\""
    );
}

#[test]
fn test_raw_sql_source_mssql() {
    let catalog = ProviderCatalog::with_builtins();
    let session = catalog.create_session("mssql", model()).unwrap();

    let mut query = LogicalQuery::from_entity("Blog")
        .select("Title", Expression::property("Title"))
        .filter(title_starts_with("A"));
    query.source = QuerySource::Sql {
        entity: "Blog".into(),
        sql: "SELECT * FROM [Blogs] WHERE [Rating] BETWEEN {0} AND {1}".into(),
        arguments: vec![SqlValue::I32(1), SqlValue::I32(5)],
    };

    let command = session.compile(&query).unwrap();
    assert!(command.command_text.starts_with(
        "SELECT [b].[Title]\nFROM (\n    SELECT * FROM [Blogs] WHERE [Rating] BETWEEN @p0 AND @p1\n) AS [b]\nWHERE "
    ));
    let names: Vec<_> = command.parameters.iter().map(|p| p.invariant_name.as_str()).collect();
    assert_eq!(names, vec!["p0", "p1"]);
}

// =============================================================================
// Plugins
// =============================================================================

struct SoundexTranslator;

impl MethodCallTranslator for SoundexTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        _factory: &SqlExpressionFactory,
    ) -> relational_query::Result<Option<SqlExpr>> {
        if !method.is("Functions", "Soundex") || arguments.len() != 1 {
            return Ok(None);
        }
        let function = SqlFunctionExpression::new("SOUNDEX", arguments.to_vec(), true, vec![true])?;
        Ok(Some(SqlExpr::function(function, ValueType::String, None)))
    }
}

struct SoundexPlugin;

impl MethodCallTranslatorPlugin for SoundexPlugin {
    fn translators(&self) -> Vec<Rc<dyn MethodCallTranslator>> {
        vec![Rc::new(SoundexTranslator)]
    }
}

#[test]
fn test_method_plugin_extends_translation() {
    let mut catalog = ProviderCatalog::with_builtins();
    catalog.register_method_plugin(
        "pg",
        Arc::new(|| Box::new(SoundexPlugin) as Box<dyn MethodCallTranslatorPlugin>),
    );

    let query = LogicalQuery::from_entity("Blog").select(
        "Sound",
        Expression::call(None, "Functions", "Soundex", vec![Expression::property("Title")]),
    );

    let pg = catalog.create_session("postgres", model()).unwrap();
    assert_eq!(pg.method_translators().len(), 5);
    assert_eq!(
        pg.compile(&query).unwrap().command_text,
        "SELECT SOUNDEX(\"b\".\"Title\") AS \"Sound\"\nFROM \"Blogs\" AS \"b\""
    );

    // Plugins are per provider.
    let ms = catalog.create_session("mssql", model()).unwrap();
    assert!(ms.compile(&query).is_err());
}

#[test]
fn test_query_from_json() {
    let json = r#"{
        "source": { "kind": "entity", "entity": "Blog" },
        "predicate": {
            "kind": "binary",
            "operator": "equal",
            "left": { "kind": "property", "name": "BlogId" },
            "right": { "kind": "parameter", "name": "id", "value_type": "int32" }
        },
        "parameters": { "id": { "i32": 7 } }
    }"#;
    let query: LogicalQuery = serde_json::from_str(json).unwrap();

    let catalog = ProviderCatalog::with_builtins();
    let command = catalog.create_session("mssql", model()).unwrap().compile(&query).unwrap();
    assert!(command.command_text.ends_with("WHERE [b].[BlogId] = @id"));
    assert_eq!(command.parameters[0].value, SqlValue::I32(7));
    assert_eq!(command.parameters[0].store_type.as_deref(), Some("int"));
}
