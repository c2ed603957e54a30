//! Query compilation: logical query → SQL expression tree → command.
//!
//! - [`expression`]: serializable logical queries and lambda bodies
//! - [`factory`]: mapped SQL node construction
//! - [`translators`]: method and aggregate call translation, with plugins
//! - [`pipeline`]: builds the `SELECT` tree for a logical query
//! - [`sql_generator`]: renders a tree as provider SQL
//! - [`context`]: per-session state tying the pieces together

pub mod context;
pub mod expression;
pub mod factory;
pub mod pipeline;
pub mod search_condition;
pub mod sql_generator;
pub mod translator;
pub mod translators;

pub use context::{QueryCompilationContext, SessionQueryProvider};
pub use expression::{
    AggregateSelector, Expression, GroupBy, LogicalQuery, MethodInfo, NamedExpression, OrderBy,
    QuerySource,
};
pub use factory::SqlExpressionFactory;
pub use pipeline::QueryTranslator;
pub use search_condition::SearchConditionConverter;
pub use sql_generator::QuerySqlGenerator;
pub use translator::SqlTranslator;
pub use translators::{
    AggregateMethodCallTranslator, AggregateMethodCallTranslatorPlugin, MethodCallTranslator,
    MethodCallTranslatorPlugin, RelationalAggregateMethodCallTranslatorProvider,
    RelationalMethodCallTranslatorProvider,
};
