use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::{ExpressionKind, SqlExpr};

/// The session a query root was created by.
///
/// Roots keep a handle to their provider while the query is live; cached and
/// precompiled plans hold detached roots instead.
pub trait QueryProvider: Send + Sync + fmt::Debug {
    /// Provider identifier (e.g., "postgres").
    fn provider_name(&self) -> &str;
}

/// Root of a queryable sequence backed by raw SQL.
#[derive(Clone)]
pub struct SqlQueryRootExpression {
    /// Entity type name of the elements.
    pub element_type: String,
    /// Raw SQL text.
    pub sql: String,
    /// Parameter object holding the SQL's arguments.
    pub argument: SqlExpr,
    query_provider: Option<Arc<dyn QueryProvider>>,
}

impl SqlQueryRootExpression {
    pub fn new(
        element_type: impl Into<String>,
        sql: impl Into<String>,
        argument: SqlExpr,
        query_provider: Option<Arc<dyn QueryProvider>>,
    ) -> Self {
        Self {
            element_type: element_type.into(),
            sql: sql.into(),
            argument,
            query_provider,
        }
    }

    pub fn query_provider(&self) -> Option<&Arc<dyn QueryProvider>> {
        self.query_provider.as_ref()
    }

    pub(crate) fn with_argument(&self, argument: SqlExpr) -> Self {
        Self {
            argument,
            ..self.clone()
        }
    }
}

impl SqlExpr {
    /// Provider-free copy of a query root; other nodes are returned as is.
    pub fn detach_query_provider(&self) -> SqlExpr {
        match self.kind() {
            ExpressionKind::QueryRoot(root) if root.query_provider.is_some() => {
                let detached = SqlQueryRootExpression {
                    query_provider: None,
                    ..root.clone()
                };
                SqlExpr::new(
                    ExpressionKind::QueryRoot(detached),
                    self.value_type().clone(),
                    self.type_mapping().cloned(),
                )
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Debug for SqlQueryRootExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlQueryRootExpression")
            .field("element_type", &self.element_type)
            .field("sql", &self.sql)
            .field("argument", &self.argument)
            .field(
                "query_provider",
                &self.query_provider.as_ref().map(|p| p.provider_name()),
            )
            .finish()
    }
}

impl PartialEq for SqlQueryRootExpression {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type
            && self.sql == other.sql
            && self.argument == other.argument
    }
}

impl Hash for SqlQueryRootExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.element_type.hash(state);
        self.sql.hash(state);
        self.argument.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ValueType;

    #[derive(Debug)]
    struct TestProvider;

    impl QueryProvider for TestProvider {
        fn provider_name(&self) -> &str {
            "test"
        }
    }

    fn root(provider: Option<Arc<dyn QueryProvider>>) -> SqlExpr {
        SqlExpr::query_root(SqlQueryRootExpression::new(
            "Blog",
            "SELECT * FROM Blogs WHERE Rating > {0}",
            SqlExpr::parameter("p", ValueType::Object, None, false),
            provider,
        ))
    }

    #[test]
    fn test_detach_removes_provider() {
        let attached = root(Some(Arc::new(TestProvider)));
        let detached = attached.detach_query_provider();

        let ExpressionKind::QueryRoot(r) = detached.kind() else {
            panic!("expected query root");
        };
        assert!(r.query_provider().is_none());
        assert!(!detached.ptr_eq(&attached));
        assert_eq!(detached, attached);
    }

    #[test]
    fn test_detach_is_noop_without_provider() {
        let detached = root(None);
        assert!(detached.detach_query_provider().ptr_eq(&detached));
    }

    #[test]
    fn test_value_type_is_sequence_of_entity() {
        assert_eq!(
            root(None).value_type(),
            &ValueType::sequence_of(ValueType::Entity("Blog".into()))
        );
    }
}
