//! Method and aggregate call translation.
//!
//! A translator maps one logical method call to a SQL expression, or answers
//! `None` when it does not recognize the call. Providers hold the built-in
//! translators followed by the translators of every registered plugin and
//! return the first translation found.
//!
//! Plugins and providers belong to one session and are never shared between
//! threads, so translators are held in `Rc`.

mod aggregate;
mod datetime;
mod math;
mod object;
mod string;

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::Result;
use crate::expressions::SqlExpr;

use super::expression::MethodInfo;
use super::factory::SqlExpressionFactory;

pub use aggregate::QueryableAggregateMethodTranslator;
pub use datetime::DateTimeMemberTranslator;
pub use math::MathTranslator;
pub use object::EqualsTranslator;
pub use string::StringMethodTranslator;

/// Translates calls on scalar values.
pub trait MethodCallTranslator {
    /// Translate `instance.method(arguments)` (or a static call when
    /// `instance` is `None`).
    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>>;
}

/// Translates aggregate calls over a group of rows.
pub trait AggregateMethodCallTranslator {
    /// Translate `method(source, arguments)` where `source` is the grouping
    /// enumerable and `arguments` are the element selectors.
    fn translate(
        &self,
        method: &MethodInfo,
        source: &SqlExpr,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>>;
}

/// Extension contributing method call translators.
pub trait MethodCallTranslatorPlugin {
    fn translators(&self) -> Vec<Rc<dyn MethodCallTranslator>>;
}

/// Extension contributing aggregate call translators.
pub trait AggregateMethodCallTranslatorPlugin {
    fn translators(&self) -> Vec<Rc<dyn AggregateMethodCallTranslator>>;
}

/// Built-in method call translators followed by plugin translators.
pub struct RelationalMethodCallTranslatorProvider {
    translators: Vec<Rc<dyn MethodCallTranslator>>,
}

impl RelationalMethodCallTranslatorProvider {
    pub fn new(plugins: &[Box<dyn MethodCallTranslatorPlugin>]) -> Self {
        let mut translators: Vec<Rc<dyn MethodCallTranslator>> = vec![
            Rc::new(EqualsTranslator),
            Rc::new(StringMethodTranslator),
            Rc::new(MathTranslator),
            Rc::new(DateTimeMemberTranslator),
        ];
        for plugin in plugins {
            translators.extend(plugin.translators());
        }
        Self { translators }
    }

    /// Append translators after the ones already registered.
    pub fn add_translators(&mut self, translators: impl IntoIterator<Item = Rc<dyn MethodCallTranslator>>) {
        self.translators.extend(translators);
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// First translation offered by any translator.
    pub fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        for translator in &self.translators {
            if let Some(translated) = translator.translate(instance, method, arguments, factory)? {
                return Ok(Some(translated));
            }
        }
        debug!("No translator for {} with {} argument(s)", method, arguments.len());
        Ok(None)
    }
}

impl fmt::Debug for RelationalMethodCallTranslatorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalMethodCallTranslatorProvider")
            .field("translators", &self.translators.len())
            .finish()
    }
}

/// Built-in aggregate translators followed by plugin translators.
pub struct RelationalAggregateMethodCallTranslatorProvider {
    translators: Vec<Rc<dyn AggregateMethodCallTranslator>>,
}

impl RelationalAggregateMethodCallTranslatorProvider {
    pub fn new(plugins: &[Box<dyn AggregateMethodCallTranslatorPlugin>]) -> Self {
        let mut translators: Vec<Rc<dyn AggregateMethodCallTranslator>> =
            vec![Rc::new(QueryableAggregateMethodTranslator)];
        for plugin in plugins {
            translators.extend(plugin.translators());
        }
        Self { translators }
    }

    pub fn add_translators(
        &mut self,
        translators: impl IntoIterator<Item = Rc<dyn AggregateMethodCallTranslator>>,
    ) {
        self.translators.extend(translators);
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn translate(
        &self,
        method: &MethodInfo,
        source: &SqlExpr,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> Result<Option<SqlExpr>> {
        for translator in &self.translators {
            if let Some(translated) = translator.translate(method, source, arguments, factory)? {
                return Ok(Some(translated));
            }
        }
        debug!("No aggregate translator for {} with {} argument(s)", method, arguments.len());
        Ok(None)
    }
}

impl fmt::Debug for RelationalAggregateMethodCallTranslatorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalAggregateMethodCallTranslatorProvider")
            .field("translators", &self.translators.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::core::types::ValueType;
    use crate::drivers::{MssqlDialect, PostgresDialect};
    use crate::expressions::SqlExpr;
    use crate::query::factory::SqlExpressionFactory;
    use crate::typemap::{
        MssqlTypeMappings, PostgresTypeMappings, RelationalTypeMapping, RelationalTypeMappingSource,
    };

    pub fn postgres() -> SqlExpressionFactory {
        SqlExpressionFactory::new(
            Arc::new(PostgresDialect::new()),
            Arc::new(RelationalTypeMappingSource::new(Arc::new(PostgresTypeMappings::new()))),
        )
    }

    pub fn mssql() -> SqlExpressionFactory {
        SqlExpressionFactory::new(
            Arc::new(MssqlDialect::new()),
            Arc::new(RelationalTypeMappingSource::new(Arc::new(MssqlTypeMappings::new()))),
        )
    }

    pub fn column(name: &str, value_type: ValueType, store_type: &str) -> SqlExpr {
        let mapping = RelationalTypeMapping::new(store_type, value_type.clone());
        SqlExpr::column(name, "b", value_type, Some(Arc::new(mapping)), false)
    }
}
