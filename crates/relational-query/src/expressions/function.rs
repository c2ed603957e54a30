use std::hash::{Hash, Hasher};

use crate::error::{QueryError, Result};

use super::SqlExpr;

/// Argument list of a function call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionArguments {
    /// Rendered without parentheses (`CURRENT_TIMESTAMP`).
    Niladic,
    /// Rendered with parentheses, possibly empty (`now()`).
    WithArguments(Vec<SqlExpr>),
}

impl FunctionArguments {
    pub fn is_niladic(&self) -> bool {
        matches!(self, FunctionArguments::Niladic)
    }

    /// The arguments, empty for a niladic call.
    pub fn as_slice(&self) -> &[SqlExpr] {
        match self {
            FunctionArguments::Niladic => &[],
            FunctionArguments::WithArguments(args) => args,
        }
    }
}

/// A function call, optionally on an instance or within a schema.
///
/// Nullability metadata is fixed at construction: when the call has
/// arguments, there is exactly one propagation flag per argument.
#[derive(Debug, Clone)]
pub struct SqlFunctionExpression {
    instance: Option<SqlExpr>,
    schema: Option<String>,
    name: String,
    arguments: FunctionArguments,
    is_built_in: bool,
    is_nullable: bool,
    instance_propagates_nullability: Option<bool>,
    arguments_propagate_nullability: Option<Vec<bool>>,
}

impl SqlFunctionExpression {
    /// Built-in function without parentheses.
    pub fn niladic(name: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            instance: None,
            schema: None,
            name: name.into(),
            arguments: FunctionArguments::Niladic,
            is_built_in: true,
            is_nullable,
            instance_propagates_nullability: None,
            arguments_propagate_nullability: None,
        }
    }

    /// Built-in function with arguments.
    ///
    /// Fails with [`QueryError::InconsistentArgumentCount`] unless there is
    /// one propagation flag per argument.
    pub fn new(
        name: impl Into<String>,
        arguments: Vec<SqlExpr>,
        is_nullable: bool,
        arguments_propagate_nullability: Vec<bool>,
    ) -> Result<Self> {
        Self::from_parts(
            None,
            None,
            name.into(),
            FunctionArguments::WithArguments(arguments),
            true,
            is_nullable,
            None,
            Some(arguments_propagate_nullability),
        )
    }

    /// Function called on an instance (`x.Method(...)` style).
    pub fn with_instance(mut self, instance: SqlExpr, instance_propagates_nullability: bool) -> Self {
        self.instance = Some(instance);
        self.instance_propagates_nullability = Some(instance_propagates_nullability);
        self
    }

    /// Schema-qualified user function; never built in.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self.is_built_in = false;
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        instance: Option<SqlExpr>,
        schema: Option<String>,
        name: String,
        arguments: FunctionArguments,
        is_built_in: bool,
        is_nullable: bool,
        instance_propagates_nullability: Option<bool>,
        arguments_propagate_nullability: Option<Vec<bool>>,
    ) -> Result<Self> {
        if let FunctionArguments::WithArguments(args) = &arguments {
            let flags = arguments_propagate_nullability.as_ref().map_or(0, Vec::len);
            if flags != args.len() {
                return Err(QueryError::InconsistentArgumentCount {
                    function: name,
                    arguments: args.len(),
                    flags,
                });
            }
        }

        Ok(Self {
            instance,
            schema,
            name,
            arguments,
            is_built_in,
            is_nullable,
            instance_propagates_nullability,
            arguments_propagate_nullability,
        })
    }

    /// Same call with new children; the argument count is unchanged.
    pub(crate) fn update(&self, instance: Option<SqlExpr>, arguments: FunctionArguments) -> Self {
        Self {
            instance,
            arguments,
            ..self.clone()
        }
    }

    pub fn instance(&self) -> Option<&SqlExpr> {
        self.instance.as_ref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &FunctionArguments {
        &self.arguments
    }

    pub fn is_niladic(&self) -> bool {
        self.arguments.is_niladic()
    }

    pub fn is_built_in(&self) -> bool {
        self.is_built_in
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    pub fn instance_propagates_nullability(&self) -> Option<bool> {
        self.instance_propagates_nullability
    }

    pub fn arguments_propagate_nullability(&self) -> Option<&[bool]> {
        self.arguments_propagate_nullability.as_deref()
    }
}

/// Calls compare by schema, name, instance and arguments only. Nullability
/// flags and the built-in marker do not take part, so two otherwise identical
/// calls deduplicate even when their metadata differs.
impl PartialEq for SqlFunctionExpression {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.name == other.name
            && self.instance == other.instance
            && self.arguments == other.arguments
    }
}

impl Hash for SqlFunctionExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.hash(state);
        self.name.hash(state);
        self.instance.hash(state);
        self.arguments.hash(state);
    }
}
