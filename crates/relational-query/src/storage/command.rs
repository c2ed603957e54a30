//! Relational command builder and the immutable command it produces.
//!
//! The SQL generator writes text and parameters into a
//! [`RelationalCommandBuilder`]; [`build`](RelationalCommandBuilder::build)
//! copies the accumulated state into a [`RelationalCommand`] that the
//! execution collaborator sends to the database.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

use crate::core::value::SqlValue;
use crate::error::{QueryError, Result};

use super::indented::IndentedStringBuilder;

/// A parameter bound to a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationalParameter {
    /// Name the query uses for the value (unique per command).
    pub invariant_name: String,
    /// Placeholder as it appears in the command text (`@__id_0`, `$1`).
    pub name: String,
    /// Value in its stored representation.
    pub value: SqlValue,
    /// Store type of the parameter, when mapped.
    pub store_type: Option<String>,
    pub is_nullable: bool,
}

impl RelationalParameter {
    pub fn new(invariant_name: impl Into<String>, name: impl Into<String>, value: SqlValue) -> Self {
        let value_is_null = value.is_null();
        Self {
            invariant_name: invariant_name.into(),
            name: name.into(),
            value,
            store_type: None,
            is_nullable: value_is_null,
        }
    }

    pub fn with_store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }
}

/// Executable SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationalCommand {
    pub command_text: String,
    pub parameters: Vec<RelationalParameter>,
}

impl RelationalCommand {
    /// Find a parameter by invariant name.
    pub fn parameter(&self, invariant_name: &str) -> Option<&RelationalParameter> {
        self.parameters
            .iter()
            .find(|p| p.invariant_name == invariant_name)
    }
}

impl fmt::Display for RelationalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.parameters {
            let store_type = p.store_type.as_deref().unwrap_or("?");
            writeln!(f, "-- {}={:?} ({})", p.name, p.value, store_type)?;
        }
        f.write_str(&self.command_text)
    }
}

/// Accumulates command text and parameters for one generation pass.
#[derive(Debug, Clone, Default)]
pub struct RelationalCommandBuilder {
    text: IndentedStringBuilder,
    parameters: Vec<RelationalParameter>,
}

impl RelationalCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.text.append(text.as_ref());
        self
    }

    /// Terminate the current line.
    pub fn append_line(&mut self) -> &mut Self {
        self.text.append_line("");
        self
    }

    /// Append each line of a multi-line block at the current indentation.
    pub fn append_lines(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.text.append_lines(text.as_ref());
        self
    }

    pub fn increment_indent(&mut self) -> &mut Self {
        self.text.increment_indent();
        self
    }

    pub fn decrement_indent(&mut self) -> &mut Self {
        self.text.decrement_indent();
        self
    }

    /// Indent until the returned guard is dropped.
    pub fn indent(&mut self) -> Indenter<'_> {
        self.text.increment_indent();
        Indenter { builder: self }
    }

    /// Add a parameter. Invariant names are unique per command.
    pub fn add_parameter(&mut self, parameter: RelationalParameter) -> Result<&mut Self> {
        if self
            .parameters
            .iter()
            .any(|p| p.invariant_name == parameter.invariant_name)
        {
            return Err(QueryError::DuplicateParameter(parameter.invariant_name));
        }
        self.parameters.push(parameter);
        Ok(self)
    }

    /// Remove and return the parameter at `index`.
    pub fn remove_parameter_at(&mut self, index: usize) -> Result<RelationalParameter> {
        if index >= self.parameters.len() {
            return Err(QueryError::ParameterIndexOutOfRange {
                index,
                count: self.parameters.len(),
            });
        }
        Ok(self.parameters.remove(index))
    }

    pub fn parameters(&self) -> &[RelationalParameter] {
        &self.parameters
    }

    /// Find a parameter by invariant name.
    pub fn find_parameter(&self, invariant_name: &str) -> Option<&RelationalParameter> {
        self.parameters
            .iter()
            .find(|p| p.invariant_name == invariant_name)
    }

    /// Length of the command text written so far.
    pub fn command_text_length(&self) -> usize {
        self.text.len()
    }

    /// Snapshot the current text and parameters into an immutable command.
    pub fn build(&self) -> RelationalCommand {
        RelationalCommand {
            command_text: self.text.to_string(),
            parameters: self.parameters.clone(),
        }
    }
}

impl fmt::Display for RelationalCommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.text, f)
    }
}

/// Guard returned by [`RelationalCommandBuilder::indent`].
pub struct Indenter<'a> {
    builder: &'a mut RelationalCommandBuilder,
}

impl Deref for Indenter<'_> {
    type Target = RelationalCommandBuilder;

    fn deref(&self) -> &Self::Target {
        self.builder
    }
}

impl DerefMut for Indenter<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder
    }
}

impl Drop for Indenter<'_> {
    fn drop(&mut self) {
        self.builder.decrement_indent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, value: i32) -> RelationalParameter {
        RelationalParameter::new(name, format!("@{}", name), SqlValue::I32(value))
    }

    #[test]
    fn test_indented_line() {
        let mut builder = RelationalCommandBuilder::new();
        builder
            .append("A")
            .increment_indent()
            .append_line()
            .append("B");

        let command = builder.build();
        let lines: Vec<&str> = command.command_text.lines().collect();
        assert_eq!(lines, vec!["A", "    B"]);
    }

    #[test]
    fn test_indent_guard() {
        let mut builder = RelationalCommandBuilder::new();
        builder.append("BEGIN").append_line();
        {
            let mut inner = builder.indent();
            inner.append("SELECT 1;").append_line();
        }
        builder.append("END;");
        assert_eq!(builder.build().command_text, "BEGIN\n    SELECT 1;\nEND;");
    }

    #[test]
    fn test_length_tracks_indent_lazily() {
        let mut builder = RelationalCommandBuilder::new();
        builder.append("A").append_line().increment_indent();
        assert_eq!(builder.command_text_length(), 2);
        builder.append("B");
        assert_eq!(builder.command_text_length(), 7);
    }

    #[test]
    fn test_remove_parameter_out_of_range() {
        let mut builder = RelationalCommandBuilder::new();
        let err = builder.remove_parameter_at(0).unwrap_err();
        assert!(matches!(
            err,
            QueryError::ParameterIndexOutOfRange { index: 0, count: 0 }
        ));
    }

    #[test]
    fn test_remove_parameter_at() {
        let mut builder = RelationalCommandBuilder::new();
        builder.add_parameter(param("p0", 1)).unwrap();
        builder.add_parameter(param("p1", 2)).unwrap();

        let removed = builder.remove_parameter_at(0).unwrap();
        assert_eq!(removed.invariant_name, "p0");
        assert_eq!(builder.parameters().len(), 1);
        assert!(builder.remove_parameter_at(1).is_err());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut builder = RelationalCommandBuilder::new();
        builder.add_parameter(param("p0", 1)).unwrap();
        let err = builder.add_parameter(param("p0", 2)).unwrap_err();
        assert!(matches!(err, QueryError::DuplicateParameter(name) if name == "p0"));
    }

    #[test]
    fn test_build_is_a_snapshot() {
        let mut builder = RelationalCommandBuilder::new();
        builder.append("SELECT @p0");
        builder.add_parameter(param("p0", 1)).unwrap();

        let first = builder.build();
        builder.append(", @p1");
        builder.add_parameter(param("p1", 2)).unwrap();
        builder.remove_parameter_at(0).unwrap();

        assert_eq!(first.command_text, "SELECT @p0");
        assert_eq!(first.parameters.len(), 1);
        assert_eq!(first.parameter("p0").map(|p| &p.value), Some(&SqlValue::I32(1)));

        let second = builder.build();
        assert_eq!(second.command_text, "SELECT @p0, @p1");
        assert_eq!(second.parameters[0].invariant_name, "p1");
    }
}
