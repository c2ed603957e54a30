//! SQL dialect abstraction.
//!
//! A [`Dialect`] answers every "how does this engine spell it" question the
//! SQL generator, the method translators and the history repository have:
//! identifier quoting, parameter placeholders, paging syntax, built-in
//! function names and the few scripting constructs the history table needs.
//!
//! # Design Patterns
//!
//! - **Strategy**: each engine provides an interchangeable implementation
//! - **Template Method**: default methods build on the required primitives

use super::identifier::escape_string_literal;

/// Built-in functions whose spelling differs between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Upper,
    Lower,
    Trim,
    TrimStart,
    TrimEnd,
    Length,
    /// 1-based position of a substring; 0 when absent.
    Position,
    Substring,
    /// Leading characters of a string.
    Left,
    /// Trailing characters of a string.
    Right,
    Replace,
    Abs,
    Ceiling,
    Floor,
    Round,
    Power,
    Sqrt,
    Greatest,
    Least,
    /// Local current timestamp.
    Now,
    /// Current UTC timestamp.
    UtcNow,
    DatePart,
    Count,
    /// Count returning a 64-bit integer.
    LongCount,
    Sum,
    Avg,
    Min,
    Max,
    Coalesce,
}

/// How a built-in function is written in a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionShape {
    pub name: &'static str,
    /// Written without parentheses (`CURRENT_TIMESTAMP`).
    pub niladic: bool,
}

impl FunctionShape {
    pub const fn call(name: &'static str) -> Self {
        Self {
            name,
            niladic: false,
        }
    }

    pub const fn niladic(name: &'static str) -> Self {
        Self {
            name,
            niladic: true,
        }
    }
}

/// Component extracted from a date/time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
        }
    }
}

/// How `LIMIT`/`OFFSET` style paging is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `LIMIT n OFFSET m` after `ORDER BY`.
    LimitOffset,
    /// `TOP(n)` without an offset, otherwise `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    /// (which requires an `ORDER BY`).
    TopOffsetFetch,
}

/// SQL syntax strategy for a database engine.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g., "postgres", "mssql").
    fn name(&self) -> &str;

    /// Quote an identifier.
    fn quote_ident(&self, name: &str) -> String;

    /// Quote an optionally schema-qualified object name.
    fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(schema) if !schema.is_empty() => {
                format!("{}.{}", self.quote_ident(schema), self.quote_ident(name))
            }
            _ => self.quote_ident(name),
        }
    }

    /// Placeholder for a bound parameter.
    ///
    /// `index` is the 1-based position among the command's parameters and
    /// `name` the parameter's invariant name.
    fn param_placeholder(&self, index: usize, name: &str) -> String;

    /// Operator used for string concatenation.
    fn concat_operator(&self) -> &'static str;

    /// Spelling of a built-in function.
    fn function(&self, function: BuiltinFunction) -> FunctionShape;

    /// First argument of the date-part function, as SQL text.
    fn date_part(&self, part: DatePart) -> String;

    /// Whether the position function takes the searched-for value first
    /// (`CHARINDEX(needle, haystack)`).
    fn position_takes_needle_first(&self) -> bool {
        false
    }

    /// Whether searching for an empty string reports "not found" (0)
    /// instead of position 1.
    fn empty_search_not_found(&self) -> bool {
        false
    }

    /// Whether `ROUND` needs an explicit length argument.
    fn round_requires_length(&self) -> bool {
        false
    }

    /// Whether boolean values and search conditions are distinct in this
    /// engine, so that predicates must be compared against `1` and
    /// conditions projected through `CASE`.
    fn requires_bool_comparison(&self) -> bool {
        false
    }

    fn paging_style(&self) -> PagingStyle;

    /// Statement batch separator, empty when the engine has none.
    fn batch_terminator(&self) -> &'static str {
        ""
    }

    /// String literal for script text.
    fn string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_string_literal(value))
    }

    /// Scalar query that yields a non-null, non-false value when the table
    /// exists.
    fn table_exists_sql(&self, schema: Option<&str>, table: &str) -> String;

    /// Wrap a `CREATE TABLE` statement so that it does nothing when the table
    /// already exists.
    fn create_table_if_not_exists(
        &self,
        schema: Option<&str>,
        table: &str,
        create_statement: &str,
    ) -> String;

    /// Opening line(s) of a conditional block guarded by `condition`.
    fn begin_if(&self, condition: &str) -> String;

    /// Closing line(s) of a block opened by [`Dialect::begin_if`].
    fn end_if(&self) -> String;

    /// Statement that takes the exclusive migrations lock named `resource`,
    /// blocking until it is granted.
    fn acquire_lock_sql(&self, resource: &str) -> String;

    /// Statement that releases a lock taken by [`Dialect::acquire_lock_sql`].
    fn release_lock_sql(&self, resource: &str) -> String;
}
