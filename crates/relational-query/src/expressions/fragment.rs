use std::hash::{Hash, Hasher};

/// A verbatim SQL token, such as `*` or a raw keyword.
#[derive(Debug, Clone)]
pub struct SqlFragmentExpression {
    pub sql: String,
}

impl SqlFragmentExpression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// Whether this is the `*` projection token.
    pub fn is_star(&self) -> bool {
        self.sql == "*"
    }
}

/// Star fragments from different tables project different columns, so two
/// distinct `*` nodes never compare equal.
impl PartialEq for SqlFragmentExpression {
    fn eq(&self, other: &Self) -> bool {
        self.sql == other.sql && !self.is_star()
    }
}

impl Hash for SqlFragmentExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sql.hash(state);
    }
}
