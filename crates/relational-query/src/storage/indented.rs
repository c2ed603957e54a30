//! Text buffer that tracks an indentation level.

use std::fmt;

const INDENT_SIZE: usize = 4;

/// String builder that indents every line written after an
/// [`increment_indent`](Self::increment_indent).
///
/// Indentation is written lazily: it lands in the buffer when the first text of
/// a new line is appended, so [`len`](Self::len) only counts it from then on.
#[derive(Debug, Clone, Default)]
pub struct IndentedStringBuilder {
    buffer: String,
    indent: usize,
    indent_pending: bool,
}

impl IndentedStringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer length in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current indentation level.
    pub fn indent_level(&self) -> usize {
        self.indent
    }

    /// Append text to the current line.
    pub fn append(&mut self, text: &str) -> &mut Self {
        self.write_indent(text);
        self.buffer.push_str(text);
        self
    }

    /// Append text and terminate the line.
    pub fn append_line(&mut self, text: &str) -> &mut Self {
        self.write_indent(text);
        self.buffer.push_str(text);
        self.buffer.push('\n');
        self.indent_pending = true;
        self
    }

    /// Append each line of `text` at the current indentation.
    pub fn append_lines(&mut self, text: &str) -> &mut Self {
        for line in text.lines() {
            self.append_line(line);
        }
        self
    }

    pub fn increment_indent(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    /// Decrease indentation; a no-op at level zero.
    pub fn decrement_indent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    /// Clear text and indentation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.indent = 0;
        self.indent_pending = false;
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    fn write_indent(&mut self, text: &str) {
        if self.indent_pending && !text.is_empty() {
            self.buffer
                .extend(std::iter::repeat(' ').take(self.indent * INDENT_SIZE));
            self.indent_pending = false;
        }
    }
}

impl fmt::Display for IndentedStringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_applies_to_next_line() {
        let mut sb = IndentedStringBuilder::new();
        sb.append("A").increment_indent().append_line("").append("B");
        assert_eq!(sb.as_str(), "A\n    B");
    }

    #[test]
    fn test_indent_counted_only_after_text() {
        let mut sb = IndentedStringBuilder::new();
        sb.append_line("SELECT").increment_indent();
        assert_eq!(sb.len(), 7);

        sb.append("x");
        assert_eq!(sb.len(), 7 + INDENT_SIZE + 1);
    }

    #[test]
    fn test_empty_lines_not_indented() {
        let mut sb = IndentedStringBuilder::new();
        sb.increment_indent().append_line("").append_lines("a\n\nb");
        assert_eq!(sb.as_str(), "\n    a\n\n    b\n");
    }

    #[test]
    fn test_decrement_saturates() {
        let mut sb = IndentedStringBuilder::new();
        sb.decrement_indent();
        assert_eq!(sb.indent_level(), 0);
    }
}
