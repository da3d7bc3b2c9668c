//! SQL statements and placeholder rewriting.

use std::fmt;

use crate::value::Value;

/// The neutral parameter marker accepted in statement templates.
pub const NEUTRAL_MARKER: char = '?';

/// A SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text; parameters are written with the neutral `?` marker.
    pub sql: String,
    /// Parameter values, in marker order.
    pub params: Vec<Value>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Create a statement with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind one more parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Positional parameter syntax of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    #[default]
    Numbered,
}

impl PlaceholderStyle {
    /// Get the parameter placeholder for a 1-based index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Numbered => format!("${}", index),
        }
    }

    /// Rewrite neutral markers left to right.
    ///
    /// Markers inside single-quoted literals, double-quoted identifiers and
    /// `--` line comments are left untouched.
    pub fn rewrite(&self, sql: &str) -> String {
        replace_markers(sql, |index| self.placeholder(index)).0
    }
}

/// Count neutral markers outside quotes and comments.
pub fn count_markers(sql: &str) -> usize {
    replace_markers(sql, |_| NEUTRAL_MARKER.to_string()).1
}

fn replace_markers(sql: &str, mut replace: impl FnMut(usize) -> String) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;
    let mut in_comment = false;

    while let Some(c) = chars.next() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            out.push(c);
            continue;
        }

        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    // A doubled quote is an escaped quote, not the end of the literal.
                    if chars.peek() == Some(&q) {
                        out.push(q);
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    in_comment = true;
                    out.push(c);
                }
                NEUTRAL_MARKER => {
                    index += 1;
                    out.push_str(&replace(index));
                }
                _ => out.push(c),
            },
        }
    }

    (out, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_placeholder() {
        assert_eq!(PlaceholderStyle::Numbered.placeholder(1), "$1");
        assert_eq!(PlaceholderStyle::Numbered.placeholder(5), "$5");
    }

    #[test]
    fn test_rewrite_in_order() {
        let sql = "INSERT INTO \"t\" (\"a\", \"b\", \"c\") VALUES (?, ?, ?)";
        assert_eq!(
            PlaceholderStyle::Numbered.rewrite(sql),
            "INSERT INTO \"t\" (\"a\", \"b\", \"c\") VALUES ($1, $2, $3)"
        );
        assert_eq!(count_markers(sql), 3);
    }

    #[test]
    fn test_rewrite_skips_quoted_markers() {
        let sql = "SELECT '?', \"we?rd\" FROM t WHERE a = ? AND b = 'it''s ?' AND c = ?";
        assert_eq!(
            PlaceholderStyle::Numbered.rewrite(sql),
            "SELECT '?', \"we?rd\" FROM t WHERE a = $1 AND b = 'it''s ?' AND c = $2"
        );
    }

    #[test]
    fn test_rewrite_skips_comments() {
        let sql = "SELECT ? -- why?\n, ?";
        assert_eq!(
            PlaceholderStyle::Numbered.rewrite(sql),
            "SELECT $1 -- why?\n, $2"
        );
    }

    #[test]
    fn test_count_markers_ignores_quotes_and_comments() {
        assert_eq!(count_markers("SELECT 1"), 0);
        assert_eq!(count_markers("SELECT '?' -- ?\n, ?"), 1);
    }

    #[test]
    fn test_statement_bind() {
        let stmt = Statement::new("SELECT ?").bind(1).bind("x");
        assert_eq!(stmt.params, vec![Value::Int(1), Value::String("x".into())]);
    }
}
