//! Filter expressions handed to the event store
//!
//! A compiled search is rendered into a [`SqlFilter`]: a `WHERE` clause with
//! `?` placeholders plus the literals bound to them, in order.

use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Literal
// ============================================================================

/// Scalar value compared against an event column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl Literal {
    pub fn text(value: impl Into<String>) -> Self {
        Literal::Text(value.into())
    }

    /// Loose equality: `"42"` equals `42`, as the store's column affinity does.
    pub fn loosely_equals(&self, other: &Literal) -> bool {
        match (self, other) {
            (Literal::Integer(a), Literal::Integer(b)) => a == b,
            (Literal::Text(a), Literal::Text(b)) => a == b,
            (Literal::Integer(n), Literal::Text(s)) | (Literal::Text(s), Literal::Integer(n)) => {
                s.trim().parse::<i64>().map_or(false, |parsed| parsed == *n)
            }
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Integer(n) => Some(*n),
            Literal::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Integer(n)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Text(s)
    }
}

impl ToSql for Literal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Literal::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            Literal::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
        })
    }
}

// ============================================================================
// SqlFilter
// ============================================================================

/// Parameterised `WHERE` clause over the `events` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlFilter {
    pub clause: String,
    pub params: Vec<Literal>,
}

impl SqlFilter {
    pub fn new(clause: impl Into<String>, params: Vec<Literal>) -> Self {
        Self {
            clause: clause.into(),
            params,
        }
    }

    /// Filter accepting every row
    pub fn always() -> Self {
        Self::new("1 = 1", Vec::new())
    }

    /// Clause with every placeholder replaced by its quoted literal.
    ///
    /// Only meant for logs and diagnostics; execution always binds params.
    pub fn to_inline_string(&self) -> String {
        let mut out = String::with_capacity(self.clause.len());
        let mut params = self.params.iter();
        for ch in self.clause.chars() {
            if ch == '?' {
                if let Some(param) = params.next() {
                    out.push_str(&param.to_string());
                    continue;
                }
            }
            out.push(ch);
        }
        out
    }
}

impl fmt::Display for SqlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_inline_string())
    }
}
