//! Predicate tree
//!
//! Resolvers build [`Predicate`]s; the tree is rendered to SQL only at the
//! storage boundary by [`Predicate::to_sql`]. The `and`/`or` constructors
//! flatten nested nodes and drop neutral elements, so a rendered clause
//! never carries a dangling connective.

use serde::Serialize;
use trail_foundation::audit::{parse_roles, ROLE_SEPARATOR};
use trail_foundation::{EventRecord, Literal, SqlFilter};

/// Text sets longer than this are written into the clause instead of bound,
/// keeping well under SQLite's host-parameter limit.
const MAX_BOUND_TEXT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gte,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// Boolean expression over event columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    In {
        column: String,
        values: Vec<Literal>,
    },
    NotIn {
        column: String,
        values: Vec<Literal>,
    },
    IsNull(String),
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    /// `role` is one of the names in a comma-joined role-list column
    HasRole {
        column: String,
        role: String,
    },
}

impl Predicate {
    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn and<I: IntoIterator<Item = Predicate>>(parts: I) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::True,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    pub fn or<I: IntoIterator<Item = Predicate>>(parts: I) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::False,
            1 => flat.remove(0),
            _ => Predicate::Or(flat),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        match inner {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// `column IN (values)`; an empty set matches nothing
    pub fn is_in(column: impl Into<String>, values: Vec<Literal>) -> Self {
        if values.is_empty() {
            return Predicate::False;
        }
        Predicate::In {
            column: column.into(),
            values,
        }
    }

    /// `column NOT IN (values)`; an empty set excludes nothing
    pub fn not_in(column: impl Into<String>, values: Vec<Literal>) -> Self {
        if values.is_empty() {
            return Predicate::True;
        }
        Predicate::NotIn {
            column: column.into(),
            values,
        }
    }

    /// `(column IS NULL OR column NOT IN (values))`
    ///
    /// A record with no value for the column is never one of the excluded
    /// values, so it must pass.
    pub fn null_safe_not_in(column: impl Into<String>, values: Vec<Literal>) -> Self {
        if values.is_empty() {
            return Predicate::True;
        }
        let column = column.into();
        Predicate::or([
            Predicate::IsNull(column.clone()),
            Predicate::not_in(column, values),
        ])
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Literal>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Role-list membership; a name containing the `,` separator is never a member
    pub fn has_role(column: impl Into<String>, role: impl Into<String>) -> Self {
        let role = role.into();
        if role.contains(ROLE_SEPARATOR) {
            return Predicate::False;
        }
        Predicate::HasRole {
            column: column.into(),
            role,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }

    // ========================================================================
    // SQL rendering
    // ========================================================================

    /// Render as a parameterised `WHERE` clause
    pub fn to_sql(&self) -> SqlFilter {
        let mut clause = String::new();
        let mut params = Vec::new();
        self.write_sql(&mut clause, &mut params);
        SqlFilter::new(clause, params)
    }

    fn write_sql(&self, out: &mut String, params: &mut Vec<Literal>) {
        match self {
            Predicate::True => out.push_str("1 = 1"),
            Predicate::False => out.push_str("1 = 0"),
            Predicate::And(parts) => write_joined(parts, " AND ", out, params),
            Predicate::Or(parts) => write_joined(parts, " OR ", out, params),
            Predicate::Not(inner) => {
                out.push_str("NOT (");
                inner.write_sql(out, params);
                out.push(')');
            }
            Predicate::In { column, values } | Predicate::NotIn { column, values } => {
                if values.is_empty() {
                    let empty_is_true = matches!(self, Predicate::NotIn { .. });
                    out.push_str(if empty_is_true { "1 = 1" } else { "1 = 0" });
                    return;
                }
                out.push_str(column);
                out.push_str(if matches!(self, Predicate::In { .. }) {
                    " IN ("
                } else {
                    " NOT IN ("
                });
                write_values(values, out, params);
                out.push(')');
            }
            Predicate::IsNull(column) => {
                out.push_str(column);
                out.push_str(" IS NULL");
            }
            Predicate::Compare { column, op, value } => {
                out.push_str(&format!("{} {} ?", column, op.as_sql()));
                params.push(value.clone());
            }
            Predicate::HasRole { role, .. } if role.contains(ROLE_SEPARATOR) => {
                out.push_str("1 = 0");
            }
            Predicate::HasRole { column, role } => {
                out.push_str(&format!("(',' || {} || ',') LIKE ? ESCAPE '\\'", column));
                params.push(Literal::Text(format!("%,{},%", escape_like(role))));
            }
        }
    }

    // ========================================================================
    // In-memory evaluation
    // ========================================================================

    /// Whether the store would return `event` for this predicate.
    ///
    /// Follows SQL three-valued logic: a comparison against a NULL column is
    /// unknown, and only a definite `true` accepts the record.
    pub fn matches(&self, event: &EventRecord) -> bool {
        self.evaluate(event) == Some(true)
    }

    fn evaluate(&self, event: &EventRecord) -> Option<bool> {
        match self {
            Predicate::True => Some(true),
            Predicate::False => Some(false),
            Predicate::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(event) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Predicate::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.evaluate(event) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::Not(inner) => inner.evaluate(event).map(|b| !b),
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return Some(false);
                }
                let value = event.column(column)?;
                Some(values.iter().any(|v| v.loosely_equals(&value)))
            }
            Predicate::NotIn { column, values } => {
                if values.is_empty() {
                    return Some(true);
                }
                let value = event.column(column)?;
                Some(!values.iter().any(|v| v.loosely_equals(&value)))
            }
            Predicate::IsNull(column) => Some(event.column(column).is_none()),
            Predicate::Compare { column, op, value } => {
                let left = event.column(column)?.as_i64()?;
                let right = value.as_i64()?;
                Some(match op {
                    CompareOp::Gte => left >= right,
                    CompareOp::Lte => left <= right,
                })
            }
            Predicate::HasRole { role, .. } if role.contains(ROLE_SEPARATOR) => Some(false),
            Predicate::HasRole { column, role } => {
                let roles = match event.column(column)? {
                    Literal::Text(joined) => parse_roles(&joined),
                    Literal::Integer(_) => return Some(false),
                };
                Some(roles.iter().any(|r| r.eq_ignore_ascii_case(role)))
            }
        }
    }
}

fn write_joined(
    parts: &[Predicate],
    connective: &str,
    out: &mut String,
    params: &mut Vec<Literal>,
) {
    if parts.is_empty() {
        // And([]) is neutral, Or([]) is absorbing
        out.push_str(if connective == " AND " { "1 = 1" } else { "1 = 0" });
        return;
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(connective);
        }
        let nested = matches!(part, Predicate::And(_) | Predicate::Or(_));
        if nested {
            out.push('(');
        }
        part.write_sql(out, params);
        if nested {
            out.push(')');
        }
    }
}

/// Integers are always written inline; they carry no quoting risk and an
/// id set from a metadata lookup can be arbitrarily large.
fn write_values(values: &[Literal], out: &mut String, params: &mut Vec<Literal>) {
    let inline_text = values.len() > MAX_BOUND_TEXT;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match value {
            Literal::Integer(n) => out.push_str(&n.to_string()),
            Literal::Text(s) if inline_text && !s.contains('\0') => {
                out.push_str(&value.to_string());
            }
            Literal::Text(_) => {
                out.push('?');
                params.push(value.clone());
            }
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
