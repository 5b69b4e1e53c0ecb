//! Direct Resolver - fields that are columns of the event record

use crate::accumulator::TermGroup;
use crate::predicate::Predicate;
use trail_foundation::{ColumnType, Literal};

/// `column IN (included) AND (column IS NULL OR column NOT IN (excluded))`,
/// each half present only when its value set is non-empty
pub fn resolve(column: &str, column_type: ColumnType, group: &TermGroup) -> Predicate {
    let mut parts = Vec::with_capacity(2);

    if !group.included.is_empty() {
        parts.push(Predicate::is_in(
            column,
            to_literals(column_type, &group.included),
        ));
    }
    if !group.excluded.is_empty() {
        parts.push(Predicate::null_safe_not_in(
            column,
            to_literals(column_type, &group.excluded),
        ));
    }

    Predicate::and(parts)
}

/// Integer columns get integer literals when the value parses as one
fn to_literals(column_type: ColumnType, values: &[String]) -> Vec<Literal> {
    values
        .iter()
        .map(|value| match column_type {
            ColumnType::Integer => value
                .parse::<i64>()
                .map(Literal::Integer)
                .unwrap_or_else(|_| Literal::text(value)),
            ColumnType::Text | ColumnType::RoleList => Literal::text(value),
        })
        .collect()
}
