//! Meta-Indirect Resolver - fields stored in the metadata side-table
//!
//! Each value group (included, then excluded) costs one lookup. The
//! resolver only reports which event ids to keep or drop; the compiler
//! merges id sets from every meta field and applies them once.

use crate::accumulator::TermGroup;
use crate::predicate::Predicate;
use std::collections::BTreeSet;
use tracing::trace;
use trail_foundation::{Literal, MetadataLookup, Result, COL_ID};

/// Event ids a meta field requires or forbids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSets {
    /// `None` when no included meta value was searched for
    pub include: Option<BTreeSet<i64>>,
    pub exclude: BTreeSet<i64>,
}

impl IdSets {
    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_empty()
    }

    /// Union of both sides
    pub fn merge(self, other: IdSets) -> IdSets {
        let include = match (self.include, other.include) {
            (Some(mut a), Some(b)) => {
                a.extend(b);
                Some(a)
            }
            (a, b) => a.or(b),
        };
        let mut exclude = self.exclude;
        exclude.extend(other.exclude);
        IdSets { include, exclude }
    }

    /// `id IN (include) AND id NOT IN (exclude)`
    pub fn to_predicate(&self) -> Predicate {
        let include = match &self.include {
            Some(ids) => Predicate::is_in(COL_ID, to_literals(ids)),
            None => Predicate::True,
        };
        Predicate::and([include, Predicate::not_in(COL_ID, to_literals(&self.exclude))])
    }
}

fn to_literals(ids: &BTreeSet<i64>) -> Vec<Literal> {
    ids.iter().copied().map(Literal::Integer).collect()
}

pub fn resolve(lookup: &dyn MetadataLookup, meta_key: &str, group: &TermGroup) -> Result<IdSets> {
    let mut sets = IdSets::default();

    for (values, negated) in [(&group.included, false), (&group.excluded, true)] {
        if values.is_empty() {
            continue;
        }

        let ids = lookup.find_event_ids(meta_key, values)?;
        trace!(
            meta_key = %meta_key,
            values = values.len(),
            matched = ids.len(),
            negated,
            "Metadata lookup"
        );

        if negated {
            sets.exclude.extend(ids);
        } else {
            sets.include.get_or_insert_with(BTreeSet::new).extend(ids);
        }
    }

    Ok(sets)
}
