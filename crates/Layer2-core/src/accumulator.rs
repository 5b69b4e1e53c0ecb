//! Term Accumulator - groups terms by field and sign

use crate::tokenizer::SearchTerm;
use serde::Serialize;

/// All terms written for one field, partitioned by sign.
///
/// A value may sit in both sets when the user wrote it with both signs;
/// the two sets are resolved independently and never cancel each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermGroup {
    pub field: String,
    pub included: Vec<String>,
    pub excluded: Vec<String>,
}

impl TermGroup {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    /// Add a value to the set matching its sign, keeping first-seen order
    pub fn push(&mut self, value: impl Into<String>, negated: bool) {
        let value = value.into();
        let set = if negated {
            &mut self.excluded
        } else {
            &mut self.included
        };
        if !set.contains(&value) {
            set.push(value);
        }
    }

    pub fn include(mut self, value: impl Into<String>) -> Self {
        self.push(value, false);
        self
    }

    pub fn exclude(mut self, value: impl Into<String>) -> Self {
        self.push(value, true);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }
}

/// Field groups in order of each field's first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatedTerms {
    groups: Vec<TermGroup>,
}

impl AccumulatedTerms {
    pub fn get(&self, field: &str) -> Option<&TermGroup> {
        self.groups.iter().find(|g| g.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TermGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn group_mut(&mut self, field: &str) -> &mut TermGroup {
        match self.groups.iter().position(|g| g.field == field) {
            Some(index) => &mut self.groups[index],
            None => {
                self.groups.push(TermGroup::new(field));
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        }
    }
}

impl IntoIterator for AccumulatedTerms {
    type Item = TermGroup;
    type IntoIter = std::vec::IntoIter<TermGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Group terms by field name, separating included and excluded values
pub fn accumulate<I>(terms: I) -> AccumulatedTerms
where
    I: IntoIterator<Item = SearchTerm>,
{
    let mut accumulated = AccumulatedTerms::default();
    for term in terms {
        accumulated
            .group_mut(&term.field)
            .push(term.value, term.negated);
    }
    accumulated
}
