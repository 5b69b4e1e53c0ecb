//! Search Compiler - search string to filter expression
//!
//! ```text
//! "object:post -user_role:editor"
//!        │
//!        ▼ tokenize         [SearchTerm]
//!        ▼ accumulate       [TermGroup] (first-appearance order)
//!        ▼ resolve          per field kind, via FieldRegistry
//!        ▼ and(...)         Predicate, meta IdSets applied last
//!        ▼ to_sql()         SqlFilter for the event store
//! ```
//!
//! A compilation owns every intermediate value; only the registry and the
//! collaborators are shared, and those are read-only.

use crate::accumulator::{accumulate, AccumulatedTerms, TermGroup};
use crate::predicate::Predicate;
use crate::registry::{DateBound, FieldRegistry, Resolution};
use crate::resolver::{self, IdSets};
use crate::tokenizer::tokenize;
use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use trail_foundation::{
    Error, IdentityDirectory, MetadataLookup, ParsePolicy, Result, SearchConfig, SqlFilter,
    TermPolicy,
};

// ============================================================================
// CompiledSearch
// ============================================================================

/// Result of compiling one search string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompiledSearch {
    /// No `field:value` syntax at all; handed back for free-text search
    Passthrough(String),
    Filter(Predicate),
}

impl CompiledSearch {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, CompiledSearch::Passthrough(_))
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            CompiledSearch::Filter(predicate) => Some(predicate),
            CompiledSearch::Passthrough(_) => None,
        }
    }

    /// Filter expression for the event store; `None` for pass-through input
    pub fn to_sql(&self) -> Option<SqlFilter> {
        self.predicate().map(Predicate::to_sql)
    }
}

// ============================================================================
// SearchCompiler
// ============================================================================

pub struct SearchCompiler {
    registry: Arc<FieldRegistry>,
    metadata: Arc<dyn MetadataLookup>,
    identities: Arc<dyn IdentityDirectory>,
    federated: Option<Arc<dyn IdentityDirectory>>,
    config: SearchConfig,
    utc_offset: FixedOffset,
    policy: ParsePolicy,
}

impl SearchCompiler {
    pub fn new(
        registry: Arc<FieldRegistry>,
        metadata: Arc<dyn MetadataLookup>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let config = SearchConfig::default();
        Self {
            registry,
            metadata,
            identities,
            federated: None,
            utc_offset: Utc.fix(),
            policy: config.policy(),
            config,
        }
    }

    /// Consult a second (e.g. network-wide) identity directory as well
    pub fn with_federated(mut self, directory: Arc<dyn IdentityDirectory>) -> Self {
        self.federated = Some(directory);
        self
    }

    /// Apply time-zone offset and parse policy; fails on an invalid offset
    pub fn with_config(mut self, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        self.utc_offset = config.utc_offset()?;
        self.policy = config.policy();
        self.config = config;
        Ok(self)
    }

    /// Override the parse policy without touching the rest of the config
    pub fn with_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn policy(&self) -> ParsePolicy {
        self.policy
    }

    /// Compile a raw search string.
    ///
    /// Input without any `:` is not search syntax and comes back unchanged
    /// as [`CompiledSearch::Passthrough`].
    pub fn compile(&self, raw: &str) -> Result<CompiledSearch> {
        if !raw.contains(':') {
            debug!("No field syntax, passing search through");
            return Ok(CompiledSearch::Passthrough(raw.to_string()));
        }
        self.compile_predicate(raw).map(CompiledSearch::Filter)
    }

    /// Compile to a predicate; no terms at all gives [`Predicate::True`]
    pub fn compile_predicate(&self, raw: &str) -> Result<Predicate> {
        let terms = tokenize(raw);
        debug!(terms = terms.len(), "Tokenized search");

        let groups = accumulate(terms);
        debug!(fields = groups.len(), "Accumulated terms");

        self.resolve_groups(&groups)
    }

    fn resolve_groups(&self, groups: &AccumulatedTerms) -> Result<Predicate> {
        let mut parts = Vec::with_capacity(groups.len() + 1);
        let mut id_sets = IdSets::default();

        for group in groups.iter() {
            let Some(descriptor) = self.registry.get(&group.field) else {
                match self.policy.unknown_fields {
                    TermPolicy::Skip => {
                        warn!(field = %group.field, "Skipping unknown search field");
                        continue;
                    }
                    TermPolicy::Fail => return Err(Error::UnknownField(group.field.clone())),
                }
            };

            debug!(
                field = %group.field,
                kind = %descriptor.kind(),
                included = group.included.len(),
                excluded = group.excluded.len(),
                "Resolving field"
            );

            match &descriptor.resolution {
                Resolution::Direct {
                    column,
                    column_type,
                } => parts.push(resolver::direct::resolve(column, *column_type, group)),
                Resolution::Meta { meta_key } => {
                    let sets = resolver::meta::resolve(self.metadata.as_ref(), meta_key, group)?;
                    id_sets = id_sets.merge(sets);
                }
                Resolution::Identity(resolution) => {
                    let directories = self.directories();
                    parts.push(resolver::identity::resolve(resolution, group, &directories)?);
                }
                Resolution::Date { column, bound } => {
                    if let Some(predicate) = self.resolve_date(group, column, *bound)? {
                        parts.push(predicate);
                    }
                }
            }
        }

        parts.push(id_sets.to_predicate());
        Ok(Predicate::and(parts))
    }

    fn resolve_date(
        &self,
        group: &TermGroup,
        column: &str,
        bound: DateBound,
    ) -> Result<Option<Predicate>> {
        match resolver::date::resolve(&group.field, column, bound, group, self.utc_offset) {
            Ok(predicate) => Ok(Some(predicate)),
            Err(e @ Error::InvalidDate { .. }) => match self.policy.invalid_values {
                TermPolicy::Fail => Err(e),
                TermPolicy::Skip => {
                    warn!(field = %group.field, error = %e, "Skipping invalid date");
                    Ok(None)
                }
            },
            Err(e) => Err(e),
        }
    }

    fn directories(&self) -> Vec<&dyn IdentityDirectory> {
        let mut directories: Vec<&dyn IdentityDirectory> = vec![self.identities.as_ref()];
        if self.config.federated_identities() {
            if let Some(federated) = &self.federated {
                directories.push(federated.as_ref());
            }
        }
        directories
    }
}

impl std::fmt::Debug for SearchCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCompiler")
            .field("fields", &self.registry.len())
            .field("identities", &self.identities.name())
            .field("federated", &self.federated.as_ref().map(|d| d.name()))
            .field("utc_offset", &self.utc_offset)
            .field("policy", &self.policy)
            .finish()
    }
}
