//! # Field Registry
//!
//! Static mapping from a search field name to its [`FieldDescriptor`].
//!
//! ## Sources
//!
//! ```text
//! ┌────────────────────────────┬──────────────────┬──────────────────────┐
//! │ source                     │ kind             │ example              │
//! ├────────────────────────────┼──────────────────┼──────────────────────┤
//! │ event column list          │ Direct           │ alert_code, object   │
//! │ metadata key table         │ MetaIndirect     │ post_title→PostTitle │
//! │ identity table             │ IdentityIndirect │ user_email, user_role│
//! │ date bounds                │ DateRange        │ start_date, end_date │
//! └────────────────────────────┴──────────────────┴──────────────────────┘
//! ```
//!
//! Lookup is exact and case-sensitive. Aliases share the target's
//! descriptor. The registry is built once and only read afterwards, so it
//! is shared between compilers behind an `Arc`.

mod builtin;
mod entry;

pub use builtin::{ALIASES, END_DATE_FIELD, META_FIELDS, ROLE_FIELD, START_DATE_FIELD};
pub use entry::{
    DateBound, FieldDescriptor, FieldKind, IdentityResolution, Projection, Resolution,
};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use trail_foundation::{ColumnType, Error, Result, EVENT_COLUMNS};

// ============================================================================
// FieldRegistry
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, Arc<FieldDescriptor>>,
}

impl FieldRegistry {
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder::default()
    }

    /// Registry over [`EVENT_COLUMNS`] plus the built-in tables
    pub fn standard() -> Result<Self> {
        Self::with_columns(EVENT_COLUMNS)
    }

    /// Registry over a custom column schema plus the built-in tables
    pub fn with_columns(columns: &[(&str, ColumnType)]) -> Result<Self> {
        let mut builder = Self::builder().columns(columns);
        for descriptor in builtin::meta_fields()
            .into_iter()
            .chain(builtin::identity_fields())
            .chain(builtin::date_fields())
        {
            builder = builder.field(descriptor);
        }
        for (alias, target) in ALIASES {
            builder = builder.alias(*alias, *target);
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Every accepted field name (aliases included), sorted
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Default)]
pub struct FieldRegistryBuilder {
    descriptors: Vec<FieldDescriptor>,
    aliases: Vec<(String, String)>,
}

impl FieldRegistryBuilder {
    /// One Direct descriptor per column
    pub fn columns(mut self, columns: &[(&str, ColumnType)]) -> Self {
        self.descriptors.extend(
            columns
                .iter()
                .map(|(name, column_type)| FieldDescriptor::direct(*name, *column_type)),
        );
        self
    }

    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    /// Fails on a duplicate name or an alias to an unknown field
    pub fn build(self) -> Result<FieldRegistry> {
        let mut fields: HashMap<String, Arc<FieldDescriptor>> = HashMap::new();

        for descriptor in self.descriptors {
            let name = descriptor.name.clone();
            if fields.insert(name.clone(), Arc::new(descriptor)).is_some() {
                return Err(Error::Config(format!("Duplicate search field: {}", name)));
            }
        }

        for (alias, target) in self.aliases {
            let descriptor = fields
                .get(&target)
                .cloned()
                .ok_or_else(|| {
                    Error::Config(format!("Alias {} targets unknown field {}", alias, target))
                })?;
            if fields.contains_key(&alias) {
                return Err(Error::Config(format!("Duplicate search field: {}", alias)));
            }
            fields.insert(alias, descriptor);
        }

        debug!(fields = fields.len(), "Field registry built");
        Ok(FieldRegistry { fields })
    }
}

// ============================================================================
// Tests
// ============================================================================
