//! Core Traits - collaborator interfaces used by the search layer
//!
//! The search compiler never talks to storage directly. It reads the
//! metadata side-table and the identity directory through the two traits
//! below; [`crate::storage::EventStore`] implements both over SQLite.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Layer2-core (SearchCompiler)                               │
//! │  ├── MetadataLookup     → event ids by meta key/value       │
//! │  └── IdentityDirectory  → identities by attribute (local,   │
//! │                           plus an optional federated one)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer1-foundation (this layer)                             │
//! │  └── EventStore implements both                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::audit::{Identity, IdentityAttribute};
use crate::Result;
use std::sync::Arc;

// ============================================================================
// Metadata lookup
// ============================================================================

/// Read access to the event metadata side-table
pub trait MetadataLookup: Send + Sync {
    /// Ids of events owning a metadata row with key `meta_key` whose value
    /// contains any of `value_patterns` (case-insensitive substring match).
    ///
    /// All patterns are matched in one call. Failures surface as
    /// [`crate::Error::LookupFailed`].
    fn find_event_ids(&self, meta_key: &str, value_patterns: &[String]) -> Result<Vec<i64>>;
}

impl<T: MetadataLookup + ?Sized> MetadataLookup for Arc<T> {
    fn find_event_ids(&self, meta_key: &str, value_patterns: &[String]) -> Result<Vec<i64>> {
        (**self).find_event_ids(meta_key, value_patterns)
    }
}

// ============================================================================
// Identity directory
// ============================================================================

/// Read access to a user directory
pub trait IdentityDirectory: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Identities whose `attribute` equals any of `values`.
    ///
    /// Text attributes compare case-insensitively. Failures surface as
    /// [`crate::Error::LookupFailed`].
    fn find_identities(
        &self,
        attribute: IdentityAttribute,
        values: &[String],
    ) -> Result<Vec<Identity>>;
}

impl<T: IdentityDirectory + ?Sized> IdentityDirectory for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn find_identities(
        &self,
        attribute: IdentityAttribute,
        values: &[String],
    ) -> Result<Vec<Identity>> {
        (**self).find_identities(attribute, values)
    }
}
