//! trail-search: Search-expression compiler for Trail
//!
//! Layer2 - turns `field:value -field:value` search strings into filter
//! expressions over the audit event store.
//!
//! # Modules
//!
//! - `tokenizer`: raw string → [`SearchTerm`]s
//! - `accumulator`: terms → per-field [`TermGroup`]s
//! - `registry`: field name → [`FieldDescriptor`]
//! - `resolver`: one resolver per field kind
//! - `predicate`: [`Predicate`] tree and its SQL rendering
//! - `compiler`: [`SearchCompiler`], the entry point
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trail_foundation::EventStore;
//! use trail_search::{FieldRegistry, SearchCompiler};
//!
//! let store = Arc::new(EventStore::open("audit.db")?);
//! let registry = Arc::new(FieldRegistry::standard()?);
//! let compiler = SearchCompiler::new(registry, store.clone(), store.clone());
//!
//! let compiled = compiler.compile("object:post -user_role:subscriber start_date:2024-01-01")?;
//! if let Some(filter) = compiled.to_sql() {
//!     let events = store.find_events(&filter)?;
//! }
//! ```

pub mod accumulator;
pub mod compiler;
pub mod predicate;
pub mod registry;
pub mod resolver;
pub mod tokenizer;

// ============================================================================
// Re-exports
// ============================================================================

pub use accumulator::{accumulate, AccumulatedTerms, TermGroup};
pub use compiler::{CompiledSearch, SearchCompiler};
pub use predicate::{CompareOp, Predicate};
pub use registry::{
    DateBound, FieldDescriptor, FieldKind, FieldRegistry, FieldRegistryBuilder,
    IdentityResolution, Projection, Resolution,
};
pub use resolver::IdSets;
pub use tokenizer::{tokenize, SearchTerm};

// Foundation types that appear in this crate's API
pub use trail_foundation::{Error, Literal, ParsePolicy, Result, SearchConfig, SqlFilter};
