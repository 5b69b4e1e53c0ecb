//! Resolvers - one per field kind
//!
//! Each resolver turns a single field's [`TermGroup`](crate::accumulator::TermGroup)
//! into a partial result:
//!
//! | kind             | resolver        | returns           |
//! |------------------|-----------------|-------------------|
//! | Direct           | [`direct`]      | `Predicate`       |
//! | MetaIndirect     | [`meta`]        | [`IdSets`]        |
//! | IdentityIndirect | [`identity`]    | `Result<Predicate>` |
//! | DateRange        | [`date`]        | `Result<Predicate>` |
//!
//! Resolvers hold no state. Meta id-sets are merged by the compiler and
//! applied once at the top level.

pub mod date;
pub mod direct;
pub mod identity;
pub mod meta;

pub use meta::IdSets;
