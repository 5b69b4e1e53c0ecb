//! Core module - collaborator traits shared across layers

mod traits;

pub use traits::{IdentityDirectory, MetadataLookup};
