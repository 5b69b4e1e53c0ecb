//! Storage module for Trail
//!
//! - `db`: SQLite - audit events, metadata rows, local identities
//! - `filter`: filter expressions executed by the event store
//! - `json`: JSON - settings files

mod db;
mod filter;
mod json;

// SQLite Storage
pub use db::EventStore;

// Filter expressions
pub use filter::{Literal, SqlFilter};

// JSON Storage
pub use json::JsonStore;
