//! # trail-foundation
//!
//! Foundation layer for Trail:
//! - Audit: event records, column schema, identities
//! - Core: collaborator traits (metadata lookup, identity directory)
//! - Storage: SQLite event store, filter expressions, JSON settings
//! - Config: search settings (time-zone offset, parse policy)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  trail-search (Layer2)                                  │
//! │   "user_role:editor -post_title:draft"                  │
//! │                     │                                   │
//! │                     ▼  MetadataLookup / IdentityDirectory
//! │  ┌──────────────────────────────────────────────┐       │
//! │  │  EventStore (SQLite)                         │       │
//! │  │  events · event_metadata · identities        │       │
//! │  └──────────────────────────────────────────────┘       │
//! │                     ▲                                   │
//! │                     └── SqlFilter (compiled search)     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Audit
// ============================================================================
pub use audit::{
    ColumnType, EventRecord, Identity, IdentityAttribute, COL_ACTOR_ID, COL_ACTOR_LOGIN,
    COL_ACTOR_ROLES, COL_CREATED, COL_ID, EVENT_COLUMNS,
};

// ============================================================================
// Core
// ============================================================================
pub use core::{IdentityDirectory, MetadataLookup};

// ============================================================================
// Config
// ============================================================================
pub use config::{ParsePolicy, SearchConfig, TermPolicy, SEARCH_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{EventStore, JsonStore, Literal, SqlFilter};
