//! Audit data model
//!
//! Events recorded by the sensor layer and the identities that caused them.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────┐        ┌────────────────────────────┐
//! │ events                   │ 1    * │ event_metadata             │
//! │  id, alert_code,         │◄───────│  event_id, meta_key,       │
//! │  created_timestamp,      │        │  meta_value                │
//! │  actor_id, actor_login,  │        └────────────────────────────┘
//! │  actor_roles, ...        │
//! └──────────────────────────┘        ┌────────────────────────────┐
//!              ▲ actor_id / login     │ identities                 │
//!              └──────────────────────│  id, login, first_name,    │
//!                                     │  last_name, email, roles   │
//!                                     └────────────────────────────┘
//! ```

pub mod identity;
pub mod types;

pub use identity::{Identity, IdentityAttribute};
pub use types::{
    parse_roles, ColumnType, EventRecord, COL_ACTOR_ID, COL_ACTOR_LOGIN, COL_ACTOR_ROLES,
    COL_CREATED, COL_ID, EVENT_COLUMNS, ROLE_SEPARATOR,
};
