//! Configuration module
//!
//! - `search`: search compiler settings (time-zone offset, parse policy)

mod search;

pub use search::{ParsePolicy, SearchConfig, TermPolicy, SEARCH_CONFIG_FILE};
