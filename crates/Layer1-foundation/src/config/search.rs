//! Search Config - settings for the search compiler
//!
//! Loaded from `search.json`, global first, then merged with the project
//! file. Unset fields fall back to the defaults below.

use crate::storage::JsonStore;
use crate::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Settings file name
pub const SEARCH_CONFIG_FILE: &str = "search.json";

/// Largest offset accepted for `utcOffsetMinutes` (18 hours)
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

// ============================================================================
// Parse policy
// ============================================================================

/// What to do with a term the compiler cannot use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermPolicy {
    /// Drop the term; the rest of the query still applies
    Skip,
    /// Abort the whole compilation
    Fail,
}

/// How the compiler treats unknown fields and malformed values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePolicy {
    pub unknown_fields: TermPolicy,
    pub invalid_values: TermPolicy,
}

impl ParsePolicy {
    /// Unknown fields are ignored, malformed dates abort
    pub const fn legacy() -> Self {
        Self {
            unknown_fields: TermPolicy::Skip,
            invalid_values: TermPolicy::Fail,
        }
    }

    pub const fn strict() -> Self {
        Self {
            unknown_fields: TermPolicy::Fail,
            invalid_values: TermPolicy::Fail,
        }
    }

    pub const fn lenient() -> Self {
        Self {
            unknown_fields: TermPolicy::Skip,
            invalid_values: TermPolicy::Skip,
        }
    }
}

impl Default for ParsePolicy {
    fn default() -> Self {
        Self::legacy()
    }
}

// ============================================================================
// Search Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Version (for migration)
    #[serde(default = "default_version")]
    pub version: u32,

    /// Offset of the site's local time from UTC, applied to date bounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<TermPolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_values: Option<TermPolicy>,

    /// Consult the federated identity directory when one is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated_identities: Option<bool>,
}

fn default_version() -> u32 {
    1
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            utc_offset_minutes: None,
            unknown_fields: None,
            invalid_values: None,
            federated_identities: None,
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// Global + project merged load
    pub fn load() -> Result<Self> {
        Self::load_layered(&JsonStore::layered())
    }

    /// Load from an explicit store only
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        Self::load_layered(std::slice::from_ref(store))
    }

    /// Merge `search.json` from each store in turn; later stores win
    pub fn load_layered(stores: &[JsonStore]) -> Result<Self> {
        let mut config = Self::new();
        for store in stores {
            if let Some(layer) = store.load_optional::<SearchConfig>(SEARCH_CONFIG_FILE)? {
                config.merge(layer);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, store: &JsonStore) -> Result<()> {
        store.save(SEARCH_CONFIG_FILE, self)
    }

    /// Fields set in `other` win
    pub fn merge(&mut self, other: SearchConfig) {
        if other.utc_offset_minutes.is_some() {
            self.utc_offset_minutes = other.utc_offset_minutes;
        }
        if other.unknown_fields.is_some() {
            self.unknown_fields = other.unknown_fields;
        }
        if other.invalid_values.is_some() {
            self.invalid_values = other.invalid_values;
        }
        if other.federated_identities.is_some() {
            self.federated_identities = other.federated_identities;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.utc_offset().map(|_| ())
    }

    // ========================================================================
    // Resolved values
    // ========================================================================

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        let minutes = self.utc_offset_minutes.unwrap_or(0);
        if minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(Error::Config(format!(
                "utcOffsetMinutes out of range: {}",
                minutes
            )));
        }
        FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| Error::Config(format!("Invalid UTC offset: {} minutes", minutes)))
    }

    pub fn policy(&self) -> ParsePolicy {
        let defaults = ParsePolicy::default();
        ParsePolicy {
            unknown_fields: self.unknown_fields.unwrap_or(defaults.unknown_fields),
            invalid_values: self.invalid_values.unwrap_or(defaults.invalid_values),
        }
    }

    pub fn federated_identities(&self) -> bool {
        self.federated_identities.unwrap_or(true)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    pub fn with_policy(mut self, policy: ParsePolicy) -> Self {
        self.unknown_fields = Some(policy.unknown_fields);
        self.invalid_values = Some(policy.invalid_values);
        self
    }

    pub fn with_federated_identities(mut self, enabled: bool) -> Self {
        self.federated_identities = Some(enabled);
        self
    }
}
