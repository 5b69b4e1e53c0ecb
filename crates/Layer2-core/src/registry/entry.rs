//! Field Descriptor - how one search field is resolved

use serde::Serialize;
use std::fmt;
use trail_foundation::{ColumnType, IdentityAttribute};

// ============================================================================
// FieldKind
// ============================================================================

/// Resolver family a field dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Column of the event record itself
    Direct,
    /// Row in the metadata side-table
    MetaIndirect,
    /// Attribute of the actor's identity
    IdentityIndirect,
    /// Bound on the creation timestamp
    DateRange,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::MetaIndirect => write!(f, "meta_indirect"),
            Self::IdentityIndirect => write!(f, "identity_indirect"),
            Self::DateRange => write!(f, "date_range"),
        }
    }
}

// ============================================================================
// Resolution (kind-specific config)
// ============================================================================

/// Which end of the range a date field sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBound {
    /// `>=` at 00:00:00 local time
    Start,
    /// `<=` at 23:59:59 local time
    End,
}

/// One `in_table` projection: event column filled from an identity attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub column: String,
    pub attribute: IdentityAttribute,
}

impl Projection {
    pub fn new(column: impl Into<String>, attribute: IdentityAttribute) -> Self {
        Self {
            column: column.into(),
            attribute,
        }
    }
}

/// Identity-Indirect sub-modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityResolution {
    /// Look identities up by `attribute`, then map each match back to event
    /// columns through `in_table`
    Match {
        attribute: IdentityAttribute,
        in_table: Vec<Projection>,
    },
    /// Test the event's own denormalised role list; no lookup
    ExtractRole { column: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Direct {
        column: String,
        column_type: ColumnType,
    },
    Meta {
        meta_key: String,
    },
    Identity(IdentityResolution),
    Date {
        column: String,
        bound: DateBound,
    },
}

// ============================================================================
// FieldDescriptor
// ============================================================================

/// Immutable description of one search field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub resolution: Resolution,
}

impl FieldDescriptor {
    pub fn direct(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            resolution: Resolution::Direct {
                column: name.clone(),
                column_type,
            },
            name,
        }
    }

    pub fn meta(name: impl Into<String>, meta_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Meta {
                meta_key: meta_key.into(),
            },
        }
    }

    pub fn identity_match(
        name: impl Into<String>,
        attribute: IdentityAttribute,
        in_table: Vec<Projection>,
    ) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Identity(IdentityResolution::Match {
                attribute,
                in_table,
            }),
        }
    }

    pub fn identity_role(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Identity(IdentityResolution::ExtractRole {
                column: column.into(),
            }),
        }
    }

    pub fn date(name: impl Into<String>, column: impl Into<String>, bound: DateBound) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Date {
                column: column.into(),
                bound,
            },
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.resolution {
            Resolution::Direct { .. } => FieldKind::Direct,
            Resolution::Meta { .. } => FieldKind::MetaIndirect,
            Resolution::Identity(_) => FieldKind::IdentityIndirect,
            Resolution::Date { .. } => FieldKind::DateRange,
        }
    }
}
