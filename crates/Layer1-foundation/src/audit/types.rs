//! Audit Event Types - the recorded event and its column schema
//!
//! The sensor layer produces [`EventRecord`]s; the search layer only reads
//! them through [`EVENT_COLUMNS`] and [`EventRecord::column`].

use crate::storage::Literal;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Column schema
// ============================================================================

/// Storage type of an event column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Text,
    /// Comma-joined role names, never NULL
    RoleList,
}

pub const COL_ID: &str = "id";
pub const COL_CREATED: &str = "created_timestamp";
pub const COL_ACTOR_ID: &str = "actor_id";
pub const COL_ACTOR_LOGIN: &str = "actor_login";
pub const COL_ACTOR_ROLES: &str = "actor_roles";

/// Ordered column list of the `events` table
pub const EVENT_COLUMNS: &[(&str, ColumnType)] = &[
    (COL_ID, ColumnType::Integer),
    ("site_id", ColumnType::Integer),
    ("alert_code", ColumnType::Integer),
    (COL_CREATED, ColumnType::Integer),
    ("severity", ColumnType::Text),
    ("object", ColumnType::Text),
    ("event_type", ColumnType::Text),
    ("client_ip", ColumnType::Text),
    ("user_agent", ColumnType::Text),
    (COL_ACTOR_ID, ColumnType::Integer),
    (COL_ACTOR_LOGIN, ColumnType::Text),
    (COL_ACTOR_ROLES, ColumnType::RoleList),
    ("session_id", ColumnType::Text),
];

// ============================================================================
// Event Record
// ============================================================================

/// One audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Assigned by the store on insert (0 until then)
    pub id: i64,

    pub site_id: i64,

    /// Numeric code of the alert that fired
    pub alert_code: i64,

    /// Unix seconds, UTC
    pub created_timestamp: i64,

    pub severity: Option<String>,
    pub object: Option<String>,
    pub event_type: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,

    pub actor_id: Option<i64>,
    pub actor_login: Option<String>,
    pub actor_roles: Vec<String>,

    pub session_id: Option<String>,

    /// Out-of-line key/value rows, stored in `event_metadata`
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl EventRecord {
    pub fn new(alert_code: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            site_id: 1,
            alert_code,
            created_timestamp: created_at.timestamp(),
            severity: None,
            object: None,
            event_type: None,
            client_ip: None,
            user_agent: None,
            actor_id: None,
            actor_login: None,
            actor_roles: Vec::new(),
            session_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_site(mut self, site_id: i64) -> Self {
        self.site_id = site_id;
        self
    }

    /// Attribute the event to an actor
    pub fn with_actor(mut self, actor_id: i64, login: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id);
        self.actor_login = Some(login.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actor_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_timestamp, 0).single()
    }

    /// Roles serialised the way the `actor_roles` column stores them
    pub fn roles_column(&self) -> String {
        self.actor_roles.join(&ROLE_SEPARATOR.to_string())
    }

    /// Value of a scalar column, `None` for NULL or unknown names
    pub fn column(&self, name: &str) -> Option<Literal> {
        let text = |v: &Option<String>| v.clone().map(Literal::Text);
        match name {
            COL_ID => Some(Literal::Integer(self.id)),
            "site_id" => Some(Literal::Integer(self.site_id)),
            "alert_code" => Some(Literal::Integer(self.alert_code)),
            COL_CREATED => Some(Literal::Integer(self.created_timestamp)),
            "severity" => text(&self.severity),
            "object" => text(&self.object),
            "event_type" => text(&self.event_type),
            "client_ip" => text(&self.client_ip),
            "user_agent" => text(&self.user_agent),
            COL_ACTOR_ID => self.actor_id.map(Literal::Integer),
            COL_ACTOR_LOGIN => text(&self.actor_login),
            COL_ACTOR_ROLES => Some(Literal::Text(self.roles_column())),
            "session_id" => text(&self.session_id),
            _ => None,
        }
    }
}

/// Joins role names in the stored `actor_roles` column
pub const ROLE_SEPARATOR: char = ',';

/// Split a stored `actor_roles` value back into role names
pub fn parse_roles(column: &str) -> Vec<String> {
    column
        .split(ROLE_SEPARATOR)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_builder() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        let event = EventRecord::new(2001, at)
            .with_actor(7, "alice")
            .with_roles(["editor", "author"])
            .with_meta("PostTitle", "Hello World");

        assert_eq!(event.created_at(), Some(at));
        assert_eq!(event.column("actor_login"), Some(Literal::text("alice")));
        assert_eq!(event.column("actor_id"), Some(Literal::Integer(7)));
        assert_eq!(event.column("object"), None);
        assert_eq!(event.roles_column(), "editor,author");
        assert_eq!(event.metadata.get("PostTitle").map(String::as_str), Some("Hello World"));
    }

    #[test]
    fn test_every_schema_column_is_readable() {
        let event = EventRecord::new(1000, Utc::now()).with_actor(1, "root");
        for (name, kind) in EVENT_COLUMNS {
            let value = event.column(name);
            if matches!(kind, ColumnType::Integer) && *name != "actor_id" {
                assert!(value.is_some(), "{} should never be NULL", name);
            }
        }
    }

    #[test]
    fn test_parse_roles() {
        assert_eq!(parse_roles("editor, author,"), vec!["editor", "author"]);
        assert!(parse_roles("").is_empty());
    }
}
