//! SQLite Storage for audit events
//!
//! Tables:
//! - events: one row per audited action (scalar columns)
//! - event_metadata: out-of-line key/value rows keyed by event id
//! - identities: local user directory
//!
//! ## Migration System
//!
//! Database schema is versioned. Migrations run automatically on startup.
//! - Version 1: Initial schema (events, event_metadata, identities)
//! - Version 2: Lookup indexes used by search (metadata key, actor columns)

use crate::audit::{
    parse_roles, EventRecord, Identity, IdentityAttribute, EVENT_COLUMNS, ROLE_SEPARATOR,
};
use crate::core::{IdentityDirectory, MetadataLookup};
use crate::storage::{Literal, SqlFilter};
use crate::{Error, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Name reported by the store when a lookup fails
const STORE_NAME: &str = "event_store";

/// SQL function folding text with Unicode lowercase rules; SQLite's own
/// `lower()`, `LIKE` and `NOCASE` only fold ASCII.
const UNICODE_LOWER: &str = "unicode_lower";

/// SQLite-backed event store.
///
/// Executes compiled filters and serves the metadata and identity lookups
/// the search compiler depends on.
#[derive(Clone)]
pub struct EventStore {
    conn: Arc<Mutex<Connection>>,
}

impl EventStore {
    /// Open (or create) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;
        register_functions(&conn)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        store.run_migrations()?;

        info!(db_path = %path.display(), "Event store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Storage(format!("Failed to create in-memory database: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;
        register_functions(&conn)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        store.run_migrations()?;

        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    /// Get current schema version from database
    pub fn get_schema_version(&self) -> Result<i32> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Storage(format!("Failed to get schema version: {}", e)))
    }

    /// Initialize database schema (base tables)
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Events table
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_id INTEGER NOT NULL DEFAULT 1,
                alert_code INTEGER NOT NULL,
                created_timestamp INTEGER NOT NULL,
                severity TEXT,
                object TEXT,
                event_type TEXT,
                client_ip TEXT,
                user_agent TEXT,
                actor_id INTEGER,
                actor_login TEXT,
                actor_roles TEXT NOT NULL DEFAULT '',
                session_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_created
                ON events(created_timestamp);

            -- Metadata side-table
            CREATE TABLE IF NOT EXISTS event_metadata (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL,
                meta_key TEXT NOT NULL,
                meta_value TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );

            -- Local identity directory
            CREATE TABLE IF NOT EXISTS identities (
                id INTEGER PRIMARY KEY,
                login TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                roles TEXT NOT NULL DEFAULT ''
            );

            -- Insert initial schema version if not exists
            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(|e| Error::Storage(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run all pending migrations
    fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version()?;

        if current_version >= CURRENT_SCHEMA_VERSION {
            debug!(
                "Database schema is up to date (version {})",
                current_version
            );
            return Ok(());
        }

        info!(
            "Running database migrations from version {} to {}",
            current_version, CURRENT_SCHEMA_VERSION
        );

        let conn = self.lock()?;

        for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
            match version {
                2 => Self::migrate_v2(&conn)?,
                _ => {
                    warn!("Unknown migration version: {}", version);
                }
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| Error::Storage(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration to version {}", version);
        }

        Ok(())
    }

    /// Migration to version 2: indexes for metadata and actor lookups
    fn migrate_v2(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_event_metadata_key
                ON event_metadata(meta_key, event_id);
            CREATE INDEX IF NOT EXISTS idx_events_actor
                ON events(actor_id, actor_login);
            CREATE INDEX IF NOT EXISTS idx_identities_email
                ON identities(email COLLATE NOCASE);
            "#,
        )
        .map_err(|e| Error::Storage(format!("Failed to apply migration 2: {}", e)))?;

        Ok(())
    }

    // ========================================================================
    // Event Operations
    // ========================================================================

    /// Insert an event and its metadata rows, returning the assigned id
    pub fn insert_event(&self, event: &EventRecord) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Storage(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            r#"
            INSERT INTO events (site_id, alert_code, created_timestamp, severity, object,
                                event_type, client_ip, user_agent, actor_id, actor_login,
                                actor_roles, session_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                event.site_id,
                event.alert_code,
                event.created_timestamp,
                event.severity,
                event.object,
                event.event_type,
                event.client_ip,
                event.user_agent,
                event.actor_id,
                event.actor_login,
                event.roles_column(),
                event.session_id,
            ],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert event: {}", e)))?;

        let id = tx.last_insert_rowid();

        for (key, value) in &event.metadata {
            tx.execute(
                "INSERT INTO event_metadata (event_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                params![id, key, value],
            )
            .map_err(|e| Error::Storage(format!("Failed to insert metadata: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| Error::Storage(format!("Failed to commit event: {}", e)))?;

        debug!(event_id = id, alert_code = event.alert_code, "Event stored");
        Ok(id)
    }

    /// Get an event (with its metadata) by id
    pub fn get_event(&self, id: i64) -> Result<Option<EventRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM events WHERE id = ?1", select_columns());

        let event = conn
            .query_row(&sql, params![id], row_to_event)
            .optional()
            .map_err(|e| Error::Storage(format!("Failed to get event: {}", e)))?;

        match event {
            Some(mut event) => {
                load_metadata(&conn, &mut event)?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// Run a compiled filter against the events table, newest first
    pub fn find_events(&self, filter: &SqlFilter) -> Result<Vec<EventRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM events WHERE {} ORDER BY created_timestamp DESC, id DESC",
            select_columns(),
            filter.clause
        );
        trace!(sql = %sql, params = filter.params.len(), "Executing event filter");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Storage(format!("Failed to prepare query: {}", e)))?;

        let mut events = stmt
            .query_map(params_from_iter(filter.params.iter()), row_to_event)
            .map_err(|e| Error::Storage(format!("Failed to query events: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::Storage(format!("Failed to read event row: {}", e)))?;

        for event in &mut events {
            load_metadata(&conn, event)?;
        }

        Ok(events)
    }

    pub fn count_events(&self) -> Result<u64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .map_err(|e| Error::Storage(format!("Failed to count events: {}", e)))
    }

    // ========================================================================
    // Identity Operations
    // ========================================================================

    /// Insert or replace an identity in the local directory
    pub fn insert_identity(&self, identity: &Identity) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO identities (id, login, first_name, last_name, email, roles)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                identity.id,
                identity.login,
                identity.first_name,
                identity.last_name,
                identity.email,
                identity.roles.join(&ROLE_SEPARATOR.to_string()),
            ],
        )
        .map_err(|e| Error::Storage(format!("Failed to insert identity: {}", e)))?;

        Ok(())
    }

    fn query_event_ids(&self, meta_key: &str, value_patterns: &[String]) -> Result<Vec<i64>> {
        let conn = self.lock()?;

        let likes: Vec<&str> = value_patterns
            .iter()
            .map(|_| "unicode_lower(meta_value) LIKE ? ESCAPE '\\'")
            .collect();
        let sql = format!(
            "SELECT DISTINCT event_id FROM event_metadata WHERE meta_key = ? AND ({}) ORDER BY event_id",
            likes.join(" OR ")
        );

        let mut bound: Vec<String> = Vec::with_capacity(value_patterns.len() + 1);
        bound.push(meta_key.to_string());
        bound.extend(value_patterns.iter().map(|v| like_contains(&v.to_lowercase())));

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(bound.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    fn query_identities(
        &self,
        attribute: IdentityAttribute,
        values: &[String],
    ) -> Result<Vec<Identity>> {
        let (condition, bound): (String, Vec<Literal>) = match attribute {
            IdentityAttribute::Id => {
                let ids: Vec<Literal> = values
                    .iter()
                    .filter_map(|v| v.trim().parse::<i64>().ok())
                    .map(Literal::Integer)
                    .collect();
                (format!("id IN ({})", placeholders(ids.len())), ids)
            }
            text => (
                format!(
                    "{}({}) IN ({})",
                    UNICODE_LOWER,
                    text.as_str(),
                    placeholders(values.len())
                ),
                values
                    .iter()
                    .map(|v| Literal::Text(v.to_lowercase()))
                    .collect(),
            ),
        };

        if bound.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let sql = format!(
            "SELECT id, login, first_name, last_name, email, roles FROM identities WHERE {} ORDER BY id",
            condition
        );
        let mut stmt = conn.prepare(&sql)?;
        let identities = stmt
            .query_map(params_from_iter(bound.iter()), |row| {
                let roles: String = row.get(5)?;
                Ok(Identity {
                    id: row.get(0)?,
                    login: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    email: row.get(4)?,
                    roles: parse_roles(&roles),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(identities)
    }
}

// ============================================================================
// Collaborator implementations
// ============================================================================

impl MetadataLookup for EventStore {
    fn find_event_ids(&self, meta_key: &str, value_patterns: &[String]) -> Result<Vec<i64>> {
        if value_patterns.is_empty() {
            return Ok(Vec::new());
        }
        self.query_event_ids(meta_key, value_patterns)
            .map_err(|e| Error::lookup_failed(STORE_NAME, e))
    }
}

impl IdentityDirectory for EventStore {
    fn name(&self) -> &str {
        STORE_NAME
    }

    fn find_identities(
        &self,
        attribute: IdentityAttribute,
        values: &[String],
    ) -> Result<Vec<Identity>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.query_identities(attribute, values)
            .map_err(|e| Error::lookup_failed(STORE_NAME, e))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(bytes) => {
                    SqlValue::Text(String::from_utf8_lossy(bytes).to_lowercase())
                }
                other => SqlValue::from(other),
            })
        },
    )
    .map_err(|e| Error::Storage(format!("Failed to register SQL functions: {}", e)))
}

fn select_columns() -> String {
    EVENT_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `%value%` with LIKE wildcards in `value` escaped
fn like_contains(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Column order follows [`EVENT_COLUMNS`]
fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<EventRecord> {
    let roles: String = row.get("actor_roles")?;
    Ok(EventRecord {
        id: row.get("id")?,
        site_id: row.get("site_id")?,
        alert_code: row.get("alert_code")?,
        created_timestamp: row.get("created_timestamp")?,
        severity: row.get("severity")?,
        object: row.get("object")?,
        event_type: row.get("event_type")?,
        client_ip: row.get("client_ip")?,
        user_agent: row.get("user_agent")?,
        actor_id: row.get("actor_id")?,
        actor_login: row.get("actor_login")?,
        actor_roles: parse_roles(&roles),
        session_id: row.get("session_id")?,
        metadata: Default::default(),
    })
}

fn load_metadata(conn: &Connection, event: &mut EventRecord) -> Result<()> {
    let mut stmt = conn
        .prepare_cached("SELECT meta_key, meta_value FROM event_metadata WHERE event_id = ?1")
        .map_err(|e| Error::Storage(format!("Failed to prepare metadata query: {}", e)))?;
    let mut rows = stmt
        .query(params![event.id])
        .map_err(|e| Error::Storage(format!("Failed to query metadata: {}", e)))?;
    while let Some(row) = rows.next()? {
        event.metadata.insert(row.get(0)?, row.get(1)?);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
