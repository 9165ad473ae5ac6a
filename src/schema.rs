//! # Schema Bootstrapping
//!
//! This module owns the log's table layout and applies it to new files.
//!
//! ## Table Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           Schema 0.1.0                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  message_types         topics                    messages           │
//! │  ┌──────────────┐      ┌──────────────────┐      ┌────────────────┐ │
//! │  │ id (PK)      │◄─────│ message_type_id  │      │ time_recv_sec  │ │
//! │  │ name UNIQUE  │      │ id (PK)          │◄─────│ topic_id       │ │
//! │  └──────────────┘      │ name             │      │ time_recv_nano │ │
//! │                        │ UNIQUE(name,     │      │ message BLOB   │ │
//! │                        │   message_type)  │      └────────────────┘ │
//! │                        └──────────────────┘                         │
//! │  migrations: the version tag the file was created with              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bootstrapping Rules
//!
//! On open, the set of log tables present in `sqlite_master` decides what
//! happens:
//!
//! - **none**: the file is new. Load the schema text and apply it inside a
//!   single transaction, so a malformed definition leaves no tables behind.
//! - **all**: the file was created earlier. The recorded version must match
//!   [`SCHEMA_VERSION`]; there is no migration between versions.
//! - **some**: the file is damaged or foreign and is rejected.

use std::borrow::Cow;
use std::fs;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::config::SchemaSource;
use crate::error::{Error, Result};
use crate::types::OpenMode;

// =============================================================================
// Schema Version
// =============================================================================

/// Version tag of the schema this crate writes.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// The schema definition for [`SCHEMA_VERSION`], compiled in.
const EMBEDDED_SCHEMA: &str = include_str!("../schema/0.1.0.sql");

/// Tables the schema creates. A usable log has all of them.
const LOG_TABLES: [&str; 4] = ["migrations", "message_types", "topics", "messages"];

// =============================================================================
// Inspection
// =============================================================================

/// What an opened file already contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// None of the log tables exist.
    Empty,
    /// Every log table exists.
    Initialized,
    /// Some log tables exist; the listed ones are missing.
    Partial(Vec<&'static str>),
}

/// Inspects `sqlite_master` for the log tables.
///
/// This is the first read against a newly opened connection, so it is also
/// where a file that isn't a SQLite database gets noticed.
pub fn schema_status(conn: &Connection) -> rusqlite::Result<SchemaStatus> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;

    let mut missing = Vec::new();
    for table in LOG_TABLES {
        if !stmt.exists([table])? {
            missing.push(table);
        }
    }

    Ok(match missing.len() {
        0 => SchemaStatus::Initialized,
        n if n == LOG_TABLES.len() => SchemaStatus::Empty,
        _ => SchemaStatus::Partial(missing),
    })
}

/// Returns the version the file was created with, if recorded.
pub fn recorded_version(conn: &Connection) -> Result<Option<String>> {
    let version = conn
        .query_row(
            "SELECT to_version FROM migrations ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

// =============================================================================
// Loading and Applying
// =============================================================================

/// Loads the schema text for `version` from `source`.
///
/// # Errors
///
/// - `Error::SchemaRead` if the file in a schema directory is missing or unreadable
/// - `Error::Schema` if the embedded schema is a different version
pub fn load_schema(source: &SchemaSource, version: &str) -> Result<Cow<'static, str>> {
    match source {
        SchemaSource::Embedded if version == SCHEMA_VERSION => Ok(Cow::Borrowed(EMBEDDED_SCHEMA)),
        SchemaSource::Embedded => Err(Error::Schema(format!(
            "no embedded schema for version {version}"
        ))),
        SchemaSource::Directory(dir) => {
            let path = dir.join(format!("{version}.sql"));
            debug!(path = %path.display(), "loading schema file");
            fs::read_to_string(&path)
                .map(Cow::Owned)
                .map_err(|source| Error::SchemaRead { path, source })
        }
    }
}

/// Applies `sql` to the database inside one transaction.
///
/// Either every statement succeeds and the transaction commits, or the
/// transaction is rolled back when it drops and the file keeps no tables.
pub fn apply_schema(conn: &mut Connection, version: &'static str, sql: &str) -> Result<()> {
    let apply_err = |source| Error::SchemaApply { version, source };

    let tx = conn.transaction().map_err(apply_err)?;
    tx.execute_batch(sql).map_err(apply_err)?;
    tx.commit().map_err(apply_err)?;

    debug!(version, "applied log schema");
    Ok(())
}

/// Makes sure the database carries the log schema, creating it if the file
/// is new.
///
/// # Errors
///
/// - `Error::Sqlite` if `sqlite_master` can't be read
/// - `Error::Schema` for a partial table set, a version mismatch, or an empty
///   file opened read-only
/// - `Error::SchemaRead` / `Error::SchemaApply` from loading and applying
pub fn bootstrap(conn: &mut Connection, mode: OpenMode, source: &SchemaSource) -> Result<()> {
    match schema_status(conn)? {
        SchemaStatus::Empty => {
            if !mode.is_writable() {
                return Err(Error::Schema(
                    "database has no log schema and was opened read-only".to_string(),
                ));
            }
            let sql = load_schema(source, SCHEMA_VERSION)?;
            apply_schema(conn, SCHEMA_VERSION, &sql)
        }
        SchemaStatus::Initialized => match recorded_version(conn)? {
            Some(v) if v == SCHEMA_VERSION => Ok(()),
            Some(v) => Err(Error::Schema(format!(
                "schema version mismatch: database has version {v}, but this build requires {SCHEMA_VERSION}"
            ))),
            None => Err(Error::Schema(
                "database has log tables but no recorded schema version".to_string(),
            )),
        },
        SchemaStatus::Partial(missing) => Err(Error::Schema(format!(
            "database is missing log tables: {}",
            missing.join(", ")
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================
