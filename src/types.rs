//! # Domain Types for topiclog
//!
//! This module defines the small value types that flow through the log:
//! receipt timestamps, topic keys and ids, open modes, and the transaction
//! state reported by the facade.
//!
//! ## Newtypes for Safety
//!
//! [`TopicId`] wraps the store-assigned row id so it can't be confused with a
//! message row id or a timestamp component. [`TopicKey`] is the composite
//! (topic name, message type) identity used as the topic cache key; its
//! derived `Hash`/`Eq` hash both fields structurally.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OpenFlags;

use crate::error::Error;

// =============================================================================
// Receipt Time
// =============================================================================

/// The time a message was received, split into seconds and nanoseconds.
///
/// Stored as two INTEGER columns (`time_recv_sec`, `time_recv_nano`). The log
/// does not normalise or validate the pair; it persists exactly what it is
/// given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ReceiveTime {
    /// Whole seconds.
    pub sec: i64,
    /// Nanoseconds within the second.
    pub nsec: u32,
}

impl ReceiveTime {
    /// Creates a receipt time from its two components.
    pub const fn new(sec: i64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// The current wall-clock time, relative to the Unix epoch.
    ///
    /// A clock set before 1970 yields the epoch itself rather than panicking.
    pub fn now() -> Self {
        SystemTime::now().into()
    }
}

impl From<Duration> for ReceiveTime {
    fn from(d: Duration) -> Self {
        Self {
            sec: d.as_secs() as i64,
            nsec: d.subsec_nanos(),
        }
    }
}

impl From<SystemTime> for ReceiveTime {
    fn from(t: SystemTime) -> Self {
        t.duration_since(UNIX_EPOCH).unwrap_or_default().into()
    }
}

impl fmt::Display for ReceiveTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}

// =============================================================================
// Topic Identification
// =============================================================================

/// The identity of a topic: its name paired with its message type.
///
/// The same name recorded with two different types is two different topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicKey {
    /// Topic name, e.g. `/robot/pose`.
    pub name: String,
    /// Message type name, e.g. `msgs.Pose`.
    pub message_type: String,
}

impl TopicKey {
    /// Creates a topic key.
    pub fn new(name: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_type: message_type.into(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'[{}]", self.name, self.message_type)
    }
}

/// Store-assigned identifier of a (name, type) topic row.
///
/// This is the `topics.id` column, an alias for SQLite's rowid. It is
/// treated as opaque: only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TopicId(i64);

impl TopicId {
    /// Wraps a raw row id.
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id for database storage.
    pub fn as_raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Open Mode
// =============================================================================

/// How the backing database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only. The file must exist and already carry the log schema.
    Read,
    /// Read and write. The file must exist.
    ReadWrite,
    /// Read and write, creating the file (and its schema) if missing.
    ReadWriteCreate,
}

impl OpenMode {
    /// SQLite open flags for this mode.
    ///
    /// A log instance is driven by one thread at a time, so SQLite's
    /// per-connection mutex is disabled.
    pub fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
        match self {
            OpenMode::Read => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }

    /// Whether the schema may be applied through a connection in this mode.
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }
}

impl FromStr for OpenMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "read" => Ok(OpenMode::Read),
            "rw" | "read-write" => Ok(OpenMode::ReadWrite),
            "rwc" | "create" | "read-write-create" => Ok(OpenMode::ReadWriteCreate),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => f.write_str("r"),
            OpenMode::ReadWrite => f.write_str("rw"),
            OpenMode::ReadWriteCreate => f.write_str("rwc"),
        }
    }
}

// =============================================================================
// Transaction State
// =============================================================================

/// Whether an explicit transaction is currently open on the log's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No explicit transaction; SQLite is in autocommit mode.
    #[default]
    Idle,
    /// A `BEGIN` has been issued and not yet committed.
    Active,
}

/// Counters of transaction commands that actually succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionStats {
    /// Successful `BEGIN`s.
    pub begins: u64,
    /// Successful `COMMIT`s.
    pub commits: u64,
}

// =============================================================================
// Tests
// =============================================================================
