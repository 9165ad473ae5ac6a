//! # Error Handling for topiclog
//!
//! This module defines the error type used throughout the crate. A single
//! error enum ([`Error`]) represents every failure mode of the log, which keeps
//! the facade's signatures simple: every operation returns [`Result`].
//!
//! ## Error Categories
//!
//! | Category    | Variants                                        | Effect on the store                    |
//! |-------------|-------------------------------------------------|----------------------------------------|
//! | Connection  | `Connection`, `InvalidMode`                     | `open` fails, nothing usable           |
//! | Schema      | `SchemaRead`, `SchemaApply`, `Schema`           | `open` fails, nothing usable           |
//! | Statement   | `Sqlite`                                        | one insert fails, store stays open     |
//! | Transaction | `Transaction`                                   | state only advances on success         |
//! | Misuse      | `AlreadyOpen`, `NotOpen`                        | call rejected, store unchanged         |
//!
//! None of these are process-fatal. A failed insert simply does not persist
//! that message; the caller decides whether to retry.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Transaction Actions
// =============================================================================

/// The transaction command that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    /// `BEGIN`
    Begin,
    /// `COMMIT`
    Commit,
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionAction::Begin => f.write_str("begin"),
            TransactionAction::Commit => f.write_str("commit"),
        }
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// All errors that can occur in topiclog operations.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Open-time Errors (fatal to `open`)
    // =========================================================================

    /// The database file could not be opened or created in the requested mode.
    ///
    /// # When This Happens
    ///
    /// - `Read`/`ReadWrite` on a path that does not exist
    /// - The parent directory is missing or not writable
    /// - The file is not a SQLite database
    #[error("failed to open log '{}': {source}", path.display())]
    Connection {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying SQLite failure
        #[source]
        source: rusqlite::Error,
    },

    /// An open mode string did not name a known mode.
    #[error("unknown open mode '{0}' (expected one of: r, rw, rwc)")]
    InvalidMode(String),

    /// The schema definition file could not be read.
    #[error("failed to read schema file '{}': {source}", path.display())]
    SchemaRead {
        /// Location the schema was expected at
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The schema definition was read but could not be applied.
    ///
    /// Malformed DDL, a full disk, or a read-only file all end up here. The
    /// schema is applied inside one transaction, so a failure leaves no
    /// partial tables behind.
    #[error("failed to apply schema {version}: {source}")]
    SchemaApply {
        /// Schema version tag being applied
        version: &'static str,
        /// Underlying SQLite failure
        #[source]
        source: rusqlite::Error,
    },

    /// The database does not carry a usable log schema.
    ///
    /// Raised for a version mismatch, a partially created table set, or an
    /// empty file opened read-only (the schema cannot be applied).
    #[error("schema error: {0}")]
    Schema(String),

    // =========================================================================
    // Per-call Errors (store stays open)
    // =========================================================================

    /// A statement failed to compile, bind, or execute.
    ///
    /// The `#[from]` attribute lets `?` convert any `rusqlite::Error` raised
    /// while resolving a topic or inserting a message into this variant.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A `BEGIN` or `COMMIT` failed.
    ///
    /// The transaction coordinator only changes state after the command
    /// succeeds, so after this error its view still matches SQLite's.
    #[error("failed to {action} transaction: {source}")]
    Transaction {
        /// Which command failed
        action: TransactionAction,
        /// Underlying SQLite failure
        #[source]
        source: rusqlite::Error,
    },

    // =========================================================================
    // Facade Misuse
    // =========================================================================

    /// `open` was called on an instance that already has a store open.
    #[error("a log is already open at '{}'", path.display())]
    AlreadyOpen {
        /// Path of the store that is currently open
        path: PathBuf,
    },

    /// An operation that needs an open store was called before `open`.
    #[error("no log is open")]
    NotOpen,
}

impl Error {
    /// Returns true for per-statement failures (compile, bind, execute).
    ///
    /// These abort a single insert but leave the store open and any active
    /// transaction pending, so the caller may carry on with the next message.
    pub fn is_statement_error(&self) -> bool {
        matches!(self, Error::Sqlite(_))
    }

    /// Returns true if a `BEGIN` or `COMMIT` failed.
    pub fn is_transaction_error(&self) -> bool {
        matches!(self, Error::Transaction { .. })
    }

    /// Returns true for failures that can only happen while opening a store.
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. }
                | Error::InvalidMode(_)
                | Error::SchemaRead { .. }
                | Error::SchemaApply { .. }
                | Error::Schema(_)
                | Error::AlreadyOpen { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Tests
// =============================================================================
