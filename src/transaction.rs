//! # Transaction Coordinator
//!
//! Wraps inserts in explicit transactions and commits them on a time basis.
//!
//! ## Why Time-Based Batching?
//!
//! Every SQLite commit waits for the disk. Committing each recorded message
//! on its own would cap throughput at the fsync rate. Instead one transaction
//! stays open and absorbs every insert that arrives within the commit period:
//!
//! ```text
//!   insert ──► BEGIN ─┬─ insert ─ insert ─ ... ─ insert ─┬─► COMMIT
//!                     │◄────────── commit period ───────►│
//!                  watermark                     first insert past period
//! ```
//!
//! The cost is a bounded durability window: if the process dies, at most one
//! commit period's worth of messages is lost.
//!
//! ## State Machine
//!
//! `Idle → Active → Idle`, strictly alternating, never nested. The state only
//! changes after the SQL command succeeds. When a command fails, the
//! coordinator re-reads SQLite's autocommit flag rather than guessing, so it
//! never believes a transaction is open when it isn't (or the reverse).
//!
//! Transactions are driven with raw `BEGIN`/`COMMIT` rather than
//! `rusqlite::Transaction`, because that guard holds a mutable borrow of the
//! connection for as long as it lives, and here a transaction spans many
//! independent calls.

use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{Error, Result, TransactionAction};
use crate::types::{TransactionState, TransactionStats};

/// Time-based transaction batching for a single connection.
#[derive(Debug)]
pub struct TransactionCoordinator {
    state: TransactionState,

    /// When the active transaction began. `None` while idle.
    watermark: Option<Instant>,

    commit_period: Duration,

    stats: TransactionStats,
}

impl TransactionCoordinator {
    /// Creates an idle coordinator.
    pub fn new(commit_period: Duration) -> Self {
        Self {
            state: TransactionState::Idle,
            watermark: None,
            commit_period,
            stats: TransactionStats::default(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn stats(&self) -> TransactionStats {
        self.stats
    }

    pub fn commit_period(&self) -> Duration {
        self.commit_period
    }

    /// Changes the commit period. Takes effect at the next `maybe_commit`.
    pub fn set_commit_period(&mut self, period: Duration) {
        self.commit_period = period;
    }

    /// Begins a transaction unless one is already active.
    ///
    /// # Errors
    ///
    /// `Error::Transaction` if `BEGIN` fails. The coordinator stays idle unless
    /// SQLite reports that a transaction is in fact open.
    pub fn ensure_active(&mut self, conn: &Connection) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }

        if let Err(source) = conn.execute_batch("BEGIN") {
            self.reconcile(conn);
            return Err(Error::Transaction {
                action: TransactionAction::Begin,
                source,
            });
        }

        self.state = TransactionState::Active;
        self.watermark = Some(Instant::now());
        self.stats.begins += 1;
        debug!("began transaction");
        Ok(())
    }

    /// Whether the active transaction has outlived the commit period at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match (self.state, self.watermark) {
            (TransactionState::Active, Some(began)) => {
                now.saturating_duration_since(began) > self.commit_period
            }
            _ => false,
        }
    }

    /// Commits if the active transaction has outlived the commit period.
    ///
    /// Returns whether a commit happened.
    pub fn maybe_commit(&mut self, conn: &Connection) -> Result<bool> {
        if self.is_due(Instant::now()) {
            self.commit(conn)
        } else {
            Ok(false)
        }
    }

    /// Commits the active transaction now, regardless of the period.
    ///
    /// Returns `Ok(false)` if there was nothing to commit.
    pub fn commit(&mut self, conn: &Connection) -> Result<bool> {
        if !self.is_active() {
            return Ok(false);
        }

        if let Err(source) = conn.execute_batch("COMMIT") {
            self.reconcile(conn);
            return Err(Error::Transaction {
                action: TransactionAction::Commit,
                source,
            });
        }

        self.state = TransactionState::Idle;
        self.watermark = None;
        self.stats.commits += 1;
        debug!("committed transaction");
        Ok(true)
    }

    /// Re-syncs the believed state with the connection's real one.
    ///
    /// SQLite rolls a transaction back on its own after some failures (full
    /// disk, I/O errors). Call this after any failed statement. Returns true
    /// if the state had to change.
    pub fn reconcile(&mut self, conn: &Connection) -> bool {
        let actual = if conn.is_autocommit() {
            TransactionState::Idle
        } else {
            TransactionState::Active
        };

        if actual == self.state {
            return false;
        }

        warn!(believed = ?self.state, actual = ?actual, "transaction state out of sync with sqlite");
        self.state = actual;
        self.watermark = match actual {
            TransactionState::Active => self.watermark.or_else(|| Some(Instant::now())),
            TransactionState::Idle => None,
        };
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
