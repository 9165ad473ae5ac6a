//! Commit Batching Tests
//!
//! Tests the time-based transaction policy:
//! - Inserts within the commit period share one transaction
//! - The first insert after the period commits it
//! - Uncommitted rows are invisible to other connections

mod common;

use std::thread::sleep;
use std::time::Duration;

use topiclog::{ReceiveTime, TransactionState, TransactionStats};

/// With the default 500ms period, a quick burst is one begin and no commits;
/// one more insert after the period commits exactly once.
#[test]
fn burst_within_period_then_one_commit() {
    let (_dir, path) = common::temp_path("burst.db");
    let mut log = common::create_log(&path);
    assert_eq!(log.commit_period(), Duration::from_millis(500));

    for i in 0..50 {
        log.insert_message(ReceiveTime::new(i, 0), "/burst", "T", b"x")
            .unwrap();
    }
    assert_eq!(log.transaction_state(), TransactionState::Active);
    assert_eq!(log.transaction_stats(), TransactionStats { begins: 1, commits: 0 });

    sleep(Duration::from_millis(600));
    log.insert_message(ReceiveTime::new(50, 0), "/burst", "T", b"x")
        .unwrap();

    assert_eq!(log.transaction_state(), TransactionState::Idle);
    assert_eq!(log.transaction_stats(), TransactionStats { begins: 1, commits: 1 });
}

/// Two identical inserts in quick succession: one type, one topic, two
/// messages, transaction still open.
#[test]
fn two_identical_inserts_share_transaction() {
    let (_dir, path) = common::temp_path("pair.db");
    let mut log = common::create_log(&path);

    log.insert_message(ReceiveTime::new(5, 0), "topic1", "TypeA", b"hello")
        .unwrap();
    log.insert_message(ReceiveTime::new(5, 0), "topic1", "TypeA", b"hello")
        .unwrap();

    let counts = log.row_counts().unwrap();
    assert_eq!(counts.message_types, 1);
    assert_eq!(counts.topics, 1);
    assert_eq!(counts.messages, 2);
    assert_eq!(log.transaction_state(), TransactionState::Active);
}

/// Pending rows only become visible to readers once committed.
#[test]
fn pending_rows_invisible_until_commit() {
    let (_dir, path) = common::temp_path("visibility.db");
    let mut log = common::create_log_with_period(&path, Duration::from_millis(50));

    log.insert_message(ReceiveTime::new(1, 0), "/v", "T", b"x")
        .unwrap();
    {
        let reader = common::open_read_only(&path);
        assert_eq!(common::count(&reader, "messages"), 0);
    }

    sleep(Duration::from_millis(80));
    log.insert_message(ReceiveTime::new(2, 0), "/v", "T", b"y")
        .unwrap();
    assert_eq!(log.transaction_state(), TransactionState::Idle);

    let reader = common::open_read_only(&path);
    assert_eq!(common::count(&reader, "messages"), 2);
}

/// Each period gets its own transaction.
#[test]
fn transactions_alternate_across_periods() {
    let (_dir, path) = common::temp_path("periods.db");
    let mut log = common::create_log_with_period(&path, Duration::from_millis(20));

    for round in 0..3 {
        log.insert_message(ReceiveTime::new(round, 0), "/p", "T", b"a")
            .unwrap();
        sleep(Duration::from_millis(40));
        log.insert_message(ReceiveTime::new(round, 1), "/p", "T", b"b")
            .unwrap();
        assert_eq!(log.transaction_state(), TransactionState::Idle);
    }

    assert_eq!(log.transaction_stats(), TransactionStats { begins: 3, commits: 3 });
}

#[test]
fn flush_commits_without_waiting() {
    let (_dir, path) = common::temp_path("flush.db");
    let mut log = common::create_log(&path);

    log.insert_message(ReceiveTime::new(1, 0), "/f", "T", b"x")
        .unwrap();
    assert!(log.flush().unwrap());
    assert!(!log.flush().unwrap());

    let reader = common::open_read_only(&path);
    assert_eq!(common::count(&reader, "messages"), 1);
    assert_eq!(log.transaction_stats(), TransactionStats { begins: 1, commits: 1 });
}
