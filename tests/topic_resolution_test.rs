//! Topic Resolution Tests
//!
//! Tests the invariants around topic ids:
//! - Repeated (name, type) pairs resolve to one id and one row each
//! - The message type is part of a topic's identity
//! - Cached ids match the database, and a cold cache finds the same ids

mod common;

use topiclog::{Log, OpenMode, ReceiveTime};

#[test]
fn repeated_pair_creates_one_type_and_one_topic() {
    let (_dir, path) = common::temp_path("repeat.db");
    let mut log = common::create_log(&path);

    for i in 0..100 {
        log.insert_message(ReceiveTime::new(i, 0), "/pose", "msgs.Pose", b"p")
            .unwrap();
    }

    let counts = log.row_counts().unwrap();
    assert_eq!(counts.message_types, 1);
    assert_eq!(counts.topics, 1);
    assert_eq!(counts.messages, 100);
    assert_eq!(log.cached_topics(), 1);
    drop(log);

    let conn = common::open_read_only(&path);
    let topic_ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT DISTINCT topic_id FROM messages").unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    };
    assert_eq!(topic_ids.len(), 1);
}

#[test]
fn same_name_different_type_is_a_different_topic() {
    let (_dir, path) = common::temp_path("types.db");
    let mut log = common::create_log(&path);

    log.insert_message(ReceiveTime::new(1, 0), "t", "A", b"a")
        .unwrap();
    log.insert_message(ReceiveTime::new(2, 0), "t", "B", b"b")
        .unwrap();
    drop(log);

    let conn = common::open_read_only(&path);
    let a = common::topic_id_in_db(&conn, "t", "A").expect("topic t[A]");
    let b = common::topic_id_in_db(&conn, "t", "B").expect("topic t[B]");
    assert_ne!(a, b);
    assert_eq!(common::count(&conn, "message_types"), 2);
    assert_eq!(common::count(&conn, "topics"), 2);

    let messages = common::read_raw_messages(&conn);
    assert_eq!(messages[0].4, "A");
    assert_eq!(messages[1].4, "B");
}

/// A fresh instance over the same file reuses the stored ids instead of
/// creating duplicate topic rows.
#[test]
fn cold_cache_reresolves_to_stored_ids() {
    let (_dir, path) = common::temp_path("cold.db");

    let topics = [("/a", "T1"), ("/b", "T1"), ("/a", "T2")];
    {
        let mut log = common::create_log(&path);
        for (i, (name, ty)) in topics.iter().enumerate() {
            log.insert_message(ReceiveTime::new(i as i64, 0), name, ty, b"first")
                .unwrap();
        }
    }

    let before: Vec<i64> = {
        let conn = common::open_read_only(&path);
        topics
            .iter()
            .map(|(name, ty)| common::topic_id_in_db(&conn, name, ty).unwrap())
            .collect()
    };

    {
        let mut log = Log::open_new(&path, OpenMode::ReadWrite).unwrap();
        assert_eq!(log.cached_topics(), 0);
        for (i, (name, ty)) in topics.iter().enumerate() {
            log.insert_message(ReceiveTime::new(10 + i as i64, 0), name, ty, b"second")
                .unwrap();
        }
        assert_eq!(log.cached_topics(), 3);
    }

    let conn = common::open_read_only(&path);
    assert_eq!(common::count(&conn, "topics"), 3);
    assert_eq!(common::count(&conn, "message_types"), 2);

    let after: Vec<i64> = topics
        .iter()
        .map(|(name, ty)| common::topic_id_in_db(&conn, name, ty).unwrap())
        .collect();
    assert_eq!(before, after);

    // Both sessions' messages reference the same topic rows.
    let per_topic: i64 = conn
        .query_row(
            "SELECT MAX(n) FROM (SELECT COUNT(*) AS n FROM messages GROUP BY topic_id)",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(per_topic, 2);
}

/// Topic names are stored verbatim; this layer does no syntax validation.
#[test]
fn topic_names_are_not_revalidated() {
    let (_dir, path) = common::temp_path("names.db");
    let mut log = common::create_log(&path);

    let long_name = format!("/{}", "n".repeat(65_534));
    let names = ["@/partition@/ns/topic", "/unicode/ñandú", long_name.as_str()];
    for (i, name) in names.iter().enumerate() {
        log.insert_message(ReceiveTime::new(i as i64, 0), name, "T", b"x")
            .unwrap();
    }
    drop(log);

    let conn = common::open_read_only(&path);
    for name in names {
        assert!(common::topic_id_in_db(&conn, name, "T").is_some());
    }
}
