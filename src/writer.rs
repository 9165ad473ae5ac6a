//! # Message Insertion
//!
//! Appends one message row. The payload is opaque: no validation of content
//! or size happens here. A single `INSERT` is atomic, so a failure at bind or
//! execute time leaves no partial row.
//!
//! Rows carry no sequence column; the rowid SQLite assigns on append defines
//! log order.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::types::{ReceiveTime, TopicId};

const INSERT_MESSAGE: &str = "INSERT INTO messages (time_recv_sec, time_recv_nano, message, topic_id) \
     VALUES (?1, ?2, ?3, ?4)";

/// Inserts a message row referencing `topic`.
///
/// Returns the new row's id.
///
/// # Errors
///
/// `Error::Sqlite` if the statement fails to compile, bind, or execute, e.g.
/// when `topic` references no topic row or the disk is full.
pub fn insert_message(
    conn: &Connection,
    time: ReceiveTime,
    topic: TopicId,
    payload: &[u8],
) -> Result<i64> {
    conn.prepare_cached(INSERT_MESSAGE)?
        .execute(params![time.sec, time.nsec, payload, topic.as_raw()])?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaSource;
    use crate::schema::bootstrap;
    use crate::topics::TopicResolver;
    use crate::types::OpenMode;

    fn log_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        bootstrap(&mut conn, OpenMode::ReadWriteCreate, &SchemaSource::Embedded).unwrap();
        conn
    }

    #[test]
    fn test_insert_binds_every_field() {
        let conn = log_conn();
        let topic = TopicResolver::new().resolve(&conn, "/chatter", "msgs.StringMsg").unwrap();

        let payload = [0u8, 1, 2, 0xff, 0];
        insert_message(&conn, ReceiveTime::new(1_500_000_000, 999_999_999), topic, &payload)
            .unwrap();

        let (sec, nsec, data, topic_id): (i64, i64, Vec<u8>, i64) = conn
            .query_row(
                "SELECT time_recv_sec, time_recv_nano, message, topic_id FROM messages",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();

        assert_eq!(sec, 1_500_000_000);
        assert_eq!(nsec, 999_999_999);
        assert_eq!(data, payload);
        assert_eq!(topic_id, topic.as_raw());
    }

    /// Row ids follow call order.
    #[test]
    fn test_rows_append_in_call_order() {
        let conn = log_conn();
        let topic = TopicResolver::new().resolve(&conn, "/seq", "msgs.Int").unwrap();

        let ids: Vec<i64> = (0..10u8)
            .map(|i| insert_message(&conn, ReceiveTime::new(0, 0), topic, &[i]).unwrap())
            .collect();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_payload_is_stored() {
        let conn = log_conn();
        let topic = TopicResolver::new().resolve(&conn, "/empty", "msgs.Empty").unwrap();

        insert_message(&conn, ReceiveTime::new(1, 0), topic, &[]).unwrap();

        let len: i64 = conn
            .query_row("SELECT length(message) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(len, 0);
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let conn = log_conn();

        let err = insert_message(&conn, ReceiveTime::new(1, 0), TopicId::from_raw(42), b"x")
            .unwrap_err();

        assert!(err.is_statement_error());
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }
}
