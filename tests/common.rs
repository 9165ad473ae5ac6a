#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use topiclog::{Log, LogConfig, OpenMode};

pub fn temp_path(name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let path = dir.path().join(name);
    (dir, path)
}

pub fn create_log(path: &Path) -> Log {
    Log::open_new(path, OpenMode::ReadWriteCreate).expect("create log")
}

pub fn create_log_with_period(path: &Path, commit_period: Duration) -> Log {
    let mut log = Log::with_config(LogConfig::default().with_commit_period(commit_period));
    log.open(path, OpenMode::ReadWriteCreate).expect("create log");
    log
}

pub fn open_read_only(path: &Path) -> Connection {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .expect("open read-only connection")
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}

pub fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .expect("prepare");
    stmt.query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect")
}

/// A message row as persisted: (sec, nsec, payload, topic name, type name).
pub type RawMessage = (i64, i64, Vec<u8>, String, String);

pub fn read_raw_messages(conn: &Connection) -> Vec<RawMessage> {
    let mut stmt = conn
        .prepare(
            "SELECT m.time_recv_sec, m.time_recv_nano, m.message, t.name, mt.name
             FROM messages m
             JOIN topics t ON t.id = m.topic_id
             JOIN message_types mt ON mt.id = t.message_type_id
             ORDER BY m.id",
        )
        .expect("prepare");
    stmt.query_map([], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    })
    .expect("query")
    .collect::<Result<Vec<_>, _>>()
    .expect("collect")
}

pub fn topic_id_in_db(conn: &Connection, name: &str, message_type: &str) -> Option<i64> {
    conn.query_row(
        "SELECT t.id FROM topics t JOIN message_types mt ON mt.id = t.message_type_id
         WHERE t.name = ?1 AND mt.name = ?2",
        [name, message_type],
        |row| row.get(0),
    )
    .ok()
}
