//! Configuration for a [`Log`](crate::Log) instance.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a transaction may stay open before the next insert commits it.
///
/// Two commits per second: at most half a second of messages is at risk on
/// abnormal termination.
pub const DEFAULT_COMMIT_PERIOD_MS: u64 = 500;

/// Where the schema definition is loaded from when a new log is created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SchemaSource {
    /// The DDL compiled into this crate.
    #[default]
    Embedded,
    /// A directory holding `<version>.sql` files, e.g. an install prefix's
    /// `share/topiclog/schema`.
    Directory(PathBuf),
}

impl SchemaSource {
    /// Schema files are looked up in `dir` as `<version>.sql`.
    pub fn directory(dir: impl AsRef<Path>) -> Self {
        SchemaSource::Directory(dir.as_ref().to_path_buf())
    }
}

/// Configuration for a log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// How long writes may stay uncommitted before an insert flushes them.
    pub commit_period: Duration,

    /// Where to load the schema from when bootstrapping a new file.
    pub schema: SchemaSource,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            commit_period: Duration::from_millis(DEFAULT_COMMIT_PERIOD_MS),
            schema: SchemaSource::Embedded,
        }
    }
}

impl LogConfig {
    /// Sets the commit period.
    pub fn with_commit_period(mut self, period: Duration) -> Self {
        self.commit_period = period;
        self
    }

    /// Sets the schema source.
    pub fn with_schema(mut self, schema: SchemaSource) -> Self {
        self.schema = schema;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.commit_period, Duration::from_millis(500));
        assert_eq!(config.schema, SchemaSource::Embedded);
    }

    #[test]
    fn test_builders() {
        let config = LogConfig::default()
            .with_commit_period(Duration::from_millis(20))
            .with_schema(SchemaSource::directory("/usr/share/topiclog/schema"));

        assert_eq!(config.commit_period, Duration::from_millis(20));
        assert_eq!(
            config.schema,
            SchemaSource::Directory(PathBuf::from("/usr/share/topiclog/schema"))
        );
    }
}
