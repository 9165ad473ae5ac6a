//! topiclog Insert Benchmark
//!
//! Drives the log's write path with synthetic messages and reports throughput.
//! Run with: `cargo run --release --bin insert_bench -- [OPTIONS]`
//!
//! # Examples
//!
//! ```bash
//! # Default: 100k messages over 10 topics, 64-byte payloads
//! cargo run --release --bin insert_bench
//!
//! # Commit every 50ms instead of every 500ms, with debug logging
//! RUST_LOG=topiclog=debug cargo run --release --bin insert_bench -- --commit-period-ms 50
//!
//! # Append to an existing recording
//! cargo run --release --bin insert_bench -- --db rec.tlog --mode rw
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use topiclog::{Log, LogConfig, OpenMode, ReceiveTime, DEFAULT_COMMIT_PERIOD_MS};
use tracing_subscriber::EnvFilter;

/// Benchmark configuration
struct Config {
    /// Total number of messages to insert
    num_messages: usize,
    /// Number of distinct topics to spread messages over
    num_topics: usize,
    /// Payload size in bytes
    payload_size: usize,
    /// Transaction commit period
    commit_period: Duration,
    /// Path to database file (or temp if None)
    db_path: Option<PathBuf>,
    /// How to open the database file
    mode: OpenMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_messages: 100_000,
            num_topics: 10,
            payload_size: 64,
            commit_period: Duration::from_millis(DEFAULT_COMMIT_PERIOD_MS),
            db_path: None,
            mode: OpenMode::ReadWriteCreate,
        }
    }
}

const USAGE: &str = r#"topiclog Insert Benchmark

Usage: insert_bench [OPTIONS]

Options:
  -n, --messages <N>          Total messages to insert (default: 100000)
  -t, --topics <N>            Distinct topics (default: 10)
  -p, --payload <BYTES>       Payload size (default: 64)
  --commit-period-ms <MS>     Transaction commit period (default: 500)
  -d, --db <PATH>             Database path (default: temp file)
  -m, --mode <r|rw|rwc>       Open mode (default: rwc)
  -h, --help                  Show this help
"#;

fn parse_args() -> Result<Config, String> {
    let mut args = std::env::args().skip(1);
    let mut config = Config::default();

    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("missing value for {arg}"));
        match arg.as_str() {
            "--messages" | "-n" => config.num_messages = parse_num(&value()?, "--messages")?,
            "--topics" | "-t" => config.num_topics = parse_num(&value()?, "--topics")?.max(1),
            "--payload" | "-p" => config.payload_size = parse_num(&value()?, "--payload")?,
            "--commit-period-ms" => {
                let ms = parse_num(&value()?, "--commit-period-ms")?;
                config.commit_period = Duration::from_millis(ms as u64);
            }
            "--db" | "-d" => config.db_path = Some(PathBuf::from(value()?)),
            "--mode" | "-m" => config.mode = value()?.parse().map_err(|e: topiclog::Error| e.to_string())?,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(config)
}

fn parse_num(value: &str, flag: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {flag} value: {value}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("insert_bench failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Keep the temp dir alive until the end of the run.
    let temp_dir = match config.db_path {
        Some(_) => None,
        None => Some(std::env::temp_dir().join(format!("topiclog-bench-{}", std::process::id()))),
    };
    if let Some(dir) = &temp_dir {
        std::fs::create_dir_all(dir)?;
    }
    let db_path = config
        .db_path
        .clone()
        .or_else(|| temp_dir.as_ref().map(|dir| dir.join("bench.tlog")))
        .unwrap_or_else(|| PathBuf::from("bench.tlog"));

    println!("topiclog Insert Benchmark");
    println!("=========================");
    println!("Messages:      {}", config.num_messages);
    println!("Topics:        {}", config.num_topics);
    println!("Payload:       {} bytes", config.payload_size);
    println!("Commit period: {:?}", config.commit_period);
    println!("Database:      {} ({})", db_path.display(), config.mode);
    println!();

    let mut log = Log::with_config(LogConfig::default().with_commit_period(config.commit_period));
    log.open(&db_path, config.mode)?;

    let topics: Vec<String> = (0..config.num_topics)
        .map(|i| format!("/bench/topic_{i}"))
        .collect();
    let payload = vec![0xA5u8; config.payload_size];

    let mut failed = 0u64;
    let start = Instant::now();
    for i in 0..config.num_messages {
        let topic = &topics[i % topics.len()];
        if log
            .insert_message(ReceiveTime::now(), topic, "bench.Payload", &payload)
            .is_err()
        {
            failed += 1;
        }
    }
    log.flush()?;
    let elapsed = start.elapsed();

    let counts = log.row_counts()?;
    let stats = log.transaction_stats();
    log.close()?;

    let written = config.num_messages as u64 - failed;
    println!("Results");
    println!("-------");
    println!("Inserted:      {written}");
    println!("Failed:        {failed}");
    println!("Duration:      {elapsed:?}");
    println!(
        "Throughput:    {:.2} messages/sec",
        written as f64 / elapsed.as_secs_f64()
    );
    println!("Transactions:  {} begun, {} committed", stats.begins, stats.commits);
    println!(
        "Rows:          {} message types, {} topics, {} messages",
        counts.message_types, counts.topics, counts.messages
    );

    if let Some(dir) = temp_dir {
        let _ = std::fs::remove_dir_all(dir);
    }
    Ok(())
}
