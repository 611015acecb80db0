//! Application configuration loaded from environment variables.

use std::time::Duration;

use propagation::WorkerConfig;
use queue::QueueConfig;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default: `"0.0.0.0"`) and `PORT` (default: `3000`)
/// - `RUST_LOG`, tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`, `json` for JSON log lines
/// - `DATABASE_URL`, Postgres for the write store and queue; in memory when unset
/// - `DATABASE_MAX_CONNECTIONS` (default: `10`)
/// - `SYNC_MAX_CONCURRENCY` (default: `16`) and `SYNC_POLL_INTERVAL_MS` (default: `500`)
/// - `QUEUE_MAX_DELIVERY_ATTEMPTS` (default: `5`), `QUEUE_VISIBILITY_TIMEOUT_SECS`
///   (default: `30`), `QUEUE_BASE_BACKOFF_MS` (default: `1000`) and
///   `QUEUE_MAX_BACKOFF_MS` (default: `60000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub worker: WorkerConfig,
    pub queue: QueueConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        let defaults = Self::default();
        let queue_defaults = defaults.queue;
        let worker_defaults = defaults.worker;

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            worker: WorkerConfig {
                max_concurrent_deliveries: parsed(&lookup, "SYNC_MAX_CONCURRENCY")
                    .unwrap_or(worker_defaults.max_concurrent_deliveries),
                poll_interval: parsed(&lookup, "SYNC_POLL_INTERVAL_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(worker_defaults.poll_interval),
            },
            queue: QueueConfig {
                max_delivery_attempts: parsed(&lookup, "QUEUE_MAX_DELIVERY_ATTEMPTS")
                    .unwrap_or(queue_defaults.max_delivery_attempts),
                visibility_timeout: parsed(&lookup, "QUEUE_VISIBILITY_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(queue_defaults.visibility_timeout),
                base_backoff: parsed(&lookup, "QUEUE_BASE_BACKOFF_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(queue_defaults.base_backoff),
                max_backoff: parsed(&lookup, "QUEUE_MAX_BACKOFF_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(queue_defaults.max_backoff),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            worker: WorkerConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}
