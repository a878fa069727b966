//! Stream Configuration Settings
//!
//! Configuration types for the stream sessions and the binary, loaded from
//! environment variables. Malformed numeric values fall back to defaults;
//! unknown topics, intervals and policies are errors.

use std::str::FromStr;
use std::time::Duration;

use crate::domain::streaming::{Interval, StreamTopic, TargetError};
use crate::infrastructure::binance::{
    ExecutionReportPolicy, LivenessConfig, RetryConfig, SessionConfig, StreamSettings,
    DEFAULT_BASE_URL,
};

/// Opaque account stream key.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamKey(String);

impl StreamKey {
    /// Wrap a key.
    #[must_use]
    pub const fn new(key: String) -> Self {
        Self(key)
    }

    /// Get the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamKey([REDACTED])")
    }
}

/// Which streams the binary opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Symbols to open market streams for.
    pub symbols: Vec<String>,
    /// Market topics opened per symbol.
    pub topics: Vec<StreamTopic>,
    /// Interval for kline streams.
    pub kline_interval: Interval,
    /// Account stream key; the account session is opened when set.
    pub stream_key: Option<StreamKey>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string()],
            topics: vec![
                StreamTopic::OrderBookDelta,
                StreamTopic::Kline,
                StreamTopic::AggTrade,
                StreamTopic::Trade,
            ],
            kline_interval: Interval::OneMinute,
            stream_key: None,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { metrics_port: 9091 }
    }
}

impl ServerSettings {
    /// Metrics listener port, if enabled.
    #[must_use]
    pub const fn metrics_listener(&self) -> Option<u16> {
        match self.metrics_port {
            0 => None,
            port => Some(port),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Session factory settings.
    pub stream: StreamSettings,
    /// Streams to open.
    pub feed: FeedSettings,
    /// Dial retry backoff.
    pub retry: RetryConfig,
    /// Server port settings.
    pub server: ServerSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown topics, intervals or policies, or when the
    /// account topic is requested without a stream key.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let liveness = LivenessConfig::default();
        let retry_defaults = RetryConfig::default();

        let execution_reports = match env.non_empty("BINANCE_STREAM_EXECUTION_REPORTS") {
            Some(value) => ExecutionReportPolicy::parse(&value).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: "BINANCE_STREAM_EXECUTION_REPORTS",
                    value,
                }
            })?,
            None => ExecutionReportPolicy::default(),
        };

        let stream = StreamSettings {
            base_url: env
                .non_empty("BINANCE_STREAM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            session: SessionConfig {
                liveness: LivenessConfig {
                    ping_interval: env.positive_duration_millis(
                        "BINANCE_STREAM_PING_INTERVAL_MS",
                        liveness.ping_interval,
                    ),
                    shutdown_grace: env.duration_millis(
                        "BINANCE_STREAM_SHUTDOWN_GRACE_MS",
                        liveness.shutdown_grace,
                    ),
                },
                channel_capacity: env
                    .parse("BINANCE_STREAM_CHANNEL_CAPACITY", SessionConfig::default().channel_capacity)
                    .max(1),
            },
            execution_reports,
        };

        let defaults = FeedSettings::default();
        let symbols = env
            .list("BINANCE_STREAM_SYMBOLS")
            .unwrap_or(defaults.symbols);

        let requested = match env.list("BINANCE_STREAM_TOPICS") {
            Some(names) => names
                .iter()
                .map(|name| StreamTopic::from_str(name))
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.topics,
        };

        let stream_key = env.non_empty("BINANCE_STREAM_KEY").map(StreamKey::new);
        if requested.contains(&StreamTopic::AccountUpdate) && stream_key.is_none() {
            return Err(ConfigError::MissingEnvVar("BINANCE_STREAM_KEY"));
        }

        let mut topics = Vec::new();
        for topic in requested {
            if topic != StreamTopic::AccountUpdate && !topics.contains(&topic) {
                topics.push(topic);
            }
        }

        let kline_interval = match env.non_empty("BINANCE_STREAM_KLINE_INTERVAL") {
            Some(tag) => Interval::from_str(&tag)?,
            None => defaults.kline_interval,
        };

        let retry = RetryConfig {
            initial_delay: env.positive_duration_millis(
                "BINANCE_STREAM_DIAL_RETRY_INITIAL_MS",
                retry_defaults.initial_delay,
            ),
            max_delay: env.duration_secs(
                "BINANCE_STREAM_DIAL_RETRY_MAX_SECS",
                retry_defaults.max_delay,
            ),
            multiplier: env.parse(
                "BINANCE_STREAM_DIAL_RETRY_MULTIPLIER",
                retry_defaults.multiplier,
            ),
            jitter_factor: retry_defaults.jitter_factor,
            max_attempts: env.parse(
                "BINANCE_STREAM_DIAL_RETRY_MAX_ATTEMPTS",
                retry_defaults.max_attempts,
            ),
        };

        let server = ServerSettings {
            metrics_port: env.parse(
                "BINANCE_STREAM_METRICS_PORT",
                ServerSettings::default().metrics_port,
            ),
        };

        Ok(Self {
            stream,
            feed: FeedSettings {
                symbols,
                topics,
                kline_interval,
                stream_key,
            },
            retry,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// Environment variable has a value that is not accepted.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
    /// Unknown topic or interval.
    #[error(transparent)]
    Target(#[from] TargetError),
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn non_empty(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> T {
        self.non_empty(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.non_empty(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }

    /// Like `duration_millis`, but zero also falls back to the default.
    fn positive_duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.non_empty(key)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&millis| millis > 0)
            .map_or(default, Duration::from_millis)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.non_empty(key)
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .non_empty(key)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!items.is_empty()).then_some(items)
    }
}
