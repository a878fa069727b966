//! Binance Stream Binary
//!
//! Opens the configured exchange streams and logs their events until
//! shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin binance-stream
//! ```
//!
//! # Environment Variables
//!
//! - `BINANCE_STREAM_SYMBOLS`: comma-separated symbols (default: BTCUSDT)
//! - `BINANCE_STREAM_TOPICS`: comma-separated topics (default: depth,kline,aggTrade,trade)
//! - `BINANCE_STREAM_KLINE_INTERVAL`: kline interval (default: 1m)
//! - `BINANCE_STREAM_KEY`: account stream key; opens the account stream when set
//! - `BINANCE_STREAM_EXECUTION_REPORTS`: log | emit (default: log)
//! - `BINANCE_STREAM_BASE_URL`: WebSocket base URL
//! - `BINANCE_STREAM_PING_INTERVAL_MS`: keep-alive ping interval (default: 1000)
//! - `BINANCE_STREAM_SHUTDOWN_GRACE_MS`: wait for a session after shutdown (default: 1000)
//! - `BINANCE_STREAM_CHANNEL_CAPACITY`: event channel capacity (default: 1)
//! - `BINANCE_STREAM_DIAL_RETRY_*`: dial backoff (`INITIAL_MS`, `MAX_SECS`, `MULTIPLIER`, `MAX_ATTEMPTS`)
//! - `BINANCE_STREAM_METRICS_PORT`: Prometheus port, 0 disables (default: 9091)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: true)
//! - `RUST_LOG`: Log level (default: info)

use std::fmt::Debug;
use std::time::Duration;

use anyhow::Context;
use binance_stream::{
    AppConfig, BinanceStreams, DoneSignal, RetryError, SessionStats, StreamHandle, StreamTopic,
    TungsteniteDialer, init_metrics, init_telemetry, open_with_retry,
};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Extra time granted to sessions beyond their own grace period.
const DRAIN_MARGIN: Duration = Duration::from_millis(500);

/// A session whose events are being consumed.
struct RunningSession {
    label: String,
    topic: StreamTopic,
    session_id: Uuid,
    done: DoneSignal,
    stats: SessionStats,
    consumer: JoinHandle<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = init_telemetry().context("failed to initialize telemetry")?;

    tracing::info!("Starting Binance stream");

    let config = AppConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    init_metrics(config.server.metrics_listener()).context("failed to initialize metrics")?;

    let shutdown = CancellationToken::new();
    let streams = BinanceStreams::new(TungsteniteDialer::default(), config.stream.clone());

    let mut targets: Vec<(StreamTopic, &str)> = Vec::new();
    for symbol in &config.feed.symbols {
        for topic in &config.feed.topics {
            targets.push((*topic, symbol.as_str()));
        }
    }
    if let Some(key) = &config.feed.stream_key {
        targets.push((StreamTopic::AccountUpdate, key.as_str()));
    }

    let mut sessions = Vec::new();
    for (topic, param) in targets {
        match open_stream(&streams, &config, topic, param, &shutdown).await {
            Ok(session) => sessions.push(session),
            Err(RetryError::Cancelled) => break,
            Err(e) => tracing::error!(topic = %topic, error = %e, "Failed to open stream"),
        }
    }

    if sessions.is_empty() {
        anyhow::bail!("no stream could be opened");
    }

    tracing::info!(sessions = sessions.len(), "Streams running");

    await_shutdown(&shutdown, &sessions).await;

    let drain = config.stream.session.liveness.shutdown_grace + DRAIN_MARGIN;
    for session in sessions {
        if tokio::time::timeout(drain, session.done.wait()).await.is_err() {
            tracing::warn!(stream = %session.label, "Session did not stop in time");
        }
        let consumed = match tokio::time::timeout(drain, session.consumer).await {
            Ok(Ok(count)) => count,
            _ => 0,
        };
        tracing::info!(
            stream = %session.label,
            topic = %session.topic,
            session_id = %session.session_id,
            frames_read = session.stats.frames_read(),
            events_published = session.stats.events_published(),
            events_withheld = session.stats.events_withheld(),
            events_dropped = session.stats.events_dropped(),
            consumed,
            "Session summary"
        );
    }

    tracing::info!("Binance stream stopped");
    Ok(())
}

/// Open one stream with dial retry and start consuming it.
async fn open_stream(
    streams: &BinanceStreams<TungsteniteDialer>,
    config: &AppConfig,
    topic: StreamTopic,
    param: &str,
    shutdown: &CancellationToken,
) -> Result<RunningSession, RetryError> {
    let retry = config.retry;
    let label = match topic {
        StreamTopic::AccountUpdate => topic.to_string(),
        _ => format!("{param}@{topic}"),
    };

    let session = match topic {
        StreamTopic::OrderBookDelta => {
            let handle = open_with_retry(topic, retry, shutdown, || streams.depth(param, shutdown)).await?;
            consume(handle, label)
        }
        StreamTopic::Kline => {
            let interval = config.feed.kline_interval;
            let handle =
                open_with_retry(topic, retry, shutdown, || streams.kline(param, interval, shutdown))
                    .await?;
            consume(handle, label)
        }
        StreamTopic::AggTrade => {
            let handle =
                open_with_retry(topic, retry, shutdown, || streams.agg_trades(param, shutdown)).await?;
            consume(handle, label)
        }
        StreamTopic::Trade => {
            let handle = open_with_retry(topic, retry, shutdown, || streams.trades(param, shutdown)).await?;
            consume(handle, label)
        }
        StreamTopic::AccountUpdate => {
            let handle =
                open_with_retry(topic, retry, shutdown, || streams.user_data(param, shutdown)).await?;
            consume(handle, label)
        }
    };

    Ok(session)
}

/// Spawn a consumer that logs every event and returns how many it saw.
fn consume<E: Debug + Send + 'static>(handle: StreamHandle<E>, label: String) -> RunningSession {
    let topic = handle.topic();
    let session_id = handle.session_id();
    let done = handle.done().clone();
    let stats = handle.stats().clone();
    let mut events = handle.into_stream();

    let stream = label.clone();
    let consumer = tokio::spawn(async move {
        let mut count = 0_u64;
        while let Some(event) = events.next().await {
            count += 1;
            tracing::debug!(stream = %stream, event = ?event, "Event");
        }
        tracing::debug!(stream = %stream, count, "Event channel closed");
        count
    });

    RunningSession {
        label,
        topic,
        session_id,
        done,
        stats,
        consumer,
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        base_url = %config.stream.base_url,
        symbols = ?config.feed.symbols,
        topics = ?config.feed.topics,
        kline_interval = %config.feed.kline_interval,
        account = config.feed.stream_key.is_some(),
        execution_reports = config.stream.execution_reports.as_str(),
        metrics_port = config.server.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(
        ping_interval_ms = u64::try_from(config.stream.session.liveness.ping_interval.as_millis()).unwrap_or(u64::MAX),
        shutdown_grace_ms = u64::try_from(config.stream.session.liveness.shutdown_grace.as_millis()).unwrap_or(u64::MAX),
        channel_capacity = config.stream.session.channel_capacity,
        "Session settings"
    );
}

/// Wait for SIGTERM, SIGINT, or every session ending on its own, then cancel.
async fn await_shutdown(shutdown: &CancellationToken, sessions: &[RunningSession]) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let all_done = async {
        for session in sessions {
            session.done.wait().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = all_done => {
            tracing::warn!("All sessions ended, shutting down");
        }
    }

    shutdown.cancel();
}
