//! Prometheus Metrics Module
//!
//! Exposes stream session metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Frames**: raw frames read off each socket
//! - **Events**: decoded events published, withheld by policy, or dropped
//! - **Failures**: read and decode failures that ended a session
//! - **Liveness**: pings sent, ping failures, shutdown grace expiries
//! - **Sessions**: currently running sessions and dial retries
//!
//! Every series is labelled with the stream topic. Recording before
//! [`init_metrics`] is a no-op.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::streaming::StreamTopic;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Errors raised while installing the exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be built.
    #[error("failed to build Prometheus exporter: {0}")]
    Build(#[from] BuildError),

    /// Another global recorder is already installed.
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install the Prometheus recorder.
///
/// With `Some(port)` the exporter also serves `/metrics` on
/// `0.0.0.0:<port>`; this must run inside a Tokio runtime. Calling again
/// after a successful install returns the existing handle.
///
/// # Errors
///
/// Returns an error if the exporter cannot be built or a different recorder
/// is already installed.
pub fn init_metrics(port: Option<u16>) -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let mut builder = PrometheusBuilder::new();
    if let Some(port) = port {
        builder = builder.with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    let (recorder, exporter) = builder.build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;

    if port.is_some() {
        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::warn!(error = ?e, "Prometheus listener stopped");
            }
        });
    }

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

const FRAMES_RECEIVED: &str = "binance_stream_frames_received_total";
const EVENTS_PUBLISHED: &str = "binance_stream_events_published_total";
const EVENTS_WITHHELD: &str = "binance_stream_events_withheld_total";
const EVENTS_DROPPED: &str = "binance_stream_events_dropped_total";
const DECODE_FAILURES: &str = "binance_stream_decode_failures_total";
const READ_FAILURES: &str = "binance_stream_read_failures_total";
const PINGS_SENT: &str = "binance_stream_pings_sent_total";
const PING_FAILURES: &str = "binance_stream_ping_failures_total";
const GRACE_EXPIRED: &str = "binance_stream_shutdown_grace_expired_total";
const DIAL_RETRIES: &str = "binance_stream_dial_retries_total";
const ACTIVE_SESSIONS: &str = "binance_stream_active_sessions";

fn register_metrics() {
    // Frame and event counters
    describe_counter!(FRAMES_RECEIVED, "Total text frames read from exchange sockets");
    describe_counter!(EVENTS_PUBLISHED, "Total decoded events published to consumers");
    describe_counter!(
        EVENTS_WITHHELD,
        "Total decoded events logged instead of published (execution report policy)"
    );
    describe_counter!(EVENTS_DROPPED, "Total frames with an unrecognised event type");

    // Session-ending failures
    describe_counter!(DECODE_FAILURES, "Total frames that failed to decode");
    describe_counter!(READ_FAILURES, "Total socket read failures");

    // Liveness
    describe_counter!(PINGS_SENT, "Total keepalive pings sent");
    describe_counter!(PING_FAILURES, "Total keepalive pings that failed to send");
    describe_counter!(
        GRACE_EXPIRED,
        "Total shutdowns where the read loop outlived the grace period"
    );

    // Sessions
    describe_counter!(DIAL_RETRIES, "Total dial attempts retried after failure");
    describe_gauge!(ACTIVE_SESSIONS, "Number of running stream sessions");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a frame read from a socket.
pub fn record_frame_received(topic: StreamTopic) {
    counter!(FRAMES_RECEIVED, "topic" => topic.as_str()).increment(1);
}

/// Record an event published to the consumer channel.
pub fn record_event_published(topic: StreamTopic) {
    counter!(EVENTS_PUBLISHED, "topic" => topic.as_str()).increment(1);
}

/// Record an event logged instead of published.
pub fn record_event_withheld(topic: StreamTopic) {
    counter!(EVENTS_WITHHELD, "topic" => topic.as_str()).increment(1);
}

/// Record a frame dropped for carrying an unknown event type.
pub fn record_event_dropped(topic: StreamTopic) {
    counter!(EVENTS_DROPPED, "topic" => topic.as_str()).increment(1);
}

/// Record a decode failure.
pub fn record_decode_failure(topic: StreamTopic, field: Option<&'static str>) {
    counter!(
        DECODE_FAILURES,
        "topic" => topic.as_str(),
        "field" => field.unwrap_or("structure")
    )
    .increment(1);
}

/// Record a read failure.
pub fn record_read_failure(topic: StreamTopic) {
    counter!(READ_FAILURES, "topic" => topic.as_str()).increment(1);
}

/// Record a ping sent.
pub fn record_ping_sent(topic: StreamTopic) {
    counter!(PINGS_SENT, "topic" => topic.as_str()).increment(1);
}

/// Record a ping that could not be sent.
pub fn record_ping_failure(topic: StreamTopic) {
    counter!(PING_FAILURES, "topic" => topic.as_str()).increment(1);
}

/// Record a shutdown that gave up waiting for the read loop.
pub fn record_grace_expired(topic: StreamTopic) {
    counter!(GRACE_EXPIRED, "topic" => topic.as_str()).increment(1);
}

/// Record a retried dial.
pub fn record_dial_retry(topic: StreamTopic) {
    counter!(DIAL_RETRIES, "topic" => topic.as_str()).increment(1);
}

/// Mark a session as started.
pub fn session_started(topic: StreamTopic) {
    gauge!(ACTIVE_SESSIONS, "topic" => topic.as_str()).increment(1.0);
}

/// Mark a session as finished.
pub fn session_finished(topic: StreamTopic) {
    gauge!(ACTIVE_SESSIONS, "topic" => topic.as_str()).decrement(1.0);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        for topic in StreamTopic::ALL {
            record_frame_received(topic);
            record_decode_failure(topic, Some("p"));
            record_decode_failure(topic, None);
            session_started(topic);
            session_finished(topic);
        }
    }

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            FRAMES_RECEIVED,
            EVENTS_PUBLISHED,
            EVENTS_WITHHELD,
            EVENTS_DROPPED,
            DECODE_FAILURES,
            READ_FAILURES,
            PINGS_SENT,
            PING_FAILURES,
            GRACE_EXPIRED,
            DIAL_RETRIES,
            ACTIVE_SESSIONS,
        ] {
            assert!(name.starts_with("binance_stream_"), "{name}");
        }
    }
}
