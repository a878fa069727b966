//! Liveness Monitor
//!
//! Runs next to each session's read loop. Sends a keepalive ping on a fixed
//! interval and coordinates shutdown: when the process-wide token is
//! cancelled it waits (bounded by a grace period) for the read loop to
//! finish, then closes the socket.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::session::DoneSignal;
use super::socket::SharedSocket;
use crate::application::ports::FrameWriter;
use crate::domain::streaming::StreamTopic;
use crate::infrastructure::metrics;

/// Shortest ping interval the monitor will run with.
pub const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for liveness behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
    /// How long shutdown waits for the read loop before closing anyway.
    pub shutdown_grace: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl LivenessConfig {
    /// Create a new configuration with custom values.
    ///
    /// A zero ping interval is raised to [`MIN_PING_INTERVAL`].
    #[must_use]
    pub const fn new(ping_interval: Duration, shutdown_grace: Duration) -> Self {
        let ping_interval = if ping_interval.is_zero() {
            MIN_PING_INTERVAL
        } else {
            ping_interval
        };
        Self {
            ping_interval,
            shutdown_grace,
        }
    }
}

/// Why the monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessExit {
    /// The read loop finished on its own.
    SessionDone,
    /// Shutdown was requested and the read loop finished within the grace period.
    Shutdown,
    /// Shutdown was requested and the grace period ran out.
    GraceExpired,
    /// A ping could not be sent.
    PingFailed,
}

/// Keepalive and shutdown coordinator for one session.
pub struct LivenessMonitor<W> {
    config: LivenessConfig,
    topic: StreamTopic,
    socket: Arc<SharedSocket<W>>,
    done: DoneSignal,
    shutdown: CancellationToken,
}

impl<W: FrameWriter> LivenessMonitor<W> {
    /// Create a monitor for one session.
    #[must_use]
    pub const fn new(
        config: LivenessConfig,
        topic: StreamTopic,
        socket: Arc<SharedSocket<W>>,
        done: DoneSignal,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            topic,
            socket,
            done,
            shutdown,
        }
    }

    /// Run until the session ends, shutdown completes, or a ping fails.
    ///
    /// The socket is always closed on return.
    pub async fn run(self) -> LivenessExit {
        let period = self.config.ping_interval.max(MIN_PING_INTERVAL);
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let exit = loop {
            tokio::select! {
                biased;

                () = self.done.wait() => {
                    tracing::debug!(topic = %self.topic, "Session finished, liveness monitor stopping");
                    break LivenessExit::SessionDone;
                }
                () = self.shutdown.cancelled() => {
                    break self.await_session().await;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.socket.ping().await {
                        tracing::warn!(topic = %self.topic, error = %e, "Keepalive ping failed");
                        metrics::record_ping_failure(self.topic);
                        break LivenessExit::PingFailed;
                    }
                    metrics::record_ping_sent(self.topic);
                }
            }
        };

        self.socket.close().await;
        exit
    }

    async fn await_session(&self) -> LivenessExit {
        if tokio::time::timeout(self.config.shutdown_grace, self.done.wait())
            .await
            .is_ok()
        {
            return LivenessExit::Shutdown;
        }

        tracing::warn!(
            topic = %self.topic,
            grace_ms = u64::try_from(self.config.shutdown_grace.as_millis()).unwrap_or(u64::MAX),
            "Read loop did not finish within shutdown grace period"
        );
        metrics::record_grace_expired(self.topic);
        LivenessExit::GraceExpired
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::application::ports::TransportError;

    #[derive(Default, Clone)]
    struct Recorder {
        pings: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        fail_pings: Arc<AtomicBool>,
    }

    struct RecordingWriter(Recorder);

    #[async_trait]
    impl FrameWriter for RecordingWriter {
        async fn send_ping(&mut self) -> Result<(), TransportError> {
            if self.0.fail_pings.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            self.0.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn monitor(
        recorder: &Recorder,
    ) -> (
        LivenessMonitor<RecordingWriter>,
        tokio_util::sync::DropGuard,
        DoneSignal,
        CancellationToken,
    ) {
        monitor_with(recorder, LivenessConfig::default())
    }

    fn monitor_with(
        recorder: &Recorder,
        config: LivenessConfig,
    ) -> (
        LivenessMonitor<RecordingWriter>,
        tokio_util::sync::DropGuard,
        DoneSignal,
        CancellationToken,
    ) {
        let socket = Arc::new(SharedSocket::new(RecordingWriter(recorder.clone())));
        let done = DoneSignal::new();
        let guard = done.guard();
        let shutdown = CancellationToken::new();
        let monitor = LivenessMonitor::new(
            config,
            StreamTopic::Trade,
            socket,
            done.clone(),
            shutdown.clone(),
        );
        (monitor, guard, done, shutdown)
    }

    #[test]
    fn default_config_values() {
        let config = LivenessConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(1));
        assert_eq!(config.shutdown_grace, Duration::from_secs(1));
    }

    #[test]
    fn zero_ping_interval_is_raised() {
        let config = LivenessConfig::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(config.ping_interval, MIN_PING_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ping_interval_still_pings() {
        let recorder = Recorder::default();
        let config = LivenessConfig {
            ping_interval: Duration::ZERO,
            shutdown_grace: Duration::from_secs(1),
        };
        let (monitor, guard, _done, _shutdown) = monitor_with(&recorder, config);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(recorder.pings.load(Ordering::SeqCst) > 0);

        drop(guard);
        assert_eq!(handle.await.unwrap(), LivenessExit::SessionDone);
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pings_every_interval() {
        let recorder = Recorder::default();
        let (monitor, guard, _done, _shutdown) = monitor(&recorder);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(recorder.pings.load(Ordering::SeqCst), 3);

        drop(guard);
        assert_eq!(handle.await.unwrap(), LivenessExit::SessionDone);
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_session() {
        let recorder = Recorder::default();
        let (monitor, guard, _done, shutdown) = monitor(&recorder);
        let handle = tokio::spawn(monitor.run());

        shutdown.cancel();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 0, "closed before grace ended");

        drop(guard);
        assert_eq!(handle.await.unwrap(), LivenessExit::Shutdown);
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_grace_is_bounded() {
        let recorder = Recorder::default();
        let (monitor, _guard, done, shutdown) = monitor(&recorder);
        let started = tokio::time::Instant::now();
        let handle = tokio::spawn(monitor.run());

        shutdown.cancel();
        let exit = handle.await.unwrap();

        assert_eq!(exit, LivenessExit::GraceExpired);
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_millis(1100));
        assert!(!done.is_done());
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ping_failure_closes_socket() {
        let recorder = Recorder::default();
        recorder.fail_pings.store(true, Ordering::SeqCst);
        let (monitor, _guard, _done, _shutdown) = monitor(&recorder);

        assert_eq!(monitor.run().await, LivenessExit::PingFailed);
        assert_eq!(recorder.pings.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.closes.load(Ordering::SeqCst), 1);
    }
}
