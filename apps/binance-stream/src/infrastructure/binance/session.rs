//! Stream Session Engine
//!
//! One generic engine shared by every topic. A session owns one connection:
//!
//! ```text
//!            ┌──────────────┐  events  ┌──────────────┐
//!  socket ──►│  read loop   │─────────►│   consumer   │
//!    ▲       └──────┬───────┘  (mpsc)  └──────────────┘
//!    │              │ done
//!    │       ┌──────▼───────┐
//!    └───────│   liveness   │◄── shutdown token
//!     ping   │   monitor    │
//!     close  └──────────────┘
//! ```
//!
//! The read loop is the only reader of the socket. It stops on cancellation,
//! on a read failure, on a decode failure, when the monitor closes the socket
//! after a failed ping, or when the consumer drops its receiver. When it stops, the event channel closes, the done signal fires
//! and the socket is closed. The liveness monitor closes the socket too; the
//! [`SharedSocket`] makes the second close a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use super::codec::FrameDecoder;
use super::heartbeat::{LivenessConfig, LivenessMonitor};
use super::socket::SharedSocket;
use crate::application::ports::{Dialer, FrameReader, FrameWriter, TransportError};
use crate::domain::streaming::{StreamTarget, StreamTopic, TargetError};
use crate::infrastructure::metrics;

// =============================================================================
// Errors
// =============================================================================

/// Errors returned when opening a session.
///
/// Once a session is open, failures are never returned to the caller; the
/// consumer sees the event channel close and the done signal fire.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Stream parameters are invalid; nothing was dialled.
    #[error("invalid stream target: {0}")]
    InvalidTarget(#[from] TargetError),

    /// The connection could not be established.
    #[error("failed to connect to {url}: {source}")]
    Dial {
        /// URL that was dialled.
        url: String,
        /// Transport failure.
        source: TransportError,
    },
}

// =============================================================================
// Configuration
// =============================================================================

/// Per-session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Keepalive and shutdown timing.
    pub liveness: LivenessConfig,
    /// Event channel capacity. A publish waits while the channel is full.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            liveness: LivenessConfig::default(),
            channel_capacity: 1,
        }
    }
}

// =============================================================================
// Done Signal
// =============================================================================

/// One-shot indicator that a session's read loop has permanently stopped.
#[derive(Debug, Clone, Default)]
pub struct DoneSignal {
    token: CancellationToken,
}

impl DoneSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait until the read loop has stopped.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Whether the read loop has stopped.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Guard that fires the signal when dropped.
    pub(crate) fn guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}

// =============================================================================
// Session Statistics
// =============================================================================

#[derive(Debug, Default)]
struct StatsInner {
    frames_read: AtomicU64,
    events_published: AtomicU64,
    events_withheld: AtomicU64,
    events_dropped: AtomicU64,
    last_frame_at: RwLock<Option<DateTime<Utc>>>,
}

/// Counters for one session, updated by its read loop.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    inner: Arc<StatsInner>,
}

impl SessionStats {
    /// Frames read off the socket.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.inner.frames_read.load(Ordering::Relaxed)
    }

    /// Events handed to the consumer channel.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    /// Events decoded but logged instead of published.
    #[must_use]
    pub fn events_withheld(&self) -> u64 {
        self.inner.events_withheld.load(Ordering::Relaxed)
    }

    /// Frames ignored for carrying an unrecognised event type.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.inner.events_dropped.load(Ordering::Relaxed)
    }

    /// When the last frame was read.
    #[must_use]
    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_frame_at.read()
    }

    fn record_frame(&self) {
        self.inner.frames_read.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_frame_at.write() = Some(Utc::now());
    }

    fn record_published(&self) {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
    }

    fn record_withheld(&self) {
        self.inner.events_withheld.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.inner.events_dropped.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Stream Handle
// =============================================================================

/// Consumer side of an open session.
#[derive(Debug)]
pub struct StreamHandle<E> {
    events: mpsc::Receiver<E>,
    done: DoneSignal,
    session_id: Uuid,
    topic: StreamTopic,
    stats: SessionStats,
}

impl<E> StreamHandle<E> {
    /// Receive the next event; `None` once the session has stopped.
    pub async fn recv(&mut self) -> Option<E> {
        self.events.recv().await
    }

    /// The session's done signal.
    #[must_use]
    pub const fn done(&self) -> &DoneSignal {
        &self.done
    }

    /// Session identifier used in log spans.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Topic of this session.
    #[must_use]
    pub const fn topic(&self) -> StreamTopic {
        self.topic
    }

    /// Live counters for this session.
    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Split into the event receiver and the done signal.
    #[must_use]
    pub fn into_parts(self) -> (mpsc::Receiver<E>, DoneSignal) {
        (self.events, self.done)
    }

    /// Convert into a [`tokio_stream::Stream`] of events.
    #[must_use]
    pub fn into_stream(self) -> ReceiverStream<E> {
        ReceiverStream::new(self.events)
    }
}

// =============================================================================
// Open
// =============================================================================

/// Dial `target` under `base_url` and start a session decoding with `decoder`.
///
/// Returns as soon as the connection is up; the read loop and the liveness
/// monitor run as separate tasks until `shutdown` is cancelled or the session
/// fails.
///
/// # Errors
///
/// Returns [`SessionError::InvalidTarget`] before dialling if the target's
/// parameters are invalid, and [`SessionError::Dial`] if the connection fails.
pub async fn open<D, C>(
    dialer: &D,
    base_url: &str,
    target: &StreamTarget,
    decoder: C,
    config: &SessionConfig,
    shutdown: &CancellationToken,
) -> Result<StreamHandle<C::Event>, SessionError>
where
    D: Dialer,
    C: FrameDecoder,
{
    debug_assert_eq!(decoder.topic(), target.topic());
    target.validate()?;

    let url = target.url(base_url);
    let (reader, writer) = dialer
        .dial(&url)
        .await
        .map_err(|source| SessionError::Dial {
            url: url.clone(),
            source,
        })?;

    let handle = start(reader, writer, decoder, config, shutdown.clone());
    tracing::info!(
        topic = %handle.topic,
        session_id = %handle.session_id,
        url = %url,
        "Stream session opened"
    );
    Ok(handle)
}

/// Start the read loop and liveness monitor over an established connection.
pub(crate) fn start<R, W, C>(
    reader: R,
    writer: W,
    decoder: C,
    config: &SessionConfig,
    shutdown: CancellationToken,
) -> StreamHandle<C::Event>
where
    R: FrameReader,
    W: FrameWriter,
    C: FrameDecoder,
{
    let topic = decoder.topic();
    let session_id = Uuid::new_v4();
    let (tx, events) = mpsc::channel(config.channel_capacity.max(1));
    let socket = Arc::new(SharedSocket::new(writer));
    let done = DoneSignal::new();
    let stats = SessionStats::default();

    let span = tracing::info_span!("stream_session", topic = %topic, session_id = %session_id);

    let read_loop = ReadLoop {
        reader,
        socket: socket.clone(),
        decoder,
        tx,
        shutdown: shutdown.clone(),
        stats: stats.clone(),
    };
    metrics::session_started(topic);
    tokio::spawn(read_loop.run(done.guard()).instrument(span.clone()));

    let monitor = LivenessMonitor::new(config.liveness, topic, socket, done.clone(), shutdown);
    tokio::spawn(
        async move {
            monitor.run().await;
        }
        .instrument(span),
    );

    StreamHandle {
        events,
        done,
        session_id,
        topic,
        stats,
    }
}

// =============================================================================
// Read Loop
// =============================================================================

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadExit {
    Cancelled,
    PeerClosed,
    ReadFailed,
    SocketClosed,
    DecodeFailed,
    ReceiverDropped,
}

struct ReadLoop<R, W, C: FrameDecoder> {
    reader: R,
    socket: Arc<SharedSocket<W>>,
    decoder: C,
    tx: mpsc::Sender<C::Event>,
    shutdown: CancellationToken,
    stats: SessionStats,
}

impl<R, W, C> ReadLoop<R, W, C>
where
    R: FrameReader,
    W: FrameWriter,
    C: FrameDecoder,
{
    async fn run(mut self, done: DropGuard) -> ReadExit {
        let topic = self.decoder.topic();
        let exit = self.read_until_stopped().await;

        let Self { tx, socket, .. } = self;
        drop(tx);
        drop(done);
        socket.close().await;
        metrics::session_finished(topic);

        tracing::info!(exit = ?exit, "Stream session stopped");
        exit
    }

    async fn read_until_stopped(&mut self) -> ReadExit {
        let topic = self.decoder.topic();

        loop {
            let read = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return ReadExit::Cancelled,
                () = self.socket.closed() => return Self::socket_closed(),
                read = self.reader.read_frame() => read,
            };

            let frame = match read {
                Ok(frame) => frame,
                Err(TransportError::Closed) => {
                    tracing::info!("Connection closed");
                    return ReadExit::PeerClosed;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read frame");
                    metrics::record_read_failure(topic);
                    return ReadExit::ReadFailed;
                }
            };

            self.stats.record_frame();
            metrics::record_frame_received(topic);

            let event = match self.decoder.decode(&frame) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tracing::debug!(body = %frame, "Ignoring unrecognised event type");
                    self.stats.record_dropped();
                    metrics::record_event_dropped(topic);
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        field = e.field().unwrap_or("-"),
                        body = %e.raw(),
                        "Failed to decode frame"
                    );
                    metrics::record_decode_failure(topic, e.field());
                    return ReadExit::DecodeFailed;
                }
            };

            if !self.decoder.should_publish(&event) {
                tracing::info!(event = ?event, "Event received");
                self.stats.record_withheld();
                metrics::record_event_withheld(topic);
                continue;
            }

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return ReadExit::Cancelled,
                () = self.socket.closed() => return Self::socket_closed(),
                sent = self.tx.send(event) => {
                    if sent.is_err() {
                        tracing::debug!("Event receiver dropped");
                        return ReadExit::ReceiverDropped;
                    }
                }
            }

            self.stats.record_published();
            metrics::record_event_published(topic);
        }
    }

    fn socket_closed() -> ReadExit {
        tracing::info!("Socket closed by liveness monitor");
        ReadExit::SocketClosed
    }
}
