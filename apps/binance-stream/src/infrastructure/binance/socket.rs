//! Shared Socket
//!
//! The write half of a session's connection, shared between the read loop
//! and the liveness monitor. Either side may close it; only the first close
//! reaches the transport. Closing also wakes anyone waiting in
//! [`SharedSocket::closed`], which is how the read loop learns that the
//! monitor gave up on the connection.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{FrameWriter, TransportError};

/// Write half of a connection with idempotent close.
#[derive(Debug)]
pub struct SharedSocket<W> {
    writer: Mutex<W>,
    closed: AtomicBool,
    closed_signal: CancellationToken,
}

impl<W: FrameWriter> SharedSocket<W> {
    /// Wrap a write half.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
            closed_signal: CancellationToken::new(),
        }
    }

    /// Send a keepalive ping.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the socket has been closed, or
    /// the transport error if the ping cannot be written.
    pub async fn ping(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.writer.lock().await.send_ping().await
    }

    /// Close the socket.
    ///
    /// Returns `true` for the call that actually closed it and `false` for
    /// every later call. Transport errors during close are logged, not
    /// returned: the connection is unusable either way.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.closed_signal.cancel();
        if let Err(e) = self.writer.lock().await.close().await {
            tracing::debug!(error = %e, "Error while closing socket");
        }
        true
    }

    /// Wait until [`SharedSocket::close`] has been called.
    pub async fn closed(&self) {
        self.closed_signal.cancelled().await;
    }

    /// Whether [`SharedSocket::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
