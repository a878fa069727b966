//! Port Interfaces
//!
//! Contracts for the message socket the stream sessions run on. The
//! infrastructure layer provides the tokio-tungstenite adapter; tests plug in
//! scripted in-memory implementations.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Dialer`: opens a connection and hands back its two halves
//! - `FrameReader`: the read half, owned by exactly one session read loop
//! - `FrameWriter`: the write half, used for control pings and closing

use async_trait::async_trait;

/// Errors raised by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// WebSocket protocol or I/O error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Peer closed the connection, or it was closed locally.
    #[error("connection closed")]
    Closed,

    /// A binary frame did not carry UTF-8 text.
    #[error("binary frame is not valid UTF-8 ({len} bytes)")]
    InvalidUtf8 {
        /// Frame length.
        len: usize,
    },
}

/// Opens message socket connections.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Read half produced by [`Dialer::dial`].
    type Reader: FrameReader;
    /// Write half produced by [`Dialer::dial`].
    type Writer: FrameWriter;

    /// Connect to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or handshake fails.
    async fn dial(&self, url: &str) -> Result<(Self::Reader, Self::Writer), TransportError>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameReader: Send + 'static {
    /// Wait for the next data frame.
    ///
    /// Control frames are handled by the transport and never returned.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the connection is gone, or
    /// the underlying error if reading fails.
    async fn read_frame(&mut self) -> Result<String, TransportError>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameWriter: Send + 'static {
    /// Send a keepalive ping control frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written.
    async fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Start the close handshake and release the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame cannot be written.
    async fn close(&mut self) -> Result<(), TransportError>;
}
