//! WebSocket Transport
//!
//! [`Dialer`] implementation over tokio-tungstenite with rustls. The
//! connection is split so the session's read loop owns the read half while
//! the write half is shared for pings and close.
//!
//! Incoming pings are answered by tungstenite itself; pongs and raw frames
//! never reach the session.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{Dialer, FrameReader, FrameWriter, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default time allowed for the TCP, TLS and WebSocket handshakes.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens WebSocket connections.
#[derive(Debug, Clone, Copy)]
pub struct TungsteniteDialer {
    connect_timeout: Duration,
}

impl Default for TungsteniteDialer {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl TungsteniteDialer {
    /// Create a dialer with a handshake timeout.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Dialer for TungsteniteDialer {
    type Reader = TungsteniteReader;
    type Writer = TungsteniteWriter;

    async fn dial(&self, url: &str) -> Result<(TungsteniteReader, TungsteniteWriter), TransportError> {
        let connect = tokio_tungstenite::connect_async(url);
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::Connect(format!("timed out after {:?}", self.connect_timeout)))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (sink, stream) = ws_stream.split();
        Ok((TungsteniteReader { stream }, TungsteniteWriter { sink }))
    }
}

/// Read half of a WebSocket connection.
pub struct TungsteniteReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for TungsteniteReader {
    async fn read_frame(&mut self) -> Result<String, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec())
                        .map_err(|_| TransportError::InvalidUtf8 { len: data.len() });
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(frame = ?frame, "Received close frame");
                    return Err(TransportError::Closed);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => return Err(map_error(e)),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

/// Write half of a WebSocket connection.
pub struct TungsteniteWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameWriter for TungsteniteWriter {
    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.sink
            .send(Message::Ping(Vec::new().into()))
            .await
            .map_err(map_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.sink.close().await.map_err(map_error) {
            Err(TransportError::Closed) | Ok(()) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn map_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::WebSocket(other),
    }
}
