//! Binance WebSocket Adapters
//!
//! The streaming session engine and everything it is built from:
//!
//! - **messages / codec**: wire records and per-topic frame decoders
//! - **session**: the generic read loop, done signal and stream handle
//! - **heartbeat**: the liveness monitor running beside each session
//! - **socket**: the write half shared by both, with idempotent close
//! - **streams**: one session factory per topic
//! - **transport**: tokio-tungstenite implementation of the dialer port
//! - **retry**: caller-side backoff for failed opens

pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod retry;
pub mod session;
pub mod socket;
pub mod streams;
pub mod transport;

#[cfg(test)]
mod testing;

pub use codec::{
    AccountDecoder, AggTradeDecoder, DecodeError, DepthDecoder, ExecutionReportPolicy,
    FrameDecoder, KlineDecoder, TradeDecoder,
};
pub use heartbeat::{LivenessConfig, LivenessExit, LivenessMonitor, MIN_PING_INTERVAL};
pub use retry::{RetryConfig, RetryError, RetryPolicy, open_with_retry};
pub use session::{
    DoneSignal, SessionConfig, SessionError, SessionStats, StreamHandle, open as open_session,
};
pub use socket::SharedSocket;
pub use streams::{BinanceStreams, DEFAULT_BASE_URL, StreamSettings};
pub use transport::{TungsteniteDialer, TungsteniteReader, TungsteniteWriter};
