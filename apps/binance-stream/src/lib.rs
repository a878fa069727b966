#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::type_complexity
    )
)]

//! Binance Stream - Exchange Event Stream Sessions
//!
//! Opens one WebSocket session per exchange stream (order book deltas,
//! candlesticks, aggregated trades, trades, account updates), decodes every
//! frame into a typed event with exact decimal arithmetic and publishes it on
//! a bounded channel.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: event types, topics and stream targets
//! - **Application**: transport ports (`Dialer`, `FrameReader`, `FrameWriter`)
//! - **Infrastructure**: adapters and external integrations
//!   - `binance`: decoders, session engine, liveness monitor, factories,
//!     tokio-tungstenite transport, dial retry
//!   - `config`: environment configuration
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: tracing subscriber and OTLP export
//!
//! # Session Lifecycle
//!
//! ```text
//! factory ──dial──► socket ──frames──► read loop ──events──► consumer
//!                     ▲                   │
//!                     │ ping / close      │ done
//!                     └── liveness ◄──────┘◄── shutdown token
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Event types with no I/O.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::{
    AccountEvent, AccountSnapshot, AggTradeEvent, Balance, DepthEvent, EventHeader,
    ExecutionReport, ExecutionType, Interval, Kline, KlineEvent, OrderSide, OrderStatus,
    OrderType, PriceLevel, StreamEvent, StreamTarget, StreamTopic, TargetError, TimeInForce,
    TradeEvent,
};

// Ports
pub use application::ports::{Dialer, FrameReader, FrameWriter, TransportError};

// Session engine
pub use infrastructure::binance::{
    BinanceStreams, DecodeError, DoneSignal, ExecutionReportPolicy, FrameDecoder,
    LivenessConfig, RetryConfig, RetryError, SessionConfig, SessionError, SessionStats,
    StreamHandle, StreamSettings, TungsteniteDialer, open_with_retry,
};

// Configuration
pub use infrastructure::config::{AppConfig, ConfigError, FeedSettings, ServerSettings, StreamKey};

// Metrics
pub use infrastructure::metrics::{MetricsError, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
