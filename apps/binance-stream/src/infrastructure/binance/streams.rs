//! Session Factory
//!
//! One constructor per topic. Each builds the [`StreamTarget`], picks the
//! topic's decoder and hands both to the generic [`session::open`].

use tokio_util::sync::CancellationToken;

use super::codec::{
    AccountDecoder, AggTradeDecoder, DepthDecoder, ExecutionReportPolicy, KlineDecoder,
    TradeDecoder,
};
use super::session::{self, SessionConfig, SessionError, StreamHandle};
use crate::application::ports::Dialer;
use crate::domain::streaming::{
    AccountEvent, AggTradeEvent, DepthEvent, Interval, KlineEvent, StreamTarget, TradeEvent,
};

/// Default public stream endpoint.
pub const DEFAULT_BASE_URL: &str = "wss://stream.binance.com:9443/ws";

/// Settings shared by every session a factory opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// WebSocket base URL; the stream path is appended.
    pub base_url: String,
    /// Session timing and channel capacity.
    pub session: SessionConfig,
    /// Handling of order execution reports on the account stream.
    pub execution_reports: ExecutionReportPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session: SessionConfig::default(),
            execution_reports: ExecutionReportPolicy::default(),
        }
    }
}

/// Opens stream sessions over a [`Dialer`].
pub struct BinanceStreams<D> {
    dialer: D,
    settings: StreamSettings,
}

impl<D: Dialer> BinanceStreams<D> {
    /// Create a factory.
    #[must_use]
    pub const fn new(dialer: D, settings: StreamSettings) -> Self {
        Self { dialer, settings }
    }

    /// Factory settings.
    #[must_use]
    pub const fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Order book deltas for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is invalid or the connection fails.
    pub async fn depth(
        &self,
        symbol: &str,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<DepthEvent>, SessionError> {
        let target = StreamTarget::Depth {
            symbol: symbol.to_string(),
        };
        self.open(&target, DepthDecoder, shutdown).await
    }

    /// Candlesticks for `symbol` at `interval`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is invalid or the connection fails.
    pub async fn kline(
        &self,
        symbol: &str,
        interval: Interval,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<KlineEvent>, SessionError> {
        let target = StreamTarget::Kline {
            symbol: symbol.to_string(),
            interval,
        };
        self.open(&target, KlineDecoder, shutdown).await
    }

    /// Aggregated trades for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is invalid or the connection fails.
    pub async fn agg_trades(
        &self,
        symbol: &str,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<AggTradeEvent>, SessionError> {
        let target = StreamTarget::AggTrade {
            symbol: symbol.to_string(),
        };
        self.open(&target, AggTradeDecoder, shutdown).await
    }

    /// Raw trades for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is invalid or the connection fails.
    pub async fn trades(
        &self,
        symbol: &str,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<TradeEvent>, SessionError> {
        let target = StreamTarget::Trade {
            symbol: symbol.to_string(),
        };
        self.open(&target, TradeDecoder, shutdown).await
    }

    /// Account updates for the stream identified by `stream_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the connection fails.
    pub async fn user_data(
        &self,
        stream_key: &str,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<AccountEvent>, SessionError> {
        let target = StreamTarget::Account {
            stream_key: stream_key.to_string(),
        };
        let decoder = AccountDecoder::new(self.settings.execution_reports);
        self.open(&target, decoder, shutdown).await
    }

    async fn open<C: super::codec::FrameDecoder>(
        &self,
        target: &StreamTarget,
        decoder: C,
        shutdown: &CancellationToken,
    ) -> Result<StreamHandle<C::Event>, SessionError> {
        session::open(
            &self.dialer,
            &self.settings.base_url,
            target,
            decoder,
            &self.settings.session,
            shutdown,
        )
        .await
    }
}
