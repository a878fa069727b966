//! Market and Account Event Types
//!
//! Canonical, codec-agnostic representation of every event the stream
//! sessions publish. Prices and quantities are exact decimals; times are UTC.

mod topic;

pub use topic::{Interval, StreamTarget, StreamTopic, TargetError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Envelope fields shared by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Exchange event-type tag (`depthUpdate`, `kline`, ...).
    pub event_type: String,
    /// Server event time.
    pub event_time: DateTime<Utc>,
    /// Trading pair; absent on account streams.
    pub symbol: Option<String>,
}

/// One price level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: Decimal,
    /// New quantity at the level (zero removes it).
    pub quantity: Decimal,
}

/// Order book delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthEvent {
    /// Envelope.
    pub header: EventHeader,
    /// Final update id in this event.
    pub update_id: u64,
    /// Bid deltas in wire order.
    pub bids: Vec<PriceLevel>,
    /// Ask deltas in wire order.
    pub asks: Vec<PriceLevel>,
}

/// OHLCV bar contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kline {
    /// Bar open time.
    pub open_time: DateTime<Utc>,
    /// Bar close time.
    pub close_time: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close (or last) price.
    pub close: Decimal,
    /// Base asset volume.
    pub volume: Decimal,
    /// Number of trades in the bar.
    pub trade_count: u64,
    /// Quote asset volume.
    pub quote_asset_volume: Decimal,
    /// Taker buy base asset volume.
    pub taker_buy_base_asset_volume: Decimal,
    /// Taker buy quote asset volume.
    pub taker_buy_quote_asset_volume: Decimal,
}

/// Candlestick update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KlineEvent {
    /// Envelope.
    pub header: EventHeader,
    /// Bar interval.
    pub interval: Interval,
    /// First trade id in the bar.
    pub first_trade_id: i64,
    /// Last trade id in the bar.
    pub last_trade_id: i64,
    /// `true` once the bar is closed, `false` while it is still forming.
    pub is_final: bool,
    /// Bar values.
    pub kline: Kline,
}

/// Aggregated trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggTradeEvent {
    /// Envelope.
    pub header: EventHeader,
    /// Aggregate trade id.
    pub agg_trade_id: u64,
    /// Price.
    pub price: Decimal,
    /// Quantity.
    pub quantity: Decimal,
    /// First constituent trade id.
    pub first_trade_id: u64,
    /// Last constituent trade id.
    pub last_trade_id: u64,
    /// Trade time.
    pub trade_time: DateTime<Utc>,
    /// Whether the buyer was the maker.
    pub buyer_is_maker: bool,
}

/// Raw trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Envelope.
    pub header: EventHeader,
    /// Trade id.
    pub trade_id: u64,
    /// Price.
    pub price: Decimal,
    /// Quantity.
    pub quantity: Decimal,
    /// Buyer order id.
    pub buyer_order_id: u64,
    /// Seller order id.
    pub seller_order_id: u64,
    /// Trade time.
    pub trade_time: DateTime<Utc>,
    /// Whether the buyer was the maker.
    pub buyer_is_maker: bool,
}

/// Free and locked amounts of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Asset code.
    pub asset: String,
    /// Available amount.
    pub free: Decimal,
    /// Amount locked in open orders.
    pub locked: Decimal,
}

/// Account balances and permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Envelope.
    pub header: EventHeader,
    /// Maker commission rate.
    pub maker_commission: Decimal,
    /// Taker commission rate.
    pub taker_commission: Decimal,
    /// Buyer commission rate.
    pub buyer_commission: Decimal,
    /// Seller commission rate.
    pub seller_commission: Decimal,
    /// Trading permitted.
    pub can_trade: bool,
    /// Withdrawals permitted.
    pub can_withdraw: bool,
    /// Deposits permitted.
    pub can_deposit: bool,
    /// Time of the last account update.
    pub updated_at: DateTime<Utc>,
    /// Per-asset balances.
    pub balances: Vec<Balance>,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
    /// Any side this crate does not know.
    #[serde(other)]
    Unknown,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Limit order.
    Limit,
    /// Market order.
    Market,
    /// Stop loss.
    StopLoss,
    /// Stop loss limit.
    StopLossLimit,
    /// Take profit.
    TakeProfit,
    /// Take profit limit.
    TakeProfitLimit,
    /// Post-only limit order.
    LimitMaker,
    /// Any order type this crate does not know.
    #[serde(other)]
    Unknown,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Good till cancelled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
    /// Any time in force this crate does not know.
    #[serde(other)]
    Unknown,
}

/// What happened to the order in this report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    /// Order accepted.
    New,
    /// Order cancelled by the user.
    Canceled,
    /// Order replaced (unused on spot).
    Replaced,
    /// Order rejected.
    Rejected,
    /// Part or all of the order filled.
    Trade,
    /// Order expired.
    Expired,
    /// Order expired by self-trade prevention.
    TradePrevention,
    /// Any execution type this crate does not know.
    #[serde(other)]
    Unknown,
}

/// Order status after this report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, nothing filled.
    New,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Canceled,
    /// Cancel in flight.
    PendingCancel,
    /// Rejected.
    Rejected,
    /// Expired.
    Expired,
    /// Expired by self-trade prevention in the matching engine.
    ExpiredInMatch,
    /// Accepted but not yet in the book.
    PendingNew,
    /// Any status this crate does not know.
    #[serde(other)]
    Unknown,
}

/// Order execution report from the account stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Envelope (symbol present).
    pub header: EventHeader,
    /// Client order id.
    pub client_order_id: String,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price.
    pub price: Decimal,
    /// Stop price.
    pub stop_price: Decimal,
    /// Iceberg quantity.
    pub iceberg_quantity: Decimal,
    /// Client id of the order being cancelled, if any.
    pub original_client_order_id: Option<String>,
    /// Execution type.
    pub execution_type: ExecutionType,
    /// Current order status.
    pub status: OrderStatus,
    /// Reject reason (`NONE` when not rejected).
    pub reject_reason: String,
    /// Exchange order id.
    pub order_id: i64,
    /// Quantity filled by the last execution.
    pub last_executed_quantity: Decimal,
    /// Total filled quantity.
    pub cumulative_filled_quantity: Decimal,
    /// Price of the last execution.
    pub last_executed_price: Decimal,
    /// Commission charged for the last execution.
    pub commission_amount: Decimal,
    /// Commission asset, if any commission was charged.
    pub commission_asset: Option<String>,
    /// Transaction time.
    pub transaction_time: DateTime<Utc>,
    /// Trade id (`-1` when the report is not a trade).
    pub trade_id: i64,
    /// Whether the order is on the book.
    pub is_working: bool,
    /// Whether the last execution was a maker fill.
    pub is_maker: bool,
    /// Order creation time.
    pub order_created_at: DateTime<Utc>,
    /// Cumulative quote asset transacted.
    pub cumulative_quote_quantity: Decimal,
}

/// Events carried by the account stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    /// Balances and permissions snapshot.
    Balances(AccountSnapshot),
    /// Order execution report.
    ExecutionReport(Box<ExecutionReport>),
}

impl AccountEvent {
    /// Envelope of the wrapped event.
    #[must_use]
    pub fn header(&self) -> &EventHeader {
        match self {
            Self::Balances(snapshot) => &snapshot.header,
            Self::ExecutionReport(report) => &report.header,
        }
    }
}

/// Any event from any stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Order book delta.
    Depth(DepthEvent),
    /// Candlestick update.
    Kline(KlineEvent),
    /// Aggregated trade.
    AggTrade(AggTradeEvent),
    /// Raw trade.
    Trade(TradeEvent),
    /// Account update.
    Account(AccountEvent),
}

impl StreamEvent {
    /// Topic the event was published on.
    #[must_use]
    pub const fn topic(&self) -> StreamTopic {
        match self {
            Self::Depth(_) => StreamTopic::OrderBookDelta,
            Self::Kline(_) => StreamTopic::Kline,
            Self::AggTrade(_) => StreamTopic::AggTrade,
            Self::Trade(_) => StreamTopic::Trade,
            Self::Account(_) => StreamTopic::AccountUpdate,
        }
    }

    /// Envelope of the wrapped event.
    #[must_use]
    pub fn header(&self) -> &EventHeader {
        match self {
            Self::Depth(e) => &e.header,
            Self::Kline(e) => &e.header,
            Self::AggTrade(e) => &e.header,
            Self::Trade(e) => &e.header,
            Self::Account(e) => e.header(),
        }
    }
}

impl From<DepthEvent> for StreamEvent {
    fn from(event: DepthEvent) -> Self {
        Self::Depth(event)
    }
}

impl From<KlineEvent> for StreamEvent {
    fn from(event: KlineEvent) -> Self {
        Self::Kline(event)
    }
}

impl From<AggTradeEvent> for StreamEvent {
    fn from(event: AggTradeEvent) -> Self {
        Self::AggTrade(event)
    }
}

impl From<TradeEvent> for StreamEvent {
    fn from(event: TradeEvent) -> Self {
        Self::Trade(event)
    }
}

impl From<AccountEvent> for StreamEvent {
    fn from(event: AccountEvent) -> Self {
        Self::Account(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(event_type: &str, symbol: Option<&str>) -> EventHeader {
        EventHeader {
            event_type: event_type.to_string(),
            event_time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            symbol: symbol.map(str::to_string),
        }
    }

    #[test]
    fn stream_event_topic_and_header() {
        let event: StreamEvent = TradeEvent {
            header: header("trade", Some("BTCUSDT")),
            trade_id: 1,
            price: Decimal::new(1005, 1),
            quantity: Decimal::new(1, 3),
            buyer_order_id: 10,
            seller_order_id: 11,
            trade_time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            buyer_is_maker: true,
        }
        .into();

        assert_eq!(event.topic(), StreamTopic::Trade);
        assert_eq!(event.header().symbol.as_deref(), Some("BTCUSDT"));
    }

    #[test]
    fn account_event_header_has_no_symbol() {
        let event = AccountEvent::Balances(AccountSnapshot {
            header: header("outboundAccountInfo", None),
            maker_commission: Decimal::from(15),
            taker_commission: Decimal::from(15),
            buyer_commission: Decimal::ZERO,
            seller_commission: Decimal::ZERO,
            can_trade: true,
            can_withdraw: true,
            can_deposit: true,
            updated_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            balances: vec![],
        });

        assert!(event.header().symbol.is_none());
        assert_eq!(StreamEvent::from(event).topic(), StreamTopic::AccountUpdate);
    }
}
