//! Binance WebSocket Message Types
//!
//! Wire format types for the raw stream payloads. Each record mirrors the
//! exchange's single-letter field tags one-to-one. Prices, quantities and
//! other decimal values stay as the strings the exchange sends; they are
//! converted to [`rust_decimal::Decimal`] by the codec, never read as binary
//! floats.
//!
//! # References
//!
//! - [WebSocket Streams](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams)
//! - [User Data Streams](https://developers.binance.com/docs/binance-spot-api-docs/user-data-stream)

use serde::Deserialize;
use serde_json::{Number, Value};

/// Account stream tag for a balance snapshot.
pub const ACCOUNT_INFO_EVENT: &str = "outboundAccountInfo";

/// Account stream tag for an order execution report.
pub const EXECUTION_REPORT_EVENT: &str = "executionReport";

/// A decimal value the exchange sends either as a JSON string or a JSON number.
///
/// Both forms are kept as text so conversion never goes through `f64`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireDecimal {
    /// `"0.00100000"`
    Text(String),
    /// `0.001`
    Number(Number),
}

impl WireDecimal {
    /// Textual form of the value.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Just the event-type tag, used to pick a shape on multi-shape streams.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeMessage {
    /// Event type.
    #[serde(rename = "e")]
    pub event_type: String,
}

/// Order book delta.
///
/// # Wire Format
/// ```json
/// {
///   "e": "depthUpdate",
///   "E": 1672515782136,
///   "s": "BNBBTC",
///   "U": 157,
///   "u": 160,
///   "b": [["0.0024", "10"]],
///   "a": [["0.0026", "100"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DepthMessage {
    /// Event type (always "depthUpdate")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Final update id in event
    #[serde(rename = "u")]
    pub update_id: u64,

    /// Bid deltas: `[price, quantity, ...]`, extra trailing elements ignored
    #[serde(rename = "b", default)]
    pub bids: Vec<Vec<Value>>,

    /// Ask deltas
    #[serde(rename = "a", default)]
    pub asks: Vec<Vec<Value>>,
}

/// Candlestick update.
///
/// The envelope symbol is read from `S`, falling back to `s` and finally to
/// the bar's own `k.s`.
///
/// # Wire Format
/// ```json
/// {
///   "e": "kline",
///   "E": 1672515782136,
///   "s": "BNBBTC",
///   "k": {
///     "t": 1672515780000, "T": 1672515839999, "s": "BNBBTC", "i": "1m",
///     "f": 100, "L": 200, "o": "0.0010", "c": "0.0020", "h": "0.0025",
///     "l": "0.0015", "v": "1000", "n": 100, "x": false, "q": "1.0000",
///     "V": "500", "Q": "0.500", "B": "123456"
///   }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct KlineMessage {
    /// Event type (always "kline")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Symbol under the capital tag
    #[serde(rename = "S", default)]
    pub symbol_upper: Option<String>,

    /// Symbol under the lowercase tag
    #[serde(rename = "s", default)]
    pub symbol_lower: Option<String>,

    /// Bar payload
    #[serde(rename = "k")]
    pub kline: KlinePayload,
}

impl KlineMessage {
    /// Envelope symbol, preferring `S` over `s`.
    #[must_use]
    pub fn symbol(&self) -> Option<String> {
        self.symbol_upper.clone().or_else(|| self.symbol_lower.clone())
    }
}

/// Bar payload nested under `k`.
#[derive(Debug, Clone, Deserialize)]
pub struct KlinePayload {
    /// Open time (epoch millis)
    #[serde(rename = "t")]
    pub open_time: Number,

    /// Close time (epoch millis)
    #[serde(rename = "T")]
    pub close_time: Number,

    /// Symbol
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,

    /// Interval tag
    #[serde(rename = "i")]
    pub interval: String,

    /// First trade id
    #[serde(rename = "f")]
    pub first_trade_id: i64,

    /// Last trade id
    #[serde(rename = "L")]
    pub last_trade_id: i64,

    /// Open price
    #[serde(rename = "o")]
    pub open: String,

    /// Close price
    #[serde(rename = "c")]
    pub close: String,

    /// High price
    #[serde(rename = "h")]
    pub high: String,

    /// Low price
    #[serde(rename = "l")]
    pub low: String,

    /// Base asset volume
    #[serde(rename = "v")]
    pub volume: String,

    /// Number of trades
    #[serde(rename = "n")]
    pub trade_count: u64,

    /// Is this bar closed?
    #[serde(rename = "x")]
    pub is_final: bool,

    /// Quote asset volume
    #[serde(rename = "q")]
    pub quote_asset_volume: String,

    /// Taker buy base asset volume
    #[serde(rename = "V")]
    pub taker_buy_base_asset_volume: String,

    /// Taker buy quote asset volume
    #[serde(rename = "Q")]
    pub taker_buy_quote_asset_volume: String,
}

/// Aggregated trade.
///
/// # Wire Format
/// ```json
/// {
///   "e": "aggTrade", "E": 1672515782136, "s": "BNBBTC", "a": 12345,
///   "p": "0.001", "q": "100", "f": 100, "l": 105, "T": 1672515782136,
///   "m": true, "M": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AggTradeMessage {
    /// Event type (always "aggTrade")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Aggregate trade id
    #[serde(rename = "a")]
    pub agg_trade_id: u64,

    /// Price
    #[serde(rename = "p")]
    pub price: String,

    /// Quantity
    #[serde(rename = "q")]
    pub quantity: String,

    /// First trade id
    #[serde(rename = "f")]
    pub first_trade_id: u64,

    /// Last trade id
    #[serde(rename = "l")]
    pub last_trade_id: u64,

    /// Trade time (epoch millis)
    #[serde(rename = "T")]
    pub trade_time: Number,

    /// Is the buyer the market maker?
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

/// Raw trade.
///
/// Price and quantity arrive as numbers or as numeric strings depending on
/// the endpoint; both are accepted.
///
/// # Wire Format
/// ```json
/// {
///   "e": "trade", "E": 1672515782136, "s": "BNBBTC", "t": 12345,
///   "p": "0.001", "q": "100", "b": 88, "a": 50, "T": 1672515782136,
///   "m": true, "M": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TradeMessage {
    /// Event type (always "trade")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Trade id
    #[serde(rename = "t")]
    pub trade_id: u64,

    /// Price
    #[serde(rename = "p")]
    pub price: WireDecimal,

    /// Quantity
    #[serde(rename = "q")]
    pub quantity: WireDecimal,

    /// Buyer order id
    #[serde(rename = "b")]
    pub buyer_order_id: u64,

    /// Seller order id
    #[serde(rename = "a")]
    pub seller_order_id: u64,

    /// Trade time (epoch millis)
    #[serde(rename = "T")]
    pub trade_time: Number,

    /// Is the buyer the market maker?
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

/// Account balance snapshot.
///
/// # Wire Format
/// ```json
/// {
///   "e": "outboundAccountInfo", "E": 1499405658849,
///   "m": 0, "t": 0, "b": 0, "s": 0,
///   "T": true, "W": true, "D": true, "u": 1499405658848,
///   "B": [{"a": "LTC", "f": "17366.18538083", "l": "0.00000000"}]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoMessage {
    /// Event type (always "outboundAccountInfo")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Maker commission rate
    #[serde(rename = "m")]
    pub maker_commission: WireDecimal,

    /// Taker commission rate
    #[serde(rename = "t")]
    pub taker_commission: WireDecimal,

    /// Buyer commission rate
    #[serde(rename = "b")]
    pub buyer_commission: WireDecimal,

    /// Seller commission rate
    #[serde(rename = "s")]
    pub seller_commission: WireDecimal,

    /// Can trade?
    #[serde(rename = "T")]
    pub can_trade: bool,

    /// Can withdraw?
    #[serde(rename = "W")]
    pub can_withdraw: bool,

    /// Can deposit?
    #[serde(rename = "D")]
    pub can_deposit: bool,

    /// Time of last account update (epoch millis)
    #[serde(rename = "u")]
    pub updated_at: Number,

    /// Balances
    #[serde(rename = "B", default)]
    pub balances: Vec<BalanceMessage>,
}

/// One balance entry of an account snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceMessage {
    /// Asset
    #[serde(rename = "a")]
    pub asset: String,

    /// Free amount
    #[serde(rename = "f")]
    pub free: String,

    /// Locked amount
    #[serde(rename = "l")]
    pub locked: String,
}

/// Order execution report.
///
/// Fields `g` (order list id), `I` (ignore) and `M` (ignore) are skipped.
///
/// # Wire Format
/// ```json
/// {
///   "e": "executionReport", "E": 1499405658658, "s": "ETHBTC",
///   "c": "mUvoqJxFIILMdfAW5iGSOW", "S": "BUY", "o": "LIMIT", "f": "GTC",
///   "q": "1.00000000", "p": "0.10264410", "P": "0.00000000",
///   "F": "0.00000000", "g": -1, "C": "", "x": "NEW", "X": "NEW",
///   "r": "NONE", "i": 4293153, "l": "0.00000000", "z": "0.00000000",
///   "L": "0.00000000", "n": "0", "N": null, "T": 1499405658657,
///   "t": -1, "I": 8641984, "w": true, "m": false, "M": false,
///   "O": 1499405658657, "Z": "0.00000000"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionReportMessage {
    /// Event type (always "executionReport")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch millis)
    #[serde(rename = "E")]
    pub event_time: Number,

    /// Symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Client order id
    #[serde(rename = "c")]
    pub client_order_id: String,

    /// Side
    #[serde(rename = "S")]
    pub side: String,

    /// Order type
    #[serde(rename = "o")]
    pub order_type: String,

    /// Time in force
    #[serde(rename = "f")]
    pub time_in_force: String,

    /// Order quantity
    #[serde(rename = "q")]
    pub quantity: String,

    /// Order price
    #[serde(rename = "p")]
    pub price: String,

    /// Stop price
    #[serde(rename = "P")]
    pub stop_price: String,

    /// Iceberg quantity
    #[serde(rename = "F")]
    pub iceberg_quantity: String,

    /// Original client order id; empty or "null" when not a cancel
    #[serde(rename = "C", default)]
    pub original_client_order_id: Option<String>,

    /// Current execution type
    #[serde(rename = "x")]
    pub execution_type: String,

    /// Current order status
    #[serde(rename = "X")]
    pub status: String,

    /// Order reject reason
    #[serde(rename = "r")]
    pub reject_reason: String,

    /// Order id
    #[serde(rename = "i")]
    pub order_id: i64,

    /// Last executed quantity
    #[serde(rename = "l")]
    pub last_executed_quantity: String,

    /// Cumulative filled quantity
    #[serde(rename = "z")]
    pub cumulative_filled_quantity: String,

    /// Last executed price
    #[serde(rename = "L")]
    pub last_executed_price: String,

    /// Commission amount
    #[serde(rename = "n")]
    pub commission_amount: String,

    /// Commission asset
    #[serde(rename = "N", default)]
    pub commission_asset: Option<String>,

    /// Transaction time (epoch millis)
    #[serde(rename = "T")]
    pub transaction_time: Number,

    /// Trade id
    #[serde(rename = "t")]
    pub trade_id: i64,

    /// Is the order on the book?
    #[serde(rename = "w")]
    pub is_working: bool,

    /// Is this trade the maker side?
    #[serde(rename = "m")]
    pub is_maker: bool,

    /// Order creation time (epoch millis)
    #[serde(rename = "O")]
    pub order_created_at: Number,

    /// Cumulative quote asset transacted quantity
    #[serde(rename = "Z")]
    pub cumulative_quote_quantity: String,
}
