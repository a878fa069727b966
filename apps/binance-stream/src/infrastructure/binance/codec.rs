//! Stream Codec Module
//!
//! Decodes one raw text frame into a typed event. Decoding happens in two
//! phases:
//!
//! 1. **Structure**: `serde_json` parses the frame into the topic's wire
//!    record from [`super::messages`]. Decimal fields stay strings.
//! 2. **Fields**: every numeric string becomes a [`Decimal`] via exact
//!    parsing and every epoch-millisecond value becomes a [`DateTime<Utc>`].
//!
//! A failure in either phase is a [`DecodeError`] carrying the raw frame;
//! field failures also carry the wire tag of the offending field. Nothing is
//! defaulted.
//!
//! The account stream is the only multi-shape stream: its `e` tag selects
//! between a balance snapshot and an execution report, and any other tag is
//! dropped (`Ok(None)`) so new event types do not break existing sessions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use super::messages::{
    ACCOUNT_INFO_EVENT, AccountInfoMessage, AggTradeMessage, DepthMessage, EXECUTION_REPORT_EVENT,
    EnvelopeMessage, ExecutionReportMessage, KlineMessage, TradeMessage, WireDecimal,
};
use crate::domain::streaming::{
    AccountEvent, AccountSnapshot, AggTradeEvent, Balance, DepthEvent, EventHeader,
    ExecutionReport, Interval, Kline, KlineEvent, PriceLevel, StreamTopic, TradeEvent,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not JSON or does not have the topic's shape.
    #[error("malformed {topic} frame: {source}")]
    Structure {
        /// Topic being decoded.
        topic: StreamTopic,
        /// Parser error.
        source: serde_json::Error,
        /// Offending frame.
        raw: String,
    },

    /// A field has the right shape but an unusable value.
    #[error("invalid `{field}` in {topic} frame: {reason}")]
    Field {
        /// Topic being decoded.
        topic: StreamTopic,
        /// Wire tag of the field (`p`, `k.c`, `b.price`, ...).
        field: &'static str,
        /// Why conversion failed.
        reason: String,
        /// Offending frame.
        raw: String,
    },
}

impl DecodeError {
    /// Wire tag of the offending field, for field conversion failures.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Structure { .. } => None,
            Self::Field { field, .. } => Some(field),
        }
    }

    /// The frame that failed to decode.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Structure { raw, .. } | Self::Field { raw, .. } => raw,
        }
    }

    /// Whether this is a field conversion failure.
    #[must_use]
    pub const fn is_field_error(&self) -> bool {
        matches!(self, Self::Field { .. })
    }
}

/// Decodes raw frames of one topic into that topic's event type.
///
/// Implementations are pure: no I/O, no logging, no state between frames.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Event produced for this topic.
    type Event: Send + std::fmt::Debug + 'static;

    /// Topic this decoder understands.
    fn topic(&self) -> StreamTopic;

    /// Decode one frame.
    ///
    /// `Ok(None)` means the frame is a recognised-but-ignored event type.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for structural or field conversion failures.
    fn decode(&self, frame: &str) -> Result<Option<Self::Event>, DecodeError>;

    /// Whether a decoded event goes to the consumer channel.
    ///
    /// Withheld events are logged by the session instead of published.
    fn should_publish(&self, _event: &Self::Event) -> bool {
        true
    }
}

/// What the account stream does with order execution reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionReportPolicy {
    /// Decode and log, do not publish.
    #[default]
    Log,
    /// Publish as [`AccountEvent::ExecutionReport`].
    Emit,
}

impl ExecutionReportPolicy {
    /// Parse policy from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Some(Self::Log),
            "emit" | "publish" => Some(Self::Emit),
            _ => None,
        }
    }

    /// Policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Emit => "emit",
        }
    }
}

/// Field conversion helpers bound to one frame.
struct Fields<'a> {
    topic: StreamTopic,
    raw: &'a str,
}

impl<'a> Fields<'a> {
    const fn new(topic: StreamTopic, raw: &'a str) -> Self {
        Self { topic, raw }
    }

    fn parse<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_str(self.raw).map_err(|source| DecodeError::Structure {
            topic: self.topic,
            source,
            raw: self.raw.to_string(),
        })
    }

    fn error(&self, field: &'static str, reason: impl Into<String>) -> DecodeError {
        DecodeError::Field {
            topic: self.topic,
            field,
            reason: reason.into(),
            raw: self.raw.to_string(),
        }
    }

    fn decimal(&self, field: &'static str, text: &str) -> Result<Decimal, DecodeError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(self.error(field, "empty numeric string"));
        }
        Decimal::from_str_exact(trimmed).map_err(|e| self.error(field, format!("{text:?}: {e}")))
    }

    fn wire_decimal(&self, field: &'static str, value: &WireDecimal) -> Result<Decimal, DecodeError> {
        self.decimal(field, &value.as_text())
    }

    fn level(&self, side: Side, entry: &[Value]) -> Result<PriceLevel, DecodeError> {
        let (price_field, quantity_field) = side.fields();
        let price = self.level_value(price_field, entry.first())?;
        let quantity = self.level_value(quantity_field, entry.get(1))?;
        Ok(PriceLevel { price, quantity })
    }

    fn level_value(&self, field: &'static str, value: Option<&Value>) -> Result<Decimal, DecodeError> {
        match value {
            Some(Value::String(text)) => self.decimal(field, text),
            Some(other) => Err(self.error(field, format!("expected numeric string, got {other}"))),
            None => Err(self.error(field, "missing element")),
        }
    }

    fn timestamp(&self, field: &'static str, value: &Number) -> Result<DateTime<Utc>, DecodeError> {
        let parsed = if let Some(millis) = value.as_i64() {
            DateTime::from_timestamp_millis(millis)
        } else if let Some(millis) = value.as_f64() {
            millis_f64_to_datetime(millis)
        } else {
            None
        };
        parsed.ok_or_else(|| self.error(field, format!("{value} is not a valid epoch millisecond time")))
    }

    fn enumeration<T: DeserializeOwned>(&self, field: &'static str, text: &str) -> Result<T, DecodeError> {
        serde_json::from_value(Value::String(text.to_string()))
            .map_err(|_| self.error(field, format!("unrecognised value {text:?}")))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis_f64_to_datetime(millis: f64) -> Option<DateTime<Utc>> {
    // i64 micros covers roughly +/- 292k years; anything outside is garbage.
    const LIMIT: f64 = 9.2e15;
    let micros = (millis * 1000.0).round();
    if !micros.is_finite() || micros.abs() > LIMIT {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}

#[derive(Clone, Copy)]
enum Side {
    Bid,
    Ask,
}

impl Side {
    const fn fields(self) -> (&'static str, &'static str) {
        match self {
            Self::Bid => ("b.price", "b.quantity"),
            Self::Ask => ("a.price", "a.quantity"),
        }
    }
}

/// Decoder for `<symbol>@depth` frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct DepthDecoder;

impl FrameDecoder for DepthDecoder {
    type Event = DepthEvent;

    fn topic(&self) -> StreamTopic {
        StreamTopic::OrderBookDelta
    }

    fn decode(&self, frame: &str) -> Result<Option<DepthEvent>, DecodeError> {
        let f = Fields::new(self.topic(), frame);
        let msg: DepthMessage = f.parse()?;

        let bids = msg
            .bids
            .iter()
            .map(|entry| f.level(Side::Bid, entry))
            .collect::<Result<Vec<_>, _>>()?;
        let asks = msg
            .asks
            .iter()
            .map(|entry| f.level(Side::Ask, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(DepthEvent {
            header: EventHeader {
                event_type: msg.event_type,
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: Some(msg.symbol),
            },
            update_id: msg.update_id,
            bids,
            asks,
        }))
    }
}

/// Decoder for `<symbol>@kline_<interval>` frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct KlineDecoder;

impl FrameDecoder for KlineDecoder {
    type Event = KlineEvent;

    fn topic(&self) -> StreamTopic {
        StreamTopic::Kline
    }

    fn decode(&self, frame: &str) -> Result<Option<KlineEvent>, DecodeError> {
        let f = Fields::new(self.topic(), frame);
        let msg: KlineMessage = f.parse()?;
        let k = &msg.kline;

        let interval = Interval::from_str(&k.interval).map_err(|e| f.error("k.i", e.to_string()))?;

        let kline = Kline {
            open_time: f.timestamp("k.t", &k.open_time)?,
            close_time: f.timestamp("k.T", &k.close_time)?,
            open: f.decimal("k.o", &k.open)?,
            high: f.decimal("k.h", &k.high)?,
            low: f.decimal("k.l", &k.low)?,
            close: f.decimal("k.c", &k.close)?,
            volume: f.decimal("k.v", &k.volume)?,
            trade_count: k.trade_count,
            quote_asset_volume: f.decimal("k.q", &k.quote_asset_volume)?,
            taker_buy_base_asset_volume: f.decimal("k.V", &k.taker_buy_base_asset_volume)?,
            taker_buy_quote_asset_volume: f.decimal("k.Q", &k.taker_buy_quote_asset_volume)?,
        };

        Ok(Some(KlineEvent {
            header: EventHeader {
                event_type: msg.event_type.clone(),
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: msg.symbol().or_else(|| k.symbol.clone()),
            },
            interval,
            first_trade_id: k.first_trade_id,
            last_trade_id: k.last_trade_id,
            is_final: k.is_final,
            kline,
        }))
    }
}

/// Decoder for `<symbol>@aggTrade` frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggTradeDecoder;

impl FrameDecoder for AggTradeDecoder {
    type Event = AggTradeEvent;

    fn topic(&self) -> StreamTopic {
        StreamTopic::AggTrade
    }

    fn decode(&self, frame: &str) -> Result<Option<AggTradeEvent>, DecodeError> {
        let f = Fields::new(self.topic(), frame);
        let msg: AggTradeMessage = f.parse()?;

        Ok(Some(AggTradeEvent {
            header: EventHeader {
                event_type: msg.event_type,
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: Some(msg.symbol),
            },
            agg_trade_id: msg.agg_trade_id,
            price: f.decimal("p", &msg.price)?,
            quantity: f.decimal("q", &msg.quantity)?,
            first_trade_id: msg.first_trade_id,
            last_trade_id: msg.last_trade_id,
            trade_time: f.timestamp("T", &msg.trade_time)?,
            buyer_is_maker: msg.buyer_is_maker,
        }))
    }
}

/// Decoder for `<symbol>@trade` frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct TradeDecoder;

impl FrameDecoder for TradeDecoder {
    type Event = TradeEvent;

    fn topic(&self) -> StreamTopic {
        StreamTopic::Trade
    }

    fn decode(&self, frame: &str) -> Result<Option<TradeEvent>, DecodeError> {
        let f = Fields::new(self.topic(), frame);
        let msg: TradeMessage = f.parse()?;

        Ok(Some(TradeEvent {
            header: EventHeader {
                event_type: msg.event_type,
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: Some(msg.symbol),
            },
            trade_id: msg.trade_id,
            price: f.wire_decimal("p", &msg.price)?,
            quantity: f.wire_decimal("q", &msg.quantity)?,
            buyer_order_id: msg.buyer_order_id,
            seller_order_id: msg.seller_order_id,
            trade_time: f.timestamp("T", &msg.trade_time)?,
            buyer_is_maker: msg.buyer_is_maker,
        }))
    }
}

/// Decoder for account stream frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountDecoder {
    execution_reports: ExecutionReportPolicy,
}

impl AccountDecoder {
    /// Create a decoder applying `execution_reports` to order reports.
    #[must_use]
    pub const fn new(execution_reports: ExecutionReportPolicy) -> Self {
        Self { execution_reports }
    }

    fn balances(f: &Fields<'_>) -> Result<AccountEvent, DecodeError> {
        let msg: AccountInfoMessage = f.parse()?;

        let balances = msg
            .balances
            .iter()
            .map(|b| {
                Ok(Balance {
                    asset: b.asset.clone(),
                    free: f.decimal("B.f", &b.free)?,
                    locked: f.decimal("B.l", &b.locked)?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(AccountEvent::Balances(AccountSnapshot {
            header: EventHeader {
                event_type: msg.event_type.clone(),
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: None,
            },
            maker_commission: f.wire_decimal("m", &msg.maker_commission)?,
            taker_commission: f.wire_decimal("t", &msg.taker_commission)?,
            buyer_commission: f.wire_decimal("b", &msg.buyer_commission)?,
            seller_commission: f.wire_decimal("s", &msg.seller_commission)?,
            can_trade: msg.can_trade,
            can_withdraw: msg.can_withdraw,
            can_deposit: msg.can_deposit,
            updated_at: f.timestamp("u", &msg.updated_at)?,
            balances,
        }))
    }

    fn execution_report(f: &Fields<'_>) -> Result<AccountEvent, DecodeError> {
        let msg: ExecutionReportMessage = f.parse()?;

        let original_client_order_id = msg
            .original_client_order_id
            .filter(|id| !id.is_empty() && id != "null");

        let report = ExecutionReport {
            header: EventHeader {
                event_type: msg.event_type,
                event_time: f.timestamp("E", &msg.event_time)?,
                symbol: Some(msg.symbol),
            },
            client_order_id: msg.client_order_id,
            side: f.enumeration("S", &msg.side)?,
            order_type: f.enumeration("o", &msg.order_type)?,
            time_in_force: f.enumeration("f", &msg.time_in_force)?,
            quantity: f.decimal("q", &msg.quantity)?,
            price: f.decimal("p", &msg.price)?,
            stop_price: f.decimal("P", &msg.stop_price)?,
            iceberg_quantity: f.decimal("F", &msg.iceberg_quantity)?,
            original_client_order_id,
            execution_type: f.enumeration("x", &msg.execution_type)?,
            status: f.enumeration("X", &msg.status)?,
            reject_reason: msg.reject_reason,
            order_id: msg.order_id,
            last_executed_quantity: f.decimal("l", &msg.last_executed_quantity)?,
            cumulative_filled_quantity: f.decimal("z", &msg.cumulative_filled_quantity)?,
            last_executed_price: f.decimal("L", &msg.last_executed_price)?,
            commission_amount: f.decimal("n", &msg.commission_amount)?,
            commission_asset: msg.commission_asset,
            transaction_time: f.timestamp("T", &msg.transaction_time)?,
            trade_id: msg.trade_id,
            is_working: msg.is_working,
            is_maker: msg.is_maker,
            order_created_at: f.timestamp("O", &msg.order_created_at)?,
            cumulative_quote_quantity: f.decimal("Z", &msg.cumulative_quote_quantity)?,
        };

        Ok(AccountEvent::ExecutionReport(Box::new(report)))
    }
}

impl FrameDecoder for AccountDecoder {
    type Event = AccountEvent;

    fn topic(&self) -> StreamTopic {
        StreamTopic::AccountUpdate
    }

    fn decode(&self, frame: &str) -> Result<Option<AccountEvent>, DecodeError> {
        let f = Fields::new(self.topic(), frame);
        let envelope: EnvelopeMessage = f.parse()?;

        match envelope.event_type.as_str() {
            ACCOUNT_INFO_EVENT => Self::balances(&f).map(Some),
            EXECUTION_REPORT_EVENT => Self::execution_report(&f).map(Some),
            _ => Ok(None),
        }
    }

    fn should_publish(&self, event: &AccountEvent) -> bool {
        match event {
            AccountEvent::Balances(_) => true,
            AccountEvent::ExecutionReport(_) => self.execution_reports == ExecutionReportPolicy::Emit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::streaming::{ExecutionType, OrderSide, OrderStatus, OrderType, TimeInForce};
    use proptest::prelude::*;
    use test_case::test_case;

    const DEPTH: &str = r#"{"e":"depthUpdate","E":1672515782136,"s":"BNBBTC","U":157,"u":160,"b":[["100.5","0.001"],["100.4","2"]],"a":[["100.6","0.5"]]}"#;

    const KLINE: &str = r#"{"e":"kline","E":1672515782136,"s":"BTCUSDT","k":{"t":1672515780000,"T":1672515839999,"s":"BTCUSDT","i":"1m","f":100,"L":200,"o":"100","c":"105","h":"110","l":"90","v":"1000","n":100,"x":true,"q":"1.0000","V":"500","Q":"0.500","B":"123456"}}"#;

    const AGG_TRADE: &str = r#"{"e":"aggTrade","E":1672515782136,"s":"BNBBTC","a":12345,"p":"0.001","q":"100","f":100,"l":105,"T":1672515782136,"m":true,"M":true}"#;

    const TRADE: &str = r#"{"e":"trade","E":1672515782136,"s":"BNBBTC","t":12345,"p":"0.001","q":"100","b":88,"a":50,"T":1672515782136,"m":true,"M":true}"#;

    const ACCOUNT_INFO: &str = r#"{"e":"outboundAccountInfo","E":1499405658849,"m":0,"t":0,"b":0,"s":0,"T":true,"W":true,"D":true,"u":1499405658848,"B":[{"a":"LTC","f":"17366.18538083","l":"0.00000000"},{"a":"BTC","f":"10537.85314051","l":"2.19464093"}]}"#;

    const EXECUTION_REPORT: &str = r#"{"e":"executionReport","E":1499405658658,"s":"ETHBTC","c":"mUvoqJxFIILMdfAW5iGSOW","S":"BUY","o":"LIMIT","f":"GTC","q":"1.00000000","p":"0.10264410","P":"0.00000000","F":"0.00000000","g":-1,"C":"","x":"NEW","X":"NEW","r":"NONE","i":4293153,"l":"0.00000000","z":"0.00000000","L":"0.00000000","n":"0","N":null,"T":1499405658657,"t":-1,"I":8641984,"w":true,"m":false,"M":false,"O":1499405658657,"Z":"0.00000000"}"#;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn depth_decodes_levels_exactly() {
        let event = DepthDecoder.decode(DEPTH).unwrap().unwrap();

        assert_eq!(event.header.event_type, "depthUpdate");
        assert_eq!(event.header.symbol.as_deref(), Some("BNBBTC"));
        assert_eq!(event.header.event_time.timestamp_millis(), 1_672_515_782_136);
        assert_eq!(event.update_id, 160);
        assert_eq!(event.bids.len(), 2);
        assert_eq!(event.bids[0].price, dec("100.5"));
        assert_eq!(event.bids[0].quantity, dec("0.001"));
        assert_eq!(event.bids[0].quantity.to_string(), "0.001");
        assert_eq!(event.bids[1].price, dec("100.4"));
        assert_eq!(event.asks, vec![PriceLevel { price: dec("100.6"), quantity: dec("0.5") }]);
    }

    #[test]
    fn depth_malformed_price_names_field() {
        let frame = DEPTH.replace(r#""100.5""#, r#""abc""#);
        let err = DepthDecoder.decode(&frame).unwrap_err();

        assert_eq!(err.field(), Some("b.price"));
        assert!(err.is_field_error());
        assert_eq!(err.raw(), frame);
    }

    #[test]
    fn depth_float_level_is_rejected() {
        let frame = DEPTH.replace(r#"["100.6","0.5"]"#, r#"["100.6",0.5]"#);
        let err = DepthDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("a.quantity"));
    }

    #[test]
    fn depth_short_level_is_rejected() {
        let frame = DEPTH.replace(r#"["100.6","0.5"]"#, r#"["100.6"]"#);
        let err = DepthDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("a.quantity"));
    }

    #[test]
    fn structural_mismatch_is_not_a_field_error() {
        let err = DepthDecoder.decode(r#"{"e":"depthUpdate"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Structure { topic: StreamTopic::OrderBookDelta, .. }));
        assert!(err.field().is_none());

        let err = TradeDecoder.decode("not json").unwrap_err();
        assert_eq!(err.raw(), "not json");
    }

    #[test]
    fn kline_decodes_final_bar() {
        let event = KlineDecoder.decode(KLINE).unwrap().unwrap();

        assert!(event.is_final);
        assert_eq!(event.interval, Interval::OneMinute);
        assert_eq!(event.header.symbol.as_deref(), Some("BTCUSDT"));
        assert_eq!(event.first_trade_id, 100);
        assert_eq!(event.last_trade_id, 200);
        assert_eq!(event.kline.open, dec("100"));
        assert_eq!(event.kline.high, dec("110"));
        assert_eq!(event.kline.low, dec("90"));
        assert_eq!(event.kline.close, dec("105.0"));
        assert_eq!(event.kline.trade_count, 100);
        assert_eq!(event.kline.taker_buy_quote_asset_volume, dec("0.5"));
        assert_eq!(event.kline.open_time.timestamp_millis(), 1_672_515_780_000);
        assert_eq!(event.kline.close_time.timestamp_millis(), 1_672_515_839_999);
    }

    #[test]
    fn kline_envelope_with_both_symbol_tags_decodes() {
        let frame = KLINE.replacen(r#""s":"BTCUSDT","k""#, r#""S":"BTCUSDT","s":"BTCUSDT","k""#, 1);
        let event = KlineDecoder.decode(&frame).unwrap().unwrap();
        assert_eq!(event.header.symbol.as_deref(), Some("BTCUSDT"));
    }

    #[test]
    fn kline_symbol_falls_back_to_bar() {
        let frame = KLINE.replacen(r#""s":"BTCUSDT","k""#, r#""k""#, 1);
        let event = KlineDecoder.decode(&frame).unwrap().unwrap();
        assert_eq!(event.header.symbol.as_deref(), Some("BTCUSDT"));
    }

    #[test]
    fn kline_unknown_interval_names_field() {
        let frame = KLINE.replace(r#""i":"1m""#, r#""i":"7m""#);
        let err = KlineDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("k.i"));
    }

    #[test_case(r#""o":"100""#, r#""o":"x""#, "k.o" ; "open")]
    #[test_case(r#""c":"105""#, r#""c":"""#, "k.c" ; "close empty")]
    #[test_case(r#""V":"500""#, r#""V":"5e2""#, "k.V" ; "taker base exponent")]
    fn kline_bad_decimal_names_field(from: &str, to: &str, field: &str) {
        let frame = KLINE.replace(from, to);
        let err = KlineDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn agg_trade_decodes() {
        let event = AggTradeDecoder.decode(AGG_TRADE).unwrap().unwrap();

        assert_eq!(event.agg_trade_id, 12345);
        assert_eq!(event.price, dec("0.001"));
        assert_eq!(event.quantity, dec("100"));
        assert_eq!(event.first_trade_id, 100);
        assert_eq!(event.last_trade_id, 105);
        assert!(event.buyer_is_maker);
        assert_eq!(event.trade_time.timestamp_millis(), 1_672_515_782_136);
    }

    #[test]
    fn agg_trade_bad_price_names_field() {
        let frame = AGG_TRADE.replace(r#""p":"0.001""#, r#""p":"abc""#);
        let err = AggTradeDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("p"));
    }

    #[test]
    fn trade_decodes_string_prices() {
        let event = TradeDecoder.decode(TRADE).unwrap().unwrap();

        assert_eq!(event.trade_id, 12345);
        assert_eq!(event.price, dec("0.001"));
        assert_eq!(event.quantity, dec("100"));
        assert_eq!(event.buyer_order_id, 88);
        assert_eq!(event.seller_order_id, 50);
        assert!(event.buyer_is_maker);
    }

    #[test]
    fn trade_decodes_numeric_prices() {
        let frame = TRADE
            .replace(r#""p":"0.001""#, r#""p":0.001"#)
            .replace(r#""q":"100""#, r#""q":100"#);
        let event = TradeDecoder.decode(&frame).unwrap().unwrap();

        assert_eq!(event.price, dec("0.001"));
        assert_eq!(event.quantity, dec("100"));
    }

    #[test]
    fn fractional_event_time_is_accepted() {
        let frame = TRADE.replace(r#""E":1672515782136"#, r#""E":1672515782136.5"#);
        let event = TradeDecoder.decode(&frame).unwrap().unwrap();
        assert_eq!(event.header.event_time.timestamp_millis(), 1_672_515_782_136);
    }

    #[test]
    fn out_of_range_time_names_field() {
        let frame = TRADE.replace(r#""T":1672515782136"#, r#""T":1e300"#);
        let err = TradeDecoder.decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("T"));
    }

    #[test]
    fn account_info_decodes_balances() {
        let decoder = AccountDecoder::default();
        let event = decoder.decode(ACCOUNT_INFO).unwrap().unwrap();

        let AccountEvent::Balances(snapshot) = &event else {
            panic!("expected balances, got {event:?}");
        };
        assert!(snapshot.header.symbol.is_none());
        assert!(snapshot.can_trade && snapshot.can_withdraw && snapshot.can_deposit);
        assert_eq!(snapshot.maker_commission, Decimal::ZERO);
        assert_eq!(snapshot.balances.len(), 2);
        assert_eq!(snapshot.balances[1].asset, "BTC");
        assert_eq!(snapshot.balances[1].locked, dec("2.19464093"));
        assert_eq!(snapshot.updated_at.timestamp_millis(), 1_499_405_658_848);
        assert!(decoder.should_publish(&event));
    }

    #[test]
    fn account_info_bad_balance_names_field() {
        let frame = ACCOUNT_INFO.replace(r#""f":"17366.18538083""#, r#""f":"lots""#);
        let err = AccountDecoder::default().decode(&frame).unwrap_err();
        assert_eq!(err.field(), Some("B.f"));
    }

    #[test]
    fn execution_report_decodes_full_field_set() {
        let event = AccountDecoder::default().decode(EXECUTION_REPORT).unwrap().unwrap();

        let AccountEvent::ExecutionReport(report) = event else {
            panic!("expected execution report");
        };
        assert_eq!(report.header.symbol.as_deref(), Some("ETHBTC"));
        assert_eq!(report.side, OrderSide::Buy);
        assert_eq!(report.order_type, OrderType::Limit);
        assert_eq!(report.time_in_force, TimeInForce::Gtc);
        assert_eq!(report.execution_type, ExecutionType::New);
        assert_eq!(report.status, OrderStatus::New);
        assert_eq!(report.reject_reason, "NONE");
        assert_eq!(report.order_id, 4_293_153);
        assert_eq!(report.price, dec("0.10264410"));
        assert_eq!(report.quantity, dec("1"));
        assert!(report.original_client_order_id.is_none());
        assert!(report.commission_asset.is_none());
        assert_eq!(report.trade_id, -1);
        assert!(report.is_working);
        assert!(!report.is_maker);
    }

    #[test]
    fn execution_report_self_trade_prevention_values() {
        let frame = EXECUTION_REPORT
            .replace(r#""x":"NEW""#, r#""x":"TRADE_PREVENTION""#)
            .replace(r#""X":"NEW""#, r#""X":"EXPIRED_IN_MATCH""#);

        let AccountEvent::ExecutionReport(report) = AccountDecoder::default().decode(&frame).unwrap().unwrap()
        else {
            panic!("expected execution report");
        };
        assert_eq!(report.execution_type, ExecutionType::TradePrevention);
        assert_eq!(report.status, OrderStatus::ExpiredInMatch);
    }

    #[test]
    fn execution_report_unrecognised_enums_decode_as_unknown() {
        let frame = EXECUTION_REPORT
            .replace(r#""S":"BUY""#, r#""S":"HOLD""#)
            .replace(r#""o":"LIMIT""#, r#""o":"PEGGED""#)
            .replace(r#""f":"GTC""#, r#""f":"GTD""#)
            .replace(r#""x":"NEW""#, r#""x":"AMENDMENT""#)
            .replace(r#""X":"NEW""#, r#""X":"PARKED""#);

        let AccountEvent::ExecutionReport(report) = AccountDecoder::default().decode(&frame).unwrap().unwrap()
        else {
            panic!("expected execution report");
        };
        assert_eq!(report.side, OrderSide::Unknown);
        assert_eq!(report.order_type, OrderType::Unknown);
        assert_eq!(report.time_in_force, TimeInForce::Unknown);
        assert_eq!(report.execution_type, ExecutionType::Unknown);
        assert_eq!(report.status, OrderStatus::Unknown);
    }

    #[test]
    fn execution_report_policy_controls_publishing() {
        let log = AccountDecoder::new(ExecutionReportPolicy::Log);
        let emit = AccountDecoder::new(ExecutionReportPolicy::Emit);
        let event = log.decode(EXECUTION_REPORT).unwrap().unwrap();

        assert!(!log.should_publish(&event));
        assert!(emit.should_publish(&event));
    }

    #[test]
    fn unknown_account_event_is_dropped() {
        let frame = r#"{"e":"unknownType","E":1499405658849,"x":1}"#;
        assert!(AccountDecoder::default().decode(frame).unwrap().is_none());
    }

    #[test]
    fn account_frame_without_tag_is_structural_error() {
        let err = AccountDecoder::default().decode(r#"{"E":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Structure { topic: StreamTopic::AccountUpdate, .. }));
    }

    #[test_case("log", Some(ExecutionReportPolicy::Log))]
    #[test_case("EMIT", Some(ExecutionReportPolicy::Emit))]
    #[test_case("publish", Some(ExecutionReportPolicy::Emit))]
    #[test_case("drop", None)]
    fn policy_parsing(input: &str, expected: Option<ExecutionReportPolicy>) {
        assert_eq!(ExecutionReportPolicy::parse(input), expected);
    }

    proptest! {
        #[test]
        fn depth_levels_round_trip(
            price_mantissa in 1i64..1_000_000_000_000,
            price_scale in 0u32..=8,
            qty_mantissa in 0i64..1_000_000_000_000,
            qty_scale in 0u32..=8,
        ) {
            let price = Decimal::new(price_mantissa, price_scale);
            let quantity = Decimal::new(qty_mantissa, qty_scale);
            let frame = format!(
                r#"{{"e":"depthUpdate","E":1,"s":"BTCUSDT","u":1,"b":[["{price}","{quantity}"]],"a":[]}}"#
            );

            let event = DepthDecoder.decode(&frame).unwrap().unwrap();
            let level = event.bids[0];

            prop_assert_eq!(level.price, price);
            prop_assert_eq!(level.quantity, quantity);
            prop_assert_eq!(level.price.to_string(), price.to_string());
            prop_assert_eq!(level.quantity.to_string(), quantity.to_string());
        }
    }
}
