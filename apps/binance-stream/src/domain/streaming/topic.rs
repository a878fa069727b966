//! Stream Topics and Targets
//!
//! A [`StreamTopic`] names one of the five event streams; a [`StreamTarget`]
//! is a topic bound to its parameters (symbol, interval or stream key) and
//! knows the path it is served under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The category of an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamTopic {
    /// Order book deltas (`<symbol>@depth`).
    OrderBookDelta,
    /// Candlestick updates (`<symbol>@kline_<interval>`).
    Kline,
    /// Aggregated trades (`<symbol>@aggTrade`).
    AggTrade,
    /// Raw trades (`<symbol>@trade`).
    Trade,
    /// Account and order updates (`<stream key>`).
    AccountUpdate,
}

impl StreamTopic {
    /// All topics, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::OrderBookDelta,
        Self::Kline,
        Self::AggTrade,
        Self::Trade,
        Self::AccountUpdate,
    ];

    /// Short label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrderBookDelta => "depth",
            Self::Kline => "kline",
            Self::AggTrade => "aggTrade",
            Self::Trade => "trade",
            Self::AccountUpdate => "account",
        }
    }
}

impl fmt::Display for StreamTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamTopic {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "depth" | "orderbookdelta" => Ok(Self::OrderBookDelta),
            "kline" => Ok(Self::Kline),
            "aggtrade" => Ok(Self::AggTrade),
            "trade" => Ok(Self::Trade),
            "account" | "accountupdate" | "userdata" => Ok(Self::AccountUpdate),
            _ => Err(TargetError::UnknownTopic(s.to_string())),
        }
    }
}

/// Candlestick interval as tagged by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// One minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// Three minutes.
    #[serde(rename = "3m")]
    ThreeMinutes,
    /// Five minutes.
    #[serde(rename = "5m")]
    FiveMinutes,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// Thirty minutes.
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// One hour.
    #[serde(rename = "1h")]
    OneHour,
    /// Two hours.
    #[serde(rename = "2h")]
    TwoHours,
    /// Four hours.
    #[serde(rename = "4h")]
    FourHours,
    /// Six hours.
    #[serde(rename = "6h")]
    SixHours,
    /// Eight hours.
    #[serde(rename = "8h")]
    EightHours,
    /// Twelve hours.
    #[serde(rename = "12h")]
    TwelveHours,
    /// One day.
    #[serde(rename = "1d")]
    OneDay,
    /// Three days.
    #[serde(rename = "3d")]
    ThreeDays,
    /// One week.
    #[serde(rename = "1w")]
    OneWeek,
    /// One month.
    #[serde(rename = "1M")]
    OneMonth,
}

impl Interval {
    /// Exchange tag for this interval (`1m`, `4h`, `1M`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::FourHours => "4h",
            Self::SixHours => "6h",
            Self::EightHours => "8h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = TargetError;

    // Case-sensitive: `1m` is a minute, `1M` a month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let interval = match s.trim() {
            "1m" => Self::OneMinute,
            "3m" => Self::ThreeMinutes,
            "5m" => Self::FiveMinutes,
            "15m" => Self::FifteenMinutes,
            "30m" => Self::ThirtyMinutes,
            "1h" => Self::OneHour,
            "2h" => Self::TwoHours,
            "4h" => Self::FourHours,
            "6h" => Self::SixHours,
            "8h" => Self::EightHours,
            "12h" => Self::TwelveHours,
            "1d" => Self::OneDay,
            "3d" => Self::ThreeDays,
            "1w" => Self::OneWeek,
            "1M" => Self::OneMonth,
            other => return Err(TargetError::UnknownInterval(other.to_string())),
        };
        Ok(interval)
    }
}

/// A topic bound to the parameters that identify one concrete stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// Order book deltas for a symbol.
    Depth {
        /// Trading pair, e.g. `BTCUSDT`.
        symbol: String,
    },
    /// Candlesticks for a symbol at an interval.
    Kline {
        /// Trading pair.
        symbol: String,
        /// Bar interval.
        interval: Interval,
    },
    /// Aggregated trades for a symbol.
    AggTrade {
        /// Trading pair.
        symbol: String,
    },
    /// Raw trades for a symbol.
    Trade {
        /// Trading pair.
        symbol: String,
    },
    /// Account stream identified by an opaque stream key.
    Account {
        /// Key obtained out-of-band from the REST API.
        stream_key: String,
    },
}

impl StreamTarget {
    /// Topic served by this target.
    #[must_use]
    pub const fn topic(&self) -> StreamTopic {
        match self {
            Self::Depth { .. } => StreamTopic::OrderBookDelta,
            Self::Kline { .. } => StreamTopic::Kline,
            Self::AggTrade { .. } => StreamTopic::AggTrade,
            Self::Trade { .. } => StreamTopic::Trade,
            Self::Account { .. } => StreamTopic::AccountUpdate,
        }
    }

    /// Check the parameters before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or non-alphanumeric symbol, or an empty
    /// or whitespace-bearing stream key.
    pub fn validate(&self) -> Result<(), TargetError> {
        match self {
            Self::Depth { symbol }
            | Self::Kline { symbol, .. }
            | Self::AggTrade { symbol }
            | Self::Trade { symbol } => {
                if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(TargetError::InvalidSymbol(symbol.clone()));
                }
            }
            Self::Account { stream_key } => {
                if stream_key.is_empty() || stream_key.chars().any(char::is_whitespace) {
                    return Err(TargetError::InvalidStreamKey);
                }
            }
        }
        Ok(())
    }

    /// Path component appended to the stream base URL.
    ///
    /// Symbols are lowercased; the stream key is used verbatim.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Depth { symbol } => format!("{}@depth", symbol.to_lowercase()),
            Self::Kline { symbol, interval } => {
                format!("{}@kline_{interval}", symbol.to_lowercase())
            }
            Self::AggTrade { symbol } => format!("{}@aggTrade", symbol.to_lowercase()),
            Self::Trade { symbol } => format!("{}@trade", symbol.to_lowercase()),
            Self::Account { stream_key } => stream_key.clone(),
        }
    }

    /// Full connection URL under `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Invalid topic parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// Symbol is empty or contains characters other than ASCII letters and digits.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    /// Stream key is empty or contains whitespace.
    #[error("invalid stream key")]
    InvalidStreamKey,
    /// Unrecognised interval tag.
    #[error("unknown interval: {0}")]
    UnknownInterval(String),
    /// Unrecognised topic name.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}
