use super::de::{de_str, de_u64_epoch_ms_as_datetime_utc};
use crate::tick::Tick;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

/// Event type carried by trade messages in the `e` field.
pub const TRADE_EVENT: &str = "trade";

/// Outcome of decoding one text frame received from a trade stream.
#[derive(Clone, PartialEq, Debug)]
pub enum FeedMessage {
    Trade(Tick),
    /// Well-formed message that is not a trade, eg/ a subscription acknowledgement.
    Ignored { event: Option<SmolStr> },
}

/// Reasons a text frame could not be turned into a [`FeedMessage`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("invalid trade for {instrument}: price {price}, quantity {quantity}")]
    InvalidTrade {
        instrument: SmolStr,
        price: f64,
        quantity: f64,
    },
}

/// Binance USD-M futures real-time trade message.
///
/// ### Raw Payload Examples
/// See docs: <https://developers.binance.com/docs/derivatives/usds-margined-futures/websocket-market-streams>
/// ```json
/// {
///     "e": "trade",
///     "E": 1700000000123,
///     "T": 1700000000120,
///     "s": "BTCUSDT",
///     "t": 4521389561,
///     "p": "37012.40",
///     "q": "0.015",
///     "X": "MARKET",
///     "m": true
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct BinanceTrade {
    #[serde(rename = "T", deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
    pub time: DateTime<Utc>,
    #[serde(rename = "s")]
    pub symbol: SmolStr,
    #[serde(rename = "p", deserialize_with = "de_str")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "de_str")]
    pub quantity: f64,
}

impl From<BinanceTrade> for Tick {
    fn from(trade: BinanceTrade) -> Self {
        Tick::new(trade.time, trade.symbol, trade.price, trade.quantity)
    }
}

#[derive(Deserialize)]
struct EventHeader {
    #[serde(rename = "e", default)]
    event: Option<SmolStr>,
}

/// Decode a raw text frame.
///
/// Non-trade events are returned as [`FeedMessage::Ignored`]. Trades missing a field, with
/// unparseable numbers, or failing [`Tick::is_valid`] are rejected with a [`ParseError`].
pub fn parse_message(text: &str) -> Result<FeedMessage, ParseError> {
    let header = serde_json::from_str::<EventHeader>(text)
        .map_err(|error| ParseError::Malformed(error.to_string()))?;

    if header.event.as_deref() != Some(TRADE_EVENT) {
        return Ok(FeedMessage::Ignored {
            event: header.event,
        });
    }

    let tick = serde_json::from_str::<BinanceTrade>(text)
        .map(Tick::from)
        .map_err(|error| ParseError::Malformed(error.to_string()))?;

    if !tick.is_valid() {
        return Err(ParseError::InvalidTrade {
            instrument: tick.instrument,
            price: tick.price,
            quantity: tick.quantity,
        });
    }

    Ok(FeedMessage::Trade(tick))
}
