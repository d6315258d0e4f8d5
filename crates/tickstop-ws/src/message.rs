//! Wire message types.
//!
//! Outbound frames are small JSON objects. Inbound frames carry no type
//! tag; they are told apart by which keys are present, checked in a fixed
//! order (error status, ping, pong, subscription ack, channel update).

use crate::error::{WsError, WsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tickstop_core::{DepthTick, Price, PriceLevel, Size};

/// Subscribe request: `{"sub": <topic>, "id": <request id>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub sub: String,
    pub id: String,
}

impl SubscribeRequest {
    pub fn new(topic: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            sub: topic.into(),
            id: id.into(),
        }
    }
}

/// Client keepalive ping carrying a millisecond timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct PingFrame {
    pub ping: i64,
}

impl PingFrame {
    pub fn now() -> Self {
        Self {
            ping: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Reply to a server ping, echoing its value untouched.
#[derive(Debug, Clone, Serialize)]
pub struct PongFrame {
    pub pong: Value,
}

/// Serialize an outbound frame.
pub fn to_text<T: Serialize>(frame: &T) -> WsResult<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Venue-reported failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorFrame {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "err-code")]
    pub err_code: Option<Value>,
    #[serde(default, rename = "err-msg")]
    pub err_msg: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Subscription acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeAck {
    /// Server channel name for subsequent updates.
    pub subbed: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
}

/// Depth levels as sent: `[[price, size], ...]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDepthTick {
    #[serde(default)]
    pub bids: Vec<(f64, f64)>,
    #[serde(default)]
    pub asks: Vec<(f64, f64)>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub ts: i64,
}

impl WireDepthTick {
    /// Convert wire floats into decimal levels.
    pub fn into_depth_tick(self) -> WsResult<DepthTick> {
        Ok(DepthTick {
            bids: convert_levels(&self.bids)?,
            asks: convert_levels(&self.asks)?,
            version: self.version,
            ts: self.ts,
        })
    }
}

fn convert_levels(levels: &[(f64, f64)]) -> WsResult<Vec<PriceLevel>> {
    levels
        .iter()
        .map(|&(price, size)| {
            let price = Price::from_wire(price).map_err(|e| WsError::ParseError(e.to_string()))?;
            let size = Size::from_wire(size).map_err(|e| WsError::ParseError(e.to_string()))?;
            Ok(PriceLevel::new(price, size))
        })
        .collect()
}

/// Channel update frame.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthUpdate {
    pub ch: String,
    #[serde(default)]
    pub ts: i64,
    pub tick: WireDepthTick,
}

/// Classified inbound frame.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    Error(ErrorFrame),
    Ping(Value),
    Pong(Value),
    Subscribed(SubscribeAck),
    Depth(DepthUpdate),
    Unhandled(Value),
}

impl InboundFrame {
    /// Parse and classify decoded frame text.
    pub fn parse(text: &str) -> WsResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Some(obj) = value.as_object() else {
            return Ok(Self::Unhandled(value));
        };

        if obj.get("status").and_then(Value::as_str) == Some("error") {
            return Ok(Self::Error(serde_json::from_value(value)?));
        }
        if let Some(ts) = obj.get("ping") {
            return Ok(Self::Ping(ts.clone()));
        }
        if let Some(ts) = obj.get("pong") {
            return Ok(Self::Pong(ts.clone()));
        }
        if obj.contains_key("subbed") {
            return Ok(Self::Subscribed(serde_json::from_value(value)?));
        }
        if obj.contains_key("ch") {
            return Ok(Self::Depth(serde_json::from_value(value)?));
        }

        Ok(Self::Unhandled(value))
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Ping(_) => "ping",
            Self::Pong(_) => "pong",
            Self::Subscribed(_) => "subbed",
            Self::Depth(_) => "depth",
            Self::Unhandled(_) => "unhandled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_request_wire_format() {
        let req = SubscribeRequest::new("market.zrxbtc.depth.step0", "id_zrxbtc_1");
        assert_eq!(
            to_text(&req).unwrap(),
            r#"{"sub":"market.zrxbtc.depth.step0","id":"id_zrxbtc_1"}"#
        );
    }

    #[test]
    fn test_pong_echoes_value() {
        let frame = InboundFrame::parse(r#"{"ping":1492420473027}"#).unwrap();
        let InboundFrame::Ping(ts) = frame else {
            panic!("expected ping");
        };
        let pong = to_text(&PongFrame { pong: ts }).unwrap();
        assert_eq!(pong, r#"{"pong":1492420473027}"#);
    }

    #[test]
    fn test_error_takes_priority() {
        let raw = r#"{"status":"error","id":"id_zrxbtc_1","err-code":"bad-request","err-msg":"invalid topic","ts":1}"#;
        let InboundFrame::Error(err) = InboundFrame::parse(raw).unwrap() else {
            panic!("expected error");
        };
        assert_eq!(err.id.as_deref(), Some("id_zrxbtc_1"));
        assert_eq!(err.err_msg.as_deref(), Some("invalid topic"));
    }

    #[test]
    fn test_subscribe_ack() {
        let raw = r#"{"id":"id_zrxbtc_1","status":"ok","subbed":"market.zrxbtc.depth.step0","ts":1}"#;
        let InboundFrame::Subscribed(ack) = InboundFrame::parse(raw).unwrap() else {
            panic!("expected ack");
        };
        assert_eq!(ack.subbed, "market.zrxbtc.depth.step0");
        assert_eq!(ack.id.as_deref(), Some("id_zrxbtc_1"));
    }

    #[test]
    fn test_depth_update_converts_levels() {
        let raw = r#"{
            "ch": "market.zrxbtc.depth.step0",
            "ts": 1,
            "tick": {
                "bids": [[0.00010512, 120.5], [0.0001051, 3]],
                "asks": [[0.0001052, 40]],
                "version": 7,
                "ts": 2
            }
        }"#;
        let InboundFrame::Depth(update) = InboundFrame::parse(raw).unwrap() else {
            panic!("expected depth");
        };
        assert_eq!(update.ch, "market.zrxbtc.depth.step0");

        let tick = update.tick.into_depth_tick().unwrap();
        assert_eq!(tick.bids.len(), 2);
        assert_eq!(tick.bids[0].price, Price::new(dec!(0.00010512)));
        assert_eq!(tick.bids[0].size, Size::new(dec!(120.5)));
        assert_eq!(tick.asks[0].price, Price::new(dec!(0.0001052)));
        assert_eq!(tick.version, 7);
    }

    #[test]
    fn test_unknown_shape_is_unhandled() {
        let frame = InboundFrame::parse(r#"{"rep":"market.zrxbtc.kline.1min"}"#).unwrap();
        assert_eq!(frame.kind(), "unhandled");

        let frame = InboundFrame::parse("[1,2,3]").unwrap();
        assert_eq!(frame.kind(), "unhandled");
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(InboundFrame::parse("{not json").is_err());
    }

    #[test]
    fn test_depth_without_tick_is_error() {
        assert!(InboundFrame::parse(r#"{"ch":"market.zrxbtc.depth.step0"}"#).is_err());
    }
}
