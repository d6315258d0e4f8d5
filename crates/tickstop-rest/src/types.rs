//! REST request and response types.

use crate::error::{RestError, RestResult};
use serde::{Deserialize, Serialize};
use tickstop_core::{Instrument, OrderSide, Price, Size};

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: String,
    pub data: Option<T>,
    #[serde(default, rename = "err-code")]
    pub err_code: Option<String>,
    #[serde(default, rename = "err-msg")]
    pub err_msg: Option<String>,
}

impl<T> ApiResponse<T> {
    /// A non-empty `err-msg` is an error regardless of `status`.
    pub fn into_result(self) -> RestResult<T> {
        match self.err_msg {
            Some(message) if !message.is_empty() => Err(RestError::Api {
                code: self.err_code.unwrap_or_default(),
                message,
            }),
            _ => self.data.ok_or(RestError::MissingData),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: u64,
    #[serde(default, rename = "user-id")]
    pub user_id: Option<u64>,
    #[serde(rename = "type")]
    pub account_type: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "buy-limit")]
    BuyLimit,
    #[serde(rename = "sell-limit")]
    SellLimit,
}

impl From<OrderSide> for OrderType {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::BuyLimit,
            OrderSide::Sell => Self::SellLimit,
        }
    }
}

/// Limit order the trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOrder {
    pub instrument: Instrument,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Size,
}

/// Body of `POST /v1/order/orders/place`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "account-id")]
    pub account_id: String,
    pub amount: String,
    pub price: String,
    pub source: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
}

impl PlaceOrderRequest {
    pub fn new(account_id: u64, order: &LimitOrder) -> Self {
        Self {
            account_id: account_id.to_string(),
            amount: order.amount.to_string(),
            price: order.price.to_string(),
            source: "api".to_string(),
            symbol: order.instrument.venue_symbol(),
            order_type: order.side.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accounts_response() {
        let raw = r#"{"status":"ok","data":[{"id":100009,"user-id":1000,"type":"spot","state":"working"}]}"#;
        let response: ApiResponse<Vec<Account>> = serde_json::from_str(raw).unwrap();
        let accounts = response.into_result().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, 100009);
        assert_eq!(accounts[0].account_type, "spot");
    }

    #[test]
    fn test_error_message_wins() {
        let raw = r#"{"status":"error","err-code":"api-signature-not-valid","err-msg":"Signature not valid","data":null}"#;
        let response: ApiResponse<String> = serde_json::from_str(raw).unwrap();
        match response.into_result() {
            Err(RestError::Api { code, message }) => {
                assert_eq!(code, "api-signature-not-valid");
                assert_eq!(message, "Signature not valid");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_data() {
        let response: ApiResponse<String> = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(matches!(response.into_result(), Err(RestError::MissingData)));
    }

    #[test]
    fn test_place_order_body() {
        let order = LimitOrder {
            instrument: "bcc_btc".parse().unwrap(),
            side: OrderSide::Sell,
            price: Price::new(dec!(0.1)),
            amount: Size::new(dec!(2.5)),
        };
        let body = serde_json::to_value(PlaceOrderRequest::new(42, &order)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "account-id": "42",
                "amount": "2.5",
                "price": "0.1",
                "source": "api",
                "symbol": "bchbtc",
                "type": "sell-limit"
            })
        );
    }
}
