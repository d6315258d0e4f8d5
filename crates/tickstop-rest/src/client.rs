//! HTTP client for the signed trading endpoints.

use crate::error::{RestError, RestResult};
use crate::signer::RequestSigner;
use crate::types::{Account, ApiResponse, LimitOrder, PlaceOrderRequest};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_REST_URL: &str = "https://api.huobi.pro";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const ACCOUNTS_PATH: &str = "/v1/account/accounts";
const PLACE_ORDER_PATH: &str = "/v1/order/orders/place";

pub struct RestClient {
    client: Client,
    base_url: String,
    /// Host as it appears in the signature payload.
    host: String,
    signer: RequestSigner,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, signer: RequestSigner) -> RestResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let host = signing_host(&base_url)?;

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            host,
            signer,
        })
    }

    /// `GET /v1/account/accounts`.
    pub async fn get_accounts(&self) -> RestResult<Vec<Account>> {
        self.send_signed::<Vec<Account>, ()>(Method::GET, ACCOUNTS_PATH, None)
            .await
    }

    /// The one account orders are placed from.
    ///
    /// Anything other than exactly one account is a configuration error.
    pub async fn single_account_id(&self) -> RestResult<u64> {
        let accounts = self.get_accounts().await?;
        match accounts.as_slice() {
            [account] => {
                info!(
                    account_id = account.id,
                    account_type = %account.account_type,
                    state = %account.state,
                    "Trading account resolved"
                );
                Ok(account.id)
            }
            other => Err(RestError::AccountCount(other.len())),
        }
    }

    /// `POST /v1/order/orders/place`. Returns the venue order id.
    pub async fn place_limit_order(&self, account_id: u64, order: &LimitOrder) -> RestResult<String> {
        let body = PlaceOrderRequest::new(account_id, order);
        info!(
            symbol = %body.symbol,
            order_type = ?body.order_type,
            price = %body.price,
            amount = %body.amount,
            "Placing limit order"
        );
        self.send_signed(Method::POST, PLACE_ORDER_PATH, Some(&body))
            .await
    }

    async fn send_signed<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> RestResult<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let query =
            self.signer
                .signed_query(method.as_str(), &self.host, path, &[], chrono::Utc::now())?;
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!(%method, path, "Sending signed request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| RestError::HttpClient(format!("Failed to read response: {e}")))?;
        let envelope: ApiResponse<T> = serde_json::from_str(&text)?;
        envelope.into_result()
    }
}

/// `host[:port]` of the base URL, lower-cased.
fn signing_host(base_url: &str) -> RestResult<String> {
    let url = Url::parse(base_url).map_err(|e| RestError::InvalidUrl(format!("{base_url}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| RestError::InvalidUrl(format!("{base_url}: missing host")))?
        .to_lowercase();
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}
