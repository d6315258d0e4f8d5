//! REST error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Response missing data")]
    MissingData,

    #[error("Expected exactly one account, found {0}")]
    AccountCount(usize),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RestResult<T> = Result<T, RestError>;
