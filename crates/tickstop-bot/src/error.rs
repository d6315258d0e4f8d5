//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value: {0}")]
    Core(#[from] tickstop_core::CoreError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tickstop_ws::WsError),

    #[error("Feed error: {0}")]
    Feed(#[from] tickstop_feed::FeedError),

    #[error("REST error: {0}")]
    Rest(#[from] tickstop_rest::RestError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tickstop_telemetry::TelemetryError),

    #[error("Book event stream ended before the stop was reached")]
    StreamEnded,

    #[error("Shutdown requested")]
    Shutdown,
}

pub type AppResult<T> = Result<T, AppError>;
