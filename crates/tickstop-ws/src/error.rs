//! WebSocket error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Stream ended")]
    StreamEnded,

    #[error("Not connected")]
    NotConnected,

    #[error("Write timed out after {0} ms")]
    WriteTimeout(u64),

    #[error("No data for {0} ms")]
    Stalled(u64),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Message parse error: {0}")]
    ParseError(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Short label used as the reconnect metric reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connect_failed",
            Self::ConnectionClosed { .. } => "closed_by_server",
            Self::StreamEnded => "stream_ended",
            Self::NotConnected => "not_connected",
            Self::WriteTimeout(_) => "write_timeout",
            Self::Stalled(_) => "stalled",
            Self::Decode(_) => "decode",
            Self::ParseError(_) | Self::Json(_) => "parse",
            Self::SessionClosed => "session_closed",
            Self::Tungstenite(_) => "transport",
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
