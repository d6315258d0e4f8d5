//! Depth-feed WebSocket session for tickstop.
//!
//! One task owns the streaming connection and everything attached to it:
//! - Connection lifecycle with fixed-delay reconnect and resubscription
//! - Keepalive pings and stalled-feed detection
//! - Gzip frame decoding and message classification
//! - Subscription bookkeeping (request ids, acknowledged channels)
//! - Routing of depth snapshots to per-instrument update handlers
//!
//! Callers talk to the session through a cloneable [`SessionHandle`].

pub mod codec;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;

pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, SessionHandle, SessionStatus,
};
pub use error::{WsError, WsResult};
pub use message::{DepthUpdate, ErrorFrame, InboundFrame, SubscribeAck, SubscribeRequest};
pub use subscription::{AckOutcome, SubscriptionBook};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
