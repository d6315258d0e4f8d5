//! Inbound frame routing.

use super::ConnectionManager;
use crate::codec::decode_frame;
use crate::error::WsError;
use crate::message::{DepthUpdate, ErrorFrame, InboundFrame, PongFrame, SubscribeAck};
use crate::subscription::AckOutcome;
use serde_json::Value;
use tickstop_feed::FeedError;
use tickstop_telemetry::Metrics;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

impl ConnectionManager {
    /// Handle one read result from the socket.
    pub(super) async fn handle_inbound(
        &mut self,
        inbound: Option<Result<Message, tungstenite::Error>>,
    ) {
        match inbound {
            Some(Ok(Message::Text(text))) => {
                self.keepalive.record_message();
                self.dispatch(&text).await;
            }
            Some(Ok(Message::Binary(bytes))) => {
                self.keepalive.record_message();
                match decode_frame(&bytes) {
                    Ok(text) => self.dispatch(&text).await,
                    Err(e) => self.fail_link(e),
                }
            }
            Some(Ok(Message::Ping(payload))) => {
                self.keepalive.record_message();
                if let Err(e) = self.send_message(Message::Pong(payload)).await {
                    self.fail_link(e);
                }
            }
            Some(Ok(Message::Pong(_))) => {
                self.keepalive.record_message();
                self.keepalive.record_pong();
            }
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((1000, "Normal close".to_string()));
                self.fail_link(WsError::ConnectionClosed { code, reason });
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => self.fail_link(e.into()),
            None => self.fail_link(WsError::StreamEnded),
        }
    }

    /// Classify decoded frame text and route it.
    async fn dispatch(&mut self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Malformed frame dropped");
                Metrics::frame_dropped("malformed");
                return;
            }
        };
        Metrics::frame_received(frame.kind());

        match frame {
            InboundFrame::Error(err) => self.on_error_frame(err),
            InboundFrame::Ping(ts) => self.answer_ping(ts).await,
            InboundFrame::Pong(_) => self.keepalive.record_pong(),
            InboundFrame::Subscribed(ack) => self.on_subscribe_ack(ack),
            InboundFrame::Depth(update) => self.route_depth(update),
            InboundFrame::Unhandled(value) => {
                warn!(frame = %value, "Unhandled frame dropped");
                Metrics::frame_dropped("unhandled");
            }
        }
    }

    fn on_error_frame(&mut self, err: ErrorFrame) {
        let code = match &err.err_code {
            Some(Value::String(code)) => code.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        warn!(
            code = %code,
            message = err.err_msg.as_deref().unwrap_or(""),
            id = ?err.id,
            "Venue reported error"
        );

        if let Some(instrument) = err.id.as_deref().and_then(|id| self.subscriptions.reject(id)) {
            warn!(instrument = %instrument, "Subscription rejected");
        }
    }

    async fn answer_ping(&mut self, ts: Value) {
        if let Err(e) = self.send_frame(&PongFrame { pong: ts }).await {
            self.fail_link(e);
        }
    }

    fn on_subscribe_ack(&mut self, ack: SubscribeAck) {
        match self.subscriptions.acknowledge(ack.id.as_deref(), &ack.subbed) {
            AckOutcome::Acknowledged(instrument) => {
                info!(instrument = %instrument, channel = %ack.subbed, "Subscription acknowledged");
            }
            AckOutcome::UnknownRequest => {
                // Stale (earlier connection) or duplicate ack.
                warn!(id = ?ack.id, channel = %ack.subbed, "Ack for unknown request id dropped");
                Metrics::frame_dropped("unknown_request");
            }
        }
    }

    fn route_depth(&mut self, update: DepthUpdate) {
        let Some(instrument) = self.subscriptions.resolve_channel(&update.ch) else {
            debug!(channel = %update.ch, "Update on unacknowledged channel dropped");
            Metrics::frame_dropped("unknown_channel");
            return;
        };
        let Some(handler) = self.handlers.get(instrument) else {
            warn!(instrument = %instrument, "No update handler, update dropped");
            Metrics::frame_dropped("no_handler");
            return;
        };

        let tick = match update.tick.into_depth_tick() {
            Ok(tick) => tick,
            Err(e) => {
                warn!(instrument = %instrument, error = %e, "Invalid depth levels dropped");
                Metrics::frame_dropped("invalid_levels");
                return;
            }
        };

        match handler.try_forward(tick) {
            Ok(()) => {}
            Err(e @ FeedError::Backlog(_)) => {
                debug!(error = %e, "Handler behind, depth update dropped");
                Metrics::frame_dropped("handler_backlog");
            }
            Err(e) => {
                warn!(error = %e, "Depth update dropped");
                Metrics::frame_dropped("handler_closed");
            }
        }
    }
}
