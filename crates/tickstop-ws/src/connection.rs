//! Connection manager.
//!
//! One task owns the socket, the subscription book and the registry of
//! per-instrument update handlers. It suspends on whichever of shutdown,
//! reconnect signal, caller command, keepalive tick, inactivity deadline
//! or inbound frame is ready first, so no bookkeeping is ever shared
//! across tasks.

use crate::error::{WsError, WsResult};
use crate::heartbeat::Keepalive;
use crate::message::{to_text, PingFrame};
use crate::subscription::SubscriptionBook;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tickstop_core::{BookOrder, Instrument, DEFAULT_DEPTH};
use tickstop_feed::{spawn_update_handler, UpdateHandle, UpdateHandlerConfig};
use tickstop_telemetry::Metrics;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

mod dispatch;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_WS_URL: &str = "wss://api.huobi.pro/ws";

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Keepalive ping interval.
    pub ping_interval_ms: u64,
    /// A read gap longer than this is a stalled feed.
    pub inactivity_timeout_ms: u64,
    /// Bound on every outbound write and on the handshake.
    pub write_timeout_ms: u64,
    /// Fixed delay between failed connect attempts.
    pub reconnect_delay_ms: u64,
    /// Levels per side kept from each snapshot.
    pub depth: usize,
    /// Snapshot queue capacity per instrument.
    pub handler_queue: usize,
    /// Caller command queue capacity.
    pub command_queue: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            ping_interval_ms: 5_000,
            inactivity_timeout_ms: 1_800_000,
            write_timeout_ms: 20_000,
            reconnect_delay_ms: 5_000,
            depth: DEFAULT_DEPTH,
            handler_queue: 100,
            command_queue: 1_000,
        }
    }
}

impl ConnectionConfig {
    pub fn handler_config(&self) -> UpdateHandlerConfig {
        UpdateHandlerConfig {
            depth: self.depth,
            queue_capacity: self.handler_queue,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal; entered only on shutdown.
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the session's bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: ConnectionState,
    /// Successful connections so far.
    pub generation: u64,
    pub tracked: Vec<Instrument>,
    pub pending_acks: usize,
    /// Acknowledged channel -> instrument, sorted by channel.
    pub channels: Vec<(String, Instrument)>,
    pub handlers: usize,
    /// Connections lost after being established.
    pub reconnects: u64,
}

#[derive(Debug)]
enum SessionCommand {
    Subscribe(Instrument),
    Status(oneshot::Sender<SessionStatus>),
}

/// Cloneable control surface for a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_token: CancellationToken,
}

impl SessionHandle {
    /// Track an instrument and subscribe to its depth channel.
    ///
    /// Idempotent: a second request for the same instrument never spawns
    /// another update handler or sends a duplicate subscription.
    pub async fn subscribe(&self, instrument: Instrument) -> WsResult<()> {
        self.command_tx
            .send(SessionCommand::Subscribe(instrument))
            .await
            .map_err(|_| WsError::SessionClosed)
    }

    pub async fn status(&self) -> WsResult<SessionStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::Status(reply_tx))
            .await
            .map_err(|_| WsError::SessionClosed)?;
        reply_rx.await.map_err(|_| WsError::SessionClosed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Wait until the session reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> WsResult<()> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| WsError::SessionClosed)
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("Session shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }
}

/// Capacity-one reconnect slot. While a request is pending, further
/// requests are absorbed.
#[derive(Debug)]
struct ReconnectSignal {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
}

impl ReconnectSignal {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Returns `false` if a reconnect was already pending.
    fn request(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Session driver. Create with [`ConnectionManager::new`] and drive with
/// [`ConnectionManager::run`], or use [`ConnectionManager::spawn`].
pub struct ConnectionManager {
    config: ConnectionConfig,
    handler_config: UpdateHandlerConfig,
    link: Option<WsStream>,
    subscriptions: SubscriptionBook,
    handlers: HashMap<Instrument, UpdateHandle>,
    events_tx: mpsc::Sender<BookOrder>,
    command_rx: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<ConnectionState>,
    keepalive: Keepalive,
    reconnect: ReconnectSignal,
    reconnect_count: u64,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a session. Book-order events from every instrument's update
    /// handler are sent to `events_tx`.
    pub fn new(config: ConnectionConfig, events_tx: mpsc::Sender<BookOrder>) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_queue.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let shutdown_token = CancellationToken::new();

        let handle = SessionHandle {
            command_tx,
            state_rx,
            shutdown_token: shutdown_token.clone(),
        };

        let manager = Self {
            handler_config: config.handler_config(),
            keepalive: Keepalive::new(
                Duration::from_millis(config.ping_interval_ms),
                Duration::from_millis(config.inactivity_timeout_ms),
            ),
            config,
            link: None,
            subscriptions: SubscriptionBook::new(),
            handlers: HashMap::new(),
            events_tx,
            command_rx,
            state_tx,
            reconnect: ReconnectSignal::new(),
            reconnect_count: 0,
            shutdown_token,
        };

        (manager, handle)
    }

    /// Create a session and run it on its own task.
    pub fn spawn(
        config: ConnectionConfig,
        events_tx: mpsc::Sender<BookOrder>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (manager, handle) = Self::new(config, events_tx);
        (handle, tokio::spawn(manager.run()))
    }

    /// Drive the session until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(url = %self.config.url, "Session started");
        self.reconnect.request();

        let period = self.keepalive.ping_interval();
        let mut keepalive_tick = tokio::time::interval_at(Instant::now() + period, period);
        keepalive_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stall_deadline = self.link.as_ref().map(|_| self.keepalive.read_deadline());

            tokio::select! {
                () = self.shutdown_token.cancelled() => break,
                Some(()) = self.reconnect.rx.recv() => self.reconnect().await,
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("All session handles dropped");
                        break;
                    }
                },
                _ = keepalive_tick.tick() => self.send_keepalive().await,
                () = sleep_until_opt(stall_deadline) => self.on_stalled(),
                inbound = next_frame(&mut self.link) => self.handle_inbound(inbound).await,
            }
        }

        self.teardown().await;
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            Metrics::ws_state_set(state.as_str());
            debug!(state = %state, "Connection state changed");
        }
    }

    fn request_reconnect(&self, reason: &str) {
        if self.shutdown_token.is_cancelled() {
            return;
        }
        if self.reconnect.request() {
            Metrics::ws_reconnect(reason);
            debug!(reason, "Reconnect requested");
        } else {
            debug!(reason, "Reconnect already pending");
        }
    }

    /// Enter `Connecting`: close any prior link and open a new one.
    async fn reconnect(&mut self) {
        self.close_link().await;
        self.set_state(ConnectionState::Connecting);
        info!(url = %self.config.url, "Connecting");

        match self.open_link().await {
            Ok(stream) => {
                self.link = Some(stream);
                self.keepalive.reset();
                let generation = self.subscriptions.begin_generation();
                self.set_state(ConnectionState::Connected);
                info!(generation, "Connected");
                self.resubscribe_all().await;
            }
            Err(e) => {
                let delay_ms = self.config.reconnect_delay_ms;
                warn!(error = %e, delay_ms, "Connect failed, retrying after delay");
                self.set_state(ConnectionState::Disconnected);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                        self.request_reconnect(e.reason());
                    }
                    () = self.shutdown_token.cancelled() => {
                        info!("Shutdown requested during reconnect delay");
                    }
                }
            }
        }
    }

    async fn open_link(&self) -> WsResult<WsStream> {
        let timeout_ms = self.config.write_timeout_ms;
        let connect = connect_async_tls_with_config(self.config.url.as_str(), None, true, None);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), connect).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(WsError::ConnectionFailed(e.to_string())),
            Err(_) => Err(WsError::ConnectionFailed(format!(
                "handshake timed out after {timeout_ms} ms"
            ))),
        }
    }

    async fn close_link(&mut self) {
        if let Some(mut stream) = self.link.take() {
            let timeout = Duration::from_millis(self.config.write_timeout_ms);
            match tokio::time::timeout(timeout, stream.send(Message::Close(None))).await {
                Ok(Ok(())) => debug!("Close frame sent"),
                Ok(Err(e)) => debug!(error = %e, "Close frame not sent"),
                Err(_) => debug!("Close frame timed out"),
            }
        }
    }

    /// Drop the link after a transport failure and schedule a reconnect.
    fn fail_link(&mut self, err: WsError) {
        if self.link.take().is_some() {
            self.reconnect_count += 1;
        }
        warn!(error = %err, reason = err.reason(), "Connection lost");
        self.set_state(ConnectionState::Disconnected);
        self.request_reconnect(err.reason());
    }

    /// Send one subscription request per tracked instrument.
    async fn resubscribe_all(&mut self) {
        let instruments: Vec<Instrument> = self.subscriptions.tracked().cloned().collect();
        if instruments.is_empty() {
            return;
        }
        info!(count = instruments.len(), "Subscribing tracked instruments");

        for instrument in &instruments {
            if let Err(e) = self.send_subscribe(instrument).await {
                self.fail_link(e);
                return;
            }
        }
    }

    async fn send_subscribe(&mut self, instrument: &Instrument) -> WsResult<()> {
        let request = self.subscriptions.register_request(instrument);
        self.send_frame(&request).await?;
        debug!(instrument = %instrument, id = %request.id, topic = %request.sub, "Subscribe sent");
        Ok(())
    }

    async fn send_frame<T: Serialize>(&mut self, frame: &T) -> WsResult<()> {
        let text = to_text(frame)?;
        self.send_message(Message::Text(text)).await
    }

    async fn send_message(&mut self, message: Message) -> WsResult<()> {
        let timeout_ms = self.config.write_timeout_ms;
        let link = self.link.as_mut().ok_or(WsError::NotConnected)?;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), link.send(message)).await {
            Ok(result) => result.map_err(WsError::from),
            Err(_) => Err(WsError::WriteTimeout(timeout_ms)),
        }
    }

    async fn send_keepalive(&mut self) {
        if self.link.is_none() {
            return;
        }
        match self.send_frame(&PingFrame::now()).await {
            Ok(()) => {
                self.keepalive.record_ping();
                trace!("Keepalive ping sent");
            }
            Err(e) => self.fail_link(e),
        }
    }

    fn on_stalled(&mut self) {
        if self.keepalive.is_stalled(Instant::now()) {
            let stats = self.keepalive.stats();
            warn!(
                pings_sent = stats.pings_sent,
                since_last_message_ms = stats.since_last_message.as_millis() as u64,
                since_last_pong_ms = ?stats.since_last_pong.map(|d| d.as_millis() as u64),
                "Feed stalled"
            );
            let timeout_ms = self.config.inactivity_timeout_ms;
            self.fail_link(WsError::Stalled(timeout_ms));
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Subscribe(instrument) => self.subscribe(instrument).await,
            SessionCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn subscribe(&mut self, instrument: Instrument) {
        if self.subscriptions.track(instrument.clone()) {
            info!(instrument = %instrument, "Tracking instrument");
        }
        self.ensure_handler(&instrument);

        if self.link.is_none() {
            debug!(instrument = %instrument, "Not connected, subscribing on next connect");
            return;
        }
        if self.subscriptions.has_live_subscription(&instrument) {
            debug!(instrument = %instrument, "Already subscribed on this connection");
            return;
        }
        if let Err(e) = self.send_subscribe(&instrument).await {
            self.fail_link(e);
        }
    }

    /// Lazily spawn the instrument's update handler; never more than one.
    fn ensure_handler(&mut self, instrument: &Instrument) {
        if self.handlers.contains_key(instrument) {
            return;
        }
        let handle = spawn_update_handler(
            instrument.clone(),
            &self.handler_config,
            self.events_tx.clone(),
            self.shutdown_token.child_token(),
        );
        self.handlers.insert(instrument.clone(), handle);
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state(),
            generation: self.subscriptions.generation(),
            tracked: self.subscriptions.tracked().cloned().collect(),
            pending_acks: self.subscriptions.pending_count(),
            channels: self.subscriptions.channels(),
            handlers: self.handlers.len(),
            reconnects: self.reconnect_count,
        }
    }

    async fn teardown(&mut self) {
        info!("Session shutting down");
        self.close_link().await;
        for handle in self.handlers.values() {
            handle.stop();
        }
        self.handlers.clear();
        self.set_state(ConnectionState::Closed);
        info!(
            generation = self.subscriptions.generation(),
            reconnects = self.reconnect_count,
            "Session closed"
        );
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_frame(link: &mut Option<WsStream>) -> Option<Result<Message, tungstenite::Error>> {
    match link {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
