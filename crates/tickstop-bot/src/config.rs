//! Application configuration.
//!
//! Trigger parameters and credentials come from the command line. Connection
//! tuning comes from an optional TOML file; every field has a default.

use crate::error::{AppError, AppResult};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use tickstop_core::{Instrument, OrderSide, Price, Size};
use tickstop_rest::{LimitOrder, DEFAULT_REST_URL};
use tickstop_ws::connection::DEFAULT_WS_URL;
use tickstop_ws::ConnectionConfig;

/// Env var consulted when `--config` is not given.
pub const CONFIG_ENV: &str = "TICKSTOP_CONFIG";

/// Depth-feed stop-limit trigger
#[derive(Parser, Debug, Clone)]
#[command(name = "tickstop", version, about, long_about = None)]
pub struct CliArgs {
    /// API access key
    #[arg(long)]
    pub api_key: String,

    /// API secret key
    #[arg(long)]
    pub api_secret: String,

    /// Market as base_quote, e.g. zrx_btc
    #[arg(long)]
    pub market: String,

    /// Best price that fires the order
    #[arg(long)]
    pub stop_price: String,

    /// Limit price of the fired order
    #[arg(long)]
    pub limit_price: String,

    /// Order amount in base currency
    #[arg(long)]
    pub amount: String,

    /// buy or sell
    #[arg(long)]
    pub order_side: String,

    /// Connection settings file (can also be set via TICKSTOP_CONFIG env var)
    #[arg(short, long)]
    pub config: Option<String>,
}

/// API credentials.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// What to watch and what to fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerParams {
    pub instrument: Instrument,
    pub side: OrderSide,
    pub stop_price: Price,
    pub limit_price: Price,
    pub amount: Size,
}

impl TriggerParams {
    /// The order placed once the stop is reached.
    pub fn limit_order(&self) -> LimitOrder {
        LimitOrder {
            instrument: self.instrument.clone(),
            side: self.side,
            price: self.limit_price,
            amount: self.amount,
        }
    }
}

/// WebSocket tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSettings {
    #[serde(default = "default_ws_url")]
    pub url: String,
    /// Keepalive ping interval (ms). Default: 5,000.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// Read inactivity timeout (ms). Default: 1,800,000 (30 minutes).
    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
    /// Write and handshake timeout (ms). Default: 20,000.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Delay between connect attempts (ms). Default: 5,000.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Levels per side diffed from each snapshot. Default: 5.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Per-instrument snapshot queue. Default: 100.
    #[serde(default = "default_handler_queue")]
    pub handler_queue: usize,
    /// Subscribe/status command queue. Default: 1,000.
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_ping_interval_ms() -> u64 {
    5_000
}

fn default_inactivity_timeout_ms() -> u64 {
    1_800_000
}

fn default_write_timeout_ms() -> u64 {
    20_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_depth() -> usize {
    tickstop_core::DEFAULT_DEPTH
}

fn default_handler_queue() -> usize {
    100
}

fn default_command_queue() -> usize {
    1_000
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            ping_interval_ms: default_ping_interval_ms(),
            inactivity_timeout_ms: default_inactivity_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            depth: default_depth(),
            handler_queue: default_handler_queue(),
            command_queue: default_command_queue(),
        }
    }
}

impl From<WsSettings> for ConnectionConfig {
    fn from(cfg: WsSettings) -> Self {
        Self {
            url: cfg.url,
            ping_interval_ms: cfg.ping_interval_ms,
            inactivity_timeout_ms: cfg.inactivity_timeout_ms,
            write_timeout_ms: cfg.write_timeout_ms,
            reconnect_delay_ms: cfg.reconnect_delay_ms,
            depth: cfg.depth,
            handler_queue: cfg.handler_queue,
            command_queue: cfg.command_queue,
        }
    }
}

/// Everything tunable from the settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub ws: WsSettings,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Book-order event queue between handlers and the trigger. Default: 10,000.
    #[serde(default = "default_event_queue")]
    pub event_queue: usize,
    /// Levels per side kept by the book projection. Default: 10.
    #[serde(default = "default_book_capacity")]
    pub book_capacity: usize,
}

fn default_rest_url() -> String {
    DEFAULT_REST_URL.to_string()
}

fn default_event_queue() -> usize {
    10_000
}

fn default_book_capacity() -> usize {
    tickstop_feed::DEFAULT_BOOK_CAPACITY
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            ws: WsSettings::default(),
            rest_url: default_rest_url(),
            event_queue: default_event_queue(),
            book_capacity: default_book_capacity(),
        }
    }
}

impl ConnectionSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.ws.url.starts_with("ws://") || self.ws.url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "ws.url must start with ws:// or wss://, got {}",
                self.ws.url
            )));
        }
        if !(self.rest_url.starts_with("http://") || self.rest_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "rest_url must start with http:// or https://, got {}",
                self.rest_url
            )));
        }
        let counts = [
            ("ws.ping_interval_ms", self.ws.ping_interval_ms as usize),
            ("ws.inactivity_timeout_ms", self.ws.inactivity_timeout_ms as usize),
            ("ws.write_timeout_ms", self.ws.write_timeout_ms as usize),
            ("ws.reconnect_delay_ms", self.ws.reconnect_delay_ms as usize),
            ("ws.depth", self.ws.depth),
            ("ws.handler_queue", self.ws.handler_queue),
            ("ws.command_queue", self.ws.command_queue),
            ("event_queue", self.event_queue),
            ("book_capacity", self.book_capacity),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub trigger: TriggerParams,
    pub settings: ConnectionSettings,
}

impl AppConfig {
    /// Validate the command line and load connection settings.
    ///
    /// Settings path: `--config` > `env_path` > built-in defaults.
    pub fn from_cli(args: &CliArgs, env_path: Option<&str>) -> AppResult<Self> {
        let credentials = Credentials {
            api_key: non_empty("api-key", &args.api_key)?,
            api_secret: non_empty("api-secret", &args.api_secret)?,
        };

        let instrument: Instrument = args.market.parse()?;
        let side: OrderSide = args.order_side.parse()?;
        let trigger = TriggerParams {
            instrument,
            side,
            stop_price: parse_price("stop-price", &args.stop_price)?,
            limit_price: parse_price("limit-price", &args.limit_price)?,
            amount: parse_size("amount", &args.amount)?,
        };

        let settings = match args.config.as_deref().or(env_path) {
            Some(path) => ConnectionSettings::from_file(path)?,
            None => ConnectionSettings::default(),
        };

        Ok(Self {
            credentials,
            trigger,
            settings,
        })
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        self.settings.ws.clone().into()
    }
}

fn non_empty(name: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Config(format!("--{name} must not be empty")));
    }
    Ok(value.to_string())
}

fn parse_price(name: &str, value: &str) -> AppResult<Price> {
    let price: Price = value
        .parse()
        .map_err(|e| AppError::Config(format!("--{name} {value}: {e}")))?;
    if !price.is_positive() {
        return Err(AppError::Config(format!(
            "--{name} must be positive, got {value}"
        )));
    }
    Ok(price)
}

fn parse_size(name: &str, value: &str) -> AppResult<Size> {
    let size: Size = value
        .parse()
        .map_err(|e| AppError::Config(format!("--{name} {value}: {e}")))?;
    if !size.is_positive() {
        return Err(AppError::Config(format!(
            "--{name} must be positive, got {value}"
        )));
    }
    Ok(size)
}
