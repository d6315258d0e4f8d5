//! tickstop: depth-feed stop-limit trigger.
//!
//! Wires the components together:
//! - CLI and TOML configuration
//! - Signed REST account lookup and order placement
//! - The depth-feed session (connection, dispatcher, update handlers)
//! - The decision loop that fires exactly one limit order

pub mod app;
pub mod config;
pub mod error;
pub mod trigger;

pub use app::Application;
pub use config::{AppConfig, CliArgs, ConnectionSettings, Credentials, TriggerParams, WsSettings};
pub use error::{AppError, AppResult};
pub use trigger::{StopRule, StopTrigger, TriggerOutcome};
