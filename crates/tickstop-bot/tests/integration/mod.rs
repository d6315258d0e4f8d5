//! Integration tests for tickstop-bot.
//!
//! These tests verify the interaction between components:
//! - WebSocket connection lifecycle against a mock venue
//! - Subscription acks, depth routing and reconnects
//! - End-to-end trigger firing

pub mod common;
