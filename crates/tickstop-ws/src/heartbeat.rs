//! Keepalive bookkeeping for the streaming connection.
//!
//! Tracks when data last arrived and the ping/pong exchange. The
//! connection manager sends a ping on every keepalive tick and treats a
//! read gap longer than the inactivity timeout as a stalled feed.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct Keepalive {
    ping_interval: Duration,
    inactivity_timeout: Duration,
    last_message: Instant,
    last_ping: Option<Instant>,
    last_pong: Option<Instant>,
    pings_sent: u64,
}

impl Keepalive {
    pub fn new(ping_interval: Duration, inactivity_timeout: Duration) -> Self {
        Self {
            ping_interval,
            inactivity_timeout,
            last_message: Instant::now(),
            last_ping: None,
            last_pong: None,
            pings_sent: 0,
        }
    }

    /// Reset on a fresh connection.
    pub fn reset(&mut self) {
        self.last_message = Instant::now();
        self.last_ping = None;
        self.last_pong = None;
    }

    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    /// Any inbound frame proves the connection is alive.
    pub fn record_message(&mut self) {
        self.last_message = Instant::now();
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
        self.pings_sent += 1;
    }

    pub fn record_pong(&mut self) {
        let now = Instant::now();
        self.last_pong = Some(now);
        if let Some(ping) = self.last_ping {
            debug!(rtt_ms = now.saturating_duration_since(ping).as_millis() as u64, "Pong received");
        }
    }

    /// Instant after which the feed counts as stalled.
    pub fn read_deadline(&self) -> Instant {
        self.last_message + self.inactivity_timeout
    }

    pub fn is_stalled(&self, now: Instant) -> bool {
        now >= self.read_deadline()
    }

    pub fn stats(&self) -> KeepaliveStats {
        let now = Instant::now();
        KeepaliveStats {
            pings_sent: self.pings_sent,
            since_last_message: now.saturating_duration_since(self.last_message),
            since_last_pong: self
                .last_pong
                .map(|pong| now.saturating_duration_since(pong)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveStats {
    pub pings_sent: u64,
    pub since_last_message: Duration,
    pub since_last_pong: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stall_after_inactivity_timeout() {
        let keepalive = Keepalive::new(Duration::from_secs(5), Duration::from_secs(30));
        assert!(!keepalive.is_stalled(Instant::now()));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(keepalive.is_stalled(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_pushes_deadline() {
        let mut keepalive = Keepalive::new(Duration::from_secs(5), Duration::from_secs(30));
        tokio::time::advance(Duration::from_secs(20)).await;
        keepalive.record_message();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert!(!keepalive.is_stalled(Instant::now()));
        assert_eq!(keepalive.stats().since_last_message, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_pong_stats() {
        let mut keepalive = Keepalive::new(Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(keepalive.stats().since_last_pong, None);

        keepalive.record_ping();
        keepalive.record_pong();
        keepalive.reset();

        let stats = keepalive.stats();
        assert_eq!(stats.pings_sent, 1);
        assert_eq!(stats.since_last_pong, None);
    }
}
