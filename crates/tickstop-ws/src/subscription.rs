//! Subscription bookkeeping.
//!
//! Three maps, all owned by the dispatcher task:
//! - tracked instruments: what the caller asked for; survives reconnects
//! - pending requests: request id -> instrument, awaiting ack
//! - channels: acknowledged server channel -> instrument
//!
//! Pending requests and channels belong to one connection generation and
//! are cleared when a new connection is established. The tracked set is
//! replayed to rebuild them.

use crate::message::SubscribeRequest;
use std::collections::{BTreeSet, HashMap};
use tickstop_core::Instrument;

/// Result of matching an ack against pending requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// Channel recorded for this instrument.
    Acknowledged(Instrument),
    /// No pending request with this id in the current generation.
    UnknownRequest,
}

#[derive(Debug, Default)]
pub struct SubscriptionBook {
    tracked: BTreeSet<Instrument>,
    pending: HashMap<String, Instrument>,
    channels: HashMap<String, Instrument>,
    next_request_id: u64,
    generation: u64,
}

impl SubscriptionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an instrument. Returns `false` if already tracked.
    pub fn track(&mut self, instrument: Instrument) -> bool {
        self.tracked.insert(instrument)
    }

    pub fn is_tracked(&self, instrument: &Instrument) -> bool {
        self.tracked.contains(instrument)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Instrument> {
        self.tracked.iter()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// A request is in flight or acknowledged for this instrument in the
    /// current generation.
    pub fn has_live_subscription(&self, instrument: &Instrument) -> bool {
        self.pending.values().any(|i| i == instrument)
            || self.channels.values().any(|i| i == instrument)
    }

    /// Allocate a request id and record it as pending.
    ///
    /// Ids take the form `id_<symbol>_<n>` with `n` unique for the
    /// session, so an ack from an earlier connection can never match.
    pub fn register_request(&mut self, instrument: &Instrument) -> SubscribeRequest {
        self.next_request_id += 1;
        let id = format!("id_{}_{}", instrument.venue_symbol(), self.next_request_id);
        self.pending.insert(id.clone(), instrument.clone());
        SubscribeRequest::new(instrument.depth_channel(), id)
    }

    /// Match an ack to its request and bind the server channel.
    pub fn acknowledge(&mut self, request_id: Option<&str>, channel: &str) -> AckOutcome {
        let Some(instrument) = request_id.and_then(|id| self.pending.remove(id)) else {
            return AckOutcome::UnknownRequest;
        };
        if !self.tracked.contains(&instrument) {
            return AckOutcome::UnknownRequest;
        }
        self.channels.insert(channel.to_string(), instrument.clone());
        AckOutcome::Acknowledged(instrument)
    }

    /// Drop a pending request the venue rejected, so a later subscribe
    /// command can retry it.
    pub fn reject(&mut self, request_id: &str) -> Option<Instrument> {
        self.pending.remove(request_id)
    }

    /// Instrument bound to an acknowledged channel.
    pub fn resolve_channel(&self, channel: &str) -> Option<&Instrument> {
        self.channels.get(channel)
    }

    /// Start a new connection generation: forget every request id and
    /// channel from the previous connection.
    pub fn begin_generation(&mut self) -> u64 {
        self.pending.clear();
        self.channels.clear();
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Acknowledged channels, sorted by name.
    pub fn channels(&self) -> Vec<(String, Instrument)> {
        let mut channels: Vec<_> = self
            .channels
            .iter()
            .map(|(ch, i)| (ch.clone(), i.clone()))
            .collect();
        channels.sort();
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(s: &str) -> Instrument {
        s.parse().unwrap()
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut book = SubscriptionBook::new();
        assert!(book.track(instrument("zrx_btc")));
        assert!(!book.track(instrument("ZRX_BTC")));
        assert_eq!(book.tracked_count(), 1);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut book = SubscriptionBook::new();
        let zrx = instrument("zrx_btc");
        book.track(zrx.clone());

        let first = book.register_request(&zrx);
        let second = book.register_request(&zrx);

        assert_eq!(first.id, "id_zrxbtc_1");
        assert_eq!(second.id, "id_zrxbtc_2");
        assert_eq!(first.sub, "market.zrxbtc.depth.step0");
    }

    #[test]
    fn test_ack_binds_channel() {
        let mut book = SubscriptionBook::new();
        let zrx = instrument("zrx_btc");
        book.track(zrx.clone());
        let req = book.register_request(&zrx);

        assert!(book.resolve_channel(&req.sub).is_none());
        assert!(book.has_live_subscription(&zrx));

        let outcome = book.acknowledge(Some(&req.id), &req.sub);
        assert_eq!(outcome, AckOutcome::Acknowledged(zrx.clone()));
        assert_eq!(book.resolve_channel(&req.sub), Some(&zrx));
        assert_eq!(book.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_ack_is_unknown() {
        let mut book = SubscriptionBook::new();
        let zrx = instrument("zrx_btc");
        book.track(zrx.clone());
        let req = book.register_request(&zrx);

        book.acknowledge(Some(&req.id), &req.sub);
        assert_eq!(
            book.acknowledge(Some(&req.id), &req.sub),
            AckOutcome::UnknownRequest
        );
        assert_eq!(book.acknowledge(None, &req.sub), AckOutcome::UnknownRequest);
    }

    #[test]
    fn test_new_generation_invalidates_old_acks() {
        let mut book = SubscriptionBook::new();
        let zrx = instrument("zrx_btc");
        book.track(zrx.clone());
        let old = book.register_request(&zrx);
        book.acknowledge(Some(&old.id), &old.sub);

        let stale = book.register_request(&zrx);
        assert_eq!(book.begin_generation(), 1);

        assert!(book.resolve_channel(&old.sub).is_none());
        assert!(!book.has_live_subscription(&zrx));
        assert!(book.is_tracked(&zrx));
        assert_eq!(
            book.acknowledge(Some(&stale.id), &stale.sub),
            AckOutcome::UnknownRequest
        );
    }

    #[test]
    fn test_reject_clears_pending() {
        let mut book = SubscriptionBook::new();
        let zrx = instrument("zrx_btc");
        book.track(zrx.clone());
        let req = book.register_request(&zrx);

        assert_eq!(book.reject(&req.id), Some(zrx.clone()));
        assert!(!book.has_live_subscription(&zrx));
    }

    #[test]
    fn test_bcc_alias_in_request() {
        let mut book = SubscriptionBook::new();
        let bcc = instrument("bcc_btc");
        book.track(bcc.clone());
        let req = book.register_request(&bcc);
        assert_eq!(req.sub, "market.bchbtc.depth.step0");
        assert!(req.id.starts_with("id_bchbtc_"));
    }
}
