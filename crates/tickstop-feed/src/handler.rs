//! Per-instrument update handler.
//!
//! Each subscribed instrument gets exactly one handler task. It consumes
//! depth snapshots in arrival order from a private bounded queue, diffs
//! each against the previous one and emits book-order events.

use crate::diff::diff;
use crate::error::{FeedError, FeedResult};
use tickstop_core::{BookOrder, BookSide, DepthTick, Instrument, DEFAULT_DEPTH};
use tickstop_telemetry::Metrics;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Default snapshot queue capacity per instrument.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Update handler configuration.
#[derive(Debug, Clone)]
pub struct UpdateHandlerConfig {
    /// Levels kept per side before diffing.
    pub depth: usize,
    /// Snapshot queue capacity.
    pub queue_capacity: usize,
}

impl Default for UpdateHandlerConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Snapshot-to-event state for one instrument.
#[derive(Debug)]
pub struct UpdateHandler {
    instrument: Instrument,
    depth: usize,
    last: DepthTick,
}

impl UpdateHandler {
    pub fn new(instrument: Instrument, depth: usize) -> Self {
        Self {
            instrument,
            depth,
            last: DepthTick::default(),
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Last truncated snapshot seen.
    pub fn last(&self) -> &DepthTick {
        &self.last
    }

    /// Diff one snapshot against the previous one.
    ///
    /// Asks are emitted before bids; within a side removals come before
    /// additions.
    pub fn process(&mut self, mut tick: DepthTick) -> Vec<BookOrder> {
        tick.truncate(self.depth);

        let mut events = Vec::new();
        for side in [BookSide::Ask, BookSide::Bid] {
            let (removed, added) = diff(self.last.side(side), tick.side(side));
            events.extend(removed.into_iter().map(|level| {
                BookOrder::new(self.instrument.clone(), side, true, level.price, level.size)
            }));
            events.extend(added.into_iter().map(|level| {
                BookOrder::new(self.instrument.clone(), side, false, level.price, level.size)
            }));
        }

        self.last = tick;
        events
    }

    /// Consume snapshots until the queue closes, the token fires or the
    /// event consumer goes away.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<DepthTick>,
        events_tx: mpsc::Sender<BookOrder>,
        token: CancellationToken,
    ) {
        let label = self.instrument.to_string();
        Metrics::handler_started();
        info!(instrument = %label, depth = self.depth, "Update handler started");

        'snapshots: loop {
            let tick = tokio::select! {
                _ = token.cancelled() => break,
                tick = rx.recv() => match tick {
                    Some(tick) => tick,
                    None => break,
                },
            };

            let version = tick.version;
            let events = self.process(tick);
            Metrics::depth_snapshot(&label, !events.is_empty());
            trace!(instrument = %label, version, events = events.len(), "Snapshot processed");

            for event in events {
                Metrics::book_event(&label, event.kind().as_str());
                tokio::select! {
                    _ = token.cancelled() => break 'snapshots,
                    sent = events_tx.send(event) => {
                        if sent.is_err() {
                            debug!(instrument = %label, "Event consumer dropped");
                            break 'snapshots;
                        }
                    }
                }
            }
        }

        Metrics::handler_stopped();
        info!(instrument = %label, "Update handler stopped");
    }
}

/// Dispatcher-side handle to a running update handler.
#[derive(Debug)]
pub struct UpdateHandle {
    instrument: Instrument,
    tx: mpsc::Sender<DepthTick>,
    token: CancellationToken,
}

impl UpdateHandle {
    /// Queue a snapshot without waiting.
    ///
    /// A full queue rejects the snapshot; the next accepted one is diffed
    /// against the last processed one.
    pub fn try_forward(&self, tick: DepthTick) -> FeedResult<()> {
        self.tx.try_send(tick).map_err(|e| match e {
            TrySendError::Full(_) => FeedError::Backlog(self.instrument.to_string()),
            TrySendError::Closed(_) => FeedError::HandlerClosed(self.instrument.to_string()),
        })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Spawn the handler task for one instrument.
///
/// `token` should be a child of the session token so that session
/// shutdown stops every handler.
pub fn spawn_update_handler(
    instrument: Instrument,
    config: &UpdateHandlerConfig,
    events_tx: mpsc::Sender<BookOrder>,
    token: CancellationToken,
) -> UpdateHandle {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    let handler = UpdateHandler::new(instrument.clone(), config.depth);
    tokio::spawn(handler.run(rx, events_tx, token.clone()));

    UpdateHandle {
        instrument,
        tx,
        token,
    }
}
