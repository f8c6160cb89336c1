//! Periodic dispatch of staged candles to a renderer.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;
use tickbar_aggregate::Candle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{CumulativeHistory, MergeOutcome, UpdateBuffer};

/// Candles delivered to the renderer by one dispatcher firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchBatch {
    /// Firing sequence number, starting at 1.
    pub sequence: u64,
    /// Accepted candles in `open_time` order. A repeated `open_time` means
    /// "replace what you have".
    pub candles: Vec<Candle>,
}

/// Downstream consumer of candle updates (a chart, a writer, ...).
pub trait RenderSink {
    /// Receives one batch per firing that produced updates.
    fn render(&mut self, batch: &DispatchBatch);
}

impl<F: FnMut(&DispatchBatch)> RenderSink for F {
    fn render(&mut self, batch: &DispatchBatch) {
        self(batch);
    }
}

/// Shortest period [`Dispatcher::run`] fires at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Counters kept by a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Number of firings.
    pub firings: u64,
    /// Candles forwarded to the sink.
    pub delivered: u64,
    /// Stale candles ignored by the history merge.
    pub dropped: u64,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Period between firings, in milliseconds. Zero is rejected.
    pub flush_interval_ms: NonZeroU64,
}

impl DispatchConfig {
    /// Returns the firing period.
    #[must_use]
    pub const fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.get())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: NonZeroU64::MIN.saturating_add(99),
        }
    }
}

/// Drains an [`UpdateBuffer`] on a fixed period into a [`CumulativeHistory`]
/// and forwards what changed to a [`RenderSink`].
#[derive(Debug)]
pub struct Dispatcher<K> {
    buffer: Arc<UpdateBuffer>,
    history: CumulativeHistory,
    sink: K,
    stats: DispatchStats,
}

impl<K: RenderSink> Dispatcher<K> {
    /// Creates a dispatcher over `buffer` forwarding to `sink`.
    #[must_use]
    pub const fn new(buffer: Arc<UpdateBuffer>, sink: K) -> Self {
        Self {
            buffer,
            history: CumulativeHistory::new(),
            sink,
            stats: DispatchStats {
                firings: 0,
                delivered: 0,
                dropped: 0,
            },
        }
    }

    /// Returns the buffer being drained.
    #[must_use]
    pub const fn buffer(&self) -> &Arc<UpdateBuffer> {
        &self.buffer
    }

    /// Returns the accumulated history.
    #[must_use]
    pub const fn history(&self) -> &CumulativeHistory {
        &self.history
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub const fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Consumes the dispatcher, returning the history and the sink.
    #[must_use]
    pub fn into_parts(self) -> (CumulativeHistory, K) {
        (self.history, self.sink)
    }

    /// Drains the buffer once and forwards accepted candles as one batch.
    ///
    /// Returns the number of candles forwarded. The sink is not called when
    /// nothing was accepted.
    pub fn fire(&mut self) -> usize {
        self.stats.firings += 1;
        let drained = self.buffer.drain();
        if drained.is_empty() {
            return 0;
        }

        let mut accepted = Vec::with_capacity(drained.len());
        for candle in drained {
            match self.history.merge(candle.clone()) {
                MergeOutcome::Appended | MergeOutcome::Replaced => accepted.push(candle),
                MergeOutcome::Dropped => {
                    self.stats.dropped += 1;
                    debug!(open_time = %candle.open_time, "dropping stale candle");
                }
            }
        }
        if accepted.is_empty() {
            return 0;
        }

        let count = accepted.len();
        self.stats.delivered += count as u64;
        let batch = DispatchBatch {
            sequence: self.stats.firings,
            candles: accepted,
        };
        trace!(sequence = batch.sequence, candles = count, "dispatching batch");
        self.sink.render(&batch);
        count
    }

    /// Fires every `period` until `cancel` is triggered, then flushes once
    /// more so nothing staged before cancellation is lost.
    ///
    /// Periods shorter than a millisecond are raised to one.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) -> Self {
        let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.fire();
                }
            }
        }
        self.fire();
        debug!(
            firings = self.stats.firings,
            delivered = self.stats.delivered,
            dropped = self.stats.dropped,
            candles = self.history.len(),
            "dispatcher stopped"
        );
        self
    }
}
