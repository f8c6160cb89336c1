//! Streaming tick-to-candle builder.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tickbar_types::{IngestError, InstrumentRef, Result, Tick, Timeframe};
use tracing::{debug, trace};

use crate::{BoundaryResolver, Candle, CandleState, VolumeProfileAccumulator};

/// Receives candle snapshots from a [`CandleBuilder`].
///
/// A snapshot staged for an `open_time` supersedes any earlier snapshot for
/// the same window.
pub trait CandleSink {
    /// Stages a snapshot of `candle`.
    fn stage(&self, candle: Candle);

    /// Removes the pending snapshot for the window opened at `open_time`.
    ///
    /// Called when a building candle is discarded; a snapshot already handed
    /// downstream cannot be recalled.
    fn withdraw(&self, open_time: DateTime<Utc>);
}

impl<S: CandleSink + ?Sized> CandleSink for &S {
    fn stage(&self, candle: Candle) {
        (**self).stage(candle);
    }

    fn withdraw(&self, open_time: DateTime<Utc>) {
        (**self).withdraw(open_time);
    }
}

impl<S: CandleSink + ?Sized> CandleSink for Arc<S> {
    fn stage(&self, candle: Candle) {
        (**self).stage(candle);
    }

    fn withdraw(&self, open_time: DateTime<Utc>) {
        (**self).withdraw(open_time);
    }
}

/// What a single ingested tick did to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    /// The first candle was opened.
    Opened,
    /// The active candle was updated in place.
    Updated,
    /// The active candle was finished and a new one opened.
    Rolled {
        /// Open time of the candle that was finished.
        finished: DateTime<Utc>,
    },
}

/// Builds candles for one (instrument, timeframe) pair.
///
/// At most one candle is `Building` at a time. Every ingested tick stages a
/// snapshot of the active candle into the sink, and a candle is staged one
/// last time as `Finished` when a tick at or past its close arrives.
#[derive(Debug)]
pub struct CandleBuilder<R, S> {
    instrument: InstrumentRef,
    timeframe: Timeframe,
    resolver: R,
    sink: S,
    profile: VolumeProfileAccumulator,
    active: Option<Candle>,
    last_close: Option<Decimal>,
}

impl<R: BoundaryResolver, S: CandleSink> CandleBuilder<R, S> {
    /// Creates a builder with no active candle.
    #[must_use]
    pub fn new(instrument: InstrumentRef, timeframe: Timeframe, resolver: R, sink: S) -> Self {
        Self {
            instrument,
            timeframe,
            resolver,
            sink,
            profile: VolumeProfileAccumulator::new(),
            active: None,
            last_close: None,
        }
    }

    /// Sets the accumulator configuration each new candle's profile starts from.
    #[must_use]
    pub fn with_profile(mut self, profile: VolumeProfileAccumulator) -> Self {
        self.profile = profile.fresh();
        self
    }

    /// Returns the instrument being built.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentRef {
        &self.instrument
    }

    /// Returns the timeframe being built.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the candle currently being built.
    #[must_use]
    pub const fn active(&self) -> Option<&Candle> {
        self.active.as_ref()
    }

    /// Returns the close of the most recently finished candle.
    ///
    /// New candles always open at their first tick's price; this value is
    /// only kept for consumers that want continuity between candles.
    #[must_use]
    pub const fn last_close(&self) -> Option<Decimal> {
        self.last_close
    }

    /// Returns the sink candles are staged into.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Applies a tick.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidTick`] for non-positive price or volume.
    /// - [`IngestError::OutOfOrderTick`] if the tick precedes the active
    ///   window's open.
    /// - [`IngestError::Boundary`] if no window can be resolved for it.
    ///
    /// The builder is left untouched whenever an error is returned.
    pub fn ingest(&mut self, tick: &Tick) -> Result<IngestStep> {
        tick.validate().map_err(|reason| IngestError::InvalidTick {
            time: tick.time,
            reason,
        })?;

        let mut step = IngestStep::Updated;
        let candle = match self.active.take() {
            Some(active) if tick.time < active.close_time => self.active.insert(active),
            previous => {
                let window = match self.resolver.resolve(self.timeframe, tick.time) {
                    Ok(window) => window,
                    Err(err) => {
                        self.active = previous;
                        return Err(err.into());
                    }
                };
                step = match previous {
                    Some(finished) => {
                        let open_time = finished.open_time;
                        self.retire(finished);
                        IngestStep::Rolled {
                            finished: open_time,
                        }
                    }
                    None => IngestStep::Opened,
                };
                self.active.insert(Candle::open(
                    self.instrument.clone(),
                    self.timeframe,
                    window,
                    tick.price,
                    self.profile.fresh(),
                ))
            }
        };

        if tick.time < candle.open_time {
            return Err(IngestError::OutOfOrderTick {
                tick_time: tick.time,
                window_open: candle.open_time,
            });
        }

        candle.high = candle.high.max(tick.price);
        candle.low = candle.low.min(tick.price);
        candle.close = tick.price;
        candle.total_volume += tick.volume;
        candle.tick_count += 1;
        candle.price_levels.update(tick.price, tick.volume, tick.side);

        trace!(open_time = %candle.open_time, price = %tick.price, "tick applied");
        self.sink.stage(candle.clone());

        Ok(step)
    }

    /// Finishes and stages the active candle, e.g. at the end of a replay.
    ///
    /// Returns the finished candle's open time. A later tick inside the same
    /// window would open a fresh candle for it.
    pub fn finish(&mut self) -> Option<DateTime<Utc>> {
        let candle = self.active.take()?;
        let open_time = candle.open_time;
        self.retire(candle);
        Some(open_time)
    }

    /// Drops the active candle and withdraws its pending snapshot from the
    /// sink.
    ///
    /// Used when a run is cancelled or fails.
    pub fn discard(&mut self) -> Option<Candle> {
        let candle = self.active.take()?;
        self.sink.withdraw(candle.open_time);
        debug!(
            instrument = %self.instrument,
            open_time = %candle.open_time,
            ticks = candle.tick_count,
            "discarding building candle"
        );
        Some(candle)
    }

    fn retire(&mut self, mut candle: Candle) {
        candle.state = CandleState::Finished;
        self.last_close = Some(candle.close);
        debug!(
            instrument = %self.instrument,
            timeframe = %self.timeframe,
            window = %candle.window(),
            open = %candle.open,
            high = %candle.high,
            low = %candle.low,
            close = %candle.close,
            volume = %candle.total_volume,
            "candle finished"
        );
        self.sink.stage(candle);
    }
}
