//! Staging area between the candle builder and the dispatcher.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tickbar_aggregate::{Candle, CandleSink};

/// Thread-safe map of the latest candle snapshot per window.
///
/// The producer upserts snapshots keyed by `open_time`; the consumer drains
/// them all at once. The lock is held only for a single upsert or for the
/// swap-out of the whole map, never across tick processing.
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    staged: Mutex<BTreeMap<DateTime<Utc>, Candle>>,
}

impl UpdateBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `candle`, replacing any snapshot with the same `open_time`.
    pub fn stage(&self, candle: Candle) {
        self.lock().insert(candle.open_time, candle);
    }

    /// Removes the snapshot staged for `open_time`, if any.
    pub fn withdraw(&self, open_time: DateTime<Utc>) -> Option<Candle> {
        self.lock().remove(&open_time)
    }

    /// Removes and returns every staged snapshot in `open_time` order.
    ///
    /// Snapshots staged concurrently with a drain land in this drain or in
    /// the next one.
    #[must_use]
    pub fn drain(&self) -> Vec<Candle> {
        let staged = std::mem::take(&mut *self.lock());
        staged.into_values().collect()
    }

    /// Returns the number of staged windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are whole snapshots, so a panic elsewhere cannot leave one half-written.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<DateTime<Utc>, Candle>> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CandleSink for UpdateBuffer {
    fn stage(&self, candle: Candle) {
        Self::stage(self, candle);
    }

    fn withdraw(&self, open_time: DateTime<Utc>) {
        Self::withdraw(self, open_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tickbar_aggregate::{CandleBuilder, VolumeProfileAccumulator};
    use tickbar_types::{Side, Tick, Timeframe, TradingSession, Window};

    fn candle(minute: i64, close: Decimal) -> Candle {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let open = base + TimeDelta::minutes(minute);
        let mut candle = Candle::open(
            "SBER@TEST".parse().unwrap(),
            Timeframe::Minute1,
            Window::new(open, open + TimeDelta::minutes(1)),
            dec!(100),
            VolumeProfileAccumulator::new(),
        );
        candle.close = close;
        candle
    }

    #[test]
    fn test_same_window_deduplicated() {
        let buffer = UpdateBuffer::new();
        buffer.stage(candle(0, dec!(101)));
        buffer.stage(candle(0, dec!(102)));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0], candle(0, dec!(102)));
    }

    #[test]
    fn test_drain_is_ordered() {
        let buffer = UpdateBuffer::new();
        buffer.stage(candle(3, dec!(1)));
        buffer.stage(candle(1, dec!(1)));
        buffer.stage(candle(2, dec!(1)));

        let opens: Vec<_> = buffer.drain().iter().map(|c| c.open_time).collect();
        let mut sorted = opens.clone();
        sorted.sort();
        assert_eq!(opens, sorted);
        assert_eq!(opens.len(), 3);
    }

    #[test]
    fn test_second_drain_empty() {
        let buffer = UpdateBuffer::new();
        buffer.stage(candle(0, dec!(1)));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.drain().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_withdraw_removes_one_window() {
        let buffer = UpdateBuffer::new();
        buffer.stage(candle(0, dec!(1)));
        buffer.stage(candle(1, dec!(2)));

        let removed = buffer.withdraw(candle(1, dec!(0)).open_time).unwrap();
        assert_eq!(removed.close, dec!(2));
        assert!(buffer.withdraw(removed.open_time).is_none());
        assert_eq!(buffer.drain(), vec![candle(0, dec!(1))]);
    }

    #[test]
    fn test_discarded_candle_never_reaches_drain() {
        let buffer = Arc::new(UpdateBuffer::new());
        let mut builder = CandleBuilder::new(
            "SBER@TEST".parse().unwrap(),
            Timeframe::Minute1,
            TradingSession::around_the_clock(),
            Arc::clone(&buffer),
        );
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        builder
            .ingest(&Tick::new(base + TimeDelta::seconds(5), dec!(100), dec!(1), Side::Buy))
            .unwrap();
        builder
            .ingest(&Tick::new(base + TimeDelta::seconds(65), dec!(101), dec!(1), Side::Buy))
            .unwrap();
        assert_eq!(buffer.len(), 2);

        builder.discard();
        let drained = buffer.drain();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_finished());
        assert_eq!(drained[0].open_time, base);
    }

    #[test]
    fn test_concurrent_stage_and_drain() {
        let buffer = Arc::new(UpdateBuffer::new());
        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for minute in 0..50 {
                    for step in 1..=20 {
                        buffer.stage(candle(minute, Decimal::from(step)));
                    }
                }
            })
        };

        let mut seen = BTreeMap::new();
        while !producer.is_finished() {
            for c in buffer.drain() {
                seen.insert(c.open_time, c.close);
            }
        }
        producer.join().unwrap();
        for c in buffer.drain() {
            seen.insert(c.open_time, c.close);
        }

        // The latest snapshot of every window survives the hand-off.
        assert_eq!(seen.len(), 50);
        assert!(seen.values().all(|close| *close == dec!(20)));
    }
}
