//! Benchmark utilities for tickbar.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tickbar_lib::{Candle, CandleSink, RandomWalk, Tick};

/// Candle sink that drops every snapshot.
///
/// Isolates builder cost from staging cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CandleSink for NullSink {
    fn stage(&self, candle: Candle) {
        std::hint::black_box(candle);
    }

    fn withdraw(&self, open_time: DateTime<Utc>) {
        std::hint::black_box(open_time);
    }
}

/// Start of every generated feed: a Tuesday at midnight UTC.
#[must_use]
pub fn feed_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Generates `count` random-walk ticks spaced `spacing` apart.
#[must_use]
pub fn synthetic_ticks(count: usize, spacing: TimeDelta, seed: u64) -> Vec<Tick> {
    RandomWalk::new(feed_start(), Decimal::from(100), Decimal::new(1, 2))
        .map(|walk| walk.with_seed(seed).with_spacing(spacing).take(count).collect())
        .unwrap_or_default()
}

/// Ticks per second for `ticks` processed in `elapsed`.
#[must_use]
pub fn ticks_per_sec(ticks: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { ticks as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_ticks() {
        let ticks = synthetic_ticks(100, TimeDelta::milliseconds(250), 1);
        assert_eq!(ticks.len(), 100);
        assert_eq!(ticks[99].time - ticks[0].time, TimeDelta::milliseconds(250 * 99));
    }

    #[test]
    fn test_ticks_per_sec() {
        assert!((ticks_per_sec(1000, Duration::from_millis(500)) - 2000.0).abs() < f64::EPSILON);
        assert!(ticks_per_sec(1000, Duration::ZERO).abs() < f64::EPSILON);
    }
}
