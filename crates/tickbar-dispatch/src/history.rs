//! Consumer-side ordered candle history.

use chrono::{DateTime, Utc};
use tickbar_aggregate::Candle;

/// Result of merging one candle into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The candle started a new window after the last one.
    Appended,
    /// The candle replaced the last entry (same window).
    Replaced,
    /// The candle was older than the last entry and was ignored.
    Dropped,
}

/// Candles ordered by strictly increasing `open_time`.
///
/// Only the last entry may change; everything before it is settled.
#[derive(Debug, Clone, Default)]
pub struct CumulativeHistory {
    candles: Vec<Candle>,
}

impl CumulativeHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            candles: Vec::new(),
        }
    }

    /// Merges a candle snapshot.
    pub fn merge(&mut self, candle: Candle) -> MergeOutcome {
        match self.candles.last_mut() {
            Some(last) if candle.open_time == last.open_time => {
                *last = candle;
                MergeOutcome::Replaced
            }
            Some(last) if candle.open_time < last.open_time => MergeOutcome::Dropped,
            _ => {
                self.candles.push(candle);
                MergeOutcome::Appended
            }
        }
    }

    /// Returns the candle opened at `open_time`.
    #[must_use]
    pub fn get(&self, open_time: DateTime<Utc>) -> Option<&Candle> {
        self.candles
            .binary_search_by_key(&open_time, |c| c.open_time)
            .ok()
            .map(|idx| &self.candles[idx])
    }

    /// Returns the most recent candle.
    #[must_use]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Returns the number of candles.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.candles.len()
    }

    /// Returns true if the history is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Iterates candles oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// Returns the candles as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    /// Consumes the history, returning the candles.
    #[must_use]
    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }
}
