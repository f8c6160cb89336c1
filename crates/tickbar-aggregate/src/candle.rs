//! Time-frame candle data structure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickbar_types::{InstrumentRef, Timeframe, Window};

use crate::{VolumeProfile, VolumeProfileAccumulator};

/// Lifecycle state of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleState {
    /// Still receiving ticks.
    Building,
    /// Window closed; immutable from now on.
    Finished,
}

impl CandleState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for CandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// OHLCV candle with its volume profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Instrument the candle belongs to.
    pub instrument: InstrumentRef,
    /// Window width.
    pub timeframe: Timeframe,
    /// Window start (inclusive).
    pub open_time: DateTime<Utc>,
    /// Window end (exclusive).
    pub close_time: DateTime<Utc>,
    /// First traded price in the window.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Last traded price.
    pub close: Decimal,
    /// Sum of tick volumes.
    pub total_volume: Decimal,
    /// Number of ticks ingested.
    pub tick_count: u32,
    /// Lifecycle state.
    pub state: CandleState,
    pub(crate) price_levels: VolumeProfileAccumulator,
}

impl Candle {
    /// Opens a `Building` candle for `window` seeded with the first price.
    ///
    /// Volume starts at zero; the opening tick is applied separately. The
    /// accumulator is moved in and owned by the candle from here on.
    #[must_use]
    pub fn open(
        instrument: InstrumentRef,
        timeframe: Timeframe,
        window: Window,
        price: Decimal,
        price_levels: VolumeProfileAccumulator,
    ) -> Self {
        Self {
            instrument,
            timeframe,
            open_time: window.open,
            close_time: window.close,
            open: price,
            high: price,
            low: price,
            close: price,
            total_volume: Decimal::ZERO,
            tick_count: 0,
            state: CandleState::Building,
            price_levels,
        }
    }

    /// Returns the candle's window.
    #[must_use]
    pub const fn window(&self) -> Window {
        Window::new(self.open_time, self.close_time)
    }

    /// Returns the volume profile.
    #[must_use]
    pub const fn price_levels(&self) -> &VolumeProfile {
        self.price_levels.snapshot()
    }

    /// Returns true once the window has closed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == CandleState::Finished
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) candle.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) candle.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns the typical price ((high + low + close) / 3).
    #[must_use]
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }
}
