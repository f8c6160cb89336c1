//! Per-candle volume profile.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tickbar_types::Side;

/// Volume traded at one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Total volume at this level.
    pub volume: Decimal,
    /// Buyer-initiated volume (zero unless side tracking is enabled).
    pub buy_volume: Decimal,
    /// Seller-initiated volume (zero unless side tracking is enabled).
    pub sell_volume: Decimal,
}

impl PriceLevel {
    /// Returns buy volume minus sell volume.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.buy_volume - self.sell_volume
    }
}

/// Distribution of traded volume across price levels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeProfile {
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl VolumeProfile {
    /// Returns the level for `price`, if any volume traded there.
    #[must_use]
    pub fn level(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// Iterates levels in ascending price order.
    pub fn iter(&self) -> impl Iterator<Item = (&Decimal, &PriceLevel)> {
        self.levels.iter()
    }

    /// Returns the number of distinct levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if no volume has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns the sum of volume over all levels.
    #[must_use]
    pub fn total_volume(&self) -> Decimal {
        self.levels.values().map(|l| l.volume).sum()
    }

    /// Returns the level with the most volume (the point of control).
    ///
    /// Ties resolve to the lowest price.
    #[must_use]
    pub fn point_of_control(&self) -> Option<Decimal> {
        let mut best: Option<(Decimal, Decimal)> = None;
        for (price, level) in &self.levels {
            match best {
                Some((_, volume)) if level.volume <= volume => {}
                _ => best = Some((*price, level.volume)),
            }
        }
        best.map(|(price, _)| price)
    }

    /// Returns the `(low, high)` price band around the point of control that
    /// holds at least `fraction` of the total volume.
    ///
    /// The band grows one level at a time toward the side with more volume,
    /// preferring the upper side on ties. `fraction` is clamped to `[0, 1]`.
    #[must_use]
    pub fn value_area(&self, fraction: Decimal) -> Option<(Decimal, Decimal)> {
        let poc = self.point_of_control()?;
        let prices: Vec<Decimal> = self.levels.keys().copied().collect();
        let volumes: Vec<Decimal> = self.levels.values().map(|l| l.volume).collect();
        let target = self.total_volume() * fraction.clamp(Decimal::ZERO, Decimal::ONE);

        let mut lo = prices.binary_search(&poc).ok()?;
        let mut hi = lo;
        let mut covered = volumes[lo];
        while covered < target && (lo > 0 || hi + 1 < prices.len()) {
            let below = if lo > 0 { Some(volumes[lo - 1]) } else { None };
            let above = volumes.get(hi + 1).copied();
            match (below, above) {
                (Some(b), Some(a)) if b > a => {
                    lo -= 1;
                    covered += b;
                }
                (_, Some(a)) => {
                    hi += 1;
                    covered += a;
                }
                (Some(b), None) => {
                    lo -= 1;
                    covered += b;
                }
                (None, None) => break,
            }
        }
        Some((prices[lo], prices[hi]))
    }
}

/// Builds the [`VolumeProfile`] of a single candle.
///
/// A fresh accumulator is created for every candle and moved into it; the
/// candle is its only owner from then on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeProfileAccumulator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<Decimal>,
    #[serde(default)]
    track_sides: bool,
    profile: VolumeProfile,
}

impl VolumeProfileAccumulator {
    /// Creates an empty accumulator keyed by raw traded price.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantizes levels to the nearest multiple of `step`.
    ///
    /// Non-positive steps are ignored.
    #[must_use]
    pub fn with_step(mut self, step: Option<Decimal>) -> Self {
        self.step = step.filter(|s| *s > Decimal::ZERO);
        self
    }

    /// Enables buy/sell sub-buckets.
    #[must_use]
    pub const fn with_sides(mut self, track_sides: bool) -> Self {
        self.track_sides = track_sides;
        self
    }

    /// Returns the configured price step.
    #[must_use]
    pub const fn step(&self) -> Option<Decimal> {
        self.step
    }

    /// Returns an empty accumulator with the same configuration.
    #[must_use]
    pub fn fresh(&self) -> Self {
        Self {
            step: self.step,
            track_sides: self.track_sides,
            profile: VolumeProfile::default(),
        }
    }

    /// Returns the level a price is recorded under.
    #[must_use]
    pub fn level_for(&self, price: Decimal) -> Decimal {
        match self.step {
            Some(step) => ((price / step).round() * step).normalize(),
            None => price.normalize(),
        }
    }

    /// Adds `volume` traded at `price`.
    ///
    /// Callers reject non-positive volume before calling.
    pub fn update(&mut self, price: Decimal, volume: Decimal, side: Side) {
        debug_assert!(volume > Decimal::ZERO, "volume must be positive");
        let key = self.level_for(price);
        let level = self.profile.levels.entry(key).or_default();
        level.volume += volume;
        if self.track_sides {
            match side {
                Side::Buy => level.buy_volume += volume,
                Side::Sell => level.sell_volume += volume,
                Side::Unknown => {}
            }
        }
    }

    /// Returns the current profile.
    #[must_use]
    pub const fn snapshot(&self) -> &VolumeProfile {
        &self.profile
    }

    /// Consumes the accumulator, returning the profile.
    #[must_use]
    pub fn into_profile(self) -> VolumeProfile {
        self.profile
    }
}
