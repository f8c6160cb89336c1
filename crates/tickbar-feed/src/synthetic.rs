//! Synthetic live feed.

use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, Stream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::time::Duration;
use tickbar_types::{FeedError, Side, Tick};
use tokio::time::{Interval, MissedTickBehavior};

/// Default spacing between generated ticks.
pub const DEFAULT_TICK_SPACING: TimeDelta = TimeDelta::seconds(10);

/// Seeded random-walk tick generator.
///
/// Each step moves the price by up to two and a half price steps in either
/// direction, rounded to the step and never below one step. Volumes are
/// uniform in `1..=50` and every trade is a buy.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    rng: StdRng,
    time: DateTime<Utc>,
    price: Decimal,
    step: Decimal,
    spacing: TimeDelta,
}

impl RandomWalk {
    /// Starts a walk at `price`, emitting its first tick at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Source`] if `step` is not positive.
    pub fn new(start: DateTime<Utc>, price: Decimal, step: Decimal) -> Result<Self, FeedError> {
        if step <= Decimal::ZERO {
            return Err(FeedError::Source(format!("price step must be positive, got {step}")));
        }
        Ok(Self {
            rng: StdRng::from_entropy(),
            time: start,
            price: round_to_step(price, step).max(step),
            step,
            spacing: DEFAULT_TICK_SPACING,
        })
    }

    /// Makes the walk reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Sets the time between consecutive ticks.
    #[must_use]
    pub const fn with_spacing(mut self, spacing: TimeDelta) -> Self {
        self.spacing = spacing;
        self
    }

    /// Returns the last emitted (or starting) price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Returns the time of the next tick.
    #[must_use]
    pub const fn next_time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Returns the price step.
    #[must_use]
    pub const fn step(&self) -> Decimal {
        self.step
    }
}

impl Iterator for RandomWalk {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let u: f64 = self.rng.r#gen();
        let offset = Decimal::try_from((u - 0.5) * 5.0).unwrap_or_default() * self.step;
        let price = round_to_step(self.price + offset, self.step).max(self.step);
        let volume = Decimal::from(self.rng.gen_range(1..=50u32));

        let tick = Tick::new(self.time, price, volume, Side::Buy);
        self.price = price;
        self.time += self.spacing;
        Some(tick)
    }
}

/// Rounds `price` to the nearest multiple of `step` (ties to even).
#[must_use]
pub fn round_to_step(price: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return price;
    }
    ((price / step).round() * step).normalize()
}

/// Shortest period [`live_stream`] paces at.
const MIN_PACE: Duration = Duration::from_millis(1);

/// Paces a tick source, yielding one item per `period`.
///
/// The first item is yielded immediately. Missed periods are delayed rather
/// than bursted. Periods shorter than a millisecond are raised to one. The
/// stream ends when the source does.
pub fn live_stream<I>(source: I, period: Duration) -> impl Stream<Item = I::Item>
where
    I: IntoIterator,
{
    stream::unfold(
        (source.into_iter(), None::<Interval>),
        move |(mut source, interval)| async move {
            let mut interval = interval.unwrap_or_else(|| {
                let mut interval = tokio::time::interval(period.max(MIN_PACE));
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });
            interval.tick().await;
            let item = source.next()?;
            Some((item, (source, Some(interval))))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::StreamExt;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_walk_properties() {
        let walk = RandomWalk::new(start(), dec!(100), dec!(0.25)).unwrap().with_seed(7);
        let ticks: Vec<Tick> = walk.take(1000).collect();

        for (i, tick) in ticks.iter().enumerate() {
            assert!(tick.price >= dec!(0.25));
            assert_eq!(tick.price % dec!(0.25), dec!(0));
            assert!(tick.volume >= dec!(1) && tick.volume <= dec!(50));
            assert_eq!(tick.side, Side::Buy);
            assert_eq!(tick.time, start() + TimeDelta::seconds(10 * i as i64));
        }
        for pair in ticks.windows(2) {
            assert!((pair[1].price - pair[0].price).abs() <= dec!(0.75));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a: Vec<Tick> = RandomWalk::new(start(), dec!(50), dec!(1)).unwrap().with_seed(42).take(20).collect();
        let b: Vec<Tick> = RandomWalk::new(start(), dec!(50), dec!(1)).unwrap().with_seed(42).take(20).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_price_floor() {
        let walk = RandomWalk::new(start(), dec!(0), dec!(1)).unwrap().with_seed(1);
        assert_eq!(walk.price(), dec!(1));
        assert!(walk.take(500).all(|t| t.price >= dec!(1)));
    }

    #[test]
    fn test_rejects_non_positive_step() {
        assert!(RandomWalk::new(start(), dec!(100), dec!(0)).is_err());
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(dec!(101.3), dec!(0.5)), dec!(101.5));
        assert_eq!(round_to_step(dec!(101.25), dec!(0.5)), dec!(101));
        assert_eq!(round_to_step(dec!(7), dec!(0)), dec!(7));
    }

    #[tokio::test]
    async fn test_live_stream_paces_and_ends() {
        let ticks = RandomWalk::new(start(), dec!(100), dec!(1)).unwrap().with_seed(3).take(3);
        let started = tokio::time::Instant::now();
        let out: Vec<Tick> = live_stream(ticks, Duration::from_millis(10)).collect().await;

        assert_eq!(out.len(), 3);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_live_stream_zero_period() {
        let ticks = RandomWalk::new(start(), dec!(100), dec!(1)).unwrap().with_seed(4).take(5);
        let out: Vec<Tick> = live_stream(ticks, Duration::ZERO).collect().await;
        assert_eq!(out.len(), 5);
    }
}
