//! Ingestion runs driving a [`CandleBuilder`] from a tick source.

use chrono::{DateTime, NaiveDate, Utc};
use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tickbar_aggregate::{
    BoundaryResolver, CandleBuilder, CandleSink, IngestStep, VolumeProfileAccumulator,
};
use tickbar_types::{FeedError, IngestError, Result, Tick, Timeframe};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ticks between two progress reports.
const PROGRESS_EVERY: u64 = 4096;

/// What to do with a tick that cannot be ingested.
///
/// Applies to non-positive prices and volumes and to ticks outside any
/// trading session. Out-of-order ticks and feed failures always abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidTickPolicy {
    /// Stop the run with the error.
    #[default]
    Abort,
    /// Count the tick, log it and carry on.
    Skip,
}

impl InvalidTickPolicy {
    /// Returns the policy as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for InvalidTickPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Candle width.
    pub timeframe: Timeframe,
    /// Volume profile level quantization; raw prices when unset.
    pub price_step: Option<Decimal>,
    /// Split profile levels into buy and sell volume.
    pub track_sides: bool,
    /// Handling of rejected ticks.
    pub invalid_tick_policy: InvalidTickPolicy,
    /// Finish the building candle when the source is exhausted.
    pub finish_on_end: bool,
    /// Stop after this many distinct trading days (UTC dates).
    pub max_days: Option<u32>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            price_step: None,
            track_sides: true,
            invalid_tick_policy: InvalidTickPolicy::default(),
            finish_on_end: true,
            max_days: None,
        }
    }
}

impl IngestConfig {
    /// Returns the profile accumulator every candle starts from.
    #[must_use]
    pub fn profile(&self) -> VolumeProfileAccumulator {
        VolumeProfileAccumulator::new()
            .with_step(self.price_step)
            .with_sides(self.track_sides)
    }
}

/// How an ingestion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The source was exhausted.
    Completed,
    /// The cancellation token fired; the building candle was discarded.
    Cancelled,
    /// The configured number of trading days was reached.
    DayLimit,
}

/// Counters for an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// How the run ended.
    pub outcome: IngestOutcome,
    /// Ticks pulled from the source.
    pub ticks_read: u64,
    /// Ticks applied to a candle.
    pub ticks_ingested: u64,
    /// Ticks rejected under [`InvalidTickPolicy::Skip`].
    pub ticks_skipped: u64,
    /// Candles that reached `Finished`.
    pub candles_finished: u64,
    /// Distinct trading days seen.
    pub days: u32,
    /// Time of the last ingested tick.
    pub last_time: Option<DateTime<Utc>>,
    /// Price of the last ingested tick.
    pub last_price: Option<Decimal>,
}

impl IngestSummary {
    const fn new() -> Self {
        Self {
            outcome: IngestOutcome::Completed,
            ticks_read: 0,
            ticks_ingested: 0,
            ticks_skipped: 0,
            candles_finished: 0,
            days: 0,
            last_time: None,
            last_price: None,
        }
    }
}

/// Snapshot handed to a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    /// Ticks pulled from the source so far.
    pub ticks_read: u64,
    /// Trading day currently being ingested.
    pub day: Option<NaiveDate>,
}

type ProgressFn = Box<dyn FnMut(IngestProgress) + Send>;

/// Feeds ticks from a source into a [`CandleBuilder`].
///
/// Cancellation is checked before every tick read. When a run is cancelled
/// or fails, the building candle is discarded rather than finished.
pub struct Ingestor<R, S> {
    builder: CandleBuilder<R, S>,
    policy: InvalidTickPolicy,
    finish_on_end: bool,
    max_days: Option<u32>,
    day: Option<NaiveDate>,
    summary: IngestSummary,
    progress: Option<ProgressFn>,
}

impl<R, S> std::fmt::Debug for Ingestor<R, S>
where
    CandleBuilder<R, S>: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("builder", &self.builder)
            .field("policy", &self.policy)
            .field("finish_on_end", &self.finish_on_end)
            .field("max_days", &self.max_days)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<R: BoundaryResolver, S: CandleSink> Ingestor<R, S> {
    /// Wraps a builder with the run settings from `config`.
    ///
    /// The builder's timeframe and profile are left as they are; see
    /// [`IngestConfig::profile`].
    #[must_use]
    pub const fn new(builder: CandleBuilder<R, S>, config: &IngestConfig) -> Self {
        Self {
            builder,
            policy: config.invalid_tick_policy,
            finish_on_end: config.finish_on_end,
            max_days: config.max_days,
            day: None,
            summary: IngestSummary::new(),
            progress: None,
        }
    }

    /// Registers a callback invoked on every new trading day and periodically
    /// while ticks are read.
    #[must_use]
    pub fn with_progress(mut self, progress: impl FnMut(IngestProgress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Returns the wrapped builder.
    #[must_use]
    pub const fn builder(&self) -> &CandleBuilder<R, S> {
        &self.builder
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub const fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Consumes the ingestor, returning the builder.
    #[must_use]
    pub fn into_builder(self) -> CandleBuilder<R, S> {
        self.builder
    }

    /// Ingests every tick from a blocking source.
    ///
    /// # Errors
    ///
    /// - [`IngestError::FeedFailure`] if the source yields an error.
    /// - [`IngestError::OutOfOrderTick`] on a tick before the active window.
    /// - Rejected-tick errors under [`InvalidTickPolicy::Abort`].
    pub fn run<I>(&mut self, ticks: I, cancel: &CancellationToken) -> Result<IngestSummary>
    where
        I: IntoIterator<Item = std::result::Result<Tick, FeedError>>,
    {
        let mut ticks = ticks.into_iter();
        loop {
            if cancel.is_cancelled() {
                return Ok(self.end(IngestOutcome::Cancelled));
            }
            let Some(next) = ticks.next() else {
                return Ok(self.end(IngestOutcome::Completed));
            };
            if let Some(outcome) = self.accept(next)? {
                return Ok(self.end(outcome));
            }
        }
    }

    /// Ingests ticks from an async source until it ends or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Same as [`Ingestor::run`].
    pub async fn run_stream<St>(&mut self, ticks: St, cancel: &CancellationToken) -> Result<IngestSummary>
    where
        St: Stream<Item = std::result::Result<Tick, FeedError>>,
    {
        let mut ticks = std::pin::pin!(ticks);
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(self.end(IngestOutcome::Cancelled)),
                next = ticks.next() => next,
            };
            let Some(next) = next else {
                return Ok(self.end(IngestOutcome::Completed));
            };
            if let Some(outcome) = self.accept(next)? {
                return Ok(self.end(outcome));
            }
        }
    }

    /// Applies one source item. Returns an outcome when the run should stop.
    fn accept(&mut self, next: std::result::Result<Tick, FeedError>) -> Result<Option<IngestOutcome>> {
        let tick = match next {
            Ok(tick) => tick,
            Err(err) => {
                self.builder.discard();
                return Err(IngestError::FeedFailure(err));
            }
        };
        self.summary.ticks_read += 1;

        let day = tick.time.date_naive();
        if self.day != Some(day) {
            if self.max_days.is_some_and(|max| self.summary.days >= max) {
                info!(%day, days = self.summary.days, "day limit reached");
                return Ok(Some(IngestOutcome::DayLimit));
            }
            self.day = Some(day);
            self.summary.days += 1;
            info!(%day, "ingesting trading day");
            self.report();
        } else if self.summary.ticks_read.is_multiple_of(PROGRESS_EVERY) {
            self.report();
        }

        match self.builder.ingest(&tick) {
            Ok(step) => {
                if matches!(step, IngestStep::Rolled { .. }) {
                    self.summary.candles_finished += 1;
                }
                self.summary.ticks_ingested += 1;
                self.summary.last_time = Some(tick.time);
                self.summary.last_price = Some(tick.price);
                Ok(None)
            }
            Err(err) if err.is_tick_rejection() && self.policy == InvalidTickPolicy::Skip => {
                self.summary.ticks_skipped += 1;
                warn!(error = %err, "skipping tick");
                Ok(None)
            }
            Err(err) => {
                self.builder.discard();
                Err(err)
            }
        }
    }

    fn end(&mut self, outcome: IngestOutcome) -> IngestSummary {
        match outcome {
            IngestOutcome::Cancelled => {
                self.builder.discard();
            }
            IngestOutcome::Completed | IngestOutcome::DayLimit => {
                if self.finish_on_end && self.builder.finish().is_some() {
                    self.summary.candles_finished += 1;
                }
            }
        }
        self.summary.outcome = outcome;
        self.report();
        debug!(
            outcome = ?outcome,
            read = self.summary.ticks_read,
            ingested = self.summary.ticks_ingested,
            skipped = self.summary.ticks_skipped,
            finished = self.summary.candles_finished,
            "ingestion ended"
        );
        self.summary.clone()
    }

    fn report(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress(IngestProgress {
                ticks_read: self.summary.ticks_read,
                day: self.day,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use tickbar_aggregate::{Candle, CandleState};
    use tickbar_types::{InvalidTickReason, Side, TradingSession};

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<Candle>>);

    impl CandleSink for Recorder {
        fn stage(&self, candle: Candle) {
            self.0.lock().unwrap().push(candle);
        }

        fn withdraw(&self, open_time: DateTime<Utc>) {
            self.0.lock().unwrap().retain(|c| c.open_time != open_time);
        }
    }

    impl Recorder {
        fn finished(&self) -> Vec<Candle> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.state == CandleState::Finished)
                .cloned()
                .collect()
        }
    }

    type TestIngestor = Ingestor<TradingSession, Arc<Recorder>>;

    fn ingestor(config: &IngestConfig) -> (Arc<Recorder>, TestIngestor) {
        let sink = Arc::new(Recorder::default());
        let builder = CandleBuilder::new(
            "SBER@TEST".parse().unwrap(),
            config.timeframe,
            TradingSession::around_the_clock(),
            Arc::clone(&sink),
        )
        .with_profile(config.profile());
        (sink, Ingestor::new(builder, config))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn tick(secs: i64, price: Decimal, volume: Decimal) -> std::result::Result<Tick, FeedError> {
        Ok(Tick::new(at(secs), price, volume, Side::Buy))
    }

    fn scenario() -> Vec<std::result::Result<Tick, FeedError>> {
        vec![
            tick(5, dec!(100), dec!(1)),
            tick(40, dec!(102), dec!(2)),
            tick(70, dec!(99), dec!(1)),
        ]
    }

    #[test]
    fn test_completed_run_finishes_last_candle() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let summary = ingestor.run(scenario(), &CancellationToken::new()).unwrap();

        assert_eq!(summary.outcome, IngestOutcome::Completed);
        assert_eq!(summary.ticks_read, 3);
        assert_eq!(summary.ticks_ingested, 3);
        assert_eq!(summary.candles_finished, 2);
        assert_eq!(summary.days, 1);
        assert_eq!(summary.last_price, Some(dec!(99)));
        assert_eq!(summary.last_time, Some(at(70)));

        let finished = sink.finished();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].total_volume, dec!(3));
        assert_eq!(finished[1].open, dec!(99));
        assert!(ingestor.builder().active().is_none());
    }

    #[test]
    fn test_run_without_finish_keeps_building() {
        let config = IngestConfig {
            finish_on_end: false,
            ..IngestConfig::default()
        };
        let (sink, mut ingestor) = ingestor(&config);
        let summary = ingestor.run(scenario(), &CancellationToken::new()).unwrap();

        assert_eq!(summary.candles_finished, 1);
        assert_eq!(sink.finished().len(), 1);
        assert_eq!(ingestor.builder().active().unwrap().open_time, at(60));
    }

    #[test]
    fn test_skip_policy_counts_rejected_ticks() {
        let config = IngestConfig {
            invalid_tick_policy: InvalidTickPolicy::Skip,
            ..IngestConfig::default()
        };
        let (_sink, mut ingestor) = ingestor(&config);
        let ticks = vec![
            tick(1, dec!(100), dec!(1)),
            tick(2, dec!(0), dec!(1)),
            tick(3, dec!(101), dec!(-2)),
            tick(4, dec!(101), dec!(2)),
        ];
        let summary = ingestor.run(ticks, &CancellationToken::new()).unwrap();

        assert_eq!(summary.ticks_read, 4);
        assert_eq!(summary.ticks_skipped, 2);
        assert_eq!(summary.ticks_ingested, 2);
        let profile_total: Decimal = ingestor
            .into_builder()
            .sink()
            .finished()
            .iter()
            .map(|c| c.price_levels().total_volume())
            .sum();
        assert_eq!(profile_total, dec!(3));
    }

    #[test]
    fn test_abort_policy_stops_and_discards() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let ticks = vec![tick(1, dec!(100), dec!(1)), tick(2, dec!(100), dec!(0))];
        let err = ingestor.run(ticks, &CancellationToken::new()).unwrap_err();

        assert!(matches!(
            err,
            IngestError::InvalidTick {
                reason: InvalidTickReason::NonPositiveVolume(_),
                ..
            }
        ));
        assert!(ingestor.builder().active().is_none());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_order_aborts_under_skip() {
        let config = IngestConfig {
            invalid_tick_policy: InvalidTickPolicy::Skip,
            ..IngestConfig::default()
        };
        let (_sink, mut ingestor) = ingestor(&config);
        let ticks = vec![tick(65, dec!(100), dec!(1)), tick(30, dec!(100), dec!(1))];
        let err = ingestor.run(ticks, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, IngestError::OutOfOrderTick { .. }));
    }

    #[test]
    fn test_feed_failure_discards_building_candle() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let ticks = vec![
            tick(1, dec!(100), dec!(1)),
            Err(FeedError::Parse {
                line: 3,
                message: "bad".to_string(),
            }),
            tick(2, dec!(100), dec!(1)),
        ];
        let err = ingestor.run(ticks, &CancellationToken::new()).unwrap_err();

        assert!(matches!(err, IngestError::FeedFailure(FeedError::Parse { line: 3, .. })));
        assert!(ingestor.builder().active().is_none());
        // The building snapshot staged by the first tick is withdrawn too.
        assert!(sink.0.lock().unwrap().is_empty());
        assert_eq!(ingestor.summary().ticks_read, 1);
    }

    #[test]
    fn test_cancellation_discards_building_candle() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let ticks = scenario().into_iter().enumerate().map(move |(i, t)| {
            if i == 1 {
                trigger.cancel();
            }
            t
        });
        let summary = ingestor.run(ticks, &cancel).unwrap();

        assert_eq!(summary.outcome, IngestOutcome::Cancelled);
        assert_eq!(summary.ticks_read, 2);
        assert_eq!(summary.candles_finished, 0);
        assert!(ingestor.builder().active().is_none());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_day_limit() {
        let config = IngestConfig {
            max_days: Some(2),
            ..IngestConfig::default()
        };
        let (_sink, mut ingestor) = ingestor(&config);
        let day = 86_400;
        let ticks = vec![
            tick(10, dec!(100), dec!(1)),
            tick(day + 10, dec!(101), dec!(1)),
            tick(day + 20, dec!(102), dec!(1)),
            tick(2 * day + 10, dec!(103), dec!(1)),
            tick(2 * day + 20, dec!(104), dec!(1)),
        ];
        let summary = ingestor.run(ticks, &CancellationToken::new()).unwrap();

        assert_eq!(summary.outcome, IngestOutcome::DayLimit);
        assert_eq!(summary.days, 2);
        assert_eq!(summary.ticks_ingested, 3);
        assert_eq!(summary.last_price, Some(dec!(102)));
        assert_eq!(summary.candles_finished, 2);
    }

    #[test]
    fn test_progress_reports_days() {
        let days = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&days);
        let (_sink, ingestor) = ingestor(&IngestConfig::default());
        let mut ingestor = ingestor.with_progress(move |p: IngestProgress| {
            if let Some(day) = p.day {
                seen.lock().unwrap().push(day);
            }
        });
        ingestor
            .run(
                vec![tick(10, dec!(1), dec!(1)), tick(86_410, dec!(1), dec!(1))],
                &CancellationToken::new(),
            )
            .unwrap();

        let mut days = days.lock().unwrap().clone();
        days.dedup();
        assert_eq!(days.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stream_completes() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let summary = ingestor
            .run_stream(futures::stream::iter(scenario()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.outcome, IngestOutcome::Completed);
        assert_eq!(sink.finished().len(), 2);
    }

    #[tokio::test]
    async fn test_run_stream_cancelled() {
        let (sink, mut ingestor) = ingestor(&IngestConfig::default());
        let cancel = CancellationToken::new();
        let pending = futures::stream::pending::<std::result::Result<Tick, FeedError>>();
        let stream = futures::stream::iter(scenario()).chain(pending);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let summary = ingestor.run_stream(stream, &cancel).await.unwrap();

        assert_eq!(summary.outcome, IngestOutcome::Cancelled);
        assert_eq!(summary.ticks_ingested, 3);
        assert_eq!(sink.finished().len(), 1);
        assert!(ingestor.builder().active().is_none());
    }

    #[test]
    fn test_config_from_json() {
        let config: IngestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, IngestConfig::default());

        let config: IngestConfig = serde_json::from_str(
            r#"{"timeframe":"m5","price_step":"0.5","invalid_tick_policy":"skip","max_days":2}"#,
        )
        .unwrap();
        assert_eq!(config.timeframe, Timeframe::Minute5);
        assert_eq!(config.profile().step(), Some(dec!(0.5)));
        assert_eq!(config.invalid_tick_policy, InvalidTickPolicy::Skip);
        assert_eq!(config.max_days, Some(2));
        assert!(config.finish_on_end);
    }
}
