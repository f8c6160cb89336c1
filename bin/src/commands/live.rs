//! Live command implementation.
//!
//! Streams a paced random-walk feed through the engine, printing candle
//! updates to stdout as NDJSON. An optional tick file is replayed first and
//! the walk continues from its last trade.

use super::{EngineIngestor, cancel_on_ctrl_c, new_builder, parse_instrument};
use crate::display::{CandleOutput, print_summary, write_candles, write_ticks};
use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use futures::StreamExt;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tickbar_lib::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Options of the live command.
pub(crate) struct LiveOptions {
    pub(crate) history: Option<PathBuf>,
    pub(crate) start_price: Decimal,
    pub(crate) step: Decimal,
    pub(crate) pace: Duration,
    pub(crate) spacing: TimeDelta,
    pub(crate) seed: Option<u64>,
    pub(crate) ticks: Option<usize>,
    pub(crate) duration: Option<Duration>,
    pub(crate) record: Option<PathBuf>,
    pub(crate) output: Option<PathBuf>,
    pub(crate) format: OutputFormat,
}

/// Stream a synthetic feed until it is interrupted or a limit is reached.
pub(crate) async fn live(
    instrument: &str,
    options: LiveOptions,
    mut config: EngineConfig,
    quiet: bool,
) -> Result<()> {
    let instrument = parse_instrument(instrument)?;
    // A live feed never ends on its own; the building candle is dropped on stop.
    config.ingest.finish_on_end = false;

    let buffer = Arc::new(UpdateBuffer::new());
    let builder = new_builder(&instrument, &config.ingest, &buffer);
    let mut ingestor = Ingestor::new(builder, &config.ingest);

    let stop_dispatch = CancellationToken::new();
    let dispatcher = Dispatcher::new(Arc::clone(&buffer), CandleOutput::stdout());
    let dispatch_task = tokio::spawn(dispatcher.run(
        config.dispatch.flush_interval(),
        stop_dispatch.clone(),
    ));

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let (mut start, mut price) = (Utc::now(), options.start_price);
    if let Some(path) = &options.history {
        let summary = replay_history(&mut ingestor, path, &cancel).await?;
        if let (Some(time), Some(last)) = (summary.last_time, summary.last_price) {
            start = time + options.spacing;
            price = last;
        }
        info!(ticks = summary.ticks_ingested, %price, "history replayed");
    }

    let mut walk = RandomWalk::new(start, price, options.step)?.with_spacing(options.spacing);
    if let Some(seed) = options.seed {
        walk = walk.with_seed(seed);
    }
    let walk = walk.take(options.ticks.unwrap_or(usize::MAX));

    if let Some(limit) = options.duration {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(limit) => cancel.cancel(),
            }
        });
    }

    let recorded = Arc::new(Mutex::new(Vec::new()));
    let recorder = options.record.is_some().then(|| Arc::clone(&recorded));
    let feed = live_stream(walk, options.pace).map(move |tick| {
        if let Some(recorder) = &recorder {
            recorder
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(tick);
        }
        Ok::<_, FeedError>(tick)
    });

    info!(%instrument, %price, step = %options.step, "starting live feed");
    let result = ingestor.run_stream(feed, &cancel).await;

    cancel.cancel();
    stop_dispatch.cancel();
    let dispatcher = dispatch_task.await.context("Dispatcher task panicked")?;
    let (history, _) = dispatcher.into_parts();
    let summary = result.context("Live feed failed")?;

    if let Some(path) = &options.record {
        let ticks = recorded.lock().unwrap_or_else(PoisonError::into_inner);
        write_ticks(&ticks, path)?;
        info!(path = %path.display(), ticks = ticks.len(), "ticks recorded");
    }
    if let Some(path) = &options.output {
        write_candles(history.as_slice(), path, options.format)?;
    }

    if !quiet {
        print_summary(&summary, &history);
    }
    Ok(())
}

/// Replays a tick file into `ingestor`, leaving its building candle open.
async fn replay_history(
    ingestor: &mut EngineIngestor,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<IngestSummary> {
    let reader = CsvTickReader::open(path)
        .await
        .with_context(|| format!("Failed to open history {}", path.display()))?;
    ingestor
        .run_stream(reader.into_stream(), cancel)
        .await
        .with_context(|| format!("Replay of {} failed", path.display()))
}
