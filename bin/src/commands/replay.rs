//! Replay command implementation.
//!
//! Streams a tick file through the engine while the dispatcher drains candle
//! updates on its own task, then writes the resulting candle history.

use super::{cancel_on_ctrl_c, new_builder, parse_instrument};
use crate::display::{CandleOutput, ingest_spinner, print_summary, track_progress, write_candles};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickbar_lib::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Replay a tick file into candles.
pub(crate) async fn replay(
    file: &Path,
    instrument: &str,
    output: Option<PathBuf>,
    format: OutputFormat,
    stream: bool,
    config: EngineConfig,
    quiet: bool,
) -> Result<()> {
    let instrument = parse_instrument(instrument)?;
    let reader = CsvTickReader::open(file)
        .await
        .with_context(|| format!("Failed to open tick file {}", file.display()))?;

    // Determine output path (default to <stem>.<timeframe>.<format>)
    let output = output.unwrap_or_else(|| {
        let stem = file.file_stem().map_or_else(
            || "ticks".to_string(),
            |s| s.to_string_lossy().into_owned(),
        );
        PathBuf::from(format!(
            "{stem}.{}.{}",
            config.ingest.timeframe,
            format.extension()
        ))
    });

    info!(
        file = %file.display(),
        %instrument,
        timeframe = %config.ingest.timeframe,
        policy = %config.ingest.invalid_tick_policy,
        "starting replay"
    );

    let buffer = Arc::new(UpdateBuffer::new());
    let builder = new_builder(&instrument, &config.ingest, &buffer);

    let progress = ingest_spinner(quiet || stream, "0 candles");
    let sink = if stream {
        CandleOutput::stdout()
    } else {
        CandleOutput::progress(progress.clone())
    };

    let stop_dispatch = CancellationToken::new();
    let dispatcher = Dispatcher::new(Arc::clone(&buffer), sink);
    let dispatch_task = tokio::spawn(dispatcher.run(
        config.dispatch.flush_interval(),
        stop_dispatch.clone(),
    ));

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    let mut ingestor =
        Ingestor::new(builder, &config.ingest).with_progress(track_progress(progress.clone()));
    let result = ingestor.run_stream(reader.into_stream(), &cancel).await;
    stop_dispatch.cancel();
    cancel.cancel();
    let dispatcher = dispatch_task.await.context("Dispatcher task panicked")?;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            progress.abandon_with_message("failed");
            return Err(e).with_context(|| format!("Replay of {} failed", file.display()));
        }
    };
    progress.finish_with_message(format!("{:?}", summary.outcome));

    let stats = dispatcher.stats();
    let (history, _) = dispatcher.into_parts();
    info!(
        firings = stats.firings,
        delivered = stats.delivered,
        candles = history.len(),
        "dispatcher drained"
    );

    write_candles(history.as_slice(), &output, format)?;

    if !quiet && !stream {
        print_summary(&summary, &history);
        println!("Output written to: {}", output.display());
    }

    Ok(())
}
