//! Display utilities and output formatting for the tickbar CLI.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tickbar_lib::prelude::*;
use tickbar_lib::IngestProgress;
use tracing::warn;

/// Output format for written candles and ticks.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
}

impl Format {
    const fn output(self) -> OutputFormat {
        match self {
            Self::Csv => OutputFormat::Csv,
            Self::Json => OutputFormat::Json,
            Self::Ndjson => OutputFormat::Ndjson,
        }
    }
}

/// Picks the explicit format, else the one named by the output extension,
/// else CSV.
pub(crate) fn resolve_format(format: Option<Format>, output: Option<&Path>) -> OutputFormat {
    format
        .map(Format::output)
        .or_else(|| output.and_then(OutputFormat::from_path))
        .unwrap_or_default()
}

/// Write candles to a file in the specified format.
pub(crate) fn write_candles(candles: &[Candle], output: &Path, format: OutputFormat) -> Result<()> {
    format
        .save_candles(candles, output)
        .with_context(|| format!("Failed to write {}", output.display()))
}

/// Write ticks to a CSV file that `replay` can read back.
pub(crate) fn write_ticks(ticks: &[Tick], output: &Path) -> Result<()> {
    CsvFormatter::new()
        .save_ticks(ticks, output)
        .with_context(|| format!("Failed to write {}", output.display()))
}

/// Spinner showing ticks read and the trading day being ingested.
pub(crate) fn ingest_spinner(quiet: bool, label: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix} {pos} ticks {msg}")
            .expect("Invalid progress template"),
    );
    pb.set_prefix(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Returns an ingestion progress callback driving `pb`.
pub(crate) fn track_progress(pb: ProgressBar) -> impl FnMut(IngestProgress) + Send + 'static {
    move |progress| {
        pb.set_position(progress.ticks_read);
        if let Some(day) = progress.day {
            pb.set_message(day.to_string());
        }
    }
}

/// Render target for dispatched candle batches.
pub(crate) enum CandleOutput {
    /// Shows the number of candles in the history on a progress bar.
    Progress {
        pb: ProgressBar,
        candles: u64,
        last_open: Option<DateTime<Utc>>,
    },
    /// Writes every updated candle as one NDJSON line.
    Ndjson(Box<dyn Write + Send>),
}

impl CandleOutput {
    pub(crate) const fn progress(pb: ProgressBar) -> Self {
        Self::Progress {
            pb,
            candles: 0,
            last_open: None,
        }
    }

    pub(crate) fn stdout() -> Self {
        Self::Ndjson(Box::new(std::io::stdout()))
    }
}

impl RenderSink for CandleOutput {
    fn render(&mut self, batch: &DispatchBatch) {
        match self {
            Self::Progress {
                pb,
                candles,
                last_open,
            } => {
                for candle in &batch.candles {
                    if last_open.is_none_or(|open| candle.open_time > open) {
                        *candles += 1;
                        *last_open = Some(candle.open_time);
                    }
                }
                pb.set_prefix(format!("{candles} candles"));
            }
            Self::Ndjson(writer) => {
                if let Err(e) = JsonFormatter::ndjson().write_candles(&batch.candles, writer) {
                    warn!(sequence = batch.sequence, error = %e, "failed to render batch");
                }
            }
        }
    }
}

/// Prints a run summary.
pub(crate) fn print_summary(summary: &IngestSummary, history: &CumulativeHistory) {
    println!("Outcome:          {:?}", summary.outcome);
    println!("Ticks read:       {}", summary.ticks_read);
    println!("Ticks ingested:   {}", summary.ticks_ingested);
    if summary.ticks_skipped > 0 {
        println!("Ticks skipped:    {}", summary.ticks_skipped);
    }
    println!("Trading days:     {}", summary.days);
    println!("Candles:          {}", history.len());
    if let Some(last) = history.last() {
        println!(
            "Last candle:      {} O {} H {} L {} C {} V {} ({})",
            last.window(),
            last.open,
            last.high,
            last.low,
            last.close,
            last.total_volume,
            last.state
        );
        if let Some(poc) = last.price_levels().point_of_control() {
            println!("Point of control: {poc}");
        }
    }
}
