//! tickbar CLI - Tick-to-candle aggregation with volume profiles.

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use std::num::NonZeroU64;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "tickbar")]
#[command(about = "Aggregate trade ticks into candles with volume profiles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress and summary output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Engine settings shared by the replay and live commands.
///
/// Flags override values from the configuration file.
#[derive(Args)]
struct EngineArgs {
    /// Candle timeframe (s1, s5, m1, m5, m15, m30, h1, h4, d1)
    #[arg(short, long)]
    timeframe: Option<String>,

    /// Round volume profile levels to this price step
    #[arg(long)]
    price_step: Option<Decimal>,

    /// Record total volume only, without the buy/sell split
    #[arg(long)]
    no_sides: bool,

    /// Skip invalid or out-of-session ticks instead of aborting
    #[arg(long)]
    skip_invalid: bool,

    /// Dispatcher flush interval in milliseconds
    #[arg(long)]
    flush_ms: Option<NonZeroU64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a tick file into candles
    Replay {
        /// Tick file (time,price,volume[,side] lines)
        file: PathBuf,

        /// Instrument as CODE@BOARD; the board selects the trading session
        #[arg(short, long, default_value = "SBER@TQBR")]
        instrument: String,

        /// Output file path. Defaults to <file stem>.<timeframe>.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format [default: from the output extension, else csv]
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Stop after this many trading days
        #[arg(long)]
        max_days: Option<u32>,

        /// Leave the last candle building when the file ends
        #[arg(long)]
        no_finish: bool,

        /// Print every dispatched batch to stdout as NDJSON
        #[arg(long)]
        stream: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Stream a synthetic random-walk feed
    Live {
        /// Instrument as CODE@BOARD; the board selects the trading session
        #[arg(short, long, default_value = "BTCUSDT@CRYPTO")]
        instrument: String,

        /// Replay this tick file first and continue from its last trade
        #[arg(long)]
        history: Option<PathBuf>,

        /// Starting price when no history is given
        #[arg(long, default_value = "100")]
        start_price: Decimal,

        /// Price step of the random walk
        #[arg(long, default_value = "0.01")]
        step: Decimal,

        /// Wall-clock milliseconds between generated ticks
        #[arg(long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
        pace_ms: u64,

        /// Feed seconds between generated ticks
        #[arg(long, default_value = "10")]
        spacing_secs: i64,

        /// Random seed for a reproducible feed
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many generated ticks
        #[arg(long)]
        ticks: Option<usize>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Write generated ticks to this CSV file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Write the candle history to this file on exit
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Format for --output [default: from its extension, else csv]
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// List known boards and their trading sessions
    Boards,
}

fn init_logging(verbose: u8, quiet: bool, json: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_json);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Replay {
            file,
            instrument,
            output,
            format,
            max_days,
            no_finish,
            stream,
            engine,
        } => {
            let mut config = commands::engine_config(cli.config.as_deref(), &engine)?;
            if max_days.is_some() {
                config.ingest.max_days = max_days;
            }
            if no_finish {
                config.ingest.finish_on_end = false;
            }
            let format = display::resolve_format(format, output.as_deref());
            commands::replay::replay(
                &file,
                &instrument,
                output,
                format,
                stream,
                config,
                cli.quiet,
            )
            .await
        }
        Commands::Live {
            instrument,
            history,
            start_price,
            step,
            pace_ms,
            spacing_secs,
            seed,
            ticks,
            duration,
            record,
            output,
            format,
            engine,
        } => {
            let config = commands::engine_config(cli.config.as_deref(), &engine)?;
            let options = commands::live::LiveOptions {
                history,
                start_price,
                step,
                pace: std::time::Duration::from_millis(pace_ms),
                spacing: chrono::TimeDelta::try_seconds(spacing_secs)
                    .context("Tick spacing out of range")?,
                seed,
                ticks,
                duration: duration.map(std::time::Duration::from_secs),
                format: display::resolve_format(format, output.as_deref()),
                record,
                output,
            };
            commands::live::live(&instrument, options, config, cli.quiet).await
        }
        Commands::Boards => commands::boards::list_boards(),
    }
}
