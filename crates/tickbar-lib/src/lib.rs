//! Tick-to-candle aggregation engine with volume profiles and periodic
//! dispatch.
//!
//! This is a facade crate that re-exports functionality from the tickbar
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tickbar_lib::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let buffer = Arc::new(UpdateBuffer::new());
//! let instrument: InstrumentRef = "SBER@TQBR".parse()?;
//! let builder = CandleBuilder::new(
//!     instrument.clone(),
//!     Timeframe::Minute5,
//!     SessionBoundaries::new(instrument, BoardRegistry::global()),
//!     Arc::clone(&buffer),
//! );
//!
//! let mut ingestor = Ingestor::new(builder, &IngestConfig::default());
//! let ticks = CsvTickReader::open("ticks.csv").await?.into_stream();
//! let summary = ingestor.run_stream(ticks, &CancellationToken::new()).await?;
//!
//! let mut dispatcher = Dispatcher::new(buffer, |batch: &DispatchBatch| {
//!     println!("{} candles updated", batch.candles.len());
//! });
//! dispatcher.fire();
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(all(feature = "dispatch", feature = "feed"))]
mod config;

// Re-export core types
pub use tickbar_types::*;

// Re-export board registry
pub use tickbar_boards::{Board, BoardRegistry};

// Re-export aggregation
pub use tickbar_aggregate::{
    BoundaryResolver, Candle, CandleBuilder, CandleSink, CandleState, IngestStep, PriceLevel,
    SessionBoundaries, VolumeProfile, VolumeProfileAccumulator, resolve_window,
};

// Re-export dispatch
#[cfg(feature = "dispatch")]
pub use tickbar_dispatch::{
    CumulativeHistory, DispatchBatch, DispatchConfig, DispatchStats, Dispatcher, MergeOutcome,
    RenderSink, UpdateBuffer,
};

// Re-export feeds
#[cfg(feature = "feed")]
pub use tickbar_feed::{
    CsvTickReader, DEFAULT_TICK_SPACING, IngestConfig, IngestOutcome, IngestProgress,
    IngestSummary, Ingestor, InvalidTickPolicy, RandomWalk, live_stream, parse_record,
    round_to_step,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use tickbar_format::{CsvFormatter, FormatError, Formatter, JsonFormatter, JsonStyle, OutputFormat};

#[cfg(all(feature = "dispatch", feature = "feed"))]
pub use config::{ConfigError, EngineConfig};

/// Prelude module for convenient imports.
///
/// ```
/// use tickbar_lib::prelude::*;
/// ```
pub mod prelude {
    pub use tickbar_types::{
        FeedError, IngestError, InstrumentRef, Result, SessionLookup, Side, Tick, Timeframe,
        TradingSession, Window,
    };

    pub use tickbar_boards::BoardRegistry;

    pub use tickbar_aggregate::{
        BoundaryResolver, Candle, CandleBuilder, CandleSink, CandleState, SessionBoundaries,
        VolumeProfile,
    };

    #[cfg(feature = "dispatch")]
    pub use tickbar_dispatch::{
        CumulativeHistory, DispatchBatch, DispatchConfig, Dispatcher, RenderSink, UpdateBuffer,
    };

    #[cfg(feature = "feed")]
    pub use tickbar_feed::{
        CsvTickReader, IngestConfig, IngestOutcome, IngestSummary, Ingestor, InvalidTickPolicy,
        RandomWalk, live_stream,
    };

    #[cfg(feature = "format")]
    pub use tickbar_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};

    #[cfg(all(feature = "dispatch", feature = "feed"))]
    pub use crate::config::EngineConfig;
}
