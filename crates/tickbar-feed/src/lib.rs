//! Tick sources and ingestion runs for the tickbar engine.
//!
//! - [`CsvTickReader`] - Historical ticks from `time,price,volume[,side]` files
//! - [`RandomWalk`] - Seeded synthetic ticks for live-like feeds
//! - [`live_stream`] - Paces any tick source on a timer
//! - [`Ingestor`] - Drives a candle builder with cancellation and tick policies

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod ingest;
mod synthetic;

pub use csv::{CsvTickReader, parse_record};
pub use ingest::{
    IngestConfig, IngestOutcome, IngestProgress, IngestSummary, Ingestor, InvalidTickPolicy,
};
pub use synthetic::{DEFAULT_TICK_SPACING, RandomWalk, live_stream, round_to_step};
