//! Tick-to-candle aggregation for the tickbar engine.
//!
//! This crate provides the producer side of the engine:
//!
//! - [`BoundaryResolver`] - Session-aware candle window resolution
//! - [`VolumeProfileAccumulator`] - Per-candle volume by price level
//! - [`Candle`] - OHLCV candle owning its volume profile
//! - [`CandleBuilder`] - Streaming candle state machine staging into a [`CandleSink`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod boundary;
mod builder;
mod candle;
mod profile;

pub use boundary::{BoundaryResolver, SessionBoundaries, resolve_window};
pub use builder::{CandleBuilder, CandleSink, IngestStep};
pub use candle::{Candle, CandleState};
pub use profile::{PriceLevel, VolumeProfile, VolumeProfileAccumulator};
