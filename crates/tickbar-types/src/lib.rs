//! Core types for the tickbar candle aggregation engine.
//!
//! This crate provides the fundamental data structures shared by every
//! tickbar crate:
//!
//! - [`Tick`] - A single trade with time, price, volume, and side
//! - [`Timeframe`] - Candle window width
//! - [`InstrumentRef`] - `CODE@BOARD` instrument reference
//! - [`TradingSession`] / [`SessionLookup`] - Session metadata used to align windows
//! - [`IngestError`] - Errors surfaced by an ingestion run

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod instrument;
mod session;
mod tick;
mod timeframe;

pub use error::{
    BoundaryError, FeedError, IngestError, InstrumentParseError, InvalidTickReason, Result,
    SessionError,
};
pub use instrument::InstrumentRef;
pub use session::{SessionLookup, TradingSession, Window};
pub use tick::{Side, SideParseError, Tick};
pub use timeframe::{Timeframe, TimeframeParseError};
