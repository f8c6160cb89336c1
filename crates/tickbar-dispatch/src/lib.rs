//! Consumer side of the tickbar engine.
//!
//! - [`UpdateBuffer`] - Latest-snapshot-per-window staging area shared with the builder
//! - [`Dispatcher`] - Periodic drain into a [`CumulativeHistory`] and a [`RenderSink`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod buffer;
mod dispatcher;
mod history;

pub use buffer::UpdateBuffer;
pub use dispatcher::{DispatchBatch, DispatchConfig, DispatchStats, Dispatcher, RenderSink};
pub use history::{CumulativeHistory, MergeOutcome};
