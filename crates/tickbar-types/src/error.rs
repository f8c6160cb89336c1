//! Error types for tickbar.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that abort (or, for invalid ticks, may skip) an ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A tick precedes the open of the active candle's window.
    #[error("Out-of-order tick at {tick_time}: active window opened at {window_open}")]
    OutOfOrderTick {
        /// Time of the offending tick.
        tick_time: DateTime<Utc>,
        /// Open of the active window.
        window_open: DateTime<Utc>,
    },

    /// A tick carries a non-positive price or volume.
    #[error("Invalid tick at {time}: {reason}")]
    InvalidTick {
        /// Time of the offending tick.
        time: DateTime<Utc>,
        /// What was wrong with it.
        reason: InvalidTickReason,
    },

    /// A tick could not be placed into a candle window.
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    /// The tick source failed mid-iteration.
    #[error("Feed failure: {0}")]
    FeedFailure(#[from] FeedError),
}

impl IngestError {
    /// Returns true if the error concerns a single bad tick.
    ///
    /// These are subject to the invalid-tick policy; every other error is
    /// fatal to the run.
    #[must_use]
    pub const fn is_tick_rejection(&self) -> bool {
        matches!(self, Self::InvalidTick { .. } | Self::Boundary(_))
    }
}

/// Reason a tick was rejected before touching any candle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTickReason {
    /// Price is zero or negative.
    #[error("non-positive price {0}")]
    NonPositivePrice(Decimal),

    /// Volume is zero or negative.
    #[error("non-positive volume {0}")]
    NonPositiveVolume(Decimal),
}

/// Errors raised while resolving a candle window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// The timestamp falls between two trading sessions.
    #[error("{time} is outside the trading session opened at {session_open}")]
    OutsideSession {
        /// The timestamp being resolved.
        time: DateTime<Utc>,
        /// Open of the latest session before it.
        session_open: DateTime<Utc>,
    },

    /// No session metadata is known for the instrument.
    #[error("No trading session known for {instrument} at {time}")]
    UnknownSession {
        /// The instrument, as `CODE@BOARD`.
        instrument: String,
        /// The timestamp being resolved.
        time: DateTime<Utc>,
    },
}

/// Errors raised by tick sources.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error while reading ticks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Any other source failure.
    #[error("Source error: {0}")]
    Source(String),
}

/// Errors for invalid session metadata.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// UTC offset outside +/-24 hours.
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),

    /// Session length outside 1..=1440 minutes.
    #[error("Invalid session length: {0} minutes")]
    InvalidLength(u32),
}

/// Errors for malformed `CODE@BOARD` instrument references.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentParseError {
    /// No `@` separator.
    #[error("Instrument '{0}' has no board, expected CODE@BOARD")]
    MissingBoard(String),

    /// Empty security code.
    #[error("Instrument code is empty")]
    EmptyCode,

    /// Empty board code.
    #[error("Board code is empty")]
    EmptyBoard,
}
