//! Trading session metadata and candle windows.

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{InstrumentRef, SessionError};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Daily trading session of a board.
///
/// A session opens every day at `start` local time (in the board's fixed UTC
/// offset) and lasts `length`. Candle windows are aligned to the session open,
/// not to the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSession", into = "RawSession")]
pub struct TradingSession {
    utc_offset: FixedOffset,
    start: NaiveTime,
    length: TimeDelta,
}

impl TradingSession {
    /// Creates a session, validating the offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is outside +/-24h or the length is not
    /// in `1..=1440` minutes.
    pub fn new(
        utc_offset_minutes: i32,
        start: NaiveTime,
        length_minutes: u32,
    ) -> Result<Self, SessionError> {
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or(SessionError::InvalidOffset(utc_offset_minutes))?;
        if length_minutes == 0 || length_minutes > MINUTES_PER_DAY {
            return Err(SessionError::InvalidLength(length_minutes));
        }
        Ok(Self {
            utc_offset,
            start,
            length: TimeDelta::minutes(i64::from(length_minutes)),
        })
    }

    /// A 24-hour session opening at UTC midnight.
    #[must_use]
    pub fn around_the_clock() -> Self {
        Self {
            utc_offset: Utc.fix(),
            start: NaiveTime::default(),
            length: TimeDelta::days(1),
        }
    }

    /// Returns the board's offset from UTC.
    #[must_use]
    pub const fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Returns the local time of day the session opens.
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Returns the session length.
    #[must_use]
    pub const fn length(&self) -> TimeDelta {
        self.length
    }

    /// Returns true if the session trades around the clock.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.length == TimeDelta::days(1)
    }

    /// Returns the open of the latest session starting at or before `time`.
    ///
    /// The returned instant may lie in a session that has already closed.
    #[must_use]
    pub fn anchor_for(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let local = time.with_timezone(&self.utc_offset).naive_local();
        let mut anchor = local.date().and_time(self.start);
        if anchor > local {
            anchor -= TimeDelta::days(1);
        }
        // Fixed offsets map local times one to one.
        (anchor - self.utc_offset_delta()).and_utc()
    }

    fn utc_offset_delta(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.utc_offset.local_minus_utc()))
    }
}

impl Default for TradingSession {
    fn default() -> Self {
        Self::around_the_clock()
    }
}

/// Serialized form of [`TradingSession`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawSession {
    utc_offset_minutes: i32,
    start: NaiveTime,
    length_minutes: u32,
}

impl TryFrom<RawSession> for TradingSession {
    type Error = SessionError;

    fn try_from(raw: RawSession) -> Result<Self, Self::Error> {
        Self::new(raw.utc_offset_minutes, raw.start, raw.length_minutes)
    }
}

impl From<TradingSession> for RawSession {
    fn from(session: TradingSession) -> Self {
        Self {
            utc_offset_minutes: session.utc_offset.local_minus_utc() / 60,
            start: session.start,
            length_minutes: session.length.num_minutes() as u32,
        }
    }
}

/// Source of trading-session metadata for instruments.
pub trait SessionLookup {
    /// Returns the session governing `instrument` at `time`, if known.
    fn session(&self, instrument: &InstrumentRef, time: DateTime<Utc>) -> Option<TradingSession>;
}

impl<L: SessionLookup + ?Sized> SessionLookup for &L {
    fn session(&self, instrument: &InstrumentRef, time: DateTime<Utc>) -> Option<TradingSession> {
        (**self).session(instrument, time)
    }
}

impl<L: SessionLookup + ?Sized> SessionLookup for std::sync::Arc<L> {
    fn session(&self, instrument: &InstrumentRef, time: DateTime<Utc>) -> Option<TradingSession> {
        (**self).session(instrument, time)
    }
}

/// Half-open time window `[open, close)` covered by one candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Window start (inclusive).
    pub open: DateTime<Utc>,
    /// Window end (exclusive).
    pub close: DateTime<Utc>,
}

impl Window {
    /// Creates a new window.
    #[must_use]
    pub const fn new(open: DateTime<Utc>, close: DateTime<Utc>) -> Self {
        Self { open, close }
    }

    /// Returns true if `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.open && time < self.close
    }

    /// Returns the window width.
    #[must_use]
    pub fn width(&self) -> TimeDelta {
        self.close - self.open
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.open.format("%Y-%m-%dT%H:%M:%SZ"),
            self.close.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}
