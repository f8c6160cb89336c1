//! Candle window resolution.

use chrono::{DateTime, TimeDelta, Utc};
use tickbar_types::{BoundaryError, InstrumentRef, SessionLookup, Timeframe, TradingSession, Window};

/// Maps a timestamp to the candle window it belongs to.
pub trait BoundaryResolver {
    /// Returns the half-open window of `timeframe` containing `time`.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp cannot be placed in a window.
    fn resolve(&self, timeframe: Timeframe, time: DateTime<Utc>) -> Result<Window, BoundaryError>;
}

impl BoundaryResolver for TradingSession {
    fn resolve(&self, timeframe: Timeframe, time: DateTime<Utc>) -> Result<Window, BoundaryError> {
        resolve_window(timeframe, time, self)
    }
}

impl<R: BoundaryResolver + ?Sized> BoundaryResolver for &R {
    fn resolve(&self, timeframe: Timeframe, time: DateTime<Utc>) -> Result<Window, BoundaryError> {
        (**self).resolve(timeframe, time)
    }
}

/// Resolves windows through a session metadata lookup for one instrument.
#[derive(Debug, Clone)]
pub struct SessionBoundaries<L> {
    instrument: InstrumentRef,
    lookup: L,
}

impl<L: SessionLookup> SessionBoundaries<L> {
    /// Creates a resolver for `instrument` backed by `lookup`.
    #[must_use]
    pub const fn new(instrument: InstrumentRef, lookup: L) -> Self {
        Self { instrument, lookup }
    }

    /// Returns the instrument being resolved for.
    #[must_use]
    pub const fn instrument(&self) -> &InstrumentRef {
        &self.instrument
    }
}

impl<L: SessionLookup> BoundaryResolver for SessionBoundaries<L> {
    fn resolve(&self, timeframe: Timeframe, time: DateTime<Utc>) -> Result<Window, BoundaryError> {
        let session = self.lookup.session(&self.instrument, time).ok_or_else(|| {
            BoundaryError::UnknownSession {
                instrument: self.instrument.to_string(),
                time,
            }
        })?;
        resolve_window(timeframe, time, &session)
    }
}

/// Computes the window of `timeframe` containing `time` within `session`.
///
/// Windows start at the session open and step by the timeframe width; the
/// last window of a session is clipped at the session close.
///
/// # Errors
///
/// Returns [`BoundaryError::OutsideSession`] if `time` falls after the close
/// of the session it belongs to.
pub fn resolve_window(
    timeframe: Timeframe,
    time: DateTime<Utc>,
    session: &TradingSession,
) -> Result<Window, BoundaryError> {
    let anchor = session.anchor_for(time);
    let session_close = anchor + session.length();
    if time >= session_close {
        return Err(BoundaryError::OutsideSession {
            time,
            session_open: anchor,
        });
    }

    let elapsed = time - anchor;
    let width = timeframe.duration();
    let elapsed_ms = elapsed.num_milliseconds();
    let width_ms = width.num_milliseconds();
    let open = anchor + TimeDelta::milliseconds(elapsed_ms / width_ms * width_ms);
    let close = (open + width).min(session_close);

    Ok(Window::new(open, close))
}
