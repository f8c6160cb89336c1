//! Candle timeframe definitions.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed width of a candle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1-second candles.
    #[serde(rename = "s1")]
    Second1,
    /// 5-second candles.
    #[serde(rename = "s5")]
    Second5,
    /// 1-minute candles.
    #[default]
    #[serde(rename = "m1")]
    Minute1,
    /// 5-minute candles.
    #[serde(rename = "m5")]
    Minute5,
    /// 15-minute candles.
    #[serde(rename = "m15")]
    Minute15,
    /// 30-minute candles.
    #[serde(rename = "m30")]
    Minute30,
    /// 1-hour candles.
    #[serde(rename = "h1")]
    Hour1,
    /// 4-hour candles.
    #[serde(rename = "h4")]
    Hour4,
    /// Daily candles.
    #[serde(rename = "d1")]
    Day1,
}

impl Timeframe {
    /// Returns the window width in seconds.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        match self {
            Self::Second1 => 1,
            Self::Second5 => 5,
            Self::Minute1 => 60,
            Self::Minute5 => 300,
            Self::Minute15 => 900,
            Self::Minute30 => 1800,
            Self::Hour1 => 3600,
            Self::Hour4 => 14400,
            Self::Day1 => 86400,
        }
    }

    /// Returns the window width as a [`TimeDelta`].
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }

    /// Returns the timeframe as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Second1 => "s1",
            Self::Second5 => "s5",
            Self::Minute1 => "m1",
            Self::Minute5 => "m5",
            Self::Minute15 => "m15",
            Self::Minute30 => "m30",
            Self::Hour1 => "h1",
            Self::Hour4 => "h4",
            Self::Day1 => "d1",
        }
    }

    /// Returns all available timeframes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Second1,
            Self::Second5,
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Hour4,
            Self::Day1,
        ]
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s1" | "1s" | "second" | "second1" => Ok(Self::Second1),
            "s5" | "5s" | "second5" => Ok(Self::Second5),
            "m1" | "1m" | "1" | "minute" | "minute1" => Ok(Self::Minute1),
            "m5" | "5m" | "5" | "minute5" => Ok(Self::Minute5),
            "m15" | "15m" | "15" | "minute15" => Ok(Self::Minute15),
            "m30" | "30m" | "30" | "minute30" => Ok(Self::Minute30),
            "h1" | "1h" | "60" | "hour" | "hour1" => Ok(Self::Hour1),
            "h4" | "4h" | "240" | "hour4" => Ok(Self::Hour4),
            "d1" | "1d" | "day" | "day1" | "daily" => Ok(Self::Day1),
            _ => Err(TimeframeParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid timeframe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeframeParseError(String);

impl std::fmt::Display for TimeframeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid timeframe '{}', expected one of: s1, s5, m1, m5, m15, m30, h1, h4, d1",
            self.0
        )
    }
}

impl std::error::Error for TimeframeParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_seconds() {
        assert_eq!(Timeframe::Minute1.seconds(), 60);
        assert_eq!(Timeframe::Hour1.seconds(), 3600);
        assert_eq!(Timeframe::Day1.duration(), TimeDelta::days(1));
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("m1".parse::<Timeframe>().unwrap(), Timeframe::Minute1);
        assert_eq!("1h".parse::<Timeframe>().unwrap(), Timeframe::Hour1);
        assert_eq!("H4".parse::<Timeframe>().unwrap(), Timeframe::Hour4);
        // Bare minute counts, as used by chart timeframe pickers.
        assert_eq!("15".parse::<Timeframe>().unwrap(), Timeframe::Minute15);
        assert!("tick".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_serde_names() {
        for tf in Timeframe::all() {
            let json = format!("\"{}\"", tf.as_str());
            let parsed: Timeframe = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, *tf);
        }
    }
}
