//! Trade tick representation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::InvalidTickReason;

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buyer-initiated trade.
    Buy,
    /// Seller-initiated trade.
    Sell,
    /// Side not reported by the feed.
    #[default]
    Unknown,
}

impl Side {
    /// Returns the side as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Side {
    type Err = SideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "b" => Ok(Self::Buy),
            "sell" | "s" => Ok(Self::Sell),
            "" | "unknown" | "u" => Ok(Self::Unknown),
            _ => Err(SideParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid side string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideParseError(String);

impl std::fmt::Display for SideParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid side '{}', expected one of: buy, sell, unknown", self.0)
    }
}

impl std::error::Error for SideParseError {}

/// A single trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Trade time (UTC).
    pub time: DateTime<Utc>,
    /// Trade price.
    pub price: Decimal,
    /// Traded volume.
    pub volume: Decimal,
    /// Aggressor side.
    #[serde(default)]
    pub side: Side,
}

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub const fn new(time: DateTime<Utc>, price: Decimal, volume: Decimal, side: Side) -> Self {
        Self {
            time,
            price,
            volume,
            side,
        }
    }

    /// Checks that price and volume are strictly positive.
    ///
    /// # Errors
    ///
    /// Returns the first violated requirement.
    pub fn validate(&self) -> Result<(), InvalidTickReason> {
        if self.price <= Decimal::ZERO {
            return Err(InvalidTickReason::NonPositivePrice(self.price));
        }
        if self.volume <= Decimal::ZERO {
            return Err(InvalidTickReason::NonPositiveVolume(self.volume));
        }
        Ok(())
    }

    /// Returns the traded notional (price * volume).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.volume
    }
}
