//! Instrument references.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::InstrumentParseError;

/// Reference to a traded instrument on a board, written `CODE@BOARD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentRef {
    /// Security code (e.g., "RIZ2").
    code: String,
    /// Board (exchange segment) code (e.g., "FORTS").
    board: String,
}

impl InstrumentRef {
    /// Creates a new instrument reference. Board codes are stored upper-case.
    ///
    /// # Errors
    ///
    /// Returns an error if the code or board is empty.
    pub fn new(code: impl Into<String>, board: impl Into<String>) -> Result<Self, InstrumentParseError> {
        let code = code.into();
        let board = board.into();
        if code.trim().is_empty() {
            return Err(InstrumentParseError::EmptyCode);
        }
        if board.trim().is_empty() {
            return Err(InstrumentParseError::EmptyBoard);
        }
        Ok(Self {
            code: code.trim().to_string(),
            board: board.trim().to_uppercase(),
        })
    }

    /// Returns the security code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the board code.
    #[must_use]
    pub fn board(&self) -> &str {
        &self.board
    }
}

impl std::fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.code, self.board)
    }
}

impl FromStr for InstrumentRef {
    type Err = InstrumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Security codes may themselves contain '@', the board is after the last one.
        let (code, board) = s
            .rsplit_once('@')
            .ok_or_else(|| InstrumentParseError::MissingBoard(s.to_string()))?;
        Self::new(code, board)
    }
}

impl TryFrom<String> for InstrumentRef {
    type Error = InstrumentParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<InstrumentRef> for String {
    fn from(inst: InstrumentRef) -> Self {
        inst.to_string()
    }
}
