//! Board registry for the tickbar candle engine.
//!
//! This crate provides the trading-session metadata of the supported exchange
//! boards. Candle windows are aligned to a board's session open, so the
//! registry is what the session-aware boundary resolver consults.
//!
//! # Example
//!
//! ```
//! use tickbar_boards::BoardRegistry;
//!
//! let registry = BoardRegistry::global();
//!
//! // Lookup by code
//! if let Some(board) = registry.get("forts") {
//!     println!("{}: opens {}", board.name(), board.session().start());
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickbar/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tickbar_types::{InstrumentRef, SessionLookup, TradingSession};

/// The board metadata JSON embedded at compile time.
const BOARDS_JSON: &str = include_str!("../data/boards.json");

/// Global board registry instance.
static REGISTRY: OnceLock<BoardRegistry> = OnceLock::new();

/// An exchange board (trading segment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board code (e.g., "FORTS").
    code: String,
    /// Human-readable name.
    name: String,
    /// Daily trading session.
    session: TradingSession,
}

impl Board {
    /// Creates a new board.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, session: TradingSession) -> Self {
        Self {
            code: code.into().to_uppercase(),
            name: name.into(),
            session,
        }
    }

    /// Returns the board code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the board's trading session.
    #[must_use]
    pub const fn session(&self) -> TradingSession {
        self.session
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Registry of known boards.
#[derive(Debug, Default)]
pub struct BoardRegistry {
    boards: HashMap<String, Board>,
}

impl BoardRegistry {
    /// Returns the global board registry.
    ///
    /// The registry is initialized lazily on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(Self::load)
    }

    /// Loads boards from the embedded JSON data.
    fn load() -> Self {
        let boards: HashMap<String, Board> =
            serde_json::from_str(BOARDS_JSON).expect("Invalid boards.json");
        Self { boards }
    }

    /// Creates an empty registry, for custom board sets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds or replaces a board.
    pub fn insert(&mut self, board: Board) {
        self.boards.insert(board.code.clone(), board);
    }

    /// Looks up a board by code (case-insensitive).
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Board> {
        self.boards.get(&code.to_uppercase())
    }

    /// Returns all boards as an iterator.
    pub fn all(&self) -> impl Iterator<Item = &Board> {
        self.boards.values()
    }

    /// Returns the total number of boards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Returns all board codes sorted alphabetically.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.boards.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl SessionLookup for BoardRegistry {
    fn session(&self, instrument: &InstrumentRef, _time: DateTime<Utc>) -> Option<TradingSession> {
        self.get(instrument.board()).map(Board::session)
    }
}
