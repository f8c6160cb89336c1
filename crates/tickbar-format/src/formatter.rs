//! Output format selection and the [`Formatter`] trait.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tickbar_aggregate::Candle;
use tickbar_types::Tick;

use crate::{CsvFormatter, JsonFormatter};

/// Errors raised while writing candles or ticks.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The format name or file extension is not recognised.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// Writing to the destination failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a record failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes ticks and candles to a byte sink.
pub trait Formatter: Send + Sync {
    /// Writes `ticks`, flushing `writer` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    fn write_ticks<W: Write + Send>(&self, ticks: &[Tick], writer: W) -> Result<(), FormatError>;

    /// Writes `candles`, flushing `writer` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    fn write_candles<W: Write + Send>(&self, candles: &[Candle], writer: W) -> Result<(), FormatError>;

    /// File extension, without the dot.
    fn extension(&self) -> &str;

    /// Creates (or truncates) `path` and writes `candles` into it.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Io`] if the file cannot be created.
    fn save_candles(&self, candles: &[Candle], path: &Path) -> Result<(), FormatError> {
        self.write_candles(candles, BufWriter::new(File::create(path)?))
    }

    /// Creates (or truncates) `path` and writes `ticks` into it.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Io`] if the file cannot be created.
    fn save_ticks(&self, ticks: &[Tick], path: &Path) -> Result<(), FormatError> {
        self.write_ticks(ticks, BufWriter::new(File::create(path)?))
    }
}

/// Named output format, each backed by a default-configured [`Formatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// One row per record, replayable for ticks.
    #[default]
    Csv,
    /// A single JSON array.
    Json,
    /// One JSON object per line.
    Ndjson,
}

impl OutputFormat {
    /// File extension, without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }

    /// Infers the format from a file extension (`jsonl` counts as NDJSON).
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }

    /// Writes candles with this format's default formatter.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_candles<W: Write + Send>(&self, candles: &[Candle], writer: W) -> Result<(), FormatError> {
        match self {
            Self::Csv => CsvFormatter::new().write_candles(candles, writer),
            Self::Json => JsonFormatter::new().write_candles(candles, writer),
            Self::Ndjson => JsonFormatter::ndjson().write_candles(candles, writer),
        }
    }

    /// Writes ticks with this format's default formatter.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_ticks<W: Write + Send>(&self, ticks: &[Tick], writer: W) -> Result<(), FormatError> {
        match self {
            Self::Csv => CsvFormatter::new().write_ticks(ticks, writer),
            Self::Json => JsonFormatter::new().write_ticks(ticks, writer),
            Self::Ndjson => JsonFormatter::ndjson().write_ticks(ticks, writer),
        }
    }

    /// Creates `path` and writes candles into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_candles(&self, candles: &[Candle], path: &Path) -> Result<(), FormatError> {
        self.write_candles(candles, BufWriter::new(File::create(path)?))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{finished_candle, test_tick};

    #[test]
    fn test_parse_formats() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::Ndjson);
        assert!(matches!(
            "parquet".parse::<OutputFormat>(),
            Err(FormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out/sber.m1.JSON")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_path(Path::new("ticks.jsonl")), Some(OutputFormat::Ndjson));
        assert_eq!(OutputFormat::from_path(Path::new("candles")), None);
        assert_eq!(OutputFormat::from_path(Path::new("candles.xlsx")), None);
    }

    #[test]
    fn test_save_files() {
        let dir = tempfile::tempdir().unwrap();

        let candles = dir.path().join("candles.ndjson");
        OutputFormat::Ndjson.save_candles(&[finished_candle()], &candles).unwrap();
        assert_eq!(std::fs::read_to_string(&candles).unwrap().lines().count(), 1);

        let ticks = dir.path().join("ticks.csv");
        CsvFormatter::new().save_ticks(&[test_tick(), test_tick()], &ticks).unwrap();
        assert_eq!(std::fs::read_to_string(&ticks).unwrap().lines().count(), 3);

        let missing = dir.path().join("no/such/dir.csv");
        assert!(matches!(
            OutputFormat::Csv.save_candles(&[], &missing),
            Err(FormatError::Io(_))
        ));
    }
}
