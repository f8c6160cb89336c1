//! JSON and NDJSON output.

use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use tickbar_aggregate::Candle;
use tickbar_types::Tick;

use crate::{FormatError, Formatter};

/// Layout of a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// One array holding every record.
    #[default]
    Array,
    /// One object per line.
    Ndjson,
}

/// Writes ticks and candles as JSON.
///
/// Decimals are emitted as strings so no precision is lost. Candles carry
/// their volume profile unless [`JsonFormatter::with_profile`] turns it off.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    style: JsonStyle,
    pretty: bool,
    profile: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    /// Compact array output with profiles.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
            profile: true,
        }
    }

    /// One record per line with profiles.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self::new().with_style(JsonStyle::Ndjson)
    }

    /// Indents array output. Ignored for NDJSON, which must stay one line
    /// per record.
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Selects the document layout.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }

    /// Includes or drops each candle's `price_levels`.
    #[must_use]
    pub const fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    fn emit<T: Serialize, W: Write>(&self, records: &[T], mut writer: W) -> Result<(), FormatError> {
        if self.style == JsonStyle::Ndjson {
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
        } else {
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, records)?;
            } else {
                serde_json::to_writer(&mut writer, records)?;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn without_profile(candle: &Candle) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(candle)?;
    if let Some(fields) = value.as_object_mut() {
        fields.remove("price_levels");
    }
    Ok(value)
}

impl Formatter for JsonFormatter {
    fn write_ticks<W: Write + Send>(&self, ticks: &[Tick], writer: W) -> Result<(), FormatError> {
        self.emit(ticks, writer)
    }

    fn write_candles<W: Write + Send>(&self, candles: &[Candle], writer: W) -> Result<(), FormatError> {
        if self.profile {
            return self.emit(candles, writer);
        }
        let trimmed = candles
            .iter()
            .map(without_profile)
            .collect::<Result<Vec<_>, _>>()?;
        self.emit(&trimmed, writer)
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}
