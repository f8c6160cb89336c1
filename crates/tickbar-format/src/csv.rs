//! Delimited text output.

use rust_decimal::Decimal;
use std::borrow::Cow;
use std::io::Write;
use tickbar_aggregate::Candle;
use tickbar_types::Tick;

use crate::{FormatError, Formatter};

const TICK_COLUMNS: &[&str] = &["time", "price", "volume", "side"];

const CANDLE_COLUMNS: &[&str] = &[
    "open_time",
    "close_time",
    "instrument",
    "timeframe",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "tick_count",
    "state",
    "poc",
];

/// Writes ticks and candles as delimited rows.
///
/// Tick rows follow the `time,price,volume,side` layout the feed reader
/// accepts, so recorded ticks can be replayed. Candle rows carry OHLCV, the
/// tick count, the state and the point of control, and optionally the value
/// area bounds. Fields containing the delimiter or a quote are quoted.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    delimiter: char,
    header: bool,
    value_area: Option<Decimal>,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Comma-separated with a header row.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            header: true,
            value_area: None,
        }
    }

    /// Uses `delimiter` between fields.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Toggles the header row.
    #[must_use]
    pub const fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Appends `va_low` and `va_high` columns holding `fraction` of each
    /// candle's volume.
    #[must_use]
    pub const fn with_value_area(mut self, fraction: Decimal) -> Self {
        self.value_area = Some(fraction);
        self
    }

    fn write_row<'a, W, I>(&self, writer: &mut W, fields: I) -> std::io::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = Cow<'a, str>>,
    {
        let mut buf = [0u8; 4];
        let delimiter = self.delimiter.encode_utf8(&mut buf);
        for (idx, field) in fields.into_iter().enumerate() {
            if idx > 0 {
                writer.write_all(delimiter.as_bytes())?;
            }
            writer.write_all(self.escape(&field).as_bytes())?;
        }
        writeln!(writer)
    }

    fn escape<'a>(&self, field: &'a str) -> Cow<'a, str> {
        if field.contains([self.delimiter, '"', '\n', '\r']) {
            Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(field)
        }
    }

    fn candle_fields(&self, candle: &Candle) -> Vec<Cow<'static, str>> {
        let profile = candle.price_levels();
        let optional = |value: Option<Decimal>| value.map(|v| v.to_string()).unwrap_or_default();
        let mut fields: Vec<Cow<'static, str>> = vec![
            candle.open_time.format("%Y-%m-%dT%H:%M:%SZ").to_string().into(),
            candle.close_time.format("%Y-%m-%dT%H:%M:%SZ").to_string().into(),
            candle.instrument.to_string().into(),
            candle.timeframe.as_str().into(),
            candle.open.to_string().into(),
            candle.high.to_string().into(),
            candle.low.to_string().into(),
            candle.close.to_string().into(),
            candle.total_volume.to_string().into(),
            candle.tick_count.to_string().into(),
            candle.state.as_str().into(),
            optional(profile.point_of_control()).into(),
        ];
        if let Some(fraction) = self.value_area {
            let area = profile.value_area(fraction);
            fields.push(optional(area.map(|(low, _)| low)).into());
            fields.push(optional(area.map(|(_, high)| high)).into());
        }
        fields
    }
}

impl Formatter for CsvFormatter {
    fn write_ticks<W: Write + Send>(&self, ticks: &[Tick], mut writer: W) -> Result<(), FormatError> {
        if self.header {
            self.write_row(&mut writer, TICK_COLUMNS.iter().map(|c| Cow::Borrowed(*c)))?;
        }
        for tick in ticks {
            let fields: [Cow<'_, str>; 4] = [
                tick.time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string().into(),
                tick.price.to_string().into(),
                tick.volume.to_string().into(),
                tick.side.as_str().into(),
            ];
            self.write_row(&mut writer, fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_candles<W: Write + Send>(&self, candles: &[Candle], mut writer: W) -> Result<(), FormatError> {
        if self.header {
            let extra: &[&str] = if self.value_area.is_some() { &["va_low", "va_high"] } else { &[] };
            let columns = CANDLE_COLUMNS.iter().chain(extra).map(|c| Cow::Borrowed(*c));
            self.write_row(&mut writer, columns)?;
        }
        for candle in candles {
            self.write_row(&mut writer, self.candle_fields(candle))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn extension(&self) -> &str {
        if self.delimiter == '\t' { "tsv" } else { "csv" }
    }
}
