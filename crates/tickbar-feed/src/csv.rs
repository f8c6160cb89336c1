//! Async CSV tick reader.

use chrono::{DateTime, Utc};
use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord, Trim};
use futures::{Stream, stream};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tickbar_types::{FeedError, Side, Tick};
use tokio::io::AsyncRead;

/// Reads ticks from `time,price,volume[,side]` records.
///
/// `time` is RFC 3339 or integer Unix milliseconds. Fields may be quoted and
/// are trimmed. A header record starting with `time`, blank lines and `#`
/// comments are skipped. Records may omit the side column.
pub struct CsvTickReader<R> {
    reader: AsyncReader<R>,
    record: StringRecord,
}

impl<R> std::fmt::Debug for CsvTickReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvTickReader")
            .field("position", &self.record.position())
            .finish_non_exhaustive()
    }
}

impl<R: AsyncRead + Unpin + Send> CsvTickReader<R> {
    /// Wraps an async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .create_reader(reader);
        Self {
            reader,
            record: StringRecord::new(),
        }
    }

    /// Reads the next tick, or `None` at end of input.
    pub async fn next_tick(&mut self) -> Option<Result<Tick, FeedError>> {
        loop {
            match self.reader.read_record(&mut self.record).await {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(read_error(err))),
            }
            if self.record.iter().all(str::is_empty) || is_header(&self.record) {
                continue;
            }
            let line = self.record.position().map_or(0, |pos| pos.line() as usize);
            return Some(parse_record(&self.record, line));
        }
    }

    /// Turns the reader into a stream of ticks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Tick, FeedError>> + Send {
        stream::unfold(self, |mut reader| async move {
            let next = reader.next_tick().await?;
            Some((next, reader))
        })
    }
}

impl CsvTickReader<tokio::fs::File> {
    /// Opens a tick file.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Io`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file))
    }
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .and_then(|first| first.get(..4))
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("time"))
}

fn read_error(err: csv_async::Error) -> FeedError {
    let line = err.position().map_or(0, |pos| pos.line() as usize);
    let message = err.to_string();
    match err.into_kind() {
        csv_async::ErrorKind::Io(io) => FeedError::Io(io),
        _ => FeedError::Parse { line, message },
    }
}

/// Parses one `time,price,volume[,side]` record.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] carrying `line` if a field is missing or
/// malformed.
pub fn parse_record(record: &StringRecord, line: usize) -> Result<Tick, FeedError> {
    let parse_err = |message: String| FeedError::Parse { line, message };
    if record.len() > 4 {
        return Err(parse_err(format!("expected at most 4 fields, found {}", record.len())));
    }
    let field = |idx: usize, name: &str| {
        record
            .get(idx)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| parse_err(format!("missing {name}")))
    };

    let time = parse_time(field(0, "time")?).map_err(parse_err)?;
    let price = parse_decimal("price", field(1, "price")?).map_err(parse_err)?;
    let volume = parse_decimal("volume", field(2, "volume")?).map_err(parse_err)?;
    let side = match record.get(3) {
        Some(raw) => Side::from_str(raw).map_err(|e| parse_err(e.to_string()))?,
        None => Side::Unknown,
    };

    Ok(Tick::new(time, price, volume, side))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| format!("invalid epoch milliseconds '{raw}'"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid time '{raw}': {e}"))
}

fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|e| format!("invalid {name} '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::StreamExt;
    use rust_decimal_macros::dec;
    use std::io::Write;

    async fn read(input: &str) -> Vec<Result<Tick, FeedError>> {
        CsvTickReader::new(input.as_bytes())
            .into_stream()
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_reads_records() {
        let ticks = read(
            "time,price,volume,side\n\
             2024-01-02T00:00:05Z,100.5,1,buy\n\
             \n\
             # halted\n\
             2024-01-02T03:00:40+03:00, 102 ,2.5,S\n\
             1704153670000,99,1\n",
        )
        .await;
        let ticks: Vec<Tick> = ticks.into_iter().map(Result::unwrap).collect();

        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0].price, dec!(100.5));
        assert_eq!(ticks[0].side, Side::Buy);
        assert_eq!(
            ticks[1].time,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 40).unwrap()
        );
        assert_eq!(ticks[1].price, dec!(102));
        assert_eq!(ticks[1].volume, dec!(2.5));
        assert_eq!(ticks[1].side, Side::Sell);
        assert_eq!(
            ticks[2].time,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 1, 10).unwrap()
        );
        assert_eq!(ticks[2].side, Side::Unknown);
    }

    #[tokio::test]
    async fn test_quoted_fields() {
        let ticks = read("\"2024-01-02T00:00:05Z\",\"100\",\"1\",buy\n2024-01-02T00:00:06Z,\"101.25\",2,\"\"\n").await;
        let ticks: Vec<Tick> = ticks.into_iter().map(Result::unwrap).collect();

        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].price, dec!(100));
        assert_eq!(ticks[0].volume, dec!(1));
        assert_eq!(ticks[0].side, Side::Buy);
        assert_eq!(ticks[1].price, dec!(101.25));
        assert_eq!(ticks[1].side, Side::Unknown);
    }

    #[tokio::test]
    async fn test_errors_carry_line_numbers() {
        let results = read("time,price,volume\n2024-01-02T00:00:05Z,abc,1\n2024-01-02T00:00:06Z,1\n").await;
        match &results[0] {
            Err(FeedError::Parse { line, message }) => {
                assert_eq!(*line, 2);
                assert!(message.contains("price"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(results[1], Err(FeedError::Parse { line: 3, .. })));
    }

    #[tokio::test]
    async fn test_rejects_bad_side_and_extra_fields() {
        let results = read("2024-01-02T00:00:05Z,1,1,sideways\n2024-01-02T00:00:05Z,1,1,buy,x\n").await;
        assert!(matches!(results[0], Err(FeedError::Parse { line: 1, .. })));
        assert!(matches!(results[1], Err(FeedError::Parse { line: 2, .. })));
    }

    #[test]
    fn test_negative_values_parse() {
        // Validation is the builder's job; the reader only parses.
        let record = StringRecord::from(vec!["2024-01-02T00:00:05Z", "-1", "0"]);
        let tick = parse_record(&record, 1).unwrap();
        assert_eq!(tick.price, dec!(-1));
        assert_eq!(tick.volume, dec!(0));
    }

    #[tokio::test]
    async fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time,price,volume").unwrap();
        writeln!(file, "2024-01-02T00:00:05Z,100,1").unwrap();
        file.flush().unwrap();

        let mut reader = CsvTickReader::open(file.path()).await.unwrap();
        assert!(reader.next_tick().await.unwrap().is_ok());
        assert!(reader.next_tick().await.is_none());
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let err = CsvTickReader::open("/nonexistent/ticks.csv").await.unwrap_err();
        assert!(matches!(err, FeedError::Io(_)));
    }
}
