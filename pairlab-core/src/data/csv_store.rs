//! CSV cache of daily observations.
//!
//! One file per symbol and timeframe: `BTC/USDT` at `1d` lives in
//! `BTC_USDT_1d.csv` with columns `timestamp,open,high,low,close,volume`.
//!
//! Reading is lenient about headers so files exported by other tools load
//! as-is: the date column may be called `timestamp`, `date`, `datetime` or
//! `time` in any case, and a missing `volume` column reads as zero. Writing
//! always produces the canonical layout.

use super::provider::{clip, DataError, DataProvider, DataSource, FetchResult};
use crate::domain::{PricePoint, PriceSeries};
use chrono::{DateTime, NaiveDate};
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEFRAME: &str = "1d";

const DATE_ALIASES: [&str; 4] = ["timestamp", "date", "datetime", "time"];
const HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// File-backed cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
    timeframe: String,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_timeframe(dir, DEFAULT_TIMEFRAME)
    }

    pub fn with_timeframe(dir: impl Into<PathBuf>, timeframe: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            timeframe: timeframe.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(cache_file_name(symbol, &self.timeframe))
    }

    pub fn exists(&self, symbol: &str) -> bool {
        self.path_for(symbol).is_file()
    }

    /// Load and validate the full cached series for `symbol`.
    pub fn load(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(DataError::NotFound {
                symbol: symbol.to_string(),
                path,
            });
        }
        let points = read_points_from_path(&path)?;
        PriceSeries::new(symbol, points).map_err(|source| DataError::Validation {
            symbol: symbol.to_string(),
            source,
        })
    }

    /// Write `series` to its cache file, creating the directory if needed.
    pub fn write(&self, series: &PriceSeries) -> Result<PathBuf, DataError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| DataError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(series.symbol());
        write_points_to_path(&path, series.points())?;
        Ok(path)
    }
}

impl DataProvider for CsvStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let full = self.load(symbol)?;
        Ok(FetchResult {
            series: clip(&full, start, end)?,
            source: DataSource::CsvCache,
        })
    }
}

/// `BTC/USDT` + `1d` → `BTC_USDT_1d.csv`.
pub fn cache_file_name(symbol: &str, timeframe: &str) -> String {
    format!("{}_{timeframe}.csv", symbol.replace('/', "_"))
}

// ── Reading ──

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, origin: &Path) -> Result<Self, DataError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let require = |name: &'static str| {
            find(&[name]).ok_or_else(|| DataError::MissingColumn {
                column: name.to_string(),
                path: origin.to_path_buf(),
            })
        };
        Ok(Self {
            date: find(&DATE_ALIASES).ok_or_else(|| DataError::MissingColumn {
                column: "timestamp".to_string(),
                path: origin.to_path_buf(),
            })?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find(&["volume"]),
        })
    }
}

/// Parse observations from any CSV reader. No validation beyond parsing.
///
/// `origin` is only used in error messages.
pub fn read_points<R: io::Read>(reader: R, origin: &Path) -> Result<Vec<PricePoint>, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let cols = Columns::resolve(rdr.headers()?, origin)?;

    let mut points = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;
        let raw = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: usize, field: &'static str| -> Result<f64, DataError> {
            let value = raw(idx);
            value.parse::<f64>().map_err(|_| DataError::Parse {
                row,
                field,
                value: value.to_string(),
            })
        };

        let date_raw = raw(cols.date);
        let date = parse_date(date_raw).ok_or_else(|| DataError::Parse {
            row,
            field: "timestamp",
            value: date_raw.to_string(),
        })?;
        let volume = match cols.volume {
            Some(idx) if !raw(idx).is_empty() => number(idx, "volume")?,
            _ => 0.0,
        };
        points.push(PricePoint {
            date,
            open: number(cols.open, "open")?,
            high: number(cols.high, "high")?,
            low: number(cols.low, "low")?,
            close: number(cols.close, "close")?,
            volume,
        });
    }
    Ok(points)
}

pub fn read_points_from_path(path: &Path) -> Result<Vec<PricePoint>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_points(io::BufReader::new(file), path)
}

/// Accepts `YYYY-MM-DD`, any ISO datetime starting with one, or a Unix
/// epoch in seconds or milliseconds.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        // Anything past 1e11 is in milliseconds (1e11 s is the year 5138).
        let secs = if n > 100_000_000_000 { n / 1000 } else { n };
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive());
    }
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

// ── Writing ──

pub fn write_points<W: io::Write>(writer: W, points: &[PricePoint]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for p in points {
        wtr.write_record(&[
            p.date.format("%Y-%m-%d").to_string(),
            p.open.to_string(),
            p.high.to_string(),
            p.low.to_string(),
            p.close.to_string(),
            p.volume.to_string(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_points_to_path(path: &Path, points: &[PricePoint]) -> Result<(), DataError> {
    let file = std::fs::File::create(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_points(io::BufWriter::new(file), points)
}

// ── Conversion ──

/// What [`convert_csv`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertSummary {
    pub rows_read: usize,
    pub rows_written: usize,
    /// Rows dropped because a later row had the same date.
    pub duplicates_dropped: usize,
}

/// Rewrite a foreign CSV in the canonical cache layout.
///
/// Rows are sorted by date; when a date repeats, the last row wins. Values
/// are not otherwise checked, so run validation on the output.
pub fn convert_csv(input: &Path, output: &Path) -> Result<ConvertSummary, DataError> {
    let mut points = read_points_from_path(input)?;
    let rows_read = points.len();

    // Stable sort keeps file order within a date, so dedup can keep the last.
    points.sort_by_key(|p| p.date);
    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for p in points {
        match deduped.last_mut() {
            Some(last) if last.date == p.date => *last = p,
            _ => deduped.push(p),
        }
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DataError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    write_points_to_path(output, &deduped)?;

    Ok(ConvertSummary {
        rows_read,
        rows_written: deduped.len(),
        duplicates_dropped: rows_read - deduped.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Result<Vec<PricePoint>, DataError> {
        read_points(text.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn cache_file_name_replaces_slash() {
        assert_eq!(cache_file_name("BTC/USDT", "1d"), "BTC_USDT_1d.csv");
        assert_eq!(cache_file_name("SPY", "1h"), "SPY_1h.csv");
    }

    #[test]
    fn reads_canonical_layout() {
        let pts = read(
            "timestamp,open,high,low,close,volume\n\
             2024-01-02,10,12,9,11,500\n\
             2024-01-03,11,13,10,12,600\n",
        )
        .unwrap();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(pts[1].close, 12.0);
        assert_eq!(pts[0].volume, 500.0);
    }

    #[test]
    fn accepts_capitalized_headers_and_missing_volume() {
        let pts = read(
            "Date,Open,High,Low,Close\n\
             2024-01-02 00:00:00,10,12,9,11\n",
        )
        .unwrap();
        assert_eq!(pts[0].volume, 0.0);
        assert_eq!(pts[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn missing_close_column_is_reported() {
        let err = read("timestamp,open,high,low\n2024-01-02,1,1,1\n").unwrap_err();
        match err {
            DataError::MissingColumn { column, .. } => assert_eq!(column, "close"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_number_names_row_and_field() {
        let err = read("timestamp,open,high,low,close\n2024-01-02,1,1,1,abc\n").unwrap_err();
        match err {
            DataError::Parse { row, field, value } => {
                assert_eq!(row, 2);
                assert_eq!(field, "close");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_date_formats() {
        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_date("2024-01-02"), Some(jan2));
        assert_eq!(parse_date("2024-01-02T15:30:00Z"), Some(jan2));
        // 2024-01-02T00:00:00Z
        assert_eq!(parse_date("1704153600"), Some(jan2));
        assert_eq!(parse_date("1704153600000"), Some(jan2));
        assert_eq!(parse_date("02/01/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn write_then_read_preserves_values() {
        let pts = vec![PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 1.5,
            high: 2.25,
            low: 1.0,
            close: 2.0,
            volume: 0.125,
        }];
        let mut buf = Vec::new();
        write_points(&mut buf, &pts).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("timestamp,open,high,low,close,volume\n"));
        assert_eq!(read(&text).unwrap(), pts);
    }
}
