//! CSV persistence for history, stats, and snapshot files.
//!
//! - **History**: append target. Existing rows are never rewritten; a run
//!   only adds rows for dates the file does not have yet.
//! - **Stats** and **snapshot**: full-overwrite targets, written to a
//!   sibling `.tmp` file and renamed into place.
//!
//! Yields and prices are written to three decimals. Distribution amounts are
//! written as-is.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use yieldwatch_core::domain::{DataSource, Frequency, YieldRecord};
use yieldwatch_core::series::HistoricalSeries;
use yieldwatch_core::stats::YieldStats;
use yieldwatch_core::yield_calc::{round_to, DISPLAY_PLACES};

use crate::snapshot::SnapshotRow;

pub const HISTORY_HEADER: [&str; 7] = [
    "Ticker",
    "Ex-Div Date",
    "Dividend",
    "Price on Ex-Date",
    "Annualized Yield %",
    "Frequency",
    "Source",
];

pub const STATS_HEADER: [&str; 5] = [
    "Ticker",
    "Mean Yield %",
    "Median Yield %",
    "Std Dev %",
    "Samples",
];

pub const SNAPSHOT_HEADER: [&str; 11] = [
    "Updated",
    "Ticker",
    "Price",
    "Last Distribution",
    "Ex-Div Date",
    "Frequency",
    "Current Yield %",
    "Median Yield %",
    "Mean Yield %",
    "Std Dev %",
    "Valuation",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}, line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        StorageError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn malformed(path: &Path, line: u64, reason: impl Into<String>) -> Self {
        StorageError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }
}

fn fmt_fixed(value: f64) -> String {
    format!("{:.*}", DISPLAY_PLACES as usize, round_to(value, DISPLAY_PLACES))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_fixed).unwrap_or_default()
}

/// Column positions looked up by header name, so column order in the file is free.
struct Columns {
    index: Vec<usize>,
}

impl Columns {
    fn resolve(path: &Path, headers: &csv::StringRecord, wanted: &[&str]) -> Result<Self, StorageError> {
        let index = wanted
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h.trim() == *name)
                    .ok_or_else(|| StorageError::malformed(path, 1, format!("missing column '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { index })
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, col: usize) -> &'r str {
        record.get(self.index[col]).unwrap_or("").trim()
    }
}

fn open_reader(path: &Path) -> Result<Option<csv::Reader<fs::File>>, StorageError> {
    match fs::File::open(path) {
        Ok(file) => Ok(Some(csv::ReaderBuilder::new().flexible(true).from_reader(file))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

fn parse_f64(path: &Path, line: u64, column: &str, text: &str) -> Result<f64, StorageError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StorageError::malformed(path, line, format!("bad {column} '{text}'")))
}

// ─── History ────────────────────────────────────────────────────────

/// Load every ticker's series from a history file.
///
/// A missing or empty file is an empty history. A row that cannot be parsed
/// is an error rather than being skipped, since a skipped row would be
/// re-fetched and appended a second time.
pub fn load_history(path: &Path) -> Result<BTreeMap<String, HistoricalSeries>, StorageError> {
    let mut rdr = match open_reader(path)? {
        Some(rdr) => rdr,
        None => return Ok(BTreeMap::new()),
    };
    let headers = rdr.headers().map_err(|e| StorageError::csv(path, e))?.clone();
    if headers.is_empty() {
        return Ok(BTreeMap::new());
    }
    let cols = Columns::resolve(path, &headers, &HISTORY_HEADER)?;

    let mut grouped: BTreeMap<String, Vec<YieldRecord>> = BTreeMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| StorageError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let ticker = cols.get(&record, 0);
        if ticker.is_empty() {
            return Err(StorageError::malformed(path, line, "empty ticker"));
        }
        let date_text = cols.get(&record, 1);
        let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
            .map_err(|_| StorageError::malformed(path, line, format!("bad ex-date '{date_text}'")))?;
        let amount = parse_f64(path, line, "dividend", cols.get(&record, 2))?;
        let price = parse_f64(path, line, "price", cols.get(&record, 3))?;
        let annualized_yield = parse_f64(path, line, "yield", cols.get(&record, 4))?;
        let freq_text = cols.get(&record, 5);
        let frequency = Frequency::parse(freq_text).ok_or_else(|| {
            StorageError::malformed(path, line, format!("bad frequency '{freq_text}'"))
        })?;
        let source: DataSource = cols
            .get(&record, 6)
            .parse()
            .map_err(|e: String| StorageError::malformed(path, line, e))?;

        grouped.entry(ticker.to_string()).or_default().push(YieldRecord {
            ticker: ticker.to_string(),
            date,
            price,
            amount,
            frequency,
            annualized_yield,
            source,
        });
    }

    let series = grouped
        .into_iter()
        .map(|(ticker, records)| {
            let series = HistoricalSeries::from_records(ticker.clone(), records);
            (ticker, series)
        })
        .collect::<BTreeMap<_, _>>();
    debug!(path = %path.display(), tickers = series.len(), "history loaded");
    Ok(series)
}

/// Whether the file's last byte is something other than a newline.
fn lacks_trailing_newline(file: &mut fs::File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Append records to the history file, writing the header only when the
/// file is new or empty. Bytes already in the file are left untouched.
///
/// Returns the number of rows written.
pub fn append_history(path: &Path, records: &[YieldRecord]) -> Result<usize, StorageError> {
    if records.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| StorageError::io(path, e))?;
    let len = file.metadata().map_err(|e| StorageError::io(path, e))?.len();
    if lacks_trailing_newline(&mut file, len).map_err(|e| StorageError::io(path, e))? {
        file.write_all(b"\n").map_err(|e| StorageError::io(path, e))?;
    }

    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if len == 0 {
        wtr.write_record(HISTORY_HEADER)
            .map_err(|e| StorageError::csv(path, e))?;
    }
    for r in records {
        wtr.write_record([
            r.ticker.as_str(),
            &r.date.format(DATE_FORMAT).to_string(),
            &r.amount.to_string(),
            &fmt_fixed(r.price),
            &fmt_fixed(r.annualized_yield),
            r.frequency.label(),
            r.source.as_str(),
        ])
        .map_err(|e| StorageError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| StorageError::io(path, e))?;

    Ok(records.len())
}

// ─── Overwrite targets ──────────────────────────────────────────────

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

fn finish(path: &Path, wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, StorageError> {
    wtr.into_inner()
        .map_err(|e| StorageError::io(path, e.into_error()))
}

/// Replace the stats file with `stats`, in the order given.
pub fn write_stats(path: &Path, stats: &[YieldStats]) -> Result<(), StorageError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(STATS_HEADER)
        .map_err(|e| StorageError::csv(path, e))?;
    for s in stats {
        wtr.write_record([
            s.ticker.as_str(),
            &fmt_fixed(s.mean_yield),
            &fmt_fixed(s.median_yield),
            &fmt_opt(s.stddev_yield),
            &s.sample_count.to_string(),
        ])
        .map_err(|e| StorageError::csv(path, e))?;
    }
    let bytes = finish(path, wtr)?;
    write_atomic(path, &bytes)
}

/// Header names accepted for each stats column, current name first.
const STATS_MEAN: [&str; 2] = ["Mean Yield %", "Mean Annualized Yield %"];
const STATS_MEDIAN: [&str; 3] = ["Median Yield %", "Median Annualized Yield %", "Average Yield %"];
const STATS_STDDEV: [&str; 2] = ["Std Dev %", "Std Deviation"];

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|name| h.trim() == *name))
}

/// Read a stats file keyed by ticker.
///
/// A missing file is empty, and so is a file without the ticker, mean,
/// median, and std dev columns (logged). `Samples` is optional; when the
/// file has no such column the count is 0.
pub fn read_stats(path: &Path) -> Result<BTreeMap<String, YieldStats>, StorageError> {
    let mut rdr = match open_reader(path)? {
        Some(rdr) => rdr,
        None => return Ok(BTreeMap::new()),
    };
    let headers = rdr.headers().map_err(|e| StorageError::csv(path, e))?.clone();
    if headers.is_empty() {
        return Ok(BTreeMap::new());
    }
    let (Some(ticker_col), Some(mean_col), Some(median_col), Some(stddev_col)) = (
        find_column(&headers, &["Ticker"]),
        find_column(&headers, &STATS_MEAN),
        find_column(&headers, &STATS_MEDIAN),
        find_column(&headers, &STATS_STDDEV),
    ) else {
        warn!(path = %path.display(), "stats file lacks yield columns, ignoring it");
        return Ok(BTreeMap::new());
    };
    let samples_col = find_column(&headers, &["Samples"]);
    let field = |record: &csv::StringRecord, col: usize| record.get(col).unwrap_or("").trim().to_string();

    let mut out = BTreeMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| StorageError::csv(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let ticker = field(&record, ticker_col);
        if ticker.is_empty() {
            continue;
        }
        let stddev_text = field(&record, stddev_col);
        let stddev_yield = if stddev_text.is_empty() {
            None
        } else {
            Some(parse_f64(path, line, "std dev", &stddev_text)?)
        };
        let sample_count = match samples_col.map(|col| field(&record, col)) {
            Some(text) if !text.is_empty() => text.parse::<usize>().map_err(|_| {
                StorageError::malformed(path, line, format!("bad sample count '{text}'"))
            })?,
            _ => 0,
        };
        out.insert(
            ticker.clone(),
            YieldStats {
                ticker,
                mean_yield: parse_f64(path, line, "mean", &field(&record, mean_col))?,
                median_yield: parse_f64(path, line, "median", &field(&record, median_col))?,
                stddev_yield,
                sample_count,
            },
        );
    }
    Ok(out)
}

/// Replace the snapshot file with `rows`, in the order given.
pub fn write_snapshot(path: &Path, rows: &[SnapshotRow]) -> Result<(), StorageError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(SNAPSHOT_HEADER)
        .map_err(|e| StorageError::csv(path, e))?;
    for row in rows {
        let updated = row.updated_at.format(DATE_FORMAT).to_string();
        wtr.write_record([
            updated.as_str(),
            row.ticker.as_str(),
            &fmt_fixed(row.price),
            &row.last_distribution.to_string(),
            &row.last_ex_date.format(DATE_FORMAT).to_string(),
            row.frequency.label(),
            &fmt_fixed(row.current_yield),
            &fmt_opt(row.median_yield),
            &fmt_opt(row.mean_yield),
            &fmt_opt(row.stddev_yield),
            row.valuation.label(),
        ])
        .map_err(|e| StorageError::csv(path, e))?;
    }
    let bytes = finish(path, wtr)?;
    write_atomic(path, &bytes)
}
