//! CSV loading for symbol tables.
//!
//! Expected header: `date, Open, High, Low, Close, Volume, symbol` in any
//! order and case. Every other numeric column is kept as a feature column.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::AppError;
use crate::model::{Series, TimePoint};
use crate::store::{normalize_symbol, SymbolTable};

const DATE_HEADERS: [&str; 4] = ["date", "datetime", "timestamp", "time"];
const INDEX_HEADERS: [&str; 2] = ["", "unnamed: 0"];

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses the date formats pandas and the upstream APIs emit into UTC
/// epoch millis. Naive values are read as UTC.
pub fn parse_timestamp_ms(raw: &str) -> Result<i64, AppError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.timestamp_millis());
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    Err(AppError::InvalidTimestamp(s.to_string()))
}

struct Columns {
    date: usize,
    symbol: Option<usize>,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    features: Vec<(usize, String)>,
}

impl Columns {
    fn from_headers(table: &str, headers: &csv::StringRecord) -> Result<Self, AppError> {
        let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| lower.iter().position(|h| h == name);
        let require = |name: &'static str| {
            find(name).ok_or_else(|| AppError::MissingColumn {
                table: table.to_string(),
                column: name,
            })
        };

        let date = lower
            .iter()
            .position(|h| DATE_HEADERS.contains(&h.as_str()))
            .ok_or_else(|| AppError::MissingColumn {
                table: table.to_string(),
                column: "date",
            })?;
        let open = require("open")?;
        let high = require("high")?;
        let low = require("low")?;
        let close = require("close")?;
        let volume = find("volume");
        let symbol = find("symbol");

        let known = [Some(date), Some(open), Some(high), Some(low), Some(close), volume, symbol];
        let features = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !known.contains(&Some(*i)))
            .filter(|(i, _)| !INDEX_HEADERS.contains(&lower[*i].as_str()))
            .map(|(i, h)| (i, h.trim().to_string()))
            .collect();

        Ok(Self {
            date,
            symbol,
            open,
            high,
            low,
            close,
            volume,
            features,
        })
    }
}

fn parse_number(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Reads a table from any reader. Rows without a symbol column are filed
/// under `default_symbol`; rows with unusable prices are skipped.
pub fn parse_symbol_table<R: Read>(
    table: &str,
    reader: R,
    default_symbol: Option<&str>,
) -> Result<SymbolTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();
    let cols = Columns::from_headers(table, &headers)?;
    if cols.symbol.is_none() && default_symbol.is_none() {
        return Err(AppError::MissingColumn {
            table: table.to_string(),
            column: "symbol",
        });
    }

    let mut rows: HashMap<String, Vec<TimePoint>> = HashMap::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;
        let symbol = match cols.symbol.and_then(|i| record.get(i)) {
            Some(s) if !s.trim().is_empty() => normalize_symbol(s),
            _ => match default_symbol {
                Some(s) => normalize_symbol(s),
                None => {
                    skipped += 1;
                    continue;
                }
            },
        };
        let timestamp_ms = parse_timestamp_ms(record.get(cols.date).unwrap_or(""))?;

        let prices = (
            parse_number(&record, cols.open),
            parse_number(&record, cols.high),
            parse_number(&record, cols.low),
            parse_number(&record, cols.close),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = prices else {
            skipped += 1;
            continue;
        };

        let mut point = TimePoint::new(timestamp_ms, open, high, low, close);
        point.volume = cols.volume.and_then(|i| parse_number(&record, i));
        for (idx, name) in &cols.features {
            if let Some(v) = parse_number(&record, *idx) {
                point.features.insert(name.clone(), v);
            }
        }
        rows.entry(symbol).or_default().push(point);
    }

    if skipped > 0 {
        tracing::warn!(table, skipped, "Skipped rows with missing symbol or prices");
    }

    Ok(SymbolTable::from_series(
        rows.into_iter()
            .map(|(symbol, points)| Series::from_unsorted(symbol, points)),
    ))
}

pub fn load_symbol_table<P: AsRef<Path>>(
    table: &str,
    path: P,
    default_symbol: Option<&str>,
) -> Result<SymbolTable, AppError> {
    let file = std::fs::File::open(path.as_ref())?;
    let out = parse_symbol_table(table, file, default_symbol)?;
    tracing::info!(
        table,
        path = %path.as_ref().display(),
        symbols = out.len(),
        rows = out.row_count(),
        "Loaded symbol table"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pandas_timestamp_variants() {
        let day = parse_timestamp_ms("2024-01-02").unwrap();
        assert_eq!(day, 1_704_153_600_000);
        assert_eq!(parse_timestamp_ms("2024-01-02 00:00:00").unwrap(), day);
        assert_eq!(parse_timestamp_ms("2024-01-02T00:00:00Z").unwrap(), day);
        assert_eq!(
            parse_timestamp_ms("2024-01-02 00:00:00-05:00").unwrap(),
            day + 5 * 3_600_000
        );
        assert!(parse_timestamp_ms("yesterday").is_err());
    }

    #[test]
    fn extra_numeric_columns_become_features() {
        let csv = "date,Open,High,Low,Close,Volume,symbol,volatility_10,daily_return\n\
                   2024-01-03,2,3,1,2.5,100,aapl,0.02,\n\
                   2024-01-02,1,2,0.5,1.5,90,AAPL,0.01,0.003\n";
        let table = parse_symbol_table("features", csv.as_bytes(), None).unwrap();
        let s = table.get("AAPL").unwrap();
        assert_eq!(s.closes(), vec![1.5, 2.5]);
        assert_eq!(s.points()[0].feature("daily_return"), Some(0.003));
        assert_eq!(s.points()[1].feature("daily_return"), None);
        assert_eq!(s.points()[1].feature("volatility_10"), Some(0.02));
        assert_eq!(s.points()[1].volume, Some(100.0));
    }

    #[test]
    fn missing_close_column_is_an_error() {
        let csv = "date,Open,High,Low,symbol\n2024-01-02,1,2,0.5,AAPL\n";
        let err = parse_symbol_table("prices", csv.as_bytes(), None).unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { column: "close", .. }));
    }

    #[test]
    fn rows_with_blank_close_are_skipped() {
        let csv = "date,Open,High,Low,Close,symbol\n\
                   2024-01-02,1,2,0.5,,AAPL\n\
                   2024-01-03,1,2,0.5,1.2,AAPL\n";
        let table = parse_symbol_table("prices", csv.as_bytes(), None).unwrap();
        assert_eq!(table.get("AAPL").map(Series::len), Some(1));
    }
}
