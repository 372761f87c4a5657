//! CSV feature table adapter.
//!
//! A table named `name` lives at `<data_dir>/<name>.csv`. The first column is
//! the timestamp, every other column is numeric. Empty cells load as NaN and
//! are dropped later by the dataset cleaning step.

use crate::domain::error::SlopetraderError;
use crate::domain::feature_table::FeatureTable;
use crate::ports::data_port::FeatureSource;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` and the ISO `T` form.
/// Offset timestamps (`+00:00` suffix or RFC 3339) are converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z")
                .or_else(|_| DateTime::parse_from_rfc3339(raw))
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub struct CsvFeatureAdapter {
    base_path: PathBuf,
}

impl CsvFeatureAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", name))
    }
}

impl FeatureSource for CsvFeatureAdapter {
    fn load_table(&self, name: &str) -> Result<FeatureTable, SlopetraderError> {
        let path = self.csv_path(name);
        let content = fs::read_to_string(&path).map_err(|e| SlopetraderError::Storage {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| SlopetraderError::Storage {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        if headers.len() < 2 {
            return Err(SlopetraderError::Storage {
                reason: format!("{} has no feature columns", path.display()),
            });
        }
        let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut parsed: Vec<(NaiveDateTime, Vec<f64>)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SlopetraderError::Storage {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| SlopetraderError::Storage {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| SlopetraderError::Storage {
                reason: format!("invalid timestamp {:?} on data row {}", ts_str, line + 1),
            })?;

            let mut values = Vec::with_capacity(columns.len());
            for (col, cell) in columns.iter().zip(record.iter().skip(1)) {
                let cell = cell.trim();
                let value = if cell.is_empty() {
                    f64::NAN
                } else {
                    cell.parse::<f64>().map_err(|e| SlopetraderError::Storage {
                        reason: format!("invalid {} value {:?}: {}", col, cell, e),
                    })?
                };
                values.push(value);
            }
            parsed.push((timestamp, values));
        }

        parsed.sort_by_key(|(ts, _)| *ts);
        let (timestamps, rows) = parsed.into_iter().unzip();
        FeatureTable::new(timestamps, columns, rows)
    }

    fn has_table(&self, name: &str) -> bool {
        self.csv_path(name).is_file()
    }
}
