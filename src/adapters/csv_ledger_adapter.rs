//! Append-only CSV ledger store (`equity_curve.csv`).

use crate::domain::error::SlopetraderError;
use crate::domain::ledger::LedgerSnapshot;
use crate::ports::ledger_port::LedgerStore;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub struct CsvLedgerAdapter {
    path: PathBuf,
}

impl CsvLedgerAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

/// Append one serialisable row, writing the header only when the file is new
/// or empty.
pub(crate) fn append_row<T: serde::Serialize>(
    path: &Path,
    row: &T,
) -> Result<(), SlopetraderError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    wtr.serialize(row).map_err(|e| SlopetraderError::Storage {
        reason: format!("failed to append to {}: {}", path.display(), e),
    })?;
    wtr.flush()?;
    Ok(())
}

impl LedgerStore for CsvLedgerAdapter {
    fn load(&self) -> Result<Option<Vec<LedgerSnapshot>>, SlopetraderError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut snapshots = Vec::new();
        for (row, result) in rdr.deserialize::<LedgerSnapshot>().enumerate() {
            let snapshot = result.map_err(|e| SlopetraderError::CorruptLedger {
                row,
                reason: e.to_string(),
            })?;
            snapshots.push(snapshot);
        }
        Ok(Some(snapshots))
    }

    fn append(&self, snapshot: &LedgerSnapshot) -> Result<(), SlopetraderError> {
        append_row(&self.path, snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn snap(hour: u32, cash: f64, pos: u64, nav: f64, day_trades: u32) -> LedgerSnapshot {
        LedgerSnapshot {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            cash,
            pos,
            nav,
            day_trades,
        }
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerAdapter::new(dir.path().join("equity_curve.csv"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn append_then_load_preserves_order_and_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("equity_curve.csv");
        let store = CsvLedgerAdapter::new(path.clone());

        store.append(&snap(9, 10_000.0, 0, 10_000.0, 0)).unwrap();
        store.append(&snap(10, 9_900.0, 1, 10_000.0, 0)).unwrap();
        store.append(&snap(11, 10_010.0, 0, 10_010.0, 1)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("timestamp,cash,pos,nav,day_trades\n"));
        assert_eq!(content.matches("timestamp").count(), 1);

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1], snap(10, 9_900.0, 1, 10_000.0, 0));
        assert_eq!(loaded[2].day_trades, 1);
    }

    #[test]
    fn unparseable_row_is_corrupt_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("equity_curve.csv");
        fs::write(
            &path,
            "timestamp,cash,pos,nav,day_trades\n2024-03-01T09:00:00,100,0,100,0\n2024-03-01T10:00:00,abc,0,100,0\n",
        )
        .unwrap();
        let store = CsvLedgerAdapter::new(path);
        assert!(matches!(
            store.load(),
            Err(SlopetraderError::CorruptLedger { row: 1, .. })
        ));
    }
}
