//! CSV training and walk-forward logs (`metrics_log.csv`, `winrate_log.csv`).

use crate::adapters::csv_ledger_adapter::append_row;
use crate::domain::error::SlopetraderError;
use crate::domain::evaluator::TrainingRecord;
use crate::domain::walk_forward::WalkForwardRecord;
use crate::ports::metrics_port::MetricsSink;
use std::fs;
use std::path::PathBuf;

pub struct CsvMetricsAdapter {
    metrics_path: PathBuf,
    winrate_path: PathBuf,
}

impl CsvMetricsAdapter {
    pub fn new(metrics_path: PathBuf, winrate_path: PathBuf) -> Self {
        Self {
            metrics_path,
            winrate_path,
        }
    }
}

impl MetricsSink for CsvMetricsAdapter {
    fn append_training(&self, record: &TrainingRecord) -> Result<(), SlopetraderError> {
        append_row(&self.metrics_path, record)
    }

    fn append_walk_forward(&self, record: &WalkForwardRecord) -> Result<(), SlopetraderError> {
        append_row(&self.winrate_path, record)
    }

    fn latest_win_rate(&self) -> Result<Option<f64>, SlopetraderError> {
        if !self.winrate_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.winrate_path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut latest = None;
        for result in rdr.deserialize::<WalkForwardRecord>() {
            let record = result.map_err(|e| SlopetraderError::Storage {
                reason: format!("{}: {}", self.winrate_path.display(), e),
            })?;
            latest = Some(record.win_rate);
        }
        Ok(latest)
    }
}
