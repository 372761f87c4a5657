#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use slopetrader::domain::error::SlopetraderError;
use slopetrader::domain::evaluator::TrainingRecord;
use slopetrader::domain::feature_table::FeatureTable;
use slopetrader::domain::inference::ModelArtifact;
use slopetrader::domain::ledger::LedgerSnapshot;
use slopetrader::domain::walk_forward::WalkForwardRecord;
use slopetrader::ports::artifact_port::ArtifactStore;
use slopetrader::ports::data_port::FeatureSource;
use slopetrader::ports::ledger_port::LedgerStore;
use slopetrader::ports::metrics_port::MetricsSink;
use slopetrader::ports::predictor_port::Predictor;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Probability rises with the first scaled feature; quantiles are centred on
/// one hundredth of it.
#[derive(Debug, Clone, Default)]
pub struct StubPredictor {
    fitted: bool,
    fail_fit: bool,
}

impl Predictor for StubPredictor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), SlopetraderError> {
        if self.fail_fit {
            return Err(SlopetraderError::Model {
                reason: "solver diverged".into(),
            });
        }
        if x.is_empty() || x.len() != y.len() {
            return Err(SlopetraderError::Model {
                reason: "bad training set".into(),
            });
        }
        self.fitted = true;
        Ok(())
    }

    fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError> {
        self.check()?;
        Ok(x.iter().map(|r| 1.0 / (1.0 + (-4.0 * r[0]).exp())).collect())
    }

    fn predict_quantile(&self, x: &[Vec<f64>], q: f64) -> Result<Vec<f64>, SlopetraderError> {
        self.check()?;
        Ok(x.iter().map(|r| r[0] * 0.01 + (q - 0.5) * 0.002).collect())
    }
}

impl StubPredictor {
    /// A predictor whose `fit` always fails.
    pub fn failing() -> Self {
        StubPredictor {
            fitted: false,
            fail_fit: true,
        }
    }

    fn check(&self) -> Result<(), SlopetraderError> {
        if self.fitted {
            Ok(())
        } else {
            Err(SlopetraderError::Model {
                reason: "predict before fit".into(),
            })
        }
    }
}

#[derive(Default)]
pub struct MemoryFeatures {
    pub tables: HashMap<String, FeatureTable>,
}

impl MemoryFeatures {
    pub fn with_table(mut self, name: &str, table: FeatureTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }
}

impl FeatureSource for MemoryFeatures {
    fn load_table(&self, name: &str) -> Result<FeatureTable, SlopetraderError> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| SlopetraderError::Storage {
                reason: format!("no table {}", name),
            })
    }

    fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }
}

pub struct MemoryArtifacts<P> {
    pub saved: RefCell<HashMap<String, ModelArtifact<P>>>,
}

impl<P> Default for MemoryArtifacts<P> {
    fn default() -> Self {
        Self {
            saved: RefCell::new(HashMap::new()),
        }
    }
}

impl<P: Clone> ArtifactStore<P> for MemoryArtifacts<P> {
    fn save(&self, target: &str, artifact: &ModelArtifact<P>) -> Result<(), SlopetraderError> {
        self.saved
            .borrow_mut()
            .insert(target.to_string(), artifact.clone());
        Ok(())
    }

    fn load(&self, target: &str) -> Result<ModelArtifact<P>, SlopetraderError> {
        self.saved
            .borrow()
            .get(target)
            .cloned()
            .ok_or_else(|| SlopetraderError::Storage {
                reason: format!("no artifact {}", target),
            })
    }
}

#[derive(Default)]
pub struct MemoryMetrics {
    pub training: RefCell<Vec<TrainingRecord>>,
    pub walk_forward: RefCell<Vec<WalkForwardRecord>>,
}

impl MetricsSink for MemoryMetrics {
    fn append_training(&self, record: &TrainingRecord) -> Result<(), SlopetraderError> {
        self.training.borrow_mut().push(record.clone());
        Ok(())
    }

    fn append_walk_forward(&self, record: &WalkForwardRecord) -> Result<(), SlopetraderError> {
        self.walk_forward.borrow_mut().push(record.clone());
        Ok(())
    }

    fn latest_win_rate(&self) -> Result<Option<f64>, SlopetraderError> {
        Ok(self.walk_forward.borrow().last().map(|r| r.win_rate))
    }
}

/// Ledger store kept in memory; `fail_appends` simulates a write failure.
#[derive(Default)]
pub struct MemoryLedger {
    pub rows: RefCell<Vec<LedgerSnapshot>>,
    pub fail_appends: Cell<bool>,
}

impl MemoryLedger {
    pub fn with_rows(rows: Vec<LedgerSnapshot>) -> Self {
        Self {
            rows: RefCell::new(rows),
            fail_appends: Cell::new(false),
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn load(&self) -> Result<Option<Vec<LedgerSnapshot>>, SlopetraderError> {
        let rows = self.rows.borrow();
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.clone()))
        }
    }

    fn append(&self, snapshot: &LedgerSnapshot) -> Result<(), SlopetraderError> {
        if self.fail_appends.get() {
            return Err(SlopetraderError::Storage {
                reason: "disk full".into(),
            });
        }
        self.rows.borrow_mut().push(snapshot.clone());
        Ok(())
    }
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Consecutive calendar days starting 2020-01-01.
pub fn days(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// Daily table whose `TARGET_5D` follows the sign of `VIX_SLOPE` and whose
/// `TARGET_10D` follows `VIX9D_RATIO`.
pub fn daily_table(n: usize) -> FeatureTable {
    let columns = ["VIX_SLOPE", "VIX9D_RATIO", "SPY", "TARGET_5D", "TARGET_10D"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = (0..n)
        .map(|i| {
            let slope = ((i * 37) % 101) as f64 / 50.0 - 1.0;
            let ratio = ((i * 53) % 97) as f64 / 48.0 - 1.0;
            let t5 = if slope >= 0.0 { 1.0 } else { -1.0 };
            let t10 = if ratio >= 0.0 { 1.0 } else { -1.0 };
            vec![slope, ratio, 400.0 + i as f64, t5, t10]
        })
        .collect();
    FeatureTable::new(days(n), columns, rows).unwrap()
}

/// Intraday table: one feature `RET1`, price column `SPY`, label `RET_FWD`.
/// The last row's `RET1` is `last_signal`.
pub fn intraday_table(n: usize, last_signal: f64) -> FeatureTable {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let timestamps = (0..n)
        .map(|i| start + chrono::Duration::minutes(i as i64))
        .collect();
    let rows = (0..n)
        .map(|i| {
            let ret1 = if i + 1 == n {
                last_signal
            } else {
                ((i * 7) % 11) as f64 / 5.0 - 1.0
            };
            vec![ret1, 500.0 + (i % 5) as f64, ret1 * 0.001]
        })
        .collect();
    FeatureTable::new(
        timestamps,
        vec!["RET1".into(), "SPY".into(), "RET_FWD".into()],
        rows,
    )
    .unwrap()
}
