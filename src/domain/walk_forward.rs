//! Walk-forward simulation: refit on strictly past rows, call one row ahead.
//!
//! For each row `i` in `warmup_rows..len - horizon` a fresh scaler and model
//! are fit on rows `[0, i)` only, row `i` is scored and discretised, and a
//! non-flat call is checked against the realised label.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::SlopetraderError;
use super::feature_table::{Dataset, FeatureTable, binary_labels};
use super::scaler::StandardScaler;
use super::settings::WalkForwardSettings;
use super::signal::{PredictionCall, Thresholds};
use crate::ports::predictor_port::Predictor;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalkForwardReport {
    /// Cleaned rows available to the simulation.
    pub rows: usize,
    /// Rows for which a call was made.
    pub evaluated: usize,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub calls: Vec<PredictionCall>,
}

impl WalkForwardReport {
    pub fn empty(rows: usize) -> Self {
        WalkForwardReport {
            rows,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evaluated == 0
    }

    fn record(&mut self, call: PredictionCall, realised: f64) {
        self.evaluated += 1;
        let predicted = call.action.sign();
        if predicted != 0 {
            self.trades += 1;
            if f64::from(predicted) == realised.signum() {
                self.wins += 1;
            }
        }
        self.calls.push(call);
        self.win_rate = if self.trades > 0 {
            self.wins as f64 / self.trades as f64
        } else {
            0.0
        };
    }
}

/// One line of the walk-forward win-rate log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardRecord {
    pub timestamp: NaiveDateTime,
    pub rows: usize,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
}

impl WalkForwardRecord {
    pub fn new(timestamp: NaiveDateTime, report: &WalkForwardReport) -> Self {
        WalkForwardRecord {
            timestamp,
            rows: report.rows,
            trades: report.trades,
            wins: report.wins,
            win_rate: report.win_rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkForwardSimulator {
    warmup_rows: usize,
    horizon: usize,
    min_rows: usize,
    thresholds: Thresholds,
}

impl WalkForwardSimulator {
    pub fn new(settings: &WalkForwardSettings, thresholds: Thresholds) -> Self {
        WalkForwardSimulator {
            warmup_rows: settings.warmup_rows,
            horizon: settings.horizon,
            min_rows: settings.min_rows,
            thresholds,
        }
    }

    pub fn run<P, F>(
        &self,
        table: &FeatureTable,
        label: &str,
        excluded: &[String],
        factory: &F,
    ) -> Result<WalkForwardReport, SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
    {
        self.run_with_progress(table, label, excluded, factory, |_, _| {})
    }

    /// As [`run`](Self::run), calling `on_step(done, total)` after every row.
    pub fn run_with_progress<P, F, G>(
        &self,
        table: &FeatureTable,
        label: &str,
        excluded: &[String],
        factory: &F,
        on_step: G,
    ) -> Result<WalkForwardReport, SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
        G: FnMut(usize, usize),
    {
        let dataset = table.select(label, excluded)?;
        Ok(self.simulate(&dataset, factory, on_step))
    }

    pub fn simulate<P, F, G>(&self, dataset: &Dataset, factory: &F, mut on_step: G) -> WalkForwardReport
    where
        P: Predictor,
        F: Fn() -> P,
        G: FnMut(usize, usize),
    {
        let rows = dataset.len();
        if rows < self.min_rows {
            warn!(rows, minimum = self.min_rows, "walk-forward: not enough rows");
            return WalkForwardReport::empty(rows);
        }

        let start = self.warmup_rows.max(1);
        let end = rows.saturating_sub(self.horizon);
        if start >= end {
            warn!(rows, start, end, "walk-forward: empty evaluation range");
            return WalkForwardReport::empty(rows);
        }

        let total = end - start;
        let step = (total / 10).max(1);
        let binary = binary_labels(&dataset.labels);
        let mut report = WalkForwardReport::empty(rows);

        for (done, i) in (start..end).enumerate() {
            match self.call_row(dataset, &binary, i, factory) {
                Ok(call) => report.record(call, dataset.labels[i]),
                Err(e) => warn!(row = i, error = %e, "walk-forward step failed, skipped"),
            }
            on_step(done + 1, total);
            if (done + 1) % step == 0 || done + 1 == total {
                info!(
                    iteration = done + 1,
                    total,
                    percent = (done + 1) * 100 / total,
                    "walk-forward progress"
                );
            }
        }

        info!(
            trades = report.trades,
            wins = report.wins,
            win_rate = report.win_rate,
            "walk-forward complete"
        );
        report
    }

    fn call_row<P, F>(
        &self,
        dataset: &Dataset,
        binary: &[f64],
        i: usize,
        factory: &F,
    ) -> Result<PredictionCall, SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
    {
        let past = &dataset.features[..i];
        let scaler = StandardScaler::fit(past);
        let mut model = factory();
        model.fit(&scaler.transform(past), &binary[..i])?;
        let x = vec![scaler.transform_row(&dataset.features[i])];
        let probability = model
            .predict_probability(&x)?
            .first()
            .copied()
            .ok_or_else(|| SlopetraderError::Model {
                reason: format!("no prediction for row {}", i),
            })?;
        Ok(PredictionCall::from_probability(
            dataset.timestamps[i],
            probability,
            &self.thresholds,
        ))
    }
}
