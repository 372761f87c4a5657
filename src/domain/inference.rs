//! Full-history model artifacts and single-row inference.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::SlopetraderError;
use super::feature_table::{Dataset, FeatureTable};
use super::scaler::StandardScaler;
use super::signal::{PredictionCall, Thresholds};
use crate::ports::predictor_port::Predictor;

/// A fitted scaler and model, plus the feature order they were fit on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<P> {
    pub target: String,
    pub feature_names: Vec<String>,
    pub rows: usize,
    pub scaler: StandardScaler,
    pub model: P,
}

impl<P: Predictor> ModelArtifact<P> {
    /// Fit scaler and model on every row of `dataset` against `targets`.
    pub fn fit<F>(
        target: &str,
        dataset: &Dataset,
        targets: &[f64],
        factory: F,
    ) -> Result<Self, SlopetraderError>
    where
        F: Fn() -> P,
    {
        if dataset.is_empty() {
            return Err(SlopetraderError::InsufficientData {
                context: target.to_string(),
                rows: 0,
                minimum: 1,
            });
        }
        let scaler = StandardScaler::fit(&dataset.features);
        let mut model = factory();
        model.fit(&scaler.transform(&dataset.features), targets)?;
        Ok(ModelArtifact {
            target: target.to_string(),
            feature_names: dataset.feature_names.clone(),
            rows: dataset.len(),
            scaler,
            model,
        })
    }

    fn latest_scaled(
        &self,
        table: &FeatureTable,
    ) -> Result<(NaiveDateTime, Vec<Vec<f64>>), SlopetraderError> {
        let (ts, values) = table.latest_features(&self.feature_names)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SlopetraderError::InsufficientData {
                context: format!("{} latest row at {}", self.target, ts),
                rows: 0,
                minimum: 1,
            });
        }
        Ok((ts, vec![self.scaler.transform_row(&values)]))
    }

    /// Probability and directional call for the table's last row.
    pub fn predict_latest(
        &self,
        table: &FeatureTable,
        thresholds: &Thresholds,
    ) -> Result<PredictionCall, SlopetraderError> {
        let (ts, x) = self.latest_scaled(table)?;
        let probability = first(self.model.predict_probability(&x)?)?;
        Ok(PredictionCall::from_probability(ts, probability, thresholds))
    }

    /// Lower and upper quantile estimates for the table's last row.
    pub fn quantiles_latest(
        &self,
        table: &FeatureTable,
        lower: f64,
        upper: f64,
    ) -> Result<(NaiveDateTime, f64, f64), SlopetraderError> {
        let (ts, x) = self.latest_scaled(table)?;
        let lo = first(self.model.predict_quantile(&x, lower)?)?;
        let hi = first(self.model.predict_quantile(&x, upper)?)?;
        Ok((ts, lo, hi))
    }
}

fn first(values: Vec<f64>) -> Result<f64, SlopetraderError> {
    values
        .first()
        .copied()
        .ok_or_else(|| SlopetraderError::Model {
            reason: "no prediction returned".into(),
        })
}
