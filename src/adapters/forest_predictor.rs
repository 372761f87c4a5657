//! Random-forest predictor backed by smartcore.
//!
//! Directional probabilities come from a regressor fit on 0/1 labels, clamped
//! to `[0, 1]`. Quantiles are the point prediction shifted by the empirical
//! quantile of the in-sample residuals.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;

use crate::domain::error::SlopetraderError;
use crate::domain::metrics::quantile_sorted;
use crate::domain::settings::ModelSettings;
use crate::ports::predictor_port::Predictor;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Serialize, Deserialize)]
pub struct ForestPredictor {
    n_trees: usize,
    max_depth: u16,
    min_samples_split: usize,
    model: Option<Forest>,
    residuals: Vec<f64>,
}

impl fmt::Debug for ForestPredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForestPredictor")
            .field("n_trees", &self.n_trees)
            .field("max_depth", &self.max_depth)
            .field("min_samples_split", &self.min_samples_split)
            .field("fitted", &self.model.is_some())
            .finish()
    }
}

impl ForestPredictor {
    pub fn new(settings: &ModelSettings) -> Self {
        ForestPredictor {
            n_trees: settings.n_trees,
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split,
            model: None,
            residuals: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    fn predict_raw(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError> {
        let model = self.model.as_ref().ok_or_else(|| SlopetraderError::Model {
            reason: "forest used before fit".into(),
        })?;
        let matrix = to_matrix(x)?;
        model.predict(&matrix).map_err(|e| SlopetraderError::Model {
            reason: format!("forest prediction failed: {}", e),
        })
    }
}

fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>, SlopetraderError> {
    DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| SlopetraderError::Model {
        reason: format!("matrix creation failed: {}", e),
    })
}

impl Predictor for ForestPredictor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), SlopetraderError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(SlopetraderError::Model {
                reason: format!("cannot fit on {} rows and {} labels", x.len(), y.len()),
            });
        }
        let matrix = to_matrix(x)?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split);
        let model = RandomForestRegressor::fit(&matrix, &y.to_vec(), params).map_err(|e| {
            SlopetraderError::Model {
                reason: format!("forest fit failed: {}", e),
            }
        })?;
        let fitted = model.predict(&matrix).map_err(|e| SlopetraderError::Model {
            reason: format!("forest prediction failed: {}", e),
        })?;

        let mut residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, p)| t - p).collect();
        residuals.sort_by(f64::total_cmp);
        self.residuals = residuals;
        self.model = Some(model);
        Ok(())
    }

    fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError> {
        Ok(self
            .predict_raw(x)?
            .into_iter()
            .map(|p| p.clamp(0.0, 1.0))
            .collect())
    }

    fn predict_quantile(&self, x: &[Vec<f64>], q: f64) -> Result<Vec<f64>, SlopetraderError> {
        let shift = quantile_sorted(&self.residuals, q).unwrap_or(0.0);
        Ok(self.predict_raw(x)?.into_iter().map(|p| p + shift).collect())
    }
}
