//! Deterministic predictors for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use super::error::SlopetraderError;
use crate::ports::predictor_port::Predictor;

/// Probability rises with the first standardised feature; records the size of
/// every training set it sees.
#[derive(Debug, Clone, Default)]
pub struct FirstFeaturePredictor {
    pub fit_sizes: Rc<RefCell<Vec<usize>>>,
    fitted: bool,
}

impl FirstFeaturePredictor {
    pub fn with_log(log: Rc<RefCell<Vec<usize>>>) -> Self {
        FirstFeaturePredictor {
            fit_sizes: log,
            fitted: false,
        }
    }
}

impl Predictor for FirstFeaturePredictor {
    fn fit(&mut self, x: &[Vec<f64>], _y: &[f64]) -> Result<(), SlopetraderError> {
        self.fit_sizes.borrow_mut().push(x.len());
        self.fitted = true;
        Ok(())
    }

    fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError> {
        if !self.fitted {
            return Err(SlopetraderError::Model {
                reason: "predict before fit".into(),
            });
        }
        Ok(x.iter()
            .map(|row| 1.0 / (1.0 + (-4.0 * row[0]).exp()))
            .collect())
    }

    fn predict_quantile(&self, x: &[Vec<f64>], q: f64) -> Result<Vec<f64>, SlopetraderError> {
        Ok(x.iter().map(|row| row[0] + (q - 0.5)).collect())
    }
}

/// Always returns the same probability.
#[derive(Debug, Clone, Copy)]
pub struct ConstantPredictor(pub f64);

impl Predictor for ConstantPredictor {
    fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> Result<(), SlopetraderError> {
        Ok(())
    }

    fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError> {
        Ok(vec![self.0; x.len()])
    }

    fn predict_quantile(&self, x: &[Vec<f64>], _q: f64) -> Result<Vec<f64>, SlopetraderError> {
        Ok(vec![self.0; x.len()])
    }
}
