//! Opaque model capability consumed by the evaluators.

use crate::domain::error::SlopetraderError;

/// A fit-then-infer model over standardised feature rows.
///
/// Implementations hold no state shared with other instances: every split and
/// every walk-forward step constructs its own.
pub trait Predictor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), SlopetraderError>;

    /// Probability of the positive class for each row, in [0, 1].
    fn predict_probability(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, SlopetraderError>;

    /// Estimated `q`-quantile of the continuous target for each row.
    fn predict_quantile(&self, x: &[Vec<f64>], q: f64) -> Result<Vec<f64>, SlopetraderError>;
}
