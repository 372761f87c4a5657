//! Append-only run summaries.

use crate::domain::error::SlopetraderError;
use crate::domain::evaluator::TrainingRecord;
use crate::domain::walk_forward::WalkForwardRecord;

pub trait MetricsSink {
    fn append_training(&self, record: &TrainingRecord) -> Result<(), SlopetraderError>;

    fn append_walk_forward(&self, record: &WalkForwardRecord) -> Result<(), SlopetraderError>;

    /// Win rate of the most recent walk-forward run, if any was logged.
    fn latest_win_rate(&self) -> Result<Option<f64>, SlopetraderError>;
}
