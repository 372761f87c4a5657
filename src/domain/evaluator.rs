//! Split-wise evaluation of a directional classifier.
//!
//! Each split standardises on its own train partition, fits a fresh
//! predictor, and scores the test partition by ROC AUC. The aggregate is the
//! mean over the splits that produced a score.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::SlopetraderError;
use super::feature_table::{Dataset, FeatureTable, binary_labels};
use super::inference::ModelArtifact;
use super::metrics::{mean, roc_auc};
use super::scaler::StandardScaler;
use super::settings::{EvaluationSettings, TrainingTarget};
use super::split::{self, Split};
use crate::ports::predictor_port::Predictor;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitScore {
    pub split: Split,
    pub auc: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub label: String,
    pub rows: usize,
    pub splits: Vec<SplitScore>,
    pub auc_mean: f64,
}

impl EvaluationReport {
    pub fn aucs(&self) -> Vec<f64> {
        self.splits.iter().map(|s| s.auc).collect()
    }
}

/// One line of the training metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub timestamp: NaiveDateTime,
    pub model: String,
    pub rows: usize,
    pub auc_mean: f64,
}

impl TrainingRecord {
    pub fn new(timestamp: NaiveDateTime, model: &str, report: &EvaluationReport) -> Self {
        TrainingRecord {
            timestamp,
            model: model.to_string(),
            rows: report.rows,
            auc_mean: report.auc_mean,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionalClassifierEvaluator {
    test_window: usize,
    max_splits: usize,
}

impl DirectionalClassifierEvaluator {
    pub fn new(settings: &EvaluationSettings) -> Self {
        DirectionalClassifierEvaluator {
            test_window: settings.test_window,
            max_splits: settings.max_splits,
        }
    }

    /// Clean `table` against `label` and score every planned split.
    pub fn evaluate<P, F>(
        &self,
        table: &FeatureTable,
        label: &str,
        excluded: &[String],
        factory: &F,
    ) -> Result<EvaluationReport, SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
    {
        let dataset = table.select(label, excluded)?;
        self.evaluate_dataset(label, &dataset, factory)
    }

    /// Evaluate, then refit one scaler and model on every cleaned row.
    pub fn train<P, F>(
        &self,
        table: &FeatureTable,
        target: &TrainingTarget,
        excluded: &[String],
        factory: &F,
    ) -> Result<(EvaluationReport, ModelArtifact<P>), SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
    {
        let dataset = table.select(&target.label_column, excluded)?;
        let report = self.evaluate_dataset(&target.label_column, &dataset, factory)?;
        info!(
            model = %target.artifact,
            aucs = ?report.aucs(),
            auc_mean = report.auc_mean,
            "split evaluation complete"
        );
        let artifact =
            ModelArtifact::fit(&target.artifact, &dataset, &dataset.binary_labels(), factory)?;
        Ok((report, artifact))
    }

    pub fn evaluate_dataset<P, F>(
        &self,
        label: &str,
        dataset: &Dataset,
        factory: &F,
    ) -> Result<EvaluationReport, SlopetraderError>
    where
        P: Predictor,
        F: Fn() -> P,
    {
        let rows = dataset.len();
        if rows == 0 {
            warn!(label, "no rows left after cleaning");
            return Err(SlopetraderError::InsufficientData {
                context: label.to_string(),
                rows: 0,
                minimum: 1,
            });
        }

        let splits = split::plan(rows, self.test_window, self.max_splits);
        if splits.is_empty() {
            warn!(
                label,
                rows,
                test_window = self.test_window,
                "too few rows for a single test window"
            );
            return Err(SlopetraderError::InsufficientData {
                context: label.to_string(),
                rows,
                minimum: self.test_window + 1,
            });
        }

        let mut scored = Vec::with_capacity(splits.len());
        for (k, s) in splits.into_iter().enumerate() {
            match score_split(dataset, &s, factory) {
                Ok(Some(auc)) => scored.push(SplitScore { split: s, auc }),
                Ok(None) => warn!(label, split = k, "test window has a single class, skipped"),
                Err(e) => warn!(label, split = k, error = %e, "split failed, skipped"),
            }
        }

        let aucs: Vec<f64> = scored.iter().map(|s| s.auc).collect();
        let auc_mean = mean(&aucs).ok_or_else(|| SlopetraderError::InsufficientData {
            context: format!("{} (no scorable split)", label),
            rows,
            minimum: self.test_window + 1,
        })?;

        Ok(EvaluationReport {
            label: label.to_string(),
            rows,
            splits: scored,
            auc_mean,
        })
    }
}

fn score_split<P, F>(
    dataset: &Dataset,
    s: &Split,
    factory: &F,
) -> Result<Option<f64>, SlopetraderError>
where
    P: Predictor,
    F: Fn() -> P,
{
    let train_x = &dataset.features[s.train.clone()];
    let test_x = &dataset.features[s.test.clone()];
    let train_y = binary_labels(&dataset.labels[s.train.clone()]);
    let test_y = binary_labels(&dataset.labels[s.test.clone()]);

    let scaler = StandardScaler::fit(train_x);
    let mut model = factory();
    model.fit(&scaler.transform(train_x), &train_y)?;
    let probabilities = model.predict_probability(&scaler.transform(test_x))?;

    Ok(roc_auc(&test_y, &probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{ConstantPredictor, FirstFeaturePredictor};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn table(n: usize, signal: impl Fn(usize) -> f64) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rows = (0..n)
            .map(|i| {
                let x = signal(i);
                let label = if x > 0.0 { 1.0 } else { -1.0 };
                vec![x, 400.0 + i as f64, label]
            })
            .collect();
        FeatureTable::new(
            (0..n).map(|i| start + Duration::days(i as i64)).collect(),
            vec!["S1".into(), "SPY".into(), "TARGET_5D".into()],
            rows,
        )
        .unwrap()
    }

    fn evaluator(test_window: usize, max_splits: usize) -> DirectionalClassifierEvaluator {
        DirectionalClassifierEvaluator {
            test_window,
            max_splits,
        }
    }

    fn alternating(i: usize) -> f64 {
        if i % 2 == 0 { 1.0 + i as f64 * 0.01 } else { -1.0 - i as f64 * 0.01 }
    }

    #[test]
    fn perfectly_separable_feature_scores_one() {
        let t = table(100, alternating);
        let excluded = vec!["SPY".to_string()];
        let report = evaluator(20, 6)
            .evaluate(&t, "TARGET_5D", &excluded, &FirstFeaturePredictor::default)
            .unwrap();
        // possible = (100 - 20) / 20 = 4
        assert_eq!(report.splits.len(), 4);
        assert_eq!(report.rows, 100);
        for s in &report.splits {
            assert_relative_eq!(s.auc, 1.0);
            assert!(s.split.train.end <= s.split.test.start);
        }
        assert_relative_eq!(report.auc_mean, 1.0);
    }

    #[test]
    fn fresh_predictor_per_split_sized_to_train() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = table(100, alternating);
        let factory = || FirstFeaturePredictor::with_log(log.clone());
        let report = evaluator(20, 3)
            .evaluate(&t, "TARGET_5D", &["SPY".to_string()], &factory)
            .unwrap();
        let train_sizes: Vec<usize> = report.splits.iter().map(|s| s.split.train_len()).collect();
        assert_eq!(*log.borrow(), train_sizes);
        assert_eq!(train_sizes, vec![40, 60, 80]);
    }

    #[test]
    fn exactly_one_test_window_is_insufficient() {
        let t = table(20, alternating);
        let err = evaluator(20, 6)
            .evaluate(&t, "TARGET_5D", &["SPY".to_string()], &FirstFeaturePredictor::default)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn all_rows_dirty_is_insufficient() {
        let t = table(30, |_| f64::NAN);
        let err = evaluator(5, 6)
            .evaluate(&t, "TARGET_5D", &["SPY".to_string()], &|| ConstantPredictor(0.5))
            .unwrap_err();
        assert!(matches!(
            err,
            SlopetraderError::InsufficientData { rows: 0, .. }
        ));
    }

    #[test]
    fn single_class_split_is_skipped_not_fatal() {
        // last 10 rows all positive: the final split has one class only
        let t = table(60, |i| if i >= 50 { 1.0 } else { alternating(i) });
        let report = evaluator(10, 6)
            .evaluate(&t, "TARGET_5D", &["SPY".to_string()], &FirstFeaturePredictor::default)
            .unwrap();
        assert_eq!(report.splits.len(), 4);
        assert!(report.splits.iter().all(|s| s.split.test.end <= 50));
    }

    #[test]
    fn train_refits_on_all_rows() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = table(50, alternating);
        let target = TrainingTarget {
            label_column: "TARGET_5D".into(),
            artifact: "daily_clf_5d".into(),
        };
        let factory = || FirstFeaturePredictor::with_log(log.clone());
        let (report, artifact) = evaluator(10, 2)
            .train(&t, &target, &["SPY".to_string()], &factory)
            .unwrap();
        assert_eq!(report.splits.len(), 2);
        assert_eq!(artifact.rows, 50);
        assert_eq!(artifact.feature_names, vec!["S1"]);
        assert_eq!(artifact.target, "daily_clf_5d");
        assert_eq!(log.borrow().last(), Some(&50));
    }

    #[test]
    fn training_record_carries_summary() {
        let report = EvaluationReport {
            label: "TARGET_5D".into(),
            rows: 900,
            splits: vec![],
            auc_mean: 0.55,
        };
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let rec = TrainingRecord::new(ts, "daily_clf_5d", &report);
        assert_eq!(rec.rows, 900);
        assert_eq!(rec.model, "daily_clf_5d");
    }
}
