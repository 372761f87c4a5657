//! Materialised feature table and its cleaned, model-ready projection.

use chrono::NaiveDateTime;

use super::error::SlopetraderError;

/// An ordered table of numeric columns, one row per timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub timestamps: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Feature matrix plus label vector with every non-finite row removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub timestamps: Vec<NaiveDateTime>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl FeatureTable {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SlopetraderError> {
        if timestamps.len() != rows.len() {
            return Err(SlopetraderError::Storage {
                reason: format!(
                    "{} timestamps for {} rows",
                    timestamps.len(),
                    rows.len()
                ),
            });
        }
        if let Some(i) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(SlopetraderError::Storage {
                reason: format!(
                    "row {} has {} values, expected {}",
                    i,
                    rows[i].len(),
                    columns.len()
                ),
            });
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SlopetraderError::Storage {
                reason: format!("timestamps not strictly increasing at {}", w[1]),
            });
        }
        Ok(FeatureTable {
            timestamps,
            columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, SlopetraderError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SlopetraderError::MissingColumn {
                column: name.to_string(),
            })
    }

    /// Every column that is neither the label nor explicitly excluded.
    pub fn feature_columns(&self, label: &str, excluded: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != label && !excluded.iter().any(|e| e == *c))
            .cloned()
            .collect()
    }

    /// Project onto the feature columns and `label`, dropping any row with a
    /// missing or infinite value. A zero label has no direction and is dropped.
    pub fn select(&self, label: &str, excluded: &[String]) -> Result<Dataset, SlopetraderError> {
        let feature_names = self.feature_columns(label, excluded);
        self.select_columns(&feature_names, label, true)
    }

    /// Like [`select`](Self::select) but keeps zero labels, for continuous targets.
    pub fn select_regression(
        &self,
        label: &str,
        excluded: &[String],
    ) -> Result<Dataset, SlopetraderError> {
        let feature_names = self.feature_columns(label, excluded);
        self.select_columns(&feature_names, label, false)
    }

    fn select_columns(
        &self,
        feature_names: &[String],
        label: &str,
        directional: bool,
    ) -> Result<Dataset, SlopetraderError> {
        let label_idx = self.column_index(label)?;
        let feature_idx = feature_names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dataset = Dataset {
            feature_names: feature_names.to_vec(),
            timestamps: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
        };

        for (ts, row) in self.timestamps.iter().zip(&self.rows) {
            let y = row[label_idx];
            if !y.is_finite() || (directional && y == 0.0) {
                continue;
            }
            let x: Vec<f64> = feature_idx.iter().map(|&i| row[i]).collect();
            if x.iter().any(|v| !v.is_finite()) {
                continue;
            }
            dataset.timestamps.push(*ts);
            dataset.features.push(x);
            dataset.labels.push(y);
        }

        Ok(dataset)
    }

    /// Values of `feature_names` in the last row, for single-point inference.
    pub fn latest_features(
        &self,
        feature_names: &[String],
    ) -> Result<(NaiveDateTime, Vec<f64>), SlopetraderError> {
        let (ts, row) = self
            .timestamps
            .last()
            .zip(self.rows.last())
            .ok_or_else(|| SlopetraderError::InsufficientData {
                context: "latest row".into(),
                rows: 0,
                minimum: 1,
            })?;
        let values = feature_names
            .iter()
            .map(|name| self.column_index(name).map(|i| row[i]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((*ts, values))
    }

    /// Last value of a single column, e.g. the quoted price.
    pub fn latest_value(&self, column: &str) -> Result<f64, SlopetraderError> {
        let idx = self.column_index(column)?;
        self.rows
            .last()
            .map(|r| r[idx])
            .ok_or_else(|| SlopetraderError::InsufficientData {
                context: column.to_string(),
                rows: 0,
                minimum: 1,
            })
    }
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 1.0 where the label is positive, else 0.0.
    pub fn binary_labels(&self) -> Vec<f64> {
        binary_labels(&self.labels)
    }
}

pub fn binary_labels(labels: &[f64]) -> Vec<f64> {
    labels
        .iter()
        .map(|&y| if y > 0.0 { 1.0 } else { 0.0 })
        .collect()
}
