//! Per-column standardisation fit on a training partition only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Population mean and standard deviation per column. A constant column
    /// gets scale 1 so it maps to zero instead of NaN.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        let mut scales = vec![1.0; width];

        if rows.is_empty() {
            return StandardScaler { means, scales };
        }

        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut var = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in var.iter_mut().zip(row).zip(&means) {
                *acc += (v - m).powi(2);
            }
        }
        for (s, acc) in scales.iter_mut().zip(&var) {
            let sd = (acc / n).sqrt();
            if sd > 0.0 && sd.is_finite() {
                *s = sd;
            }
        }

        StandardScaler { means, scales }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }
}
