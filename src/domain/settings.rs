//! Engine settings, built once at process entry and passed to each component.

use std::path::PathBuf;

use super::signal::Thresholds;

/// Where the persisted tables, logs and artifacts live.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub models_dir: PathBuf,
    pub eod_table: String,
    pub intraday_table: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            data_dir: PathBuf::from("data"),
            reports_dir: PathBuf::from("reports"),
            models_dir: PathBuf::from("models"),
            eod_table: "dataset_eod".to_string(),
            intraday_table: "dataset_intraday_SPY".to_string(),
        }
    }
}

/// A label column paired with the artifact name its model is saved under.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTarget {
    pub label_column: String,
    pub artifact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub test_window: usize,
    pub max_splits: usize,
    pub targets: Vec<TrainingTarget>,
    pub excluded_columns: Vec<String>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        EvaluationSettings {
            test_window: 252,
            max_splits: 6,
            targets: vec![
                TrainingTarget {
                    label_column: "TARGET_5D".into(),
                    artifact: "daily_clf_5d".into(),
                },
                TrainingTarget {
                    label_column: "TARGET_10D".into(),
                    artifact: "daily_clf_10d".into(),
                },
            ],
            excluded_columns: ["SPY", "QQQ", "TARGET_5D", "TARGET_10D"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardSettings {
    pub warmup_rows: usize,
    pub horizon: usize,
    pub min_rows: usize,
    pub label_column: String,
}

impl Default for WalkForwardSettings {
    fn default() -> Self {
        WalkForwardSettings {
            warmup_rows: 252,
            horizon: 5,
            min_rows: 252,
            label_column: "TARGET_5D".into(),
        }
    }
}

/// How the trade gate bounds its trailing round-trip window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingWindow {
    /// The current date plus the previous `n - 1` weekdays on the calendar.
    Sessions(usize),
    /// The last `n` snapshot rows, regardless of session.
    Rows(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSettings {
    pub start_cash: f64,
    pub max_day_trades: u32,
    pub window: TrailingWindow,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        PortfolioSettings {
            start_cash: 10_000.0,
            max_day_trades: 3,
            window: TrailingWindow::Sessions(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntradaySettings {
    pub symbol: String,
    pub target_column: String,
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    pub edge: f64,
    pub horizon_minutes: u32,
}

impl Default for IntradaySettings {
    fn default() -> Self {
        IntradaySettings {
            symbol: "SPY".into(),
            target_column: "RET_FWD".into(),
            lower_quantile: 0.2,
            upper_quantile: 0.8,
            edge: 0.002,
            horizon_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSettings {
    pub paths: PathSettings,
    pub thresholds: Thresholds,
    pub evaluation: EvaluationSettings,
    pub walk_forward: WalkForwardSettings,
    pub portfolio: PortfolioSettings,
    pub model: ModelSettings,
    pub intraday: IntradaySettings,
}

impl EngineSettings {
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.paths.data_dir.join(format!("{}.csv", table))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.paths.reports_dir.join("equity_curve.csv")
    }

    pub fn metrics_log_path(&self) -> PathBuf {
        self.paths.reports_dir.join("metrics_log.csv")
    }

    pub fn winrate_log_path(&self) -> PathBuf {
        self.paths.reports_dir.join("winrate_log.csv")
    }

    pub fn intraday_artifact(&self) -> String {
        format!("{}_reg", self.intraday.symbol.to_lowercase())
    }
}
