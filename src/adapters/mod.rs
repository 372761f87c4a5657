pub mod csv_feature_adapter;
pub mod csv_ledger_adapter;
pub mod csv_metrics_adapter;
pub mod file_config_adapter;
pub mod forest_predictor;
pub mod json_artifact_adapter;
