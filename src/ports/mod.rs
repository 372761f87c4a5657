//! Port traits: the seams between domain logic and storage/model backends.

pub mod artifact_port;
pub mod config_port;
pub mod data_port;
pub mod ledger_port;
pub mod metrics_port;
pub mod predictor_port;
