//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod feature_table;
pub mod inference;
pub mod ledger;
pub mod metrics;
pub mod scaler;
pub mod settings;
pub mod signal;
pub mod split;
pub mod trade_gate;
pub mod walk_forward;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;
