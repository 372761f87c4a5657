//! Configuration validation.
//!
//! Validates all config fields before any component is constructed.

use crate::domain::error::SlopetraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    validate_thresholds(config)?;
    validate_evaluation(config)?;
    validate_walk_forward(config)?;
    validate_portfolio(config)?;
    validate_model(config)?;
    validate_intraday(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> SlopetraderError {
    SlopetraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_thresholds(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let long = config.get_double("signal", "long_threshold", 0.6);
    let short = config.get_double("signal", "short_threshold", 0.4);
    if !(0.0..=1.0).contains(&long) {
        return Err(invalid("signal", "long_threshold", "must be between 0 and 1"));
    }
    if !(0.0..=1.0).contains(&short) {
        return Err(invalid("signal", "short_threshold", "must be between 0 and 1"));
    }
    if short >= long {
        return Err(invalid(
            "signal",
            "short_threshold",
            "short_threshold must be below long_threshold",
        ));
    }
    Ok(())
}

fn validate_evaluation(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    if config.get_int("evaluation", "test_window", 252) < 1 {
        return Err(invalid("evaluation", "test_window", "must be at least 1"));
    }
    if config.get_int("evaluation", "max_splits", 6) < 1 {
        return Err(invalid("evaluation", "max_splits", "must be at least 1"));
    }
    if let Some(targets) = config.get_list("evaluation", "targets") {
        if targets.is_empty() {
            return Err(invalid("evaluation", "targets", "at least one target required"));
        }
        for t in &targets {
            parse_target(t)?;
        }
    }
    Ok(())
}

/// `LABEL:artifact` pair from the targets list.
pub fn parse_target(entry: &str) -> Result<(String, String), SlopetraderError> {
    match entry.split_once(':') {
        Some((label, artifact)) if !label.trim().is_empty() && !artifact.trim().is_empty() => {
            Ok((label.trim().to_string(), artifact.trim().to_string()))
        }
        _ => Err(invalid(
            "evaluation",
            "targets",
            &format!("entry {:?} must look like LABEL:artifact", entry),
        )),
    }
}

fn validate_walk_forward(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    if config.get_int("walkforward", "warmup_rows", 252) < 1 {
        return Err(invalid("walkforward", "warmup_rows", "must be at least 1"));
    }
    if config.get_int("walkforward", "horizon", 5) < 0 {
        return Err(invalid("walkforward", "horizon", "must be non-negative"));
    }
    if config.get_int("walkforward", "min_rows", 0) < 0 {
        return Err(invalid("walkforward", "min_rows", "must be non-negative"));
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let cash = config.get_double("portfolio", "start_cash", 10_000.0);
    if cash <= 0.0 || !cash.is_finite() {
        return Err(invalid("portfolio", "start_cash", "start_cash must be positive"));
    }
    if config.get_int("portfolio", "max_day_trades", 3) < 0 {
        return Err(invalid("portfolio", "max_day_trades", "must be non-negative"));
    }
    if config.get_int("portfolio", "pdt_window_sessions", 5) < 1 {
        return Err(invalid("portfolio", "pdt_window_sessions", "must be at least 1"));
    }
    if config.get_string("portfolio", "pdt_window_rows").is_some()
        && config.get_int("portfolio", "pdt_window_rows", 0) < 1
    {
        return Err(invalid("portfolio", "pdt_window_rows", "must be at least 1"));
    }
    Ok(())
}

fn validate_model(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    if config.get_int("model", "n_trees", 100) < 1 {
        return Err(invalid("model", "n_trees", "must be at least 1"));
    }
    let depth = config.get_int("model", "max_depth", 8);
    if !(1..=i64::from(u16::MAX)).contains(&depth) {
        return Err(invalid("model", "max_depth", "must be between 1 and 65535"));
    }
    if config.get_int("model", "min_samples_split", 5) < 2 {
        return Err(invalid("model", "min_samples_split", "must be at least 2"));
    }
    Ok(())
}

fn validate_intraday(config: &dyn ConfigPort) -> Result<(), SlopetraderError> {
    let lo = config.get_double("intraday", "lower_quantile", 0.2);
    let hi = config.get_double("intraday", "upper_quantile", 0.8);
    if !(lo > 0.0 && lo < 1.0) {
        return Err(invalid("intraday", "lower_quantile", "must be in (0, 1)"));
    }
    if !(hi > 0.0 && hi < 1.0) {
        return Err(invalid("intraday", "upper_quantile", "must be in (0, 1)"));
    }
    if lo >= hi {
        return Err(invalid(
            "intraday",
            "lower_quantile",
            "lower_quantile must be below upper_quantile",
        ));
    }
    if config.get_double("intraday", "edge", 0.002) < 0.0 {
        return Err(invalid("intraday", "edge", "must be non-negative"));
    }
    Ok(())
}
