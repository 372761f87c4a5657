//! Discretisation of a predicted probability into a directional call.

use chrono::NaiveDateTime;
use std::fmt;

/// Probability cutoffs for a LONG or SHORT call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub long: f64,
    pub short: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            long: 0.6,
            short: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Long,
    Short,
    Flat,
}

impl Action {
    /// +1 for LONG, -1 for SHORT, 0 for an abstention.
    pub fn sign(self) -> i8 {
        match self {
            Action::Long => 1,
            Action::Short => -1,
            Action::Flat => 0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Long => "LONG",
            Action::Short => "SHORT",
            Action::Flat => "FLAT",
        };
        f.write_str(s)
    }
}

impl Thresholds {
    /// Strictly above `long` is LONG, strictly below `short` is SHORT.
    pub fn discretize(&self, probability: f64) -> Action {
        if probability > self.long {
            Action::Long
        } else if probability < self.short {
            Action::Short
        } else {
            Action::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionCall {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub action: Action,
}

impl PredictionCall {
    pub fn from_probability(
        timestamp: NaiveDateTime,
        probability: f64,
        thresholds: &Thresholds,
    ) -> Self {
        PredictionCall {
            timestamp,
            value: probability,
            action: thresholds.discretize(probability),
        }
    }
}
