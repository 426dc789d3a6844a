//! Trial bookkeeping for the Monte Carlo driver
//!
//! Counts what happened to every trial so a run can report how many
//! estimates were dropped and why.

use serde::{Deserialize, Serialize};

/// Counters collected while drawing quantile estimates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialMetrics {
    /// Trials attempted
    pub trials: u64,
    /// Estimates kept in the sample
    pub accepted: u64,
    /// Estimates dropped for being non-finite or out of bounds
    pub discarded_degenerate: u64,
    /// Trials dropped because the series had too few distinct values
    pub discarded_insufficient: u64,
    /// Degenerate estimates kept because the policy propagates them
    pub propagated_degenerate: u64,
}

impl TrialMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&mut self) {
        self.trials += 1;
        self.accepted += 1;
    }

    pub fn record_degenerate_discarded(&mut self) {
        self.trials += 1;
        self.discarded_degenerate += 1;
    }

    pub fn record_insufficient(&mut self) {
        self.trials += 1;
        self.discarded_insufficient += 1;
    }

    pub fn record_degenerate_propagated(&mut self) {
        self.trials += 1;
        self.accepted += 1;
        self.propagated_degenerate += 1;
    }

    /// Total trials that did not contribute a value
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded_degenerate + self.discarded_insufficient
    }

    /// Fold another batch's counters into this one
    pub fn merge(&mut self, other: &TrialMetrics) {
        self.trials += other.trials;
        self.accepted += other.accepted;
        self.discarded_degenerate += other.discarded_degenerate;
        self.discarded_insufficient += other.discarded_insufficient;
        self.propagated_degenerate += other.propagated_degenerate;
    }

    /// Fraction of trials that were dropped
    #[must_use]
    pub fn discard_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.discarded() as f64 / self.trials as f64
        }
    }
}
