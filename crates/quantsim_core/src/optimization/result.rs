//! Optimization result types

use serde::{Deserialize, Serialize};

/// Best objective value after each evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    /// Running best, one entry per evaluation
    pub best_values: Vec<f64>,
}

impl ConvergenceHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an evaluation, carrying the best value forward
    pub fn record(&mut self, objective: f64) {
        let best = self.best().map_or(objective, |best| best.max(objective));
        self.best_values.push(best);
    }

    #[must_use]
    pub fn num_evaluations(&self) -> usize {
        self.best_values.len()
    }

    #[must_use]
    pub fn best(&self) -> Option<f64> {
        self.best_values.last().copied()
    }
}

/// Reason why optimization terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Simplex collapsed below both tolerances
    Converged,

    /// Maximum iterations reached without convergence
    MaxIterationsReached,

    /// Every evaluated point had a non-finite objective
    NoFiniteObjective,
}

/// Final result from an optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best point found
    pub optimal_parameters: Vec<f64>,

    /// Objective at the best point
    pub objective_value: f64,

    pub converged: bool,

    pub termination_reason: TerminationReason,

    /// Simplex iterations performed
    pub iterations: usize,

    pub history: ConvergenceHistory,
}

impl OptimizationResult {
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.history.num_evaluations()
    }
}
