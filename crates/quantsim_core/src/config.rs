//! Analysis configuration
//!
//! Every knob of the pipeline lives in [`AnalysisConfig`]. The `Default`
//! impl reproduces the standard run: 750 daily returns per trial, 10-day
//! windows, the 1% quantile, 10 repeats of 1000 trials, then the fit and
//! two-sample ladders.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::StableParams;

/// Fit ladder sample sizes
pub const DEFAULT_FIT_SIZES: [usize; 7] = [10, 30, 100, 300, 1_000, 3_000, 10_000];

/// Two-sample ladder sample sizes
pub const DEFAULT_TWO_SAMPLE_SIZES: [usize; 9] =
    [10, 30, 100, 300, 1_000, 3_000, 10_000, 30_000, 100_000];

/// What to do with a trial whose estimate is non-finite or absurdly large
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Drop the trial and count it
    #[default]
    Discard,
    /// Keep the value as-is
    Propagate,
}

/// How trials are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    #[default]
    Sequential,
    /// Split trials into `batches` independently seeded streams
    Parallel { batches: usize },
}

/// The repeated fixed-size estimation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeanStage {
    pub sample_size: usize,
    pub repeats: usize,
}

impl Default for MeanStage {
    fn default() -> Self {
        Self {
            sample_size: 1_000,
            repeats: 10,
        }
    }
}

/// Nelder-Mead settings for the maximum likelihood fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Simplex size below which the search may stop
    pub x_tolerance: f64,
    /// Objective spread across the simplex, relative to the best value,
    /// below which the search may stop
    pub f_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            x_tolerance: 1e-4,
            f_tolerance: 1e-7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub seed: u64,
    pub returns: StableParams,
    /// Daily returns per trial
    pub days: usize,
    /// Compounding window in days
    pub window: usize,
    /// Quantile level to estimate
    pub probability: f64,
    pub mean_stage: MeanStage,
    pub fit_sizes: Vec<usize>,
    pub two_sample_sizes: Vec<usize>,
    pub degenerate_policy: DegeneratePolicy,
    /// Estimates with a larger magnitude count as degenerate
    pub degenerate_bound: f64,
    pub execution: Execution,
    pub fit: FitOptions,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 1234,
            returns: StableParams::DAILY_RETURNS,
            days: 750,
            window: 10,
            probability: 0.01,
            mean_stage: MeanStage::default(),
            fit_sizes: DEFAULT_FIT_SIZES.to_vec(),
            two_sample_sizes: DEFAULT_TWO_SAMPLE_SIZES.to_vec(),
            degenerate_policy: DegeneratePolicy::default(),
            degenerate_bound: 1e12,
            execution: Execution::default(),
            fit: FitOptions::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check every field before any sampling happens
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.returns.validate()?;

        if self.days == 0 {
            return Err(ConfigError::ZeroCount {
                what: "number of daily returns",
            });
        }
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !(self.probability > 0.0 && self.probability < 1.0) {
            return Err(ConfigError::InvalidProbability(self.probability));
        }
        if self.mean_stage.sample_size == 0 {
            return Err(ConfigError::ZeroCount {
                what: "mean stage sample size",
            });
        }
        if self.mean_stage.repeats == 0 {
            return Err(ConfigError::ZeroCount {
                what: "mean stage repeats",
            });
        }
        if self.fit_sizes.is_empty() {
            return Err(ConfigError::EmptyLadder("fit"));
        }
        if self.two_sample_sizes.is_empty() {
            return Err(ConfigError::EmptyLadder("two-sample"));
        }
        if self.fit_sizes.contains(&0) || self.two_sample_sizes.contains(&0) {
            return Err(ConfigError::ZeroCount {
                what: "ladder sample size",
            });
        }
        if !(self.degenerate_bound > 0.0) {
            return Err(ConfigError::InvalidBound(self.degenerate_bound));
        }
        if let Execution::Parallel { batches: 0 } = self.execution {
            return Err(ConfigError::ZeroCount {
                what: "parallel batch count",
            });
        }
        if self.fit.max_iterations == 0 {
            return Err(ConfigError::ZeroCount {
                what: "fit iteration limit",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mean_stage.sample_size, 1_000);
        assert_eq!(config.fit_sizes.last(), Some(&10_000));
        assert_eq!(config.two_sample_sizes.last(), Some(&100_000));
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AnalysisConfig {
            window: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn test_bad_probability_rejected() {
        let config = AnalysisConfig {
            probability: 1.5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidProbability(1.5)));
    }

    #[test]
    fn test_empty_ladder_rejected() {
        let config = AnalysisConfig {
            two_sample_sizes: Vec::new(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyLadder("two-sample"))
        );
    }

    #[test]
    fn test_zero_batches_rejected() {
        let config = AnalysisConfig {
            execution: Execution::Parallel { batches: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let config = AnalysisConfig {
            degenerate_policy: DegeneratePolicy::Propagate,
            execution: Execution::Parallel { batches: 8 },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
