//! Monte Carlo estimation of a heavy-tailed multi-day return quantile
//!
//! This crate simulates the 1% quantile of overlapping 10-day compounded
//! returns when daily returns follow a stable law, and checks how well a
//! stable law describes the sampling distribution of that estimate.
//! It supports:
//! - Stable return generation (Chambers-Mallows-Stuck) and the stable pdf/cdf
//! - O(n) overlapping-window compounding
//! - Quantile extraction from a PCHIP-smoothed inverse ECDF
//! - Repeated sampling with confidence bounds, optionally batch-parallel
//! - Maximum likelihood stable fits with one- and two-sample K-S tests
//!
//! # Example
//!
//! ```no_run
//! use quantsim_core::{AnalysisConfig, QuantileSampler};
//!
//! let config = AnalysisConfig::default();
//! let mut sampler = QuantileSampler::new(&config)?;
//! for run in sampler.mean_estimation(config.mean_stage)? {
//!     println!("{:.2} +/- {:.2}", run.summary.mean, 2.0 * run.summary.std_error);
//! }
//! # Ok::<(), quantsim_core::SimulationError>(())
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod integrate;
pub mod metrics;
pub mod optimization;
pub mod quantile;
pub mod returns;
pub mod simulation;
pub mod window;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{AnalysisConfig, DegeneratePolicy, Execution, FitOptions, MeanStage};
pub use error::{ConfigError, FitError, SimulationError, TrialError};
pub use model::{StableParams, StandardStable};
pub use simulation::{MeanStageRun, MonteCarloSummary, QuantileSample, QuantileSampler};
