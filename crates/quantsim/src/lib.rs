//! Command-line front end for the quantile Monte Carlo study
//!
//! Runs the stages provided by [`quantsim_core`], prints the console report
//! and writes the histogram/density figure.

// ============================================================================
// Modules
// ============================================================================

pub mod logging;
pub mod pipeline;
pub mod plot;
pub mod report;

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use logging::init_logging;
pub use pipeline::{Report, RunOptions, run};
