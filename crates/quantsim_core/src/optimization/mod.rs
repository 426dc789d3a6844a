//! Derivative-free optimization
//!
//! Bound-constrained Nelder-Mead used by the maximum likelihood fit.
//!
//! # Example
//!
//! ```
//! use quantsim_core::config::FitOptions;
//! use quantsim_core::optimization::maximize;
//!
//! let result = maximize(
//!     |x: &[f64]| -(x[0] - 2.0).powi(2),
//!     &[0.0],
//!     &[0.5],
//!     &[(-10.0, 10.0)],
//!     &FitOptions::default(),
//! );
//! assert!((result.optimal_parameters[0] - 2.0).abs() < 1e-3);
//! ```

mod nelder_mead;
mod result;

pub use nelder_mead::maximize;
pub use result::{ConvergenceHistory, OptimizationResult, TerminationReason};
