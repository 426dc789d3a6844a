//! Integration tests for the quantile estimation pipeline
//!
//! Tests are organized by topic:
//! - `sampling` - Stable sampler against its own distribution function
//! - `pipeline` - Single trials and end-to-end determinism
//! - `monte_carlo` - Summary statistics, stream sharing and interval calibration
//! - `goodness_of_fit` - Stable fits and K-S tests on simulated data

mod pipeline;
