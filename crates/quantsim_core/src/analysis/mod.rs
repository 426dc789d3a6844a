//! Goodness-of-fit analysis of the simulated quantile estimates
//!
//! - [`fit`]: maximum likelihood stable fit and plotted density curves
//! - [`ks`]: one- and two-sample Kolmogorov-Smirnov tests
//! - [`histogram`]: density histogram with NumPy's "auto" binning
//! - [`ladder`]: the fit and two-sample stages over increasing sample sizes

pub mod fit;
pub mod histogram;
pub mod ks;
pub mod ladder;

pub use fit::{DensityCurve, FitParameters, fit_stable, linspace};
pub use histogram::Histogram;
pub use ks::{KsResult, ks_one_sample, ks_two_sample};
pub use ladder::{
    FitLadderEntry, FitProgress, TwoSampleEntry, fit_ladder, fit_rung, two_sample_ladder,
    two_sample_rung,
};

/// Quantile of an ascending sample with linear interpolation between order
/// statistics (NumPy's default method)
pub(crate) fn sample_quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
            let lower = h.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower])
        }
    }
}
