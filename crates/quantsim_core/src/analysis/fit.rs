//! Maximum likelihood fit of a stable law
//!
//! The sample is standardised by its median and interquartile range, the
//! likelihood is maximised in S0 coordinates `(alpha, beta, loc, ln scale)`
//! with a bounded Nelder-Mead search, and the result is mapped back to data
//! units and the S1 parameterisation.

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::config::FitOptions;
use crate::error::FitError;
use crate::model::{StableParams, StandardStable};
use crate::optimization::{TerminationReason, maximize};

use super::sample_quantile;

const ALPHA_BOUNDS: (f64, f64) = (0.4, 2.0);
const BETA_BOUNDS: (f64, f64) = (-1.0, 1.0);
/// In units of the sample IQR
const LOC_BOUNDS: (f64, f64) = (-50.0, 50.0);
const LN_SCALE_BOUNDS: (f64, f64) = (-12.0, 6.0);
const INITIAL_STEP: [f64; 4] = [0.1, 0.1, 0.1, 0.2];

/// McCulloch's quantile ratio `(q95 - q05) / (q75 - q25)` for symmetric
/// standard stable laws, with the interquartile range of that law.
/// Columns: alpha, ratio, IQR.
const QUANTILE_RATIO_TABLE: [(f64, f64, f64); 16] = [
    (0.5, 44.6351, 2.5677),
    (0.6, 23.6122, 2.3242),
    (0.7, 14.8938, 2.1801),
    (0.8, 10.4791, 2.0911),
    (0.9, 7.9285, 2.0352),
    (1.0, 6.3138, 2.0000),
    (1.1, 5.2229, 1.9777),
    (1.2, 4.4509, 1.9631),
    (1.3, 3.8865, 1.9528),
    (1.4, 3.4656, 1.9447),
    (1.5, 3.1498, 1.9379),
    (1.6, 2.9140, 1.9315),
    (1.7, 2.7394, 1.9255),
    (1.8, 2.6099, 1.9195),
    (1.9, 2.5128, 1.9136),
    (2.0, 2.4387, 1.9077),
];

/// Fitted law with optimiser diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    pub params: StableParams,
    /// Log-likelihood of the sample under `params`
    pub log_likelihood: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Median and IQR standardisation
#[derive(Debug, Clone, Copy)]
struct Standardisation {
    center: f64,
    spread: f64,
}

impl Standardisation {
    fn from_sorted(sorted: &[f64]) -> Result<Self, FitError> {
        let center = sample_quantile(sorted, 0.5);
        let spread = sample_quantile(sorted, 0.75) - sample_quantile(sorted, 0.25);
        if !(spread > 0.0 && spread.is_finite()) {
            return Err(FitError::EmptySample);
        }
        Ok(Self { center, spread })
    }

    fn apply(&self, x: f64) -> f64 {
        (x - self.center) / self.spread
    }
}

/// Starting point in standardised S0 coordinates
fn initial_guess(z_sorted: &[f64]) -> [f64; 4] {
    let iqr = sample_quantile(z_sorted, 0.75) - sample_quantile(z_sorted, 0.25);
    let ratio = (sample_quantile(z_sorted, 0.95) - sample_quantile(z_sorted, 0.05)) / iqr;
    let (alpha, law_iqr) = alpha_from_ratio(ratio);
    let scale = iqr / law_iqr;
    [alpha, 0.0, 0.0, scale.ln()]
}

/// Invert the ratio table by linear interpolation; the ratio falls as alpha grows
fn alpha_from_ratio(ratio: f64) -> (f64, f64) {
    let first = QUANTILE_RATIO_TABLE[0];
    let last = QUANTILE_RATIO_TABLE[QUANTILE_RATIO_TABLE.len() - 1];

    if !ratio.is_finite() || ratio >= first.1 {
        return (first.0, first.2);
    }
    if ratio <= last.1 {
        return (last.0, last.2);
    }

    QUANTILE_RATIO_TABLE
        .windows(2)
        .find(|pair| ratio <= pair[0].1 && ratio >= pair[1].1)
        .map(|pair| {
            let (a0, r0, q0) = pair[0];
            let (a1, r1, q1) = pair[1];
            let t = (r0 - ratio) / (r0 - r1);
            (a0 + t * (a1 - a0), q0 + t * (q1 - q0))
        })
        .unwrap_or((last.0, last.2))
}

/// Sum of log densities of standardised data at S0 coordinates `theta`
fn log_likelihood(z: &[f64], theta: &[f64]) -> f64 {
    let law = StandardStable::new(theta[0], theta[1]);
    let loc = theta[2];
    let ln_scale = theta[3];
    let scale = ln_scale.exp();
    let term = |x: &f64| law.pdf((x - loc) / scale).ln() - ln_scale;

    // Collect before summing so the total does not depend on thread scheduling
    #[cfg(feature = "parallel")]
    let terms: Vec<f64> = z.par_iter().map(term).collect();
    #[cfg(not(feature = "parallel"))]
    let terms: Vec<f64> = z.iter().map(term).collect();

    terms.iter().sum()
}

/// Fit a stable law to `sample` by maximum likelihood
pub fn fit_stable(sample: &[f64], options: &FitOptions) -> Result<FitParameters, FitError> {
    if sample.len() < 2 || sample.iter().any(|x| !x.is_finite()) {
        return Err(FitError::EmptySample);
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);
    let standard = Standardisation::from_sorted(&sorted)?;
    let z: Vec<f64> = sorted.iter().map(|&x| standard.apply(x)).collect();

    let start = initial_guess(&z);
    let bounds = [ALPHA_BOUNDS, BETA_BOUNDS, LOC_BOUNDS, LN_SCALE_BOUNDS];
    tracing::debug!(n = sample.len(), start = ?start, "Starting stable fit");

    let result = maximize(
        |theta: &[f64]| log_likelihood(&z, theta),
        &start,
        &INITIAL_STEP,
        &bounds,
        options,
    );

    // Jacobian of the standardisation
    let log_likelihood = result.objective_value - z.len() as f64 * standard.spread.ln();

    if result.termination_reason != TerminationReason::Converged {
        tracing::warn!(
            n = sample.len(),
            iterations = result.iterations,
            reason = ?result.termination_reason,
            "Stable fit did not converge"
        );
        return Err(FitError::NonConvergence {
            iterations: result.iterations,
            log_likelihood,
        });
    }

    let theta = &result.optimal_parameters;
    let params = StableParams::from_s0(
        theta[0],
        theta[1],
        standard.center + standard.spread * theta[2],
        standard.spread * theta[3].exp(),
    )?;

    tracing::debug!(
        n = sample.len(),
        iterations = result.iterations,
        evaluations = result.evaluations(),
        log_likelihood,
        "Stable fit converged"
    );

    Ok(FitParameters {
        params,
        log_likelihood,
        iterations: result.iterations,
        evaluations: result.evaluations(),
    })
}

/// Evaluated density of a fitted law, ready to plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    pub label: String,
    pub x: Vec<f64>,
    pub density: Vec<f64>,
}

impl DensityCurve {
    #[must_use]
    pub fn from_fit(label: impl Into<String>, params: &StableParams, x: Vec<f64>) -> Self {
        let density = x.iter().map(|&v| params.pdf(v)).collect();
        Self {
            label: label.into(),
            x,
            density,
        }
    }
}

/// `points` evenly spaced values from `lo` to `hi` inclusive
#[must_use]
pub fn linspace(lo: f64, hi: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (points - 1) as f64;
            (0..points)
                .map(|i| if i + 1 == points { hi } else { lo + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_alpha_from_ratio_table_ends() {
        assert_eq!(alpha_from_ratio(100.0).0, 0.5);
        assert_eq!(alpha_from_ratio(2.0).0, 2.0);
        assert_eq!(alpha_from_ratio(f64::NAN).0, 0.5);
    }

    #[test]
    fn test_alpha_from_ratio_interpolates() {
        let (alpha, iqr) = alpha_from_ratio(2.7394);
        assert!((alpha - 1.7).abs() < 1e-9);
        assert!((iqr - 1.9255).abs() < 1e-9);

        let (alpha, _) = alpha_from_ratio(0.5 * (6.3138 + 5.2229));
        assert!((alpha - 1.05).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_ratio_matches_table() {
        // q95 / q75 of a normal law
        let ratio: f64 = 1.644_853_626_951_472_2 / 0.674_489_750_196_081_7;
        assert!((ratio - 2.4387).abs() < 1e-4);
    }

    #[test]
    fn test_linspace() {
        let grid = linspace(-1.0, 1.0, 5);
        assert_eq!(grid, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
    }

    #[test]
    fn test_rejects_degenerate_samples() {
        let options = FitOptions::default();
        assert_eq!(fit_stable(&[], &options), Err(FitError::EmptySample));
        assert_eq!(fit_stable(&[1.0; 10], &options), Err(FitError::EmptySample));
        assert_eq!(
            fit_stable(&[1.0, f64::NAN, 2.0], &options),
            Err(FitError::EmptySample)
        );
    }

    #[test]
    fn test_density_curve_matches_pdf() {
        let params = StableParams::new(1.5, 0.2, -3.0, 2.0).unwrap();
        let curve = DensityCurve::from_fit("fit", &params, linspace(-10.0, 5.0, 7));
        assert_eq!(curve.label, "fit");
        assert_eq!(curve.x.len(), 7);
        for (x, d) in curve.x.iter().zip(&curve.density) {
            assert!((params.pdf(*x) - d).abs() < 1e-15);
        }
    }

    #[test]
    fn test_recovers_gaussian_like_sample() {
        let truth = StableParams::new(1.8, 0.0, 5.0, 2.0).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let sample = truth.sample_n(&mut rng, 250);

        let fit = fit_stable(&sample, &FitOptions::default()).unwrap();
        let (alpha, _, loc, scale) = fit.params.as_tuple();
        assert!((alpha - 1.8).abs() < 0.25, "alpha {alpha}");
        assert!((loc - 5.0).abs() < 0.5, "loc {loc}");
        assert!((scale - 2.0).abs() < 0.4, "scale {scale}");
        assert!(fit.log_likelihood.is_finite());
        assert!(fit.evaluations > fit.iterations);
    }

    #[test]
    fn test_tight_iteration_cap_reports_non_convergence() {
        let truth = StableParams::new(1.5, 0.0, 0.0, 1.0).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let sample = truth.sample_n(&mut rng, 50);

        let options = FitOptions {
            max_iterations: 2,
            ..FitOptions::default()
        };
        match fit_stable(&sample, &options) {
            Err(FitError::NonConvergence { iterations, .. }) => assert_eq!(iterations, 2),
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }
}
