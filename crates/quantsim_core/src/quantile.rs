//! Quantile extraction from an empirical CDF
//!
//! The inverse ECDF is smoothed with a piecewise cubic Hermite interpolant
//! (PCHIP) over the knots `(probability, value)`. PCHIP slopes are chosen so
//! that the interpolant stays monotone between knots, which matters here:
//! the quantile function must never decrease in `p`.

use crate::error::{ConfigError, TrialError};

/// Sorted distinct values with their ECDF probabilities
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalDistribution {
    values: Vec<f64>,
    probabilities: Vec<f64>,
}

impl EmpiricalDistribution {
    /// Build from an unsorted sample. Ties collapse into one knot carrying
    /// the cumulative count, so the last probability is exactly 1.
    pub fn from_sample(sample: &[f64]) -> Result<Self, TrialError> {
        if sample.iter().any(|x| !x.is_finite()) {
            return Err(TrialError::NonFinite);
        }

        let mut sorted = sample.to_vec();
        sorted.sort_by(f64::total_cmp);

        let m = sorted.len() as f64;
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut probabilities: Vec<f64> = Vec::with_capacity(sorted.len());

        for (i, &x) in sorted.iter().enumerate() {
            let p = (i + 1) as f64 / m;
            match values.last() {
                Some(&last) if last == x => {
                    if let Some(prob) = probabilities.last_mut() {
                        *prob = p;
                    }
                }
                _ => {
                    values.push(x);
                    probabilities.push(p);
                }
            }
        }

        Ok(Self {
            values,
            probabilities,
        })
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inverse ECDF as a monotone interpolant
    pub fn quantile_function(&self) -> Result<MonotoneInterpolator, TrialError> {
        MonotoneInterpolator::new(self.probabilities.clone(), self.values.clone())
    }
}

/// Piecewise cubic Hermite interpolant with shape-preserving slopes.
///
/// Knots must be strictly increasing in `x`. Outside `[x_0, x_last]` the
/// curve continues as a straight line with the end slope.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl MonotoneInterpolator {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, TrialError> {
        let n = x.len().min(y.len());
        if n < 2 {
            return Err(TrialError::InsufficientData(n));
        }
        if x.iter().chain(&y).any(|v| !v.is_finite()) {
            return Err(TrialError::NonFinite);
        }

        let slopes = pchip_slopes(&x[..n], &y[..n]);
        Ok(Self {
            x: x[..n].to_vec(),
            y: y[..n].to_vec(),
            slopes,
        })
    }

    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        let last = self.x.len() - 1;

        if t <= self.x[0] {
            return self.y[0] + self.slopes[0] * (t - self.x[0]);
        }
        if t >= self.x[last] {
            return self.y[last] + self.slopes[last] * (t - self.x[last]);
        }

        // First knot strictly greater than t, so k is the left end of the interval
        let k = self.x.partition_point(|&xi| xi <= t) - 1;
        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.y[k] + h10 * h * self.slopes[k] + h01 * self.y[k + 1] + h11 * h * self.slopes[k + 1]
    }
}

/// Fritsch-Butland interior slopes with one-sided three-point end slopes
fn pchip_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, hk)| (w[1] - w[0]) / hk)
        .collect();

    if n == 2 {
        return vec![delta[0]; 2];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (m0, m1) = (delta[k - 1], delta[k]);
        if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
    }

    d[0] = end_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

fn end_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if d.signum() != m0.signum() || d == 0.0 || m0 == 0.0 {
        0.0
    } else if m0.signum() != m1.signum() && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Extracts a fixed quantile from a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileEstimator {
    probability: f64,
}

impl QuantileEstimator {
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        if !(probability > 0.0 && probability < 1.0) {
            return Err(ConfigError::InvalidProbability(probability));
        }
        Ok(Self { probability })
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn estimate(&self, series: &[f64]) -> Result<f64, TrialError> {
        let ecdf = EmpiricalDistribution::from_sample(series)?;
        Ok(ecdf.quantile_function()?.evaluate(self.probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecdf_collapses_ties() {
        let ecdf = EmpiricalDistribution::from_sample(&[3.0, 1.0, 2.0, 2.0]).unwrap();
        assert_eq!(ecdf.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(ecdf.probabilities(), &[0.25, 0.75, 1.0]);
    }

    #[test]
    fn test_ecdf_probabilities_strictly_increasing() {
        let sample: Vec<f64> = (0..200).map(|i| ((i * 7919) % 101) as f64 * 0.5).collect();
        let ecdf = EmpiricalDistribution::from_sample(&sample).unwrap();
        let probs = ecdf.probabilities();
        assert!(probs.windows(2).all(|w| w[0] < w[1]));
        assert!(probs[0] > 0.0);
        assert_eq!(*probs.last().unwrap(), 1.0);
    }

    #[test]
    fn test_ecdf_rejects_nan() {
        assert_eq!(
            EmpiricalDistribution::from_sample(&[1.0, f64::NAN]),
            Err(TrialError::NonFinite)
        );
    }

    #[test]
    fn test_interpolant_passes_through_knots() {
        let x = vec![0.1, 0.2, 0.5, 0.7, 1.0];
        let y = vec![-3.0, -1.0, 0.0, 2.5, 10.0];
        let interp = MonotoneInterpolator::new(x.clone(), y.clone()).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((interp.evaluate(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_interpolant_is_monotone_including_extrapolation() {
        let x = vec![0.1, 0.15, 0.5, 0.55, 0.9, 1.0];
        let y = vec![-50.0, -1.0, -0.9, 4.0, 4.1, 100.0];
        let interp = MonotoneInterpolator::new(x, y).unwrap();

        let mut prev = f64::NEG_INFINITY;
        for i in 0..=2000 {
            let t = -0.2 + 1.4 * i as f64 / 2000.0;
            let v = interp.evaluate(t);
            assert!(v >= prev - 1e-12, "not monotone at {t}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn test_two_knots_are_linear() {
        let interp = MonotoneInterpolator::new(vec![0.5, 1.0], vec![1.0, 2.0]).unwrap();
        assert!((interp.evaluate(0.75) - 1.5).abs() < 1e-12);
        assert!((interp.evaluate(0.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_matches_reference_pchip_slopes() {
        // Interior slope is the weighted harmonic mean of 1 and 3
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 4.0];
        let d = pchip_slopes(&x, &y);
        assert!((d[1] - 1.5).abs() < 1e-12);
        // End slope: ((2 + 1) * 1 - 3) / 2 = 0
        assert_eq!(d[0], 0.0);
        // ((2 + 1) * 3 - 1) / 2 = 4
        assert!((d[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_needs_two_distinct_values() {
        let est = QuantileEstimator::new(0.01).unwrap();
        assert_eq!(
            est.estimate(&[1.0, 1.0, 1.0]),
            Err(TrialError::InsufficientData(1))
        );
        assert_eq!(est.estimate(&[]), Err(TrialError::InsufficientData(0)));
    }

    #[test]
    fn test_quantile_is_monotone_in_probability() {
        let sample: Vec<f64> = (0..741).map(|i| ((i * 31) % 97) as f64 - 48.0 + i as f64 * 1e-3).collect();
        let ecdf = EmpiricalDistribution::from_sample(&sample).unwrap();
        let q = ecdf.quantile_function().unwrap();
        let mut prev = f64::NEG_INFINITY;
        for i in 1..100 {
            let v = q.evaluate(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        assert!(QuantileEstimator::new(0.0).is_err());
        assert!(QuantileEstimator::new(1.0).is_err());
        assert!(QuantileEstimator::new(f64::NAN).is_err());
    }

    #[test]
    fn test_low_quantile_of_uniform_grid() {
        // 1..=100: knot at p = 0.01 is the minimum
        let sample: Vec<f64> = (1..=100).map(f64::from).collect();
        let est = QuantileEstimator::new(0.01).unwrap();
        assert!((est.estimate(&sample).unwrap() - 1.0).abs() < 1e-12);
    }
}
