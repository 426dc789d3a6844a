//! Kolmogorov-Smirnov goodness-of-fit tests
//!
//! One-sample p-values use the exact distribution of Marsaglia, Tsang and
//! Wang (2003) for n up to [`EXACT_LIMIT`], and the asymptotic Kolmogorov
//! law with Stephens' small-sample correction above that. Two-sample tests
//! on equal sizes use the exact lattice-path probability.

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Largest sample size that gets an exact p-value
pub const EXACT_LIMIT: usize = 10_000;

/// Test statistic with its two-sided p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    /// Largest absolute CDF difference
    pub statistic: f64,
    pub p_value: f64,
}

/// Test `sample` against a continuous distribution function
pub fn ks_one_sample<F>(sample: &[f64], cdf: F) -> Result<KsResult, FitError>
where
    F: Fn(f64) -> f64,
{
    if sample.is_empty() {
        return Err(FitError::EmptySample);
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = cdf(x);
            let above = (i + 1) as f64 / n - f;
            let below = f - i as f64 / n;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);

    Ok(KsResult {
        statistic,
        p_value: one_sample_p_value(sorted.len(), statistic),
    })
}

/// Test whether two samples come from the same distribution
pub fn ks_two_sample(first: &[f64], second: &[f64]) -> Result<KsResult, FitError> {
    if first.is_empty() || second.is_empty() {
        return Err(FitError::EmptySample);
    }

    let mut a = first.to_vec();
    let mut b = second.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n1, n2) = (a.len(), b.len());
    let (mut i, mut j) = (0, 0);
    let mut statistic = 0.0_f64;

    while i < n1 && j < n2 {
        let v = a[i].min(b[j]);
        // Step both ECDFs past every copy of v
        while i < n1 && a[i] <= v {
            i += 1;
        }
        while j < n2 && b[j] <= v {
            j += 1;
        }
        let gap = (i as f64 / n1 as f64 - j as f64 / n2 as f64).abs();
        statistic = statistic.max(gap);
    }

    let p_value = if n1 == n2 && n1 <= EXACT_LIMIT {
        let h = (statistic * n1 as f64).round() as usize;
        if h == 0 {
            1.0
        } else {
            prob_outside_square(n1, h)
        }
    } else {
        let effective = (n1 as f64 * n2 as f64 / (n1 + n2) as f64).round().max(1.0);
        one_sample_p_value(effective as usize, statistic)
    };

    Ok(KsResult {
        statistic,
        p_value: p_value.clamp(0.0, 1.0),
    })
}

/// Two-sided p-value of the one-sample statistic `d` for sample size `n`
#[must_use]
pub fn one_sample_p_value(n: usize, d: f64) -> f64 {
    if n == 0 || d.is_nan() {
        return f64::NAN;
    }
    if d <= 0.0 {
        return 1.0;
    }
    if d >= 1.0 {
        return 0.0;
    }

    let p = if n <= EXACT_LIMIT {
        1.0 - marsaglia_tsang_wang(n, d)
    } else {
        let sqrt_n = (n as f64).sqrt();
        kolmogorov_survival((sqrt_n + 0.12 + 0.11 / sqrt_n) * d)
    };
    p.clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution
#[must_use]
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }

    if lambda < 1.18 {
        // Theta-function form converges fast for small lambda
        let y = (-std::f64::consts::PI.powi(2) / (8.0 * lambda * lambda)).exp();
        let series = y + y.powi(9) + y.powi(25) + y.powi(49);
        return (1.0 - (2.0 * std::f64::consts::PI).sqrt() / lambda * series).clamp(0.0, 1.0);
    }

    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let j = f64::from(j);
        let term = (-2.0 * j * j * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-17 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// `P(D_n < d)` by the Marsaglia-Tsang-Wang matrix method
fn marsaglia_tsang_wang(n: usize, d: f64) -> f64 {
    let nf = n as f64;

    // Tail approximation, accurate to 7 digits when it applies
    let s = d * d * nf;
    if s > 7.24 || (s > 3.76 && n > 99) {
        return 1.0 - 2.0 * (-(2.000_071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
    }

    let k = (nf * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut matrix = vec![0.0; m * m];
    for i in 0..m {
        for j in 0..m {
            if i + 1 >= j {
                matrix[i * m + j] = 1.0;
            }
        }
    }
    for i in 0..m {
        matrix[i * m] -= h.powi(i as i32 + 1);
        matrix[(m - 1) * m + i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        matrix[(m - 1) * m] += (2.0 * h - 1.0).powi(m as i32);
    }
    for i in 0..m {
        for j in 0..m {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    matrix[i * m + j] /= g as f64;
                }
            }
        }
    }

    let (power, mut exponent) = matrix_power(&matrix, 0, m, n);
    let mut s = power[(k - 1) * m + k - 1];
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1e-140 {
            s *= 1e140;
            exponent -= 140;
        }
    }
    s * 10f64.powi(exponent)
}

fn matrix_multiply(a: &[f64], b: &[f64], m: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * m];
    for i in 0..m {
        for k in 0..m {
            let aik = a[i * m + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..m {
                out[i * m + j] += aik * b[k * m + j];
            }
        }
    }
    out
}

/// `a^n` with a decimal exponent kept aside to avoid overflow
fn matrix_power(a: &[f64], a_exponent: i32, m: usize, n: usize) -> (Vec<f64>, i32) {
    if n == 1 {
        return (a.to_vec(), a_exponent);
    }

    let (half, half_exponent) = matrix_power(a, a_exponent, m, n / 2);
    let squared = matrix_multiply(&half, &half, m);
    let (mut out, mut exponent) = if n % 2 == 0 {
        (squared, 2 * half_exponent)
    } else {
        (
            matrix_multiply(a, &squared, m),
            a_exponent + 2 * half_exponent,
        )
    };

    if out[(m / 2) * m + m / 2] > 1e140 {
        for v in &mut out {
            *v *= 1e-140;
        }
        exponent += 140;
    }
    (out, exponent)
}

/// Probability that a random lattice path for two samples of size `n`
/// leaves the band `|i - j| < h`
pub(crate) fn prob_outside_square(n: usize, h: usize) -> f64 {
    let nf = n as f64;
    let mut p = 0.0;

    for k in (0..=n / h).rev() {
        let kh = (k * h) as f64;
        let mut term = 1.0;
        for j in 0..h {
            let j = j as f64;
            term = (nf - kh - j) * term / (nf + kh + j + 1.0);
        }
        p = term * (1.0 - p);
    }

    2.0 * p
}
