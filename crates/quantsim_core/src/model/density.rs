//! Density and distribution function of the standard stable law
//!
//! Evaluated through Nolan's (1997) integral representation in the S0
//! parameterisation, which is continuous in all four parameters. The
//! integrand over `theta` can concentrate within rounding distance of either
//! end of its interval (alpha near 1 with |beta| near 1, or far into a light
//! tail), so each half of the interval is integrated in the logarithm of the
//! offset from its own end, with every trigonometric term rewritten to keep
//! full precision there. Only the window where the integrand is not
//! negligible is handed to quadrature, split at its peak (`k * V(theta) = 1`).

use std::f64::consts::{FRAC_PI_2, PI};

use statrs::function::erf::erfc;
use statrs::function::gamma::gamma;

use crate::integrate::adaptive_simpson;

/// Below this distance from 1, alpha is treated as exactly 1
const ALPHA_ONE_TOLERANCE: f64 = 1e-5;
/// Relative distance from zeta below which the closed form at zeta is used
const ZETA_TOLERANCE: f64 = 1e-10;
const REL_TOLERANCE: f64 = 1e-9;
const PANELS_PER_SIDE: usize = 8;
const BISECTIONS: usize = 80;
/// `ln(k V)` below which `k V exp(-k V)` is dropped and `exp(-k V)` is 1
const LN_KV_FLOOR: f64 = -64.0;
/// `ln(k V)` above which both integrands vanish
const LN_KV_CEILING: f64 = 4.5;

/// Standard (loc 0, scale 1) stable law in the S0 parameterisation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardStable {
    alpha: f64,
    beta: f64,
}

impl StandardStable {
    /// Parameters are assumed validated: alpha in (0, 2], beta in [-1, 1]
    #[must_use]
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Probability density at `x`
    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x.is_infinite() {
            return 0.0;
        }
        if (self.alpha - 2.0).abs() < f64::EPSILON {
            // N(0, 2)
            return (-x * x / 4.0).exp() / (2.0 * PI.sqrt());
        }
        if (self.alpha - 1.0).abs() < ALPHA_ONE_TOLERANCE {
            return alpha_one(x, self.beta, Quantity::Density);
        }
        alpha_not_one(x, self.alpha, self.beta, Quantity::Density)
    }

    /// Cumulative distribution function at `x`
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        if x == f64::INFINITY {
            return 1.0;
        }
        if x == f64::NEG_INFINITY {
            return 0.0;
        }
        if (self.alpha - 2.0).abs() < f64::EPSILON {
            return 0.5 * erfc(-x / 2.0);
        }
        if (self.alpha - 1.0).abs() < ALPHA_ONE_TOLERANCE {
            return alpha_one(x, self.beta, Quantity::Distribution);
        }
        alpha_not_one(x, self.alpha, self.beta, Quantity::Distribution)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Density,
    Distribution,
}

impl Quantity {
    /// Value at `-x` of the law with `-beta`, mapped back to `x`
    fn reflect(self, value: f64) -> f64 {
        match self {
            Quantity::Density => value,
            Quantity::Distribution => 1.0 - value,
        }
    }

    /// Integrand at `ln(k V) = w`
    fn integrand(self, w: f64) -> f64 {
        match self {
            Quantity::Density => (w - w.exp()).exp(),
            Quantity::Distribution => (-w.exp()).exp(),
        }
    }
}

/// NaN sorts above everything, as `V` overflows towards it
fn ordered(v: f64) -> f64 {
    if v.is_nan() { f64::INFINITY } else { v }
}

/// Root of `w(s) = level` for monotone `w` on `[lo, hi]`, if it changes sides
fn crossing<F: Fn(f64) -> f64>(w: &F, level: f64, lo: f64, hi: f64) -> Option<f64> {
    let hi_above = ordered(w(hi)) >= level;
    if (ordered(w(lo)) >= level) == hi_above {
        return None;
    }
    let (mut a, mut b) = (lo, hi);
    for _ in 0..BISECTIONS {
        let m = 0.5 * (a + b);
        if (ordered(w(m)) >= level) == hi_above {
            b = m;
        } else {
            a = m;
        }
    }
    Some(0.5 * (a + b))
}

/// Integral over offsets `t` in `(0, half]` from one end of the `theta`
/// interval, where `ln_kv(t)` is `ln(k V)` and monotone in `t`.
///
/// Works in `s = ln t` over the window `LN_KV_FLOOR <= ln(k V) <= LN_KV_CEILING`.
/// For the distribution function the offsets below the window contribute
/// their length, since `exp(-k V)` is 1 there.
fn integrate_half<F: Fn(f64) -> f64>(ln_kv: F, half: f64, quantity: Quantity) -> f64 {
    let lo = f64::MIN_POSITIVE.ln();
    let hi = half.ln();
    if !(hi > lo) {
        return 0.0;
    }

    let w = |s: f64| ordered(ln_kv(s.exp()));
    let (w_lo, w_hi) = (w(lo), w(hi));
    let cross = |level: f64, otherwise: f64| crossing(&w, level, lo, hi).unwrap_or(otherwise);

    let (start, end, saturated) = if w_hi >= w_lo {
        let start = if w_lo >= LN_KV_FLOOR { lo } else { cross(LN_KV_FLOOR, hi) };
        let end = if w_hi <= LN_KV_CEILING { hi } else { cross(LN_KV_CEILING, lo) };
        let saturated = if w_lo < LN_KV_FLOOR { start.exp() } else { 0.0 };
        (start, end, saturated)
    } else {
        let start = if w_lo <= LN_KV_CEILING { lo } else { cross(LN_KV_CEILING, hi) };
        let end = if w_hi >= LN_KV_FLOOR { hi } else { cross(LN_KV_FLOOR, lo) };
        let saturated = if w_hi < LN_KV_FLOOR { half - end.exp() } else { 0.0 };
        (start, end, saturated)
    };

    let window = if end > start {
        let f = |s: f64| quantity.integrand(ln_kv(s.exp())) * s.exp();
        match crossing(&w, 0.0, start, end) {
            Some(peak) => {
                adaptive_simpson(&f, start, peak, REL_TOLERANCE, PANELS_PER_SIDE)
                    + adaptive_simpson(&f, peak, end, REL_TOLERANCE, PANELS_PER_SIDE)
            }
            None => adaptive_simpson(&f, start, end, REL_TOLERANCE, PANELS_PER_SIDE),
        }
    } else {
        0.0
    };

    match quantity {
        Quantity::Density => window,
        Quantity::Distribution => saturated + window,
    }
}

/// Angles bounding the `theta` interval `(-xi, pi/2)` for alpha != 1,
/// arranged so that quantities vanishing at either end keep full precision
#[derive(Debug, Clone, Copy)]
struct Interval {
    /// `alpha * xi = atan(-zeta)`
    alpha_xi: f64,
    /// `alpha` times the interval length `pi/2 + xi`
    alpha_width: f64,
    /// `alpha * (pi/2 - xi)`; `cos(theta) = sin(gap_lo + t)` at offset `t` from `-xi`
    alpha_gap_lo: f64,
    /// `pi - alpha_width`; `sin(alpha (xi + theta)) = sin(gap_hi + alpha t)` at offset `t` from `pi/2`
    gap_hi: f64,
}

impl Interval {
    fn new(alpha: f64, beta: f64) -> Self {
        if alpha < 1.0 {
            let t = (PI * alpha / 2.0).tan();
            let (a, b) = (t.atan(), (beta * t).atan());
            Self {
                alpha_xi: b,
                alpha_width: a + b,
                alpha_gap_lo: a - b,
                gap_hi: PI * (1.0 - alpha) + (a - b),
            }
        } else {
            let t = (PI * (2.0 - alpha) / 2.0).tan();
            let (a, b) = (t.atan(), (-beta * t).atan());
            let gap_hi = a - b;
            Self {
                alpha_xi: b,
                alpha_width: PI * (alpha - 1.0) + (a + b),
                alpha_gap_lo: PI * (alpha - 1.0) + gap_hi,
                gap_hi,
            }
        }
    }
}

/// pdf or cdf for alpha != 1
fn alpha_not_one(x: f64, alpha: f64, beta: f64, quantity: Quantity) -> f64 {
    let zeta = -beta * (PI * alpha / 2.0).tan();
    let interval = Interval::new(alpha, beta);
    let xi = interval.alpha_xi / alpha;

    if (x - zeta).abs() <= ZETA_TOLERANCE * zeta.abs().max(1.0) {
        return match quantity {
            Quantity::Density => {
                gamma(1.0 + 1.0 / alpha) * xi.cos()
                    / (PI * (1.0 + zeta * zeta).powf(1.0 / (2.0 * alpha)))
            }
            Quantity::Distribution => (FRAC_PI_2 - xi) / PI,
        };
    }

    if x < zeta {
        return quantity.reflect(alpha_not_one(-x, alpha, -beta, quantity));
    }

    let xz = x - zeta;
    let a1 = alpha / (alpha - 1.0);
    let ln_k = a1 * xz.ln() + interval.alpha_xi.cos().max(0.0).ln() / (alpha - 1.0);
    let width = interval.alpha_width / alpha;
    let gap_lo = interval.alpha_gap_lo / alpha;
    let gap_hi = interval.gap_hi;

    // ln(k V) from cos(theta), sin(alpha (xi + theta)) and cos(alpha xi + (alpha - 1) theta)
    let ln_kv = |cos_t: f64, sin_t: f64, tail: f64| {
        ln_k + cos_t.max(0.0).ln() / (alpha - 1.0) - a1 * sin_t.max(0.0).ln() + tail.max(0.0).ln()
    };

    let from_lo = |t: f64| {
        let (cos_t, tail) = if gap_lo <= FRAC_PI_2 {
            ((gap_lo + t).sin(), (gap_lo + (1.0 - alpha) * t).sin())
        } else {
            ((width - t).sin(), (width + (alpha - 1.0) * t).sin())
        };
        ln_kv(cos_t, (alpha * t).sin(), tail)
    };
    let from_hi = |t: f64| {
        let (sin_t, tail) = if gap_hi <= FRAC_PI_2 {
            ((gap_hi + alpha * t).sin(), (gap_hi + (alpha - 1.0) * t).sin())
        } else {
            let aw = interval.alpha_width;
            ((aw - alpha * t).sin(), (aw - (alpha - 1.0) * t).sin())
        };
        ln_kv(t.sin(), sin_t, tail)
    };

    let integral = integrate_half(from_lo, 0.5 * width, quantity)
        + integrate_half(from_hi, 0.5 * width, quantity);

    match quantity {
        Quantity::Density => (alpha / (PI * (alpha - 1.0).abs() * xz) * integral).max(0.0),
        Quantity::Distribution => {
            let cdf = if alpha < 1.0 {
                (gap_lo + integral) / PI
            } else {
                1.0 - integral / PI
            };
            cdf.clamp(0.0, 1.0)
        }
    }
}

/// pdf or cdf for alpha == 1
fn alpha_one(x: f64, beta: f64, quantity: Quantity) -> f64 {
    if beta == 0.0 {
        return match quantity {
            Quantity::Density => 1.0 / (PI * (1.0 + x * x)),
            Quantity::Distribution => 0.5 + x.atan() / PI,
        };
    }
    if beta < 0.0 {
        return quantity.reflect(alpha_one(-x, -beta, quantity));
    }

    let ln_k = (2.0 / PI).ln() - PI * x / (2.0 * beta);

    // theta = -pi/2 + t
    let from_lo = |t: f64| {
        let lead = FRAC_PI_2 * (1.0 - beta) + beta * t;
        ln_k + lead.max(0.0).ln() - t.sin().ln() - lead / (beta * t.tan())
    };
    // theta = pi/2 - t
    let from_hi = |t: f64| {
        let lead = FRAC_PI_2 * (1.0 + beta) - beta * t;
        ln_k + lead.max(0.0).ln() - t.sin().ln() + lead / (beta * t.tan())
    };

    let integral = integrate_half(from_lo, FRAC_PI_2, quantity)
        + integrate_half(from_hi, FRAC_PI_2, quantity);

    match quantity {
        Quantity::Density => (integral / (2.0 * beta)).max(0.0),
        Quantity::Distribution => (integral / PI).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1e-300)
    }

    #[test]
    fn test_gaussian_limit() {
        let law = StandardStable::new(2.0, 0.0);
        assert!(close(law.pdf(0.0), 1.0 / (2.0 * PI.sqrt()), 1e-12));
        assert!(close(law.cdf(0.0), 0.5, 1e-12));
    }

    #[test]
    fn test_gaussian_tail_cdf() {
        // N(0, 2) at -3 and -6 standard deviations
        let law = StandardStable::new(2.0, 0.0);
        let sd = std::f64::consts::SQRT_2;
        assert!(close(law.cdf(-3.0 * sd), 1.349_898_031_630_094_5e-3, 1e-12));
        assert!(close(law.cdf(-6.0 * sd), 9.865_876_450_376_981e-10, 1e-12));
        assert!(close(law.cdf(3.0 * sd), 1.0 - 1.349_898_031_630_094_5e-3, 1e-14));
    }

    #[test]
    fn test_cauchy_closed_form() {
        let law = StandardStable::new(1.0, 0.0);
        assert!(close(law.pdf(2.0), 1.0 / (5.0 * PI), 1e-12));
        assert!(close(law.cdf(1.0), 0.75, 1e-12));
    }

    #[test]
    fn test_density_at_mode_symmetric() {
        // f(0) = Gamma(1 + 1/alpha) / pi for beta = 0
        let law = StandardStable::new(1.5, 0.0);
        assert!(close(law.pdf(0.0), gamma(1.0 + 1.0 / 1.5) / PI, 1e-10));
        assert!(close(law.cdf(0.0), 0.5, 1e-10));
    }

    #[test]
    fn test_reference_values() {
        // Characteristic-function inversion reference values
        let law = StandardStable::new(1.7, 0.0);
        assert!(close(law.pdf(0.5), 0.263_315_934_072_1, 1e-7));
        assert!(close(law.pdf(3.0), 0.030_628_330_843_7, 1e-7));
        assert!(close(law.pdf(40.0), 1.066_596_383_87e-5, 1e-5));

        let skewed = StandardStable::new(1.7, 0.5);
        assert!(close(skewed.pdf(-2.0), 0.086_124_645_899_1, 1e-7));
        assert!(close(skewed.pdf(10.0), 7.988_307_293_5e-4, 1e-6));

        let low = StandardStable::new(0.8, 0.3);
        assert!(close(low.pdf(0.3), 0.256_620_763_262_7, 1e-7));
        assert!(close(low.pdf(-1.0), 0.129_759_125_85, 1e-6));

        let near_one = StandardStable::new(1.2, -0.7);
        assert!(close(near_one.pdf(1.0), 0.205_889_509_856_7, 1e-7));
    }

    #[test]
    fn test_symmetric_cdf() {
        let law = StandardStable::new(1.7, 0.0);
        for x in [0.3, 1.0, 2.5, 7.0] {
            let sum = law.cdf(x) + law.cdf(-x);
            assert!((sum - 1.0).abs() < 1e-8, "x={x} sum={sum}");
        }
    }

    #[test]
    fn test_cdf_is_monotone() {
        let law = StandardStable::new(1.3, 0.4);
        let mut prev = 0.0;
        for i in -40..=40 {
            let c = law.cdf(f64::from(i) * 0.5);
            assert!(c >= prev - 1e-12, "cdf decreased at {i}");
            prev = c;
        }
    }

    #[test]
    fn test_pdf_matches_cdf_derivative() {
        let law = StandardStable::new(1.7, 0.3);
        let h = 1e-4;
        for x in [-3.0, -0.5, 0.2, 1.5, 6.0] {
            let numeric = (law.cdf(x + h) - law.cdf(x - h)) / (2.0 * h);
            assert!(close(law.pdf(x), numeric, 1e-4), "x={x}");
        }
    }

    #[test]
    fn test_near_one_totally_skewed() {
        // Characteristic-function inversion reference values
        let above = StandardStable::new(1.02, -1.0);
        assert!(close(above.pdf(1.0), 0.221_056_717_277_731_5, 1e-8));
        assert!(close(above.pdf(3.0), 5.210_116_805_588_484e-10, 1e-6));

        let below = StandardStable::new(0.98, -1.0);
        assert!(close(below.pdf(1.0), 0.222_508_154_540_251_7, 1e-8));

        let h = 1e-4;
        for x in [-2.0, 0.0, 0.5, 2.0] {
            let numeric = (above.cdf(x + h) - above.cdf(x - h)) / (2.0 * h);
            assert!(close(above.pdf(x), numeric, 1e-4), "x={x}");
        }
    }

    #[test]
    fn test_continuous_across_alpha_one() {
        for beta in [-1.0, -0.5, 1.0] {
            for x in [-1.0, 0.0, 1.0, 2.0] {
                let at_one = StandardStable::new(1.0, beta);
                for alpha in [1.0 - 2e-5, 1.0 + 2e-5] {
                    let near = StandardStable::new(alpha, beta);
                    assert!(close(near.pdf(x), at_one.pdf(x), 1e-3), "alpha={alpha} beta={beta} x={x}");
                    assert!((near.cdf(x) - at_one.cdf(x)).abs() < 1e-4, "alpha={alpha} beta={beta} x={x}");
                }
            }
        }
    }

    #[test]
    fn test_density_cost_near_alpha_one() {
        // Maximum likelihood fits of one-sided samples end up here
        let law = StandardStable::new(1.02, -1.0);
        let start = std::time::Instant::now();
        let total: f64 = (0..200).map(|i| law.pdf(-10.0 + 0.07 * f64::from(i))).sum();
        let elapsed = start.elapsed();
        assert!(total.is_finite() && total > 0.0);
        assert!(elapsed.as_secs_f64() < 5.0, "200 densities took {elapsed:?}");
    }

    #[test]
    fn test_support_edge_for_small_alpha() {
        // alpha < 1 and beta = 1: support is [zeta, inf)
        let law = StandardStable::new(0.6, 1.0);
        let zeta = -(PI * 0.3).tan();
        assert_eq!(law.pdf(zeta - 1.0), 0.0);
        assert!(law.cdf(zeta - 1.0) < 1e-12);
        assert!(law.pdf(0.0) > 0.0);
    }

    #[test]
    fn test_alpha_one_skewed() {
        let law = StandardStable::new(1.0, 0.5);
        let h = 1e-4;
        let x = 0.2;
        let numeric = (law.cdf(x + h) - law.cdf(x - h)) / (2.0 * h);
        assert!(close(law.pdf(x), numeric, 1e-4));
    }
}
