//! Four-parameter stable law: validation, sampling, density

use std::f64::consts::{FRAC_PI_2, PI};

use rand::{Rng, distr::Distribution, distr::Open01};
use rand_distr::Exp1;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::density::StandardStable;

/// Stable law S(alpha, beta, loc, scale) in Nolan's S1 parameterisation.
///
/// S1 is the classic characteristic-function form
/// `exp(-|c t|^a (1 - i b sign(t) tan(pi a / 2)) + i mu t)` and is what the
/// sampler produces directly. For `beta = 0` it coincides with S0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StableParams {
    alpha: f64,
    beta: f64,
    loc: f64,
    scale: f64,
}

impl StableParams {
    /// Daily return shocks: alpha = 1.7, symmetric, loc 1, scale 1
    pub const DAILY_RETURNS: StableParams = StableParams {
        alpha: 1.7,
        beta: 0.0,
        loc: 1.0,
        scale: 1.0,
    };

    pub fn new(alpha: f64, beta: f64, loc: f64, scale: f64) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidStableParameters {
            alpha,
            beta,
            scale,
            reason,
        };

        if !(alpha > 0.0 && alpha <= 2.0) {
            return Err(invalid("alpha must lie in (0, 2]"));
        }
        if !(-1.0..=1.0).contains(&beta) {
            return Err(invalid("beta must lie in [-1, 1]"));
        }
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(invalid("scale must be positive and finite"));
        }
        if !loc.is_finite() {
            return Err(invalid("location must be finite"));
        }

        Ok(Self {
            alpha,
            beta,
            loc,
            scale,
        })
    }

    /// Build from S0 coordinates (`loc0` is the S0 location)
    pub fn from_s0(alpha: f64, beta: f64, loc0: f64, scale: f64) -> Result<Self, ConfigError> {
        let loc = loc0 - s0_shift(alpha, beta, scale);
        Self::new(alpha, beta, loc, scale)
    }

    /// Re-checks the invariants; useful after deserialisation
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::new(self.alpha, self.beta, self.loc, self.scale).map(|_| ())
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    #[must_use]
    pub fn loc(&self) -> f64 {
        self.loc
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Location in the S0 parameterisation
    #[must_use]
    pub fn loc_s0(&self) -> f64 {
        self.loc + s0_shift(self.alpha, self.beta, self.scale)
    }

    /// `(alpha, beta, loc, scale)`
    #[must_use]
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.alpha, self.beta, self.loc, self.scale)
    }

    fn standardize(&self, x: f64) -> f64 {
        (x - self.loc_s0()) / self.scale
    }

    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        StandardStable::new(self.alpha, self.beta).pdf(self.standardize(x)) / self.scale
    }

    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        StandardStable::new(self.alpha, self.beta).cdf(self.standardize(x))
    }

    /// Draw `n` independent values
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// S0 location minus S1 location
fn s0_shift(alpha: f64, beta: f64, scale: f64) -> f64 {
    if (alpha - 1.0).abs() < f64::EPSILON {
        beta * 2.0 / PI * scale * scale.ln()
    } else {
        beta * scale * (PI * alpha / 2.0).tan()
    }
}

impl Distribution<f64> for StableParams {
    /// Chambers-Mallows-Stuck
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let v = PI * (rng.sample::<f64, _>(Open01) - 0.5);
        let w: f64 = rng.sample(Exp1);

        if (self.alpha - 1.0).abs() < f64::EPSILON {
            let lead = FRAC_PI_2 + self.beta * v;
            let x = 2.0 / PI
                * (lead * v.tan() - self.beta * (FRAC_PI_2 * w * v.cos() / lead).ln());
            return self.scale * x + 2.0 / PI * self.beta * self.scale * self.scale.ln() + self.loc;
        }

        let a = self.alpha;
        let t = self.beta * (PI * a / 2.0).tan();
        let b = t.atan() / a;
        let s = (1.0 + t * t).powf(1.0 / (2.0 * a));
        let x = s * (a * (v + b)).sin() / v.cos().powf(1.0 / a)
            * ((v - a * (v + b)).cos() / w).powf((1.0 - a) / a);

        self.scale * x + self.loc
    }
}
