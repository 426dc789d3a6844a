//! Daily return generation

use rand::Rng;

use crate::error::ConfigError;
use crate::model::StableParams;

/// Draws i.i.d. heavy-tailed daily returns from a stable law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnGenerator {
    params: StableParams,
    days: usize,
}

impl ReturnGenerator {
    pub fn new(params: StableParams, days: usize) -> Result<Self, ConfigError> {
        params.validate()?;
        if days == 0 {
            return Err(ConfigError::ZeroCount {
                what: "number of daily returns",
            });
        }
        Ok(Self { params, days })
    }

    #[must_use]
    pub fn params(&self) -> &StableParams {
        &self.params
    }

    #[must_use]
    pub fn days(&self) -> usize {
        self.days
    }

    /// One series of `days` returns
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.params.sample_n(rng, self.days)
    }
}
