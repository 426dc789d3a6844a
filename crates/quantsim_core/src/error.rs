/// Errors raised while validating parameters, before any sampling happens
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid stable parameters (alpha={alpha}, beta={beta}, scale={scale}): {reason}")]
    InvalidStableParameters {
        alpha: f64,
        beta: f64,
        scale: f64,
        reason: &'static str,
    },

    #[error("window width must be at least 1")]
    ZeroWindow,

    #[error("quantile probability {0} must lie strictly between 0 and 1")]
    InvalidProbability(f64),

    #[error("{what} must be positive")]
    ZeroCount { what: &'static str },

    #[error("{0} ladder is empty")]
    EmptyLadder(&'static str),

    #[error("degenerate bound {0} must be positive")]
    InvalidBound(f64),
}

/// Errors produced inside a single Monte Carlo trial
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrialError {
    #[error("need at least 2 distinct values to interpolate, got {0}")]
    InsufficientData(usize),

    #[error("series contains a non-finite value")]
    NonFinite,
}

/// Errors from fitting a stable law to a sample
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("cannot fit an empty or constant sample")]
    EmptySample,

    #[error("fit did not converge after {iterations} iterations (log-likelihood={log_likelihood})")]
    NonConvergence {
        iterations: usize,
        log_likelihood: f64,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("trial failed: {0}")]
    Trial(#[from] TrialError),

    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
