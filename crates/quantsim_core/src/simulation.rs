//! Monte Carlo driver for the quantile estimator
//!
//! One trial draws a series of daily returns, compounds it over overlapping
//! windows and reads the low quantile off the smoothed inverse ECDF. The
//! [`QuantileSampler`] owns the random stream and repeats trials.

use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::{AnalysisConfig, DegeneratePolicy, Execution, MeanStage};
use crate::error::{ConfigError, Result, SimulationError, TrialError};
use crate::metrics::TrialMetrics;
use crate::quantile::QuantileEstimator;
use crate::returns::ReturnGenerator;
use crate::window::compounded_returns;

/// Accepted per-trial estimates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantileSample {
    pub values: Vec<f64>,
    /// Trials that produced no value
    pub discarded: usize,
}

impl QuantileSample {
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Mean of the estimates with a normal-approximation 95% interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub sample_size: usize,
    pub mean: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    /// `std_dev / sqrt(N)`
    pub std_error: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub discarded: usize,
}

impl MonteCarloSummary {
    pub fn from_sample(sample: &QuantileSample) -> std::result::Result<Self, TrialError> {
        let n = sample.len();
        if n == 0 {
            return Err(TrialError::InsufficientData(0));
        }

        let count = n as f64;
        let mean = sample.values.iter().sum::<f64>() / count;
        let variance = sample
            .values
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / count;
        let std_dev = variance.sqrt();
        let std_error = std_dev / count.sqrt();

        Ok(Self {
            sample_size: n,
            mean,
            std_dev,
            std_error,
            ci_low: mean - 2.0 * std_error,
            ci_high: mean + 2.0 * std_error,
            discarded: sample.discarded,
        })
    }

    /// Whether `value` lies inside the confidence interval
    #[must_use]
    pub fn covers(&self, value: f64) -> bool {
        self.ci_low <= value && value <= self.ci_high
    }
}

/// One repeat of the mean-estimation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanStageRun {
    pub summary: MonteCarloSummary,
    pub sample: QuantileSample,
}

/// Everything a trial needs apart from the random stream
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrialPlan {
    generator: ReturnGenerator,
    window: usize,
    estimator: QuantileEstimator,
    policy: DegeneratePolicy,
    degenerate_bound: f64,
}

struct BatchOutcome {
    values: Vec<f64>,
    metrics: TrialMetrics,
}

impl TrialPlan {
    fn trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let returns = self.generator.generate(rng);
        let windows = compounded_returns(&returns, self.window)?;
        Ok(self.estimator.estimate(&windows)?)
    }

    fn is_degenerate(&self, value: f64) -> bool {
        !value.is_finite() || value.abs() > self.degenerate_bound
    }

    fn run_batch<R: Rng + ?Sized>(&self, rng: &mut R, trials: usize) -> Result<BatchOutcome> {
        let mut values = Vec::with_capacity(trials);
        let mut metrics = TrialMetrics::new();

        for _ in 0..trials {
            match self.trial(rng) {
                Ok(value) if self.is_degenerate(value) => match self.policy {
                    DegeneratePolicy::Discard => {
                        tracing::warn!(value, "Discarding degenerate quantile estimate");
                        metrics.record_degenerate_discarded();
                    }
                    DegeneratePolicy::Propagate => {
                        metrics.record_degenerate_propagated();
                        values.push(value);
                    }
                },
                Ok(value) => {
                    metrics.record_accepted();
                    values.push(value);
                }
                Err(SimulationError::Trial(err)) => match self.policy {
                    DegeneratePolicy::Discard => {
                        tracing::warn!(error = %err, "Discarding failed trial");
                        metrics.record_insufficient();
                    }
                    DegeneratePolicy::Propagate => return Err(err.into()),
                },
                Err(err) => return Err(err),
            }
        }

        Ok(BatchOutcome { values, metrics })
    }
}

/// Repeats quantile trials on an owned, seeded random stream
#[derive(Debug, Clone)]
pub struct QuantileSampler {
    plan: TrialPlan,
    execution: Execution,
    rng: StdRng,
    metrics: TrialMetrics,
}

impl QuantileSampler {
    /// Build from a validated configuration, seeded with `config.seed`
    pub fn new(config: &AnalysisConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let plan = TrialPlan {
            generator: ReturnGenerator::new(config.returns, config.days)?,
            window: config.window,
            estimator: QuantileEstimator::new(config.probability)?,
            policy: config.degenerate_policy,
            degenerate_bound: config.degenerate_bound,
        };

        Ok(Self {
            plan,
            execution: config.execution,
            rng: StdRng::seed_from_u64(config.seed),
            metrics: TrialMetrics::new(),
        })
    }

    /// Restart the stream from `seed`
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Counters accumulated over every draw since construction
    #[must_use]
    pub fn metrics(&self) -> &TrialMetrics {
        &self.metrics
    }

    /// A single trial on the sampler's stream, without the degenerate policy
    pub fn trial(&mut self) -> Result<f64> {
        self.plan.trial(&mut self.rng)
    }

    /// Run `n` trials and collect the accepted estimates
    pub fn draw(&mut self, n: usize) -> Result<QuantileSample> {
        let outcomes = match self.execution {
            Execution::Sequential => vec![self.plan.run_batch(&mut self.rng, n)?],
            Execution::Parallel { batches } => self.draw_batched(n, batches.max(1))?,
        };

        let mut sample = QuantileSample {
            values: Vec::with_capacity(n),
            discarded: 0,
        };
        let mut metrics = TrialMetrics::new();
        for outcome in outcomes {
            sample.values.extend(outcome.values);
            metrics.merge(&outcome.metrics);
        }
        sample.discarded = metrics.discarded() as usize;
        self.metrics.merge(&metrics);

        if sample.discarded > 0 {
            tracing::warn!(
                discarded = sample.discarded,
                trials = n,
                "Some trials produced no usable estimate"
            );
        }

        Ok(sample)
    }

    /// Batch seeds come off the master stream in order, so the result only
    /// depends on the seed and the batch count.
    fn draw_batched(&mut self, n: usize, batches: usize) -> Result<Vec<BatchOutcome>> {
        let base = n / batches;
        let extra = n % batches;
        let jobs: Vec<(u64, usize)> = (0..batches)
            .map(|i| (self.rng.next_u64(), base + usize::from(i < extra)))
            .collect();

        let plan = self.plan;
        let run = move |(seed, trials): (u64, usize)| {
            let mut rng = SmallRng::seed_from_u64(seed);
            plan.run_batch(&mut rng, trials)
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<BatchOutcome>> = jobs.into_par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<BatchOutcome>> = jobs.into_iter().map(run).collect();

        outcomes.into_iter().collect()
    }

    /// Draw `stage.repeats` samples of `stage.sample_size` on the continuing stream
    pub fn mean_estimation(&mut self, stage: MeanStage) -> Result<Vec<MeanStageRun>> {
        (0..stage.repeats)
            .map(|repeat| {
                let sample = self.draw(stage.sample_size)?;
                let summary = MonteCarloSummary::from_sample(&sample)?;
                tracing::debug!(
                    repeat,
                    mean = summary.mean,
                    std_error = summary.std_error,
                    "Mean stage repeat finished"
                );
                Ok(MeanStageRun { summary, sample })
            })
            .collect()
    }
}
