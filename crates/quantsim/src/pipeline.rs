//! The three stages of a run, wired to the console report and the figure
//!
//! 1. Mean estimation: repeated fixed-size samples with a confidence interval
//! 2. Fit ladder: stable MLE and a one-sample K-S test per sample size
//! 3. Two-sample ladder: K-S test between two fresh samples per size, on a
//!    stream restarted from the run seed

use std::io::Write;
use std::path::PathBuf;

use color_eyre::eyre::eyre;
use serde::Serialize;

use quantsim_core::analysis::{
    DensityCurve, FitLadderEntry, FitProgress, Histogram, KsResult, TwoSampleEntry, fit_ladder,
    linspace, two_sample_ladder,
};
use quantsim_core::metrics::TrialMetrics;
use quantsim_core::{AnalysisConfig, MonteCarloSummary, QuantileSampler, StableParams};

use crate::plot::Figure;
use crate::report;

/// Points on the density curve grid
const GRID_POINTS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: AnalysisConfig,
    pub skip_fit: bool,
    pub skip_two_sample: bool,
    /// Where to write the figure, if anywhere
    pub plot: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitRecord {
    pub sample_size: usize,
    pub discarded: usize,
    pub elapsed_secs: f64,
    pub params: Option<StableParams>,
    pub log_likelihood: Option<f64>,
    pub ks: Option<KsResult>,
    pub error: Option<String>,
}

impl From<&FitLadderEntry> for FitRecord {
    fn from(entry: &FitLadderEntry) -> Self {
        let (params, log_likelihood, ks, error) = match &entry.outcome {
            Ok((fit, ks)) => (Some(fit.params), Some(fit.log_likelihood), Some(*ks), None),
            Err(e) => (None, None, None, Some(e.to_string())),
        };
        Self {
            sample_size: entry.sample_size,
            discarded: entry.sample.discarded,
            elapsed_secs: entry.elapsed.as_secs_f64(),
            params,
            log_likelihood,
            ks,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TwoSampleRecord {
    pub sample_size: usize,
    pub discarded: usize,
    pub ks: Option<KsResult>,
    pub error: Option<String>,
}

impl From<&TwoSampleEntry> for TwoSampleRecord {
    fn from(entry: &TwoSampleEntry) -> Self {
        let (ks, error) = match &entry.outcome {
            Ok(ks) => (Some(*ks), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            sample_size: entry.sample_size,
            discarded: entry.discarded,
            ks,
            error,
        }
    }
}

/// Machine-readable record of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: AnalysisConfig,
    pub mean_stage: Vec<MonteCarloSummary>,
    pub fits: Vec<FitRecord>,
    pub two_sample: Vec<TwoSampleRecord>,
    pub metrics: TrialMetrics,
}

/// Run every enabled stage, printing the console report to `out`
pub fn run<W: Write>(options: &RunOptions, out: &mut W) -> color_eyre::Result<Report> {
    let config = &options.config;
    let mut sampler = QuantileSampler::new(config)?;

    tracing::info!(
        seed = config.seed,
        sample_size = config.mean_stage.sample_size,
        repeats = config.mean_stage.repeats,
        "Starting mean estimation"
    );
    report::write_mean_header(out, config.probability, config.mean_stage.sample_size)?;
    let runs = sampler.mean_estimation(config.mean_stage)?;
    for run in &runs {
        writeln!(out, "{}", report::summary_line(&run.summary))?;
    }

    let last = runs
        .last()
        .ok_or_else(|| eyre!("mean stage produced no samples"))?;
    let (min, max) = last
        .sample
        .values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let x_grid = linspace(min, max, GRID_POINTS);

    let mut fits = Vec::with_capacity(config.fit_sizes.len());
    let mut curves = Vec::new();
    if !options.skip_fit {
        let mut written = Ok(());
        let entries = fit_ladder(&mut sampler, &config.fit_sizes, &config.fit, |progress| {
            if written.is_ok() {
                written = match progress {
                    FitProgress::Starting { .. } => writeln!(out, "Fitting..."),
                    FitProgress::Finished(entry) => report::write_fit_entry(out, entry),
                };
            }
        })?;
        written?;

        for entry in &entries {
            if let Ok((fit, ks)) = &entry.outcome {
                let label = report::curve_label(entry.sample_size, ks.p_value, ks.statistic);
                curves.push(DensityCurve::from_fit(label, &fit.params, x_grid.clone()));
            }
            fits.push(FitRecord::from(entry));
        }
    }

    if let Some(path) = &options.plot {
        writeln!(out, "Plotting...")?;
        let summary = &last.summary;
        let xlim = plot_window(summary.mean, summary.std_dev, min, max);
        let figure = Figure {
            histogram: Histogram::density(&last.sample.values, Some(xlim)),
            curves,
            xlim,
        };
        figure.write_svg(path)?;
        tracing::info!(path = %path.display(), "Figure written");
    }

    let mut two_sample = Vec::new();
    if !options.skip_two_sample {
        sampler.reseed(config.seed);
        let mut written = Ok(());
        let entries = two_sample_ladder(&mut sampler, &config.two_sample_sizes, |entry| {
            if written.is_ok() {
                written = report::write_two_sample_entry(out, entry);
            }
        })?;
        written?;
        two_sample = entries.iter().map(TwoSampleRecord::from).collect();
    }

    let metrics = *sampler.metrics();
    if metrics.discarded() > 0 {
        tracing::warn!(
            discarded = metrics.discarded(),
            trials = metrics.trials,
            rate = metrics.discard_rate(),
            "Run finished with discarded trials"
        );
    }

    Ok(Report {
        config: config.clone(),
        mean_stage: runs.iter().map(|r| r.summary).collect(),
        fits,
        two_sample,
        metrics,
    })
}

/// `(mean - 3 std, 0)`, falling back to the sample range when that is empty
fn plot_window(mean: f64, std_dev: f64, min: f64, max: f64) -> (f64, f64) {
    let lo = mean - 3.0 * std_dev;
    if lo.is_finite() && lo < 0.0 {
        (lo, 0.0)
    } else if min < max {
        (min, max)
    } else {
        (min - 0.5, min + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_window() {
        assert_eq!(plot_window(-100.0, 20.0, -300.0, -10.0), (-160.0, 0.0));
        assert_eq!(plot_window(5.0, 1.0, 2.0, 9.0), (2.0, 9.0));
        assert_eq!(plot_window(f64::NAN, 1.0, 3.0, 3.0), (2.5, 3.5));
    }
}
