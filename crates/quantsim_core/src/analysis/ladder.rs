//! Sample-size ladders for the goodness-of-fit stages
//!
//! Each rung draws fresh quantile estimates from the sampler's continuing
//! stream. A failed fit is recorded in its rung and the ladder moves on;
//! only sampler errors stop it.

use std::time::{Duration, Instant};

use crate::config::FitOptions;
use crate::error::{FitError, Result};
use crate::simulation::{QuantileSample, QuantileSampler};

use super::fit::{FitParameters, fit_stable};
use super::ks::{KsResult, ks_one_sample, ks_two_sample};

/// One rung of the fit ladder
#[derive(Debug, Clone, PartialEq)]
pub struct FitLadderEntry {
    pub sample_size: usize,
    pub sample: QuantileSample,
    /// Fitted law and the one-sample test of the sample against it
    pub outcome: std::result::Result<(FitParameters, KsResult), FitError>,
    /// Wall-clock time spent fitting
    pub elapsed: Duration,
}

/// One rung of the two-sample ladder
#[derive(Debug, Clone, PartialEq)]
pub struct TwoSampleEntry {
    pub sample_size: usize,
    pub discarded: usize,
    pub outcome: std::result::Result<KsResult, FitError>,
}

/// Fit and test one fresh sample of `size` estimates
pub fn fit_rung(
    sampler: &mut QuantileSampler,
    size: usize,
    options: &FitOptions,
) -> Result<FitLadderEntry> {
    let sample = sampler.draw(size)?;

    let start = Instant::now();
    let fitted = fit_stable(&sample.values, options);
    let elapsed = start.elapsed();

    let outcome = fitted.and_then(|fit| {
        let ks = ks_one_sample(&sample.values, |x| fit.params.cdf(x))?;
        Ok((fit, ks))
    });

    if let Err(e) = &outcome {
        tracing::warn!(n_fit = size, error = %e, "Fit rung failed");
    }

    Ok(FitLadderEntry {
        sample_size: size,
        sample,
        outcome,
        elapsed,
    })
}

/// Progress of the fit ladder, reported around each rung
#[derive(Debug, Clone, Copy)]
pub enum FitProgress<'a> {
    /// The rung is about to draw and fit its sample
    Starting { sample_size: usize },
    Finished(&'a FitLadderEntry),
}

/// Run [`fit_rung`] for every size in order, reporting each rung as it
/// starts and completes
pub fn fit_ladder<F>(
    sampler: &mut QuantileSampler,
    sizes: &[usize],
    options: &FitOptions,
    mut on_progress: F,
) -> Result<Vec<FitLadderEntry>>
where
    F: FnMut(FitProgress<'_>),
{
    let mut entries = Vec::with_capacity(sizes.len());
    for &size in sizes {
        on_progress(FitProgress::Starting { sample_size: size });
        let entry = fit_rung(sampler, size, options)?;
        on_progress(FitProgress::Finished(&entry));
        entries.push(entry);
    }
    Ok(entries)
}

/// Compare two independent samples of `size` estimates
pub fn two_sample_rung(sampler: &mut QuantileSampler, size: usize) -> Result<TwoSampleEntry> {
    let first = sampler.draw(size)?;
    let second = sampler.draw(size)?;
    let outcome = ks_two_sample(&first.values, &second.values);

    if let Err(e) = &outcome {
        tracing::warn!(n_fit = size, error = %e, "Two-sample rung failed");
    }

    Ok(TwoSampleEntry {
        sample_size: size,
        discarded: first.discarded + second.discarded,
        outcome,
    })
}

/// Run [`two_sample_rung`] for every size in order
pub fn two_sample_ladder<F>(
    sampler: &mut QuantileSampler,
    sizes: &[usize],
    mut on_entry: F,
) -> Result<Vec<TwoSampleEntry>>
where
    F: FnMut(&TwoSampleEntry),
{
    let mut entries = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let entry = two_sample_rung(sampler, size)?;
        on_entry(&entry);
        entries.push(entry);
    }
    Ok(entries)
}
