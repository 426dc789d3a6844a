//! Tests for the per-trial pipeline
//!
//! These tests verify that:
//! - A sampler trial equals generation, compounding and quantile extraction
//!   composed by hand on the same stream
//! - Identical seeds give bit-identical summaries, and the default seed
//!   reproduces the recorded first summary
//! - Batched execution is reproducible

use rand::SeedableRng;

use crate::config::{AnalysisConfig, Execution, MeanStage};
use crate::quantile::QuantileEstimator;
use crate::returns::ReturnGenerator;
use crate::simulation::{MonteCarloSummary, QuantileSampler};
use crate::window::compounded_returns;

#[test]
fn test_trial_is_composition_of_stages() {
    let config = AnalysisConfig::default();
    let mut sampler = QuantileSampler::new(&config).unwrap();
    let from_sampler = sampler.trial().unwrap();

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let returns = ReturnGenerator::new(config.returns, config.days)
        .unwrap()
        .generate(&mut rng);
    let windows = compounded_returns(&returns, config.window).unwrap();
    assert_eq!(windows.len(), config.days - config.window + 1);
    let by_hand = QuantileEstimator::new(config.probability)
        .unwrap()
        .estimate(&windows)
        .unwrap();

    assert_eq!(from_sampler.to_bits(), by_hand.to_bits());
}

#[test]
fn test_quantile_sits_in_lower_tail_of_windows() {
    let config = AnalysisConfig::default();
    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    let returns = ReturnGenerator::new(config.returns, config.days)
        .unwrap()
        .generate(&mut rng);
    let mut windows = compounded_returns(&returns, config.window).unwrap();
    let q = QuantileEstimator::new(0.01).unwrap().estimate(&windows).unwrap();

    windows.sort_by(f64::total_cmp);
    // 741 windows: p = 0.01 lies between the 7th and 8th order statistics
    assert!(q >= windows[6] && q <= windows[7], "q {q}");
}

fn first_summary(config: &AnalysisConfig) -> MonteCarloSummary {
    summary_of(config, 50)
}

fn summary_of(config: &AnalysisConfig, sample_size: usize) -> MonteCarloSummary {
    let mut sampler = QuantileSampler::new(config).unwrap();
    let runs = sampler
        .mean_estimation(MeanStage {
            sample_size,
            repeats: 1,
        })
        .unwrap();
    runs[0].summary
}

#[test]
fn test_default_seed_matches_recorded_summary() {
    // Seed 1234, 750 days, window 10, alpha 1.7, N = 1000
    let summary = summary_of(&AnalysisConfig::default(), 1000);

    assert_eq!(summary.sample_size, 1000);
    assert_eq!(summary.discarded, 0);
    assert_eq!(summary.mean.to_bits(), (-3.503_997_392_134_575_78e4_f64).to_bits());
    assert_eq!(summary.std_dev.to_bits(), 3.826_624_532_363_429_17e4_f64.to_bits());
}

#[test]
fn test_default_seed_is_bit_reproducible() {
    let config = AnalysisConfig::default();
    let a = first_summary(&config);
    let b = first_summary(&config);

    assert_eq!(a.mean.to_bits(), b.mean.to_bits());
    assert_eq!(a.std_dev.to_bits(), b.std_dev.to_bits());
    assert_eq!(a.ci_low.to_bits(), b.ci_low.to_bits());
    assert_eq!(a.ci_high.to_bits(), b.ci_high.to_bits());
}

#[test]
fn test_different_seeds_differ() {
    let a = first_summary(&AnalysisConfig::default());
    let b = first_summary(&AnalysisConfig {
        seed: 4321,
        ..Default::default()
    });
    assert_ne!(a.mean.to_bits(), b.mean.to_bits());
}

#[test]
fn test_batched_summary_is_reproducible() {
    let config = AnalysisConfig {
        execution: Execution::Parallel { batches: 3 },
        ..Default::default()
    };
    let a = first_summary(&config);
    let b = first_summary(&config);
    assert_eq!(a, b);
    assert_eq!(a.sample_size + a.discarded, 50);
}
