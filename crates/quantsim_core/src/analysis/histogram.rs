//! Density histogram for plotting
//!
//! Bin width follows NumPy's "auto" rule: the smaller of the Sturges and
//! Freedman-Diaconis widths. Heights are normalised by the full sample so
//! the total area over the whole sample is one.

use serde::{Deserialize, Serialize};

use super::sample_quantile;

/// Upper limit on the number of bins in a histogram
pub const MAX_BINS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` increasing bin edges
    pub edges: Vec<f64>,
    /// Height of each bin
    pub density: Vec<f64>,
}

impl Histogram {
    /// Bin the finite values of `sample`.
    ///
    /// With `window = Some((lo, hi))` only that range is binned (heights
    /// still use the full sample count), which keeps the bin count sane for
    /// heavy-tailed samples that are plotted with clipped axes.
    #[must_use]
    pub fn density(sample: &[f64], window: Option<(f64, f64)>) -> Self {
        let mut sorted: Vec<f64> = sample.iter().copied().filter(|x| x.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        if n == 0 {
            return Self {
                edges: Vec::new(),
                density: Vec::new(),
            };
        }

        let (min, max) = (sorted[0], sorted[n - 1]);
        let (lo, hi) = match window {
            Some((a, b)) if a < b => (a.max(min), b.min(max)),
            _ => (min, max),
        };
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, lo + 0.5) };

        let width = auto_bin_width(&sorted);
        let bins = if width > 0.0 {
            (((hi - lo) / width).ceil() as usize).clamp(1, MAX_BINS)
        } else {
            1
        };
        let bin_width = (hi - lo) / bins as f64;

        let edges: Vec<f64> = (0..=bins)
            .map(|i| if i == bins { hi } else { lo + bin_width * i as f64 })
            .collect();

        let mut counts = vec![0usize; bins];
        for &x in sorted.iter().filter(|&&x| x >= lo && x <= hi) {
            let idx = (((x - lo) / bin_width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let norm = n as f64 * bin_width;
        let density = counts.iter().map(|&c| c as f64 / norm).collect();

        Self { edges, density }
    }

    #[must_use]
    pub fn bins(&self) -> usize {
        self.density.len()
    }

    /// Integral of the histogram over its range
    #[must_use]
    pub fn area(&self) -> f64 {
        self.edges
            .windows(2)
            .zip(&self.density)
            .map(|(e, d)| (e[1] - e[0]) * d)
            .sum()
    }
}

/// NumPy's "auto" width over a sorted sample
fn auto_bin_width(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    let range = sorted[sorted.len() - 1] - sorted[0];

    let sturges = range / (n.log2() + 1.0);
    let iqr = sample_quantile(sorted, 0.75) - sample_quantile(sorted, 0.25);
    let freedman_diaconis = 2.0 * iqr * n.powf(-1.0 / 3.0);

    if freedman_diaconis > 0.0 {
        sturges.min(freedman_diaconis)
    } else {
        sturges
    }
}
