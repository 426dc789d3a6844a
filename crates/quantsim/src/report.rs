//! Console report
//!
//! Number formatting follows the established study output:
//! fixed two-decimal columns for the mean stage and general (significant
//! digit) formatting for test results.

use std::io::{self, Write};

use quantsim_core::analysis::{FitLadderEntry, TwoSampleEntry};
use quantsim_core::{MonteCarloSummary, StableParams};

/// Format with `precision` significant digits, switching to exponent
/// notation for very large or small magnitudes.
///
/// Trailing zeros are dropped, but a fixed-point result keeps at least one
/// digit after the point: `0.5`, `1.0`, `0.0123`, `1.2e+03`.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let precision = precision.max(1);
    // Rounding to the requested digits can bump the exponent (9.99 -> 1.0e1)
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        let fixed = trim_zeros(&format!("{:.*}", decimals, value));
        if fixed.contains('.') {
            fixed
        } else {
            format!("{fixed}.0")
        }
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// `(alpha, beta, loc, scale)`
pub fn format_params(params: &StableParams) -> String {
    let (alpha, beta, loc, scale) = params.as_tuple();
    format!("({alpha:?}, {beta:?}, {loc:?}, {scale:?})")
}

pub fn write_mean_header<W: Write>(out: &mut W, probability: f64, sample_size: usize) -> io::Result<()> {
    writeln!(out, "Estimating {probability} quantile value by Monte Carlo sampling")?;
    writeln!(out, "Size of samples: {sample_size}")?;
    writeln!(
        out,
        "Sample average   Sample stdev  Est. stdev of average   95% confidence interval "
    )
}

pub fn summary_line(summary: &MonteCarloSummary) -> String {
    format!(
        "{:14.2} {:14.2} {:22.2}    ({:.2}, {:.2})",
        summary.mean, summary.std_dev, summary.std_error, summary.ci_low, summary.ci_high
    )
}

fn ks_line(sample_size: usize, p_value: f64, statistic: f64) -> String {
    format!(
        "    K-S test for n_fit={sample_size}: p-value={} statistic={}",
        format_general(p_value, 4),
        format_general(statistic, 4)
    )
}

/// Legend text for a fitted density curve
pub fn curve_label(sample_size: usize, p_value: f64, statistic: f64) -> String {
    format!(
        "n_fit={sample_size} p-value={} max CDF error={}",
        format_general(p_value, 2),
        format_general(statistic, 2)
    )
}

/// Everything printed after a fit rung finishes
pub fn write_fit_entry<W: Write>(out: &mut W, entry: &FitLadderEntry) -> io::Result<()> {
    writeln!(out, "Fitting...done in {:.2} sec", entry.elapsed.as_secs_f64())?;
    match &entry.outcome {
        Ok((fit, ks)) => {
            writeln!(out, "    params: {}", format_params(&fit.params))?;
            writeln!(out, "{}", ks_line(entry.sample_size, ks.p_value, ks.statistic))
        }
        Err(e) => writeln!(out, "    fit failed for n_fit={}: {e}", entry.sample_size),
    }
}

pub fn write_two_sample_entry<W: Write>(out: &mut W, entry: &TwoSampleEntry) -> io::Result<()> {
    match &entry.outcome {
        Ok(ks) => writeln!(out, "{}", ks_line(entry.sample_size, ks.p_value, ks.statistic)),
        Err(e) => writeln!(out, "    K-S test for n_fit={} failed: {e}", entry.sample_size),
    }
}
