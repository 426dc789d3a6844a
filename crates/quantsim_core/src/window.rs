//! Overlapping multi-day compounded returns
//!
//! Window products are computed with the block prefix/suffix scheme
//! (van Herk / Gil-Werman): split the factors into blocks of width `w`,
//! take running products forward within each block and backward within
//! each block, then every window is `suffix[i] * prefix[i + w - 1]`.
//! That is three multiplications per element regardless of `w` and needs no
//! division, so a zero factor does not poison later windows.

use crate::error::ConfigError;

/// `prod(1 + r[i..i + width]) - 1` for every start index `i`.
///
/// Returns `n - width + 1` values, or an empty vector when the series is
/// shorter than the window.
pub fn compounded_returns(returns: &[f64], width: usize) -> Result<Vec<f64>, ConfigError> {
    if width == 0 {
        return Err(ConfigError::ZeroWindow);
    }

    let n = returns.len();
    if n < width {
        return Ok(Vec::new());
    }

    let factors: Vec<f64> = returns.iter().map(|r| 1.0 + r).collect();

    let mut prefix = vec![0.0; n];
    for (i, &f) in factors.iter().enumerate() {
        prefix[i] = if i % width == 0 { f } else { prefix[i - 1] * f };
    }

    let mut suffix = vec![0.0; n];
    for i in (0..n).rev() {
        let block_end = i % width == width - 1 || i == n - 1;
        suffix[i] = if block_end {
            factors[i]
        } else {
            factors[i] * suffix[i + 1]
        };
    }

    let windows = (0..=n - width)
        .map(|i| {
            let end = i + width - 1;
            let product = if i % width == 0 {
                // Window coincides with a block
                prefix[end]
            } else {
                suffix[i] * prefix[end]
            };
            product - 1.0
        })
        .collect();

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(returns: &[f64], width: usize) -> Vec<f64> {
        returns
            .windows(width)
            .map(|w| w.iter().map(|r| 1.0 + r).product::<f64>() - 1.0)
            .collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let returns: Vec<f64> = (0..53)
            .map(|i| ((i * 37 % 17) as f64 - 8.0) / 10.0)
            .collect();

        for width in 1..=12 {
            let fast = compounded_returns(&returns, width).unwrap();
            let slow = brute_force(&returns, width);
            assert_eq!(fast.len(), returns.len() - width + 1);
            for (a, b) in fast.iter().zip(&slow) {
                assert!(
                    (a - b).abs() <= 1e-12 * b.abs().max(1.0),
                    "width {width}: {a} != {b}"
                );
            }
        }
    }

    #[test]
    fn test_zero_factor_only_affects_its_windows() {
        // r = -1 gives a zero factor at index 3
        let returns = [0.1, 0.2, 0.3, -1.0, 0.5, 0.6, 0.7, 0.8];
        let out = compounded_returns(&returns, 3).unwrap();
        let expected = brute_force(&returns, 3);
        assert_eq!(out.len(), 6);
        for (a, b) in out.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((out[4] - (1.5 * 1.6 * 1.7 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_series_shorter_than_window_is_empty() {
        assert!(compounded_returns(&[0.1, 0.2], 3).unwrap().is_empty());
    }

    #[test]
    fn test_window_equal_to_length() {
        let out = compounded_returns(&[0.1, 0.1], 2).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_zero_width_rejected() {
        assert_eq!(compounded_returns(&[0.1], 0), Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn test_unit_window_is_identity() {
        let returns = [0.25, -0.5, 3.0];
        let out = compounded_returns(&returns, 1).unwrap();
        for (a, b) in out.iter().zip(&returns) {
            assert!((a - b).abs() < 1e-15);
        }
    }
}
