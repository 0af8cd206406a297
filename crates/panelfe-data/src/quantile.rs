//! Empirical quantiles and simple column statistics.
//!
//! With `h = (n - 1) * q` over the sorted values `x`:
//! ```text
//! Linear:  Q(q) = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])
//! Nearest: Q(q) = x[round(h)]
//! ```
//! `Nearest` always returns an observed value, so clipping a column to its own
//! nearest-rank quantiles leaves those quantiles unchanged.

use serde::{Deserialize, Serialize};

/// How a quantile falling between two order statistics is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear interpolation between the neighbouring order statistics
    #[default]
    Linear,
    /// The order statistic closest to `h`
    Nearest,
}

/// Sort the finite values of a slice in ascending order.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile of an already sorted slice.
///
/// Returns `None` for an empty slice. `q` is clamped to [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    quantile_sorted_with(sorted, q, Interpolation::Linear)
}

/// Quantile of an already sorted slice with an explicit interpolation rule.
pub fn quantile_sorted_with(sorted: &[f64], q: f64, method: Interpolation) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    if method == Interpolation::Nearest {
        return Some(sorted[(h.round() as usize).min(n - 1)]);
    }

    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Quantile of the non-missing entries of an optional column.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    quantile_sorted(&sorted_finite(&present), q)
}

/// Arithmetic mean of the non-missing entries, `None` if there are none.
pub fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}
