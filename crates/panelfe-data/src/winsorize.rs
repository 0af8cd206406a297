//! Quantile winsorization.
//!
//! Values below the lower empirical quantile are replaced by that quantile and
//! values above the upper quantile by the upper quantile. Missing entries stay
//! missing and the input column is never modified.
//!
//! Bounds default to nearest-rank quantiles, which makes the transform
//! idempotent: re-winsorizing a winsorized column with the same fractions
//! reproduces it. [`Interpolation::Linear`] is available for interpolated bounds.

use crate::error::{DataError, Result};
use crate::quantile::{Interpolation, quantile_sorted_with, sorted_finite};
use serde::{Deserialize, Serialize};

/// Winsorization bounds, expressed as quantile fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinsorConfig {
    /// Lower quantile fraction (default: 0.01)
    pub lower: f64,
    /// Upper quantile fraction (default: 0.99)
    pub upper: f64,
    /// Quantile rule for the bounds (default: nearest rank)
    #[serde(default = "default_interpolation")]
    pub interpolation: Interpolation,
}

const fn default_interpolation() -> Interpolation {
    Interpolation::Nearest
}

impl Default for WinsorConfig {
    fn default() -> Self {
        Self {
            lower: 0.01,
            upper: 0.99,
            interpolation: default_interpolation(),
        }
    }
}

impl WinsorConfig {
    /// Create a config, validating the bounds.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        let config = Self {
            lower,
            upper,
            interpolation: default_interpolation(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Use a different quantile rule.
    pub const fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Check `0 <= lower < upper <= 1`.
    pub fn validate(&self) -> Result<()> {
        let in_range = |q: f64| (0.0..=1.0).contains(&q);
        if !in_range(self.lower) || !in_range(self.upper) || self.lower >= self.upper {
            return Err(DataError::InvalidQuantile {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }

    /// Sample label suffix in percent, e.g. `1_99` for the defaults.
    pub fn label(&self) -> String {
        format!(
            "{}_{}",
            format_percent(self.lower * 100.0),
            format_percent(self.upper * 100.0)
        )
    }
}

fn format_percent(p: f64) -> String {
    let rounded = (p * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}").replace('.', "p")
    }
}

/// Quantile bounds of a column computed over its non-missing entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinsorBounds {
    /// Value at the lower quantile
    pub low: f64,
    /// Value at the upper quantile
    pub high: f64,
}

impl WinsorBounds {
    /// Compute the bounds of `values` for the given config.
    ///
    /// Returns `Ok(None)` when the column has no finite entries.
    pub fn compute(values: &[Option<f64>], config: &WinsorConfig) -> Result<Option<Self>> {
        config.validate()?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let sorted = sorted_finite(&present);

        let method = config.interpolation;
        Ok(quantile_sorted_with(&sorted, config.lower, method)
            .zip(quantile_sorted_with(&sorted, config.upper, method))
            .map(|(low, high)| Self { low, high }))
    }

    /// Clip a single value to the bounds.
    pub fn clip(&self, value: f64) -> f64 {
        if value < self.low {
            self.low
        } else if value > self.high {
            self.high
        } else {
            value
        }
    }
}

/// Winsorize a column to its `[lower, upper]` quantiles.
///
/// # Errors
///
/// Returns [`DataError::InvalidQuantile`] if the bounds are not ordered or fall
/// outside [0, 1].
pub fn winsorize(values: &[Option<f64>], config: &WinsorConfig) -> Result<Vec<Option<f64>>> {
    let Some(bounds) = WinsorBounds::compute(values, config)? else {
        return Ok(values.to_vec());
    };

    tracing::debug!(
        low = bounds.low,
        high = bounds.high,
        lower_q = config.lower,
        upper_q = config.upper,
        "winsorizing column"
    );

    Ok(values
        .iter()
        .map(|v| v.map(|x| if x.is_finite() { bounds.clip(x) } else { x }))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn column(n: usize) -> Vec<Option<f64>> {
        (0..n).map(|i| Some((i as f64).powi(2))).collect()
    }

    #[test]
    fn test_default_config() {
        let config = WinsorConfig::default();
        assert_eq!(config.lower, 0.01);
        assert_eq!(config.upper, 0.99);
        assert_eq!(config.interpolation, Interpolation::Nearest);
        assert_eq!(config.label(), "1_99");
    }

    #[test]
    fn test_label_fractional_percent() {
        let config = WinsorConfig::new(0.025, 0.975).unwrap();
        assert_eq!(config.label(), "2p5_97p5");
    }

    #[rstest]
    #[case(0.5, 0.5)]
    #[case(0.9, 0.1)]
    #[case(-0.1, 0.9)]
    #[case(0.1, 1.1)]
    #[case(f64::NAN, 0.9)]
    fn test_invalid_quantiles(#[case] lower: f64, #[case] upper: f64) {
        let config = WinsorConfig {
            lower,
            upper,
            ..Default::default()
        };
        let err = winsorize(&column(10), &config).unwrap_err();
        assert!(matches!(err, DataError::InvalidQuantile { .. }));
    }

    #[test]
    fn test_values_within_bounds() {
        let values = column(101);
        let config = WinsorConfig::new(0.05, 0.95).unwrap();
        let bounds = WinsorBounds::compute(&values, &config).unwrap().unwrap();
        let clipped = winsorize(&values, &config).unwrap();

        for v in clipped.iter().flatten() {
            assert!(*v >= bounds.low && *v <= bounds.high);
        }
        // interior values are untouched
        assert_eq!(clipped[50], values[50]);
        assert_relative_eq!(clipped[0].unwrap(), bounds.low);
        assert_relative_eq!(clipped[100].unwrap(), bounds.high);
    }

    #[test]
    fn test_idempotent() {
        let values = column(57);
        let config = WinsorConfig::default();
        let once = winsorize(&values, &config).unwrap();
        let twice = winsorize(&once, &config).unwrap();

        for (a, b) in once.iter().zip(twice.iter()) {
            assert_relative_eq!(a.unwrap(), b.unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_bounds_interpolate() {
        let values: Vec<Option<f64>> = (1..=5).map(|i| Some(i as f64)).collect();
        let config = WinsorConfig::new(0.1, 0.9)
            .unwrap()
            .with_interpolation(Interpolation::Linear);
        let clipped = winsorize(&values, &config).unwrap();

        assert_relative_eq!(clipped[0].unwrap(), 1.4, epsilon = 1e-12);
        assert_relative_eq!(clipped[4].unwrap(), 4.6, epsilon = 1e-12);
        assert_relative_eq!(clipped[2].unwrap(), 3.0);
    }

    #[test]
    fn test_linear_reapplying_same_bounds_is_stable() {
        let values = column(40);
        let config = WinsorConfig::default().with_interpolation(Interpolation::Linear);
        let bounds = WinsorBounds::compute(&values, &config).unwrap().unwrap();
        let once = winsorize(&values, &config).unwrap();
        let again: Vec<Option<f64>> = once.iter().map(|v| v.map(|x| bounds.clip(x))).collect();
        assert_eq!(once, again);
    }

    #[test]
    fn test_missing_preserved() {
        let values = vec![Some(1.0), None, Some(100.0), Some(2.0), None, Some(3.0)];
        let clipped = winsorize(&values, &WinsorConfig::new(0.1, 0.9).unwrap()).unwrap();
        assert!(clipped[1].is_none());
        assert!(clipped[4].is_none());
        assert_eq!(clipped.len(), values.len());
    }

    #[test]
    fn test_constant_column_is_noop() {
        let values = vec![Some(4.2); 12];
        let clipped = winsorize(&values, &WinsorConfig::default()).unwrap();
        assert_eq!(clipped, values);
    }

    #[test]
    fn test_all_missing_is_noop() {
        let values = vec![None; 5];
        assert_eq!(winsorize(&values, &WinsorConfig::default()).unwrap(), values);
    }

    #[test]
    fn test_input_not_modified() {
        let values = vec![Some(-50.0), Some(1.0), Some(2.0), Some(3.0), Some(50.0)];
        let snapshot = values.clone();
        let _ = winsorize(&values, &WinsorConfig::new(0.2, 0.8).unwrap()).unwrap();
        assert_eq!(values, snapshot);
    }
}
