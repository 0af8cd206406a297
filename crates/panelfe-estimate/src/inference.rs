//! Test statistics, p-values and confidence intervals.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Two-sided 95% critical value of the standard normal.
pub const NORMAL_CRITICAL_95: f64 = 1.96;

/// Reference distribution for the t statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inference {
    /// Standard normal, CI half-width `1.96 * se`
    #[default]
    Normal,
    /// Student's t with `G - 1` degrees of freedom, `G` the cluster count
    StudentT,
}

/// Inference for a single coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTest {
    /// `coef / se`
    pub t_stat: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Lower end of the 95% interval
    pub ci_low: f64,
    /// Upper end of the 95% interval
    pub ci_high: f64,
}

impl Inference {
    fn student(clusters: usize) -> Option<StudentsT> {
        let df = clusters.saturating_sub(1);
        if df == 0 {
            return None;
        }
        StudentsT::new(0.0, 1.0, df as f64).ok()
    }

    /// Two-sided 95% critical value.
    pub fn critical_value(&self, clusters: usize) -> f64 {
        match self {
            Self::Normal => NORMAL_CRITICAL_95,
            Self::StudentT => Self::student(clusters)
                .map_or(NORMAL_CRITICAL_95, |t| t.inverse_cdf(0.975)),
        }
    }

    /// Two-sided p-value of a t statistic.
    pub fn p_value(&self, t_stat: f64, clusters: usize) -> f64 {
        if t_stat.is_nan() {
            return f64::NAN;
        }
        let z = t_stat.abs();
        match self {
            Self::Normal => normal_two_sided(z),
            Self::StudentT => match Self::student(clusters) {
                Some(dist) => (2.0 * (1.0 - dist.cdf(z))).clamp(0.0, 1.0),
                None => normal_two_sided(z),
            },
        }
    }

    /// Test statistic, p-value and interval for one coefficient.
    pub fn test(&self, coef: f64, se: f64, clusters: usize) -> CoefficientTest {
        let t_stat = coef / se;
        let half_width = self.critical_value(clusters) * se;
        CoefficientTest {
            t_stat,
            p_value: self.p_value(t_stat, clusters),
            ci_low: coef - half_width,
            ci_high: coef + half_width,
        }
    }
}

fn normal_two_sided(z: f64) -> f64 {
    erfc(z / SQRT_2)
}
