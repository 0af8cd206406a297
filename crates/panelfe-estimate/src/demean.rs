//! Two-way demeaning.
//!
//! Subtracting entity means and then time means removes both sets of effects
//! exactly when every (entity, time) cell is observed once. On an unbalanced
//! panel the result is the residual from regressing the input on the full set
//! of entity and time dummies, reached one of two ways:
//!
//! - With few enough periods, entity means are swept out and the time effects
//!   are solved directly from the normal equations of the entity-demeaned
//!   time dummies. The normal matrix depends only on the panel layout, so its
//!   inverse is computed once per demeaner.
//! - Otherwise, or when the layout splits into disconnected pieces, entity
//!   and time sweeps alternate until the largest entity mean is negligible
//!   against the scale of the input. Every third sweep is replaced by an
//!   element-wise Aitken extrapolation of the last three iterates, which
//!   keeps weakly linked panels from stalling.

use crate::error::{EstimationError, Result};
use crate::linalg::{DEFAULT_PIVOT_TOLERANCE, invert_spd};
use ndarray::{Array1, Array2, s};
use panelfe_data::PanelSample;
use serde::{Deserialize, Serialize};

/// Convergence settings for two-way demeaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemeanConfig {
    /// Largest entity mean allowed, relative to the largest absolute input (default: 1e-10)
    pub tolerance: f64,
    /// Sweep limit (default: 10 000)
    pub max_iterations: usize,
    /// Most periods for which time effects are solved directly (default: 500, 0 disables)
    pub exact_max_periods: usize,
}

impl Default for DemeanConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10_000,
            exact_max_periods: 500,
        }
    }
}

/// A demeaned column and the sweeps it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Demeaned {
    /// Values with entity and time effects removed
    pub values: Vec<f64>,
    /// Number of entity/time sweep pairs performed (1 for a direct solve)
    pub iterations: usize,
}

#[derive(Debug, Clone)]
struct Dimension {
    index: Vec<usize>,
    counts: Vec<f64>,
}

impl Dimension {
    fn new(index: &[usize]) -> Self {
        let levels = index.iter().copied().max().map_or(0, |m| m + 1);
        let mut counts = vec![0.0; levels];
        for &g in index {
            counts[g] += 1.0;
        }
        Self {
            index: index.to_vec(),
            counts,
        }
    }

    fn levels(&self) -> usize {
        self.counts.len()
    }

    fn means(&self, values: &[f64]) -> Vec<f64> {
        let mut sums = vec![0.0; self.counts.len()];
        for (&g, &v) in self.index.iter().zip(values) {
            sums[g] += v;
        }
        sums.iter()
            .zip(&self.counts)
            .map(|(s, c)| if *c > 0.0 { s / c } else { 0.0 })
            .collect()
    }

    fn sweep(&self, values: &mut [f64]) {
        let means = self.means(values);
        for (v, &g) in values.iter_mut().zip(&self.index) {
            *v -= means[g];
        }
    }

    fn max_abs_mean(&self, values: &[f64]) -> f64 {
        self.means(values).iter().fold(0.0, |m, v| m.max(v.abs()))
    }
}

/// Inverse normal matrix of the entity-demeaned time dummies, first period dropped.
#[derive(Debug, Clone)]
struct TimeEffects {
    inverse: Array2<f64>,
}

impl TimeEffects {
    /// `None` when the matrix is singular, i.e. the panel is not connected.
    ///
    /// `cells` must be sorted by entity. For an entity with `n` rows and
    /// per-period row counts `c`, the entity contributes `diag(c) - c c' / n`.
    fn build(cells: &[(usize, usize)], entity: &Dimension, periods: usize) -> Option<Self> {
        let mut gram = Array2::<f64>::zeros((periods, periods));
        let mut counts: Vec<(usize, f64)> = Vec::new();
        for block in cells.chunk_by(|a, b| a.0 == b.0) {
            let rows = entity.counts[block[0].0];
            counts.clear();
            for &(_, t) in block {
                match counts.last_mut() {
                    Some((last, c)) if *last == t => *c += 1.0,
                    _ => counts.push((t, 1.0)),
                }
            }
            for &(p, cp) in &counts {
                gram[[p, p]] += cp;
                for &(q, cq) in &counts {
                    gram[[p, q]] -= cp * cq / rows;
                }
            }
        }

        let reduced = gram.slice(s![1.., 1..]).to_owned();
        match invert_spd(&reduced, DEFAULT_PIVOT_TOLERANCE) {
            Ok(inverse) => Some(Self { inverse }),
            Err(err) => {
                tracing::debug!(periods, error = %err, "time effects not identified directly");
                None
            }
        }
    }

    /// Sweep entity means, then remove the fitted time effects.
    fn solve(&self, entity: &Dimension, time: &Dimension, values: &mut [f64]) {
        entity.sweep(values);

        let mut totals = Array1::<f64>::zeros(self.inverse.nrows());
        for (&t, &v) in time.index.iter().zip(values.iter()) {
            if t > 0 {
                totals[t - 1] += v;
            }
        }
        let effects = self.inverse.dot(&totals);

        let mut fitted: Vec<f64> = time
            .index
            .iter()
            .map(|&t| if t > 0 { effects[t - 1] } else { 0.0 })
            .collect();
        entity.sweep(&mut fitted);
        for (v, f) in values.iter_mut().zip(fitted) {
            *v -= f;
        }
    }
}

/// Removes entity and time effects from row-aligned columns.
#[derive(Debug, Clone)]
pub struct TwoWayDemeaner {
    entity: Dimension,
    time: Dimension,
    balanced: bool,
    time_effects: Option<TimeEffects>,
    config: DemeanConfig,
}

impl TwoWayDemeaner {
    /// Create a demeaner from dense entity and time indices.
    ///
    /// # Errors
    ///
    /// Returns [`EstimationError::DimensionMismatch`] if the index vectors
    /// differ in length.
    pub fn new(entity_index: &[usize], time_index: &[usize], config: DemeanConfig) -> Result<Self> {
        if entity_index.len() != time_index.len() {
            return Err(EstimationError::DimensionMismatch {
                expected: entity_index.len(),
                actual: time_index.len(),
            });
        }
        let entity = Dimension::new(entity_index);
        let time = Dimension::new(time_index);

        let mut cells: Vec<(usize, usize)> =
            entity_index.iter().copied().zip(time_index.iter().copied()).collect();
        cells.sort_unstable();
        let mut distinct = cells.clone();
        distinct.dedup();
        let balanced = distinct.len() == cells.len()
            && distinct.len() == entity.levels() * time.levels();

        let periods = time.levels();
        let time_effects = if !balanced && (2..=config.exact_max_periods).contains(&periods) {
            TimeEffects::build(&cells, &entity, periods)
        } else {
            None
        };

        Ok(Self {
            entity,
            time,
            balanced,
            time_effects,
            config,
        })
    }

    /// Create a demeaner for the rows of a sample.
    pub fn for_sample(sample: &PanelSample, config: DemeanConfig) -> Result<Self> {
        Self::new(sample.entity_index(), sample.time_index(), config)
    }

    /// Number of rows the demeaner expects.
    pub fn len(&self) -> usize {
        self.entity.index.len()
    }

    /// Whether the demeaner covers no rows.
    pub fn is_empty(&self) -> bool {
        self.entity.index.is_empty()
    }

    /// Whether every (entity, time) cell appears exactly once.
    pub const fn is_balanced(&self) -> bool {
        self.balanced
    }

    /// Whether time effects are solved directly instead of by sweeps.
    pub const fn is_direct(&self) -> bool {
        self.time_effects.is_some()
    }

    /// Remove entity and time effects from one column.
    ///
    /// # Errors
    ///
    /// Returns [`EstimationError::DimensionMismatch`] for a column of the wrong
    /// length and [`EstimationError::DemeaningDidNotConverge`] when the sweep
    /// limit is reached.
    pub fn demean(&self, column: &[f64]) -> Result<Demeaned> {
        if column.len() != self.len() {
            return Err(EstimationError::DimensionMismatch {
                expected: self.len(),
                actual: column.len(),
            });
        }

        let mut values = column.to_vec();
        if let Some(effects) = &self.time_effects {
            effects.solve(&self.entity, &self.time, &mut values);
            return Ok(Demeaned {
                values,
                iterations: 1,
            });
        }

        let scale = column.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let threshold = self.config.tolerance * scale.max(f64::MIN_POSITIVE);
        let n = values.len();
        let mut r0 = vec![0.0_f64; n];
        let mut r1 = vec![0.0_f64; n];
        let mut phase = 0u8;

        for iteration in 1..=self.config.max_iterations.max(1) {
            if !self.balanced {
                match phase {
                    0 => {
                        r0.copy_from_slice(&values);
                        phase = 1;
                    }
                    1 => {
                        r1.copy_from_slice(&values);
                        phase = 2;
                    }
                    _ => {
                        aitken(&mut values, &r0, &r1);
                        phase = 0;
                    }
                }
            }

            self.entity.sweep(&mut values);
            self.time.sweep(&mut values);

            if self.balanced || self.entity.max_abs_mean(&values) <= threshold {
                return Ok(Demeaned {
                    values,
                    iterations: iteration,
                });
            }
        }

        tracing::warn!(
            iterations = self.config.max_iterations,
            rows = self.len(),
            "two-way demeaning did not converge"
        );
        Err(EstimationError::DemeaningDidNotConverge {
            iterations: self.config.max_iterations,
        })
    }
}

/// Element-wise Aitken delta-squared step from iterates `r0`, `r1` and `current`.
fn aitken(current: &mut [f64], r0: &[f64], r1: &[f64]) {
    for ((r2, &a), &b) in current.iter_mut().zip(r0).zip(r1) {
        let denom = *r2 - 2.0 * b + a;
        if denom.abs() > 1e-30 {
            let delta = b - a;
            *r2 = a - delta * delta / denom;
        }
    }
}
