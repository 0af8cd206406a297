//! Tercile grouping of entities by a per-entity summary statistic.
//!
//! Each entity is summarized by the mean of its observed values. Cutoffs are
//! quantiles of those means taken across entities, and every entity is
//! labelled `low`, `middle` or `high`. A mean equal to a cutoff goes to the
//! lower label.

use crate::error::{DataError, Result};
use crate::quantile::{mean, quantile_sorted, sorted_finite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered group label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupLabel {
    /// Summary at or below the lower cutoff
    Low,
    /// Summary above the lower cutoff and at or below the upper cutoff
    Middle,
    /// Summary above the upper cutoff
    High,
}

impl GroupLabel {
    /// All labels in order.
    pub const fn all() -> [Self; 3] {
        [Self::Low, Self::Middle, Self::High]
    }

    /// Lowercase name used in sample labels and output tables.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Middle => "middle",
            Self::High => "high",
        }
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quantile cutoffs for tercile assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TercileConfig {
    /// Lower cutoff quantile (default: 0.33)
    pub lower: f64,
    /// Upper cutoff quantile (default: 0.66)
    pub upper: f64,
}

impl Default for TercileConfig {
    fn default() -> Self {
        Self {
            lower: 0.33,
            upper: 0.66,
        }
    }
}

impl TercileConfig {
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
}

/// Entity → group label mapping, computed once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAssignment {
    labels: BTreeMap<String, GroupLabel>,
    summaries: BTreeMap<String, f64>,
    low_cutoff: f64,
    high_cutoff: f64,
}

impl GroupAssignment {
    /// Label for an entity, `None` if it had no usable summary.
    pub fn label(&self, entity: &str) -> Option<GroupLabel> {
        self.labels.get(entity).copied()
    }

    /// Summary statistic (entity mean) used for the assignment.
    pub fn summary(&self, entity: &str) -> Option<f64> {
        self.summaries.get(entity).copied()
    }

    /// Entities carrying a given label, in entity order.
    pub fn members(&self, label: GroupLabel) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, l)| **l == label)
            .map(|(e, _)| e.as_str())
            .collect()
    }

    /// Number of entities carrying a given label.
    pub fn count(&self, label: GroupLabel) -> usize {
        self.labels.values().filter(|l| **l == label).count()
    }

    /// Number of labelled entities.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no entity is labelled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Cutoff values `(low, high)` in units of the summary statistic.
    pub const fn cutoffs(&self) -> (f64, f64) {
        (self.low_cutoff, self.high_cutoff)
    }

    /// Iterate over `(entity, label)` pairs in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, GroupLabel)> {
        self.labels.iter().map(|(e, l)| (e.as_str(), *l))
    }
}

/// Mean of each entity's observed values.
///
/// Entities whose values are all missing are left out.
pub fn entity_means<'a, I>(observations: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut grouped: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (entity, value) in observations {
        grouped.entry(entity.to_string()).or_default().push(value);
    }

    grouped
        .into_iter()
        .filter_map(|(entity, values)| mean(values).map(|m| (entity, m)))
        .collect()
}

/// Assign tercile labels from per-entity summaries.
///
/// # Errors
///
/// Returns [`DataError::EmptyGroup`] if `summaries` is empty and
/// [`DataError::InvalidQuantile`] for malformed cutoffs.
pub fn assign_groups(
    summaries: &BTreeMap<String, f64>,
    config: &TercileConfig,
) -> Result<GroupAssignment> {
    config.validate()?;

    let values: Vec<f64> = summaries.values().copied().collect();
    let sorted = sorted_finite(&values);
    let (Some(low_cutoff), Some(high_cutoff)) = (
        quantile_sorted(&sorted, config.lower),
        quantile_sorted(&sorted, config.upper),
    ) else {
        return Err(DataError::EmptyGroup);
    };

    let labels: BTreeMap<String, GroupLabel> = summaries
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(entity, &v)| {
            let label = if v <= low_cutoff {
                GroupLabel::Low
            } else if v <= high_cutoff {
                GroupLabel::Middle
            } else {
                GroupLabel::High
            };
            (entity.clone(), label)
        })
        .collect();

    tracing::debug!(
        entities = labels.len(),
        low_cutoff,
        high_cutoff,
        "assigned entity groups"
    );

    Ok(GroupAssignment {
        labels,
        summaries: summaries.clone(),
        low_cutoff,
        high_cutoff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_summaries(n: usize) -> BTreeMap<String, f64> {
        (0..n).map(|i| (format!("e{i:04}"), i as f64 / n as f64)).collect()
    }

    #[test]
    fn test_label_order_and_names() {
        let labels = GroupLabel::all();
        assert!(labels[0] < labels[1] && labels[1] < labels[2]);
        assert_eq!(GroupLabel::Middle.to_string(), "middle");
    }

    #[test]
    fn test_empty_entity_set() {
        let err = assign_groups(&BTreeMap::new(), &TercileConfig::default()).unwrap_err();
        assert!(matches!(err, DataError::EmptyGroup));
    }

    #[test]
    fn test_partition_is_complete() {
        let summaries = uniform_summaries(50);
        let groups = assign_groups(&summaries, &TercileConfig::default()).unwrap();

        assert_eq!(groups.len(), 50);
        let total: usize = GroupLabel::all().iter().map(|l| groups.count(*l)).sum();
        assert_eq!(total, 50);
        for entity in summaries.keys() {
            assert!(groups.label(entity).is_some());
        }
    }

    #[test]
    fn test_exact_terciles_balanced() {
        let summaries = uniform_summaries(300);
        let config = TercileConfig {
            lower: 1.0 / 3.0,
            upper: 2.0 / 3.0,
        };
        let groups = assign_groups(&summaries, &config).unwrap();

        for label in GroupLabel::all() {
            let count = groups.count(label);
            assert!((99..=101).contains(&count), "{label}: {count}");
        }
    }

    #[test]
    fn test_default_cutoffs_on_uniform_input() {
        // 0.33 / 0.66 cutoffs leave the top bucket slightly larger
        let groups = assign_groups(&uniform_summaries(300), &TercileConfig::default()).unwrap();
        assert_eq!(groups.count(GroupLabel::Low), 99);
        assert_eq!(groups.count(GroupLabel::Middle), 99);
        assert_eq!(groups.count(GroupLabel::High), 102);
    }

    #[test]
    fn test_ties_go_to_lower_label() {
        let summaries: BTreeMap<String, f64> = [("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 5.0)]
            .into_iter()
            .map(|(e, v)| (e.to_string(), v))
            .collect();
        let groups = assign_groups(&summaries, &TercileConfig::default()).unwrap();

        // both cutoffs equal 1.0, so every tied entity is low
        assert_eq!(groups.label("a"), Some(GroupLabel::Low));
        assert_eq!(groups.label("c"), Some(GroupLabel::Low));
        assert_eq!(groups.label("d"), Some(GroupLabel::High));
        assert_eq!(groups.count(GroupLabel::Middle), 0);
    }

    #[test]
    fn test_entity_means_ignore_missing() {
        let obs = vec![
            ("a", Some(1.0)),
            ("a", None),
            ("a", Some(3.0)),
            ("b", None),
            ("c", Some(7.0)),
        ];
        let means = entity_means(obs);

        assert_relative_eq!(means["a"], 2.0);
        assert!(!means.contains_key("b"));
        assert_relative_eq!(means["c"], 7.0);
    }

    #[test]
    fn test_members_and_cutoffs() {
        let summaries = uniform_summaries(9);
        let groups = assign_groups(&summaries, &TercileConfig::default()).unwrap();
        let (low, high) = groups.cutoffs();
        assert!(low < high);

        for entity in groups.members(GroupLabel::High) {
            assert!(groups.summary(entity).unwrap() > high);
        }
    }
}
