//! The set of per-threshold scores produced by one metric.

use super::score::Score;
use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::json;
use std::collections::HashSet;

/// All per-threshold [`Score`]s for one metric.
///
/// Invariant: threshold identities (by name+value) are unique within the
/// set — inserting a score for an already-present threshold fails rather
/// than silently overwriting it.
#[derive(Debug, Clone)]
pub struct Scores {
    pub metric_name: String,
    pub metric_weight: f64,
    entries: Vec<Score>,
}

impl Scores {
    pub fn new(metric_name: impl Into<String>, metric_weight: f64) -> Self {
        Scores {
            metric_name: metric_name.into(),
            metric_weight,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, score: Score) -> Result<()> {
        if self.entries.iter().any(|s| s.threshold == score.threshold) {
            return Err(Error::Configuration(format!(
                "duplicate threshold '{}' registered for metric '{}'",
                score.threshold.name, self.metric_name
            )));
        }
        self.entries.push(score);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Score> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_threshold(&self, name: &str) -> Result<&Score> {
        self.entries
            .iter()
            .find(|s| s.threshold.name == name)
            .ok_or_else(|| Error::Lookup(format!("unknown threshold '{name}' in scores for '{}'", self.metric_name)))
    }

    /// Weighted average of `scaled_value` over scores with `sample_size >
    /// 0`, weighted by each score's threshold weight.
    pub fn performance(&self) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for score in self.entries.iter().filter(|s| s.sample_size > 0) {
            weighted_sum += score.scaled_value * score.threshold.weight;
            weight_total += score.threshold.weight;
        }

        if weight_total == 0.0 {
            f64::NAN
        } else {
            weighted_sum / weight_total
        }
    }

    pub fn scaled_value(&self) -> f64 {
        self.performance() * self.metric_weight
    }

    /// Weighted average of each score's `scaled_interval` (same weighting
    /// as [`Scores::performance`]), `None` when no contributing score carries
    /// an interval.
    pub fn total_interval(&self) -> Option<(f64, f64)> {
        let mut lo_sum = 0.0;
        let mut hi_sum = 0.0;
        let mut weight_total = 0.0;

        for score in self.entries.iter().filter(|s| s.sample_size > 0) {
            if let Some((lo, hi)) = score.scaled_interval {
                lo_sum += lo * score.threshold.weight;
                hi_sum += hi * score.threshold.weight;
                weight_total += score.threshold.weight;
            }
        }

        if weight_total == 0.0 {
            None
        } else {
            Some((lo_sum / weight_total, hi_sum / weight_total))
        }
    }

    /// [`Scores::total_interval`] projected through the metric's own weight,
    /// mirroring how [`Scores::scaled_value`] projects [`Scores::performance`].
    pub fn scaled_interval(&self) -> Option<(f64, f64)> {
        self.total_interval()
            .map(|(lo, hi)| (lo * self.metric_weight, hi * self.metric_weight))
    }

    /// The upper bound a metric's scaled total can reach: its own weight,
    /// since `performance` is normalized into `[0, 1]` before being scaled.
    pub fn maximum_possible_value(&self) -> f64 {
        self.metric_weight
    }

    pub fn unique_threshold_names(&self) -> HashSet<&str> {
        self.entries.iter().map(|s| s.threshold.name.as_str()).collect()
    }
}

fn interval_json(interval: Option<(f64, f64)>) -> serde_json::Value {
    match interval {
        Some((lo, hi)) => json!([lo, hi]),
        None => serde_json::Value::Null,
    }
}

impl Serialize for Scores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let thresholds: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|s| (s.threshold.name.clone(), serde_json::to_value(s).unwrap()))
            .collect();

        json!({
            "name": self.metric_name,
            "total": self.performance(),
            "total_interval": interval_json(self.total_interval()),
            "maximum_possible_value": self.maximum_possible_value(),
            "scaled_value": self.scaled_value(),
            "scaled_interval": interval_json(self.scaled_interval()),
            "weight": self.metric_weight,
            "thresholds": thresholds,
        })
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::threshold::Threshold;
    use serde_json::json as j;

    fn score_for(threshold: Threshold, scaled_value: f64, sample_size: usize) -> Score {
        Score {
            value: scaled_value,
            interval: None,
            threshold,
            sample_size,
            scaled_value,
            scaled_interval: None,
            failed: false,
        }
    }

    #[test]
    fn rejects_a_duplicate_threshold() {
        let mut scores = Scores::new("nse", 1.0);
        let t = Threshold::new("All", j!(null), 1.0, |p| p.clone()).unwrap();

        scores.insert(score_for(t.clone(), 0.9, 10)).unwrap();
        assert!(scores.insert(score_for(t, 0.1, 10)).is_err());
    }

    #[test]
    fn performance_ignores_empty_samples() {
        let mut scores = Scores::new("nse", 1.0);
        scores
            .insert(score_for(Threshold::new("A", j!(1), 1.0, |p| p.clone()).unwrap(), 1.0, 10))
            .unwrap();
        scores
            .insert(score_for(Threshold::new("B", j!(2), 1.0, |p| p.clone()).unwrap(), 0.0, 0))
            .unwrap();

        assert_eq!(scores.performance(), 1.0);
    }

    #[test]
    fn scaled_value_multiplies_performance_by_metric_weight() {
        let mut scores = Scores::new("nse", 2.0);
        scores
            .insert(score_for(Threshold::new("A", j!(1), 1.0, |p| p.clone()).unwrap(), 0.5, 10))
            .unwrap();

        assert_eq!(scores.scaled_value(), 1.0);
    }

    #[test]
    fn maximum_possible_value_is_the_metric_weight() {
        let scores = Scores::new("nse", 3.0);
        assert_eq!(scores.maximum_possible_value(), 3.0);
    }

    #[test]
    fn total_interval_is_none_without_any_scored_interval() {
        let mut scores = Scores::new("nse", 1.0);
        scores
            .insert(score_for(Threshold::new("A", j!(1), 1.0, |p| p.clone()).unwrap(), 0.5, 10))
            .unwrap();

        assert!(scores.total_interval().is_none());
    }

    #[test]
    fn scaled_interval_projects_total_interval_through_metric_weight() {
        let mut scores = Scores::new("nse", 2.0);
        let mut score = score_for(Threshold::new("A", j!(1), 1.0, |p| p.clone()).unwrap(), 0.5, 10);
        score.scaled_interval = Some((0.4, 0.6));
        scores.insert(score).unwrap();

        assert_eq!(scores.total_interval(), Some((0.4, 0.6)));
        assert_eq!(scores.scaled_interval(), Some((0.8, 1.2)));
    }
}
