//! The per-location aggregation of every metric's [`Scores`].

use super::scores::Scores;
use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::json;

/// Aggregates every metric's [`Scores`] for one evaluated location,
/// preserving the order metrics were supplied in.
#[derive(Debug, Clone)]
pub struct MetricResults {
    pub weight: f64,
    entries: Vec<Scores>,
}

impl MetricResults {
    pub fn new(weight: f64) -> Self {
        MetricResults {
            weight: if weight.is_finite() { weight } else { 1.0 },
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, scores: Scores) {
        self.entries.push(scores);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scores> {
        self.entries.iter()
    }

    pub fn by_metric(&self, name: &str) -> Result<&Scores> {
        self.entries
            .iter()
            .find(|s| s.metric_name == name)
            .ok_or_else(|| Error::Lookup(format!("unknown metric '{name}'")))
    }

    /// Weighted average of every metric's `scaled_value`, weighted by each
    /// metric's own weight.
    pub fn scaled_value(&self) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for scores in &self.entries {
            let v = scores.scaled_value();
            if v.is_nan() {
                continue;
            }
            weighted_sum += v * scores.metric_weight;
            weight_total += scores.metric_weight;
        }

        if weight_total == 0.0 {
            f64::NAN
        } else {
            weighted_sum / weight_total
        }
    }

    pub fn grade(&self) -> f64 {
        self.scaled_value() * 100.0
    }

    /// Weighted average of every metric's own [`Scores::scaled_interval`],
    /// weighted by metric weight, mirroring how [`MetricResults::scaled_value`]
    /// aggregates [`Scores::scaled_value`]. `None` when no metric carries an
    /// interval.
    pub fn interval(&self) -> Option<(f64, f64)> {
        let mut lo_sum = 0.0;
        let mut hi_sum = 0.0;
        let mut weight_total = 0.0;

        for scores in &self.entries {
            if let Some((lo, hi)) = scores.scaled_interval() {
                lo_sum += lo * scores.metric_weight;
                hi_sum += hi * scores.metric_weight;
                weight_total += scores.metric_weight;
            }
        }

        if weight_total == 0.0 {
            None
        } else {
            Some((lo_sum / weight_total, hi_sum / weight_total))
        }
    }
}

impl Serialize for MetricResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let scores: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|s| (s.metric_name.clone(), serde_json::to_value(s).unwrap()))
            .collect();

        let interval = match self.interval() {
            Some((lo, hi)) => json!([lo, hi]),
            None => serde_json::Value::Null,
        };

        json!({
            "interval": interval,
            "weight": self.weight,
            "grade": self.grade(),
            "scaled_value": self.scaled_value(),
            "scores": scores,
        })
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::score::Score;
    use super::super::threshold::Threshold;
    use serde_json::json as j;

    fn scores_with(metric: &str, weight: f64, scaled_value: f64) -> Scores {
        let mut scores = Scores::new(metric, weight);
        scores
            .insert(Score {
                value: scaled_value,
                interval: None,
                threshold: Threshold::new("All", j!(null), 1.0, |p| p.clone()).unwrap(),
                sample_size: 10,
                scaled_value,
                scaled_interval: None,
                failed: false,
            })
            .unwrap();
        scores
    }

    #[test]
    fn increasing_a_metric_toward_its_ideal_never_decreases_overall_scaled_value() {
        let mut before = MetricResults::new(1.0);
        before.insert(scores_with("nse", 1.0, 0.5));

        let mut after = MetricResults::new(1.0);
        after.insert(scores_with("nse", 1.0, 0.9));

        assert!(after.scaled_value() >= before.scaled_value());
    }

    #[test]
    fn nan_metric_scores_are_excluded_from_the_aggregate() {
        let mut results = MetricResults::new(1.0);
        results.insert(scores_with("good", 1.0, 0.8));
        results.insert(scores_with("broken", 1.0, f64::NAN));

        assert_eq!(results.scaled_value(), 0.8);
    }

    #[test]
    fn interval_is_none_when_no_metric_carries_one() {
        let mut results = MetricResults::new(1.0);
        results.insert(scores_with("nse", 1.0, 0.8));

        assert!(results.interval().is_none());
    }

    #[test]
    fn interval_aggregates_scaled_intervals_by_metric_weight() {
        let mut results = MetricResults::new(1.0);

        let mut with_interval = Scores::new("nse", 1.0);
        with_interval
            .insert(Score {
                value: 0.8,
                interval: None,
                threshold: Threshold::new("All", j!(null), 1.0, |p| p.clone()).unwrap(),
                sample_size: 10,
                scaled_value: 0.8,
                scaled_interval: Some((0.7, 0.9)),
                failed: false,
            })
            .unwrap();
        results.insert(with_interval);

        assert_eq!(results.interval(), Some((0.7, 0.9)));
    }
}
