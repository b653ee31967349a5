//! The result of one (metric, threshold) evaluation.

use super::threshold::Threshold;
use serde::{Serialize, Serializer};
use serde_json::json;

/// One (metric, threshold) evaluation result.
#[derive(Debug, Clone)]
pub struct Score {
    pub value: f64,
    pub interval: Option<(f64, f64)>,
    pub threshold: Threshold,
    pub sample_size: usize,
    pub scaled_value: f64,
    pub scaled_interval: Option<(f64, f64)>,
    pub failed: bool,
}

impl Score {
    /// `scaled_value` rendered as a 0-100 display grade.
    pub fn grade(&self) -> f64 {
        self.scaled_value * 100.0
    }
}

fn interval_json(interval: &Option<(f64, f64)>) -> serde_json::Value {
    match interval {
        Some((lo, hi)) => json!([lo, hi]),
        None => serde_json::Value::Null,
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        json!({
            "value": self.value,
            "scaled_value": self.scaled_value,
            "sample_size": self.sample_size,
            "interval": interval_json(&self.interval),
            "scaled_interval": interval_json(&self.scaled_interval),
            "failed": self.failed,
            "weight": self.threshold.weight,
            "threshold": self.threshold.name,
            "grade": self.grade(),
        })
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_is_scaled_value_times_one_hundred() {
        let score = Score {
            value: 0.8,
            interval: None,
            threshold: Threshold::all(),
            sample_size: 10,
            scaled_value: 0.8,
            scaled_interval: None,
            failed: false,
        };

        assert_eq!(score.grade(), 80.0);
    }

    #[test]
    fn serializes_the_documented_field_set() {
        let score = Score {
            value: 0.5,
            interval: Some((0.4, 0.6)),
            threshold: Threshold::all(),
            sample_size: 5,
            scaled_value: 0.5,
            scaled_interval: Some((0.4, 0.6)),
            failed: false,
        };

        let value = serde_json::to_value(&score).unwrap();
        for key in ["value", "scaled_value", "sample_size", "interval", "scaled_interval", "failed", "weight", "threshold", "grade"] {
            assert!(value.get(key).is_some(), "missing field '{key}'");
        }
    }
}
