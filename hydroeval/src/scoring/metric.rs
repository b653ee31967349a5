//! The metric contract: a named, weighted scoring function plus the
//! scale-to-ideal normalization and the per-threshold scoring driver.

use super::bootstrap;
use super::pairs::Pairs;
use super::score::Score;
use super::scores::Scores;
use super::threshold::{self, Threshold};
use crate::error::{Error, Result};

/// Shared, declarative attributes of a metric. Implementations typically
/// hold one of these and delegate the derived predicates to it.
#[derive(Debug, Clone)]
pub struct MetricMeta {
    pub name: String,
    pub description: String,
    pub weight: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub ideal_value: Option<f64>,
    pub fails_on: Option<f64>,
    pub greater_is_better: bool,
}

impl MetricMeta {
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(Error::Configuration(format!(
                "metric weight must be a positive, finite number, got {weight}"
            )));
        }

        Ok(MetricMeta {
            name: name.into(),
            description: String::new(),
            weight,
            lower_bound: None,
            upper_bound: None,
            ideal_value: None,
            fails_on: None,
            greater_is_better: true,
        })
    }

    pub fn has_upper_bound(&self) -> bool {
        self.upper_bound.is_some()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.lower_bound.is_some()
    }

    pub fn has_ideal_value(&self) -> bool {
        self.ideal_value.is_some()
    }

    pub fn bounded(&self) -> bool {
        self.has_upper_bound() && self.has_lower_bound()
    }

    /// A stable identifier derived from `name`: whitespace, underscores and
    /// hyphens stripped, then lowercased.
    pub fn identifier(&self) -> String {
        self.name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase()
    }
}

/// A named, weighted scoring function over a [`Pairs`] frame.
pub trait Metric: Send + Sync {
    fn meta(&self) -> &MetricMeta;

    /// Computes the raw scalar result of this metric on `pairs`, which has
    /// already been filtered by a threshold's selector.
    fn compute(&self, pairs: &Pairs) -> f64;
}

/// Scales a raw result into `[0, 1]` relative to a metric's bounds and
/// ideal value, per the five-branch formula in the metric contract.
pub fn scale_to_ideal(meta: &MetricMeta, raw: f64) -> f64 {
    if raw.is_nan() {
        return f64::NAN;
    }

    let (Some(lower), Some(upper), Some(ideal)) = (meta.lower_bound, meta.upper_bound, meta.ideal_value) else {
        return raw;
    };

    let (slope, intercept) = if ideal == lower {
        let slope = -1.0 / (upper - lower);
        (slope, 1.0 - slope * ideal)
    } else if ideal == upper {
        let slope = 1.0 / (upper - lower);
        (slope, 1.0 - slope * ideal)
    } else if raw <= ideal {
        let slope = 1.0 / (ideal - lower);
        (slope, 1.0 - slope * ideal)
    } else {
        let slope = -1.0 / (upper - ideal);
        (slope, 1.0 - slope * ideal)
    };

    let scaled = slope * raw + intercept;

    let scaled = if lower.is_finite() { scaled.max(lower) } else { scaled };
    if upper.is_finite() {
        scaled.min(upper)
    } else {
        scaled
    }
}

/// Whether a score at `value` counts as failed, given `fails_on` and the
/// default equality tolerance `epsilon`.
pub fn is_failed(fails_on: Option<f64>, value: f64, epsilon: f64) -> bool {
    match fails_on {
        None => false,
        Some(target) if target.is_nan() && value.is_nan() => true,
        Some(target) => (value - target).abs() < epsilon,
    }
}

/// Drives the full per-metric scoring contract: normalizes `thresholds`,
/// applies each selector, computes the raw result, optionally bootstraps a
/// confidence interval, and collects everything into a [`Scores`].
pub fn score_metric(
    metric: &dyn Metric,
    pairs: &Pairs,
    thresholds: Vec<Threshold>,
    calculate_interval: bool,
    epsilon: f64,
) -> Result<Scores> {
    let meta = metric.meta();
    let thresholds = threshold::normalize(thresholds);
    let mut scores = Scores::new(meta.name.clone(), meta.weight);

    for threshold in thresholds {
        let filtered = threshold.apply(pairs);
        let raw = metric.compute(&filtered);

        let interval = if calculate_interval {
            bootstrap::confidence_interval(&filtered, &|p| metric.compute(p))
        } else {
            None
        };

        let scaled_value = scale_to_ideal(meta, raw) * threshold.weight;
        let scaled_interval = interval.map(|(lo, hi)| {
            (
                scale_to_ideal(meta, lo) * threshold.weight,
                scale_to_ideal(meta, hi) * threshold.weight,
            )
        });

        let score = Score {
            value: raw,
            interval,
            threshold,
            sample_size: filtered.len(),
            scaled_value,
            scaled_interval,
            failed: is_failed(meta.fails_on, raw, epsilon),
        };

        scores.insert(score)?;
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded_meta(ideal: f64) -> MetricMeta {
        let mut meta = MetricMeta::new("nse", 1.0).unwrap();
        meta.lower_bound = Some(-1.0);
        meta.upper_bound = Some(1.0);
        meta.ideal_value = Some(ideal);
        meta
    }

    #[test]
    fn identifier_strips_whitespace_underscores_and_hyphens() {
        let meta = MetricMeta::new("Nash Sutcliffe_Efficiency-Score", 1.0).unwrap();
        assert_eq!(meta.identifier(), "nashsutcliffeefficiencyscore");
    }

    #[test]
    fn scale_identity_at_upper_bound_when_ideal_is_upper() {
        let meta = bounded_meta(1.0);
        assert_eq!(scale_to_ideal(&meta, 1.0), 1.0);
        assert_eq!(scale_to_ideal(&meta, -1.0), -1.0);
    }

    #[test]
    fn scale_symmetry_at_interior_ideal() {
        let meta = bounded_meta(0.0);
        assert!((scale_to_ideal(&meta, 0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nan_raw_produces_nan_scaled() {
        let meta = bounded_meta(1.0);
        assert!(scale_to_ideal(&meta, f64::NAN).is_nan());
    }

    #[test]
    fn failure_detection_uses_epsilon() {
        assert!(is_failed(Some(0.0), 1e-5, 1e-4));
        assert!(!is_failed(Some(0.0), 1e-3, 1e-4));
    }

    #[test]
    fn rejects_non_finite_weight() {
        assert!(MetricMeta::new("bad", f64::NAN).is_err());
    }
}
