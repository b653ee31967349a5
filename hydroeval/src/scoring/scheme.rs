//! Orchestrates scoring a full metric list against one location's paired
//! series, dispatching per-metric work through a [`Distributor`] and
//! narrating progress through a [`CommunicatorGroup`].

use super::metric::Metric;
use super::metric_results::MetricResults;
use super::pairs::Pairs;
use super::threshold::Threshold;
use crate::communicator::{CommunicatorGroup, Verbosity};
use crate::distributor::Distributor;
use crate::error::{Error, Result};
use serde_json::json;
use std::sync::Arc;

/// The default equality tolerance used for failure detection, overridable
/// via `METRIC_EPSILON`.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// A configured set of metrics plus the dispatch/narration policy used to
/// score them against one or more locations.
pub struct ScoringScheme {
    pub name: Option<String>,
    pub metrics: Vec<Arc<dyn Metric>>,
    pub calculate_interval: bool,
    pub epsilon: f64,
    pub distributor: Distributor,
}

impl ScoringScheme {
    pub fn new(metrics: Vec<Arc<dyn Metric>>) -> Self {
        ScoringScheme {
            name: None,
            metrics,
            calculate_interval: true,
            epsilon: DEFAULT_EPSILON,
            distributor: Distributor::Sequential,
        }
    }

    /// Scores every configured metric against `pairs`, narrating progress
    /// through `communicators`.
    pub async fn score(
        &self,
        pairs: &Pairs,
        thresholds: &[Threshold],
        weight: f64,
        communicators: &CommunicatorGroup,
    ) -> Result<MetricResults> {
        if self.metrics.is_empty() {
            return Err(Error::Configuration("no metrics configured for scoring".to_owned()));
        }

        let mut items = Vec::with_capacity(self.metrics.len());

        for metric in &self.metrics {
            let metric = metric.clone();
            let pairs = pairs.clone();
            let thresholds = thresholds.to_vec();
            let calculate_interval = self.calculate_interval;
            let epsilon = self.epsilon;

            communicators
                .write(
                    "metric_started",
                    &json!({ "metric": metric.meta().name }),
                    Verbosity::Loud,
                )
                .await?;

            // Scoring (and, when enabled, its per-threshold bootstrap
            // resampling) is CPU-bound, so it runs on tokio's blocking pool
            // rather than an async worker thread. Under `Distributor::Concurrent`
            // this lets several metrics' resamples run at once instead of
            // serializing on one executor thread.
            items.push(Box::pin(async move {
                tokio::task::spawn_blocking(move || {
                    super::metric::score_metric(&*metric, &pairs, thresholds, calculate_interval, epsilon)
                })
                .await
                .map_err(|e| Error::Configuration(format!("metric scoring task panicked: {e}")))?
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<super::scores::Scores>> + Send>>);
        }

        let outcomes = self.distributor.perform(items).await;
        let mut results = MetricResults::new(weight);

        for (metric, outcome) in self.metrics.iter().zip(outcomes) {
            let scores = outcome?;

            communicators
                .write(
                    "metric_completed",
                    &json!({
                        "metric": metric.meta().name,
                        "description": metric.meta().description,
                        "weight": metric.meta().weight,
                        "total": scores.performance(),
                        "scores": serde_json::to_value(&scores).unwrap_or(serde_json::Value::Null),
                    }),
                    Verbosity::All,
                )
                .await?;

            results.insert(scores);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::metric::MetricMeta;

    struct ConstantMetric(MetricMeta);

    impl Metric for ConstantMetric {
        fn meta(&self) -> &MetricMeta {
            &self.0
        }

        fn compute(&self, pairs: &Pairs) -> f64 {
            pairs.observed.iter().sum()
        }
    }

    #[tokio::test]
    async fn empty_metric_list_fails_with_configuration_error() {
        let scheme = ScoringScheme::new(vec![]);
        let pairs = Pairs::new(vec![1.0], vec![1.0]);
        let communicators = CommunicatorGroup::new();

        let err = scheme.score(&pairs, &[], 1.0, &communicators).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn scores_every_configured_metric() {
        let meta = MetricMeta::new("sum", 1.0).unwrap();
        let scheme = ScoringScheme::new(vec![Arc::new(ConstantMetric(meta))]);
        let pairs = Pairs::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]);
        let communicators = CommunicatorGroup::new();

        let results = scheme.score(&pairs, &[], 1.0, &communicators).await.unwrap();
        assert!(results.by_metric("sum").is_ok());
    }
}
