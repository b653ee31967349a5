//! Thresholds, metrics, scores, aggregation, scaling and bootstrapping —
//! the scoring engine.

pub mod bootstrap;
pub mod metric;
pub mod metric_results;
pub mod pairs;
pub mod registry;
pub mod scheme;
pub mod score;
pub mod scores;
pub mod threshold;

pub use metric::{scale_to_ideal, Metric, MetricMeta};
pub use metric_results::MetricResults;
pub use pairs::Pairs;
pub use scheme::ScoringScheme;
pub use score::Score;
pub use scores::Scores;
pub use threshold::Threshold;
