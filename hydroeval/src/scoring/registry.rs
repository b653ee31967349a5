//! A process-wide table of registered metrics, keyed by their derived
//! identifier.
//!
//! Mirrors the global `OnceLock`/`RwLock`-guarded registry idiom used
//! elsewhere for process-wide state, rather than Python's runtime subclass
//! discovery — metrics are registered explicitly once, at startup.

use super::metric::Metric;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn Metric>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `metric` under its derived identifier, overwriting any
/// previous registration with the same identifier.
pub fn register(metric: Arc<dyn Metric>) {
    let id = metric.meta().identifier();
    REGISTRY.write().insert(id, metric);
}

/// Looks up a previously registered metric by name (matched via the same
/// identifier derivation as registration).
pub fn lookup(name: &str) -> Result<Arc<dyn Metric>> {
    let id: String = name
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase();

    REGISTRY
        .read()
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::Lookup(format!("no metric registered under '{name}'")))
}

pub fn registered_count() -> usize {
    REGISTRY.read().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::metric::MetricMeta;
    use crate::scoring::pairs::Pairs;

    struct ConstantMetric(MetricMeta);

    impl Metric for ConstantMetric {
        fn meta(&self) -> &MetricMeta {
            &self.0
        }

        fn compute(&self, _pairs: &Pairs) -> f64 {
            1.0
        }
    }

    #[test]
    fn registers_and_looks_up_by_identifier_variants() {
        let meta = MetricMeta::new("Mean Absolute Error", 1.0).unwrap();
        register(Arc::new(ConstantMetric(meta)));

        assert!(lookup("mean-absolute_error").is_ok());
        assert!(lookup("totally-unregistered-metric").is_err());
    }
}
