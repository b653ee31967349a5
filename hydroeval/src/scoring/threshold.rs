//! Named predicates that partition a [`Pairs`] frame before scoring.

use super::pairs::Pairs;
use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

type Selector = Arc<dyn Fn(&Pairs) -> Pairs + Send + Sync>;

/// A named predicate over a [`Pairs`] frame.
///
/// Equality and hashing are by `(name, value)` only — two thresholds with
/// the same name and value are the same threshold even if constructed with
/// different selector closures or weights, which is what lets a `Scores`
/// collection treat "duplicate threshold" as a name+value collision rather
/// than a pointer comparison on the selector.
#[derive(Clone)]
pub struct Threshold {
    pub name: String,
    pub value: Value,
    pub weight: f64,
    selector: Selector,
}

impl Threshold {
    pub fn new(
        name: impl Into<String>,
        value: Value,
        weight: f64,
        selector: impl Fn(&Pairs) -> Pairs + Send + Sync + 'static,
    ) -> Result<Self> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(Error::Configuration("a threshold's name must not be empty".to_owned()));
        }
        if !(weight > 0.0) {
            return Err(Error::Configuration(format!(
                "threshold '{name}' must have a positive weight, got {weight}"
            )));
        }

        Ok(Threshold {
            name,
            value,
            weight,
            selector: Arc::new(selector),
        })
    }

    /// The default `"All"` threshold: weight 1, identity selector.
    pub fn all() -> Self {
        Threshold::new("All", Value::Null, 1.0, |pairs| pairs.clone())
            .expect("the default threshold is always valid")
    }

    pub fn apply(&self, pairs: &Pairs) -> Pairs {
        (self.selector)(pairs)
    }
}

impl fmt::Debug for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threshold")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("weight", &self.weight)
            .finish()
    }
}

impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Eq for Threshold {}

impl Hash for Threshold {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        // `Value` has no `Hash` impl; its canonical JSON text is a stable
        // stand-in since equal values always render identically.
        self.value.to_string().hash(state);
    }
}

/// Replaces an empty threshold list with the default `[All]` list, per the
/// metric contract's normalization step.
pub fn normalize(thresholds: Vec<Threshold>) -> Vec<Threshold> {
    if thresholds.is_empty() {
        vec![Threshold::all()]
    } else {
        thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn rejects_non_positive_weight() {
        assert!(Threshold::new("low", json!(1.0), 0.0, |p| p.clone()).is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(Threshold::new("  ", json!(1.0), 1.0, |p| p.clone()).is_err());
    }

    #[test]
    fn equality_ignores_weight_and_selector() {
        let a = Threshold::new("flood", json!(100.0), 1.0, |p| p.clone()).unwrap();
        let b = Threshold::new("flood", json!(100.0), 5.0, |p| p.row(0)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_consistent_with_equality() {
        let a = Threshold::new("flood", json!(100.0), 1.0, |p| p.clone()).unwrap();
        let b = Threshold::new("flood", json!(100.0), 5.0, |p| p.clone()).unwrap();

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn empty_threshold_list_normalizes_to_all() {
        let normalized = normalize(vec![]);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].name, "All");
    }
}
