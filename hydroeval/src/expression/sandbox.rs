//! The fixed catalog of dotted names an expression's `OP` field may resolve
//! into, plus the prefixes that are always denied.
//!
//! Expressions are configuration, not code: an operator field is either one
//! of the arithmetic/`get`/`??` tokens handled directly by
//! [`super::tree`], or a dotted path into this catalog. There is no dynamic
//! import — the catalog is a fixed table built at startup, so a
//! configuration file can never reach an arbitrary function.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

type SandboxFn = fn(f64, f64) -> f64;

/// Prefixes denied even if a matching entry were ever added to the catalog —
/// collection-protocol internals and anything that could reach the network.
const DENIED_PREFIXES: &[&str] = &["collections.abc", "urllib", "http", "requests", "aiohttp"];

/// The approved dotted-path operator catalog.
pub static AVAILABLE_MODULES: Lazy<HashMap<&'static str, HashMap<&'static str, SandboxFn>>> =
    Lazy::new(|| {
        let mut math: HashMap<&'static str, SandboxFn> = HashMap::new();
        math.insert("min", f64::min);
        math.insert("max", f64::max);
        math.insert("pow", f64::powf);

        let mut modules = HashMap::new();
        modules.insert("math", math);
        modules
    });

/// Resolves a dotted path such as `"math.max"` against the sandbox catalog.
pub fn resolve(path: &str) -> Result<SandboxFn> {
    for denied in DENIED_PREFIXES {
        if path == *denied || path.starts_with(&format!("{denied}.")) {
            return Err(Error::Expression(format!(
                "sandbox denies access to '{path}'"
            )));
        }
    }

    let (module, name) = path.split_once('.').ok_or_else(|| {
        Error::Expression(format!("'{path}' is not a dotted sandbox operator path"))
    })?;

    AVAILABLE_MODULES
        .get(module)
        .and_then(|m| m.get(name))
        .copied()
        .ok_or_else(|| Error::Expression(format!("unknown sandbox operator '{path}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_an_approved_operator() {
        let f = resolve("math.max").unwrap();
        assert_eq!(f(1.0, 2.0), 2.0);
    }

    #[test]
    fn denies_collection_abc_access() {
        assert!(resolve("collections.abc.Mapping").is_err());
    }

    #[test]
    fn denies_http_client_access() {
        assert!(resolve("requests.get").is_err());
    }

    #[test]
    fn rejects_unknown_operator() {
        assert!(resolve("math.nonexistent").is_err());
    }
}
