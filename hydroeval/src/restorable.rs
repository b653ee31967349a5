//! Transport-safe packaging of a callable/value reference, restored
//! against a build-time registry.
//!
//! Python resolves `module.name` dynamically at restore time via
//! `importlib`; Rust has no runtime import, so the "reflection" here is a
//! registry populated once at startup (typically from `main`, mirroring
//! how the teacher's metric/telemetry registries are seeded before first
//! use). A [`Package`] is otherwise the same wire shape: a module path, a
//! possibly-dotted name, positional/keyword arguments, and an
//! `is_function` flag.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A callable registered for restoration. Returning the special
/// `{"__callable__": "<path>"}` marker (see [`callable_marker`]) tells
/// [`restore`] to invoke the next callable in the chain before returning.
pub type RestoreFn = Arc<dyn Fn(Vec<Value>, HashMap<String, Value>) -> Result<Value> + Send + Sync>;

enum Target {
    Value(Value),
    Callable(RestoreFn),
}

static REGISTRY: Lazy<RwLock<HashMap<String, Target>>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn key(module: &str, name: &str) -> String {
    format!("{module}.{name}")
}

/// Registers a plain value under `module.name`.
pub fn register_value(module: &str, name: &str, value: Value) {
    REGISTRY.write().insert(key(module, name), Target::Value(value));
}

/// Registers a callable under `module.name`.
pub fn register_callable(module: &str, name: &str, f: RestoreFn) {
    REGISTRY.write().insert(key(module, name), Target::Callable(f));
}

/// Marks a returned value as itself callable, causing [`restore`] to
/// invoke the named target again before returning.
pub fn callable_marker(module: &str, name: &str) -> Value {
    serde_json::json!({ "__callable__": key(module, name) })
}

fn as_callable_marker(value: &Value) -> Option<&str> {
    value.get("__callable__").and_then(Value::as_str)
}

/// The on-wire representation of a callable or restorable object
/// reference.
#[derive(Debug, Clone)]
pub struct Package {
    pub module: String,
    pub name: String,
    pub arguments: Vec<Value>,
    pub keyword_arguments: HashMap<String, Value>,
    pub is_function: bool,
}

const NESTED_PACKAGE_MARKER: &str = "__package__";

impl Package {
    pub fn new(module: impl Into<String>, name: impl Into<String>, is_function: bool) -> Result<Self> {
        let module = module.into();
        if module == "__main__" {
            return Err(Error::Restore(
                "a package cannot reference the process entry module".to_owned(),
            ));
        }

        Ok(Package {
            module,
            name: name.into(),
            arguments: Vec::new(),
            keyword_arguments: HashMap::new(),
            is_function,
        })
    }

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_keyword_arguments(mut self, kwargs: HashMap<String, Value>) -> Self {
        self.keyword_arguments = kwargs;
        self
    }

    /// Serializes this package as a nested-restorable marker, for embedding
    /// inside another package's arguments.
    pub fn to_marker(&self) -> Result<Value> {
        let mut map = Map::new();
        map.insert("module".to_owned(), Value::String(self.module.clone()));
        map.insert("name".to_owned(), Value::String(self.name.clone()));
        map.insert(
            "arguments".to_owned(),
            Value::Array(self.arguments.clone()),
        );
        map.insert(
            "keyword_arguments".to_owned(),
            serde_json::to_value(&self.keyword_arguments)
                .map_err(|e| Error::Serialization(e.to_string()))?,
        );
        map.insert("is_function".to_owned(), Value::Bool(self.is_function));

        Ok(serde_json::json!({ NESTED_PACKAGE_MARKER: Value::Object(map) }))
    }

    fn from_marker(value: &Value) -> Option<Package> {
        let inner = value.get(NESTED_PACKAGE_MARKER)?;
        Some(Package {
            module: inner.get("module")?.as_str()?.to_owned(),
            name: inner.get("name")?.as_str()?.to_owned(),
            arguments: inner.get("arguments")?.as_array()?.clone(),
            keyword_arguments: serde_json::from_value(inner.get("keyword_arguments")?.clone()).ok()?,
            is_function: inner.get("is_function")?.as_bool()?,
        })
    }
}

/// What [`restore`] returns: either a plain restored value, or a function
/// bound with its accumulated arguments, awaiting further positional
/// extension (the realization of the spec's "returns a partial
/// application").
pub enum Restored {
    Value(Value),
    Bound {
        target: RestoreFn,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    },
}

impl Restored {
    /// Invokes a bound restoration, or returns a plain value unchanged.
    pub fn call(self, extra_args: Vec<Value>, extra_kwargs: HashMap<String, Value>) -> Result<Value> {
        match self {
            Restored::Value(v) => Ok(v),
            Restored::Bound { target, mut args, mut kwargs } => {
                args.extend(extra_args);
                kwargs.extend(extra_kwargs);
                target(args, kwargs)
            }
        }
    }
}

/// Resolves every nested package marker in `value`, recursively.
fn resolve_nested(value: Value) -> Result<Value> {
    if let Some(nested) = Package::from_marker(&value) {
        return restore(&nested, vec![], HashMap::new())?.call(vec![], HashMap::new());
    }

    match value {
        Value::Array(items) => {
            let resolved: Result<Vec<Value>> = items.into_iter().map(resolve_nested).collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k, resolve_nested(v)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

/// Restores `package` against the registry, concatenating `call_args`/
/// `call_kwargs` with the packaged ones.
///
/// - A function-flagged, callable target returns a bound [`Restored::Bound`]
///   rather than invoking immediately.
/// - A non-function callable target is invoked immediately; if the result
///   carries a [`callable_marker`], the chain is followed until a plain
///   value comes back.
/// - Anything else (a registered plain value, or nothing registered) is
///   returned as-is.
pub fn restore(package: &Package, call_args: Vec<Value>, call_kwargs: HashMap<String, Value>) -> Result<Restored> {
    if package.module == "__main__" {
        return Err(Error::Restore(
            "a package cannot reference the process entry module".to_owned(),
        ));
    }

    let mut args: Vec<Value> = Vec::with_capacity(package.arguments.len() + call_args.len());
    for arg in &package.arguments {
        args.push(resolve_nested(arg.clone())?);
    }
    args.extend(call_args);

    let mut kwargs = HashMap::with_capacity(package.keyword_arguments.len());
    for (k, v) in &package.keyword_arguments {
        kwargs.insert(k.clone(), resolve_nested(v.clone())?);
    }
    kwargs.extend(call_kwargs);

    let lookup_key = key(&package.module, &package.name);
    let target = REGISTRY.read();

    match target.get(&lookup_key) {
        None => Err(Error::Restore(format!(
            "could not resolve '{lookup_key}' in the restorable registry"
        ))),
        Some(Target::Value(value)) => Ok(Restored::Value(value.clone())),
        Some(Target::Callable(f)) if package.is_function => Ok(Restored::Bound {
            target: f.clone(),
            args,
            kwargs,
        }),
        Some(Target::Callable(f)) => {
            let mut result = f(args, kwargs)?;
            drop(target);

            while let Some(next_key) = as_callable_marker(&result).map(str::to_owned) {
                let registry = REGISTRY.read();
                let next = registry
                    .get(&next_key)
                    .ok_or_else(|| Error::Restore(format!("could not resolve '{next_key}'")))?;
                match next {
                    Target::Value(v) => {
                        result = v.clone();
                        break;
                    }
                    Target::Callable(f) => {
                        let f = f.clone();
                        drop(registry);
                        result = f(vec![], HashMap::new())?;
                    }
                }
            }

            Ok(Restored::Value(result))
        }
    }
}
