//! The payload passed to every handler bound to a fired event.

use serde_json::Value;
use std::collections::HashMap;

/// A single occurrence of a named event, carrying the caller's identity and
/// the arguments it was triggered with.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub caller: String,
    pub args: Vec<Value>,
    pub kwargs: HashMap<String, Value>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        caller: impl Into<String>,
        args: Vec<Value>,
        kwargs: HashMap<String, Value>,
    ) -> Self {
        Event {
            name: name.into(),
            caller: caller.into(),
            args,
            kwargs,
        }
    }

    /// A keyword argument by name, if present.
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }
}
