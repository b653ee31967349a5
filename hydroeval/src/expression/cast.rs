//! The cast catalog applied to each side of an expression before the
//! operator runs.

use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::str::FromStr;

/// A named conversion applied to an expression operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    List,
    Slice,
    Set,
    Int,
    Float,
    Str,
    Date,
    Dict,
    Path,
}

impl FromStr for Cast {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "list" => Ok(Cast::List),
            "slice" => Ok(Cast::Slice),
            "set" => Ok(Cast::Set),
            "int" | "integer" => Ok(Cast::Int),
            "float" | "number" => Ok(Cast::Float),
            "str" | "string" => Ok(Cast::Str),
            "date" | "datetime" => Ok(Cast::Date),
            "dict" | "map" => Ok(Cast::Dict),
            "path" => Ok(Cast::Path),
            other => Err(Error::Expression(format!("unknown cast '{other}'"))),
        }
    }
}

impl Cast {
    /// Applies this cast to `value`, which may be a string literal or an
    /// already-structured value carried over from a prior pass.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        match self {
            Cast::List | Cast::Set => as_sequence(value),
            Cast::Slice => as_slice_spec(value),
            Cast::Int => as_int(value),
            Cast::Float => as_float(value),
            Cast::Str => Ok(Value::String(as_string(value))),
            Cast::Date => Ok(Value::String(as_string(value))),
            Cast::Dict => as_dict(value),
            Cast::Path => Ok(Value::String(as_string(value))),
        }
    }
}

fn as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_sequence(value: &Value) -> Result<Value> {
    match value {
        Value::Array(_) => Ok(value.clone()),
        Value::String(s) => {
            if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(s) {
                return Ok(parsed);
            }
            Ok(Value::Array(
                s.split(',').map(|part| json!(part.trim())).collect(),
            ))
        }
        other => Ok(Value::Array(vec![other.clone()])),
    }
}

fn as_dict(value: &Value) -> Result<Value> {
    match value {
        Value::Object(_) => Ok(value.clone()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map_err(|e| Error::Expression(format!("cannot cast '{s}' to a map: {e}"))),
        other => Err(Error::Expression(format!("cannot cast {other} to a map"))),
    }
}

fn as_int(value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) if n.is_i64() => Ok(value.clone()),
        Value::Number(n) => Ok(json!(n.as_f64().unwrap_or(0.0) as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(|n| json!(n))
            .or_else(|_| s.trim().parse::<f64>().map(|f| json!(f as i64)))
            .map_err(|_| Error::Expression(format!("cannot cast '{s}' to int"))),
        Value::Bool(b) => Ok(json!(*b as i64)),
        other => Err(Error::Expression(format!("cannot cast {other} to int"))),
    }
}

fn as_float(value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(json!(n.as_f64().unwrap_or(0.0))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| json!(f))
            .map_err(|_| Error::Expression(format!("cannot cast '{s}' to float"))),
        other => Err(Error::Expression(format!("cannot cast {other} to float"))),
    }
}

/// A parsed `start[,stop[,step]]` or `start|stop|step` slice specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

fn as_slice_spec(value: &Value) -> Result<Value> {
    let text = as_string(value);
    let separator = if text.contains('|') { '|' } else { ',' };

    let parts: Vec<Option<i64>> = text
        .split(separator)
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                None
            } else {
                part.parse::<i64>().ok()
            }
        })
        .collect();

    let spec = SliceSpec {
        start: parts.first().copied().flatten(),
        stop: parts.get(1).copied().flatten(),
        step: parts.get(2).copied().flatten(),
    };

    Ok(json!({
        "start": spec.start,
        "stop": spec.stop,
        "step": spec.step,
    }))
}

/// Applies a parsed slice object (as produced by [`Cast::Slice`]) to a
/// sequence or string value.
pub fn apply_slice(target: &Value, slice: &Value) -> Result<Value> {
    let start = slice.get("start").and_then(Value::as_i64);
    let stop = slice.get("stop").and_then(Value::as_i64);
    let step = slice.get("step").and_then(Value::as_i64).unwrap_or(1);

    match target {
        Value::Array(items) => {
            let sliced = slice_indices(items.len(), start, stop, step)
                .into_iter()
                .map(|i| items[i].clone())
                .collect();
            Ok(Value::Array(sliced))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let sliced: String = slice_indices(chars.len(), start, stop, step)
                .into_iter()
                .map(|i| chars[i])
                .collect();
            Ok(Value::String(sliced))
        }
        other => Err(Error::Expression(format!("cannot slice {other}"))),
    }
}

fn slice_indices(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let len = len as i64;
    let resolve = |value: i64| -> i64 { if value < 0 { (value + len).max(0) } else { value.min(len) } };

    let start = resolve(start.unwrap_or(0));
    let stop = resolve(stop.unwrap_or(len));

    let mut indices = Vec::new();
    if step > 0 {
        let mut i = start;
        while i < stop {
            indices.push(i as usize);
            i += step;
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cast_names_and_aliases() {
        assert_eq!("int".parse::<Cast>().unwrap(), Cast::Int);
        assert_eq!("integer".parse::<Cast>().unwrap(), Cast::Int);
        assert_eq!("number".parse::<Cast>().unwrap(), Cast::Float);
        assert!("bogus".parse::<Cast>().is_err());
    }

    #[test]
    fn int_cast_parses_strings() {
        let out = Cast::Int.apply(&json!("42")).unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn list_cast_splits_comma_separated_strings() {
        let out = Cast::List.apply(&json!("a, b, c")).unwrap();
        assert_eq!(out, json!(["a", "b", "c"]));
    }

    #[test]
    fn slice_cast_accepts_pipe_or_comma_separated_values() {
        let comma = as_slice_spec(&json!("1,3")).unwrap();
        let pipe = as_slice_spec(&json!("1|3")).unwrap();
        assert_eq!(comma, pipe);
    }

    #[test]
    fn slice_is_applied_to_a_list() {
        let spec = as_slice_spec(&json!("1,3")).unwrap();
        let out = apply_slice(&json!([0, 1, 2, 3, 4]), &spec).unwrap();
        assert_eq!(out, json!([1, 2]));
    }
}
