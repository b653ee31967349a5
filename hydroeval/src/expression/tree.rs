//! The variable-substitution and expression-evaluation tree walk.
//!
//! `process_expressions` mutates a [`serde_json::Value`] tree in place,
//! alternating a variable pass (`{{% name %}}`) and an expression pass
//! (`<% 'v1'[:cast] OP 'v2'[:cast] %>`) until a full pass changes nothing or
//! [`DEFAULT_PROCESS_ITERATION_COUNT`] iterations have run.

use super::cast::{apply_slice, Cast};
use super::sandbox;
use crate::error::{Error, Result};
use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How many alternating variable/expression passes `process_expressions`
/// runs before giving up on convergence.
pub const DEFAULT_PROCESS_ITERATION_COUNT: usize = 5;

/// The reserved mapping key holding scope-local variable definitions.
pub const DEFAULT_VARIABLES_KEY: &str = "variables";

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{%\s*([-A-Za-z0-9_+]+(?: [-A-Za-z0-9_+]+)*)\s*%\}\}").expect("valid regex")
});

static EXPRESSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<%\s*'([^']*)'(?::(\w+))?\s+(\S+)\s+'([^']*)'(?::(\w+))?\s*%>")
        .expect("valid regex")
});

/// A bound variable: either a plain value, or a callable constant such as
/// `"NOW"` that is invoked fresh on every substitution.
#[derive(Clone)]
pub enum VariableValue {
    Value(Value),
    Callable(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl VariableValue {
    fn resolve(&self) -> Value {
        match self {
            VariableValue::Value(v) => v.clone(),
            VariableValue::Callable(f) => f(),
        }
    }
}

impl From<Value> for VariableValue {
    fn from(value: Value) -> Self {
        VariableValue::Value(value)
    }
}

/// A scope's variable bindings.
pub type Variables = HashMap<String, VariableValue>;

fn builtin_constants() -> Variables {
    let mut constants: Variables = HashMap::new();

    constants.insert(
        "NOW".to_owned(),
        VariableValue::Callable(Arc::new(|| json!(Local::now().format("%Y-%m-%dT%H:%M%z").to_string()))),
    );
    constants.insert(
        "NOW UTC".to_owned(),
        VariableValue::Callable(Arc::new(|| json!(Utc::now().format("%Y-%m-%dT%H:%M%z").to_string()))),
    );
    constants.insert(
        "NOW NAIVE".to_owned(),
        VariableValue::Callable(Arc::new(|| json!(Local::now().format("%Y-%m-%dT%H:%M").to_string()))),
    );
    constants.insert("NULL".to_owned(), VariableValue::Value(Value::Null));

    constants
}

/// Runs the alternating variable/expression passes over `root`, mutating it
/// in place. Stops early once a full pass makes no changes.
pub fn process_expressions(root: &mut Value, variables_key: &str) -> Result<()> {
    let constants = builtin_constants();

    for _ in 0..DEFAULT_PROCESS_ITERATION_COUNT {
        let mutated_by_variables = variable_pass(root, &Variables::new(), &constants, variables_key)?;
        let mutated_by_expressions = expression_pass(root, &Variables::new(), &constants, variables_key)?;

        if !mutated_by_variables && !mutated_by_expressions {
            break;
        }
    }

    Ok(())
}

/// Builds the in-scope variable map for a mapping level: `inherited`,
/// overridden by this level's own `variables_key` entries.
///
/// Each local entry is itself fully resolved (substituted, then
/// expression-evaluated, to a fixed point) against the scope built so far
/// before being exposed to sibling keys — otherwise a variable defined as
/// an unevaluated expression literal (e.g. `"y": "<% '1' + '2' %>"`) would
/// be substituted into siblings as raw expression text instead of its
/// value.
fn merged_scope(node: &Value, inherited: &Variables, constants: &Variables, variables_key: &str) -> Result<Variables> {
    let mut scope = inherited.clone();

    if let Some(Value::Object(local)) = node.get(variables_key) {
        for (k, v) in local {
            let resolved = resolve_local_variable(v, &scope, constants)?;
            scope.insert(k.clone(), VariableValue::Value(resolved));
        }
    }

    Ok(scope)
}

/// Resolves a single local variable definition to a fixed point: alternates
/// variable substitution and expression evaluation, the same way
/// `process_expressions` does for the whole tree, but scoped to one value
/// and using only the scope accumulated from earlier sibling definitions
/// plus whatever the enclosing levels already bound.
fn resolve_local_variable(value: &Value, scope: &Variables, constants: &Variables) -> Result<Value> {
    let mut current = value.clone();

    for _ in 0..DEFAULT_PROCESS_ITERATION_COUNT {
        let mut changed = false;

        if let Value::String(s) = &current {
            let (substituted, did_substitute) = substitute_variables(s, scope, constants)?;
            current = substituted;
            changed |= did_substitute;
        }

        if let Value::String(s) = &current {
            if let Some(result) = evaluate_expression(s, scope, constants)? {
                current = result;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    Ok(current)
}

fn variable_pass(
    node: &mut Value,
    inherited: &Variables,
    constants: &Variables,
    variables_key: &str,
) -> Result<bool> {
    let scope = if matches!(node, Value::Object(_)) {
        Some(merged_scope(node, inherited, constants, variables_key)?)
    } else {
        None
    };

    match node {
        Value::Object(map) => {
            let scope = scope.expect("scope was computed above for an object node");
            let mut mutated = false;

            for (key, value) in map.iter_mut() {
                if key == variables_key {
                    continue;
                }
                mutated |= variable_pass(value, &scope, constants, variables_key)?;
            }

            Ok(mutated)
        }
        Value::Array(items) => {
            let mut mutated = false;
            for item in items.iter_mut() {
                mutated |= variable_pass(item, inherited, constants, variables_key)?;
            }
            Ok(mutated)
        }
        Value::String(s) => {
            let (replaced, changed) = substitute_variables(s, inherited, constants)?;
            if changed {
                *node = replaced;
            }
            Ok(changed)
        }
        _ => Ok(false),
    }
}

/// Repeatedly substitutes variable references in `text` until stable,
/// erroring out if the same intermediate value reappears (a substitution
/// loop).
fn substitute_variables(text: &str, scope: &Variables, constants: &Variables) -> Result<(Value, bool)> {
    let mut current = Value::String(text.to_owned());
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(current.to_string());
    let mut changed = false;

    loop {
        let as_str = match &current {
            Value::String(s) => s.clone(),
            _ => break,
        };

        if !VARIABLE_PATTERN.is_match(&as_str) {
            break;
        }

        let mut next = as_str.clone();
        let mut replaced_any = false;

        for caps in VARIABLE_PATTERN.captures_iter(&as_str) {
            let whole = caps.get(0).unwrap().as_str();
            let name = &caps[1];

            let Some(resolved) = scope.get(name).or_else(|| constants.get(name)) else {
                continue;
            };

            let value = resolved.resolve();

            if whole == as_str {
                // Full-string match: the node becomes the resolved value
                // verbatim, which may not itself be a string.
                next = match &value {
                    Value::String(s) => s.clone(),
                    other => {
                        current = other.clone();
                        replaced_any = true;
                        continue;
                    }
                };
            } else {
                let text_value = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                next = next.replacen(whole, &text_value, 1);
            }

            replaced_any = true;
        }

        if !replaced_any {
            break;
        }

        if matches!(current, Value::String(_)) {
            current = Value::String(next);
        }

        let marker = current.to_string();
        if !seen.insert(marker) {
            return Err(Error::Expression(format!(
                "substitution loop detected while resolving '{text}'"
            )));
        }

        changed = true;
    }

    Ok((current, changed))
}

fn expression_pass(
    node: &mut Value,
    inherited: &Variables,
    constants: &Variables,
    variables_key: &str,
) -> Result<bool> {
    let scope = if matches!(node, Value::Object(_)) {
        Some(merged_scope(node, inherited, constants, variables_key)?)
    } else {
        None
    };

    match node {
        Value::Object(map) => {
            let scope = scope.expect("scope was computed above for an object node");
            let mut mutated = false;

            for (key, value) in map.iter_mut() {
                if key == variables_key {
                    continue;
                }
                mutated |= expression_pass(value, &scope, constants, variables_key)?;
            }

            Ok(mutated)
        }
        Value::Array(items) => {
            let mut mutated = false;
            for item in items.iter_mut() {
                mutated |= expression_pass(item, inherited, constants, variables_key)?;
            }
            Ok(mutated)
        }
        Value::String(s) => {
            if let Some(result) = evaluate_expression(s, inherited, constants)? {
                *node = result;
                Ok(true)
            } else {
                Ok(false)
            }
        }
        _ => Ok(false),
    }
}

fn evaluate_expression(text: &str, scope: &Variables, constants: &Variables) -> Result<Option<Value>> {
    let Some(caps) = EXPRESSION_PATTERN.captures(text) else {
        return Ok(None);
    };

    let raw1 = &caps[1];
    let cast1 = caps.get(2).map(|m| m.as_str());
    let op = &caps[3];
    let raw2 = &caps[4];
    let cast2 = caps.get(5).map(|m| m.as_str());

    let value1 = resolve_operand(raw1, cast1, scope, constants)?;
    let value2 = resolve_operand(raw2, cast2, scope, constants)?;

    apply_operator(op, &value1, &value2).map(Some)
}

fn resolve_operand(raw: &str, cast: Option<&str>, scope: &Variables, constants: &Variables) -> Result<Value> {
    let (resolved, _) = substitute_variables(raw, scope, constants)?;

    let base = match resolved {
        Value::String(s) => {
            if VARIABLE_PATTERN.is_match(&s) {
                // Never resolved to a bound variable; treat the literal text
                // as a JSON scalar, falling back to a raw string.
                serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s))
            } else {
                serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s))
            }
        }
        other => other,
    };

    match cast {
        Some(name) => name.parse::<Cast>()?.apply(&base),
        None => Ok(base),
    }
}

fn apply_operator(op: &str, left: &Value, right: &Value) -> Result<Value> {
    match op {
        "+" | "-" | "*" | "/" => {
            let a = as_f64(left)?;
            let b = as_f64(right)?;
            let result = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => {
                    if b == 0.0 {
                        return Err(Error::Expression("division by zero in expression".to_owned()));
                    }
                    a / b
                }
                _ => unreachable!(),
            };
            Ok(json!(result))
        }
        "get" => get(left, right),
        "??" => {
            if is_present(left) {
                Ok(left.clone())
            } else {
                Ok(right.clone())
            }
        }
        dotted if dotted.contains('.') => {
            let f = sandbox::resolve(dotted)?;
            Ok(json!(f(as_f64(left)?, as_f64(right)?)))
        }
        other => Err(Error::Expression(format!("unknown expression operator '{other}'"))),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(_) => true,
    }
}

fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| Error::Expression(format!("'{s}' is not numeric"))),
        other => Err(Error::Expression(format!("{other} is not numeric"))),
    }
}

fn get(target: &Value, key: &Value) -> Result<Value> {
    let target = match target {
        Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::String(s.clone())),
        other => other.clone(),
    };

    match (&target, key) {
        (Value::Array(items), Value::Number(n)) => {
            let idx = n.as_i64().unwrap_or(0);
            let idx = if idx < 0 { items.len() as i64 + idx } else { idx };
            items
                .get(idx as usize)
                .cloned()
                .ok_or_else(|| Error::Expression(format!("index {idx} out of range")))
        }
        (Value::Object(map), Value::String(k)) => map
            .get(k)
            .cloned()
            .ok_or_else(|| Error::Expression(format!("key '{k}' not found"))),
        (Value::Array(_) | Value::String(_), Value::String(slice_text)) if slice_text.contains(':') => {
            let parsed = Cast::Slice.apply(&json!(slice_text))?;
            apply_slice(&target, &parsed)
        }
        _ => Err(Error::Expression("unsupported 'get' operand combination".to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_a_whole_string_variable() {
        let mut tree = json!({"value": "{{% name %}}"});
        let mut scope = Variables::new();
        scope.insert("name".to_owned(), VariableValue::Value(json!(42)));

        let constants = builtin_constants();
        variable_pass(&mut tree, &scope, &constants, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!(42));
    }

    #[test]
    fn substitutes_a_variable_embedded_in_text() {
        let mut tree = json!({"value": "prefix-{{% name %}}-suffix"});
        let mut scope = Variables::new();
        scope.insert("name".to_owned(), VariableValue::Value(json!("mid")));

        let constants = builtin_constants();
        variable_pass(&mut tree, &scope, &constants, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!("prefix-mid-suffix"));
    }

    #[test]
    fn child_variables_shadow_parent_variables() {
        let mut tree = json!({
            "variables": {"name": "outer"},
            "child": {
                "variables": {"name": "inner"},
                "value": "{{% name %}}"
            }
        });

        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["child"]["value"], json!("inner"));
    }

    #[test]
    fn detects_a_self_referential_substitution_loop() {
        let mut tree = json!({"variables": {"a": "{{% a %}}"}, "value": "{{% a %}}"});

        let err = process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap_err();
        assert!(matches!(err, Error::Expression(_)));
    }

    #[test]
    fn evaluates_an_addition_expression() {
        let mut tree = json!({"value": "<% '2' OP '3' %>".replace("OP", "+")});
        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!(5.0));
    }

    #[test]
    fn evaluates_get_against_a_list_literal() {
        let mut tree = json!({"value": "<% '[10,20,30]' get '1' %>"});
        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!(20));
    }

    #[test]
    fn coalesce_prefers_the_present_left_side() {
        let mut tree = json!({"value": "<% 'present' OP 'fallback' %>".replace("OP", "??")});
        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!("present"));
    }

    #[test]
    fn coalesce_falls_back_when_the_left_side_is_empty() {
        let mut tree = json!({"value": "<% '' OP 'fallback' %>".replace("OP", "??")});
        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();

        assert_eq!(tree["value"], json!("fallback"));
    }

    #[test]
    fn idempotent_after_a_clean_pass() {
        let mut tree = json!({"value": "<% '2' OP '3' %>".replace("OP", "+")});
        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();
        let once = tree.clone();

        process_expressions(&mut tree, DEFAULT_VARIABLES_KEY).unwrap();
        assert_eq!(tree, once);
    }
}
