//! Dot-separated field paths into record values (`"stats.views"`).

use super::errors::{MutationError, MutationResult};
use serde_json::{Map, Value};

/// Splits and validates a field path.
pub fn segments(path: &str) -> MutationResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(MutationError::invalid(format!("invalid field path '{path}'")));
    }
    Ok(parts)
}

/// Reads the field at `path`, if present.
pub fn get<'a>(target: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(target, |current, segment| current.as_object()?.get(*segment))
}

/// Writes `value` at `path`, creating intermediate objects. Any non-object
/// met on the way (including the root) is replaced by an object.
pub fn set(target: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *target = value;
        return;
    };
    let mut current = target;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.to_string(), value);
}

/// Removes the field at `path`. Missing parents are left alone.
pub fn unset(target: &mut Value, path: &[&str]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = target;
    for segment in parents {
        match current.get_mut(*segment) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(object) = current.as_object_mut() {
        object.remove(*last);
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Converts an arithmetic result back to JSON, keeping integral values
/// integral so counters stay `3`, not `3.0`.
pub fn number(value: f64) -> MutationResult<Value> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Ok(Value::from(value as i64));
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| MutationError::invalid("increment produced a non-finite number"))
}

/// Numeric view of an existing value; absent or non-numeric counts as 0.
pub fn numeric(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}
