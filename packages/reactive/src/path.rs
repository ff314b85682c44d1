//! Property path evaluation and literal coercion for binding expressions

use crate::tracker::Targets;
use crate::value::{Object, Value};

/// Split `a.b[0].c` into `["a", "b", "0", "c"]`. Empty segments are dropped.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Follow `path` from `root`, recording dependencies for every reactive
/// property read along the way. Anything unreachable is `Undefined`.
pub fn evaluate(root: &Value, path: &str, targets: Targets<'_>) -> Value {
    let parts = segments(path);
    if parts.is_empty() {
        return Value::Undefined;
    }
    let mut current = root.clone();
    for part in parts {
        current = step(&current, part, targets);
        if matches!(current, Value::Undefined) {
            break;
        }
    }
    current
}

fn step(current: &Value, segment: &str, targets: Targets<'_>) -> Value {
    match current {
        Value::Object(object) => object.get(segment, targets),
        Value::Array(array) => {
            if segment == "length" {
                Value::from(array.len())
            } else {
                segment
                    .parse::<usize>()
                    .map(|index| array.get(index))
                    .unwrap_or(Value::Undefined)
            }
        }
        Value::String(text) => {
            if segment == "length" {
                Value::from(text.chars().count())
            } else {
                segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| text.chars().nth(index))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined)
            }
        }
        _ => Value::Undefined,
    }
}

/// Evaluate against the iteration `context` first, falling back to the
/// component `data` when the context yields nothing
pub fn resolve(context: &Object, data: &Object, path: &str, targets: Targets<'_>) -> Value {
    let found = evaluate(&Value::Object(context.clone()), path, targets);
    if !found.is_nullish() {
        return found;
    }
    evaluate(&Value::Object(data.clone()), path, targets)
}

fn is_numeric_literal(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

/// Interpret attribute text as a literal where possible, otherwise as a
/// path handed to `lookup`
pub fn coerce(text: &str, lookup: impl FnOnce(&str) -> Value) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        // blank text reads as the number 0
        return Value::Number(0.0);
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if is_numeric_literal(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Number(n);
        }
    }
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            return Value::String(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    lookup(trimmed)
}
