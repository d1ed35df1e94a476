#![forbid(unsafe_code)]

use serde_json::{Map, Value};

/// Numeric reading from an open measurement bag. Accepts JSON numbers and numeric
/// strings; a leading `>` over-range marker (e.g. `">200"`) reads as its bound.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let t = s.trim();
            let t = t.strip_prefix('>').unwrap_or(t).trim();
            if t.is_empty() {
                return None;
            }
            t.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn number_field(data: &Map<String, Value>, key: &str) -> Option<f64> {
    data.get(key).and_then(coerce_number)
}

pub fn string_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
