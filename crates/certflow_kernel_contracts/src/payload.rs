#![forbid(unsafe_code)]

use serde_json::Value;

use crate::certificate::DATA_VERSION_STRUCTURED;

/// Top-level keys that only the structured schema writes.
pub const V2_ONLY_KEYS: &[&str] = &[
    "boards",
    "contractorDetails",
    "clientDetails",
    "supplyCharacteristics",
];

pub fn is_v2_certificate_data(data: &Value) -> bool {
    match data.as_object() {
        Some(map) => V2_ONLY_KEYS.iter().any(|k| map.contains_key(*k)),
        None => false,
    }
}

/// Certificate payload discriminated at the data-access boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CertificatePayload<'a> {
    Legacy(&'a Value),
    Structured(&'a Value),
}

impl<'a> CertificatePayload<'a> {
    pub fn classify(data_version: u8, data: &'a Value) -> Self {
        if data_version >= DATA_VERSION_STRUCTURED || is_v2_certificate_data(data) {
            CertificatePayload::Structured(data)
        } else {
            CertificatePayload::Legacy(data)
        }
    }
}

pub fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |cur, key| cur.get(*key))
}

/// Trimmed string at `path`; `None` when absent, non-string or blank.
pub fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(value, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn has_text(value: &Value, path: &[&str]) -> bool {
    str_at(value, path).is_some()
}

pub fn bool_at(value: &Value, path: &[&str]) -> bool {
    value_at(value, path)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Non-null, non-blank scalar (number, bool or text) at `path`.
pub fn has_scalar(value: &Value, path: &[&str]) -> bool {
    match value_at(value, path) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) | Some(Value::Bool(_)) => true,
        _ => false,
    }
}

pub fn array_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    value_at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
