#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub section: String,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(section: &str, field: &str, message: &str) -> Self {
        Self {
            section: section.to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Machine-readable `section.field` path.
    pub fn path(&self) -> String {
        if self.field.is_empty() {
            self.section.clone()
        } else {
            format!("{}.{}", self.section, self.field)
        }
    }
}

/// Result of one named completion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCheck {
    pub name: &'static str,
    pub error: Option<ValidationError>,
}

impl CompletionCheck {
    pub fn passed(name: &'static str) -> Self {
        Self { name, error: None }
    }

    pub fn failed(name: &'static str, error: ValidationError) -> Self {
        Self {
            name,
            error: Some(error),
        }
    }

    pub fn from_condition(name: &'static str, ok: bool, error: ValidationError) -> Self {
        if ok {
            Self::passed(name)
        } else {
            Self::failed(name, error)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub ok: bool,
    pub missing: Vec<String>,
    pub errors: Vec<ValidationError>,
    pub completion_percent: u8,
}

impl CompletionReport {
    pub fn from_checks(checks: &[CompletionCheck]) -> Self {
        let total = checks.len();
        let errors: Vec<ValidationError> = checks.iter().filter_map(|c| c.error.clone()).collect();
        let missing: Vec<String> = errors.iter().map(ValidationError::path).collect();
        let passed = total - errors.len();
        let completion_percent = if total == 0 {
            100
        } else {
            ((passed as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            ok: missing.is_empty(),
            missing,
            errors,
            completion_percent,
        }
    }
}
