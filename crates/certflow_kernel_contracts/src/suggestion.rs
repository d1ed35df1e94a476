#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::certificate::ObservationCode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementContext {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// One raw reading entered during inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub field: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub context: Option<MeasurementContext>,
}

impl Measurement {
    pub fn new(field: impl Into<String>, value: f64) -> Self {
        Self {
            field: field.into(),
            value,
            unit: None,
            context: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(MeasurementContext::default)
            .device_type = Some(device_type.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.context
            .get_or_insert_with(MeasurementContext::default)
            .location = Some(location.into());
        self
    }

    pub fn device_type(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.device_type.as_deref())
    }

    pub fn location(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.location.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationSuggestion {
    pub code: ObservationCode,
    pub reason: String,
    pub regulation: String,
    pub fix_guidance: String,
}
