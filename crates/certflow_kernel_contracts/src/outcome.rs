#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeValue {
    Satisfactory,
    Unsatisfactory,
    FurtherInvestigation,
}

impl OutcomeValue {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeValue::Satisfactory => "satisfactory",
            OutcomeValue::Unsatisfactory => "unsatisfactory",
            OutcomeValue::FurtherInvestigation => "further_investigation",
        }
    }
}

impl std::fmt::Display for OutcomeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated rule in the outcome audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDetail {
    pub rule: String,
    pub passed: bool,
    pub message: String,
}

impl RuleDetail {
    pub fn pass(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            passed: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeResult {
    pub outcome: OutcomeValue,
    pub reason: String,
    pub details: Vec<RuleDetail>,
}

impl OutcomeResult {
    pub fn failing_rules(&self) -> impl Iterator<Item = &RuleDetail> {
        self.details.iter().filter(|d| !d.passed)
    }

    pub fn has_rule(&self, rule: &str) -> bool {
        self.details.iter().any(|d| d.rule == rule)
    }
}
