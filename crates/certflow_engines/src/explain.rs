#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use certflow_kernel_contracts::certificate::{Observation, ObservationCode, SeverityClass};
use certflow_kernel_contracts::outcome::{OutcomeResult, OutcomeValue};
use certflow_kernel_contracts::snapshot::CanonicalCertSnapshot;

const MAX_DEFECT_EXAMPLES: usize = 3;
const MAX_FI_EXAMPLES: usize = 5;

/// Unresolved observation as the narrative sees it.
struct Finding<'a> {
    code: ObservationCode,
    location: &'a str,
    description: &'a str,
}

impl Finding<'_> {
    fn describe(&self) -> String {
        let location = self.location.trim();
        if location.is_empty() {
            self.description.trim().to_string()
        } else {
            format!("{location}: {}", self.description.trim())
        }
    }
}

fn of_class<'f, 'a>(findings: &'f [Finding<'a>], class: SeverityClass) -> Vec<&'f Finding<'a>> {
    findings
        .iter()
        .filter(|f| f.code.severity_class() == Some(class))
        .collect()
}

/// Distinct codes of `items` in first-seen order, e.g. `C1` or `Minor/Info`.
fn codes_of(items: &[&Finding<'_>]) -> String {
    let mut codes: Vec<&str> = Vec::new();
    for f in items {
        if !codes.contains(&f.code.as_str()) {
            codes.push(f.code.as_str());
        }
    }
    codes.join("/")
}

fn enumerate(heading: &str, items: &[&Finding<'_>], limit: usize) -> String {
    let shown: Vec<String> = items.iter().take(limit).map(|f| f.describe()).collect();
    let mut line = format!("{heading}: {}", shown.join("; "));
    if items.len() > limit {
        line.push_str(&format!(" … and {} more", items.len() - limit));
    }
    line.push('.');
    line
}

/// Human-readable narrative of an outcome, embedded verbatim in issued documents.
/// Output depends only on the inputs and their order.
pub fn explain_outcome(result: &OutcomeResult, observations: &[Observation]) -> String {
    let findings: Vec<Finding<'_>> = observations
        .iter()
        .filter(|o| o.is_unresolved())
        .map(|o| Finding {
            code: o.code.clone(),
            location: &o.location,
            description: &o.description,
        })
        .collect();
    narrate(result, &findings)
}

/// Narrative for an issued snapshot, rebuilt from its frozen outcome and rule trail.
/// `None` when the snapshot carries no recognised outcome.
pub fn explain_snapshot(snapshot: &CanonicalCertSnapshot) -> Option<String> {
    let core = &snapshot.certificate;
    let outcome = match core.outcome.as_deref()? {
        "satisfactory" => OutcomeValue::Satisfactory,
        "unsatisfactory" => OutcomeValue::Unsatisfactory,
        "further_investigation" => OutcomeValue::FurtherInvestigation,
        _ => return None,
    };
    let result = OutcomeResult {
        outcome,
        reason: core.outcome_reason.clone().unwrap_or_default(),
        details: core.outcome_details.clone(),
    };
    let findings: Vec<Finding<'_>> = snapshot
        .observations
        .iter()
        .filter(|o| o.resolved_at.is_none())
        .map(|o| Finding {
            code: ObservationCode::parse(&o.code),
            location: &o.location,
            description: &o.description,
        })
        .collect();
    Some(narrate(&result, &findings))
}

fn narrate(result: &OutcomeResult, findings: &[Finding<'_>]) -> String {
    let mut parts: Vec<String> = Vec::new();
    match result.outcome {
        OutcomeValue::Satisfactory => {
            parts.push("The installation was found to be in a satisfactory condition.".into());
            let improvements = of_class(findings, SeverityClass::Improvement);
            let n = improvements.len();
            if n > 0 {
                parts.push(format!(
                    "{n} improvement recommendation{} ({}) noted.",
                    if n == 1 { "" } else { "s" },
                    codes_of(&improvements)
                ));
            }
        }
        OutcomeValue::Unsatisfactory => {
            parts.push("The installation was found to be in an unsatisfactory condition.".into());
            let danger = of_class(findings, SeverityClass::Danger);
            if !danger.is_empty() {
                let heading = format!("Danger present ({})", codes_of(&danger));
                parts.push(enumerate(&heading, &danger, MAX_DEFECT_EXAMPLES));
            }
            let potential = of_class(findings, SeverityClass::PotentiallyDangerous);
            if !potential.is_empty() {
                let heading = format!("Potentially dangerous ({})", codes_of(&potential));
                parts.push(enumerate(&heading, &potential, MAX_DEFECT_EXAMPLES));
            }
            parts.extend(
                result
                    .failing_rules()
                    .filter(|d| d.rule.starts_with("test.") || d.rule.starts_with("checklist."))
                    .map(|d| d.message.clone()),
            );
        }
        OutcomeValue::FurtherInvestigation => {
            parts.push(
                "Further investigation is required before the condition can be confirmed."
                    .into(),
            );
            let fi = of_class(findings, SeverityClass::FurtherInvestigation);
            if !fi.is_empty() {
                parts.push(enumerate("Items to investigate (FI)", &fi, MAX_FI_EXAMPLES));
            }
        }
    }
    parts.join(" ")
}

/// Unresolved observation counts keyed by code.
pub fn observation_summary(observations: &[Observation]) -> BTreeMap<String, usize> {
    let mut summary = BTreeMap::new();
    for o in observations.iter().filter(|o| o.is_unresolved()) {
        *summary.entry(o.code.as_str().to_string()).or_insert(0) += 1;
    }
    summary
}
