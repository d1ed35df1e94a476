#![forbid(unsafe_code)]

use certflow_kernel_contracts::cert_type::{get_type_category, CertCategory};
use certflow_kernel_contracts::certificate::{
    ChecklistItem, Observation, SeverityClass, TestResult,
};
use certflow_kernel_contracts::outcome::{OutcomeResult, OutcomeValue, RuleDetail};

use crate::measurements::{number_field, string_field};
use crate::thresholds::{
    voc_deviation_percent, zs_max_for_device, ELECTRICAL_IR, EMERGENCY_LIGHTING, FIRE_ALARM,
    RCD_TRIP, SOLAR_PV,
};

pub mod rules {
    pub const OBS_C1_PRESENT: &str = "obs.c1_present";
    pub const OBS_C2_PRESENT: &str = "obs.c2_present";
    pub const OBS_FI_PRESENT: &str = "obs.fi_present";
    pub const OBS_C3_PRESENT: &str = "obs.c3_present";
    pub const CHECKLIST_FAIL_ITEMS: &str = "checklist.fail_items";
    pub const CHECKLIST_FAIL_DETECTION_COVERAGE: &str = "checklist.fail_detection_coverage";

    pub const TEST_ZS_EXCEEDED: &str = "test.zs_exceeded";
    pub const TEST_IR_CRITICAL: &str = "test.ir_critical";
    pub const TEST_IR_ADVISORY: &str = "test.ir_advisory";
    pub const TEST_RCD_SLOW: &str = "test.rcd_slow";
    pub const TEST_SOUNDER_LEVEL_LOW: &str = "test.sounder_level_low";
    pub const TEST_BATTERY_STANDBY_SHORT: &str = "test.battery_standby_short";
    pub const TEST_EL_DURATION_SHORT: &str = "test.el_duration_short";
    pub const TEST_EL_LUX_LOW: &str = "test.el_lux_low";
    pub const TEST_PV_IR_LOW: &str = "test.pv_ir_low";
    pub const TEST_PV_EARTH_CONTINUITY_HIGH: &str = "test.pv_earth_continuity_high";
    pub const TEST_PV_VOC_DEVIATION: &str = "test.pv_voc_deviation";

    /// Failing rule-id prefixes that make a certificate unsatisfactory.
    pub const HARD_FAIL_PREFIXES: &[&str] = &["obs.c1", "obs.c2", "checklist.fail", "test."];
    pub const FURTHER_INVESTIGATION_PREFIX: &str = "obs.fi";

    pub fn per_circuit(rule: &str, circuit: &str) -> String {
        format!("{rule}.{circuit}")
    }
}

pub const REASON_ALL_PASSED: &str = "All checks passed.";
pub const REASON_NO_RULES: &str = "No compliance rules apply to this certificate type.";
pub const REASON_RECOMMENDATIONS_PREFIX: &str = "Satisfactory with recommendations.";

/// Computes the aggregate regulatory outcome for a certificate's current data.
///
/// Rule groups run in a fixed order (observations, checklists, tests) and append to
/// one audit trail; [`resolve_outcome`] then applies the worst-wins policy.
pub fn compute_outcome(
    cert_type: &str,
    observations: &[Observation],
    checklists: &[ChecklistItem],
    test_results: &[TestResult],
) -> OutcomeResult {
    let Some(category) = get_type_category(cert_type) else {
        return OutcomeResult {
            outcome: OutcomeValue::Satisfactory,
            reason: REASON_NO_RULES.to_string(),
            details: Vec::new(),
        };
    };

    let unresolved: Vec<&Observation> =
        observations.iter().filter(|o| o.is_unresolved()).collect();
    let mut details = Vec::new();

    if category.uses_observation_codes() {
        observation_rules(category, &unresolved, &mut details);
    }
    checklist_rules(checklists, &mut details);
    if category == CertCategory::Fire {
        detection_coverage_rule(checklists, &mut details);
    }
    for (idx, result) in test_results.iter().enumerate() {
        let circuit = circuit_label(result, idx);
        match category {
            CertCategory::Electrical => electrical_test_rules(result, &circuit, &mut details),
            CertCategory::Fire => fire_test_rules(result, &circuit, &mut details),
            CertCategory::EmergencyLighting => {
                emergency_lighting_test_rules(result, &circuit, &mut details)
            }
            CertCategory::SolarPv => solar_test_rules(result, &circuit, &mut details),
        }
    }

    let out = resolve_outcome(details);
    tracing::debug!(
        cert_type,
        outcome = %out.outcome,
        rules = out.details.len(),
        failing = out.failing_rules().count(),
        "outcome computed"
    );
    out
}

fn circuit_label(result: &TestResult, idx: usize) -> String {
    match result.circuit_ref.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => format!("#{}", idx + 1),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Code printed for a severity class; fire certificates grade with their own scale.
pub fn severity_label(category: CertCategory, class: SeverityClass) -> &'static str {
    match (category, class) {
        (CertCategory::Fire, SeverityClass::Danger) => "Critical",
        (CertCategory::Fire, SeverityClass::PotentiallyDangerous) => "Major",
        (CertCategory::Fire, SeverityClass::Improvement) => "Minor",
        (_, SeverityClass::Danger) => "C1",
        (_, SeverityClass::PotentiallyDangerous) => "C2",
        (_, SeverityClass::Improvement) => "C3",
        (_, SeverityClass::FurtherInvestigation) => "FI",
    }
}

fn observation_rules(
    category: CertCategory,
    unresolved: &[&Observation],
    details: &mut Vec<RuleDetail>,
) {
    let count = |class: SeverityClass| {
        unresolved
            .iter()
            .filter(|o| o.code.severity_class() == Some(class))
            .count()
    };
    let label = |class: SeverityClass| severity_label(category, class);
    let c1 = count(SeverityClass::Danger);
    let c2 = count(SeverityClass::PotentiallyDangerous);
    let fi = count(SeverityClass::FurtherInvestigation);
    let c3 = count(SeverityClass::Improvement);

    details.push(if c1 > 0 {
        RuleDetail::fail(
            rules::OBS_C1_PRESENT,
            format!(
                "{c1} danger present ({}) observation{} recorded.",
                label(SeverityClass::Danger),
                plural(c1)
            ),
        )
    } else {
        RuleDetail::pass(
            rules::OBS_C1_PRESENT,
            format!("No {} observations.", label(SeverityClass::Danger)),
        )
    });
    details.push(if c2 > 0 {
        RuleDetail::fail(
            rules::OBS_C2_PRESENT,
            format!(
                "{c2} potentially dangerous ({}) observation{} recorded.",
                label(SeverityClass::PotentiallyDangerous),
                plural(c2)
            ),
        )
    } else {
        RuleDetail::pass(
            rules::OBS_C2_PRESENT,
            format!(
                "No {} observations.",
                label(SeverityClass::PotentiallyDangerous)
            ),
        )
    });
    details.push(if fi > 0 {
        RuleDetail::fail(
            rules::OBS_FI_PRESENT,
            format!(
                "{fi} observation{} require{} further investigation (FI).",
                plural(fi),
                if fi == 1 { "s" } else { "" }
            ),
        )
    } else {
        RuleDetail::pass(rules::OBS_FI_PRESENT, "No FI observations.")
    });
    if c3 > 0 {
        details.push(RuleDetail::pass(
            rules::OBS_C3_PRESENT,
            format!(
                "{c3} improvement recommended ({}) observation{} recorded.",
                label(SeverityClass::Improvement),
                plural(c3)
            ),
        ));
    }
}

fn checklist_rules(checklists: &[ChecklistItem], details: &mut Vec<RuleDetail>) {
    let failed: Vec<&ChecklistItem> = checklists.iter().filter(|c| c.is_fail()).collect();
    if failed.is_empty() {
        details.push(RuleDetail::pass(
            rules::CHECKLIST_FAIL_ITEMS,
            "No checklist items failed.",
        ));
        return;
    }
    let questions: Vec<&str> = failed.iter().map(|c| c.question.as_str()).collect();
    details.push(RuleDetail::fail(
        rules::CHECKLIST_FAIL_ITEMS,
        format!(
            "{} checklist item{} failed: {}.",
            failed.len(),
            plural(failed.len()),
            questions.join("; ")
        ),
    ));
}

fn detection_coverage_rule(checklists: &[ChecklistItem], details: &mut Vec<RuleDetail>) {
    let failed = checklists
        .iter()
        .filter(|c| c.section == "detection_coverage" && c.is_fail())
        .count();
    details.push(if failed > 0 {
        RuleDetail::fail(
            rules::CHECKLIST_FAIL_DETECTION_COVERAGE,
            format!(
                "Detection coverage inadequate ({failed} coverage check{} failed).",
                plural(failed)
            ),
        )
    } else {
        RuleDetail::pass(
            rules::CHECKLIST_FAIL_DETECTION_COVERAGE,
            "Detection coverage checks passed.",
        )
    });
}

fn electrical_test_rules(result: &TestResult, circuit: &str, details: &mut Vec<RuleDetail>) {
    let data = &result.data;

    if let (Some(zs), Some(device)) = (number_field(data, "zs"), string_field(data, "deviceType"))
    {
        if let Some(max) = zs_max_for_device(device) {
            let rule = rules::per_circuit(rules::TEST_ZS_EXCEEDED, circuit);
            details.push(if zs > max {
                RuleDetail::fail(
                    rule,
                    format!(
                        "Circuit {circuit}: Zs {zs:.2} Ω exceeds the {max:.2} Ω maximum for {device}."
                    ),
                )
            } else {
                RuleDetail::pass(rule, format!("Circuit {circuit}: Zs within limit."))
            });
        }
    }

    if let Some(ir) = number_field(data, "ir") {
        if ir < ELECTRICAL_IR.critical_min_mohm {
            details.push(RuleDetail::fail(
                rules::per_circuit(rules::TEST_IR_CRITICAL, circuit),
                format!(
                    "Circuit {circuit}: insulation resistance {ir} MΩ is below the {} MΩ minimum.",
                    ELECTRICAL_IR.critical_min_mohm
                ),
            ));
        } else if ir < ELECTRICAL_IR.advisory_min_mohm {
            details.push(RuleDetail::fail(
                rules::per_circuit(rules::TEST_IR_ADVISORY, circuit),
                format!(
                    "Circuit {circuit}: insulation resistance {ir} MΩ is below the {} MΩ recommended minimum.",
                    ELECTRICAL_IR.advisory_min_mohm
                ),
            ));
        } else {
            details.push(RuleDetail::pass(
                rules::per_circuit(rules::TEST_IR_ADVISORY, circuit),
                format!("Circuit {circuit}: insulation resistance acceptable."),
            ));
        }
    }

    if let Some(ms) = number_field(data, "rcdMs") {
        let rule = rules::per_circuit(rules::TEST_RCD_SLOW, circuit);
        details.push(if ms > RCD_TRIP.max_ms_at_1x {
            RuleDetail::fail(
                rule,
                format!(
                    "Circuit {circuit}: RCD trip time {ms} ms exceeds the {} ms maximum.",
                    RCD_TRIP.max_ms_at_1x
                ),
            )
        } else {
            RuleDetail::pass(rule, format!("Circuit {circuit}: RCD trip time within limit."))
        });
    }
}

fn fire_test_rules(result: &TestResult, circuit: &str, details: &mut Vec<RuleDetail>) {
    let data = &result.data;

    if let Some(db) = number_field(data, "sounderDb") {
        let min = FIRE_ALARM.sounder_min_for_location(string_field(data, "location"));
        let rule = rules::per_circuit(rules::TEST_SOUNDER_LEVEL_LOW, circuit);
        details.push(if db < min {
            RuleDetail::fail(
                rule,
                format!("{circuit}: sounder level {db} dB(A) is below the {min} dB(A) minimum."),
            )
        } else {
            RuleDetail::pass(rule, format!("{circuit}: sounder level acceptable."))
        });
    }

    if let Some(hours) = number_field(data, "batteryStandbyHours") {
        let min = FIRE_ALARM.battery_standby_min_hours;
        let rule = rules::per_circuit(rules::TEST_BATTERY_STANDBY_SHORT, circuit);
        details.push(if hours < min {
            RuleDetail::fail(
                rule,
                format!("{circuit}: battery standby {hours} h is below the {min} h minimum."),
            )
        } else {
            RuleDetail::pass(rule, format!("{circuit}: battery standby acceptable."))
        });
    }
}

fn emergency_lighting_test_rules(
    result: &TestResult,
    circuit: &str,
    details: &mut Vec<RuleDetail>,
) {
    let data = &result.data;

    if let Some(hours) = number_field(data, "durationHours") {
        let min = EMERGENCY_LIGHTING.duration_min_hours;
        let rule = rules::per_circuit(rules::TEST_EL_DURATION_SHORT, circuit);
        details.push(if hours < min {
            RuleDetail::fail(
                rule,
                format!("Luminaire {circuit}: duration {hours} h is below the {min} h minimum."),
            )
        } else {
            RuleDetail::pass(rule, format!("Luminaire {circuit}: duration acceptable."))
        });
    }

    if let Some(lux) = number_field(data, "luxLevel") {
        let min = EMERGENCY_LIGHTING.lux_min;
        let rule = rules::per_circuit(rules::TEST_EL_LUX_LOW, circuit);
        details.push(if lux < min {
            RuleDetail::fail(
                rule,
                format!("Luminaire {circuit}: illuminance {lux} lx is below the {min} lx minimum."),
            )
        } else {
            RuleDetail::pass(rule, format!("Luminaire {circuit}: illuminance acceptable."))
        });
    }
}

fn solar_test_rules(result: &TestResult, circuit: &str, details: &mut Vec<RuleDetail>) {
    let data = &result.data;

    if let Some(ir) = number_field(data, "irMohm") {
        let rule = rules::per_circuit(rules::TEST_PV_IR_LOW, circuit);
        details.push(if ir < SOLAR_PV.ir_min_mohm {
            RuleDetail::fail(
                rule,
                format!(
                    "String {circuit}: insulation resistance {ir} MΩ is below the {} MΩ minimum.",
                    SOLAR_PV.ir_min_mohm
                ),
            )
        } else {
            RuleDetail::pass(
                rule,
                format!("String {circuit}: insulation resistance acceptable."),
            )
        });
    }

    if let Some(ohm) = number_field(data, "earthContinuityOhm") {
        let rule = rules::per_circuit(rules::TEST_PV_EARTH_CONTINUITY_HIGH, circuit);
        details.push(if ohm > SOLAR_PV.earth_continuity_max_ohm {
            RuleDetail::fail(
                rule,
                format!(
                    "String {circuit}: earth continuity {ohm} Ω exceeds the {} Ω maximum.",
                    SOLAR_PV.earth_continuity_max_ohm
                ),
            )
        } else {
            RuleDetail::pass(rule, format!("String {circuit}: earth continuity acceptable."))
        });
    }

    if let (Some(measured), Some(expected)) = (
        number_field(data, "vocMeasured"),
        number_field(data, "vocExpected"),
    ) {
        if let Some(deviation) = voc_deviation_percent(measured, expected) {
            let rule = rules::per_circuit(rules::TEST_PV_VOC_DEVIATION, circuit);
            details.push(if deviation > SOLAR_PV.voc_deviation_max_percent {
                RuleDetail::fail(
                    rule,
                    format!(
                        "String {circuit}: Voc {measured} V deviates {deviation:.1}% from expected {expected} V (limit {}%).",
                        SOLAR_PV.voc_deviation_max_percent
                    ),
                )
            } else {
                RuleDetail::pass(rule, format!("String {circuit}: Voc within tolerance."))
            });
        }
    }
}

fn is_hard_fail(rule: &str) -> bool {
    rules::HARD_FAIL_PREFIXES
        .iter()
        .any(|prefix| rule.starts_with(prefix))
}

/// Classifies an evaluated rule trail. Hard failures dominate further-investigation
/// signals, which dominate informational findings.
pub fn resolve_outcome(details: Vec<RuleDetail>) -> OutcomeResult {
    let failing: Vec<&RuleDetail> = details.iter().filter(|d| !d.passed).collect();

    if failing.is_empty() {
        let recommendations = details
            .iter()
            .find(|d| d.rule == rules::OBS_C3_PRESENT)
            .map(|d| d.message.clone());
        let reason = match recommendations {
            Some(msg) => format!("{REASON_RECOMMENDATIONS_PREFIX} {msg}"),
            None => REASON_ALL_PASSED.to_string(),
        };
        return OutcomeResult {
            outcome: OutcomeValue::Satisfactory,
            reason,
            details,
        };
    }

    let joined = failing
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let (outcome, reason) = if failing.iter().any(|d| is_hard_fail(&d.rule)) {
        (OutcomeValue::Unsatisfactory, joined)
    } else if failing
        .iter()
        .any(|d| d.rule.starts_with(rules::FURTHER_INVESTIGATION_PREFIX))
    {
        (OutcomeValue::FurtherInvestigation, joined)
    } else {
        (
            OutcomeValue::Satisfactory,
            format!("{REASON_RECOMMENDATIONS_PREFIX} {joined}"),
        )
    };

    OutcomeResult {
        outcome,
        reason,
        details,
    }
}
