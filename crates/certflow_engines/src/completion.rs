#![forbid(unsafe_code)]

//! Gate for the draft → completed transition. Missing data is reported as failed
//! checks; nothing in here errors.

use certflow_kernel_contracts::cert_type::{get_cert_type_metadata, CertType, SignatureRole};
use certflow_kernel_contracts::certificate::{signature_is_present, SignatureRecord};
use certflow_kernel_contracts::completion::{CompletionCheck, CompletionReport, ValidationError};
use certflow_kernel_contracts::payload::{
    array_at, bool_at, has_scalar, has_text, str_at, value_at, CertificatePayload,
};
use serde_json::Value;

pub fn validate_certificate_for_completion(
    cert_type: &str,
    data_version: u8,
    data: &Value,
    signatures: &[SignatureRecord],
) -> CompletionReport {
    let checks = match CertificatePayload::classify(data_version, data) {
        CertificatePayload::Legacy(v) => legacy_checks(cert_type, v),
        CertificatePayload::Structured(v) => match CertType::parse(cert_type) {
            Some(CertType::Eicr) => eicr_checks(v, signatures),
            Some(CertType::Eic) => eic_checks(v, signatures),
            Some(CertType::Mwc) => mwc_checks(v),
            _ => generic_checks(cert_type, v, signatures),
        },
    };
    let report = CompletionReport::from_checks(&checks);
    tracing::debug!(
        cert_type,
        data_version,
        ok = report.ok,
        completion_percent = report.completion_percent,
        "completion validated"
    );
    report
}

/// Quick v1 gate for form UIs: client, address and both signatures.
pub fn certificate_is_ready_for_completion(data: &Value) -> bool {
    has_text(data, &["overview", "clientName"])
        && has_text(data, &["overview", "installationAddress"])
        && legacy_signature_present(data, "engineer")
        && legacy_signature_present(data, "customer")
}

fn text_check(name: &'static str, data: &Value, path: &[&str], message: &str) -> CompletionCheck {
    let (section, field) = match *path {
        [] => ("", ""),
        [only] => (only, ""),
        [section, .., field] => (section, field),
    };
    CompletionCheck::from_condition(
        name,
        has_text(data, path),
        ValidationError::new(section, field, message),
    )
}

fn legacy_signature_present(data: &Value, role: &str) -> bool {
    let Some(sig) = value_at(data, &["signatures", role]) else {
        return false;
    };
    let label = str_at(sig, &["signature"])
        .or_else(|| str_at(sig, &["name"]))
        .unwrap_or_default();
    let signed_at = str_at(sig, &["signedAt"]).unwrap_or_default();
    signature_is_present(label, signed_at)
}

fn legacy_checks(cert_type: &str, data: &Value) -> Vec<CompletionCheck> {
    const REQUIRED: &[(&str, &str, &str)] = &[
        ("site_name", "overview", "siteName"),
        ("installation_address", "overview", "installationAddress"),
        ("client_name", "overview", "clientName"),
        ("job_description", "overview", "jobDescription"),
        ("description_of_work", "installation", "descriptionOfWork"),
        ("supply_type", "installation", "supplyType"),
        ("earthing_arrangement", "installation", "earthingArrangement"),
    ];
    let mut checks: Vec<CompletionCheck> = REQUIRED
        .iter()
        .map(|&(name, section, field)| {
            text_check(name, data, &[section, field], "Required field is empty.")
        })
        .collect();
    for (name, role) in [
        ("engineer_signature", "engineer"),
        ("customer_signature", "customer"),
    ] {
        checks.push(CompletionCheck::from_condition(
            name,
            legacy_signature_present(data, role),
            ValidationError::new("signatures", role, "Signature and signing date are required."),
        ));
    }
    if cert_type == CertType::Eicr.as_str() {
        checks.push(text_check(
            "overall_assessment",
            data,
            &["assessment", "overallAssessment"],
            "Overall assessment is required.",
        ));
    }
    checks
}

fn has_role_signature(signatures: &[SignatureRecord], role: SignatureRole) -> bool {
    signatures.iter().any(|s| s.role == role && s.is_present())
}

fn circuit_is_filled(circuit: &Value) -> bool {
    has_text(circuit, &["circuitRef"]) || has_text(circuit, &["description"])
}

fn common_party_checks(data: &Value) -> Vec<CompletionCheck> {
    vec![
        text_check(
            "client_name",
            data,
            &["clientDetails", "clientName"],
            "Client name is required.",
        ),
        text_check(
            "installation_address",
            data,
            &["installationDetails", "address"],
            "Installation address is required.",
        ),
    ]
}

fn contractor_check(data: &Value) -> CompletionCheck {
    text_check(
        "contractor_name",
        data,
        &["contractorDetails", "companyName"],
        "Contractor company name is required.",
    )
}

fn eicr_checks(data: &Value, signatures: &[SignatureRecord]) -> Vec<CompletionCheck> {
    let mut checks = common_party_checks(data);
    checks.push(text_check(
        "supply_type",
        data,
        &["supplyCharacteristics", "supplyType"],
        "Supply type is required.",
    ));
    checks.push(text_check(
        "earthing_arrangement",
        data,
        &["supplyCharacteristics", "earthingArrangement"],
        "Earthing arrangement is required.",
    ));

    let circuits: Vec<&Value> = array_at(data, &["boards"])
        .iter()
        .flat_map(|board| array_at(board, &["circuits"]))
        .filter(|c| circuit_is_filled(c))
        .collect();
    checks.push(CompletionCheck::from_condition(
        "boards",
        !circuits.is_empty(),
        ValidationError::new(
            "boards",
            "",
            "At least one distribution board with a circuit is required.",
        ),
    ));
    checks.push(CompletionCheck::from_condition(
        "circuit_status",
        circuits.iter().all(|c| has_text(c, &["status"])),
        ValidationError::new("boards", "circuits.status", "Every circuit needs a status."),
    ));

    checks.push(text_check(
        "overall_condition",
        data,
        &["overallAssessment", "overallCondition"],
        "Overall condition is required.",
    ));
    checks.push(text_check(
        "next_inspection_date",
        data,
        &["overallAssessment", "nextInspectionDate"],
        "Next inspection date is required.",
    ));
    checks.push(CompletionCheck::from_condition(
        "inspector_signature",
        has_role_signature(signatures, SignatureRole::Engineer)
            || has_text(data, &["declaration", "inspectorName"]),
        ValidationError::new(
            "declaration",
            "inspectorName",
            "Inspector signature or name is required.",
        ),
    ));
    checks.push(contractor_check(data));
    checks
}

fn eic_checks(data: &Value, signatures: &[SignatureRecord]) -> Vec<CompletionCheck> {
    let mut checks = eicr_checks(data, signatures);
    checks.push(text_check(
        "work_description",
        data,
        &["extentOfWork", "workDescription"],
        "Description of work is required.",
    ));
    checks.push(CompletionCheck::from_condition(
        "designer_details",
        has_text(data, &["designerDetails", "name"])
            || bool_at(data, &["designerDetails", "sameAsDesigner"]),
        ValidationError::new("designerDetails", "name", "Designer details are required."),
    ));
    checks
}

fn mwc_checks(data: &Value) -> Vec<CompletionCheck> {
    let mut checks = common_party_checks(data);
    checks.push(text_check(
        "work_description",
        data,
        &["extentOfWork", "workDescription"],
        "Description of work is required.",
    ));
    checks.push(text_check(
        "circuit_ref",
        data,
        &["circuitDetails", "circuitRef"],
        "Circuit reference is required.",
    ));
    checks.push(CompletionCheck::from_condition(
        "continuity",
        has_scalar(data, &["testResults", "continuity"]),
        ValidationError::new("testResults", "continuity", "Continuity result is required."),
    ));
    checks.push(CompletionCheck::from_condition(
        "insulation_resistance",
        has_scalar(data, &["testResults", "insulationResistance"]),
        ValidationError::new(
            "testResults",
            "insulationResistance",
            "Insulation resistance result is required.",
        ),
    ));
    checks.push(CompletionCheck::from_condition(
        "polarity_confirmed",
        bool_at(data, &["testResults", "polarityConfirmed"]),
        ValidationError::new(
            "testResults",
            "polarityConfirmed",
            "Polarity must be confirmed.",
        ),
    ));
    checks.push(contractor_check(data));
    checks
}

fn generic_checks(
    cert_type: &str,
    data: &Value,
    signatures: &[SignatureRecord],
) -> Vec<CompletionCheck> {
    let mut checks = common_party_checks(data);
    checks.push(contractor_check(data));
    let roles = get_cert_type_metadata(cert_type)
        .map(|m| m.required_signature_roles)
        .unwrap_or(&[]);
    for &role in roles {
        checks.push(CompletionCheck::from_condition(
            "signature",
            has_role_signature(signatures, role),
            ValidationError::new("signatures", role.as_str(), "Signature is required."),
        ));
    }
    checks
}
