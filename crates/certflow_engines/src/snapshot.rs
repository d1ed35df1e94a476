#![forbid(unsafe_code)]

//! Canonical snapshot of an issued certificate and the signing hash over it.
//!
//! Child collections are put in a total order so the hash never depends on the
//! order rows were fetched in. Test results are the exception: their recorded
//! order is part of the content.

use certflow_kernel_contracts::certificate::{
    Attachment, CertificateAggregate, ChecklistItem, Observation, SignatureRecord, TestResult,
};
use certflow_kernel_contracts::iso_timestamp;
use certflow_kernel_contracts::outcome::OutcomeResult;
use certflow_kernel_contracts::snapshot::{
    CanonicalAttachment, CanonicalCertSnapshot, CanonicalCertificateCore, CanonicalChecklistItem,
    CanonicalObservation, CanonicalSignature, CanonicalTestResult, CANONICAL_SNAPSHOT_VERSION,
};

use crate::canonical::{canonical_json_bytes, normalize_json_value, sha256_hex};

pub fn build_canonical_cert_snapshot(aggregate: &CertificateAggregate) -> CanonicalCertSnapshot {
    let cert = &aggregate.certificate;
    let core = CanonicalCertificateCore {
        id: cert.id.as_str().to_string(),
        company_id: cert.company_id.as_str().to_string(),
        job_id: cert.job_id.as_ref().map(|j| j.as_str().to_string()),
        cert_type: cert.cert_type.as_str().to_string(),
        certificate_number: cert.certificate_number.clone(),
        inspector_name: cert.inspector_name.clone(),
        inspector_email: cert.inspector_email.clone(),
        data_version: cert.data_version,
        data: normalize_json_value(&cert.data),
        outcome: cert.outcome.map(|o| o.as_str().to_string()),
        outcome_reason: cert.outcome_reason.clone(),
        outcome_details: Vec::new(),
        amends_certificate_id: cert
            .amends_certificate_id
            .as_ref()
            .map(|id| id.as_str().to_string()),
    };

    let mut observations: Vec<&Observation> = aggregate.observations.iter().collect();
    observations.sort_by(|a, b| {
        (a.sort_order, a.created_at, &a.id).cmp(&(b.sort_order, b.created_at, &b.id))
    });

    let mut checklists: Vec<&ChecklistItem> = aggregate.checklists.iter().collect();
    checklists.sort_by(|a, b| {
        (&a.section, a.sort_order, &a.id).cmp(&(&b.section, b.sort_order, &b.id))
    });

    let mut signatures: Vec<&SignatureRecord> = aggregate.signatures.iter().collect();
    signatures.sort_by(|a, b| {
        (a.role.as_str(), a.sort_order, a.signed_at, &a.id).cmp(&(
            b.role.as_str(),
            b.sort_order,
            b.signed_at,
            &b.id,
        ))
    });

    let mut attachments: Vec<&Attachment> = aggregate.attachments.iter().collect();
    attachments.sort_by(|a, b| {
        (&a.category, a.created_at, &a.id).cmp(&(&b.category, b.created_at, &b.id))
    });

    CanonicalCertSnapshot {
        snapshot_version: CANONICAL_SNAPSHOT_VERSION.0,
        certificate: core,
        observations: observations.into_iter().map(canonical_observation).collect(),
        checklists: checklists.into_iter().map(canonical_checklist_item).collect(),
        signatures: signatures.into_iter().map(canonical_signature).collect(),
        attachments: attachments.into_iter().map(canonical_attachment).collect(),
        test_results: aggregate
            .test_results
            .iter()
            .map(canonical_test_result)
            .collect(),
    }
}

/// Snapshot as frozen at issuance: the computed outcome, its reason and the full
/// rule trail replace whatever the certificate row had cached.
pub fn build_issued_snapshot(
    aggregate: &CertificateAggregate,
    outcome: &OutcomeResult,
) -> CanonicalCertSnapshot {
    let mut snapshot = build_canonical_cert_snapshot(aggregate);
    snapshot.certificate.outcome = Some(outcome.outcome.as_str().to_string());
    snapshot.certificate.outcome_reason = Some(outcome.reason.clone());
    snapshot.certificate.outcome_details = outcome.details.clone();
    snapshot
}

fn canonical_observation(o: &Observation) -> CanonicalObservation {
    CanonicalObservation {
        id: o.id.clone(),
        code: o.code.as_str().to_string(),
        location: o.location.clone(),
        description: o.description.clone(),
        regulation: o.regulation.clone(),
        fix_guidance: o.fix_guidance.clone(),
        resolved_at: o.resolved_at.as_ref().map(iso_timestamp),
        sort_order: o.sort_order,
        created_at: iso_timestamp(&o.created_at),
    }
}

fn canonical_checklist_item(c: &ChecklistItem) -> CanonicalChecklistItem {
    CanonicalChecklistItem {
        id: c.id.clone(),
        section: c.section.clone(),
        question: c.question.clone(),
        answer: c.answer.clone(),
        notes: c.notes.clone(),
        sort_order: c.sort_order,
    }
}

fn canonical_signature(s: &SignatureRecord) -> CanonicalSignature {
    CanonicalSignature {
        id: s.id.clone(),
        role: s.role.as_str().to_string(),
        signer_name: s.signer_name.clone(),
        signer_email: s.signer_email.clone(),
        signature_text: s.signature_text.clone(),
        signed_at: s.signed_at.as_ref().map(iso_timestamp),
        qualification: s.qualification.clone(),
        is_primary: s.is_primary,
        sort_order: s.sort_order,
    }
}

fn canonical_attachment(a: &Attachment) -> CanonicalAttachment {
    CanonicalAttachment {
        id: a.id.clone(),
        name: a.name.clone(),
        file_key: a.file_key.clone(),
        mime_type: a.mime_type.clone(),
        category: a.category.clone(),
        created_at: iso_timestamp(&a.created_at),
    }
}

fn canonical_test_result(t: &TestResult) -> CanonicalTestResult {
    CanonicalTestResult {
        id: t.id.clone(),
        circuit_ref: t.circuit_ref.clone(),
        data: t.data.clone(),
        created_at: iso_timestamp(&t.created_at),
    }
}

/// SHA-256 hex over the canonical JSON of `snapshot`.
pub fn compute_signing_hash(snapshot: &CanonicalCertSnapshot) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&canonical_json_bytes(snapshot)?))
}

/// SHA-256 hex over raw bytes, used for rendered documents.
pub fn compute_checksum(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}
