#![forbid(unsafe_code)]

mod common;

use std::sync::Arc;

use certflow_engines::{compute_checksum, compute_signing_hash};
use certflow_kernel_contracts::audit::CertAuditEventType;
use certflow_kernel_contracts::cert_type::CertType;
use certflow_kernel_contracts::certificate::{Certificate, CertificateStatus, ObservationCode};
use certflow_kernel_contracts::ids::JobId;
use certflow_kernel_contracts::outcome::OutcomeValue;
use certflow_os::pdf::{CertPdfRenderer, FallbackPdfRenderer};
use certflow_os::{
    reason_codes, verify_by_token, CertificateRuntime, CompletionDecision, IssuanceError,
    PdfIntegrity,
};
use certflow_storage::blob::{BlobStorage, FsBlobStorage, InMemoryBlobStorage};
use certflow_storage::cert_store::{
    CertStore, JobRecord, JobStatus, PdfTemplateRecord, TemplateField, TenantSettings,
};
use certflow_storage::repo::{
    CertAuditRepo, CertificateRepo, DocumentRepo, RevisionRepo, TenantRepo,
};
use common::*;
use serde_json::json;

fn completed_store(id: &str) -> (CertStore, CertificateRuntime, Arc<InMemoryBlobStorage>) {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, id);
    let (rt, blobs) = runtime();
    let decision = rt.complete_certificate(&mut store, &request(id)).unwrap();
    assert!(decision.is_completed());
    (store, rt, blobs)
}

#[test]
fn at_issue_e2e_01_complete_then_issue_commits_revision_and_document() {
    let (mut store, rt, blobs) = completed_store("cert_1");

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    assert_eq!(issued.revision, 1);
    assert_eq!(issued.outcome, OutcomeValue::Satisfactory);
    assert_eq!(issued.signing_hash.len(), 64);
    assert_eq!(
        issued.pdf_key.as_deref(),
        Some("certificates/co_e2e/cert_1/r1.pdf")
    );

    let bytes = blobs.read_bytes("certificates/co_e2e/cert_1/r1.pdf").unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(compute_checksum(&bytes), issued.pdf_checksum);

    let cert = store.certificate_row(&company(), &cert_id("cert_1")).unwrap();
    assert_eq!(cert.status, CertificateStatus::Issued);
    assert_eq!(cert.current_revision, 1);
    assert_eq!(
        cert.verification_token.as_deref(),
        Some(issued.verification_token.as_str())
    );

    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    assert_eq!(rev.signing_hash, issued.signing_hash);
    assert_eq!(rev.pdf_key, issued.pdf_key);
    assert_eq!(rev.content.certificate.outcome.as_deref(), Some("satisfactory"));

    let events: Vec<_> = store
        .cert_audit_rows_for_certificate(&company(), &cert_id("cert_1"))
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        events,
        vec![CertAuditEventType::Completed, CertAuditEventType::Issued]
    );
    assert_eq!(
        store
            .document_rows_for_certificate(&company(), &cert_id("cert_1"))
            .len(),
        1
    );
}

#[test]
fn at_issue_e2e_02_draft_and_issued_certificates_are_refused() {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, "cert_1");
    let (rt, _blobs) = runtime();

    let err = rt
        .issue_certificate(&mut store, &request("cert_1"))
        .unwrap_err();
    assert_eq!(err.status_hint(), 400);
    assert_eq!(err.reason_code(), reason_codes::CERT_REFUSE_NOT_COMPLETED);
    assert!(err.to_string().contains("Only completed"));

    rt.complete_certificate(&mut store, &request("cert_1")).unwrap();
    rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    let again = rt
        .issue_certificate(&mut store, &request("cert_1"))
        .unwrap_err();
    assert_eq!(again.status_hint(), 409);
    assert_eq!(store.revision_rows(&company(), &cert_id("cert_1")).len(), 1);

    let missing = rt
        .issue_certificate(&mut store, &request("cert_nope"))
        .unwrap_err();
    assert!(matches!(missing, IssuanceError::NotFound { .. }));
    assert_eq!(missing.status_hint(), 404);
}

#[test]
fn at_issue_e2e_03_outcome_is_recomputed_from_current_rows() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    // Completion cached a satisfactory outcome; an observation added afterwards still counts.
    add_observation(&mut store, "cert_1", "o1", ObservationCode::C2);

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    assert_eq!(issued.outcome, OutcomeValue::Unsatisfactory);
    let cert = store.certificate_row(&company(), &cert_id("cert_1")).unwrap();
    assert_eq!(cert.outcome, Some(OutcomeValue::Unsatisfactory));
}

#[test]
fn at_issue_e2e_04_document_write_failure_keeps_issuance_and_regenerates_later() {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, "cert_1");
    let failing = runtime_with(Arc::new(UnavailableBlobs));
    failing
        .complete_certificate(&mut store, &request("cert_1"))
        .unwrap();

    let issued = failing
        .issue_certificate(&mut store, &request("cert_1"))
        .unwrap();
    assert_eq!(issued.pdf_key, None);
    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    assert!(rev.pdf_key.is_none());
    assert_eq!(rev.signing_hash, issued.signing_hash);
    assert!(store
        .document_rows_for_certificate(&company(), &cert_id("cert_1"))
        .is_empty());
    assert_eq!(
        store
            .certificate_row(&company(), &cert_id("cert_1"))
            .unwrap()
            .status,
        CertificateStatus::Issued
    );

    let (rt, blobs) = runtime();
    let regenerated = rt
        .regenerate_revision_pdf(&mut store, &request("cert_1"), 1)
        .unwrap();
    assert!(blobs.exists(&regenerated.pdf_key));
    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    assert_eq!(rev.pdf_key.as_deref(), Some(regenerated.pdf_key.as_str()));
    assert_eq!(rev.signing_hash, issued.signing_hash);

    let again = rt
        .regenerate_revision_pdf(&mut store, &request("cert_1"), 1)
        .unwrap_err();
    assert_eq!(again.status_hint(), 409);
    assert_eq!(again.reason_code(), reason_codes::CERT_REFUSE_PDF_ALREADY_STORED);

    let missing = rt
        .regenerate_revision_pdf(&mut store, &request("cert_1"), 2)
        .unwrap_err();
    assert!(matches!(missing, IssuanceError::RevisionNotFound { .. }));

    assert!(store
        .cert_audit_rows_for_certificate(&company(), &cert_id("cert_1"))
        .iter()
        .any(|e| e.event_type == CertAuditEventType::PdfBackfilled));
}

#[test]
fn at_issue_e2e_05_revision_audit_detects_document_tampering() {
    let (mut store, rt, blobs) = completed_store("cert_1");
    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();

    let audit = rt
        .audit_revision(&store, &company(), &cert_id("cert_1"), 1)
        .unwrap();
    assert!(audit.hash_matches());
    assert_eq!(audit.pdf, PdfIntegrity::Matches);
    assert!(audit.is_intact());

    let key = issued.pdf_key.unwrap();
    blobs.write_bytes(&key, b"%PDF-1.5 forged").unwrap();
    let audit = rt
        .audit_revision(&store, &company(), &cert_id("cert_1"), 1)
        .unwrap();
    assert!(audit.hash_matches());
    assert!(matches!(audit.pdf, PdfIntegrity::Mismatch { .. }));
    assert!(!audit.is_intact());
}

#[test]
fn at_issue_e2e_06_incomplete_data_is_rejected_as_a_report() {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, "cert_1");
    let mut data = complete_eicr_data();
    data["overallAssessment"] = json!({"nextInspectionDate": "2029-07-01"});
    let mut sparse = Certificate::draft_v1(
        cert_id("cert_2"),
        company(),
        CertType::Eicr,
        "EICR-cert_2",
        2,
        data,
        t0(),
    )
    .unwrap();
    sparse.inspector_name = Some("A. Sparks".to_string());
    store.insert_certificate_row(sparse).unwrap();
    let (rt, _blobs) = runtime();

    let decision = rt
        .complete_certificate(&mut store, &request("cert_2"))
        .unwrap();
    let CompletionDecision::Rejected(report) = decision else {
        panic!("expected rejection");
    };
    assert!(report
        .missing
        .contains(&"overallAssessment.overallCondition".to_string()));
    assert_eq!(
        store
            .certificate_row(&company(), &cert_id("cert_2"))
            .unwrap()
            .status,
        CertificateStatus::Draft
    );
    assert!(store
        .cert_audit_rows_for_certificate(&company(), &cert_id("cert_2"))
        .is_empty());
}

#[test]
fn at_issue_e2e_07_tenant_setting_completes_linked_job() {
    let mut store = CertStore::new_in_memory();
    let job = JobId::new("job_1").unwrap();
    store
        .insert_job_row(JobRecord::v1(company(), job.clone(), "Periodic inspection").unwrap())
        .unwrap();
    store.set_tenant_settings(
        company(),
        TenantSettings {
            auto_complete_job_on_issue: true,
        },
    );
    seed_eicr_with_job(&mut store, "cert_1", Some(job.clone()));
    let (rt, _blobs) = runtime();
    rt.complete_certificate(&mut store, &request("cert_1")).unwrap();
    assert_eq!(store.job_row(&company(), &job).unwrap().status, JobStatus::Open);

    rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    assert_eq!(
        store.job_row(&company(), &job).unwrap().status,
        JobStatus::Completed
    );
}

#[test]
fn at_issue_e2e_08_unusable_template_falls_back_to_fixed_layout() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    let tpl = PdfTemplateRecord::v1(
        "tpl_1",
        company(),
        CertType::Eicr,
        "House style",
        "Condition Report",
        Vec::new(),
    )
    .unwrap();
    store.insert_pdf_template_row(tpl).unwrap();

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    let fallback = FallbackPdfRenderer.render(&rev.content).unwrap();
    assert_eq!(compute_checksum(&fallback), issued.pdf_checksum);
}

#[test]
fn at_issue_e2e_09_active_template_shapes_the_document() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    store
        .insert_pdf_template_row(
            PdfTemplateRecord::v1(
                "tpl_1",
                company(),
                CertType::Eicr,
                "House style",
                "Condition Report",
                vec![
                    TemplateField {
                        label: "Client".to_string(),
                        key: "client.name".to_string(),
                    },
                    TemplateField {
                        label: "Outcome".to_string(),
                        key: "certificate.outcome".to_string(),
                    },
                ],
            )
            .unwrap(),
        )
        .unwrap();

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    let fallback = FallbackPdfRenderer.render(&rev.content).unwrap();
    assert_ne!(compute_checksum(&fallback), issued.pdf_checksum);
}

#[test]
fn at_issue_e2e_10_public_verification_by_token() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();

    let public = verify_by_token(&store, &issued.verification_token).unwrap();
    assert_eq!(public.certificate_number, "EICR-cert_1");
    assert_eq!(public.status, CertificateStatus::Issued);
    assert_eq!(public.revision, 1);
    assert_eq!(public.signing_hash.as_deref(), Some(issued.signing_hash.as_str()));
    assert!(!public.superseded);

    assert!(verify_by_token(&store, "not-a-token").is_none());
    assert!(verify_by_token(&store, "   ").is_none());
}

#[test]
fn at_issue_e2e_11_void_is_terminal_and_keeps_revisions() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();

    rt.void_certificate(&mut store, &request("cert_1"), "Issued against wrong address")
        .unwrap();
    let err = rt
        .void_certificate(&mut store, &request("cert_1"), "again")
        .unwrap_err();
    assert_eq!(err.status_hint(), 400);
    assert_eq!(err.reason_code(), reason_codes::CERT_REFUSE_ALREADY_VOID);

    assert_eq!(store.revision_rows(&company(), &cert_id("cert_1")).len(), 1);
    let public = verify_by_token(&store, &issued.verification_token).unwrap();
    assert_eq!(public.status, CertificateStatus::Void);

    let voided = store
        .cert_audit_rows_for_certificate(&company(), &cert_id("cert_1"))
        .into_iter()
        .find(|e| e.event_type == CertAuditEventType::Voided)
        .unwrap();
    assert_eq!(voided.detail["previous_status"], "issued");
    assert_eq!(voided.detail["reason"], "Issued against wrong address");
}

#[test]
fn at_issue_e2e_12_completing_twice_is_refused() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    let err = rt
        .complete_certificate(&mut store, &request("cert_1"))
        .unwrap_err();
    assert_eq!(err.reason_code(), reason_codes::CERT_REFUSE_NOT_DRAFT);
    assert_eq!(store.tenant_settings_row(&company()), TenantSettings::mvp_v1());
}

#[test]
fn at_issue_e2e_13_filesystem_storage_holds_issued_document() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, "cert_1");
    let rt = runtime_with(Arc::new(FsBlobStorage::new(dir.path())));
    rt.complete_certificate(&mut store, &request("cert_1")).unwrap();

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    let on_disk = dir.path().join("certificates/co_e2e/cert_1/r1.pdf");
    let bytes = std::fs::read(on_disk).unwrap();
    assert_eq!(compute_checksum(&bytes), issued.pdf_checksum);

    let audit = rt
        .audit_revision(&store, &company(), &cert_id("cert_1"), 1)
        .unwrap();
    assert!(audit.is_intact());
}

#[test]
fn at_issue_e2e_14_revision_content_freezes_the_rule_trail() {
    let (mut store, rt, _blobs) = completed_store("cert_1");
    add_observation(&mut store, "cert_1", "o1", ObservationCode::C2);

    let issued = rt.issue_certificate(&mut store, &request("cert_1")).unwrap();
    let rev = store.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    let details = &rev.content.certificate.outcome_details;
    let c2 = details
        .iter()
        .find(|d| d.rule == "obs.c2_present")
        .expect("c2 rule recorded");
    assert!(!c2.passed);
    assert!(c2.message.contains("(C2)"));
    assert!(details.iter().any(|d| d.rule == "obs.c1_present" && d.passed));
    assert_eq!(compute_signing_hash(&rev.content).unwrap(), issued.signing_hash);

    let mut tampered = rev.content.clone();
    tampered.certificate.outcome_details.retain(|d| d.passed);
    assert_ne!(compute_signing_hash(&tampered).unwrap(), issued.signing_hash);
}
