#![forbid(unsafe_code)]

mod common;

use certflow_kernel_contracts::audit::CertAuditEventType;
use certflow_kernel_contracts::certificate::{
    CertificateStatus, ObservationCode, MAX_CERTIFICATE_NUMBER_CHARS,
};
use certflow_kernel_contracts::ids::CertificateId;
use certflow_os::{reason_codes, verify_by_token, CertificateRequest, CertificateRuntime};
use certflow_storage::cert_store::CertStore;
use certflow_storage::repo::{CertAuditRepo, CertificateRepo, RevisionRepo};
use common::*;

fn issued_original(id: &str) -> (CertStore, CertificateRuntime, String) {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, id);
    add_observation(&mut store, id, "o1", ObservationCode::C3);
    let (rt, _blobs) = runtime();
    rt.complete_certificate(&mut store, &request(id)).unwrap();
    let issued = rt.issue_certificate(&mut store, &request(id)).unwrap();
    (store, rt, issued.verification_token)
}

fn amendment_request(id: &CertificateId) -> CertificateRequest {
    CertificateRequest::v1(company(), id.clone(), ACTOR).unwrap()
}

#[test]
fn at_amend_e2e_01_only_issued_certificates_can_be_amended() {
    let mut store = CertStore::new_in_memory();
    seed_eicr(&mut store, "cert_1");
    let (rt, _blobs) = runtime();

    let err = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap_err();
    assert_eq!(err.status_hint(), 400);
    assert_eq!(err.reason_code(), reason_codes::CERT_REFUSE_NOT_ISSUED);
    assert!(err.to_string().contains("Only issued certificates can be amended"));

    rt.void_certificate(&mut store, &request("cert_1"), "duplicate")
        .unwrap();
    let err = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap_err();
    assert!(err.to_string().contains("status: void"));
}

#[test]
fn at_amend_e2e_02_amendment_copies_rows_and_clears_attestation() {
    let (mut store, rt, _token) = issued_original("cert_1");

    let created = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap();
    assert_eq!(created.certificate_number, "EICR-cert_1/A1");

    let amendment = store
        .certificate_aggregate(&company(), &created.amendment_id)
        .unwrap();
    let original = store
        .certificate_aggregate(&company(), &cert_id("cert_1"))
        .unwrap();
    assert_eq!(amendment.certificate.status, CertificateStatus::Draft);
    assert_eq!(amendment.certificate.current_revision, 0);
    assert_eq!(
        amendment.certificate.amends_certificate_id,
        Some(cert_id("cert_1"))
    );
    assert_eq!(amendment.certificate.data, original.certificate.data);
    assert!(amendment.certificate.verification_token.is_none());

    assert_eq!(amendment.observations.len(), 1);
    assert_eq!(amendment.observations[0].code, ObservationCode::C3);
    assert_ne!(amendment.observations[0].id, original.observations[0].id);
    assert_eq!(amendment.checklists.len(), 1);
    assert_eq!(amendment.checklists[0].answer, "pass");
    assert!(amendment.attachments.is_empty());
    assert_eq!(original.attachments.len(), 1);

    assert_eq!(amendment.signatures.len(), 2);
    for s in &amendment.signatures {
        assert!(s.signature_text.is_empty());
        assert!(s.signed_at.is_none());
    }
    assert!(amendment
        .signatures
        .iter()
        .any(|s| s.signer_name == "A. Sparks"));

    // The original is untouched and records the amendment.
    assert_eq!(original.certificate.status, CertificateStatus::Issued);
    let amended = store
        .cert_audit_rows_for_certificate(&company(), &cert_id("cert_1"))
        .into_iter()
        .find(|e| e.event_type == CertAuditEventType::Amended)
        .unwrap();
    assert_eq!(
        amended.detail["amendment_id"],
        created.amendment_id.to_string()
    );
}

#[test]
fn at_amend_e2e_03_one_amendment_in_progress_at_a_time() {
    let (mut store, rt, _token) = issued_original("cert_1");
    let first = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap();

    let err = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap_err();
    assert_eq!(err.status_hint(), 409);
    assert_eq!(
        err.reason_code(),
        reason_codes::CERT_REFUSE_AMENDMENT_IN_PROGRESS
    );
    assert!(err.to_string().contains("already in progress"));

    // Completion alone keeps the amendment in progress.
    let decision = rt
        .complete_certificate(&mut store, &amendment_request(&first.amendment_id))
        .unwrap();
    assert!(decision.is_completed(), "{:?}", decision.report().missing);
    assert!(rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .is_err());

    rt.void_certificate(
        &mut store,
        &amendment_request(&first.amendment_id),
        "started in error",
    )
    .unwrap();
    let second = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap();
    assert_eq!(second.certificate_number, "EICR-cert_1/A2");
    assert_ne!(second.amendment_id, first.amendment_id);
}

#[test]
fn at_amend_e2e_04_issued_amendment_supersedes_original() {
    let (mut store, rt, original_token) = issued_original("cert_1");
    assert!(!verify_by_token(&store, &original_token).unwrap().superseded);

    let created = rt
        .create_certificate_amendment(&mut store, &request("cert_1"))
        .unwrap();
    let req = amendment_request(&created.amendment_id);
    rt.complete_certificate(&mut store, &req).unwrap();
    assert!(!verify_by_token(&store, &original_token).unwrap().superseded);

    let issued = rt.issue_certificate(&mut store, &req).unwrap();
    assert_eq!(issued.revision, 1);
    assert_ne!(issued.verification_token, original_token);

    let original = verify_by_token(&store, &original_token).unwrap();
    assert!(original.superseded);
    assert_eq!(original.status, CertificateStatus::Issued);
    let amendment = verify_by_token(&store, &issued.verification_token).unwrap();
    assert_eq!(amendment.certificate_number, "EICR-cert_1/A1");
    assert!(!amendment.superseded);

    let rev = store
        .revision_row(&company(), &created.amendment_id, 1)
        .unwrap();
    assert_eq!(
        rev.content.certificate.amends_certificate_id.as_deref(),
        Some("cert_1")
    );
}

#[test]
fn at_amend_e2e_05_unknown_certificate_is_not_found() {
    let mut store = CertStore::new_in_memory();
    let (rt, _blobs) = runtime();
    let err = rt
        .create_certificate_amendment(&mut store, &request("cert_missing"))
        .unwrap_err();
    assert_eq!(err.status_hint(), 404);
}

#[test]
fn at_amend_e2e_06_numbers_at_the_length_limit_and_chains_stay_flat() {
    let base = format!("EICR-{}", "9".repeat(MAX_CERTIFICATE_NUMBER_CHARS - 5));
    assert_eq!(base.len(), MAX_CERTIFICATE_NUMBER_CHARS);
    let mut store = CertStore::new_in_memory();
    seed_eicr_numbered(&mut store, "cert_long", None, &base);
    let (rt, _blobs) = runtime();
    rt.complete_certificate(&mut store, &request("cert_long")).unwrap();
    rt.issue_certificate(&mut store, &request("cert_long")).unwrap();

    let first = rt
        .create_certificate_amendment(&mut store, &request("cert_long"))
        .unwrap();
    assert_eq!(first.certificate_number, format!("{base}/A1"));
    let req = amendment_request(&first.amendment_id);
    let decision = rt.complete_certificate(&mut store, &req).unwrap();
    assert!(decision.is_completed(), "{:?}", decision.report().missing);
    let issued = rt.issue_certificate(&mut store, &req).unwrap();
    let rev = store
        .revision_row(&company(), &first.amendment_id, issued.revision)
        .unwrap();
    assert_eq!(rev.content.certificate.certificate_number, format!("{base}/A1"));

    let second = rt.create_certificate_amendment(&mut store, &req).unwrap();
    assert_eq!(second.certificate_number, format!("{base}/A2"));
    let row = store
        .certificate_row(&company(), &second.amendment_id)
        .unwrap();
    assert_eq!(row.amends_certificate_id.as_ref(), Some(&first.amendment_id));
}
