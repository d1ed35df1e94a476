#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use certflow_kernel_contracts::audit::{AuditEventId, CertAuditEventInput, CertAuditEventType};
use certflow_kernel_contracts::cert_type::{CertType, SignatureRole};
use certflow_kernel_contracts::certificate::{
    Certificate, CertificateStatus, ChecklistItem, Observation, ObservationCode, SignatureRecord,
};
use certflow_kernel_contracts::ids::{CertificateId, CompanyId, JobId};
use certflow_kernel_contracts::outcome::OutcomeValue;
use certflow_kernel_contracts::revision::CertificateRevision;
use certflow_kernel_contracts::snapshot::{CanonicalCertSnapshot, CanonicalCertificateCore};
use certflow_kernel_contracts::Timestamp;
use certflow_storage::cert_store::{
    CertStore, DocumentRecordInput, IssuedCertificateUpdate, JobRecord, JobStatus,
    PdfTemplateRecord, StorageError, TemplateField, TenantSettings,
};
use certflow_storage::repo::{
    CertAuditRepo, CertificateRepo, DocumentRepo, RevisionRepo, TenantRepo,
};
use chrono::{TimeZone, Utc};
use serde_json::json;

fn t(minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 7, 1, 9, minute, 0).unwrap()
}

fn company() -> CompanyId {
    CompanyId::new("dbw_co_a").unwrap()
}

fn other_company() -> CompanyId {
    CompanyId::new("dbw_co_b").unwrap()
}

fn cert_id(id: &str) -> CertificateId {
    CertificateId::new(id).unwrap()
}

fn draft(id: &str) -> Certificate {
    Certificate::draft_v1(
        cert_id(id),
        company(),
        CertType::Eicr,
        format!("EICR-{id}"),
        2,
        json!({"clientDetails": {"clientName": "Acme"}}),
        t(0),
    )
    .unwrap()
}

fn store_with_completed(id: &str) -> CertStore {
    let mut s = CertStore::new_in_memory();
    s.insert_certificate_row(draft(id)).unwrap();
    s.transition_certificate_status(
        &company(),
        &cert_id(id),
        CertificateStatus::Draft,
        CertificateStatus::Completed,
    )
    .unwrap();
    s
}

fn snapshot_for(id: &str) -> CanonicalCertSnapshot {
    CanonicalCertSnapshot {
        snapshot_version: 1,
        certificate: CanonicalCertificateCore {
            id: id.to_string(),
            company_id: "dbw_co_a".to_string(),
            job_id: None,
            cert_type: "EICR".to_string(),
            certificate_number: format!("EICR-{id}"),
            inspector_name: None,
            inspector_email: None,
            data_version: 2,
            data: json!({}),
            outcome: Some("satisfactory".to_string()),
            outcome_reason: None,
            outcome_details: vec![],
            amends_certificate_id: None,
        },
        observations: vec![],
        checklists: vec![],
        signatures: vec![],
        attachments: vec![],
        test_results: vec![],
    }
}

fn revision(id: &str, n: u32) -> CertificateRevision {
    CertificateRevision::v1(
        cert_id(id),
        company(),
        n,
        "a".repeat(64),
        snapshot_for(id),
        Some("b".repeat(64)),
        t(5),
        "inspector@example.test",
    )
    .unwrap()
}

fn issued_update(expected: u32, token: &str) -> IssuedCertificateUpdate {
    IssuedCertificateUpdate {
        expected_revision: expected,
        revision: expected + 1,
        issued_at: t(5),
        outcome: OutcomeValue::Satisfactory,
        outcome_reason: "All checks passed.".to_string(),
        verification_token: token.to_string(),
    }
}

#[test]
fn at_store_db_01_tenant_scope_hides_foreign_rows() {
    let mut s = CertStore::new_in_memory();
    s.insert_certificate_row(draft("cert_1")).unwrap();

    assert!(s.certificate_row(&company(), &cert_id("cert_1")).is_some());
    assert!(s.certificate_row(&other_company(), &cert_id("cert_1")).is_none());
    assert!(s
        .certificate_aggregate(&other_company(), &cert_id("cert_1"))
        .is_none());
    assert!(matches!(
        s.insert_observation(
            &other_company(),
            &cert_id("cert_1"),
            Observation::v1("o1", ObservationCode::C2, "", "Loose", None, None, 0, t(1)).unwrap(),
        ),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
}

#[test]
fn at_store_db_02_duplicate_certificate_and_child_keys_rejected() {
    let mut s = CertStore::new_in_memory();
    s.insert_certificate_row(draft("cert_1")).unwrap();
    assert!(matches!(
        s.insert_certificate_row(draft("cert_1")),
        Err(StorageError::DuplicateKey { .. })
    ));

    let item = ChecklistItem::v1("k1", "protection", "RCD", "pass", None, 0).unwrap();
    s.insert_checklist_item(&company(), &cert_id("cert_1"), item.clone())
        .unwrap();
    assert!(matches!(
        s.insert_checklist_item(&company(), &cert_id("cert_1"), item),
        Err(StorageError::DuplicateKey { .. })
    ));
}

#[test]
fn at_store_db_03_job_foreign_key_enforced() {
    let mut s = CertStore::new_in_memory();
    let mut c = draft("cert_1");
    c.job_id = Some(JobId::new("job_1").unwrap());
    assert!(matches!(
        s.insert_certificate_row(c.clone()),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    s.insert_job_row(JobRecord::v1(company(), JobId::new("job_1").unwrap(), "Rewire").unwrap())
        .unwrap();
    s.insert_certificate_row(c).unwrap();
    assert_eq!(
        s.job_row(&company(), &JobId::new("job_1").unwrap())
            .unwrap()
            .status,
        JobStatus::Open
    );
}

#[test]
fn at_store_db_04_revisions_are_append_only_and_unique() {
    let mut s = store_with_completed("cert_1");
    s.append_revision_row(revision("cert_1", 1)).unwrap();
    assert!(matches!(
        s.append_revision_row(revision("cert_1", 1)),
        Err(StorageError::DuplicateKey { .. })
    ));
    assert_eq!(
        s.attempt_overwrite_revision(&cert_id("cert_1"), 1),
        Err(StorageError::AppendOnlyViolation {
            table: "certificate_revisions"
        })
    );
    assert_eq!(s.revision_rows(&company(), &cert_id("cert_1")).len(), 1);
    assert!(s.revision_row(&other_company(), &cert_id("cert_1"), 1).is_none());
}

#[test]
fn at_store_db_05_pdf_backfill_only_once() {
    let mut s = store_with_completed("cert_1");
    let mut rev = revision("cert_1", 1);
    rev.pdf_checksum = None;
    s.append_revision_row(rev).unwrap();

    s.backfill_revision_pdf_row(
        &company(),
        &cert_id("cert_1"),
        1,
        "certificates/dbw_co_a/cert_1/r1.pdf".to_string(),
        "c".repeat(64),
    )
    .unwrap();
    let stored = s.revision_row(&company(), &cert_id("cert_1"), 1).unwrap();
    assert_eq!(stored.pdf_checksum.as_deref(), Some("c".repeat(64).as_str()));
    assert_eq!(stored.signing_hash, "a".repeat(64));

    assert!(matches!(
        s.backfill_revision_pdf_row(
            &company(),
            &cert_id("cert_1"),
            1,
            "other.pdf".to_string(),
            "d".repeat(64),
        ),
        Err(StorageError::AppendOnlyViolation { .. })
    ));
}

#[test]
fn at_store_db_06_issue_compare_and_set_detects_stale_reads() {
    let mut s = store_with_completed("cert_1");
    s.mark_certificate_issued(&company(), &cert_id("cert_1"), issued_update(0, "tok_1"))
        .unwrap();
    let c = s.certificate_row(&company(), &cert_id("cert_1")).unwrap();
    assert_eq!(c.status, CertificateStatus::Issued);
    assert_eq!(c.current_revision, 1);

    // A second writer that read revision 0 loses.
    assert!(matches!(
        s.mark_certificate_issued(&company(), &cert_id("cert_1"), issued_update(0, "tok_2")),
        Err(StorageError::StaleRevision { .. })
    ));
    assert_eq!(
        s.certificate_row_by_verification_token("tok_1")
            .map(|c| c.id.clone()),
        Some(cert_id("cert_1"))
    );
    assert!(s.certificate_row_by_verification_token("tok_2").is_none());
}

#[test]
fn at_store_db_07_transaction_restores_state_on_error() {
    let mut s = store_with_completed("cert_1");
    let out: Result<(), StorageError> = s.transaction(|tx| {
        tx.append_revision_row(revision("cert_1", 1))?;
        tx.mark_certificate_issued(&company(), &cert_id("cert_1"), issued_update(0, "tok_1"))?;
        tx.append_revision_row(revision("cert_1", 1))?;
        Ok(())
    });
    assert!(matches!(out, Err(StorageError::DuplicateKey { .. })));
    assert!(s.revision_rows(&company(), &cert_id("cert_1")).is_empty());
    let c = s.certificate_row(&company(), &cert_id("cert_1")).unwrap();
    assert_eq!(c.status, CertificateStatus::Completed);
    assert!(s.certificate_row_by_verification_token("tok_1").is_none());
}

#[test]
fn at_store_db_08_issued_children_are_frozen() {
    let mut s = store_with_completed("cert_1");
    s.mark_certificate_issued(&company(), &cert_id("cert_1"), issued_update(0, "tok_1"))
        .unwrap();
    let sig =
        SignatureRecord::unsigned_v1("s1", SignatureRole::Engineer, "A. Sparks", 0).unwrap();
    assert!(matches!(
        s.insert_signature(&company(), &cert_id("cert_1"), sig),
        Err(StorageError::AppendOnlyViolation { .. })
    ));
}

#[test]
fn at_store_db_09_in_progress_amendment_lookup() {
    let mut s = store_with_completed("cert_1");
    s.mark_certificate_issued(&company(), &cert_id("cert_1"), issued_update(0, "tok_1"))
        .unwrap();
    assert!(s
        .in_progress_amendment_row(&company(), &cert_id("cert_1"))
        .is_none());

    let mut amendment = draft("cert_2");
    amendment.amends_certificate_id = Some(cert_id("cert_1"));
    s.insert_certificate_row(amendment).unwrap();
    assert_eq!(
        s.in_progress_amendment_row(&company(), &cert_id("cert_1"))
            .map(|c| c.id.clone()),
        Some(cert_id("cert_2"))
    );

    s.transition_certificate_status(
        &company(),
        &cert_id("cert_2"),
        CertificateStatus::Draft,
        CertificateStatus::Void,
    )
    .unwrap();
    assert!(s
        .in_progress_amendment_row(&company(), &cert_id("cert_1"))
        .is_none());
}

#[test]
fn at_store_db_10_audit_rows_append_only_and_scoped() {
    let mut s = CertStore::new_in_memory();
    s.insert_certificate_row(draft("cert_1")).unwrap();
    let id = s
        .append_cert_audit_row(
            CertAuditEventInput::v1(
                company(),
                cert_id("cert_1"),
                CertAuditEventType::Completed,
                "inspector@example.test",
                t(2),
                BTreeMap::new(),
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(id, AuditEventId(1));
    assert!(matches!(
        s.append_cert_audit_row(
            CertAuditEventInput::v1(
                other_company(),
                cert_id("cert_1"),
                CertAuditEventType::Completed,
                "x",
                t(2),
                BTreeMap::new(),
            )
            .unwrap()
        ),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    assert_eq!(s.cert_audit_rows().len(), 1);
    assert_eq!(
        s.cert_audit_rows_for_certificate(&company(), &cert_id("cert_1"))
            .len(),
        1
    );
    assert!(s.attempt_overwrite_audit_event(id).is_err());
}

#[test]
fn at_store_db_11_documents_require_revision() {
    let mut s = store_with_completed("cert_1");
    let input = DocumentRecordInput {
        company_id: company(),
        certificate_id: cert_id("cert_1"),
        revision: 1,
        pdf_key: "certificates/dbw_co_a/cert_1/r1.pdf".to_string(),
        pdf_checksum: "b".repeat(64),
        created_at: t(6),
    };
    assert!(matches!(
        s.register_document_row(input.clone()),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    s.append_revision_row(revision("cert_1", 1)).unwrap();
    assert_eq!(s.register_document_row(input.clone()).unwrap(), 1);
    assert!(matches!(
        s.register_document_row(input),
        Err(StorageError::DuplicateKey { .. })
    ));
    assert_eq!(
        s.document_rows_for_certificate(&company(), &cert_id("cert_1"))
            .len(),
        1
    );
}

#[test]
fn at_store_db_12_tenant_settings_and_active_template() {
    let mut s = CertStore::new_in_memory();
    assert!(!s.tenant_settings_row(&company()).auto_complete_job_on_issue);
    s.set_tenant_settings(
        company(),
        TenantSettings {
            auto_complete_job_on_issue: true,
        },
    );
    assert!(s.tenant_settings_row(&company()).auto_complete_job_on_issue);
    assert!(!s.tenant_settings_row(&other_company()).auto_complete_job_on_issue);

    let fields = vec![TemplateField {
        label: "Client".to_string(),
        key: "client.name".to_string(),
    }];
    s.insert_pdf_template_row(
        PdfTemplateRecord::v1("tpl_1", company(), CertType::Eicr, "v1", "EICR", fields.clone())
            .unwrap(),
    )
    .unwrap();
    s.insert_pdf_template_row(
        PdfTemplateRecord::v1("tpl_2", company(), CertType::Eicr, "v2", "EICR", fields).unwrap(),
    )
    .unwrap();
    assert_eq!(
        s.active_pdf_template_row(&company(), CertType::Eicr)
            .map(|tpl| tpl.template_id.as_str()),
        Some("tpl_2")
    );
    assert!(s
        .active_pdf_template_row(&other_company(), CertType::Eicr)
        .is_none());
    assert!(s.active_pdf_template_row(&company(), CertType::Eic).is_none());
}
