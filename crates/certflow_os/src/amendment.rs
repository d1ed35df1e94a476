#![forbid(unsafe_code)]

use certflow_kernel_contracts::audit::CertAuditEventType;
use certflow_kernel_contracts::cert_type::SignatureRole;
use certflow_kernel_contracts::certificate::{
    amendment_sequence, base_certificate_number, Certificate, CertificateAggregate,
    CertificateStatus, SignatureRecord,
};
use certflow_kernel_contracts::Validate;
use certflow_kernel_contracts::ids::CertificateId;
use certflow_kernel_contracts::Timestamp;
use certflow_storage::cert_store::{CertStore, StorageError};
use certflow_storage::repo::{CertAuditRepo, CertificateRepo};

use crate::error::{reason_codes, IssuanceError};
use crate::runtime::{CertificateRequest, CertificateRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendmentCreated {
    pub amendment_id: CertificateId,
    pub certificate_number: String,
}

impl CertificateRuntime {
    /// Opens a draft amendment of an issued certificate.
    ///
    /// The draft carries the original's job link, type, payload, observations, checklist
    /// answers and test results. Signature rows are carried as unsigned placeholders: an
    /// amendment needs fresh attestation. Attachments stay with the original.
    pub fn create_certificate_amendment(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
    ) -> Result<AmendmentCreated, IssuanceError> {
        let original = store
            .certificate_aggregate(&req.company_id, &req.certificate_id)
            .ok_or_else(|| IssuanceError::not_found(&req.certificate_id))?;
        let status = original.certificate.status;
        if status != CertificateStatus::Issued {
            return Err(IssuanceError::invalid_transition(
                format!("Only issued certificates can be amended (status: {status})"),
                reason_codes::CERT_REFUSE_NOT_ISSUED,
            ));
        }
        if let Some(existing) = store.in_progress_amendment_row(&req.company_id, &req.certificate_id)
        {
            return Err(IssuanceError::Conflict {
                message: format!(
                    "An amendment is already in progress for certificate {} ({}, status: {})",
                    req.certificate_id, existing.id, existing.status
                ),
                reason_code: reason_codes::CERT_REFUSE_AMENDMENT_IN_PROGRESS,
            });
        }

        let base = base_certificate_number(&original.certificate.certificate_number);
        let sequence = store
            .certificates_for_company(&req.company_id)
            .into_iter()
            .filter_map(|c| amendment_sequence(&c.certificate_number, base))
            .max()
            .unwrap_or(0)
            + 1;
        let number = format!("{base}/A{sequence}");
        let amendment_id = CertificateId::new(self.env.new_id("cert"))?;
        let amendment = amendment_draft(&original, amendment_id.clone(), number, self.env.now())?;
        let certificate_number = amendment.certificate.certificate_number.clone();

        let audit = self.audit_input(
            req,
            CertAuditEventType::Amended,
            reason_codes::CERT_OK_AMENDED,
            [
                ("amendment_id", amendment_id.to_string()),
                ("amendment_number", certificate_number.clone()),
            ],
        )?;
        store.transaction(|tx| -> Result<(), StorageError> {
            let company_id = &req.company_id;
            let CertificateAggregate {
                certificate,
                observations,
                checklists,
                signatures,
                attachments: _,
                test_results,
            } = amendment;
            tx.insert_certificate_row(certificate)?;
            for row in observations {
                tx.insert_observation(company_id, &amendment_id, row)?;
            }
            for row in checklists {
                tx.insert_checklist_item(company_id, &amendment_id, row)?;
            }
            for row in signatures {
                tx.insert_signature(company_id, &amendment_id, row)?;
            }
            for row in test_results {
                tx.insert_test_result(company_id, &amendment_id, row)?;
            }
            tx.append_cert_audit_row(audit)?;
            Ok(())
        })?;
        tracing::info!(
            certificate_id = %req.certificate_id,
            company_id = %req.company_id,
            amendment_id = %amendment_id,
            "certificate amendment created"
        );

        Ok(AmendmentCreated {
            amendment_id,
            certificate_number,
        })
    }
}

/// The amendment aggregate, with row ids rebased onto the amendment.
fn amendment_draft(
    original: &CertificateAggregate,
    amendment_id: CertificateId,
    number: String,
    created_at: Timestamp,
) -> Result<CertificateAggregate, IssuanceError> {
    let source = &original.certificate;
    let mut certificate = Certificate::draft_v1(
        amendment_id.clone(),
        source.company_id.clone(),
        source.cert_type,
        base_certificate_number(&source.certificate_number),
        source.data_version,
        source.data.clone(),
        created_at,
    )?;
    certificate.certificate_number = number;
    certificate.job_id = source.job_id.clone();
    certificate.inspector_name = source.inspector_name.clone();
    certificate.inspector_email = source.inspector_email.clone();
    certificate.amends_certificate_id = Some(source.id.clone());
    certificate.validate()?;

    let row_id = |kind: &str, index: usize| format!("{amendment_id}_{kind}{index}");

    let observations = original
        .observations
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let mut row = o.clone();
            row.id = row_id("o", i);
            row
        })
        .collect();
    let checklists = original
        .checklists
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut row = c.clone();
            row.id = row_id("k", i);
            row
        })
        .collect();
    let test_results = original
        .test_results
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut row = t.clone();
            row.id = row_id("t", i);
            row
        })
        .collect();

    let mut signatures: Vec<SignatureRecord> = original
        .signatures
        .iter()
        .enumerate()
        .map(|(i, s)| s.cleared(row_id("s", i)))
        .collect();
    let required: &[SignatureRole] = source.cert_type.metadata().required_signature_roles;
    for role in required {
        if !signatures.iter().any(|s| s.role == *role) {
            let index = signatures.len();
            signatures.push(SignatureRecord::unsigned_v1(
                row_id("s", index),
                *role,
                "",
                index as i64,
            )?);
        }
    }

    Ok(CertificateAggregate {
        certificate,
        observations,
        checklists,
        signatures,
        attachments: Vec::new(),
        test_results,
    })
}
