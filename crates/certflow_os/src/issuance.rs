#![forbid(unsafe_code)]

//! Issuance: freeze a completed certificate into an immutable, hashed revision.

use certflow_engines::{
    build_issued_snapshot, compute_checksum, compute_outcome, compute_signing_hash,
};
use certflow_kernel_contracts::audit::CertAuditEventType;
use certflow_kernel_contracts::certificate::{CertificateAggregate, CertificateStatus};
use certflow_kernel_contracts::ids::{CertificateId, CompanyId};
use certflow_kernel_contracts::outcome::OutcomeValue;
use certflow_kernel_contracts::revision::CertificateRevision;
use certflow_storage::blob::BlobError;
use certflow_storage::cert_store::{
    CertStore, DocumentRecordInput, IssuedCertificateUpdate, JobStatus, StorageError,
};
use certflow_storage::repo::{
    CertAuditRepo, CertificateRepo, DocumentRepo, RevisionRepo, TenantRepo,
};

use crate::error::{reason_codes, IssuanceError};
use crate::runtime::{CertificateRequest, CertificateRuntime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedRevision {
    pub revision: u32,
    pub signing_hash: String,
    /// `None` when the document write failed; the revision stays committed and the
    /// document can be regenerated later.
    pub pdf_key: Option<String>,
    pub pdf_checksum: String,
    pub outcome: OutcomeValue,
    pub verification_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedPdf {
    pub revision: u32,
    pub pdf_key: String,
    pub pdf_checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfIntegrity {
    /// The revision has no stored document yet.
    NotStored,
    Missing { pdf_key: String },
    Matches,
    Mismatch {
        expected: Option<String>,
        actual: String,
    },
}

/// Result of re-deriving a committed revision's hashes from its stored content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionAudit {
    pub certificate_id: CertificateId,
    pub revision: u32,
    pub stored_signing_hash: String,
    pub recomputed_signing_hash: String,
    pub pdf: PdfIntegrity,
}

impl RevisionAudit {
    pub fn hash_matches(&self) -> bool {
        self.stored_signing_hash == self.recomputed_signing_hash
    }

    pub fn is_intact(&self) -> bool {
        self.hash_matches() && matches!(self.pdf, PdfIntegrity::Matches | PdfIntegrity::NotStored)
    }
}

impl CertificateRuntime {
    /// Issues a completed certificate as revision `current_revision + 1`.
    ///
    /// The outcome is recomputed from the current rows, the snapshot is hashed and rendered,
    /// then the revision row, the certificate status flip, the audit event and the optional
    /// job completion commit together. The document write and registration run after the
    /// commit and only log on failure.
    pub fn issue_certificate(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
    ) -> Result<IssuedRevision, IssuanceError> {
        let aggregate = store
            .certificate_aggregate(&req.company_id, &req.certificate_id)
            .ok_or_else(|| IssuanceError::not_found(&req.certificate_id))?;
        let cert = &aggregate.certificate;
        match cert.status {
            CertificateStatus::Completed => {}
            CertificateStatus::Issued => {
                return Err(IssuanceError::Conflict {
                    message: format!(
                        "Certificate {} is already issued (revision {}); create an amendment to change it",
                        cert.id, cert.current_revision
                    ),
                    reason_code: reason_codes::CERT_REFUSE_ALREADY_ISSUED,
                })
            }
            status => {
                return Err(IssuanceError::invalid_transition(
                    format!("Only completed certificates can be issued (status: {status})"),
                    reason_codes::CERT_REFUSE_NOT_COMPLETED,
                ))
            }
        }
        self.check_limits(&aggregate)?;

        let outcome = compute_outcome(
            cert.cert_type.as_str(),
            &aggregate.observations,
            &aggregate.checklists,
            &aggregate.test_results,
        );

        let snapshot = build_issued_snapshot(&aggregate, &outcome);
        let signing_hash = compute_signing_hash(&snapshot)?;
        let expected_revision = aggregate.certificate.current_revision;
        let revision = expected_revision + 1;

        let pdf = self.render_pdf(store, &req.company_id, &snapshot)?;
        let pdf_checksum = compute_checksum(&pdf);

        let issued_at = self.env.now();
        let verification_token = aggregate
            .certificate
            .verification_token
            .clone()
            .unwrap_or_else(|| self.env.verification_token());
        let job_to_complete = aggregate.certificate.job_id.clone().filter(|_| {
            store
                .tenant_settings_row(&req.company_id)
                .auto_complete_job_on_issue
        });

        let revision_row = CertificateRevision::v1(
            req.certificate_id.clone(),
            req.company_id.clone(),
            revision,
            signing_hash.clone(),
            snapshot,
            Some(pdf_checksum.clone()),
            issued_at,
            req.actor.clone(),
        )?;
        let audit = self.audit_input(
            req,
            CertAuditEventType::Issued,
            reason_codes::CERT_OK_ISSUED,
            [
                ("revision", revision.to_string()),
                ("signing_hash", signing_hash.clone()),
                ("outcome", outcome.outcome.as_str().to_string()),
            ],
        )?;
        let update = IssuedCertificateUpdate {
            expected_revision,
            revision,
            issued_at,
            outcome: outcome.outcome,
            outcome_reason: outcome.reason.clone(),
            verification_token: verification_token.clone(),
        };

        store.transaction(|tx| -> Result<(), StorageError> {
            tx.append_revision_row(revision_row)?;
            tx.mark_certificate_issued(&req.company_id, &req.certificate_id, update)?;
            tx.append_cert_audit_row(audit)?;
            if let Some(job_id) = &job_to_complete {
                tx.set_job_status(&req.company_id, job_id, JobStatus::Completed)?;
            }
            Ok(())
        })?;
        tracing::info!(
            certificate_id = %req.certificate_id,
            company_id = %req.company_id,
            revision,
            outcome = %outcome.outcome,
            "certificate issued"
        );

        let pdf_key = self.store_issued_pdf(
            store,
            &req.company_id,
            &req.certificate_id,
            revision,
            &pdf,
            &pdf_checksum,
        );
        if let Some(key) = &pdf_key {
            self.register_document(store, req, revision, key, &pdf_checksum);
        }

        Ok(IssuedRevision {
            revision,
            signing_hash,
            pdf_key,
            pdf_checksum,
            outcome: outcome.outcome,
            verification_token,
        })
    }

    /// Re-renders a committed revision from its stored content and backfills the document
    /// key. Only allowed while the revision has no stored document.
    pub fn regenerate_revision_pdf(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
        revision: u32,
    ) -> Result<RegeneratedPdf, IssuanceError> {
        if store
            .certificate_row(&req.company_id, &req.certificate_id)
            .is_none()
        {
            return Err(IssuanceError::not_found(&req.certificate_id));
        }
        let row = store
            .revision_row(&req.company_id, &req.certificate_id, revision)
            .ok_or_else(|| IssuanceError::RevisionNotFound {
                certificate_id: req.certificate_id.to_string(),
                revision,
            })?;
        if let Some(existing) = &row.pdf_key {
            return Err(IssuanceError::Conflict {
                message: format!("Revision {revision} already has a stored document ({existing})"),
                reason_code: reason_codes::CERT_REFUSE_PDF_ALREADY_STORED,
            });
        }

        let pdf = self.render_pdf(store, &req.company_id, &row.content)?;
        let pdf_checksum = compute_checksum(&pdf);
        let pdf_key = self
            .config
            .pdf_key(&req.company_id, &req.certificate_id, revision);
        self.blobs.write_bytes(&pdf_key, &pdf)?;

        let audit = self.audit_input(
            req,
            CertAuditEventType::PdfBackfilled,
            reason_codes::CERT_OK_PDF_BACKFILLED,
            [
                ("revision", revision.to_string()),
                ("pdf_key", pdf_key.clone()),
                ("pdf_checksum", pdf_checksum.clone()),
            ],
        )?;
        store.transaction(|tx| -> Result<(), StorageError> {
            tx.backfill_revision_pdf_row(
                &req.company_id,
                &req.certificate_id,
                revision,
                pdf_key.clone(),
                pdf_checksum.clone(),
            )?;
            tx.append_cert_audit_row(audit)?;
            Ok(())
        })?;
        tracing::info!(
            certificate_id = %req.certificate_id,
            company_id = %req.company_id,
            revision,
            "revision document regenerated"
        );
        self.register_document(store, req, revision, &pdf_key, &pdf_checksum);

        Ok(RegeneratedPdf {
            revision,
            pdf_key,
            pdf_checksum,
        })
    }

    /// Re-derives the signing hash of a committed revision and re-checksums its stored
    /// document, if any. Read-only.
    pub fn audit_revision(
        &self,
        store: &CertStore,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
    ) -> Result<RevisionAudit, IssuanceError> {
        let row = store
            .revision_row(company_id, certificate_id, revision)
            .ok_or_else(|| IssuanceError::RevisionNotFound {
                certificate_id: certificate_id.to_string(),
                revision,
            })?;
        let recomputed_signing_hash = compute_signing_hash(&row.content)?;

        let pdf = match &row.pdf_key {
            None => PdfIntegrity::NotStored,
            Some(key) => match self.blobs.read_bytes(key) {
                Ok(bytes) => {
                    let actual = compute_checksum(&bytes);
                    if row.pdf_checksum.as_deref() == Some(actual.as_str()) {
                        PdfIntegrity::Matches
                    } else {
                        PdfIntegrity::Mismatch {
                            expected: row.pdf_checksum.clone(),
                            actual,
                        }
                    }
                }
                Err(BlobError::NotFound { .. }) => PdfIntegrity::Missing {
                    pdf_key: key.clone(),
                },
                Err(e) => return Err(e.into()),
            },
        };

        let audit = RevisionAudit {
            certificate_id: certificate_id.clone(),
            revision,
            stored_signing_hash: row.signing_hash.clone(),
            recomputed_signing_hash,
            pdf,
        };
        if !audit.is_intact() {
            tracing::warn!(
                certificate_id = %certificate_id,
                company_id = %company_id,
                revision,
                hash_matches = audit.hash_matches(),
                pdf = ?audit.pdf,
                "revision integrity check failed"
            );
        }
        Ok(audit)
    }

    fn check_limits(&self, aggregate: &CertificateAggregate) -> Result<(), IssuanceError> {
        if aggregate.observations.len() > self.config.max_observations {
            return Err(IssuanceError::LimitExceeded {
                field: "observations",
                got: aggregate.observations.len(),
                max: self.config.max_observations,
            });
        }
        if aggregate.test_results.len() > self.config.max_test_results {
            return Err(IssuanceError::LimitExceeded {
                field: "test_results",
                got: aggregate.test_results.len(),
                max: self.config.max_test_results,
            });
        }
        Ok(())
    }

    fn store_issued_pdf(
        &self,
        store: &mut CertStore,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
        pdf: &[u8],
        pdf_checksum: &str,
    ) -> Option<String> {
        let key = self.config.pdf_key(company_id, certificate_id, revision);
        if let Err(e) = self.blobs.write_bytes(&key, pdf) {
            tracing::warn!(
                certificate_id = %certificate_id,
                company_id = %company_id,
                revision,
                error = %e,
                "revision document write failed; regenerate later"
            );
            return None;
        }
        if let Err(e) = store.backfill_revision_pdf_row(
            company_id,
            certificate_id,
            revision,
            key.clone(),
            pdf_checksum.to_string(),
        ) {
            tracing::warn!(
                certificate_id = %certificate_id,
                company_id = %company_id,
                revision,
                error = %e,
                "revision document key backfill failed"
            );
            return None;
        }
        Some(key)
    }

    fn register_document(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
        revision: u32,
        pdf_key: &str,
        pdf_checksum: &str,
    ) {
        if !self.config.register_documents {
            return;
        }
        let input = DocumentRecordInput {
            company_id: req.company_id.clone(),
            certificate_id: req.certificate_id.clone(),
            revision,
            pdf_key: pdf_key.to_string(),
            pdf_checksum: pdf_checksum.to_string(),
            created_at: self.env.now(),
        };
        if let Err(e) = store.register_document_row(input) {
            tracing::warn!(
                certificate_id = %req.certificate_id,
                company_id = %req.company_id,
                revision,
                error = %e,
                "document registration failed"
            );
        }
    }
}
