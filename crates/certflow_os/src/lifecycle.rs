#![forbid(unsafe_code)]

use certflow_engines::{compute_outcome, validate_certificate_for_completion};
use certflow_kernel_contracts::audit::CertAuditEventType;
use certflow_kernel_contracts::certificate::CertificateStatus;
use certflow_kernel_contracts::completion::CompletionReport;
use certflow_kernel_contracts::outcome::OutcomeResult;
use certflow_storage::cert_store::{CertStore, StorageError};
use certflow_storage::repo::{CertAuditRepo, CertificateRepo};

use crate::error::{reason_codes, IssuanceError};
use crate::runtime::{CertificateRequest, CertificateRuntime};

/// Outcome of asking to mark a draft complete. A rejection is a normal answer carrying the
/// field-level report; the certificate stays a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionDecision {
    Completed {
        report: CompletionReport,
        outcome: OutcomeResult,
    },
    Rejected(CompletionReport),
}

impl CompletionDecision {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionDecision::Completed { .. })
    }

    pub fn report(&self) -> &CompletionReport {
        match self {
            CompletionDecision::Completed { report, .. } | CompletionDecision::Rejected(report) => {
                report
            }
        }
    }
}

impl CertificateRuntime {
    /// Draft to completed, gated by the completion validator for the certificate's type and
    /// payload version. The current outcome is cached on the row; issuance recomputes it.
    pub fn complete_certificate(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
    ) -> Result<CompletionDecision, IssuanceError> {
        let aggregate = store
            .certificate_aggregate(&req.company_id, &req.certificate_id)
            .ok_or_else(|| IssuanceError::not_found(&req.certificate_id))?;
        let cert = &aggregate.certificate;
        if cert.status != CertificateStatus::Draft {
            return Err(IssuanceError::invalid_transition(
                format!(
                    "Only draft certificates can be completed (status: {})",
                    cert.status
                ),
                reason_codes::CERT_REFUSE_NOT_DRAFT,
            ));
        }

        let report = validate_certificate_for_completion(
            cert.cert_type.as_str(),
            cert.data_version,
            &cert.data,
            &aggregate.signatures,
        );
        if !report.ok {
            tracing::debug!(
                certificate_id = %req.certificate_id,
                missing = report.missing.len(),
                completion_percent = report.completion_percent,
                "completion rejected"
            );
            return Ok(CompletionDecision::Rejected(report));
        }

        let outcome = compute_outcome(
            cert.cert_type.as_str(),
            &aggregate.observations,
            &aggregate.checklists,
            &aggregate.test_results,
        );
        let audit = self.audit_input(
            req,
            CertAuditEventType::Completed,
            reason_codes::CERT_OK_COMPLETED,
            [("outcome", outcome.outcome.as_str().to_string())],
        )?;
        store.transaction(|tx| -> Result<(), StorageError> {
            tx.transition_certificate_status(
                &req.company_id,
                &req.certificate_id,
                CertificateStatus::Draft,
                CertificateStatus::Completed,
            )?;
            tx.set_certificate_outcome(
                &req.company_id,
                &req.certificate_id,
                outcome.outcome,
                outcome.reason.clone(),
            )?;
            tx.append_cert_audit_row(audit)?;
            Ok(())
        })?;
        tracing::info!(
            certificate_id = %req.certificate_id,
            company_id = %req.company_id,
            outcome = %outcome.outcome,
            "certificate completed"
        );

        Ok(CompletionDecision::Completed { report, outcome })
    }

    /// Any non-void state to void. Terminal; committed revisions are left as they are.
    pub fn void_certificate(
        &self,
        store: &mut CertStore,
        req: &CertificateRequest,
        reason: &str,
    ) -> Result<(), IssuanceError> {
        let status = store
            .certificate_row(&req.company_id, &req.certificate_id)
            .map(|c| c.status)
            .ok_or_else(|| IssuanceError::not_found(&req.certificate_id))?;
        if status == CertificateStatus::Void {
            return Err(IssuanceError::invalid_transition(
                format!("Certificate {} is already void", req.certificate_id),
                reason_codes::CERT_REFUSE_ALREADY_VOID,
            ));
        }

        let audit = self.audit_input(
            req,
            CertAuditEventType::Voided,
            reason_codes::CERT_OK_VOIDED,
            [
                ("previous_status", status.as_str().to_string()),
                ("reason", reason.trim().to_string()),
            ],
        )?;
        store.transaction(|tx| -> Result<(), StorageError> {
            tx.transition_certificate_status(
                &req.company_id,
                &req.certificate_id,
                status,
                CertificateStatus::Void,
            )?;
            tx.append_cert_audit_row(audit)?;
            Ok(())
        })?;
        tracing::info!(
            certificate_id = %req.certificate_id,
            company_id = %req.company_id,
            previous_status = %status,
            "certificate voided"
        );
        Ok(())
    }
}
