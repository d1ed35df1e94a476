#![forbid(unsafe_code)]

use certflow_kernel_contracts::audit::{AuditEventId, CertAuditEvent, CertAuditEventInput};
use certflow_kernel_contracts::cert_type::CertType;
use certflow_kernel_contracts::certificate::{Certificate, CertificateAggregate};
use certflow_kernel_contracts::ids::{CertificateId, CompanyId, JobId};
use certflow_kernel_contracts::revision::CertificateRevision;

use crate::cert_store::{
    CertStore, DocumentRecord, DocumentRecordInput, JobRecord, PdfTemplateRecord, StorageError,
    TenantSettings,
};

/// Typed repository interface for certificate rows and their aggregates.
pub trait CertificateRepo {
    fn insert_certificate_row(&mut self, certificate: Certificate) -> Result<(), StorageError>;
    fn certificate_row(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<&Certificate>;
    fn certificate_aggregate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<CertificateAggregate>;
    fn in_progress_amendment_row(
        &self,
        company_id: &CompanyId,
        original_id: &CertificateId,
    ) -> Option<&Certificate>;
    fn certificate_row_by_verification_token(&self, token: &str) -> Option<&Certificate>;
}

/// Append-only revision ledger.
pub trait RevisionRepo {
    fn append_revision_row(&mut self, revision: CertificateRevision) -> Result<(), StorageError>;
    fn revision_row(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
    ) -> Option<&CertificateRevision>;
    fn revision_rows(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertificateRevision>;
    fn backfill_revision_pdf_row(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
        pdf_key: String,
        pdf_checksum: String,
    ) -> Result<(), StorageError>;
}

pub trait CertAuditRepo {
    fn append_cert_audit_row(
        &mut self,
        input: CertAuditEventInput,
    ) -> Result<AuditEventId, StorageError>;
    fn cert_audit_rows(&self) -> &[CertAuditEvent];
    fn cert_audit_rows_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertAuditEvent>;
}

pub trait DocumentRepo {
    fn register_document_row(&mut self, input: DocumentRecordInput) -> Result<u64, StorageError>;
    fn document_rows_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&DocumentRecord>;
}

/// Tenant-level configuration rows: jobs, settings, document templates.
pub trait TenantRepo {
    fn insert_job_row(&mut self, record: JobRecord) -> Result<(), StorageError>;
    fn job_row(&self, company_id: &CompanyId, job_id: &JobId) -> Option<&JobRecord>;
    fn tenant_settings_row(&self, company_id: &CompanyId) -> TenantSettings;
    fn insert_pdf_template_row(&mut self, record: PdfTemplateRecord) -> Result<(), StorageError>;
    fn active_pdf_template_row(
        &self,
        company_id: &CompanyId,
        cert_type: CertType,
    ) -> Option<&PdfTemplateRecord>;
}

impl CertificateRepo for CertStore {
    fn insert_certificate_row(&mut self, certificate: Certificate) -> Result<(), StorageError> {
        self.insert_certificate(certificate)
    }

    fn certificate_row(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<&Certificate> {
        self.certificate(company_id, certificate_id)
    }

    fn certificate_aggregate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<CertificateAggregate> {
        self.load_aggregate(company_id, certificate_id)
    }

    fn in_progress_amendment_row(
        &self,
        company_id: &CompanyId,
        original_id: &CertificateId,
    ) -> Option<&Certificate> {
        self.in_progress_amendment(company_id, original_id)
    }

    fn certificate_row_by_verification_token(&self, token: &str) -> Option<&Certificate> {
        self.find_by_verification_token(token)
    }
}

impl RevisionRepo for CertStore {
    fn append_revision_row(&mut self, revision: CertificateRevision) -> Result<(), StorageError> {
        self.append_revision(revision)
    }

    fn revision_row(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
    ) -> Option<&CertificateRevision> {
        self.revision(company_id, certificate_id, revision)
    }

    fn revision_rows(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertificateRevision> {
        self.revisions_for_certificate(company_id, certificate_id)
    }

    fn backfill_revision_pdf_row(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
        pdf_key: String,
        pdf_checksum: String,
    ) -> Result<(), StorageError> {
        self.backfill_revision_pdf(company_id, certificate_id, revision, pdf_key, pdf_checksum)
    }
}

impl CertAuditRepo for CertStore {
    fn append_cert_audit_row(
        &mut self,
        input: CertAuditEventInput,
    ) -> Result<AuditEventId, StorageError> {
        self.append_audit_event(input)
    }

    fn cert_audit_rows(&self) -> &[CertAuditEvent] {
        self.audit_events()
    }

    fn cert_audit_rows_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertAuditEvent> {
        self.audit_events_for_certificate(company_id, certificate_id)
    }
}

impl DocumentRepo for CertStore {
    fn register_document_row(&mut self, input: DocumentRecordInput) -> Result<u64, StorageError> {
        self.register_document(input)
    }

    fn document_rows_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&DocumentRecord> {
        self.documents_for_certificate(company_id, certificate_id)
    }
}

impl TenantRepo for CertStore {
    fn insert_job_row(&mut self, record: JobRecord) -> Result<(), StorageError> {
        self.insert_job(record)
    }

    fn job_row(&self, company_id: &CompanyId, job_id: &JobId) -> Option<&JobRecord> {
        self.job(company_id, job_id)
    }

    fn tenant_settings_row(&self, company_id: &CompanyId) -> TenantSettings {
        self.tenant_settings(company_id)
    }

    fn insert_pdf_template_row(&mut self, record: PdfTemplateRecord) -> Result<(), StorageError> {
        self.insert_pdf_template(record)
    }

    fn active_pdf_template_row(
        &self,
        company_id: &CompanyId,
        cert_type: CertType,
    ) -> Option<&PdfTemplateRecord> {
        self.active_pdf_template(company_id, cert_type)
    }
}
