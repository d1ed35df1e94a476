#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use certflow_kernel_contracts::audit::{AuditEventId, CertAuditEvent, CertAuditEventInput};
use certflow_kernel_contracts::cert_type::CertType;
use certflow_kernel_contracts::certificate::{
    Attachment, Certificate, CertificateAggregate, CertificateStatus, ChecklistItem, Observation,
    SignatureRecord, TestResult,
};
use certflow_kernel_contracts::ids::{CertificateId, CompanyId, JobId};
use certflow_kernel_contracts::outcome::OutcomeValue;
use certflow_kernel_contracts::revision::{is_sha256_hex, CertificateRevision};
use certflow_kernel_contracts::{ContractViolation, Timestamp, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    NotFound { table: &'static str, key: String },
    ForeignKeyViolation { table: &'static str, key: String },
    DuplicateKey { table: &'static str, key: String },
    AppendOnlyViolation { table: &'static str },
    /// The row moved since it was read (status or revision no longer matches).
    StaleRevision { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound { table, key } => write!(f, "{table}: {key} not found"),
            StorageError::ForeignKeyViolation { table, key } => {
                write!(f, "{table}: foreign key {key} does not exist")
            }
            StorageError::DuplicateKey { table, key } => write!(f, "{table}: duplicate key {key}"),
            StorageError::AppendOnlyViolation { table } => write!(f, "{table} is append-only"),
            StorageError::StaleRevision { table, key } => {
                write!(f, "{table}: {key} changed since it was read")
            }
            StorageError::ContractViolation(v) => write!(f, "contract violation: {v}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Open,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub company_id: CompanyId,
    pub job_id: JobId,
    pub title: String,
    pub status: JobStatus,
}

impl JobRecord {
    pub fn v1(
        company_id: CompanyId,
        job_id: JobId,
        title: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "job_record.title",
                reason: "must not be empty",
            });
        }
        Ok(Self {
            company_id,
            job_id,
            title,
            status: JobStatus::Open,
        })
    }
}

/// Per-company switches read by the orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TenantSettings {
    pub auto_complete_job_on_issue: bool,
}

impl TenantSettings {
    pub fn mvp_v1() -> Self {
        Self {
            auto_complete_job_on_issue: false,
        }
    }
}

/// One labelled value on a templated document. `key` indexes the renderer's data dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    pub label: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfTemplateRecord {
    pub template_id: String,
    pub company_id: CompanyId,
    pub cert_type: CertType,
    pub name: String,
    pub title: String,
    pub fields: Vec<TemplateField>,
    pub footer: Option<String>,
    pub include_photos: bool,
    pub active: bool,
}

impl PdfTemplateRecord {
    pub fn v1(
        template_id: impl Into<String>,
        company_id: CompanyId,
        cert_type: CertType,
        name: impl Into<String>,
        title: impl Into<String>,
        fields: Vec<TemplateField>,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            template_id: template_id.into(),
            company_id,
            cert_type,
            name: name.into(),
            title: title.into(),
            fields,
            footer: None,
            include_photos: true,
            active: true,
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for PdfTemplateRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.template_id.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "pdf_template.template_id",
                reason: "must not be empty",
            });
        }
        if self.title.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "pdf_template.title",
                reason: "must not be empty",
            });
        }
        if self.fields.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "pdf_template.fields",
                reason: "must be <= 256 entries",
            });
        }
        if self.fields.iter().any(|f| f.key.trim().is_empty()) {
            return Err(ContractViolation::InvalidValue {
                field: "pdf_template.fields.key",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecordInput {
    pub company_id: CompanyId,
    pub certificate_id: CertificateId,
    pub revision: u32,
    pub pdf_key: String,
    pub pdf_checksum: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub document_id: u64,
    pub company_id: CompanyId,
    pub certificate_id: CertificateId,
    pub revision: u32,
    pub pdf_key: String,
    pub pdf_checksum: String,
    pub created_at: Timestamp,
}

/// Fields written when a certificate flips to issued.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCertificateUpdate {
    pub expected_revision: u32,
    pub revision: u32,
    pub issued_at: Timestamp,
    pub outcome: OutcomeValue,
    pub outcome_reason: String,
    pub verification_token: String,
}

#[derive(Debug, Clone, Default)]
struct CertificateRows {
    observations: Vec<Observation>,
    checklists: Vec<ChecklistItem>,
    signatures: Vec<SignatureRecord>,
    attachments: Vec<Attachment>,
    test_results: Vec<TestResult>,
}

/// In-memory certificate store. Every lookup is scoped by company; a row owned by
/// another company reads as absent.
#[derive(Debug, Clone)]
pub struct CertStore {
    certificates: BTreeMap<CertificateId, Certificate>,
    rows: BTreeMap<CertificateId, CertificateRows>,
    jobs: BTreeMap<(CompanyId, JobId), JobRecord>,
    tenant_settings: BTreeMap<CompanyId, TenantSettings>,
    pdf_templates: BTreeMap<String, PdfTemplateRecord>,

    // Append-only; unique per (certificate, revision).
    revisions: BTreeMap<(CertificateId, u32), CertificateRevision>,
    verification_index: BTreeMap<String, CertificateId>,

    documents: Vec<DocumentRecord>,
    next_document_id: u64,

    audit_events: Vec<CertAuditEvent>,
    next_audit_event_id: u64,
}

impl Default for CertStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl CertStore {
    pub fn new_in_memory() -> Self {
        Self {
            certificates: BTreeMap::new(),
            rows: BTreeMap::new(),
            jobs: BTreeMap::new(),
            tenant_settings: BTreeMap::new(),
            pdf_templates: BTreeMap::new(),
            revisions: BTreeMap::new(),
            verification_index: BTreeMap::new(),
            documents: Vec::new(),
            next_document_id: 1,
            audit_events: Vec::new(),
            next_audit_event_id: 1,
        }
    }

    /// Runs `f` as one unit of work: on `Err` every write made inside it is undone.
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut CertStore) -> Result<T, E>,
    ) -> Result<T, E> {
        let checkpoint = self.clone();
        let out = f(self);
        if out.is_err() {
            *self = checkpoint;
            tracing::debug!("certificate store transaction rolled back");
        }
        out
    }

    // Jobs, tenant settings, templates.

    pub fn insert_job(&mut self, record: JobRecord) -> Result<(), StorageError> {
        record.job_id.validate()?;
        let key = (record.company_id.clone(), record.job_id.clone());
        if self.jobs.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                table: "jobs",
                key: record.job_id.as_str().to_string(),
            });
        }
        self.jobs.insert(key, record);
        Ok(())
    }

    pub fn job(&self, company_id: &CompanyId, job_id: &JobId) -> Option<&JobRecord> {
        self.jobs.get(&(company_id.clone(), job_id.clone()))
    }

    pub fn set_job_status(
        &mut self,
        company_id: &CompanyId,
        job_id: &JobId,
        status: JobStatus,
    ) -> Result<(), StorageError> {
        let job = self
            .jobs
            .get_mut(&(company_id.clone(), job_id.clone()))
            .ok_or_else(|| StorageError::NotFound {
                table: "jobs",
                key: job_id.as_str().to_string(),
            })?;
        job.status = status;
        Ok(())
    }

    pub fn set_tenant_settings(&mut self, company_id: CompanyId, settings: TenantSettings) {
        self.tenant_settings.insert(company_id, settings);
    }

    pub fn tenant_settings(&self, company_id: &CompanyId) -> TenantSettings {
        self.tenant_settings
            .get(company_id)
            .copied()
            .unwrap_or_else(TenantSettings::mvp_v1)
    }

    /// Inserting an active template deactivates the company's previous one for that type.
    pub fn insert_pdf_template(&mut self, record: PdfTemplateRecord) -> Result<(), StorageError> {
        record.validate()?;
        if self.pdf_templates.contains_key(&record.template_id) {
            return Err(StorageError::DuplicateKey {
                table: "pdf_templates",
                key: record.template_id.clone(),
            });
        }
        if record.active {
            for t in self.pdf_templates.values_mut() {
                if t.company_id == record.company_id && t.cert_type == record.cert_type {
                    t.active = false;
                }
            }
        }
        self.pdf_templates
            .insert(record.template_id.clone(), record);
        Ok(())
    }

    pub fn active_pdf_template(
        &self,
        company_id: &CompanyId,
        cert_type: CertType,
    ) -> Option<&PdfTemplateRecord> {
        self.pdf_templates
            .values()
            .find(|t| t.active && &t.company_id == company_id && t.cert_type == cert_type)
    }

    // Certificates.

    pub fn insert_certificate(&mut self, certificate: Certificate) -> Result<(), StorageError> {
        certificate.validate()?;
        if self.certificates.contains_key(&certificate.id) {
            return Err(StorageError::DuplicateKey {
                table: "certificates",
                key: certificate.id.as_str().to_string(),
            });
        }
        if let Some(job_id) = &certificate.job_id {
            if self.job(&certificate.company_id, job_id).is_none() {
                return Err(StorageError::ForeignKeyViolation {
                    table: "certificates.job_id",
                    key: job_id.as_str().to_string(),
                });
            }
        }
        if let Some(original) = &certificate.amends_certificate_id {
            if self.certificate(&certificate.company_id, original).is_none() {
                return Err(StorageError::ForeignKeyViolation {
                    table: "certificates.amends_certificate_id",
                    key: original.as_str().to_string(),
                });
            }
        }
        if let Some(token) = &certificate.verification_token {
            if self.verification_index.contains_key(token) {
                return Err(StorageError::DuplicateKey {
                    table: "certificates.verification_token",
                    key: token.clone(),
                });
            }
            self.verification_index
                .insert(token.clone(), certificate.id.clone());
        }
        self.rows
            .insert(certificate.id.clone(), CertificateRows::default());
        self.certificates
            .insert(certificate.id.clone(), certificate);
        Ok(())
    }

    pub fn certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<&Certificate> {
        self.certificates
            .get(certificate_id)
            .filter(|c| &c.company_id == company_id)
    }

    pub fn certificates_for_company(&self, company_id: &CompanyId) -> Vec<&Certificate> {
        self.certificates
            .values()
            .filter(|c| &c.company_id == company_id)
            .collect()
    }

    fn certificate_mut(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Result<&mut Certificate, StorageError> {
        self.certificates
            .get_mut(certificate_id)
            .filter(|c| &c.company_id == company_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "certificates",
                key: certificate_id.as_str().to_string(),
            })
    }

    /// Compare-and-set on status.
    pub fn transition_certificate_status(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        expected: CertificateStatus,
        to: CertificateStatus,
    ) -> Result<(), StorageError> {
        let cert = self.certificate_mut(company_id, certificate_id)?;
        if cert.status != expected {
            return Err(StorageError::StaleRevision {
                table: "certificates.status",
                key: certificate_id.as_str().to_string(),
            });
        }
        cert.status = to;
        Ok(())
    }

    pub fn set_certificate_outcome(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        outcome: OutcomeValue,
        reason: impl Into<String>,
    ) -> Result<(), StorageError> {
        let cert = self.certificate_mut(company_id, certificate_id)?;
        cert.outcome = Some(outcome);
        cert.outcome_reason = Some(reason.into());
        Ok(())
    }

    /// Flips a completed certificate to issued. Fails with `StaleRevision` when another
    /// writer issued or moved it after `update.expected_revision` was read.
    pub fn mark_certificate_issued(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        update: IssuedCertificateUpdate,
    ) -> Result<(), StorageError> {
        let key = certificate_id.as_str().to_string();
        if let Some(owner) = self.verification_index.get(&update.verification_token) {
            if owner != certificate_id {
                return Err(StorageError::DuplicateKey {
                    table: "certificates.verification_token",
                    key: update.verification_token,
                });
            }
        }
        let cert = self.certificate_mut(company_id, certificate_id)?;
        if cert.status != CertificateStatus::Completed
            || cert.current_revision != update.expected_revision
        {
            return Err(StorageError::StaleRevision {
                table: "certificates.current_revision",
                key,
            });
        }
        if update.revision != update.expected_revision + 1 {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "certificate.current_revision",
                    reason: "must advance by exactly one",
                },
            ));
        }
        let mut next = cert.clone();
        next.status = CertificateStatus::Issued;
        next.current_revision = update.revision;
        next.issued_at = Some(update.issued_at);
        next.outcome = Some(update.outcome);
        next.outcome_reason = Some(update.outcome_reason);
        let previous_token = next.verification_token.replace(update.verification_token.clone());
        next.validate()?;
        *cert = next;

        if let Some(old) = previous_token {
            if old != update.verification_token {
                self.verification_index.remove(&old);
            }
        }
        self.verification_index
            .insert(update.verification_token, certificate_id.clone());
        Ok(())
    }

    /// Current in-progress (draft or completed) amendment of `original_id`, if any.
    pub fn in_progress_amendment(
        &self,
        company_id: &CompanyId,
        original_id: &CertificateId,
    ) -> Option<&Certificate> {
        self.certificates.values().find(|c| {
            &c.company_id == company_id
                && c.amends_certificate_id.as_ref() == Some(original_id)
                && c.status.is_in_progress()
        })
    }

    pub fn find_by_verification_token(&self, token: &str) -> Option<&Certificate> {
        self.verification_index
            .get(token)
            .and_then(|id| self.certificates.get(id))
    }

    pub fn load_aggregate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Option<CertificateAggregate> {
        let certificate = self.certificate(company_id, certificate_id)?.clone();
        let rows = self.rows.get(certificate_id).cloned().unwrap_or_default();
        Some(CertificateAggregate {
            certificate,
            observations: rows.observations,
            checklists: rows.checklists,
            signatures: rows.signatures,
            attachments: rows.attachments,
            test_results: rows.test_results,
        })
    }

    // Certificate child rows. Writable only while the certificate is in progress.

    fn rows_mut(
        &mut self,
        table: &'static str,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Result<&mut CertificateRows, StorageError> {
        let Some(cert) = self.certificate(company_id, certificate_id) else {
            return Err(StorageError::ForeignKeyViolation {
                table,
                key: certificate_id.as_str().to_string(),
            });
        };
        if !cert.status.is_in_progress() {
            return Err(StorageError::AppendOnlyViolation { table });
        }
        Ok(self.rows.entry(certificate_id.clone()).or_default())
    }

    pub fn insert_observation(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: Observation,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("observations", company_id, certificate_id)?;
        if rows.observations.iter().any(|o| o.id == row.id) {
            return Err(StorageError::DuplicateKey {
                table: "observations",
                key: row.id,
            });
        }
        rows.observations.push(row);
        Ok(())
    }

    pub fn resolve_observation(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        observation_id: &str,
        resolved_at: Timestamp,
    ) -> Result<(), StorageError> {
        let rows = self.rows_mut("observations", company_id, certificate_id)?;
        let obs = rows
            .observations
            .iter_mut()
            .find(|o| o.id == observation_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "observations",
                key: observation_id.to_string(),
            })?;
        let mut next = obs.clone();
        next.resolved_at = Some(resolved_at);
        next.validate()?;
        *obs = next;
        Ok(())
    }

    pub fn insert_checklist_item(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: ChecklistItem,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("checklists", company_id, certificate_id)?;
        if rows.checklists.iter().any(|c| c.id == row.id) {
            return Err(StorageError::DuplicateKey {
                table: "checklists",
                key: row.id,
            });
        }
        rows.checklists.push(row);
        Ok(())
    }

    pub fn insert_signature(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: SignatureRecord,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("signatures", company_id, certificate_id)?;
        if rows.signatures.iter().any(|s| s.id == row.id) {
            return Err(StorageError::DuplicateKey {
                table: "signatures",
                key: row.id,
            });
        }
        rows.signatures.push(row);
        Ok(())
    }

    /// Replaces the signature row with the same id.
    pub fn update_signature(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: SignatureRecord,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("signatures", company_id, certificate_id)?;
        let slot = rows
            .signatures
            .iter_mut()
            .find(|s| s.id == row.id)
            .ok_or_else(|| StorageError::NotFound {
                table: "signatures",
                key: row.id.clone(),
            })?;
        *slot = row;
        Ok(())
    }

    pub fn insert_attachment(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: Attachment,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("attachments", company_id, certificate_id)?;
        if rows.attachments.iter().any(|a| a.id == row.id) {
            return Err(StorageError::DuplicateKey {
                table: "attachments",
                key: row.id,
            });
        }
        rows.attachments.push(row);
        Ok(())
    }

    pub fn insert_test_result(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        row: TestResult,
    ) -> Result<(), StorageError> {
        row.validate()?;
        let rows = self.rows_mut("test_results", company_id, certificate_id)?;
        if rows.test_results.iter().any(|t| t.id == row.id) {
            return Err(StorageError::DuplicateKey {
                table: "test_results",
                key: row.id,
            });
        }
        rows.test_results.push(row);
        Ok(())
    }

    // Revisions (append-only).

    pub fn append_revision(&mut self, revision: CertificateRevision) -> Result<(), StorageError> {
        revision.validate()?;
        if self
            .certificate(&revision.company_id, &revision.certificate_id)
            .is_none()
        {
            return Err(StorageError::ForeignKeyViolation {
                table: "certificate_revisions",
                key: revision.certificate_id.as_str().to_string(),
            });
        }
        let key = (revision.certificate_id.clone(), revision.revision);
        if self.revisions.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                table: "certificate_revisions",
                key: format!("{}#{}", revision.certificate_id, revision.revision),
            });
        }
        self.revisions.insert(key, revision);
        Ok(())
    }

    pub fn revision(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
    ) -> Option<&CertificateRevision> {
        self.revisions
            .get(&(certificate_id.clone(), revision))
            .filter(|r| &r.company_id == company_id)
    }

    pub fn revisions_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertificateRevision> {
        self.revisions
            .range((certificate_id.clone(), 0)..=(certificate_id.clone(), u32::MAX))
            .map(|(_, r)| r)
            .filter(|r| &r.company_id == company_id)
            .collect()
    }

    /// The one permitted revision mutation: filling in a document key that was never written.
    pub fn backfill_revision_pdf(
        &mut self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
        pdf_key: String,
        pdf_checksum: String,
    ) -> Result<(), StorageError> {
        let row = self
            .revisions
            .get_mut(&(certificate_id.clone(), revision))
            .filter(|r| &r.company_id == company_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "certificate_revisions",
                key: format!("{certificate_id}#{revision}"),
            })?;
        if row.pdf_key.is_some() {
            return Err(StorageError::AppendOnlyViolation {
                table: "certificate_revisions",
            });
        }
        if !is_sha256_hex(&pdf_checksum) {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "certificate_revision.pdf_checksum",
                    reason: "must be lowercase hex sha256 (64 chars)",
                },
            ));
        }
        row.pdf_key = Some(pdf_key);
        row.pdf_checksum = Some(pdf_checksum);
        Ok(())
    }

    pub fn attempt_overwrite_revision(
        &mut self,
        _certificate_id: &CertificateId,
        _revision: u32,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "certificate_revisions",
        })
    }

    // Documents.

    pub fn register_document(&mut self, input: DocumentRecordInput) -> Result<u64, StorageError> {
        if self
            .revision(&input.company_id, &input.certificate_id, input.revision)
            .is_none()
        {
            return Err(StorageError::ForeignKeyViolation {
                table: "documents",
                key: format!("{}#{}", input.certificate_id, input.revision),
            });
        }
        if self.documents.iter().any(|d| {
            d.certificate_id == input.certificate_id
                && d.revision == input.revision
                && d.pdf_key == input.pdf_key
        }) {
            return Err(StorageError::DuplicateKey {
                table: "documents",
                key: input.pdf_key,
            });
        }
        let document_id = self.next_document_id;
        self.next_document_id = self.next_document_id.saturating_add(1);
        self.documents.push(DocumentRecord {
            document_id,
            company_id: input.company_id,
            certificate_id: input.certificate_id,
            revision: input.revision,
            pdf_key: input.pdf_key,
            pdf_checksum: input.pdf_checksum,
            created_at: input.created_at,
        });
        Ok(document_id)
    }

    pub fn documents_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&DocumentRecord> {
        self.documents
            .iter()
            .filter(|d| &d.company_id == company_id && &d.certificate_id == certificate_id)
            .collect()
    }

    // Audit (append-only).

    pub fn append_audit_event(
        &mut self,
        input: CertAuditEventInput,
    ) -> Result<AuditEventId, StorageError> {
        input.validate()?;
        if self
            .certificate(&input.company_id, &input.certificate_id)
            .is_none()
        {
            return Err(StorageError::ForeignKeyViolation {
                table: "certificate_audit_events",
                key: input.certificate_id.as_str().to_string(),
            });
        }
        let event_id = AuditEventId(self.next_audit_event_id);
        self.next_audit_event_id = self.next_audit_event_id.saturating_add(1);
        let ev = CertAuditEvent::from_input_v1(event_id, input)?;
        self.audit_events.push(ev);
        Ok(event_id)
    }

    pub fn audit_events(&self) -> &[CertAuditEvent] {
        &self.audit_events
    }

    pub fn audit_events_for_certificate(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
    ) -> Vec<&CertAuditEvent> {
        self.audit_events
            .iter()
            .filter(|e| &e.company_id == company_id && &e.certificate_id == certificate_id)
            .collect()
    }

    pub fn attempt_overwrite_audit_event(
        &mut self,
        _event_id: AuditEventId,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "certificate_audit_events",
        })
    }
}
