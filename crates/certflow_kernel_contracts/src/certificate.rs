#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cert_type::{CertType, SignatureRole};
use crate::common::{validate_max_len, validate_opt_text, validate_text};
use crate::ids::{CertificateId, CompanyId, JobId};
use crate::outcome::OutcomeValue;
use crate::{ContractViolation, Timestamp, Validate};

/// Legacy flat payload.
pub const DATA_VERSION_LEGACY: u8 = 1;
/// Structured payload (boards, contractor details, ...).
pub const DATA_VERSION_STRUCTURED: u8 = 2;

pub const CHECKLIST_FAIL_ANSWER: &str = "fail";

pub const MAX_CERTIFICATE_NUMBER_CHARS: usize = 64;
/// Extra room an amendment number has for its `/A{n}` suffix.
pub const MAX_AMENDMENT_SUFFIX_CHARS: usize = 16;

/// `number` with every trailing `/A{n}` amendment suffix removed.
pub fn base_certificate_number(number: &str) -> &str {
    let mut base = number;
    while let Some(head) = strip_amendment_suffix(base) {
        base = head;
    }
    base
}

/// Sequence `n` when `number` is exactly `{base}/A{n}`.
pub fn amendment_sequence(number: &str, base: &str) -> Option<u32> {
    let digits = number.strip_prefix(base)?.strip_prefix("/A")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn strip_amendment_suffix(number: &str) -> Option<&str> {
    let (head, digits) = number.rsplit_once("/A")?;
    if head.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(head)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObservationCode {
    C1,
    C2,
    C3,
    Fi,
    Critical,
    Major,
    Minor,
    Info,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityClass {
    Danger,
    PotentiallyDangerous,
    Improvement,
    FurtherInvestigation,
}

impl ObservationCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "C1" => ObservationCode::C1,
            "C2" => ObservationCode::C2,
            "C3" => ObservationCode::C3,
            "FI" => ObservationCode::Fi,
            "Critical" => ObservationCode::Critical,
            "Major" => ObservationCode::Major,
            "Minor" => ObservationCode::Minor,
            "Info" => ObservationCode::Info,
            other => ObservationCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObservationCode::C1 => "C1",
            ObservationCode::C2 => "C2",
            ObservationCode::C3 => "C3",
            ObservationCode::Fi => "FI",
            ObservationCode::Critical => "Critical",
            ObservationCode::Major => "Major",
            ObservationCode::Minor => "Minor",
            ObservationCode::Info => "Info",
            ObservationCode::Other(s) => s.as_str(),
        }
    }

    pub fn severity_class(&self) -> Option<SeverityClass> {
        match self {
            ObservationCode::C1 | ObservationCode::Critical => Some(SeverityClass::Danger),
            ObservationCode::C2 | ObservationCode::Major => {
                Some(SeverityClass::PotentiallyDangerous)
            }
            ObservationCode::C3 | ObservationCode::Minor | ObservationCode::Info => {
                Some(SeverityClass::Improvement)
            }
            ObservationCode::Fi => Some(SeverityClass::FurtherInvestigation),
            ObservationCode::Other(_) => None,
        }
    }
}

impl From<String> for ObservationCode {
    fn from(s: String) -> Self {
        ObservationCode::parse(&s)
    }
}

impl From<ObservationCode> for String {
    fn from(c: ObservationCode) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for ObservationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub code: ObservationCode,
    #[serde(default)]
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub regulation: Option<String>,
    #[serde(default)]
    pub fix_guidance: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
    #[serde(default)]
    pub sort_order: i64,
    pub created_at: Timestamp,
}

impl Observation {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        id: impl Into<String>,
        code: ObservationCode,
        location: impl Into<String>,
        description: impl Into<String>,
        regulation: Option<String>,
        fix_guidance: Option<String>,
        sort_order: i64,
        created_at: Timestamp,
    ) -> Result<Self, ContractViolation> {
        let o = Self {
            id: id.into(),
            code,
            location: location.into(),
            description: description.into(),
            regulation,
            fix_guidance,
            resolved_at: None,
            sort_order,
            created_at,
        };
        o.validate()?;
        Ok(o)
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolved_at.is_none()
    }
}

impl Validate for Observation {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("observation.id", &self.id, 128)?;
        validate_text("observation.code", self.code.as_str(), 16)?;
        validate_max_len("observation.location", &self.location, 256)?;
        validate_text("observation.description", &self.description, 4096)?;
        validate_opt_text("observation.regulation", &self.regulation, 256)?;
        validate_opt_text("observation.fix_guidance", &self.fix_guidance, 4096)?;
        if let Some(resolved_at) = self.resolved_at {
            if resolved_at < self.created_at {
                return Err(ContractViolation::InvalidValue {
                    field: "observation.resolved_at",
                    reason: "must not precede created_at",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub section: String,
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl ChecklistItem {
    pub fn v1(
        id: impl Into<String>,
        section: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
        notes: Option<String>,
        sort_order: i64,
    ) -> Result<Self, ContractViolation> {
        let c = Self {
            id: id.into(),
            section: section.into(),
            question: question.into(),
            answer: answer.into(),
            notes,
            sort_order,
        };
        c.validate()?;
        Ok(c)
    }

    pub fn is_fail(&self) -> bool {
        self.answer == CHECKLIST_FAIL_ANSWER
    }
}

impl Validate for ChecklistItem {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("checklist_item.id", &self.id, 128)?;
        validate_text("checklist_item.section", &self.section, 64)?;
        validate_text("checklist_item.question", &self.question, 1024)?;
        validate_max_len("checklist_item.answer", &self.answer, 256)?;
        validate_opt_text("checklist_item.notes", &self.notes, 4096)?;
        Ok(())
    }
}

/// A signature counts only when it carries both a label and a signing instant.
pub fn signature_is_present(label: &str, signed_at: &str) -> bool {
    !label.trim().is_empty() && !signed_at.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub id: String,
    pub role: SignatureRole,
    #[serde(default)]
    pub signer_name: String,
    #[serde(default)]
    pub signer_email: Option<String>,
    #[serde(default)]
    pub signature_text: String,
    #[serde(default)]
    pub signed_at: Option<Timestamp>,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub sort_order: i64,
}

impl SignatureRecord {
    /// Unsigned placeholder for `role`.
    pub fn unsigned_v1(
        id: impl Into<String>,
        role: SignatureRole,
        signer_name: impl Into<String>,
        sort_order: i64,
    ) -> Result<Self, ContractViolation> {
        let s = Self {
            id: id.into(),
            role,
            signer_name: signer_name.into(),
            signer_email: None,
            signature_text: String::new(),
            signed_at: None,
            qualification: None,
            is_primary: false,
            sort_order,
        };
        s.validate()?;
        Ok(s)
    }

    pub fn label(&self) -> &str {
        if self.signature_text.trim().is_empty() {
            &self.signer_name
        } else {
            &self.signature_text
        }
    }

    pub fn is_present(&self) -> bool {
        let signed_at = self
            .signed_at
            .map(|t| crate::common::iso_timestamp(&t))
            .unwrap_or_default();
        signature_is_present(self.label(), &signed_at)
    }

    /// Copy carried into an amendment: same signatory, no attestation.
    pub fn cleared(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            signature_text: String::new(),
            signed_at: None,
            ..self.clone()
        }
    }
}

impl Validate for SignatureRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("signature_record.id", &self.id, 128)?;
        validate_max_len("signature_record.signer_name", &self.signer_name, 256)?;
        validate_opt_text("signature_record.signer_email", &self.signer_email, 256)?;
        validate_max_len(
            "signature_record.signature_text",
            &self.signature_text,
            65_536,
        )?;
        validate_opt_text("signature_record.qualification", &self.qualification, 256)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub file_key: String,
    pub mime_type: String,
    #[serde(default)]
    pub category: String,
    pub created_at: Timestamp,
}

impl Attachment {
    pub fn v1(
        id: impl Into<String>,
        name: impl Into<String>,
        file_key: impl Into<String>,
        mime_type: impl Into<String>,
        category: impl Into<String>,
        created_at: Timestamp,
    ) -> Result<Self, ContractViolation> {
        let a = Self {
            id: id.into(),
            name: name.into(),
            file_key: file_key.into(),
            mime_type: mime_type.into(),
            category: category.into(),
            created_at,
        };
        a.validate()?;
        Ok(a)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl Validate for Attachment {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("attachment.id", &self.id, 128)?;
        validate_text("attachment.name", &self.name, 256)?;
        validate_text("attachment.file_key", &self.file_key, 512)?;
        validate_text("attachment.mime_type", &self.mime_type, 128)?;
        validate_max_len("attachment.category", &self.category, 64)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    #[serde(default)]
    pub circuit_ref: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    pub created_at: Timestamp,
}

impl TestResult {
    pub fn v1(
        id: impl Into<String>,
        circuit_ref: Option<String>,
        data: Map<String, Value>,
        created_at: Timestamp,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            id: id.into(),
            circuit_ref,
            data,
            created_at,
        };
        t.validate()?;
        Ok(t)
    }
}

impl Validate for TestResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("test_result.id", &self.id, 128)?;
        validate_opt_text("test_result.circuit_ref", &self.circuit_ref, 64)?;
        if self.data.len() > 256 {
            return Err(ContractViolation::InvalidValue {
                field: "test_result.data",
                reason: "must be <= 256 keys",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Draft,
    Completed,
    Issued,
    Void,
}

impl CertificateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CertificateStatus::Draft => "draft",
            CertificateStatus::Completed => "completed",
            CertificateStatus::Issued => "issued",
            CertificateStatus::Void => "void",
        }
    }

    /// Editable states an amendment can sit in while it supersedes an issued original.
    pub fn is_in_progress(self) -> bool {
        matches!(self, CertificateStatus::Draft | CertificateStatus::Completed)
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub company_id: CompanyId,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(rename = "type")]
    pub cert_type: CertType,
    pub status: CertificateStatus,
    pub certificate_number: String,
    #[serde(default)]
    pub inspector_name: Option<String>,
    #[serde(default)]
    pub inspector_email: Option<String>,
    pub data_version: u8,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub outcome: Option<OutcomeValue>,
    #[serde(default)]
    pub outcome_reason: Option<String>,
    #[serde(default)]
    pub current_revision: u32,
    #[serde(default)]
    pub issued_at: Option<Timestamp>,
    #[serde(default)]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub amends_certificate_id: Option<CertificateId>,
    pub created_at: Timestamp,
}

impl Certificate {
    /// New draft certificate with no revisions.
    pub fn draft_v1(
        id: CertificateId,
        company_id: CompanyId,
        cert_type: CertType,
        certificate_number: impl Into<String>,
        data_version: u8,
        data: Value,
        created_at: Timestamp,
    ) -> Result<Self, ContractViolation> {
        let c = Self {
            id,
            company_id,
            job_id: None,
            cert_type,
            status: CertificateStatus::Draft,
            certificate_number: certificate_number.into(),
            inspector_name: None,
            inspector_email: None,
            data_version,
            data,
            outcome: None,
            outcome_reason: None,
            current_revision: 0,
            issued_at: None,
            verification_token: None,
            amends_certificate_id: None,
            created_at,
        };
        c.validate()?;
        Ok(c)
    }
}

impl Validate for Certificate {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        self.company_id.validate()?;
        if let Some(job_id) = &self.job_id {
            job_id.validate()?;
        }
        let number_limit = if self.amends_certificate_id.is_some() {
            MAX_CERTIFICATE_NUMBER_CHARS + MAX_AMENDMENT_SUFFIX_CHARS
        } else {
            MAX_CERTIFICATE_NUMBER_CHARS
        };
        validate_text(
            "certificate.certificate_number",
            &self.certificate_number,
            number_limit,
        )?;
        validate_opt_text("certificate.inspector_name", &self.inspector_name, 256)?;
        validate_opt_text("certificate.inspector_email", &self.inspector_email, 256)?;
        if !(DATA_VERSION_LEGACY..=DATA_VERSION_STRUCTURED).contains(&self.data_version) {
            return Err(ContractViolation::InvalidRange {
                field: "certificate.data_version",
                min: DATA_VERSION_LEGACY as f64,
                max: DATA_VERSION_STRUCTURED as f64,
                got: self.data_version as f64,
            });
        }
        if !(self.data.is_object() || self.data.is_null()) {
            return Err(ContractViolation::InvalidValue {
                field: "certificate.data",
                reason: "must be a JSON object",
            });
        }
        if self.status == CertificateStatus::Issued
            && (self.current_revision == 0 || self.issued_at.is_none())
        {
            return Err(ContractViolation::InvalidValue {
                field: "certificate.status",
                reason: "issued certificates must carry a revision and issued_at",
            });
        }
        if self.amends_certificate_id.as_ref() == Some(&self.id) {
            return Err(ContractViolation::InvalidValue {
                field: "certificate.amends_certificate_id",
                reason: "must not reference itself",
            });
        }
        Ok(())
    }
}

/// Certificate with every related row, as fetched for issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAggregate {
    pub certificate: Certificate,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub checklists: Vec<ChecklistItem>,
    #[serde(default)]
    pub signatures: Vec<SignatureRecord>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

impl Validate for CertificateAggregate {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.certificate.validate()?;
        for o in &self.observations {
            o.validate()?;
        }
        for c in &self.checklists {
            c.validate()?;
        }
        for s in &self.signatures {
            s.validate()?;
        }
        for a in &self.attachments {
            a.validate()?;
        }
        for t in &self.test_results {
            t.validate()?;
        }
        Ok(())
    }
}
