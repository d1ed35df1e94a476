#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::ids::{CertificateId, CompanyId};
use crate::{ContractViolation, Timestamp, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditEventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertAuditEventType {
    #[serde(rename = "certificate.completed")]
    Completed,
    #[serde(rename = "certificate.issued")]
    Issued,
    #[serde(rename = "certificate.amended")]
    Amended,
    #[serde(rename = "certificate.voided")]
    Voided,
    #[serde(rename = "certificate.pdf_backfilled")]
    PdfBackfilled,
}

impl CertAuditEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            CertAuditEventType::Completed => "certificate.completed",
            CertAuditEventType::Issued => "certificate.issued",
            CertAuditEventType::Amended => "certificate.amended",
            CertAuditEventType::Voided => "certificate.voided",
            CertAuditEventType::PdfBackfilled => "certificate.pdf_backfilled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertAuditEventInput {
    pub company_id: CompanyId,
    pub certificate_id: CertificateId,
    pub event_type: CertAuditEventType,
    pub actor: String,
    pub created_at: Timestamp,
    pub detail: BTreeMap<String, String>,
}

impl CertAuditEventInput {
    pub fn v1(
        company_id: CompanyId,
        certificate_id: CertificateId,
        event_type: CertAuditEventType,
        actor: impl Into<String>,
        created_at: Timestamp,
        detail: BTreeMap<String, String>,
    ) -> Result<Self, ContractViolation> {
        let e = Self {
            company_id,
            certificate_id,
            event_type,
            actor: actor.into(),
            created_at,
            detail,
        };
        e.validate()?;
        Ok(e)
    }
}

impl Validate for CertAuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.company_id.validate()?;
        self.certificate_id.validate()?;
        validate_text("cert_audit_event.actor", &self.actor, 256)?;
        if self.detail.len() > 32 {
            return Err(ContractViolation::InvalidValue {
                field: "cert_audit_event.detail",
                reason: "must be <= 32 entries",
            });
        }
        for (k, v) in &self.detail {
            validate_text("cert_audit_event.detail.key", k, 64)?;
            if v.len() > 1024 {
                return Err(ContractViolation::InvalidValue {
                    field: "cert_audit_event.detail.value",
                    reason: "must be <= 1024 chars",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertAuditEvent {
    pub event_id: AuditEventId,
    pub company_id: CompanyId,
    pub certificate_id: CertificateId,
    pub event_type: CertAuditEventType,
    pub actor: String,
    pub created_at: Timestamp,
    pub detail: BTreeMap<String, String>,
}

impl CertAuditEvent {
    pub fn from_input_v1(
        event_id: AuditEventId,
        input: CertAuditEventInput,
    ) -> Result<Self, ContractViolation> {
        if event_id.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "cert_audit_event.event_id",
                reason: "must be > 0",
            });
        }
        input.validate()?;
        Ok(Self {
            event_id,
            company_id: input.company_id,
            certificate_id: input.certificate_id,
            event_type: input.event_type,
            actor: input.actor,
            created_at: input.created_at,
            detail: input.detail,
        })
    }
}
