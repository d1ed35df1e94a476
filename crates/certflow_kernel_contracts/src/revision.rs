#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::ids::{CertificateId, CompanyId};
use crate::snapshot::CanonicalCertSnapshot;
use crate::{ContractViolation, Timestamp, Validate};

/// Immutable record of one issuance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRevision {
    pub certificate_id: CertificateId,
    pub company_id: CompanyId,
    pub revision: u32,
    pub signing_hash: String,
    pub content: CanonicalCertSnapshot,
    pub pdf_key: Option<String>,
    pub pdf_checksum: Option<String>,
    pub issued_at: Timestamp,
    pub issued_by: String,
}

impl CertificateRevision {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        certificate_id: CertificateId,
        company_id: CompanyId,
        revision: u32,
        signing_hash: String,
        content: CanonicalCertSnapshot,
        pdf_checksum: Option<String>,
        issued_at: Timestamp,
        issued_by: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            certificate_id,
            company_id,
            revision,
            signing_hash,
            content,
            pdf_key: None,
            pdf_checksum,
            issued_at,
            issued_by: issued_by.into(),
        };
        r.validate()?;
        Ok(r)
    }
}

pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl Validate for CertificateRevision {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.certificate_id.validate()?;
        self.company_id.validate()?;
        if self.revision == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "certificate_revision.revision",
                reason: "must be > 0",
            });
        }
        if !is_sha256_hex(&self.signing_hash) {
            return Err(ContractViolation::InvalidValue {
                field: "certificate_revision.signing_hash",
                reason: "must be lowercase hex sha256 (64 chars)",
            });
        }
        if let Some(checksum) = &self.pdf_checksum {
            if !is_sha256_hex(checksum) {
                return Err(ContractViolation::InvalidValue {
                    field: "certificate_revision.pdf_checksum",
                    reason: "must be lowercase hex sha256 (64 chars)",
                });
            }
        }
        if let Some(key) = &self.pdf_key {
            validate_text("certificate_revision.pdf_key", key, 512)?;
        }
        validate_text("certificate_revision.issued_by", &self.issued_by, 256)?;
        if self.content.certificate.id != self.certificate_id.as_str() {
            return Err(ContractViolation::InvalidValue {
                field: "certificate_revision.content",
                reason: "snapshot must describe the revision's certificate",
            });
        }
        Ok(())
    }
}
