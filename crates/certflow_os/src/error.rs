#![forbid(unsafe_code)]

use certflow_kernel_contracts::{ContractViolation, ReasonCodeId};
use certflow_storage::blob::BlobError;
use certflow_storage::cert_store::StorageError;
use thiserror::Error;

use crate::pdf::RenderError;

pub mod reason_codes {
    use certflow_kernel_contracts::ReasonCodeId;

    // Certificate lifecycle reason-code namespace.
    pub const CERT_OK_COMPLETED: ReasonCodeId = ReasonCodeId(0x4345_0001);
    pub const CERT_OK_ISSUED: ReasonCodeId = ReasonCodeId(0x4345_0002);
    pub const CERT_OK_AMENDED: ReasonCodeId = ReasonCodeId(0x4345_0003);
    pub const CERT_OK_VOIDED: ReasonCodeId = ReasonCodeId(0x4345_0004);
    pub const CERT_OK_PDF_BACKFILLED: ReasonCodeId = ReasonCodeId(0x4345_0005);
    pub const CERT_REFUSE_NOT_FOUND: ReasonCodeId = ReasonCodeId(0x4345_00F1);
    pub const CERT_REFUSE_NOT_COMPLETED: ReasonCodeId = ReasonCodeId(0x4345_00F2);
    pub const CERT_REFUSE_ALREADY_ISSUED: ReasonCodeId = ReasonCodeId(0x4345_00F3);
    pub const CERT_REFUSE_NOT_ISSUED: ReasonCodeId = ReasonCodeId(0x4345_00F4);
    pub const CERT_REFUSE_AMENDMENT_IN_PROGRESS: ReasonCodeId = ReasonCodeId(0x4345_00F5);
    pub const CERT_REFUSE_NOT_DRAFT: ReasonCodeId = ReasonCodeId(0x4345_00F6);
    pub const CERT_REFUSE_ALREADY_VOID: ReasonCodeId = ReasonCodeId(0x4345_00F7);
    pub const CERT_REFUSE_PDF_ALREADY_STORED: ReasonCodeId = ReasonCodeId(0x4345_00F8);
    pub const CERT_REFUSE_LIMIT_EXCEEDED: ReasonCodeId = ReasonCodeId(0x4345_00F9);
    pub const CERT_REFUSE_CONCURRENT_WRITE: ReasonCodeId = ReasonCodeId(0x4345_00FA);
    pub const CERT_INTERNAL_ERROR: ReasonCodeId = ReasonCodeId(0x4345_00FF);
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("certificate {certificate_id} not found")]
    NotFound { certificate_id: String },

    #[error("revision {revision} of certificate {certificate_id} not found")]
    RevisionNotFound {
        certificate_id: String,
        revision: u32,
    },

    /// The certificate is in the wrong state for the requested operation.
    #[error("{message}")]
    InvalidTransition {
        message: String,
        reason_code: ReasonCodeId,
    },

    #[error("{message}")]
    Conflict {
        message: String,
        reason_code: ReasonCodeId,
    },

    #[error("certificate {field} count {got} exceeds the limit of {max}")]
    LimitExceeded {
        field: &'static str,
        got: usize,
        max: usize,
    },

    #[error("document rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("signing hash computation failed: {0}")]
    Hash(#[from] serde_json::Error),

    #[error("document storage failed: {0}")]
    Blob(#[from] BlobError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for IssuanceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::StaleRevision { table, key } => IssuanceError::Conflict {
                message: format!("{key} was modified concurrently ({table}); reload and retry"),
                reason_code: reason_codes::CERT_REFUSE_CONCURRENT_WRITE,
            },
            other => IssuanceError::Storage(other),
        }
    }
}

impl From<ContractViolation> for IssuanceError {
    fn from(v: ContractViolation) -> Self {
        IssuanceError::Storage(StorageError::ContractViolation(v))
    }
}

impl IssuanceError {
    pub(crate) fn not_found(certificate_id: impl std::fmt::Display) -> Self {
        IssuanceError::NotFound {
            certificate_id: certificate_id.to_string(),
        }
    }

    pub(crate) fn invalid_transition(message: String, reason_code: ReasonCodeId) -> Self {
        IssuanceError::InvalidTransition {
            message,
            reason_code,
        }
    }

    /// Transport status an API layer should answer with.
    pub fn status_hint(&self) -> u16 {
        match self {
            IssuanceError::NotFound { .. } | IssuanceError::RevisionNotFound { .. } => 404,
            IssuanceError::InvalidTransition { .. } | IssuanceError::LimitExceeded { .. } => 400,
            IssuanceError::Conflict { .. } => 409,
            IssuanceError::Storage(StorageError::DuplicateKey { .. }) => 409,
            IssuanceError::Storage(StorageError::ContractViolation(_)) => 400,
            IssuanceError::Storage(_)
            | IssuanceError::Render(_)
            | IssuanceError::Hash(_)
            | IssuanceError::Blob(_) => 500,
        }
    }

    pub fn reason_code(&self) -> ReasonCodeId {
        match self {
            IssuanceError::NotFound { .. } | IssuanceError::RevisionNotFound { .. } => {
                reason_codes::CERT_REFUSE_NOT_FOUND
            }
            IssuanceError::InvalidTransition { reason_code, .. }
            | IssuanceError::Conflict { reason_code, .. } => *reason_code,
            IssuanceError::LimitExceeded { .. } => reason_codes::CERT_REFUSE_LIMIT_EXCEEDED,
            IssuanceError::Storage(StorageError::DuplicateKey { .. }) => {
                reason_codes::CERT_REFUSE_CONCURRENT_WRITE
            }
            IssuanceError::Storage(_)
            | IssuanceError::Render(_)
            | IssuanceError::Hash(_)
            | IssuanceError::Blob(_) => reason_codes::CERT_INTERNAL_ERROR,
        }
    }
}
