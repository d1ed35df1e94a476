#![forbid(unsafe_code)]

pub mod amendment;
pub mod env;
pub mod error;
pub mod issuance;
pub mod lifecycle;
pub mod pdf;
pub mod runtime;
pub mod verify;

pub use amendment::AmendmentCreated;
pub use env::{IssuanceEnv, SystemIssuanceEnv};
pub use error::{reason_codes, IssuanceError};
pub use issuance::{IssuedRevision, PdfIntegrity, RegeneratedPdf, RevisionAudit};
pub use lifecycle::CompletionDecision;
pub use runtime::{CertificateRequest, CertificateRuntime, IssuanceConfig};
pub use verify::{verify_by_token, PublicVerification};
