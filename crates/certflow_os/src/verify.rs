#![forbid(unsafe_code)]

use certflow_kernel_contracts::cert_type::CertType;
use certflow_kernel_contracts::certificate::CertificateStatus;
use certflow_kernel_contracts::outcome::OutcomeValue;
use certflow_kernel_contracts::Timestamp;
use certflow_storage::cert_store::CertStore;
use certflow_storage::repo::{CertificateRepo, RevisionRepo};

/// What the public verification page may show. Carries no tenant, payload or party data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicVerification {
    pub certificate_number: String,
    pub cert_type: CertType,
    pub status: CertificateStatus,
    pub revision: u32,
    pub signing_hash: Option<String>,
    pub issued_at: Option<Timestamp>,
    pub outcome: Option<OutcomeValue>,
    /// True when a later amendment has been issued in place of this certificate.
    pub superseded: bool,
}

/// Looks up a certificate by its public verification token. Deliberately unscoped: the
/// token is the capability.
pub fn verify_by_token(store: &CertStore, token: &str) -> Option<PublicVerification> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    let cert = store.certificate_row_by_verification_token(token)?;
    let signing_hash = store
        .revision_row(&cert.company_id, &cert.id, cert.current_revision)
        .map(|r| r.signing_hash.clone());
    let superseded = store
        .certificates_for_company(&cert.company_id)
        .into_iter()
        .any(|c| {
            c.amends_certificate_id.as_ref() == Some(&cert.id)
                && c.status == CertificateStatus::Issued
        });
    tracing::debug!(
        certificate_id = %cert.id,
        revision = cert.current_revision,
        superseded,
        "verification lookup"
    );
    Some(PublicVerification {
        certificate_number: cert.certificate_number.clone(),
        cert_type: cert.cert_type,
        status: cert.status,
        revision: cert.current_revision,
        signing_hash,
        issued_at: cert.issued_at,
        outcome: cert.outcome,
        superseded,
    })
}
