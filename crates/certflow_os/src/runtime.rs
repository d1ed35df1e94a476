#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use certflow_kernel_contracts::audit::{CertAuditEventInput, CertAuditEventType};
use certflow_kernel_contracts::cert_type::CertType;
use certflow_kernel_contracts::ids::{CertificateId, CompanyId};
use certflow_kernel_contracts::snapshot::CanonicalCertSnapshot;
use certflow_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};
use certflow_storage::blob::BlobStorage;
use certflow_storage::cert_store::CertStore;
use certflow_storage::repo::TenantRepo;

use crate::env::IssuanceEnv;
use crate::error::IssuanceError;
use crate::pdf::{CertPdfRenderer, FallbackPdfRenderer, TemplatePdfRenderer};

const MAX_AUDIT_DETAIL_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceConfig {
    /// Leading segment of every stored document key.
    pub pdf_key_prefix: String,
    pub register_documents: bool,
    pub max_observations: usize,
    pub max_test_results: usize,
}

impl IssuanceConfig {
    pub fn mvp_v1() -> Self {
        Self {
            pdf_key_prefix: "certificates".to_string(),
            register_documents: true,
            max_observations: 2048,
            max_test_results: 4096,
        }
    }

    /// `mvp_v1` overlaid with `CERTFLOW_PDF_KEY_PREFIX` and `CERTFLOW_REGISTER_DOCUMENTS`.
    pub fn from_env() -> Self {
        Self::mvp_v1().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(prefix) = lookup("CERTFLOW_PDF_KEY_PREFIX") {
            self.pdf_key_prefix = prefix.trim().trim_matches('/').to_string();
        }
        if let Some(raw) = lookup("CERTFLOW_REGISTER_DOCUMENTS") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.register_documents = true,
                "0" | "false" | "no" | "off" => self.register_documents = false,
                other => tracing::warn!(
                    value = other,
                    "ignoring unrecognised CERTFLOW_REGISTER_DOCUMENTS"
                ),
            }
        }
        self
    }

    pub fn pdf_key(
        &self,
        company_id: &CompanyId,
        certificate_id: &CertificateId,
        revision: u32,
    ) -> String {
        let tail = format!("{company_id}/{certificate_id}/r{revision}.pdf");
        if self.pdf_key_prefix.is_empty() {
            tail
        } else {
            format!("{}/{tail}", self.pdf_key_prefix)
        }
    }
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

/// Tenant-scoped operation on one certificate, attributed to `actor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub company_id: CompanyId,
    pub certificate_id: CertificateId,
    pub actor: String,
}

impl CertificateRequest {
    pub fn v1(
        company_id: CompanyId,
        certificate_id: CertificateId,
        actor: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            company_id,
            certificate_id,
            actor: actor.into(),
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for CertificateRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.company_id.validate()?;
        self.certificate_id.validate()?;
        if self.actor.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "certificate_request.actor",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

/// Certificate lifecycle orchestrator. Holds no certificate state; every call operates on the
/// store it is handed.
#[derive(Clone)]
pub struct CertificateRuntime {
    pub(crate) config: IssuanceConfig,
    pub(crate) blobs: Arc<dyn BlobStorage>,
    pub(crate) env: Arc<dyn IssuanceEnv>,
}

impl std::fmt::Debug for CertificateRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CertificateRuntime {
    pub fn new(
        config: IssuanceConfig,
        blobs: Arc<dyn BlobStorage>,
        env: Arc<dyn IssuanceEnv>,
    ) -> Self {
        Self { config, blobs, env }
    }

    pub fn config(&self) -> &IssuanceConfig {
        &self.config
    }

    /// The company's active template for the snapshot's type when it applies, else the
    /// fixed layout.
    pub(crate) fn render_pdf(
        &self,
        store: &CertStore,
        company_id: &CompanyId,
        snapshot: &CanonicalCertSnapshot,
    ) -> Result<Vec<u8>, IssuanceError> {
        let template = CertType::parse(&snapshot.certificate.cert_type)
            .and_then(|t| store.active_pdf_template_row(company_id, t));
        if let Some(template) = template {
            match TemplatePdfRenderer::new(template).render(snapshot) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => tracing::warn!(
                    certificate_id = %snapshot.certificate.id,
                    template_id = %template.template_id,
                    error = %e,
                    "template render failed; using fallback layout"
                ),
            }
        }
        Ok(FallbackPdfRenderer.render(snapshot)?)
    }

    pub(crate) fn audit_input(
        &self,
        req: &CertificateRequest,
        event_type: CertAuditEventType,
        reason_code: ReasonCodeId,
        detail: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Result<CertAuditEventInput, ContractViolation> {
        let mut map: BTreeMap<String, String> = detail
            .into_iter()
            .map(|(k, v)| (k.to_string(), clamp_detail(v)))
            .collect();
        map.insert("reason_code".to_string(), format!("0x{:08X}", reason_code.0));
        CertAuditEventInput::v1(
            req.company_id.clone(),
            req.certificate_id.clone(),
            event_type,
            req.actor.clone(),
            self.env.now(),
            map,
        )
    }
}

fn clamp_detail(value: String) -> String {
    if value.chars().count() <= MAX_AUDIT_DETAIL_CHARS {
        value
    } else {
        value.chars().take(MAX_AUDIT_DETAIL_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_runtime_01_config_overrides_from_lookup() {
        let vars: BTreeMap<&str, &str> = [
            ("CERTFLOW_PDF_KEY_PREFIX", "/docs/certs/"),
            ("CERTFLOW_REGISTER_DOCUMENTS", "off"),
        ]
        .into_iter()
        .collect();
        let c = IssuanceConfig::mvp_v1().with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.pdf_key_prefix, "docs/certs");
        assert!(!c.register_documents);

        let key = c.pdf_key(
            &CompanyId::new("co_1").unwrap(),
            &CertificateId::new("cert_1").unwrap(),
            3,
        );
        assert_eq!(key, "docs/certs/co_1/cert_1/r3.pdf");
    }

    #[test]
    fn at_runtime_02_unknown_flag_keeps_default_and_empty_prefix_is_bare() {
        let c = IssuanceConfig::mvp_v1().with_overrides(|k| match k {
            "CERTFLOW_REGISTER_DOCUMENTS" => Some("maybe".to_string()),
            "CERTFLOW_PDF_KEY_PREFIX" => Some("  ".to_string()),
            _ => None,
        });
        assert!(c.register_documents);
        assert_eq!(
            c.pdf_key(
                &CompanyId::new("co_1").unwrap(),
                &CertificateId::new("cert_1").unwrap(),
                1
            ),
            "co_1/cert_1/r1.pdf"
        );
    }

    #[test]
    fn at_runtime_03_request_requires_actor() {
        assert!(CertificateRequest::v1(
            CompanyId::new("co_1").unwrap(),
            CertificateId::new("cert_1").unwrap(),
            "  "
        )
        .is_err());
    }

    #[test]
    fn at_runtime_04_long_audit_detail_is_clamped() {
        let long = "x".repeat(MAX_AUDIT_DETAIL_CHARS + 10);
        assert_eq!(clamp_detail(long).len(), MAX_AUDIT_DETAIL_CHARS);
        assert_eq!(clamp_detail("short".to_string()), "short");
    }
}
