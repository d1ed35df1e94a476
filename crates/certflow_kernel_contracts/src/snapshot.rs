#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::outcome::RuleDetail;
use crate::SchemaVersion;

pub const CANONICAL_SNAPSHOT_VERSION: SchemaVersion = SchemaVersion(1);

/// Order-normalized certificate content that a signing hash is computed over.
///
/// Timestamps are ISO-8601 strings so the serialized form never depends on
/// a serializer's date representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCertSnapshot {
    pub snapshot_version: u32,
    pub certificate: CanonicalCertificateCore,
    pub observations: Vec<CanonicalObservation>,
    pub checklists: Vec<CanonicalChecklistItem>,
    pub signatures: Vec<CanonicalSignature>,
    pub attachments: Vec<CanonicalAttachment>,
    pub test_results: Vec<CanonicalTestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCertificateCore {
    pub id: String,
    pub company_id: String,
    pub job_id: Option<String>,
    #[serde(rename = "type")]
    pub cert_type: String,
    pub certificate_number: String,
    pub inspector_name: Option<String>,
    pub inspector_email: Option<String>,
    pub data_version: u8,
    pub data: Value,
    pub outcome: Option<String>,
    pub outcome_reason: Option<String>,
    /// Rule trail behind `outcome`, in evaluation order. Empty until issuance.
    #[serde(default)]
    pub outcome_details: Vec<RuleDetail>,
    pub amends_certificate_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalObservation {
    pub id: String,
    pub code: String,
    pub location: String,
    pub description: String,
    pub regulation: Option<String>,
    pub fix_guidance: Option<String>,
    pub resolved_at: Option<String>,
    pub sort_order: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalChecklistItem {
    pub id: String,
    pub section: String,
    pub question: String,
    pub answer: String,
    pub notes: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSignature {
    pub id: String,
    pub role: String,
    pub signer_name: String,
    pub signer_email: Option<String>,
    pub signature_text: String,
    pub signed_at: Option<String>,
    pub qualification: Option<String>,
    pub is_primary: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAttachment {
    pub id: String,
    pub name: String,
    pub file_key: String,
    pub mime_type: String,
    pub category: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTestResult {
    pub id: String,
    pub circuit_ref: Option<String>,
    pub data: Map<String, Value>,
    pub created_at: String,
}
