#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use certflow_kernel_contracts::cert_type::{CertType, SignatureRole};
use certflow_kernel_contracts::certificate::{
    Attachment, Certificate, ChecklistItem, Observation, ObservationCode, SignatureRecord,
};
use certflow_kernel_contracts::ids::{CertificateId, CompanyId, JobId};
use certflow_kernel_contracts::Timestamp;
use certflow_os::{CertificateRequest, CertificateRuntime, IssuanceConfig, IssuanceEnv};
use certflow_storage::blob::{BlobError, BlobStorage, InMemoryBlobStorage};
use certflow_storage::cert_store::CertStore;
use certflow_storage::repo::CertificateRepo;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

pub const ACTOR: &str = "inspector@example.test";

/// Deterministic clock and counters.
#[derive(Debug, Default)]
pub struct SeqEnv {
    counter: AtomicU64,
}

impl SeqEnv {
    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl IssuanceEnv for SeqEnv {
    fn now(&self) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap()
    }

    fn verification_token(&self) -> String {
        format!("{:064x}", self.next())
    }

    fn new_id(&self, prefix: &str) -> String {
        format!("{prefix}_seq{}", self.next())
    }
}

/// Accepts nothing; every write fails.
#[derive(Debug, Default)]
pub struct UnavailableBlobs;

impl BlobStorage for UnavailableBlobs {
    fn write_bytes(&self, _key: &str, _bytes: &[u8]) -> Result<(), BlobError> {
        Err(BlobError::Unavailable {
            reason: "bucket offline".to_string(),
        })
    }

    fn read_bytes(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        Err(BlobError::NotFound {
            key: key.to_string(),
        })
    }

    fn exists(&self, _key: &str) -> bool {
        false
    }
}

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
}

pub fn company() -> CompanyId {
    CompanyId::new("co_e2e").unwrap()
}

pub fn cert_id(id: &str) -> CertificateId {
    CertificateId::new(id).unwrap()
}

pub fn request(id: &str) -> CertificateRequest {
    CertificateRequest::v1(company(), cert_id(id), ACTOR).unwrap()
}

pub fn runtime_with(blobs: Arc<dyn BlobStorage>) -> CertificateRuntime {
    CertificateRuntime::new(IssuanceConfig::mvp_v1(), blobs, Arc::new(SeqEnv::default()))
}

pub fn runtime() -> (CertificateRuntime, Arc<InMemoryBlobStorage>) {
    let blobs = Arc::new(InMemoryBlobStorage::new());
    (runtime_with(blobs.clone()), blobs)
}

pub fn complete_eicr_data() -> Value {
    json!({
        "clientDetails": {"clientName": "Acme Property Ltd"},
        "installationDetails": {"address": "1 High Street, Leeds"},
        "contractorDetails": {"companyName": "Sparks & Co"},
        "supplyCharacteristics": {"supplyType": "AC", "earthingArrangement": "TN-C-S"},
        "boards": [{
            "designation": "DB1",
            "circuits": [
                {"circuitRef": "1", "description": "Lighting", "status": "satisfactory"},
                {"circuitRef": "2", "description": "Sockets", "status": "satisfactory"}
            ]
        }],
        "overallAssessment": {
            "overallCondition": "Satisfactory",
            "nextInspectionDate": "2029-07-01"
        },
        "declaration": {"inspectorName": "A. Sparks"}
    })
}

pub fn signed(id: &str, role: SignatureRole, name: &str) -> SignatureRecord {
    let mut s = SignatureRecord::unsigned_v1(id, role, name, 0).unwrap();
    s.signature_text = name.to_string();
    s.signed_at = Some(t0());
    s
}

/// Draft EICR with data that passes completion, one checklist pass, two signatures and a photo.
pub fn seed_eicr(store: &mut CertStore, id: &str) {
    seed_eicr_with_job(store, id, None);
}

pub fn seed_eicr_with_job(store: &mut CertStore, id: &str, job_id: Option<JobId>) {
    seed_eicr_numbered(store, id, job_id, &format!("EICR-{id}"));
}

pub fn seed_eicr_numbered(store: &mut CertStore, id: &str, job_id: Option<JobId>, number: &str) {
    let mut cert = Certificate::draft_v1(
        cert_id(id),
        company(),
        CertType::Eicr,
        number,
        2,
        complete_eicr_data(),
        t0(),
    )
    .unwrap();
    cert.job_id = job_id;
    store.insert_certificate_row(cert).unwrap();
    let c = company();
    let cid = cert_id(id);
    store
        .insert_checklist_item(
            &c,
            &cid,
            ChecklistItem::v1("k1", "protection", "RCD protection present", "pass", None, 0)
                .unwrap(),
        )
        .unwrap();
    store
        .insert_signature(&c, &cid, signed("s1", SignatureRole::Engineer, "A. Sparks"))
        .unwrap();
    store
        .insert_signature(&c, &cid, signed("s2", SignatureRole::Customer, "B. Client"))
        .unwrap();
    store
        .insert_attachment(
            &c,
            &cid,
            Attachment::v1("a1", "board.jpg", "att/board.jpg", "image/jpeg", "consumer_unit", t0())
                .unwrap(),
        )
        .unwrap();
}

pub fn add_observation(store: &mut CertStore, id: &str, obs_id: &str, code: ObservationCode) {
    store
        .insert_observation(
            &company(),
            &cert_id(id),
            Observation::v1(
                obs_id,
                code,
                "Kitchen",
                "No RCD protection on socket circuit",
                Some("411.3.3".to_string()),
                None,
                0,
                t0(),
            )
            .unwrap(),
        )
        .unwrap();
}
