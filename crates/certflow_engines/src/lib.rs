#![forbid(unsafe_code)]

pub mod canonical;
pub mod completion;
pub mod explain;
pub mod measurements;
pub mod outcome;
pub mod snapshot;
pub mod suggest;
pub mod thresholds;

pub use completion::{certificate_is_ready_for_completion, validate_certificate_for_completion};
pub use explain::{explain_outcome, explain_snapshot, observation_summary};
pub use outcome::compute_outcome;
pub use snapshot::{
    build_canonical_cert_snapshot, build_issued_snapshot, compute_checksum, compute_signing_hash,
};
pub use suggest::suggest_observation_code;
