#![forbid(unsafe_code)]

pub mod audit;
pub mod cert_type;
pub mod certificate;
pub mod common;
pub mod completion;
pub mod ids;
pub mod outcome;
pub mod payload;
pub mod revision;
pub mod snapshot;
pub mod suggestion;

pub use common::{iso_timestamp, ContractViolation, ReasonCodeId, SchemaVersion, Timestamp, Validate};
