#![forbid(unsafe_code)]

pub mod blob;
pub mod cert_store;
pub mod repo;
