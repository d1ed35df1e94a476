#![forbid(unsafe_code)]

pub mod audit_cli;
