#![forbid(unsafe_code)]

use certflow_kernel_contracts::Timestamp;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

/// Clock and randomness the orchestrators draw on.
pub trait IssuanceEnv: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Public, unguessable certificate verification token.
    fn verification_token(&self) -> String;

    /// Fresh row identifier starting with `prefix`.
    fn new_id(&self, prefix: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIssuanceEnv;

impl IssuanceEnv for SystemIssuanceEnv {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn verification_token(&self) -> String {
        random_hex(32)
    }

    fn new_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", random_hex(12))
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_env_01_tokens_are_hex_and_distinct() {
        let env = SystemIssuanceEnv;
        let a = env.verification_token();
        let b = env.verification_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert!(env.new_id("cert").starts_with("cert_"));
    }
}
