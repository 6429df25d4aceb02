//! MFA backup codes: generation and the stored hash form.

use rand::RngExt;
use sha2::{Digest, Sha256};

use crate::domain::types::BACKUP_CODE_COUNT;

/// Generate a fresh set of 8-digit recovery codes. The plaintext is shown to
/// the account holder exactly once; only hashes are stored.
pub fn generate_codes() -> Vec<String> {
    let mut rng = rand::rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| format!("{:08}", rng.random_range(0..100_000_000u32)))
        .collect()
}

/// SHA-256 hex digest, the stored form of a backup code.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}
