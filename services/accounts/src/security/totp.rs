//! TOTP enrollment and verification (RFC 6238 via totp-rs).

use data_encoding::BASE32;
use rand::RngExt;
use totp_rs::{Algorithm, Secret, TOTP};

/// Issuer label baked into provisioning URLs.
const ISSUER: &str = "Roomlet";

/// Generate a fresh 160-bit secret, base32-encoded.
pub fn generate_secret() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..20).map(|_| rng.random::<u8>()).collect();
    BASE32.encode(&bytes)
}

/// Check a 6-digit code against the secret: SHA1, 30 s step, ±1 step skew.
/// An undecodable secret fails the check instead of erroring.
pub fn verify(secret: &str, code: &str) -> bool {
    let Ok(bytes) = Secret::Encoded(secret.to_owned()).to_bytes() else {
        return false;
    };
    let Ok(totp) = TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes) else {
        return false;
    };
    totp.check_current(code).unwrap_or(false)
}

/// `otpauth://` URL encoding the enrollment parameters for authenticator apps.
/// Usernames are already normalized to the `[a-z0-9_.@+-]` charset, which is
/// safe inside the label path segment.
pub fn provisioning_url(username: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{ISSUER}:{username}?secret={secret}&issuer={ISSUER}&algorithm=SHA1&digits=6&period=30"
    )
}
