//! Signed one-time link tokens (password-reset emails).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies `hex(HMAC-SHA256(secret, subject ‖ ts)) ":" ts` tokens.
/// The secret is injected from config, never read ambiently.
pub struct LinkTokens {
    secret: String,
}

impl LinkTokens {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a token binding `subject` to the current time.
    pub fn issue(&self, subject: &str) -> String {
        self.issue_at(subject, now_secs())
    }

    fn issue_at(&self, subject: &str, ts: u64) -> String {
        format!("{}:{ts}", hex::encode(self.mac(subject, ts).finalize().into_bytes()))
    }

    /// Verify a token for `subject` within `max_age_secs`.
    ///
    /// Single bool: malformed, mismatched and expired tokens are
    /// indistinguishable to the caller. The MAC comparison is constant-time.
    pub fn verify(&self, token: &str, subject: &str, max_age_secs: u64) -> bool {
        let Some((sig_hex, ts_str)) = token.rsplit_once(':') else {
            return false;
        };
        let Ok(ts) = ts_str.parse::<u64>() else {
            return false;
        };
        let now = now_secs();
        if ts > now || now - ts > max_age_secs {
            return false;
        }
        let Ok(sig) = hex::decode(sig_hex) else {
            return false;
        };
        self.mac(subject, ts).verify_slice(&sig).is_ok()
    }

    fn mac(&self, subject: &str, ts: u64) -> HmacSha256 {
        // HMAC accepts keys of any length, new_from_slice cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC key of any length");
        mac.update(subject.as_bytes());
        mac.update(ts.to_string().as_bytes());
        mac
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}
