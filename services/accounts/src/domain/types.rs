use chrono::{DateTime, Utc};
use roomlet_domain::account::{AccountKind, MfaMethod};
use roomlet_domain::event::SecurityAction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccountsServiceError;

/// Account record as used by the service core.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub kind: AccountKind,
    pub email_verified: bool,
    pub mfa_method: MfaMethod,
    pub totp_secret: Option<String>,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// MFA is enforced only when a method is selected AND the email is verified.
    pub fn mfa_required(&self) -> bool {
        self.mfa_method != MfaMethod::None && self.email_verified
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Input for account creation. `id`, timestamps and security defaults are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub kind: AccountKind,
}

/// Device remembered after a completed MFA login.
#[derive(Debug, Clone)]
pub struct TrustedDevice {
    pub id: Uuid,
    pub account_id: Uuid,
    pub fingerprint: String,
    pub label: String,
    pub last_ip: Option<String>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TrustedDevice {
    /// Inactive or expired devices are treated as untrusted even though the row exists.
    pub fn is_trusted_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expires| expires > now)
    }
}

/// Write model for one audit entry. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub account_id: Option<Uuid>,
    pub action: SecurityAction,
    pub ip: String,
    pub user_agent: String,
    pub metadata: serde_json::Value,
}

impl SecurityEvent {
    pub fn new(account_id: Option<Uuid>, action: SecurityAction, ctx: &RequestContext) -> Self {
        Self {
            account_id,
            action,
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            metadata: serde_json::json!({}),
        }
    }
}

/// Read model for stored audit entries. `action` stays a raw string so rows
/// written by newer builds still list cleanly.
#[derive(Debug, Clone)]
pub struct SecurityEventRecord {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub action: String,
    pub ip: String,
    pub user_agent: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Filters for the audit read path. All optional; combined with AND.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub action: Option<SecurityAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Raw login attempt for analytics. Recorded whether or not the identifier
/// resolved to an account; never consulted for gating.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub identifier: String,
    pub ip: String,
    pub success: bool,
    pub user_agent: String,
}

/// Client metadata extracted from the inbound request, used for
/// fingerprinting and audit entries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub ip: String,
    /// Sanitized user-agent (CR/LF replaced, capped at 500 chars).
    pub user_agent: String,
    pub accept_language: String,
    pub accept_encoding: String,
}

/// Pending email-verification challenge, cached under
/// `email_verify:{challenge_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerification {
    pub account_id: Uuid,
    pub email: String,
    pub code: String,
    pub code_issued_at: DateTime<Utc>,
    pub failures: u32,
    pub resends: u32,
}

impl PendingVerification {
    /// The code expires independently of the cache entry, which outlives it
    /// so resends can rotate the code in place.
    pub fn is_code_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.code_issued_at + chrono::Duration::seconds(EMAIL_VERIFY_OTP_TTL_SECS)
    }
}

/// Pending MFA challenge created after password verification, cached under
/// `login_mfa:{challenge_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMfa {
    pub account_id: Uuid,
    pub method: MfaMethod,
    /// Present only for the email method.
    pub otp: Option<String>,
    pub otp_issued_at: Option<DateTime<Utc>>,
    pub failures: u32,
    pub resends: u32,
    pub remember_me: bool,
    pub created_at: DateTime<Utc>,
}

impl PendingMfa {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.created_at + chrono::Duration::seconds(MFA_CHALLENGE_TTL_SECS)
    }

    pub fn is_otp_expired(&self, now: DateTime<Utc>) -> bool {
        match self.otp_issued_at {
            Some(issued) => now > issued + chrono::Duration::seconds(MFA_OTP_TTL_SECS),
            None => true,
        }
    }
}

/// Fixed-window rate-limit policy: at most `max_attempts` hits per `window_secs`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_attempts: u32,
    pub window_secs: u64,
}

/// Registrations per IP.
pub const REGISTRATION_LIMIT: RateLimit = RateLimit {
    max_attempts: 3,
    window_secs: 3600,
};

/// Login attempts per identifier. Reset on full login success.
pub const LOGIN_IDENTIFIER_LIMIT: RateLimit = RateLimit {
    max_attempts: 5,
    window_secs: 900,
};

/// Login attempts per IP. Never reset on success.
pub const LOGIN_IP_LIMIT: RateLimit = RateLimit {
    max_attempts: 10,
    window_secs: 900,
};

/// Verification-email resends per email address.
pub const RESEND_VERIFICATION_LIMIT: RateLimit = RateLimit {
    max_attempts: 3,
    window_secs: 900,
};

/// Password-reset requests per email address.
pub const PASSWORD_RESET_LIMIT: RateLimit = RateLimit {
    max_attempts: 3,
    window_secs: 900,
};

/// Limiter scope names. Each pairs with the policy constant above it and
/// keys the counter as `rate_limit:{scope}:{value}`.
pub const REGISTRATION_SCOPE: &str = "register_ip";
pub const LOGIN_IDENTIFIER_SCOPE: &str = "login_user";
pub const LOGIN_IP_SCOPE: &str = "login_ip";
pub const RESEND_VERIFICATION_SCOPE: &str = "resend_verification";
pub const PASSWORD_RESET_SCOPE: &str = "password_reset";

/// One-time code length in digits.
pub const OTP_LEN: usize = 6;

/// Email-verification code validity window in seconds.
pub const EMAIL_VERIFY_OTP_TTL_SECS: i64 = 600;

/// Cache TTL for a verification challenge in seconds. Longer than the code
/// window so an expired code can be resent against the same challenge.
pub const VERIFY_CHALLENGE_CACHE_TTL_SECS: usize = 1800;

/// MFA challenge lifetime in seconds, both the cache TTL and the logical expiry.
pub const MFA_CHALLENGE_TTL_SECS: i64 = 300;

/// Email MFA code validity window in seconds.
pub const MFA_OTP_TTL_SECS: i64 = 300;

/// Wrong-code attempts before a challenge is exhausted and deleted.
pub const MAX_OTP_FAILURES: u32 = 5;

/// Code resends allowed per challenge.
pub const MAX_OTP_RESENDS: u32 = 3;

/// Backup codes issued per enrollment or regeneration.
pub const BACKUP_CODE_COUNT: usize = 10;

/// Password-reset link validity in seconds.
pub const RESET_TOKEN_MAX_AGE_SECS: u64 = 3600;

/// Distinct login IPs within the window above which activity is flagged.
pub const SUSPICIOUS_IP_THRESHOLD: u64 = 3;

/// Lookback window for the suspicious-activity heuristic in seconds.
pub const SUSPICIOUS_WINDOW_SECS: i64 = 3600;

// ── Input validation ─────────────────────────────────────────────────────

/// Usernames considered reserved regardless of availability.
const RESERVED_USERNAMES: [&str; 6] = [
    "admin",
    "root",
    "system",
    "administrator",
    "moderator",
    "support",
];

/// Disposable email providers rejected at registration.
const DISPOSABLE_DOMAINS: [&str; 9] = [
    "tempmail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "mailinator.com",
    "throwaway.email",
    "temp-mail.org",
    "fakeinbox.com",
    "maildrop.cc",
    "sharklasers.com",
];

/// Validate and normalize a username: trimmed, lowercased, at least 3 chars,
/// `[A-Za-z0-9_.@+-]` charset, not reserved.
pub fn validate_username(raw: &str) -> Result<String, AccountsServiceError> {
    let username = raw.trim().to_lowercase();
    if username.chars().count() < 3 {
        return Err(AccountsServiceError::Validation(
            "Username must be at least 3 characters long.".to_owned(),
        ));
    }
    let charset_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if !charset_ok {
        return Err(AccountsServiceError::Validation(
            "Username can only contain letters, numbers, and @/./+/-/_ characters.".to_owned(),
        ));
    }
    if RESERVED_USERNAMES.contains(&username.as_str()) {
        return Err(AccountsServiceError::Validation(
            "This username is reserved.".to_owned(),
        ));
    }
    Ok(username)
}

/// Validate and normalize an email: trimmed, lowercased, structural check,
/// disposable providers rejected.
pub fn validate_email(raw: &str) -> Result<String, AccountsServiceError> {
    let email = raw.trim().to_lowercase();
    let valid_shape = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid_shape {
        return Err(AccountsServiceError::Validation(
            "Enter a valid email address.".to_owned(),
        ));
    }
    let domain = email.split('@').next_back().unwrap_or_default();
    if DISPOSABLE_DOMAINS.contains(&domain) {
        return Err(AccountsServiceError::Validation(
            "Disposable email addresses are not allowed.".to_owned(),
        ));
    }
    Ok(email)
}

/// Validate a one-time code: exactly 6 ASCII digits after trimming.
pub fn validate_otp(raw: &str) -> Result<String, AccountsServiceError> {
    let code = raw.trim();
    if code.len() != OTP_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountsServiceError::Validation(
            "Verification code must be exactly 6 digits.".to_owned(),
        ));
    }
    Ok(code.to_owned())
}

/// Validate and normalize an optional phone number. Separators (spaces,
/// hyphens, parentheses) are stripped; the rest must match `+?digits{9,15}`.
pub fn validate_phone(raw: &str) -> Result<Option<String>, AccountsServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let valid = (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(AccountsServiceError::Validation(
            "Invalid phone number format. Use format: +1234567890".to_owned(),
        ));
    }
    Ok(Some(cleaned))
}
