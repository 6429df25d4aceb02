#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use roomlet_domain::account::MfaMethod;
use roomlet_domain::pagination::PageRequest;
use uuid::Uuid;

use crate::domain::types::{
    Account, EventFilter, LoginAttempt, NewAccount, PendingMfa, PendingVerification, RateLimit,
    SecurityEvent, SecurityEventRecord, TrustedDevice,
};
use crate::error::AccountsServiceError;

/// Store for account records.
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountsServiceError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<Account>, AccountsServiceError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError>;

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Account>, AccountsServiceError>;

    /// Single lookup across username, email and phone.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Account>, AccountsServiceError>;

    /// Create an unverified account with security defaults.
    /// A unique-constraint violation maps to `AccountExists`.
    async fn create(&self, account: &NewAccount) -> Result<Account, AccountsServiceError>;

    async fn set_email_verified(&self, id: Uuid) -> Result<(), AccountsServiceError>;

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AccountsServiceError>;

    /// Atomic failure-counter increment. Returns the new counter value.
    async fn increment_failed_logins(&self, id: Uuid) -> Result<u32, AccountsServiceError>;

    async fn set_lock(&self, id: Uuid, until: DateTime<Utc>) -> Result<(), AccountsServiceError>;

    /// Clear lock and counter iff `locked_until <= now`. Returns `true` when a
    /// row actually changed, so the caller can tell first clear from no-op.
    async fn clear_expired_lock(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsServiceError>;

    /// Unconditional lock + counter clear on full login success.
    async fn reset_lockout(&self, id: Uuid) -> Result<(), AccountsServiceError>;

    async fn set_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        ip: &str,
    ) -> Result<(), AccountsServiceError>;

    async fn set_mfa_method(
        &self,
        id: Uuid,
        method: MfaMethod,
    ) -> Result<(), AccountsServiceError>;

    async fn set_totp_secret(
        &self,
        id: Uuid,
        secret: Option<&str>,
    ) -> Result<(), AccountsServiceError>;
}

/// Store for hashed MFA backup codes.
pub trait BackupCodeStore: Send + Sync {
    /// Replace every code for the account in one transaction.
    async fn replace_all(
        &self,
        account_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), AccountsServiceError>;

    /// Single-use consume: conditional delete, `true` iff exactly one row went away.
    /// Concurrent submissions of the same code race here and only one wins.
    async fn consume(&self, account_id: Uuid, code_hash: &str)
    -> Result<bool, AccountsServiceError>;

    async fn delete_all(&self, account_id: Uuid) -> Result<(), AccountsServiceError>;
}

/// Store for trusted devices.
pub trait DeviceStore: Send + Sync {
    async fn find(
        &self,
        account_id: Uuid,
        fingerprint: &str,
    ) -> Result<Option<TrustedDevice>, AccountsServiceError>;

    /// Trust upsert on `(account_id, fingerprint)`. An existing row only gets
    /// its origin address and last-used time refreshed, so a revoked device
    /// stays revoked. Returns `true` when the row was newly created.
    async fn upsert_trust(
        &self,
        account_id: Uuid,
        fingerprint: &str,
        label: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AccountsServiceError>;

    async fn list_active(&self, account_id: Uuid)
    -> Result<Vec<TrustedDevice>, AccountsServiceError>;

    /// Soft revoke. Returns `false` when the device does not exist, is not
    /// owned by the account, or was already revoked.
    async fn deactivate(
        &self,
        account_id: Uuid,
        device_id: Uuid,
    ) -> Result<bool, AccountsServiceError>;
}

/// Append-only store for audit events.
pub trait SecurityEventStore: Send + Sync {
    async fn append(&self, event: &SecurityEvent) -> Result<(), AccountsServiceError>;

    /// Events for one account, newest first.
    async fn list(
        &self,
        account_id: Uuid,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Vec<SecurityEventRecord>, AccountsServiceError>;

    /// Distinct source IPs among LOGIN events since the given instant.
    async fn distinct_login_ips_since(
        &self,
        account_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64, AccountsServiceError>;
}

/// Append-only store for raw login attempts (analytics only).
pub trait LoginAttemptStore: Send + Sync {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), AccountsServiceError>;
}

/// Fixed-window rate-limit counters (Redis).
pub trait RateLimitStore: Send + Sync {
    /// True when the counter for `{scope}:{value}` already meets the limit.
    async fn is_limited(
        &self,
        scope: &str,
        value: &str,
        limit: RateLimit,
    ) -> Result<bool, AccountsServiceError>;

    /// Atomic increment; the window expiry is set on the first hit.
    async fn increment(
        &self,
        scope: &str,
        value: &str,
        limit: RateLimit,
    ) -> Result<(), AccountsServiceError>;

    async fn reset(&self, scope: &str, value: &str) -> Result<(), AccountsServiceError>;
}

/// Cache for pending challenges (Redis, short TTL).
pub trait ChallengeCache: Send + Sync {
    async fn set_verification(
        &self,
        challenge_id: Uuid,
        pending: &PendingVerification,
    ) -> Result<(), AccountsServiceError>;

    async fn get_verification(
        &self,
        challenge_id: Uuid,
    ) -> Result<Option<PendingVerification>, AccountsServiceError>;

    async fn delete_verification(&self, challenge_id: Uuid) -> Result<(), AccountsServiceError>;

    async fn set_mfa(
        &self,
        challenge_id: Uuid,
        pending: &PendingMfa,
    ) -> Result<(), AccountsServiceError>;

    async fn get_mfa(&self, challenge_id: Uuid)
    -> Result<Option<PendingMfa>, AccountsServiceError>;

    async fn delete_mfa(&self, challenge_id: Uuid) -> Result<(), AccountsServiceError>;
}

/// Outbound email. One delivery attempt per call; flows treat failures as
/// best-effort and never abort on them.
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AccountsServiceError>;
}
