use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::repository::{ChallengeCache, RateLimitStore};
use crate::domain::types::{
    MFA_CHALLENGE_TTL_SECS, PendingMfa, PendingVerification, RateLimit,
    VERIFY_CHALLENGE_CACHE_TTL_SECS,
};
use crate::error::AccountsServiceError;

// ── Challenge cache ───────────────────────────────────────────────────────────

/// Challenge storage in Redis. Entries carry their own issue timestamps;
/// the storage TTL is only an upper bound and restarts on update.
#[derive(Clone)]
pub struct RedisChallengeCache {
    pub pool: Pool,
}

fn verification_key(challenge_id: Uuid) -> String {
    format!("email_verify:{}", challenge_id)
}

fn mfa_key(challenge_id: Uuid) -> String {
    format!("login_mfa:{}", challenge_id)
}

impl ChallengeCache for RedisChallengeCache {
    async fn set_verification(
        &self,
        challenge_id: Uuid,
        pending: &PendingVerification,
    ) -> Result<(), AccountsServiceError> {
        let payload =
            serde_json::to_vec(pending).map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = verification_key(challenge_id);
        let (): () = conn
            .set_ex(&key, payload, VERIFY_CHALLENGE_CACHE_TTL_SECS as u64)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| {
                AccountsServiceError::Internal(e.into())
            })?;
        Ok(())
    }

    async fn get_verification(
        &self,
        challenge_id: Uuid,
    ) -> Result<Option<PendingVerification>, AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = verification_key(challenge_id);
        let value: Option<Vec<u8>> = conn
            .get(&key)
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        value
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(|e| AccountsServiceError::Internal(e.into()))
    }

    async fn delete_verification(&self, challenge_id: Uuid) -> Result<(), AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = verification_key(challenge_id);
        let (): () = conn
            .del(&key)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| {
                AccountsServiceError::Internal(e.into())
            })?;
        Ok(())
    }

    async fn set_mfa(
        &self,
        challenge_id: Uuid,
        pending: &PendingMfa,
    ) -> Result<(), AccountsServiceError> {
        let payload =
            serde_json::to_vec(pending).map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = mfa_key(challenge_id);
        let (): () = conn
            .set_ex(&key, payload, MFA_CHALLENGE_TTL_SECS as u64)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| {
                AccountsServiceError::Internal(e.into())
            })?;
        Ok(())
    }

    async fn get_mfa(
        &self,
        challenge_id: Uuid,
    ) -> Result<Option<PendingMfa>, AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = mfa_key(challenge_id);
        let value: Option<Vec<u8>> = conn
            .get(&key)
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        value
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(|e| AccountsServiceError::Internal(e.into()))
    }

    async fn delete_mfa(&self, challenge_id: Uuid) -> Result<(), AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = mfa_key(challenge_id);
        let (): () = conn
            .del(&key)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| {
                AccountsServiceError::Internal(e.into())
            })?;
        Ok(())
    }
}

// ── Rate-limit counters ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisRateLimiter {
    pub pool: Pool,
}

fn rate_limit_key(scope: &str, value: &str) -> String {
    format!("rate_limit:{}:{}", scope, value)
}

impl RateLimitStore for RedisRateLimiter {
    async fn is_limited(
        &self,
        scope: &str,
        value: &str,
        limit: RateLimit,
    ) -> Result<bool, AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = rate_limit_key(scope, value);
        let count: Option<u32> = conn
            .get(&key)
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        Ok(count.unwrap_or(0) >= limit.max_attempts)
    }

    async fn increment(
        &self,
        scope: &str,
        value: &str,
        limit: RateLimit,
    ) -> Result<(), AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = rate_limit_key(scope, value);
        let count: u32 = conn
            .incr(&key, 1)
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        // The window starts with the first hit; later hits keep the original
        // expiry.
        if count == 1 {
            let (): () = conn
                .expire(&key, limit.window_secs as i64)
                .await
                .map_err(|e: deadpool_redis::redis::RedisError| {
                    AccountsServiceError::Internal(e.into())
                })?;
        }
        Ok(())
    }

    async fn reset(&self, scope: &str, value: &str) -> Result<(), AccountsServiceError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AccountsServiceError::Internal(e.into()))?;
        let key = rate_limit_key(scope, value);
        let (): () = conn
            .del(&key)
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| {
                AccountsServiceError::Internal(e.into())
            })?;
        Ok(())
    }
}
