use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use crate::infra::cache::{RedisChallengeCache, RedisRateLimiter};
use crate::infra::db::{
    DbAccountStore, DbBackupCodeStore, DbDeviceStore, DbLoginAttemptStore, DbSecurityEventStore,
};
use crate::infra::email::SmtpMailer;
use crate::security::link_token::LinkTokens;
use crate::security::lockout::LockoutPolicy;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub mailer: SmtpMailer,
    pub jwt_secret: String,
    pub link_token_secret: String,
    pub cookie_domain: String,
    pub public_base_url: String,
}

impl AppState {
    pub fn account_store(&self) -> DbAccountStore {
        DbAccountStore {
            db: self.db.clone(),
        }
    }

    pub fn backup_code_store(&self) -> DbBackupCodeStore {
        DbBackupCodeStore {
            db: self.db.clone(),
        }
    }

    pub fn device_store(&self) -> DbDeviceStore {
        DbDeviceStore {
            db: self.db.clone(),
        }
    }

    pub fn event_store(&self) -> DbSecurityEventStore {
        DbSecurityEventStore {
            db: self.db.clone(),
        }
    }

    pub fn attempt_store(&self) -> DbLoginAttemptStore {
        DbLoginAttemptStore {
            db: self.db.clone(),
        }
    }

    pub fn rate_limiter(&self) -> RedisRateLimiter {
        RedisRateLimiter {
            pool: self.redis.clone(),
        }
    }

    pub fn challenge_cache(&self) -> RedisChallengeCache {
        RedisChallengeCache {
            pool: self.redis.clone(),
        }
    }

    pub fn lockout(&self) -> LockoutPolicy<DbAccountStore> {
        LockoutPolicy {
            accounts: self.account_store(),
        }
    }

    pub fn link_tokens(&self) -> LinkTokens {
        LinkTokens::new(self.link_token_secret.clone())
    }
}
