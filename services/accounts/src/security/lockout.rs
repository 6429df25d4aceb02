//! Progressive account lockout after repeated password failures.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::repository::AccountStore;
use crate::domain::types::Account;
use crate::error::AccountsServiceError;

/// Failure count at which the short lock engages.
const SOFT_LOCK_THRESHOLD: u32 = 3;

/// Failure count at which the long lock engages.
const HARD_LOCK_THRESHOLD: u32 = 5;

/// Lock duration for a failure count: none below 3, 5 minutes for 3-4,
/// 30 minutes from 5. Recomputed from the current count, not cumulative.
pub fn lock_duration(failures: u32) -> Option<Duration> {
    if failures >= HARD_LOCK_THRESHOLD {
        Some(Duration::minutes(30))
    } else if failures >= SOFT_LOCK_THRESHOLD {
        Some(Duration::minutes(5))
    } else {
        None
    }
}

/// Outcome of recording one password failure.
#[derive(Debug, Clone, Copy)]
pub struct FailureOutcome {
    pub failures: u32,
    /// True when this failure engaged (or re-engaged) a lock.
    pub locked: bool,
}

/// Current lock state as seen by [`LockoutPolicy::is_locked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
    /// An expired lock was cleared by this check; the caller records the
    /// unlock event. Subsequent checks return `Unlocked`.
    JustUnlocked,
}

/// Lockout rules over an account store.
pub struct LockoutPolicy<A: AccountStore> {
    pub accounts: A,
}

impl<A: AccountStore> LockoutPolicy<A> {
    /// Record one failed password attempt: atomic counter increment, then a
    /// conditional lock whose duration is recomputed from the new count.
    pub async fn record_failure(
        &self,
        account_id: Uuid,
    ) -> Result<FailureOutcome, AccountsServiceError> {
        let failures = self.accounts.increment_failed_logins(account_id).await?;
        let locked = match lock_duration(failures) {
            Some(duration) => {
                self.accounts
                    .set_lock(account_id, Utc::now() + duration)
                    .await?;
                true
            }
            None => false,
        };
        Ok(FailureOutcome { failures, locked })
    }

    /// Check the lock. An expired lock is cleared lazily here: the first
    /// check after expiry resets the counter and reports `JustUnlocked`, the
    /// second is a plain `Unlocked`. There is no background sweep.
    pub async fn is_locked(&self, account: &Account) -> Result<LockState, AccountsServiceError> {
        let now = Utc::now();
        match account.locked_until {
            Some(until) if until > now => Ok(LockState::Locked),
            Some(_) => {
                let cleared = self.accounts.clear_expired_lock(account.id, now).await?;
                if cleared {
                    Ok(LockState::JustUnlocked)
                } else {
                    Ok(LockState::Unlocked)
                }
            }
            None => Ok(LockState::Unlocked),
        }
    }

    /// Unconditional clear on full login success.
    pub async fn reset(&self, account_id: Uuid) -> Result<(), AccountsServiceError> {
        self.accounts.reset_lockout(account_id).await
    }
}
