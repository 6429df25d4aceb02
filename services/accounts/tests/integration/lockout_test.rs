use chrono::{Duration, Utc};

use roomlet_accounts::security::lockout::{LockState, LockoutPolicy};

use crate::helpers::{MockAccountStore, account_with};

fn seeded_policy() -> LockoutPolicy<MockAccountStore> {
    LockoutPolicy {
        accounts: MockAccountStore::new(vec![account_with(
            "alice",
            "alice@example.com",
            "$argon2id$unused",
        )]),
    }
}

#[tokio::test]
async fn should_escalate_lock_duration_with_the_failure_count() {
    let policy = seeded_policy();
    let account_id = policy.accounts.handle().lock().unwrap()[0].id;

    for expected in 1..=2 {
        let outcome = policy.record_failure(account_id).await.unwrap();
        assert_eq!(outcome.failures, expected);
        assert!(!outcome.locked);
    }

    let third = policy.record_failure(account_id).await.unwrap();
    assert!(third.locked);
    let soft_until = policy.accounts.handle().lock().unwrap()[0]
        .locked_until
        .unwrap();
    assert!(soft_until <= Utc::now() + Duration::minutes(5));

    let _ = policy.record_failure(account_id).await.unwrap();
    let fifth = policy.record_failure(account_id).await.unwrap();
    assert_eq!(fifth.failures, 5);
    assert!(fifth.locked);
    let hard_until = policy.accounts.handle().lock().unwrap()[0]
        .locked_until
        .unwrap();
    assert!(hard_until > Utc::now() + Duration::minutes(20));
}

#[tokio::test]
async fn should_clear_expired_lock_on_first_check_only() {
    let policy = seeded_policy();
    {
        let handle = policy.accounts.handle();
        let mut accounts = handle.lock().unwrap();
        accounts[0].failed_login_attempts = 4;
        accounts[0].locked_until = Some(Utc::now() - Duration::seconds(1));
    }
    let account = policy.accounts.handle().lock().unwrap()[0].clone();

    // First check clears the row and reports it did so.
    assert_eq!(
        policy.is_locked(&account).await.unwrap(),
        LockState::JustUnlocked
    );
    let cleared = policy.accounts.handle().lock().unwrap()[0].clone();
    assert!(cleared.locked_until.is_none());
    assert_eq!(cleared.failed_login_attempts, 0);

    // A racing second check on the same snapshot is a plain unlock.
    assert_eq!(policy.is_locked(&account).await.unwrap(), LockState::Unlocked);
}

#[tokio::test]
async fn should_report_active_lock_without_touching_the_row() {
    let policy = seeded_policy();
    {
        let handle = policy.accounts.handle();
        let mut accounts = handle.lock().unwrap();
        accounts[0].failed_login_attempts = 3;
        accounts[0].locked_until = Some(Utc::now() + Duration::minutes(4));
    }
    let account = policy.accounts.handle().lock().unwrap()[0].clone();

    assert_eq!(policy.is_locked(&account).await.unwrap(), LockState::Locked);
    let stored = policy.accounts.handle().lock().unwrap()[0].clone();
    assert_eq!(stored.failed_login_attempts, 3);
    assert!(stored.locked_until.is_some());
}

#[tokio::test]
async fn should_reset_counter_and_lock_unconditionally() {
    let policy = seeded_policy();
    let account_id = {
        let handle = policy.accounts.handle();
        let mut accounts = handle.lock().unwrap();
        accounts[0].failed_login_attempts = 5;
        accounts[0].locked_until = Some(Utc::now() + Duration::minutes(30));
        accounts[0].id
    };

    policy.reset(account_id).await.unwrap();

    let stored = policy.accounts.handle().lock().unwrap()[0].clone();
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());
}
