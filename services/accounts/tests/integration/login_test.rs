use chrono::{Duration, Utc};
use uuid::Uuid;

use roomlet_accounts::domain::types::{
    Account, LOGIN_IDENTIFIER_SCOPE, LOGIN_IP_SCOPE, TrustedDevice,
};
use roomlet_accounts::error::AccountsServiceError;
use roomlet_accounts::security::fingerprint::device_fingerprint;
use roomlet_accounts::security::lockout::LockoutPolicy;
use roomlet_accounts::security::password::hash_password;
use roomlet_accounts::usecase::login::{LoginInput, LoginOutcome, LoginUseCase};
use roomlet_domain::account::MfaMethod;

use crate::helpers::{
    JWT_SECRET, MockAccountStore, MockAttemptStore, MockChallengeCache, MockDeviceStore,
    MockEventStore, MockMailer, MockRateLimiter, account_with, ctx_from, test_ctx,
};

const PASSWORD: &str = "Str0ng!pass";

struct LoginWorld {
    accounts: MockAccountStore,
    devices: MockDeviceStore,
    events: MockEventStore,
    attempts: MockAttemptStore,
    limiter: MockRateLimiter,
    challenges: MockChallengeCache,
    mailer: MockMailer,
}

impl LoginWorld {
    fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: MockAccountStore::new(accounts),
            devices: MockDeviceStore::empty(),
            events: MockEventStore::empty(),
            attempts: MockAttemptStore::empty(),
            limiter: MockRateLimiter::empty(),
            challenges: MockChallengeCache::empty(),
            mailer: MockMailer::empty(),
        }
    }

    fn usecase(
        &self,
    ) -> LoginUseCase<
        MockAccountStore,
        MockDeviceStore,
        MockEventStore,
        MockAttemptStore,
        MockRateLimiter,
        MockChallengeCache,
        MockMailer,
    > {
        LoginUseCase {
            accounts: self.accounts.clone(),
            lockout: LockoutPolicy {
                accounts: self.accounts.clone(),
            },
            devices: self.devices.clone(),
            events: self.events.clone(),
            attempts: self.attempts.clone(),
            limiter: self.limiter.clone(),
            challenges: self.challenges.clone(),
            mailer: self.mailer.clone(),
            jwt_secret: JWT_SECRET.to_owned(),
        }
    }

    fn stored_account(&self, username: &str) -> Account {
        self.accounts
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.username == username)
            .cloned()
            .unwrap()
    }
}

async fn world_with_alice() -> LoginWorld {
    let hash = hash_password(PASSWORD).await.unwrap();
    LoginWorld::with_accounts(vec![account_with("alice", "alice@example.com", &hash)])
}

fn login_input(identifier: &str, password: &str) -> LoginInput {
    LoginInput {
        identifier: identifier.to_owned(),
        password: password.to_owned(),
        remember_me: false,
        ctx: test_ctx(),
    }
}

#[tokio::test]
async fn should_authenticate_with_correct_password() {
    let world = world_with_alice().await;

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    let LoginOutcome::Authenticated(session) = outcome else {
        panic!("expected an authenticated session");
    };
    assert!(!session.token.is_empty());
    assert_eq!(session.account.username, "alice");
    assert!(world.events.actions().contains(&"LOGIN".to_owned()));

    // Device trusted, last-login stamped, attempt row flagged successful.
    assert_eq!(world.devices.handle().lock().unwrap().len(), 1);
    assert!(world.stored_account("alice").last_login_at.is_some());
    let attempts = world.attempts.handle().lock().unwrap().clone();
    assert!(attempts.iter().any(|a| a.success));
}

#[tokio::test]
async fn should_match_by_email_and_phone_too() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.phone = Some("+254712345678".to_owned());
    let world = LoginWorld::with_accounts(vec![account]);

    for identifier in ["alice@example.com", "+254712345678", "  ALICE  "] {
        let outcome = world.usecase().execute(login_input(identifier, PASSWORD)).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    }
}

#[tokio::test]
async fn should_return_identical_error_for_unknown_identifier_and_wrong_password() {
    let world = world_with_alice().await;
    let usecase = world.usecase();

    let unknown = usecase
        .execute(login_input("nobody", PASSWORD))
        .await
        .unwrap_err();
    let wrong = usecase
        .execute(login_input("alice", "Wr0ng!password"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AccountsServiceError::AuthenticationFailed));
    assert!(matches!(wrong, AccountsServiceError::AuthenticationFailed));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.kind(), wrong.kind());
}

#[tokio::test]
async fn should_count_unknown_identifier_against_ip_window_only() {
    let world = world_with_alice().await;

    let _ = world.usecase().execute(login_input("nobody", PASSWORD)).await;

    assert_eq!(world.limiter.count(LOGIN_IP_SCOPE, &test_ctx().ip), 1);
    assert_eq!(world.limiter.count(LOGIN_IDENTIFIER_SCOPE, "nobody"), 0);
}

#[tokio::test]
async fn should_reject_when_identifier_window_exhausted() {
    let world = world_with_alice().await;
    world.limiter.seed(LOGIN_IDENTIFIER_SCOPE, "alice", 5);

    let err = world
        .usecase()
        .execute(login_input("alice", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::RateLimited));
}

#[tokio::test]
async fn should_reject_when_ip_window_exhausted() {
    let world = world_with_alice().await;
    world.limiter.seed(LOGIN_IP_SCOPE, &test_ctx().ip, 10);

    let err = world
        .usecase()
        .execute(login_input("alice", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::RateLimited));
}

#[tokio::test]
async fn should_reset_identifier_window_but_not_ip_window_on_success() {
    let world = world_with_alice().await;
    world.limiter.seed(LOGIN_IDENTIFIER_SCOPE, "alice", 4);
    world.limiter.seed(LOGIN_IP_SCOPE, &test_ctx().ip, 4);

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    assert_eq!(world.limiter.count(LOGIN_IDENTIFIER_SCOPE, "alice"), 0);
    assert_eq!(world.limiter.count(LOGIN_IP_SCOPE, &test_ctx().ip), 4);
}

#[tokio::test]
async fn should_redirect_unverified_account_to_verification_before_password_check() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.email_verified = false;
    let world = LoginWorld::with_accounts(vec![account]);

    // Even a wrong password must not leak anything before verification.
    let outcome = world
        .usecase()
        .execute(login_input("alice", "Wr0ng!password"))
        .await
        .unwrap();

    let LoginOutcome::VerificationRequired { challenge_id } = outcome else {
        panic!("expected a verification challenge");
    };
    assert!(world.challenges.verification(challenge_id).is_some());
    let sent = world.mailer.handle().lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(world.stored_account("alice").failed_login_attempts, 0);
}

#[tokio::test]
async fn should_lock_after_three_failures_and_escalate_at_five() {
    let world = world_with_alice().await;
    let usecase = world.usecase();

    for _ in 0..2 {
        let _ = usecase.execute(login_input("alice", "Wr0ng!password")).await;
    }
    assert!(world.stored_account("alice").locked_until.is_none());

    let _ = usecase.execute(login_input("alice", "Wr0ng!password")).await;
    let soft = world.stored_account("alice");
    assert_eq!(soft.failed_login_attempts, 3);
    let soft_until = soft.locked_until.unwrap();
    assert!(soft_until <= Utc::now() + Duration::minutes(5));
    assert!(world.events.actions().contains(&"ACCOUNT_LOCKED".to_owned()));

    for _ in 0..2 {
        let _ = usecase.execute(login_input("alice", "Wr0ng!password")).await;
    }
    let hard = world.stored_account("alice");
    assert_eq!(hard.failed_login_attempts, 5);
    assert!(hard.locked_until.unwrap() > Utc::now() + Duration::minutes(20));
}

#[tokio::test]
async fn should_report_locked_only_after_correct_password() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.failed_login_attempts = 3;
    account.locked_until = Some(Utc::now() + Duration::minutes(5));
    let world = LoginWorld::with_accounts(vec![account]);
    let usecase = world.usecase();

    // Wrong password during a lock stays the generic credentials error.
    let wrong = usecase
        .execute(login_input("alice", "Wr0ng!password"))
        .await
        .unwrap_err();
    assert!(matches!(wrong, AccountsServiceError::AuthenticationFailed));

    let correct = usecase.execute(login_input("alice", PASSWORD)).await.unwrap_err();
    assert!(matches!(correct, AccountsServiceError::AccountLocked));
    // The correct attempt neither moved the counter nor cleared the lock.
    let stored = world.stored_account("alice");
    assert_eq!(stored.failed_login_attempts, 4);
    assert!(stored.locked_until.is_some());
}

#[tokio::test]
async fn should_clear_expired_lock_lazily_on_next_login() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.failed_login_attempts = 4;
    account.locked_until = Some(Utc::now() - Duration::seconds(1));
    let world = LoginWorld::with_accounts(vec![account]);

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    let stored = world.stored_account("alice");
    assert!(stored.locked_until.is_none());
    assert_eq!(stored.failed_login_attempts, 0);
    let actions = world.events.actions();
    assert!(actions.contains(&"ACCOUNT_UNLOCKED".to_owned()));
    assert!(actions.contains(&"LOGIN".to_owned()));
}

#[tokio::test]
async fn should_require_mfa_on_untrusted_device() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let world = LoginWorld::with_accounts(vec![account]);

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    let LoginOutcome::MfaRequired {
        challenge_id,
        method,
    } = outcome
    else {
        panic!("expected an MFA challenge");
    };
    assert_eq!(method, MfaMethod::Totp);
    let pending = world.challenges.pending_mfa(challenge_id).unwrap();
    assert!(pending.otp.is_none());
    // No session side effects yet: no device trust, no LOGIN event.
    assert!(world.devices.handle().lock().unwrap().is_empty());
    assert!(!world.events.actions().contains(&"LOGIN".to_owned()));
}

#[tokio::test]
async fn should_email_login_code_for_email_otp_method() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::EmailOtp;
    let world = LoginWorld::with_accounts(vec![account]);

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    let LoginOutcome::MfaRequired { challenge_id, .. } = outcome else {
        panic!("expected an MFA challenge");
    };
    let pending = world.challenges.pending_mfa(challenge_id).unwrap();
    let code = pending.otp.unwrap();
    let sent = world.mailer.handle().lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text_body.contains(&code));
}

#[tokio::test]
async fn should_bypass_mfa_on_trusted_device() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let account_id = account.id;
    let ctx = test_ctx();
    let now = Utc::now();
    let world = LoginWorld::with_accounts(vec![account]);
    world.devices.handle().lock().unwrap().push(TrustedDevice {
        id: Uuid::now_v7(),
        account_id,
        fingerprint: device_fingerprint(&ctx),
        label: "Firefox on Linux".to_owned(),
        last_ip: Some(ctx.ip.clone()),
        active: true,
        expires_at: None,
        last_used_at: now,
        created_at: now,
    });

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    // Still only the seeded device row.
    assert_eq!(world.devices.handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_require_mfa_again_on_revoked_device() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let account_id = account.id;
    let ctx = test_ctx();
    let now = Utc::now();
    let world = LoginWorld::with_accounts(vec![account]);
    world.devices.handle().lock().unwrap().push(TrustedDevice {
        id: Uuid::now_v7(),
        account_id,
        fingerprint: device_fingerprint(&ctx),
        label: "Firefox on Linux".to_owned(),
        last_ip: Some(ctx.ip.clone()),
        active: false,
        expires_at: None,
        last_used_at: now,
        created_at: now,
    });

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::MfaRequired { .. }));
}

#[tokio::test]
async fn should_flag_logins_spread_across_many_addresses() {
    let world = world_with_alice().await;
    let account_id = world.stored_account("alice").id;
    let recent = Utc::now() - Duration::minutes(10);
    for ip in ["198.51.100.1", "198.51.100.2", "198.51.100.3", "198.51.100.4"] {
        world.events.push_record(account_id, "LOGIN", ip, recent);
    }

    let outcome = world.usecase().execute(login_input("alice", PASSWORD)).await.unwrap();

    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
    assert!(world
        .events
        .actions()
        .contains(&"SUSPICIOUS_ACTIVITY".to_owned()));
}

#[tokio::test]
async fn should_not_flag_logins_from_few_addresses() {
    let world = world_with_alice().await;
    let account_id = world.stored_account("alice").id;
    let recent = Utc::now() - Duration::minutes(10);
    for ip in ["198.51.100.1", "198.51.100.2"] {
        world.events.push_record(account_id, "LOGIN", ip, recent);
    }

    let outcome = world
        .usecase()
        .execute(LoginInput {
            identifier: "alice".to_owned(),
            password: PASSWORD.to_owned(),
            remember_me: true,
            ctx: ctx_from("198.51.100.9", "Chrome on Windows"),
        })
        .await
        .unwrap();

    let LoginOutcome::Authenticated(session) = outcome else {
        panic!("expected an authenticated session");
    };
    assert!(session.remember_me);
    assert!(!world
        .events
        .actions()
        .contains(&"SUSPICIOUS_ACTIVITY".to_owned()));
}
