use chrono::{Duration, Utc};
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use roomlet_accounts::domain::repository::ChallengeCache;
use roomlet_accounts::domain::types::{Account, PendingMfa};
use roomlet_accounts::error::AccountsServiceError;
use roomlet_accounts::security::backup::hash_code;
use roomlet_accounts::security::password::hash_password;
use roomlet_accounts::security::totp::generate_secret;
use roomlet_accounts::usecase::mfa::{ResendMfaUseCase, VerifyMfaInput, VerifyMfaUseCase};
use roomlet_domain::account::MfaMethod;

use crate::helpers::{
    JWT_SECRET, MockAccountStore, MockAttemptStore, MockBackupCodeStore, MockChallengeCache,
    MockDeviceStore, MockEventStore, MockMailer, test_ctx,
};

const PASSWORD: &str = "Str0ng!pass";

struct MfaWorld {
    accounts: MockAccountStore,
    backup_codes: MockBackupCodeStore,
    devices: MockDeviceStore,
    events: MockEventStore,
    attempts: MockAttemptStore,
    challenges: MockChallengeCache,
    mailer: MockMailer,
}

impl MfaWorld {
    fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: MockAccountStore::new(accounts),
            backup_codes: MockBackupCodeStore::empty(),
            devices: MockDeviceStore::empty(),
            events: MockEventStore::empty(),
            attempts: MockAttemptStore::empty(),
            challenges: MockChallengeCache::empty(),
            mailer: MockMailer::empty(),
        }
    }

    fn verify_usecase(
        &self,
    ) -> VerifyMfaUseCase<
        MockAccountStore,
        MockBackupCodeStore,
        MockDeviceStore,
        MockEventStore,
        MockAttemptStore,
        MockChallengeCache,
    > {
        VerifyMfaUseCase {
            accounts: self.accounts.clone(),
            backup_codes: self.backup_codes.clone(),
            devices: self.devices.clone(),
            events: self.events.clone(),
            attempts: self.attempts.clone(),
            challenges: self.challenges.clone(),
            jwt_secret: JWT_SECRET.to_owned(),
        }
    }

    fn resend_usecase(&self) -> ResendMfaUseCase<MockAccountStore, MockChallengeCache, MockMailer> {
        ResendMfaUseCase {
            accounts: self.accounts.clone(),
            challenges: self.challenges.clone(),
            mailer: self.mailer.clone(),
        }
    }

    async fn seed_challenge(&self, pending: &PendingMfa) -> Uuid {
        let challenge_id = Uuid::new_v4();
        self.challenges.set_mfa(challenge_id, pending).await.unwrap();
        challenge_id
    }
}

async fn totp_account(secret: &str) -> Account {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = crate::helpers::account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(secret.to_owned());
    account
}

async fn email_otp_account() -> Account {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = crate::helpers::account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::EmailOtp;
    account
}

fn totp_challenge(account_id: Uuid) -> PendingMfa {
    PendingMfa {
        account_id,
        method: MfaMethod::Totp,
        otp: None,
        otp_issued_at: None,
        failures: 0,
        resends: 0,
        remember_me: false,
        created_at: Utc::now(),
    }
}

fn email_challenge(account_id: Uuid, code: &str) -> PendingMfa {
    let now = Utc::now();
    PendingMfa {
        account_id,
        method: MfaMethod::EmailOtp,
        otp: Some(code.to_owned()),
        otp_issued_at: Some(now),
        failures: 0,
        resends: 0,
        remember_me: true,
        created_at: now,
    }
}

fn current_totp_code(secret: &str) -> String {
    let totp = TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(secret.to_owned()).to_bytes().unwrap(),
    )
    .unwrap();
    totp.generate_current().unwrap()
}

fn verify_input(challenge_id: Uuid, code: &str) -> VerifyMfaInput {
    VerifyMfaInput {
        challenge_id,
        code: code.to_owned(),
        ctx: test_ctx(),
    }
}

#[tokio::test]
async fn should_authenticate_with_current_authenticator_code() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&totp_challenge(account_id)).await;

    let session = world
        .verify_usecase()
        .execute(verify_input(challenge_id, &current_totp_code(&secret)))
        .await
        .unwrap();

    assert!(!session.token.is_empty());
    assert!(world.challenges.pending_mfa(challenge_id).is_none());
    let actions = world.events.actions();
    assert!(actions.contains(&"LOGIN_MFA".to_owned()));
    assert!(actions.contains(&"DEVICE_ADDED".to_owned()));
    assert_eq!(world.devices.handle().lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_consume_backup_code_exactly_once() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    world
        .backup_codes
        .handle()
        .lock()
        .unwrap()
        .insert(account_id, vec![hash_code("11112222"), hash_code("33334444")]);

    // First use: not a valid TOTP code, so it falls back to the backup set.
    let first_id = world.seed_challenge(&totp_challenge(account_id)).await;
    let session = world
        .verify_usecase()
        .execute(verify_input(first_id, "11112222"))
        .await
        .unwrap();
    assert!(!session.token.is_empty());

    let remaining = world.backup_codes.handle().lock().unwrap()[&account_id].clone();
    assert_eq!(remaining, vec![hash_code("33334444")]);

    // Replay on a fresh challenge fails like any wrong code.
    let second_id = world.seed_challenge(&totp_challenge(account_id)).await;
    let err = world
        .verify_usecase()
        .execute(verify_input(second_id, "11112222"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountsServiceError::AuthenticationFailed));
    assert_eq!(world.challenges.pending_mfa(second_id).unwrap().failures, 1);
}

#[tokio::test]
async fn should_burn_challenge_after_five_wrong_codes() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&totp_challenge(account_id)).await;
    let usecase = world.verify_usecase();

    // Eight digits can never match a six-digit authenticator code.
    for _ in 0..4 {
        let err = usecase
            .execute(verify_input(challenge_id, "00000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountsServiceError::AuthenticationFailed));
    }
    let fifth = usecase
        .execute(verify_input(challenge_id, "00000000"))
        .await
        .unwrap_err();
    assert!(matches!(fifth, AccountsServiceError::ChallengeExhausted));

    // Marker is gone; even the right code restarts the login.
    let after = usecase
        .execute(verify_input(challenge_id, &current_totp_code(&secret)))
        .await
        .unwrap_err();
    assert!(matches!(after, AccountsServiceError::MfaSessionExpired));
}

#[tokio::test]
async fn should_expire_challenge_after_five_minutes() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let mut pending = totp_challenge(account_id);
    pending.created_at = Utc::now() - Duration::seconds(301);
    let challenge_id = world.seed_challenge(&pending).await;

    let err = world
        .verify_usecase()
        .execute(verify_input(challenge_id, &current_totp_code(&secret)))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::MfaSessionExpired));
}

#[tokio::test]
async fn should_authenticate_with_emailed_code() {
    let account = email_otp_account().await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&email_challenge(account_id, "123456")).await;

    let session = world
        .verify_usecase()
        .execute(verify_input(challenge_id, " 123456 "))
        .await
        .unwrap();

    // The remember-me choice from the password step carries through.
    assert!(session.remember_me);
    assert!(world.challenges.pending_mfa(challenge_id).is_none());
}

#[tokio::test]
async fn should_reject_expired_emailed_code_but_keep_challenge() {
    let account = email_otp_account().await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let mut pending = email_challenge(account_id, "123456");
    pending.otp_issued_at = Some(Utc::now() - Duration::seconds(301));
    let challenge_id = world.seed_challenge(&pending).await;

    let err = world
        .verify_usecase()
        .execute(verify_input(challenge_id, "123456"))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::ChallengeExpired));
    // A resend can still rotate a fresh code in.
    assert!(world.challenges.pending_mfa(challenge_id).is_some());
}

#[tokio::test]
async fn should_resend_rotated_code_for_email_method() {
    let account = email_otp_account().await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&email_challenge(account_id, "123456")).await;

    let output = world.resend_usecase().execute(challenge_id).await.unwrap();

    assert!(output.email_sent);
    let pending = world.challenges.pending_mfa(challenge_id).unwrap();
    assert_ne!(pending.otp.as_deref(), Some("123456"));
    assert_eq!(pending.resends, 1);
    let sent = world.mailer.handle().lock().unwrap().clone();
    assert!(sent[0].text_body.contains(pending.otp.as_deref().unwrap()));
}

#[tokio::test]
async fn should_burn_challenge_at_resend_cap() {
    let account = email_otp_account().await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let mut pending = email_challenge(account_id, "123456");
    pending.resends = 3;
    let challenge_id = world.seed_challenge(&pending).await;

    let err = world.resend_usecase().execute(challenge_id).await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::ChallengeExhausted));
    assert!(world.challenges.pending_mfa(challenge_id).is_none());
}

#[tokio::test]
async fn should_refuse_resend_for_authenticator_method() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&totp_challenge(account_id)).await;

    let err = world.resend_usecase().execute(challenge_id).await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::Validation(_)));
}

#[tokio::test]
async fn should_restart_login_when_mfa_was_disabled_mid_challenge() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let account_id = account.id;
    let world = MfaWorld::with_accounts(vec![account]);
    let challenge_id = world.seed_challenge(&totp_challenge(account_id)).await;
    // Enrollment changed between the password step and the code submission.
    world
        .accounts
        .handle()
        .lock()
        .unwrap()
        .iter_mut()
        .find(|a| a.id == account_id)
        .unwrap()
        .mfa_method = MfaMethod::None;

    let err = world
        .verify_usecase()
        .execute(verify_input(challenge_id, &current_totp_code(&secret)))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::MfaSessionExpired));
    assert!(world.challenges.pending_mfa(challenge_id).is_none());
}

#[tokio::test]
async fn should_reject_unknown_challenge() {
    let secret = generate_secret();
    let account = totp_account(&secret).await;
    let world = MfaWorld::with_accounts(vec![account]);

    let err = world
        .verify_usecase()
        .execute(verify_input(Uuid::new_v4(), "123456"))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::MfaSessionExpired));
}
