use totp_rs::{Algorithm, Secret, TOTP};

use roomlet_accounts::error::AccountsServiceError;
use roomlet_accounts::security::backup::hash_code;
use roomlet_accounts::security::password::hash_password;
use roomlet_accounts::usecase::enrollment::{
    RegenerateBackupCodesUseCase, SelectMfaMethodInput, SelectMfaMethodUseCase,
    StartTotpEnrollmentUseCase,
};
use roomlet_domain::account::MfaMethod;

use crate::helpers::{
    MockAccountStore, MockBackupCodeStore, MockEventStore, account_with, test_ctx,
};

const PASSWORD: &str = "Str0ng!pass";

async fn seeded_store() -> MockAccountStore {
    let hash = hash_password(PASSWORD).await.unwrap();
    MockAccountStore::new(vec![account_with("alice", "alice@example.com", &hash)])
}

fn current_code(secret: &str) -> String {
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

#[tokio::test]
async fn should_stash_pending_secret_without_enabling_totp() {
    let accounts = seeded_store().await;
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = StartTotpEnrollmentUseCase {
        accounts: accounts.clone(),
    };

    let output = usecase.execute(account_id).await.unwrap();

    assert!(output.otpauth_url.starts_with("otpauth://totp/Roomlet:alice?"));
    assert!(output.otpauth_url.contains(&output.secret));
    let stored = accounts.handle().lock().unwrap()[0].clone();
    assert_eq!(stored.totp_secret.as_deref(), Some(output.secret.as_str()));
    // Not enabled until a code confirms the authenticator holds the secret.
    assert_eq!(stored.mfa_method, MfaMethod::None);
}

#[tokio::test]
async fn should_refuse_enrollment_before_email_verification() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.email_verified = false;
    let account_id = account.id;
    let usecase = StartTotpEnrollmentUseCase {
        accounts: MockAccountStore::new(vec![account]),
    };

    let err = usecase.execute(account_id).await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::Validation(_)));
}

#[tokio::test]
async fn should_refuse_enrollment_while_totp_is_active() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let account_id = account.id;
    let usecase = StartTotpEnrollmentUseCase {
        accounts: MockAccountStore::new(vec![account]),
    };

    let err = usecase.execute(account_id).await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::Validation(_)));
}

#[tokio::test]
async fn should_enable_totp_with_confirming_code_and_issue_backup_codes() {
    let accounts = seeded_store().await;
    let backup_codes = MockBackupCodeStore::empty();
    let events = MockEventStore::empty();
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let start = StartTotpEnrollmentUseCase {
        accounts: accounts.clone(),
    };
    let secret = start.execute(account_id).await.unwrap().secret;
    let usecase = SelectMfaMethodUseCase {
        accounts: accounts.clone(),
        backup_codes: backup_codes.clone(),
        events: events.clone(),
    };

    let output = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::Totp,
            code: Some(current_code(&secret)),
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    let codes = output.backup_codes.unwrap();
    assert_eq!(codes.len(), 10);
    let stored_hashes = backup_codes.handle().lock().unwrap()[&account_id].clone();
    assert_eq!(stored_hashes.len(), 10);
    for code in &codes {
        assert!(stored_hashes.contains(&hash_code(code)));
    }
    assert_eq!(
        accounts.handle().lock().unwrap()[0].mfa_method,
        MfaMethod::Totp
    );
    assert!(events.actions().contains(&"MFA_ENABLED".to_owned()));
}

#[tokio::test]
async fn should_refuse_totp_without_pending_secret_or_with_wrong_code() {
    let accounts = seeded_store().await;
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = SelectMfaMethodUseCase {
        accounts: accounts.clone(),
        backup_codes: MockBackupCodeStore::empty(),
        events: MockEventStore::empty(),
    };

    // No enrollment started yet.
    let missing = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::Totp,
            code: Some("123456".to_owned()),
            ctx: test_ctx(),
        })
        .await
        .unwrap_err();
    assert!(matches!(missing, AccountsServiceError::Validation(_)));

    // Pending secret, but the code does not prove it. Eight digits can never
    // match a six-digit authenticator code.
    StartTotpEnrollmentUseCase {
        accounts: accounts.clone(),
    }
    .execute(account_id)
    .await
    .unwrap();
    let wrong = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::Totp,
            code: Some("00000000".to_owned()),
            ctx: test_ctx(),
        })
        .await
        .unwrap_err();
    assert!(matches!(wrong, AccountsServiceError::AuthenticationFailed));
    assert_eq!(
        accounts.handle().lock().unwrap()[0].mfa_method,
        MfaMethod::None
    );
}

#[tokio::test]
async fn should_enable_email_codes_without_confirmation_code() {
    let accounts = seeded_store().await;
    let events = MockEventStore::empty();
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = SelectMfaMethodUseCase {
        accounts: accounts.clone(),
        backup_codes: MockBackupCodeStore::empty(),
        events: events.clone(),
    };

    let output = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::EmailOtp,
            code: None,
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    assert!(output.backup_codes.is_none());
    assert_eq!(
        accounts.handle().lock().unwrap()[0].mfa_method,
        MfaMethod::EmailOtp
    );
    assert!(events.actions().contains(&"MFA_ENABLED".to_owned()));
}

#[tokio::test]
async fn should_disable_mfa_and_wipe_secret_and_backup_codes() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let account_id = account.id;
    let accounts = MockAccountStore::new(vec![account]);
    let backup_codes = MockBackupCodeStore::empty();
    backup_codes
        .handle()
        .lock()
        .unwrap()
        .insert(account_id, vec![hash_code("11112222")]);
    let events = MockEventStore::empty();
    let usecase = SelectMfaMethodUseCase {
        accounts: accounts.clone(),
        backup_codes: backup_codes.clone(),
        events: events.clone(),
    };

    let output = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::None,
            code: None,
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    assert!(output.backup_codes.is_none());
    let stored = accounts.handle().lock().unwrap()[0].clone();
    assert_eq!(stored.mfa_method, MfaMethod::None);
    assert!(stored.totp_secret.is_none());
    assert!(!backup_codes.handle().lock().unwrap().contains_key(&account_id));
    assert!(events.actions().contains(&"MFA_DISABLED".to_owned()));
}

#[tokio::test]
async fn should_treat_selecting_the_active_method_as_noop() {
    let accounts = seeded_store().await;
    let events = MockEventStore::empty();
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = SelectMfaMethodUseCase {
        accounts,
        backup_codes: MockBackupCodeStore::empty(),
        events: events.clone(),
    };

    let output = usecase
        .execute(SelectMfaMethodInput {
            account_id,
            method: MfaMethod::None,
            code: None,
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    assert!(output.backup_codes.is_none());
    assert!(events.actions().is_empty());
}

#[tokio::test]
async fn should_replace_backup_codes_on_regeneration() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.mfa_method = MfaMethod::Totp;
    account.totp_secret = Some(roomlet_accounts::security::totp::generate_secret());
    let account_id = account.id;
    let accounts = MockAccountStore::new(vec![account]);
    let backup_codes = MockBackupCodeStore::empty();
    let old_hash = hash_code("11112222");
    backup_codes
        .handle()
        .lock()
        .unwrap()
        .insert(account_id, vec![old_hash.clone()]);
    let events = MockEventStore::empty();
    let usecase = RegenerateBackupCodesUseCase {
        accounts,
        backup_codes: backup_codes.clone(),
        events: events.clone(),
    };

    let codes = usecase.execute(account_id, &test_ctx()).await.unwrap();

    assert_eq!(codes.len(), 10);
    let stored_hashes = backup_codes.handle().lock().unwrap()[&account_id].clone();
    assert_eq!(stored_hashes.len(), 10);
    assert!(!stored_hashes.contains(&old_hash));
    assert!(events
        .actions()
        .contains(&"BACKUP_CODES_REGENERATED".to_owned()));
}

#[tokio::test]
async fn should_refuse_backup_codes_without_authenticator_method() {
    let accounts = seeded_store().await;
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = RegenerateBackupCodesUseCase {
        accounts,
        backup_codes: MockBackupCodeStore::empty(),
        events: MockEventStore::empty(),
    };

    let err = usecase.execute(account_id, &test_ctx()).await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::Validation(_)));
}
