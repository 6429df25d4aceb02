use chrono::{Duration, Utc};

use roomlet_accounts::domain::types::PASSWORD_RESET_SCOPE;
use roomlet_accounts::error::AccountsServiceError;
use roomlet_accounts::security::link_token::LinkTokens;
use roomlet_accounts::security::password::{hash_password, verify_password};
use roomlet_accounts::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, CompletePasswordResetInput,
    CompletePasswordResetUseCase, RequestPasswordResetUseCase,
};

use crate::helpers::{
    MockAccountStore, MockEventStore, MockMailer, MockRateLimiter, account_with, test_ctx,
};

const PASSWORD: &str = "Str0ng!pass";
const NEW_PASSWORD: &str = "N3w!secret";
const LINK_SECRET: &str = "reset-link-test-secret";
const BASE_URL: &str = "https://roomlet.example.com";

async fn seeded_store() -> MockAccountStore {
    let hash = hash_password(PASSWORD).await.unwrap();
    MockAccountStore::new(vec![account_with("alice", "alice@example.com", &hash)])
}

fn stored_hash(accounts: &MockAccountStore) -> String {
    accounts.handle().lock().unwrap()[0].password_hash.clone()
}

#[tokio::test]
async fn should_change_password_with_correct_current_one() {
    let accounts = seeded_store().await;
    let events = MockEventStore::empty();
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = ChangePasswordUseCase {
        accounts: accounts.clone(),
        events: events.clone(),
    };

    usecase
        .execute(ChangePasswordInput {
            account_id,
            current_password: PASSWORD.to_owned(),
            new_password: NEW_PASSWORD.to_owned(),
            new_password_confirm: NEW_PASSWORD.to_owned(),
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    assert!(verify_password(NEW_PASSWORD, &stored_hash(&accounts)).await.unwrap());
    assert!(events.actions().contains(&"PASSWORD_CHANGED".to_owned()));
}

#[tokio::test]
async fn should_refuse_change_with_wrong_current_password() {
    let accounts = seeded_store().await;
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let before = stored_hash(&accounts);
    let usecase = ChangePasswordUseCase {
        accounts: accounts.clone(),
        events: MockEventStore::empty(),
    };

    let err = usecase
        .execute(ChangePasswordInput {
            account_id,
            current_password: "Wr0ng!password".to_owned(),
            new_password: NEW_PASSWORD.to_owned(),
            new_password_confirm: NEW_PASSWORD.to_owned(),
            ctx: test_ctx(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::AuthenticationFailed));
    assert_eq!(stored_hash(&accounts), before);
}

#[tokio::test]
async fn should_hold_new_password_to_registration_rules() {
    let accounts = seeded_store().await;
    let account_id = accounts.handle().lock().unwrap()[0].id;
    let usecase = ChangePasswordUseCase {
        accounts,
        events: MockEventStore::empty(),
    };

    let err = usecase
        .execute(ChangePasswordInput {
            account_id,
            current_password: PASSWORD.to_owned(),
            new_password: "weak".to_owned(),
            new_password_confirm: "weak".to_owned(),
            ctx: test_ctx(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AccountsServiceError::Validation(_)));
}

#[tokio::test]
async fn should_answer_reset_requests_identically_for_unknown_email() {
    let accounts = seeded_store().await;
    let limiter = MockRateLimiter::empty();
    let mailer = MockMailer::empty();
    let usecase = RequestPasswordResetUseCase {
        accounts,
        limiter: limiter.clone(),
        mailer: mailer.clone(),
        link_tokens: LinkTokens::new(LINK_SECRET),
        public_base_url: BASE_URL.to_owned(),
    };

    usecase.execute("nobody@example.com").await.unwrap();

    // No email out, but the probe still burned a slot in the window.
    assert!(mailer.handle().lock().unwrap().is_empty());
    assert_eq!(limiter.count(PASSWORD_RESET_SCOPE, "nobody@example.com"), 1);
}

#[tokio::test]
async fn should_email_signed_reset_link_for_known_email() {
    let accounts = seeded_store().await;
    let mailer = MockMailer::empty();
    let usecase = RequestPasswordResetUseCase {
        accounts,
        limiter: MockRateLimiter::empty(),
        mailer: mailer.clone(),
        link_tokens: LinkTokens::new(LINK_SECRET),
        public_base_url: BASE_URL.to_owned(),
    };

    usecase.execute("Alice@Example.com").await.unwrap();

    let sent = mailer.handle().lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    assert!(sent[0]
        .text_body
        .contains("https://roomlet.example.com/reset-password?email=alice%40example.com&token="));
}

#[tokio::test]
async fn should_limit_reset_requests_per_email() {
    let accounts = seeded_store().await;
    let limiter = MockRateLimiter::empty();
    limiter.seed(PASSWORD_RESET_SCOPE, "alice@example.com", 3);
    let usecase = RequestPasswordResetUseCase {
        accounts,
        limiter,
        mailer: MockMailer::empty(),
        link_tokens: LinkTokens::new(LINK_SECRET),
        public_base_url: BASE_URL.to_owned(),
    };

    let err = usecase.execute("alice@example.com").await.unwrap_err();

    assert!(matches!(err, AccountsServiceError::RateLimited));
}

#[tokio::test]
async fn should_complete_reset_and_clear_any_lockout() {
    let hash = hash_password(PASSWORD).await.unwrap();
    let mut account = account_with("alice", "alice@example.com", &hash);
    account.failed_login_attempts = 5;
    account.locked_until = Some(Utc::now() + Duration::minutes(30));
    let accounts = MockAccountStore::new(vec![account]);
    let events = MockEventStore::empty();
    let tokens = LinkTokens::new(LINK_SECRET);
    let usecase = CompletePasswordResetUseCase {
        accounts: accounts.clone(),
        events: events.clone(),
        link_tokens: LinkTokens::new(LINK_SECRET),
    };

    usecase
        .execute(CompletePasswordResetInput {
            email: "alice@example.com".to_owned(),
            token: tokens.issue("alice@example.com"),
            new_password: NEW_PASSWORD.to_owned(),
            new_password_confirm: NEW_PASSWORD.to_owned(),
            ctx: test_ctx(),
        })
        .await
        .unwrap();

    let stored = accounts.handle().lock().unwrap()[0].clone();
    assert!(verify_password(NEW_PASSWORD, &stored.password_hash).await.unwrap());
    assert!(stored.locked_until.is_none());
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(events.actions().contains(&"PASSWORD_RESET".to_owned()));
}

#[tokio::test]
async fn should_reject_token_for_other_email_or_wrong_secret() {
    let accounts = seeded_store().await;
    let before = stored_hash(&accounts);
    let usecase = CompletePasswordResetUseCase {
        accounts: accounts.clone(),
        events: MockEventStore::empty(),
        link_tokens: LinkTokens::new(LINK_SECRET),
    };

    // Token minted for a different address.
    let foreign = LinkTokens::new(LINK_SECRET).issue("other@example.com");
    // Token minted under a different signing secret.
    let forged = LinkTokens::new("some-other-secret").issue("alice@example.com");

    for token in [foreign, forged, "garbage".to_owned()] {
        let err = usecase
            .execute(CompletePasswordResetInput {
                email: "alice@example.com".to_owned(),
                token,
                new_password: NEW_PASSWORD.to_owned(),
                new_password_confirm: NEW_PASSWORD.to_owned(),
                ctx: test_ctx(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountsServiceError::AuthenticationFailed));
    }
    assert_eq!(stored_hash(&accounts), before);
}
