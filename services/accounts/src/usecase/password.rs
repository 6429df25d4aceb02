use tracing::warn;
use url::Url;
use uuid::Uuid;

use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{AccountStore, Mailer, RateLimitStore, SecurityEventStore};
use crate::domain::types::{
    PASSWORD_RESET_LIMIT, PASSWORD_RESET_SCOPE, RESET_TOKEN_MAX_AGE_SECS, RequestContext,
    SecurityEvent, validate_email,
};
use crate::error::AccountsServiceError;
use crate::security::link_token::LinkTokens;
use crate::security::password;
use crate::usecase::events::record;

// ── ChangePassword ───────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub account_id: Uuid,
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
    pub ctx: RequestContext,
}

pub struct ChangePasswordUseCase<A, E>
where
    A: AccountStore,
    E: SecurityEventStore,
{
    pub accounts: A,
    pub events: E,
}

impl<A, E> ChangePasswordUseCase<A, E>
where
    A: AccountStore,
    E: SecurityEventStore,
{
    pub async fn execute(&self, input: ChangePasswordInput) -> Result<(), AccountsServiceError> {
        let account = self
            .accounts
            .find_by_id(input.account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;

        // 1. The session alone is not enough; the current password is
        if !password::verify_password(&input.current_password, &account.password_hash).await? {
            return Err(AccountsServiceError::AuthenticationFailed);
        }

        // 2. Same rules as registration
        if input.new_password != input.new_password_confirm {
            return Err(AccountsServiceError::Validation(
                "The two password fields didn't match.".to_owned(),
            ));
        }
        password::validate_password_strength(&input.new_password)?;

        // 3. Rehash + store
        let password_hash = password::hash_password(&input.new_password).await?;
        self.accounts.update_password(account.id, &password_hash).await?;

        record(
            &self.events,
            SecurityEvent::new(Some(account.id), SecurityAction::PasswordChanged, &input.ctx),
        )
        .await;
        Ok(())
    }
}

// ── RequestPasswordReset ─────────────────────────────────────────────────

pub struct RequestPasswordResetUseCase<A, R, M>
where
    A: AccountStore,
    R: RateLimitStore,
    M: Mailer,
{
    pub accounts: A,
    pub limiter: R,
    pub mailer: M,
    pub link_tokens: LinkTokens,
    /// Public site origin the emailed reset link points at.
    pub public_base_url: String,
}

impl<A, R, M> RequestPasswordResetUseCase<A, R, M>
where
    A: AccountStore,
    R: RateLimitStore,
    M: Mailer,
{
    /// Always completes without revealing whether the email is registered.
    /// Unknown emails still count against the per-email window, so probing
    /// stays bounded.
    pub async fn execute(&self, email: &str) -> Result<(), AccountsServiceError> {
        let email = validate_email(email)?;

        if self
            .limiter
            .is_limited(PASSWORD_RESET_SCOPE, &email, PASSWORD_RESET_LIMIT)
            .await?
        {
            return Err(AccountsServiceError::RateLimited);
        }

        if let Some(account) = self.accounts.find_by_email(&email).await? {
            let token = self.link_tokens.issue(&email);
            let link = reset_link(&self.public_base_url, &email, &token)?;
            send_reset_email(&self.mailer, &account.username, &email, link.as_str()).await;
        }

        if let Err(e) = self
            .limiter
            .increment(PASSWORD_RESET_SCOPE, &email, PASSWORD_RESET_LIMIT)
            .await
        {
            warn!(error = %e, "password reset limiter increment failed");
        }
        Ok(())
    }
}

fn reset_link(base: &str, email: &str, token: &str) -> Result<Url, AccountsServiceError> {
    Url::parse_with_params(
        &format!("{}/reset-password", base.trim_end_matches('/')),
        [("email", email), ("token", token)],
    )
    .map_err(|e| AccountsServiceError::Internal(e.into()))
}

async fn send_reset_email<M: Mailer>(mailer: &M, username: &str, email: &str, link: &str) {
    let subject = "Reset your Roomlet password";
    let text = format!(
        "Hi {username},\n\nUse this link to choose a new password:\n\n{link}\n\n\
         The link expires in 60 minutes. If you did not ask for a reset, you can\n\
         ignore this email.\n"
    );
    let html = format!(
        "<p>Hi {username},</p>\
         <p><a href=\"{link}\">Choose a new password</a></p>\
         <p>The link expires in 60 minutes. If you did not ask for a reset, you can \
         ignore this email.</p>"
    );
    if let Err(e) = mailer.send(email, subject, &text, &html).await {
        warn!(error = %e, "password reset email failed");
    }
}

// ── CompletePasswordReset ────────────────────────────────────────────────

pub struct CompletePasswordResetInput {
    pub email: String,
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
    pub ctx: RequestContext,
}

pub struct CompletePasswordResetUseCase<A, E>
where
    A: AccountStore,
    E: SecurityEventStore,
{
    pub accounts: A,
    pub events: E,
    pub link_tokens: LinkTokens,
}

impl<A, E> CompletePasswordResetUseCase<A, E>
where
    A: AccountStore,
    E: SecurityEventStore,
{
    pub async fn execute(
        &self,
        input: CompletePasswordResetInput,
    ) -> Result<(), AccountsServiceError> {
        let email = validate_email(&input.email)?;

        // 1. One bool covers malformed, mismatched and expired tokens alike
        if !self
            .link_tokens
            .verify(&input.token, &email, RESET_TOKEN_MAX_AGE_SECS)
        {
            return Err(AccountsServiceError::AuthenticationFailed);
        }

        // 2. Same rules as registration
        if input.new_password != input.new_password_confirm {
            return Err(AccountsServiceError::Validation(
                "The two password fields didn't match.".to_owned(),
            ));
        }
        password::validate_password_strength(&input.new_password)?;

        // 3. Rehash; a valid token for a vanished account stays a generic
        //    failure
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AccountsServiceError::AuthenticationFailed)?;
        let password_hash = password::hash_password(&input.new_password).await?;
        self.accounts.update_password(account.id, &password_hash).await?;

        // 4. The reset proves mailbox control; any lockout is stale
        self.accounts.reset_lockout(account.id).await?;

        record(
            &self.events,
            SecurityEvent::new(Some(account.id), SecurityAction::PasswordReset, &input.ctx),
        )
        .await;
        Ok(())
    }
}
