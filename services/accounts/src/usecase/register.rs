use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use roomlet_domain::account::AccountKind;
use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{
    AccountStore, ChallengeCache, Mailer, RateLimitStore, SecurityEventStore,
};
use crate::domain::types::{
    Account, MAX_OTP_FAILURES, MAX_OTP_RESENDS, NewAccount, OTP_LEN, PendingVerification,
    REGISTRATION_LIMIT, REGISTRATION_SCOPE, RESEND_VERIFICATION_LIMIT, RESEND_VERIFICATION_SCOPE,
    RequestContext, SecurityEvent, validate_email, validate_otp, validate_phone, validate_username,
};
use crate::error::AccountsServiceError;
use crate::security::{otp, password};
use crate::usecase::events::record;
use crate::usecase::session::issue_session_token;

/// Create the pending-verification entry for an account and deliver its
/// first code. Returns the challenge id and whether the email went out;
/// delivery is one best-effort attempt, never a flow abort.
pub(crate) async fn issue_verification_challenge<C, M>(
    challenges: &C,
    mailer: &M,
    account: &Account,
) -> Result<(Uuid, bool), AccountsServiceError>
where
    C: ChallengeCache,
    M: Mailer,
{
    let challenge_id = Uuid::new_v4();
    let pending = PendingVerification {
        account_id: account.id,
        email: account.email.clone(),
        code: otp::generate_numeric_code(OTP_LEN),
        code_issued_at: Utc::now(),
        failures: 0,
        resends: 0,
    };
    challenges.set_verification(challenge_id, &pending).await?;
    let email_sent =
        send_verification_email(mailer, &account.username, &account.email, &pending.code).await;
    Ok((challenge_id, email_sent))
}

async fn send_verification_email<M: Mailer>(
    mailer: &M,
    username: &str,
    email: &str,
    code: &str,
) -> bool {
    let subject = "Verify your Roomlet email";
    let text = format!(
        "Hi {username},\n\nYour verification code is {code}. It expires in 10 minutes.\n\n\
         If you did not create a Roomlet account, you can ignore this email.\n"
    );
    let html = format!(
        "<p>Hi {username},</p>\
         <p>Your verification code is <strong>{code}</strong>. It expires in 10 minutes.</p>\
         <p>If you did not create a Roomlet account, you can ignore this email.</p>"
    );
    match mailer.send(email, subject, &text, &html).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "verification email failed");
            false
        }
    }
}

// ── Register ─────────────────────────────────────────────────────────────

pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
    pub kind: AccountKind,
    pub ctx: RequestContext,
}

#[derive(Debug)]
pub struct RegisterOutput {
    pub account: Account,
    pub challenge_id: Uuid,
    pub email_sent: bool,
}

pub struct RegisterUseCase<A, R, C, E, M>
where
    A: AccountStore,
    R: RateLimitStore,
    C: ChallengeCache,
    E: SecurityEventStore,
    M: Mailer,
{
    pub accounts: A,
    pub limiter: R,
    pub challenges: C,
    pub events: E,
    pub mailer: M,
}

impl<A, R, C, E, M> RegisterUseCase<A, R, C, E, M>
where
    A: AccountStore,
    R: RateLimitStore,
    C: ChallengeCache,
    E: SecurityEventStore,
    M: Mailer,
{
    pub async fn execute(&self, input: RegisterInput) -> Result<RegisterOutput, AccountsServiceError> {
        // 1. Per-IP gate
        if self
            .limiter
            .is_limited(REGISTRATION_SCOPE, &input.ctx.ip, REGISTRATION_LIMIT)
            .await?
        {
            return Err(AccountsServiceError::RateLimited);
        }

        // 2. Validate + normalize
        let username = validate_username(&input.username)?;
        let email = validate_email(&input.email)?;
        let phone = validate_phone(input.phone.as_deref().unwrap_or(""))?;
        if input.password != input.password_confirm {
            return Err(AccountsServiceError::Validation(
                "The two password fields didn't match.".to_owned(),
            ));
        }
        password::validate_password_strength(&input.password)?;

        // 3. Duplicate pre-checks; concurrent registrations that slip past
        //    them land on the unique constraints and map to the same error.
        if self.accounts.find_by_username(&username).await?.is_some()
            || self.accounts.find_by_email(&email).await?.is_some()
        {
            return Err(AccountsServiceError::AccountExists);
        }
        if let Some(phone) = &phone {
            if self.accounts.find_by_phone(phone).await?.is_some() {
                return Err(AccountsServiceError::AccountExists);
            }
        }

        // 4. Hash + create (unverified, no MFA)
        let password_hash = password::hash_password(&input.password).await?;
        let account = self
            .accounts
            .create(&NewAccount {
                username,
                email,
                phone,
                password_hash,
                kind: input.kind,
            })
            .await?;

        // 5. First verification challenge
        let (challenge_id, email_sent) =
            issue_verification_challenge(&self.challenges, &self.mailer, &account).await?;

        // 6. Audit, then count the registration against the window
        record(
            &self.events,
            SecurityEvent::new(Some(account.id), SecurityAction::Register, &input.ctx),
        )
        .await;
        if let Err(e) = self
            .limiter
            .increment(REGISTRATION_SCOPE, &input.ctx.ip, REGISTRATION_LIMIT)
            .await
        {
            warn!(error = %e, "registration limiter increment failed");
        }

        Ok(RegisterOutput {
            account,
            challenge_id,
            email_sent,
        })
    }
}

// ── VerifyEmail ──────────────────────────────────────────────────────────

pub struct VerifyEmailInput {
    pub challenge_id: Uuid,
    pub code: String,
    pub ctx: RequestContext,
}

#[derive(Debug)]
pub struct VerifyEmailOutput {
    pub account: Account,
    pub token: String,
}

pub struct VerifyEmailUseCase<A, C, E>
where
    A: AccountStore,
    C: ChallengeCache,
    E: SecurityEventStore,
{
    pub accounts: A,
    pub challenges: C,
    pub events: E,
    pub jwt_secret: String,
}

impl<A, C, E> VerifyEmailUseCase<A, C, E>
where
    A: AccountStore,
    C: ChallengeCache,
    E: SecurityEventStore,
{
    pub async fn execute(
        &self,
        input: VerifyEmailInput,
    ) -> Result<VerifyEmailOutput, AccountsServiceError> {
        let code = validate_otp(&input.code)?;

        // 1. Challenge lookup
        let Some(mut pending) = self.challenges.get_verification(input.challenge_id).await? else {
            return Err(AccountsServiceError::ChallengeExpired);
        };

        // 2. Terminal states for the current code. The entry is kept in both
        //    cases so a resend can rotate in a fresh one.
        if pending.failures >= MAX_OTP_FAILURES {
            return Err(AccountsServiceError::ChallengeExhausted);
        }
        if pending.is_code_expired(Utc::now()) {
            return Err(AccountsServiceError::ChallengeExpired);
        }

        // 3. Wrong code: the count survives the request
        if pending.code != code {
            pending.failures += 1;
            let exhausted = pending.failures >= MAX_OTP_FAILURES;
            self.challenges
                .set_verification(input.challenge_id, &pending)
                .await?;
            return Err(if exhausted {
                AccountsServiceError::ChallengeExhausted
            } else {
                AccountsServiceError::AuthenticationFailed
            });
        }

        // 4. Success: mark verified, burn the challenge, open a session
        let mut account = self
            .accounts
            .find_by_id(pending.account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;
        self.accounts.set_email_verified(account.id).await?;
        account.email_verified = true;
        self.challenges.delete_verification(input.challenge_id).await?;
        record(
            &self.events,
            SecurityEvent::new(Some(account.id), SecurityAction::EmailVerified, &input.ctx),
        )
        .await;

        let (token, _) = issue_session_token(&account, &self.jwt_secret, false)?;
        Ok(VerifyEmailOutput { account, token })
    }
}

// ── ResendVerification ───────────────────────────────────────────────────

#[derive(Debug)]
pub struct ResendVerificationOutput {
    pub email_sent: bool,
}

pub struct ResendVerificationUseCase<A, C, R, M>
where
    A: AccountStore,
    C: ChallengeCache,
    R: RateLimitStore,
    M: Mailer,
{
    pub accounts: A,
    pub challenges: C,
    pub limiter: R,
    pub mailer: M,
}

impl<A, C, R, M> ResendVerificationUseCase<A, C, R, M>
where
    A: AccountStore,
    C: ChallengeCache,
    R: RateLimitStore,
    M: Mailer,
{
    pub async fn execute(
        &self,
        challenge_id: Uuid,
    ) -> Result<ResendVerificationOutput, AccountsServiceError> {
        // 1. Challenge lookup
        let Some(mut pending) = self.challenges.get_verification(challenge_id).await? else {
            return Err(AccountsServiceError::ChallengeExpired);
        };

        // 2. Per-challenge cap, then the per-email window
        if pending.resends >= MAX_OTP_RESENDS {
            return Err(AccountsServiceError::ChallengeExhausted);
        }
        if self
            .limiter
            .is_limited(
                RESEND_VERIFICATION_SCOPE,
                &pending.email,
                RESEND_VERIFICATION_LIMIT,
            )
            .await?
        {
            return Err(AccountsServiceError::RateLimited);
        }

        let account = self
            .accounts
            .find_by_id(pending.account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;

        // 3. Rotate the code; previous failures are forgiven with it
        pending.code = otp::generate_numeric_code(OTP_LEN);
        pending.code_issued_at = Utc::now();
        pending.failures = 0;
        pending.resends += 1;
        self.challenges.set_verification(challenge_id, &pending).await?;

        // 4. Deliver + count
        let email_sent =
            send_verification_email(&self.mailer, &account.username, &pending.email, &pending.code)
                .await;
        if let Err(e) = self
            .limiter
            .increment(
                RESEND_VERIFICATION_SCOPE,
                &pending.email,
                RESEND_VERIFICATION_LIMIT,
            )
            .await
        {
            warn!(error = %e, "resend limiter increment failed");
        }

        Ok(ResendVerificationOutput { email_sent })
    }
}
