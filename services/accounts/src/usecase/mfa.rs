use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use roomlet_domain::account::MfaMethod;
use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{
    AccountStore, BackupCodeStore, ChallengeCache, DeviceStore, LoginAttemptStore, Mailer,
    SecurityEventStore,
};
use crate::domain::types::{Account, MAX_OTP_FAILURES, MAX_OTP_RESENDS, OTP_LEN, RequestContext};
use crate::error::AccountsServiceError;
use crate::security::{backup, otp, totp};
use crate::usecase::login::{AuthenticatedSession, FinalizeLoginInput, finalize_login};

pub(crate) async fn send_login_code_email<M: Mailer>(
    mailer: &M,
    account: &Account,
    code: &str,
) -> bool {
    let subject = "Your Roomlet login code";
    let text = format!(
        "Hi {},\n\nYour login code is {code}. It expires in 5 minutes.\n\n\
         If you did not try to sign in, change your password now.\n",
        account.username
    );
    let html = format!(
        "<p>Hi {},</p>\
         <p>Your login code is <strong>{code}</strong>. It expires in 5 minutes.</p>\
         <p>If you did not try to sign in, change your password now.</p>",
        account.username
    );
    match mailer.send(&account.email, subject, &text, &html).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "login code email failed");
            false
        }
    }
}

// ── VerifyMfa ────────────────────────────────────────────────────────────

pub struct VerifyMfaInput {
    pub challenge_id: Uuid,
    /// Authenticator code, backup code, or emailed code depending on method.
    pub code: String,
    pub ctx: RequestContext,
}

pub struct VerifyMfaUseCase<A, B, D, E, L, C>
where
    A: AccountStore,
    B: BackupCodeStore,
    D: DeviceStore,
    E: SecurityEventStore,
    L: LoginAttemptStore,
    C: ChallengeCache,
{
    pub accounts: A,
    pub backup_codes: B,
    pub devices: D,
    pub events: E,
    pub attempts: L,
    pub challenges: C,
    pub jwt_secret: String,
}

impl<A, B, D, E, L, C> VerifyMfaUseCase<A, B, D, E, L, C>
where
    A: AccountStore,
    B: BackupCodeStore,
    D: DeviceStore,
    E: SecurityEventStore,
    L: LoginAttemptStore,
    C: ChallengeCache,
{
    pub async fn execute(
        &self,
        input: VerifyMfaInput,
    ) -> Result<AuthenticatedSession, AccountsServiceError> {
        // 1. Marker lookup; absence or age means the login restarts
        let Some(mut pending) = self.challenges.get_mfa(input.challenge_id).await? else {
            return Err(AccountsServiceError::MfaSessionExpired);
        };
        let now = Utc::now();
        if pending.is_expired(now) {
            return Err(AccountsServiceError::MfaSessionExpired);
        }

        // 2. Re-fetch the account; enrollment may have changed since the
        //    password step
        let account = self
            .accounts
            .find_by_id(pending.account_id)
            .await?
            .ok_or(AccountsServiceError::MfaSessionExpired)?;
        if !account.mfa_required() {
            self.challenges.delete_mfa(input.challenge_id).await?;
            return Err(AccountsServiceError::MfaSessionExpired);
        }

        // 3. Failure-cap pre-check: the marker is burned, login restarts
        if pending.failures >= MAX_OTP_FAILURES {
            self.challenges.delete_mfa(input.challenge_id).await?;
            return Err(AccountsServiceError::ChallengeExhausted);
        }

        // 4. Check the code along the marker's method. TOTP falls back to an
        //    atomic backup-code consume; both misses share one failure path.
        let code = input.code.trim();
        let valid = match pending.method {
            MfaMethod::Totp => {
                let by_totp = account
                    .totp_secret
                    .as_deref()
                    .is_some_and(|secret| totp::verify(secret, code));
                if by_totp {
                    true
                } else {
                    self.backup_codes
                        .consume(account.id, &backup::hash_code(code))
                        .await?
                }
            }
            MfaMethod::EmailOtp => {
                if pending.is_otp_expired(now) {
                    return Err(AccountsServiceError::ChallengeExpired);
                }
                pending.otp.as_deref() == Some(code)
            }
            MfaMethod::None => return Err(AccountsServiceError::MfaSessionExpired),
        };

        // 5. Wrong code: one shared counter across factor paths
        if !valid {
            pending.failures += 1;
            if pending.failures >= MAX_OTP_FAILURES {
                self.challenges.delete_mfa(input.challenge_id).await?;
                return Err(AccountsServiceError::ChallengeExhausted);
            }
            self.challenges.set_mfa(input.challenge_id, &pending).await?;
            return Err(AccountsServiceError::AuthenticationFailed);
        }

        // 6. Success: burn the marker, finalize with the remember-me choice
        //    made back at the password step
        self.challenges.delete_mfa(input.challenge_id).await?;
        finalize_login(
            &self.accounts,
            &self.devices,
            &self.events,
            &self.attempts,
            FinalizeLoginInput {
                account: &account,
                ctx: &input.ctx,
                remember_me: pending.remember_me,
                action: SecurityAction::LoginMfa,
                jwt_secret: &self.jwt_secret,
            },
        )
        .await
    }
}

// ── ResendMfaCode ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ResendMfaOutput {
    pub email_sent: bool,
}

pub struct ResendMfaUseCase<A, C, M>
where
    A: AccountStore,
    C: ChallengeCache,
    M: Mailer,
{
    pub accounts: A,
    pub challenges: C,
    pub mailer: M,
}

impl<A, C, M> ResendMfaUseCase<A, C, M>
where
    A: AccountStore,
    C: ChallengeCache,
    M: Mailer,
{
    pub async fn execute(&self, challenge_id: Uuid) -> Result<ResendMfaOutput, AccountsServiceError> {
        // 1. Marker lookup
        let Some(mut pending) = self.challenges.get_mfa(challenge_id).await? else {
            return Err(AccountsServiceError::MfaSessionExpired);
        };
        let now = Utc::now();
        if pending.is_expired(now) {
            return Err(AccountsServiceError::MfaSessionExpired);
        }

        // 2. Only emailed codes can be resent
        if pending.method != MfaMethod::EmailOtp {
            return Err(AccountsServiceError::Validation(
                "Codes can only be resent for email verification.".to_owned(),
            ));
        }

        // 3. Resend cap: the marker is burned, login restarts
        if pending.resends >= MAX_OTP_RESENDS {
            self.challenges.delete_mfa(challenge_id).await?;
            return Err(AccountsServiceError::ChallengeExhausted);
        }

        // 4. Rotate + persist + deliver. Failures carry across resends; the
        //    attempt cap spans the whole challenge.
        let account = self
            .accounts
            .find_by_id(pending.account_id)
            .await?
            .ok_or(AccountsServiceError::MfaSessionExpired)?;
        let code = otp::generate_numeric_code(OTP_LEN);
        pending.otp = Some(code.clone());
        pending.otp_issued_at = Some(now);
        pending.resends += 1;
        self.challenges.set_mfa(challenge_id, &pending).await?;

        let email_sent = send_login_code_email(&self.mailer, &account, &code).await;
        Ok(ResendMfaOutput { email_sent })
    }
}
