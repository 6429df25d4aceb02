use chrono::Utc;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use roomlet_domain::account::MfaMethod;
use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{
    AccountStore, ChallengeCache, DeviceStore, LoginAttemptStore, Mailer, RateLimitStore,
    SecurityEventStore,
};
use crate::domain::types::{
    Account, LOGIN_IDENTIFIER_LIMIT, LOGIN_IDENTIFIER_SCOPE, LOGIN_IP_LIMIT, LOGIN_IP_SCOPE,
    LoginAttempt, OTP_LEN, PendingMfa, RESEND_VERIFICATION_LIMIT, RESEND_VERIFICATION_SCOPE,
    RequestContext, SecurityEvent,
};
use crate::error::AccountsServiceError;
use crate::security::fingerprint::{device_fingerprint, device_label};
use crate::security::lockout::{LockState, LockoutPolicy};
use crate::security::{otp, password};
use crate::usecase::events::{flag_suspicious_activity, record};
use crate::usecase::mfa::send_login_code_email;
use crate::usecase::register::issue_verification_challenge;
use crate::usecase::session::issue_session_token;

pub struct LoginInput {
    /// Username, email or phone number; matched against all three.
    pub identifier: String,
    pub password: String,
    pub remember_me: bool,
    pub ctx: RequestContext,
}

/// A fully authenticated login, ready for the handler to turn into a cookie.
#[derive(Debug)]
pub struct AuthenticatedSession {
    pub account: Account,
    pub token: String,
    pub remember_me: bool,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    /// Password accepted; a second factor is required on this device.
    MfaRequired {
        challenge_id: Uuid,
        method: MfaMethod,
    },
    /// The email is still unverified; a fresh verification challenge was
    /// issued and must be completed before any password check happens.
    VerificationRequired { challenge_id: Uuid },
}

pub struct LoginUseCase<A, D, E, L, R, C, M>
where
    A: AccountStore,
    D: DeviceStore,
    E: SecurityEventStore,
    L: LoginAttemptStore,
    R: RateLimitStore,
    C: ChallengeCache,
    M: Mailer,
{
    pub accounts: A,
    pub lockout: LockoutPolicy<A>,
    pub devices: D,
    pub events: E,
    pub attempts: L,
    pub limiter: R,
    pub challenges: C,
    pub mailer: M,
    pub jwt_secret: String,
}

impl<A, D, E, L, R, C, M> LoginUseCase<A, D, E, L, R, C, M>
where
    A: AccountStore,
    D: DeviceStore,
    E: SecurityEventStore,
    L: LoginAttemptStore,
    R: RateLimitStore,
    C: ChallengeCache,
    M: Mailer,
{
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutcome, AccountsServiceError> {
        let identifier = input.identifier.trim().to_lowercase();

        // 1. Per-IP gate
        if self
            .limiter
            .is_limited(LOGIN_IP_SCOPE, &input.ctx.ip, LOGIN_IP_LIMIT)
            .await?
        {
            return Err(AccountsServiceError::RateLimited);
        }

        // 2. Raw attempt row, recorded before the outcome is known
        if let Err(e) = self
            .attempts
            .record(&LoginAttempt {
                identifier: identifier.clone(),
                ip: input.ctx.ip.clone(),
                success: false,
                user_agent: input.ctx.user_agent.clone(),
            })
            .await
        {
            warn!(error = %e, "login attempt row dropped");
        }

        // 3. Per-identifier gate
        if self
            .limiter
            .is_limited(LOGIN_IDENTIFIER_SCOPE, &identifier, LOGIN_IDENTIFIER_LIMIT)
            .await?
        {
            return Err(AccountsServiceError::RateLimited);
        }

        // 4. Identification. A miss costs the caller the exact message a bad
        //    password would, and only the per-IP counter moves.
        let Some(account) = self.accounts.find_by_identifier(&identifier).await? else {
            if let Err(e) = self
                .limiter
                .increment(LOGIN_IP_SCOPE, &input.ctx.ip, LOGIN_IP_LIMIT)
                .await
            {
                warn!(error = %e, "login limiter increment failed");
            }
            let mut event = SecurityEvent::new(None, SecurityAction::FailedLogin, &input.ctx);
            event.metadata = json!({ "identifier": identifier });
            record(&self.events, event).await;
            return Err(AccountsServiceError::AuthenticationFailed);
        };

        // 5. Unverified accounts re-enter the verification flow, before any
        //    password check
        if !account.email_verified {
            if self
                .limiter
                .is_limited(
                    RESEND_VERIFICATION_SCOPE,
                    &account.email,
                    RESEND_VERIFICATION_LIMIT,
                )
                .await?
            {
                return Err(AccountsServiceError::RateLimited);
            }
            let (challenge_id, _) =
                issue_verification_challenge(&self.challenges, &self.mailer, &account).await?;
            if let Err(e) = self
                .limiter
                .increment(
                    RESEND_VERIFICATION_SCOPE,
                    &account.email,
                    RESEND_VERIFICATION_LIMIT,
                )
                .await
            {
                warn!(error = %e, "resend limiter increment failed");
            }
            return Ok(LoginOutcome::VerificationRequired { challenge_id });
        }

        // 6. Password
        if !password::verify_password(&input.password, &account.password_hash).await? {
            let outcome = self.lockout.record_failure(account.id).await?;
            if outcome.locked {
                let mut event =
                    SecurityEvent::new(Some(account.id), SecurityAction::AccountLocked, &input.ctx);
                event.metadata = json!({ "failed_attempts": outcome.failures });
                record(&self.events, event).await;
            }
            if let Err(e) = self
                .limiter
                .increment(LOGIN_IDENTIFIER_SCOPE, &identifier, LOGIN_IDENTIFIER_LIMIT)
                .await
            {
                warn!(error = %e, "login limiter increment failed");
            }
            if let Err(e) = self
                .limiter
                .increment(LOGIN_IP_SCOPE, &input.ctx.ip, LOGIN_IP_LIMIT)
                .await
            {
                warn!(error = %e, "login limiter increment failed");
            }
            record(
                &self.events,
                SecurityEvent::new(Some(account.id), SecurityAction::FailedLogin, &input.ctx),
            )
            .await;
            return Err(AccountsServiceError::AuthenticationFailed);
        }

        // 7. Lock check, only after the password proved knowledge. The coarse
        //    error leaks no remaining duration.
        match self.lockout.is_locked(&account).await? {
            LockState::Locked => return Err(AccountsServiceError::AccountLocked),
            LockState::JustUnlocked => {
                record(
                    &self.events,
                    SecurityEvent::new(Some(account.id), SecurityAction::AccountUnlocked, &input.ctx),
                )
                .await;
            }
            LockState::Unlocked => {}
        }

        // 8. Informational anomaly check before counters are wiped
        flag_suspicious_activity(&self.events, account.id, &input.ctx).await;

        // 9. Clean slate: lockout counter and the per-identifier window only
        self.lockout.reset(account.id).await?;
        self.limiter.reset(LOGIN_IDENTIFIER_SCOPE, &identifier).await?;

        // 10. Second factor, unless this device is already trusted
        let fp = device_fingerprint(&input.ctx);
        let trusted = self
            .devices
            .find(account.id, &fp)
            .await?
            .is_some_and(|device| device.is_trusted_at(Utc::now()));
        if account.mfa_required() && !trusted {
            let challenge_id = Uuid::new_v4();
            let now = Utc::now();
            let mut pending = PendingMfa {
                account_id: account.id,
                method: account.mfa_method,
                otp: None,
                otp_issued_at: None,
                failures: 0,
                resends: 0,
                remember_me: input.remember_me,
                created_at: now,
            };
            if account.mfa_method == MfaMethod::EmailOtp {
                pending.otp = Some(otp::generate_numeric_code(OTP_LEN));
                pending.otp_issued_at = Some(now);
            }
            self.challenges.set_mfa(challenge_id, &pending).await?;
            if let Some(code) = &pending.otp {
                send_login_code_email(&self.mailer, &account, code).await;
            }
            return Ok(LoginOutcome::MfaRequired {
                challenge_id,
                method: account.mfa_method,
            });
        }

        // 11. Finalize
        let session = finalize_login(
            &self.accounts,
            &self.devices,
            &self.events,
            &self.attempts,
            FinalizeLoginInput {
                account: &account,
                ctx: &input.ctx,
                remember_me: input.remember_me,
                action: SecurityAction::Login,
                jwt_secret: &self.jwt_secret,
            },
        )
        .await?;
        Ok(LoginOutcome::Authenticated(session))
    }
}

/// The login to complete. `action` is LOGIN or LOGIN_MFA depending on the
/// path that got here.
pub(crate) struct FinalizeLoginInput<'a> {
    pub account: &'a Account,
    pub ctx: &'a RequestContext,
    pub remember_me: bool,
    pub action: SecurityAction,
    pub jwt_secret: &'a str,
}

/// Shared tail of password-only and MFA logins: trust the device, stamp
/// last-login, record the attempt and the audit event, issue the session.
pub(crate) async fn finalize_login<A, D, E, L>(
    accounts: &A,
    devices: &D,
    events: &E,
    attempts: &L,
    input: FinalizeLoginInput<'_>,
) -> Result<AuthenticatedSession, AccountsServiceError>
where
    A: AccountStore,
    D: DeviceStore,
    E: SecurityEventStore,
    L: LoginAttemptStore,
{
    let account = input.account;
    let ctx = input.ctx;
    let now = Utc::now();
    let fp = device_fingerprint(ctx);
    let label = device_label(&ctx.user_agent);

    let created = devices
        .upsert_trust(account.id, &fp, &label, &ctx.ip, now)
        .await?;
    if created {
        let mut event = SecurityEvent::new(Some(account.id), SecurityAction::DeviceAdded, ctx);
        event.metadata = json!({ "label": label });
        record(events, event).await;
    }

    accounts.set_last_login(account.id, now, &ctx.ip).await?;

    if let Err(e) = attempts
        .record(&LoginAttempt {
            identifier: account.username.clone(),
            ip: ctx.ip.clone(),
            success: true,
            user_agent: ctx.user_agent.clone(),
        })
        .await
    {
        warn!(error = %e, "login attempt row dropped");
    }
    record(events, SecurityEvent::new(Some(account.id), input.action, ctx)).await;

    let (token, _) = issue_session_token(account, input.jwt_secret, input.remember_me)?;
    Ok(AuthenticatedSession {
        account: account.clone(),
        token,
        remember_me: input.remember_me,
    })
}
