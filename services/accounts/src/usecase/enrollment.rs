use serde_json::json;
use uuid::Uuid;

use roomlet_domain::account::MfaMethod;
use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{AccountStore, BackupCodeStore, SecurityEventStore};
use crate::domain::types::{RequestContext, SecurityEvent};
use crate::error::AccountsServiceError;
use crate::security::{backup, totp};
use crate::usecase::events::record;

fn require_verified_email(verified: bool) -> Result<(), AccountsServiceError> {
    if verified {
        Ok(())
    } else {
        Err(AccountsServiceError::Validation(
            "Verify your email before enabling two-factor authentication.".to_owned(),
        ))
    }
}

// ── StartTotpEnrollment ──────────────────────────────────────────────────

#[derive(Debug)]
pub struct StartTotpOutput {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` URL for authenticator-app QR codes.
    pub otpauth_url: String,
}

pub struct StartTotpEnrollmentUseCase<A: AccountStore> {
    pub accounts: A,
}

impl<A: AccountStore> StartTotpEnrollmentUseCase<A> {
    /// Store a fresh pending secret and hand back the enrollment material.
    /// The method stays unchanged until a valid code confirms the secret.
    pub async fn execute(&self, account_id: Uuid) -> Result<StartTotpOutput, AccountsServiceError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;
        require_verified_email(account.email_verified)?;
        // An active secret must not be silently replaced; disable first.
        if account.mfa_method == MfaMethod::Totp {
            return Err(AccountsServiceError::Validation(
                "Two-factor authentication is already enabled.".to_owned(),
            ));
        }

        let secret = totp::generate_secret();
        self.accounts.set_totp_secret(account_id, Some(&secret)).await?;
        let otpauth_url = totp::provisioning_url(&account.username, &secret);
        Ok(StartTotpOutput {
            secret,
            otpauth_url,
        })
    }
}

// ── SelectMfaMethod ──────────────────────────────────────────────────────

pub struct SelectMfaMethodInput {
    pub account_id: Uuid,
    pub method: MfaMethod,
    /// Required when switching to TOTP: a current code proving the
    /// authenticator holds the pending secret.
    pub code: Option<String>,
    pub ctx: RequestContext,
}

#[derive(Debug)]
pub struct SelectMfaMethodOutput {
    /// Plaintext backup codes, present only when TOTP was just enabled.
    /// Shown exactly once.
    pub backup_codes: Option<Vec<String>>,
}

pub struct SelectMfaMethodUseCase<A, B, E>
where
    A: AccountStore,
    B: BackupCodeStore,
    E: SecurityEventStore,
{
    pub accounts: A,
    pub backup_codes: B,
    pub events: E,
}

impl<A, B, E> SelectMfaMethodUseCase<A, B, E>
where
    A: AccountStore,
    B: BackupCodeStore,
    E: SecurityEventStore,
{
    pub async fn execute(
        &self,
        input: SelectMfaMethodInput,
    ) -> Result<SelectMfaMethodOutput, AccountsServiceError> {
        let account = self
            .accounts
            .find_by_id(input.account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;

        // Selecting the active method is a no-op.
        if input.method == account.mfa_method {
            return Ok(SelectMfaMethodOutput { backup_codes: None });
        }

        match input.method {
            MfaMethod::Totp => {
                require_verified_email(account.email_verified)?;
                let secret = account.totp_secret.as_deref().ok_or_else(|| {
                    AccountsServiceError::Validation(
                        "Start authenticator enrollment first.".to_owned(),
                    )
                })?;
                let code = input.code.as_deref().unwrap_or_default().trim();
                if !totp::verify(secret, code) {
                    return Err(AccountsServiceError::AuthenticationFailed);
                }

                let codes = backup::generate_codes();
                let hashes: Vec<String> = codes.iter().map(|c| backup::hash_code(c)).collect();
                self.backup_codes.replace_all(account.id, &hashes).await?;
                self.accounts
                    .set_mfa_method(account.id, MfaMethod::Totp)
                    .await?;

                let mut event =
                    SecurityEvent::new(Some(account.id), SecurityAction::MfaEnabled, &input.ctx);
                event.metadata = json!({ "method": "totp" });
                record(&self.events, event).await;
                Ok(SelectMfaMethodOutput {
                    backup_codes: Some(codes),
                })
            }
            MfaMethod::EmailOtp => {
                require_verified_email(account.email_verified)?;
                self.accounts
                    .set_mfa_method(account.id, MfaMethod::EmailOtp)
                    .await?;

                let mut event =
                    SecurityEvent::new(Some(account.id), SecurityAction::MfaEnabled, &input.ctx);
                event.metadata = json!({ "method": "email_otp" });
                record(&self.events, event).await;
                Ok(SelectMfaMethodOutput { backup_codes: None })
            }
            MfaMethod::None => {
                self.accounts.set_totp_secret(account.id, None).await?;
                self.backup_codes.delete_all(account.id).await?;
                self.accounts
                    .set_mfa_method(account.id, MfaMethod::None)
                    .await?;

                record(
                    &self.events,
                    SecurityEvent::new(Some(account.id), SecurityAction::MfaDisabled, &input.ctx),
                )
                .await;
                Ok(SelectMfaMethodOutput { backup_codes: None })
            }
        }
    }
}

// ── RegenerateBackupCodes ────────────────────────────────────────────────

pub struct RegenerateBackupCodesUseCase<A, B, E>
where
    A: AccountStore,
    B: BackupCodeStore,
    E: SecurityEventStore,
{
    pub accounts: A,
    pub backup_codes: B,
    pub events: E,
}

impl<A, B, E> RegenerateBackupCodesUseCase<A, B, E>
where
    A: AccountStore,
    B: BackupCodeStore,
    E: SecurityEventStore,
{
    /// Replace every backup code with a fresh set. The old codes die with
    /// the replacement; the new plaintext is returned exactly once.
    pub async fn execute(
        &self,
        account_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<Vec<String>, AccountsServiceError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;
        if account.mfa_method != MfaMethod::Totp {
            return Err(AccountsServiceError::Validation(
                "Backup codes are only available with an authenticator app.".to_owned(),
            ));
        }

        let codes = backup::generate_codes();
        let hashes: Vec<String> = codes.iter().map(|c| backup::hash_code(c)).collect();
        self.backup_codes.replace_all(account_id, &hashes).await?;

        record(
            &self.events,
            SecurityEvent::new(
                Some(account_id),
                SecurityAction::BackupCodesRegenerated,
                ctx,
            ),
        )
        .await;
        Ok(codes)
    }
}
