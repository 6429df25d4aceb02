use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};

use roomlet_domain::account::MfaMethod;

use crate::error::AccountsServiceError;
use crate::handlers::{Client, Session};
use crate::state::AppState;
use crate::usecase::enrollment::{
    RegenerateBackupCodesUseCase, SelectMfaMethodInput, SelectMfaMethodUseCase,
    StartTotpEnrollmentUseCase,
};

// ── POST /accounts/@me/mfa/totp ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct StartTotpResponse {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` URL for authenticator-app QR codes.
    pub otpauth_url: String,
}

pub async fn start_totp_enrollment(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<StartTotpResponse>, AccountsServiceError> {
    let usecase = StartTotpEnrollmentUseCase {
        accounts: state.account_store(),
    };

    let out = usecase.execute(session.account_id).await?;
    Ok(Json(StartTotpResponse {
        secret: out.secret,
        otpauth_url: out.otpauth_url,
    }))
}

// ── PUT /accounts/@me/mfa ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SelectMfaRequest {
    pub method: MfaMethod,
    /// Current authenticator code; required when switching to TOTP.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct SelectMfaResponse {
    pub method: MfaMethod,
    /// Plaintext backup codes, present only when TOTP was just enabled.
    /// Shown exactly once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_codes: Option<Vec<String>>,
}

pub async fn select_mfa_method(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    Json(body): Json<SelectMfaRequest>,
) -> Result<Json<SelectMfaResponse>, AccountsServiceError> {
    let usecase = SelectMfaMethodUseCase {
        accounts: state.account_store(),
        backup_codes: state.backup_code_store(),
        events: state.event_store(),
    };

    let out = usecase
        .execute(SelectMfaMethodInput {
            account_id: session.account_id,
            method: body.method,
            code: body.code,
            ctx,
        })
        .await?;
    Ok(Json(SelectMfaResponse {
        method: body.method,
        backup_codes: out.backup_codes,
    }))
}

// ── POST /accounts/@me/mfa/backup-codes ───────────────────────────────────────

#[derive(Serialize)]
pub struct BackupCodesResponse {
    /// Fresh plaintext codes; every previous code is now invalid.
    pub backup_codes: Vec<String>,
}

pub async fn regenerate_backup_codes(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
) -> Result<Json<BackupCodesResponse>, AccountsServiceError> {
    let usecase = RegenerateBackupCodesUseCase {
        accounts: state.account_store(),
        backup_codes: state.backup_code_store(),
        events: state.event_store(),
    };

    let codes = usecase.execute(session.account_id, &ctx).await?;
    Ok(Json(BackupCodesResponse {
        backup_codes: codes,
    }))
}
