use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::error::AccountsServiceError;
use crate::handlers::{Client, Session};
use crate::state::AppState;
use crate::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, CompletePasswordResetInput,
    CompletePasswordResetUseCase, RequestPasswordResetUseCase,
};

// ── PUT /accounts/@me/password ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = ChangePasswordUseCase {
        accounts: state.account_store(),
        events: state.event_store(),
    };

    usecase
        .execute(ChangePasswordInput {
            account_id: session.account_id,
            current_password: body.current_password,
            new_password: body.new_password,
            new_password_confirm: body.new_password_confirm,
            ctx,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /accounts/password-reset ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// Always 202 for a well-formed email, registered or not (anti-enumeration).
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<RequestResetRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = RequestPasswordResetUseCase {
        accounts: state.account_store(),
        limiter: state.rate_limiter(),
        mailer: state.mailer.clone(),
        link_tokens: state.link_tokens(),
        public_base_url: state.public_base_url.clone(),
    };

    usecase.execute(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// ── PUT /accounts/password-reset ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteResetRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

pub async fn complete_password_reset(
    State(state): State<AppState>,
    Client(ctx): Client,
    Json(body): Json<CompleteResetRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = CompletePasswordResetUseCase {
        accounts: state.account_store(),
        events: state.event_store(),
        link_tokens: state.link_tokens(),
    };

    usecase
        .execute(CompletePasswordResetInput {
            email: body.email,
            token: body.token,
            new_password: body.new_password,
            new_password_confirm: body.new_password_confirm,
            ctx,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
