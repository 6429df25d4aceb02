use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roomlet_domain::account::MfaMethod;
use roomlet_session_types::cookie::{clear_session_cookie, set_session_cookie};

use crate::error::AccountsServiceError;
use crate::handlers::{Client, Session};
use crate::state::AppState;
use crate::usecase::login::{LoginInput, LoginOutcome, LoginUseCase};
use crate::usecase::mfa::{ResendMfaUseCase, VerifyMfaInput, VerifyMfaUseCase};
use crate::usecase::session::LogoutUseCase;

// ── POST /accounts/session ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username, email or phone number.
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    /// Password accepted, session issued via cookie.
    Authenticated { account_id: Uuid },
    /// Password accepted; submit a second factor against the challenge.
    MfaRequired {
        challenge_id: Uuid,
        method: MfaMethod,
    },
    /// Email still unverified; complete the emailed verification challenge.
    VerificationRequired { challenge_id: Uuid },
}

pub async fn login(
    State(state): State<AppState>,
    Client(ctx): Client,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AccountsServiceError> {
    let usecase = LoginUseCase {
        accounts: state.account_store(),
        lockout: state.lockout(),
        devices: state.device_store(),
        events: state.event_store(),
        attempts: state.attempt_store(),
        limiter: state.rate_limiter(),
        challenges: state.challenge_cache(),
        mailer: state.mailer.clone(),
        jwt_secret: state.jwt_secret.clone(),
    };

    let outcome = usecase
        .execute(LoginInput {
            identifier: body.identifier,
            password: body.password,
            remember_me: body.remember_me,
            ctx,
        })
        .await?;

    Ok(match outcome {
        LoginOutcome::Authenticated(session) => {
            let jar = set_session_cookie(
                jar,
                session.token,
                state.cookie_domain.clone(),
                session.remember_me,
            );
            (
                StatusCode::CREATED,
                jar,
                Json(LoginResponse::Authenticated {
                    account_id: session.account.id,
                }),
            )
                .into_response()
        }
        LoginOutcome::MfaRequired {
            challenge_id,
            method,
        } => (
            StatusCode::OK,
            Json(LoginResponse::MfaRequired {
                challenge_id,
                method,
            }),
        )
            .into_response(),
        LoginOutcome::VerificationRequired { challenge_id } => (
            StatusCode::OK,
            Json(LoginResponse::VerificationRequired { challenge_id }),
        )
            .into_response(),
    })
}

// ── POST /accounts/session/mfa ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyMfaRequest {
    pub challenge_id: Uuid,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyMfaResponse {
    pub account_id: Uuid,
}

pub async fn verify_mfa(
    State(state): State<AppState>,
    Client(ctx): Client,
    jar: CookieJar,
    Json(body): Json<VerifyMfaRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = VerifyMfaUseCase {
        accounts: state.account_store(),
        backup_codes: state.backup_code_store(),
        devices: state.device_store(),
        events: state.event_store(),
        attempts: state.attempt_store(),
        challenges: state.challenge_cache(),
        jwt_secret: state.jwt_secret.clone(),
    };

    let session = usecase
        .execute(VerifyMfaInput {
            challenge_id: body.challenge_id,
            code: body.code,
            ctx,
        })
        .await?;

    let account_id = session.account.id;
    let jar = set_session_cookie(
        jar,
        session.token,
        state.cookie_domain.clone(),
        session.remember_me,
    );
    Ok((StatusCode::CREATED, jar, Json(VerifyMfaResponse { account_id })))
}

// ── POST /accounts/session/mfa/resend ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResendMfaRequest {
    pub challenge_id: Uuid,
}

#[derive(Serialize)]
pub struct ResendMfaResponse {
    pub email_sent: bool,
}

pub async fn resend_mfa(
    State(state): State<AppState>,
    Json(body): Json<ResendMfaRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = ResendMfaUseCase {
        accounts: state.account_store(),
        challenges: state.challenge_cache(),
        mailer: state.mailer.clone(),
    };

    let out = usecase.execute(body.challenge_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResendMfaResponse {
            email_sent: out.email_sent,
        }),
    ))
}

// ── DELETE /accounts/session ──────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    jar: CookieJar,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = LogoutUseCase {
        events: state.event_store(),
    };
    usecase.execute(session.account_id, &ctx).await;

    let jar = clear_session_cookie(jar, state.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar))
}
