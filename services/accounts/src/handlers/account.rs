use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roomlet_domain::account::AccountKind;
use roomlet_session_types::cookie::set_session_cookie;

use crate::error::AccountsServiceError;
use crate::handlers::Client;
use crate::state::AppState;
use crate::usecase::availability::{AvailabilityQuery, CheckAvailabilityUseCase};
use crate::usecase::register::{
    RegisterInput, RegisterUseCase, ResendVerificationUseCase, VerifyEmailInput, VerifyEmailUseCase,
};

// ── POST /accounts ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
    pub kind: AccountKind,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub account_id: Uuid,
    pub challenge_id: Uuid,
    /// False when the verification email could not be delivered; the code can
    /// be resent.
    pub email_sent: bool,
}

pub async fn register(
    State(state): State<AppState>,
    Client(ctx): Client,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = RegisterUseCase {
        accounts: state.account_store(),
        limiter: state.rate_limiter(),
        challenges: state.challenge_cache(),
        events: state.event_store(),
        mailer: state.mailer.clone(),
    };

    let out = usecase
        .execute(RegisterInput {
            username: body.username,
            email: body.email,
            phone: body.phone,
            password: body.password,
            password_confirm: body.password_confirm,
            kind: body.kind,
            ctx,
        })
        .await?;

    let body = RegisterResponse {
        account_id: out.account.id,
        challenge_id: out.challenge_id,
        email_sent: out.email_sent,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

// ── POST /accounts/verify-email ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub challenge_id: Uuid,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyEmailResponse {
    pub account_id: Uuid,
    pub email_verified: bool,
}

pub async fn verify_email(
    State(state): State<AppState>,
    Client(ctx): Client,
    jar: CookieJar,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = VerifyEmailUseCase {
        accounts: state.account_store(),
        challenges: state.challenge_cache(),
        events: state.event_store(),
        jwt_secret: state.jwt_secret.clone(),
    };

    let out = usecase
        .execute(VerifyEmailInput {
            challenge_id: body.challenge_id,
            code: body.code,
            ctx,
        })
        .await?;

    let jar = set_session_cookie(jar, out.token, state.cookie_domain.clone(), false);
    let body = VerifyEmailResponse {
        account_id: out.account.id,
        email_verified: true,
    };
    Ok((StatusCode::OK, jar, Json(body)))
}

// ── POST /accounts/verify-email/resend ────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub challenge_id: Uuid,
}

#[derive(Serialize)]
pub struct ResendResponse {
    pub email_sent: bool,
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = ResendVerificationUseCase {
        accounts: state.account_store(),
        challenges: state.challenge_cache(),
        limiter: state.rate_limiter(),
        mailer: state.mailer.clone(),
    };

    let out = usecase.execute(body.challenge_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResendResponse {
            email_sent: out.email_sent,
        }),
    ))
}

// ── GET /accounts/availability ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AvailabilityParams {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

pub async fn check_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityResponse>, AccountsServiceError> {
    let query = match (params.username, params.email, params.phone) {
        (Some(username), None, None) => AvailabilityQuery::Username(username),
        (None, Some(email), None) => AvailabilityQuery::Email(email),
        (None, None, Some(phone)) => AvailabilityQuery::Phone(phone),
        _ => {
            return Err(AccountsServiceError::Validation(
                "Provide exactly one of username, email, or phone.".to_owned(),
            ));
        }
    };

    let usecase = CheckAvailabilityUseCase {
        accounts: state.account_store(),
    };
    let available = usecase.execute(query).await?;
    Ok(Json(AvailabilityResponse { available }))
}
