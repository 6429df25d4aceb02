use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Accounts service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum AccountsServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("too many requests, retry later")]
    RateLimited,
    #[error("account temporarily locked, try again later")]
    AccountLocked,
    /// One fixed message for unknown identifier, wrong password and wrong MFA
    /// code, so responses cannot be used to probe which part failed.
    #[error("invalid credentials")]
    AuthenticationFailed,
    #[error("verification code expired")]
    ChallengeExpired,
    #[error("too many incorrect attempts")]
    ChallengeExhausted,
    #[error("login session expired")]
    MfaSessionExpired,
    #[error("account already exists")]
    AccountExists,
    #[error("device not found")]
    DeviceNotFound,
    #[error("account not found")]
    AccountNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AccountsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::RateLimited => "RATE_LIMITED",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::ChallengeExpired => "CHALLENGE_EXPIRED",
            Self::ChallengeExhausted => "CHALLENGE_EXHAUSTED",
            Self::MfaSessionExpired => "MFA_SESSION_EXPIRED",
            Self::AccountExists => "ACCOUNT_EXISTS",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AccountsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::AccountLocked => StatusCode::LOCKED,
            Self::AuthenticationFailed | Self::MfaSessionExpired => StatusCode::UNAUTHORIZED,
            Self::ChallengeExpired | Self::ChallengeExhausted => StatusCode::GONE,
            Self::AccountExists => StatusCode::CONFLICT,
            Self::DeviceNotFound | Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status for all
        // requests. 4xx are expected client errors; logging them here would be noise.
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
