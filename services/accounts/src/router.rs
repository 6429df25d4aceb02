use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use roomlet_core::health::{healthz, readyz};
use roomlet_core::middleware::request_id_layer;

use crate::handlers::{
    account::{check_availability, register, resend_verification, verify_email},
    device::{list_devices, revoke_device},
    event::{list_account_events, list_own_events},
    mfa::{regenerate_backup_codes, select_mfa_method, start_totp_enrollment},
    password::{change_password, complete_password_reset, request_password_reset},
    session::{login, logout, resend_mfa, verify_mfa},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration + email verification
        .route("/accounts", post(register))
        .route("/accounts/verify-email", post(verify_email))
        .route("/accounts/verify-email/resend", post(resend_verification))
        .route("/accounts/availability", get(check_availability))
        // Session (login, MFA challenge, logout)
        .route("/accounts/session", post(login))
        .route("/accounts/session", delete(logout))
        .route("/accounts/session/mfa", post(verify_mfa))
        .route("/accounts/session/mfa/resend", post(resend_mfa))
        // Password
        .route("/accounts/@me/password", put(change_password))
        .route("/accounts/password-reset", post(request_password_reset))
        .route("/accounts/password-reset", put(complete_password_reset))
        // MFA enrollment
        .route("/accounts/@me/mfa/totp", post(start_totp_enrollment))
        .route("/accounts/@me/mfa", put(select_mfa_method))
        .route(
            "/accounts/@me/mfa/backup-codes",
            post(regenerate_backup_codes),
        )
        // Trusted devices
        .route("/accounts/@me/devices", get(list_devices))
        .route("/accounts/@me/devices/{device_id}", delete(revoke_device))
        // Audit trail
        .route("/accounts/@me/security-events", get(list_own_events))
        .route(
            "/accounts/{account_id}/security-events",
            get(list_account_events),
        )
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
