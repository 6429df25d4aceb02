//! HTTP handlers, one file per resource, plus the request extractors they
//! share.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use roomlet_domain::account::AccountKind;
use roomlet_session_types::cookie::ROOMLET_SESSION;
use roomlet_session_types::token::validate_session_token;

use crate::error::AccountsServiceError;
use crate::security::fingerprint::request_context;
use crate::state::AppState;

pub mod account;
pub mod device;
pub mod event;
pub mod mfa;
pub mod password;
pub mod session;

/// Signed-in account, extracted from the session cookie.
///
/// Returns 401 when the cookie is absent, expired, tampered with, or carries
/// an unknown account kind.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: Uuid,
    pub kind: AccountKind,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AccountsServiceError;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`).
    // Extract values synchronously, return a 'static async move block.
    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = CookieJar::from_headers(&parts.headers)
            .get(ROOMLET_SESSION)
            .map(|c| c.value().to_owned());
        let secret = state.jwt_secret.clone();

        async move {
            let token = token.ok_or(AccountsServiceError::AuthenticationFailed)?;
            let info = validate_session_token(&token, &secret)
                .map_err(|_| AccountsServiceError::AuthenticationFailed)?;
            let kind = AccountKind::from_u8(info.account_kind)
                .ok_or(AccountsServiceError::AuthenticationFailed)?;
            Ok(Self {
                account_id: info.account_id,
                kind,
            })
        }
    }
}

/// Client metadata (origin IP, sanitized user-agent, fingerprint headers)
/// assembled from the connection and request headers. Never fails; a missing
/// peer address falls back to the unspecified address.
pub struct Client(pub crate::domain::types::RequestContext);

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        let ctx = request_context(addr, &parts.headers);
        async move { Ok(Self(ctx)) }
    }
}
