//! JWT session-token validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_ACCOUNTS_SERVICE", test))]
use serde::Serialize;
use uuid::Uuid;

/// Account identity extracted from a validated session token.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub account_id: Uuid,
    pub account_kind: u8,
    pub session_exp: u64,
}

/// Errors returned by [`validate_session_token`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload shared by session issuance (accounts service) and validation.
///
/// # Fields
///
/// | Field | JWT claim | Rust type | Meaning |
/// |-------|-----------|-----------|---------|
/// | `sub` | `sub` | UUID string | account ID |
/// | `kind` | custom | `u8` wire value | see [`roomlet_domain::account::AccountKind`] |
/// | `exp` | `exp` | seconds since epoch | session expiration |
///
/// # Feature gate
///
/// [`Deserialize`] is always available — all consumers validate sessions.
/// [`Serialize`] requires the **`USE_ONLY_IN_ACCOUNTS_SERVICE`** cargo feature.
/// Only the accounts service enables it because it is the sole session issuer.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_ACCOUNTS_SERVICE", test), derive(Serialize))]
pub struct SessionClaims {
    /// Account ID (UUID string).
    pub sub: String,
    /// Account kind as `u8` wire value.
    pub kind: u8,
    /// Expiration timestamp (seconds since UNIX epoch).
    pub exp: u64,
}

// ── Core decode (private) ────────────────────────────────────────────────

/// Decode and validate a session JWT, returning raw claims.
///
/// Validation: HS256, exp checked, required claims: `exp` + `sub`.
/// Default leeway = 60s — tolerates clock skew between services.
fn decode_jwt(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_) => SessionError::InvalidSignature,
        _ => SessionError::Malformed,
    })?;

    Ok(data.claims)
}

// ── Public: all consumers ────────────────────────────────────────────────

/// Validate a session-cookie value, returning parsed identity.
///
/// This is the primary public API for session validation. Every service that
/// needs the signed-in account calls this on the JWT cookie value.
pub fn validate_session_token(cookie_value: &str, secret: &str) -> Result<SessionInfo, SessionError> {
    let claims = decode_jwt(cookie_value, secret)?;
    let account_id = claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| SessionError::Malformed)?;
    Ok(SessionInfo {
        account_id,
        account_kind: claims.kind,
        session_exp: claims.exp,
    })
}
