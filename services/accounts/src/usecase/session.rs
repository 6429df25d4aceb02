use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use roomlet_domain::event::SecurityAction;
use roomlet_session_types::cookie::{REMEMBER_ME_EXP, SESSION_TOKEN_EXP};
use roomlet_session_types::token::SessionClaims;

use crate::domain::repository::SecurityEventStore;
use crate::domain::types::{Account, RequestContext, SecurityEvent};
use crate::error::AccountsServiceError;
use crate::usecase::events::record;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// Issue a session JWT for the account. Remember-me stretches the expiry
/// from 4 hours to 14 days; the matching cookie Max-Age is the handler's
/// concern. Returns the token and its expiry timestamp.
pub fn issue_session_token(
    account: &Account,
    secret: &str,
    remember_me: bool,
) -> Result<(String, u64), AccountsServiceError> {
    let lifetime = if remember_me {
        REMEMBER_ME_EXP
    } else {
        SESSION_TOKEN_EXP
    };
    let exp = now_secs() + lifetime;
    let claims = SessionClaims {
        sub: account.id.to_string(),
        kind: account.kind.as_u8(),
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AccountsServiceError::Internal(e.into()))?;
    Ok((token, exp))
}

// ── Logout ───────────────────────────────────────────────────────────────

pub struct LogoutUseCase<E: SecurityEventStore> {
    pub events: E,
}

impl<E: SecurityEventStore> LogoutUseCase<E> {
    /// Stateless sessions cannot be revoked server-side; logout is the audit
    /// entry plus the cookie clear the handler performs.
    pub async fn execute(&self, account_id: Uuid, ctx: &RequestContext) {
        record(
            &self.events,
            SecurityEvent::new(Some(account_id), SecurityAction::Logout, ctx),
        )
        .await;
    }
}
