use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roomlet_domain::event::SecurityAction;
use roomlet_domain::pagination::PageRequest;

use crate::domain::types::EventFilter;
use crate::error::AccountsServiceError;
use crate::handlers::{Client, Session};
use crate::state::AppState;
use crate::usecase::events::{ListEventsInput, ListEventsUseCase};

#[derive(Deserialize)]
pub struct EventQuery {
    /// Action tag in its stored SCREAMING_SNAKE form (e.g. `FAILED_LOGIN`).
    pub action: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(rename = "per-page")]
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl EventQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            per_page: self.per_page.unwrap_or(defaults.per_page),
            page: self.page.unwrap_or(defaults.page),
        }
        .clamped()
    }
}

#[derive(Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub action: String,
    pub ip: String,
    pub user_agent: String,
    pub metadata: serde_json::Value,
    #[serde(serialize_with = "roomlet_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

fn event_filter(query: &EventQuery) -> Result<EventFilter, AccountsServiceError> {
    let action = query
        .action
        .as_deref()
        .map(|raw| {
            SecurityAction::parse(raw).ok_or_else(|| {
                AccountsServiceError::Validation(format!("Unknown action: {raw}"))
            })
        })
        .transpose()?;
    Ok(EventFilter {
        action,
        since: query.since,
        until: query.until,
    })
}

async fn list_events(
    state: AppState,
    session: Session,
    ctx: crate::domain::types::RequestContext,
    account_id: Uuid,
    query: EventQuery,
) -> Result<Json<Vec<EventResponse>>, AccountsServiceError> {
    let filter = event_filter(&query)?;
    let usecase = ListEventsUseCase {
        events: state.event_store(),
    };

    let records = usecase
        .execute(ListEventsInput {
            requester_id: session.account_id,
            requester_kind: session.kind,
            account_id,
            filter,
            page: query.page_request(),
            ctx,
        })
        .await?;

    let body: Vec<EventResponse> = records
        .into_iter()
        .map(|record| EventResponse {
            id: record.id,
            account_id: record.account_id,
            action: record.action,
            ip: record.ip,
            user_agent: record.user_agent,
            metadata: record.metadata,
            created_at: record.created_at,
        })
        .collect();
    Ok(Json(body))
}

// ── GET /accounts/@me/security-events ─────────────────────────────────────────

pub async fn list_own_events(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventResponse>>, AccountsServiceError> {
    let account_id = session.account_id;
    list_events(state, session, ctx, account_id, query).await
}

// ── GET /accounts/{account_id}/security-events ────────────────────────────────

/// Admin-only variant; a refusal is itself recorded as ACCESS_DENIED_ADMIN by
/// the usecase.
pub async fn list_account_events(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    Path(account_id): Path<Uuid>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventResponse>>, AccountsServiceError> {
    list_events(state, session, ctx, account_id, query).await
}
