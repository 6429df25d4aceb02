use chrono::{Duration, Utc};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use roomlet_domain::account::AccountKind;
use roomlet_domain::event::SecurityAction;
use roomlet_domain::pagination::PageRequest;

use crate::domain::repository::SecurityEventStore;
use crate::domain::types::{
    EventFilter, RequestContext, SUSPICIOUS_IP_THRESHOLD, SUSPICIOUS_WINDOW_SECS, SecurityEvent,
    SecurityEventRecord,
};
use crate::error::AccountsServiceError;

/// Best-effort audit write. A failed append is WARN-logged and swallowed so
/// the instrumented flow never fails on its own telemetry.
pub async fn record<E: SecurityEventStore>(events: &E, event: SecurityEvent) {
    if let Err(e) = events.append(&event).await {
        warn!(
            action = event.action.as_str(),
            error = %e,
            "security event dropped"
        );
    }
}

/// Flag logins spread across too many source addresses: more than 3 distinct
/// IPs among the last hour's LOGIN events records SUSPICIOUS_ACTIVITY.
/// Informational only; read errors are swallowed like the write path.
pub async fn flag_suspicious_activity<E: SecurityEventStore>(
    events: &E,
    account_id: Uuid,
    ctx: &RequestContext,
) {
    let since = Utc::now() - Duration::seconds(SUSPICIOUS_WINDOW_SECS);
    let distinct_ips = match events.distinct_login_ips_since(account_id, since).await {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "suspicious-activity check skipped");
            return;
        }
    };
    if distinct_ips > SUSPICIOUS_IP_THRESHOLD {
        let mut event = SecurityEvent::new(Some(account_id), SecurityAction::SuspiciousActivity, ctx);
        event.metadata = json!({
            "reason": "Multiple IP addresses detected in short period",
            "distinct_ips": distinct_ips,
        });
        record(events, event).await;
    }
}

// ── ListEvents ───────────────────────────────────────────────────────────

pub struct ListEventsInput {
    pub requester_id: Uuid,
    pub requester_kind: AccountKind,
    /// Account whose trail is requested; same as `requester_id` unless the
    /// requester is an admin.
    pub account_id: Uuid,
    pub filter: EventFilter,
    pub page: PageRequest,
    pub ctx: RequestContext,
}

pub struct ListEventsUseCase<E: SecurityEventStore> {
    pub events: E,
}

impl<E: SecurityEventStore> ListEventsUseCase<E> {
    pub async fn execute(
        &self,
        input: ListEventsInput,
    ) -> Result<Vec<SecurityEventRecord>, AccountsServiceError> {
        // Cross-account reads are admin-only; the refusal is itself audited.
        if input.account_id != input.requester_id && !input.requester_kind.is_admin() {
            let mut event = SecurityEvent::new(
                Some(input.requester_id),
                SecurityAction::AccessDeniedAdmin,
                &input.ctx,
            );
            event.metadata = json!({ "target_account_id": input.account_id });
            record(&self.events, event).await;
            return Err(AccountsServiceError::Forbidden);
        }

        self.events
            .list(input.account_id, &input.filter, input.page)
            .await
    }
}
