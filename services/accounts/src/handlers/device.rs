use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AccountsServiceError;
use crate::handlers::{Client, Session};
use crate::state::AppState;
use crate::usecase::device::{ListDevicesUseCase, RevokeDeviceUseCase};

// ── GET /accounts/@me/devices ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DeviceResponse {
    pub id: Uuid,
    pub label: String,
    pub last_ip: Option<String>,
    #[serde(serialize_with = "roomlet_core::serde::to_rfc3339_ms")]
    pub last_used_at: DateTime<Utc>,
    #[serde(serialize_with = "roomlet_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

pub async fn list_devices(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<DeviceResponse>>, AccountsServiceError> {
    let usecase = ListDevicesUseCase {
        devices: state.device_store(),
    };

    let devices = usecase.execute(session.account_id).await?;
    let body: Vec<DeviceResponse> = devices
        .into_iter()
        .map(|device| DeviceResponse {
            id: device.id,
            label: device.label,
            last_ip: device.last_ip,
            last_used_at: device.last_used_at,
            created_at: device.created_at,
        })
        .collect();
    Ok(Json(body))
}

// ── DELETE /accounts/@me/devices/{device_id} ──────────────────────────────────

pub async fn revoke_device(
    State(state): State<AppState>,
    session: Session,
    Client(ctx): Client,
    Path(device_id): Path<Uuid>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let usecase = RevokeDeviceUseCase {
        devices: state.device_store(),
        events: state.event_store(),
    };

    usecase.execute(session.account_id, device_id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}
