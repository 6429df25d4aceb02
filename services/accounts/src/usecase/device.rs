use serde_json::json;
use uuid::Uuid;

use roomlet_domain::event::SecurityAction;

use crate::domain::repository::{DeviceStore, SecurityEventStore};
use crate::domain::types::{RequestContext, SecurityEvent, TrustedDevice};
use crate::error::AccountsServiceError;
use crate::usecase::events::record;

pub struct ListDevicesUseCase<D: DeviceStore> {
    pub devices: D,
}

impl<D: DeviceStore> ListDevicesUseCase<D> {
    pub async fn execute(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<TrustedDevice>, AccountsServiceError> {
        self.devices.list_active(account_id).await
    }
}

pub struct RevokeDeviceUseCase<D, E>
where
    D: DeviceStore,
    E: SecurityEventStore,
{
    pub devices: D,
    pub events: E,
}

impl<D, E> RevokeDeviceUseCase<D, E>
where
    D: DeviceStore,
    E: SecurityEventStore,
{
    /// Soft revoke: the row stays for audit, the trust is gone. The next
    /// login from that device goes through MFA again.
    pub async fn execute(
        &self,
        account_id: Uuid,
        device_id: Uuid,
        ctx: &RequestContext,
    ) -> Result<(), AccountsServiceError> {
        let revoked = self.devices.deactivate(account_id, device_id).await?;
        if !revoked {
            return Err(AccountsServiceError::DeviceNotFound);
        }

        let mut event = SecurityEvent::new(Some(account_id), SecurityAction::DeviceRemoved, ctx);
        event.metadata = json!({ "device_id": device_id });
        record(&self.events, event).await;
        Ok(())
    }
}
