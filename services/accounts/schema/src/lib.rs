//! SeaORM entities owned by the accounts service.

pub mod accounts;
pub mod backup_codes;
pub mod login_attempts;
pub mod security_events;
pub mod trusted_devices;
