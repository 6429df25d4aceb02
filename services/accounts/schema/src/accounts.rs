use sea_orm::entity::prelude::*;

/// Account record: credentials, verification state, MFA settings, lockout state.
///
/// `email` is stored lowercase. `locked_until` in the past means unlocked;
/// the failed counter is cleared lazily on the next lock check.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: Option<String>,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub kind: i16,
    pub email_verified: bool,
    pub mfa_method: i16,
    /// Base32-encoded TOTP secret, present only when the TOTP method is enrolled.
    pub totp_secret: Option<String>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::backup_codes::Entity")]
    BackupCodes,
    #[sea_orm(has_many = "super::trusted_devices::Entity")]
    TrustedDevices,
    #[sea_orm(has_many = "super::security_events::Entity")]
    SecurityEvents,
}

impl Related<super::backup_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupCodes.def()
    }
}

impl Related<super::trusted_devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrustedDevices.def()
    }
}

impl Related<super::security_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SecurityEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
