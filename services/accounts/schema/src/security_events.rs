use sea_orm::entity::prelude::*;

/// Append-only audit record for a security-relevant action.
/// `account_id` is null when the actor could not be resolved
/// (e.g. a failed login against an unknown identifier).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "security_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    /// Wire value of `roomlet_domain::event::SecurityAction`.
    pub action: String,
    pub ip: String,
    /// Sanitized user-agent (CR/LF stripped, capped at 500 chars).
    pub user_agent: String,
    pub metadata: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Account,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
