use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SecurityEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SecurityEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SecurityEvents::AccountId).uuid())
                    .col(ColumnDef::new(SecurityEvents::Action).string().not_null())
                    .col(ColumnDef::new(SecurityEvents::Ip).string().not_null())
                    .col(
                        ColumnDef::new(SecurityEvents::UserAgent)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityEvents::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SecurityEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SecurityEvents::Table, SecurityEvents::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SecurityEvents::Table)
                    .col(SecurityEvents::AccountId)
                    .col((SecurityEvents::CreatedAt, IndexOrder::Desc))
                    .name("idx_security_events_account_id_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SecurityEvents::Table)
                    .col(SecurityEvents::Action)
                    .name("idx_security_events_action")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SecurityEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SecurityEvents {
    Table,
    Id,
    AccountId,
    Action,
    Ip,
    UserAgent,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
