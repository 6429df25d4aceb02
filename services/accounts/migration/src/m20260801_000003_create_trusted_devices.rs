use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrustedDevices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrustedDevices::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrustedDevices::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(TrustedDevices::Fingerprint)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrustedDevices::Label).string().not_null())
                    .col(ColumnDef::new(TrustedDevices::LastIp).string())
                    .col(
                        ColumnDef::new(TrustedDevices::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(TrustedDevices::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(TrustedDevices::LastUsedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrustedDevices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TrustedDevices::Table, TrustedDevices::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(TrustedDevices::Table)
                    .col(TrustedDevices::AccountId)
                    .col(TrustedDevices::Fingerprint)
                    .unique()
                    .name("idx_trusted_devices_account_id_fingerprint")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrustedDevices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TrustedDevices {
    Table,
    Id,
    AccountId,
    Fingerprint,
    Label,
    LastIp,
    Active,
    ExpiresAt,
    LastUsedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
}
