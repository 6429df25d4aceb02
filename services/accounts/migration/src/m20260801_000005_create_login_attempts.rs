use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoginAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoginAttempts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LoginAttempts::Identifier)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoginAttempts::Ip).string().not_null())
                    .col(ColumnDef::new(LoginAttempts::Success).boolean().not_null())
                    .col(
                        ColumnDef::new(LoginAttempts::UserAgent)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoginAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::Identifier)
                    .col((LoginAttempts::CreatedAt, IndexOrder::Desc))
                    .name("idx_login_attempts_identifier_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(LoginAttempts::Table)
                    .col(LoginAttempts::Ip)
                    .col((LoginAttempts::CreatedAt, IndexOrder::Desc))
                    .name("idx_login_attempts_ip_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoginAttempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LoginAttempts {
    Table,
    Id,
    Identifier,
    Ip,
    Success,
    UserAgent,
    CreatedAt,
}
