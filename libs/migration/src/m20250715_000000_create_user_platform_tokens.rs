use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserPlatformTokens::Table)
                    .if_not_exists()
                    .col(big_integer(UserPlatformTokens::Id).auto_increment().primary_key())
                    .col(small_integer(UserPlatformTokens::Platform).default(0))
                    .col(string(UserPlatformTokens::UserId))
                    .col(string(UserPlatformTokens::DeviceId).default(""))
                    .col(string(UserPlatformTokens::Token))
                    .col(string(UserPlatformTokens::AppId))
                    .col(
                        timestamp_with_time_zone(UserPlatformTokens::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(UserPlatformTokens::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The dispatch fan-out queries by app, and per-item selectors by
        // user or token within an app.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_platform_tokens_app_id")
                    .table(UserPlatformTokens::Table)
                    .col(UserPlatformTokens::AppId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_platform_tokens_app_id_user_id")
                    .table(UserPlatformTokens::Table)
                    .col(UserPlatformTokens::AppId)
                    .col(UserPlatformTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_platform_tokens_app_id_token")
                    .table(UserPlatformTokens::Table)
                    .col(UserPlatformTokens::AppId)
                    .col(UserPlatformTokens::Token)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserPlatformTokens::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserPlatformTokens {
    Table,
    Id,
    Platform,
    UserId,
    DeviceId,
    Token,
    AppId,
    CreatedAt,
    UpdatedAt,
}
