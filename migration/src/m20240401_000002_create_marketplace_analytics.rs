use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MarketplaceAnalytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MarketplaceAnalytics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MarketplaceAnalytics::Date).date().not_null())
                    .col(
                        ColumnDef::new(MarketplaceAnalytics::ProjectId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAnalytics::TransactionCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAnalytics::TotalVolumeUsd)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MarketplaceAnalytics::CreatedAt)
                            .timestamp()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // One aggregate per project per day
        manager
            .create_index(
                Index::create()
                    .name("idx_marketplace_analytics_date_project")
                    .table(MarketplaceAnalytics::Table)
                    .col(MarketplaceAnalytics::Date)
                    .col(MarketplaceAnalytics::ProjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketplaceAnalytics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketplaceAnalytics {
    Table,
    Id,
    Date,
    ProjectId,
    TransactionCount,
    TotalVolumeUsd,
    CreatedAt,
}
