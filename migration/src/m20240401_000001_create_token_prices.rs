use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TokenPrices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TokenPrices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TokenPrices::Token).string().not_null())
                    .col(ColumnDef::new(TokenPrices::Date).date().not_null())
                    .col(
                        ColumnDef::new(TokenPrices::AveragePriceUsd)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TokenPrices::CreatedAt)
                            .timestamp()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // One price per token per date
        manager
            .create_index(
                Index::create()
                    .name("idx_token_prices_token_date")
                    .table(TokenPrices::Table)
                    .col(TokenPrices::Token)
                    .col(TokenPrices::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Idempotency check scans by date only
        manager
            .create_index(
                Index::create()
                    .name("idx_token_prices_date")
                    .table(TokenPrices::Table)
                    .col(TokenPrices::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TokenPrices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TokenPrices {
    Table,
    Id,
    Token,
    Date,
    AveragePriceUsd,
    CreatedAt,
}
