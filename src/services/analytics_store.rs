//! Analytical store: daily token prices and marketplace aggregates.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::BTreeSet;

use crate::entities::{marketplace_analytics, prelude::*, token_prices};
use crate::models::metrics::AggregateRecord;
use crate::services::price_resolver::PriceTable;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

/// Storage shared by the ingestion pipeline and the metrics endpoint.
///
/// Writes are batch appends applied atomically, so concurrent readers
/// never see half a batch.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Whether any `token_prices` row exists for `date`
    async fn has_prices_for_date(&self, date: NaiveDate) -> Result<bool, StoreError>;

    /// Append one (token, date, price) row per entry in a single batch
    async fn insert_prices(
        &self,
        date: NaiveDate,
        prices: &PriceTable,
    ) -> Result<usize, StoreError>;

    /// Stored prices for `coin_ids` on `date`, keyed by coin id
    async fn fetch_prices(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, StoreError>;

    /// Replace all aggregates for the days present in `records`
    async fn replace_aggregates(&self, records: &[AggregateRecord]) -> Result<usize, StoreError>;

    /// Aggregates for one day, ordered by project id
    async fn fetch_metrics(&self, date: NaiveDate) -> Result<Vec<AggregateRecord>, StoreError>;
}

#[derive(Clone)]
pub struct SeaOrmAnalyticsStore {
    db: DatabaseConnection,
}

impl SeaOrmAnalyticsStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalyticsStore for SeaOrmAnalyticsStore {
    async fn has_prices_for_date(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let count = TokenPrices::find()
            .filter(token_prices::Column::Date.eq(date))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn insert_prices(
        &self,
        date: NaiveDate,
        prices: &PriceTable,
    ) -> Result<usize, StoreError> {
        if prices.is_empty() {
            return Ok(0);
        }

        let mut tokens: Vec<(&String, &f64)> = prices.iter().collect();
        tokens.sort_by(|a, b| a.0.cmp(b.0));

        let rows: Vec<token_prices::ActiveModel> = tokens
            .into_iter()
            .map(|(token, price)| token_prices::ActiveModel {
                token: Set(token.clone()),
                date: Set(date),
                average_price_usd: Set(*price),
                ..Default::default()
            })
            .collect();
        let count = rows.len();

        let txn = self.db.begin().await?;
        TokenPrices::insert_many(rows).exec(&txn).await?;
        txn.commit().await?;

        tracing::debug!("Inserted {} token prices for {}", count, date);

        Ok(count)
    }

    async fn fetch_prices(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, StoreError> {
        let rows = TokenPrices::find()
            .filter(token_prices::Column::Token.is_in(coin_ids.iter().cloned()))
            .filter(token_prices::Column::Date.eq(date))
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.token, row.average_price_usd))
            .collect())
    }

    async fn replace_aggregates(&self, records: &[AggregateRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();

        let rows = records
            .iter()
            .map(|record| {
                let transaction_count = i64::try_from(record.transaction_count).map_err(|_| {
                    StoreError::InvalidRow(format!(
                        "transaction count {} out of range for project {}",
                        record.transaction_count, record.project_id
                    ))
                })?;

                Ok(marketplace_analytics::ActiveModel {
                    date: Set(record.date),
                    project_id: Set(record.project_id.clone()),
                    transaction_count: Set(transaction_count),
                    total_volume_usd: Set(record.total_volume_usd),
                    ..Default::default()
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let txn = self.db.begin().await?;

        let deleted = MarketplaceAnalytics::delete_many()
            .filter(marketplace_analytics::Column::Date.is_in(days.iter().copied()))
            .exec(&txn)
            .await?;

        MarketplaceAnalytics::insert_many(rows).exec(&txn).await?;
        txn.commit().await?;

        if deleted.rows_affected > 0 {
            tracing::info!(
                "Replaced {} existing aggregate rows for {} day(s)",
                deleted.rows_affected,
                days.len()
            );
        }

        Ok(records.len())
    }

    async fn fetch_metrics(&self, date: NaiveDate) -> Result<Vec<AggregateRecord>, StoreError> {
        let rows = MarketplaceAnalytics::find()
            .filter(marketplace_analytics::Column::Date.eq(date))
            .order_by(marketplace_analytics::Column::ProjectId, Order::Asc)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| {
                let transaction_count = u64::try_from(row.transaction_count).map_err(|_| {
                    StoreError::InvalidRow(format!(
                        "negative transaction count for project {}",
                        row.project_id
                    ))
                })?;

                Ok(AggregateRecord {
                    date: row.date,
                    project_id: row.project_id,
                    transaction_count,
                    total_volume_usd: row.total_volume_usd,
                })
            })
            .collect()
    }
}
