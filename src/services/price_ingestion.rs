//! Daily token price ingestion.
//!
//! For one date: refuse if prices already exist, fetch prices, append them
//! to the analytical store in one batch, then mirror them to the object
//! store as CSV. The two writes are not transactional: if the upload fails
//! the database keeps the rows and the export must be re-run by hand.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::services::analytics_store::{AnalyticsStore, StoreError};
use crate::services::object_store::{ObjectStore, ObjectStoreError};
use crate::services::price_resolver::{PriceResolver, PriceResolverError, PriceTable};

pub const PRICE_EXPORT_HEADER: [&str; 2] = ["token", "average_price_usd"];

const PRICE_EXPORT_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("prices for the date {0} already exist, skipping batch insertion")]
    AlreadyIngested(NaiveDate),
    #[error("error checking existing prices: {0}")]
    IdempotencyCheck(#[source] StoreError),
    #[error("error fetching prices: {0}")]
    PriceFetch(#[from] PriceResolverError),
    #[error("error writing prices to the analytics store: {0}")]
    PrimaryWrite(#[source] StoreError),
    #[error("error building price export: {0}")]
    Export(String),
    #[error("error uploading price export: {0}")]
    SecondaryWrite(#[from] ObjectStoreError),
}

impl IngestionError {
    /// The date was ingested before; nothing was changed
    pub fn is_refusal(&self) -> bool {
        matches!(self, IngestionError::AlreadyIngested(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionReport {
    pub date: NaiveDate,
    pub rows_written: usize,
    pub object_key: String,
}

pub struct PriceIngestionJob {
    resolver: PriceResolver,
    store: Arc<dyn AnalyticsStore>,
    object_store: Arc<dyn ObjectStore>,
}

impl PriceIngestionJob {
    pub fn new(
        resolver: PriceResolver,
        store: Arc<dyn AnalyticsStore>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            resolver,
            store,
            object_store,
        }
    }

    pub async fn run(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<IngestionReport, IngestionError> {
        tracing::info!("Starting price ingestion for {} ({} coins)", date, coin_ids.len());

        if self
            .store
            .has_prices_for_date(date)
            .await
            .map_err(IngestionError::IdempotencyCheck)?
        {
            return Err(IngestionError::AlreadyIngested(date));
        }

        let prices = self.resolver.fetch_prices(coin_ids, date).await?;

        let rows_written = self
            .store
            .insert_prices(date, &prices)
            .await
            .map_err(IngestionError::PrimaryWrite)?;

        tracing::info!("Stored {} token prices for {}", rows_written, date);

        let export = write_price_export(&prices)?;
        let object_key = price_export_key(date);

        if let Err(e) = self
            .object_store
            .put_object(&object_key, export, PRICE_EXPORT_CONTENT_TYPE)
            .await
        {
            tracing::error!(
                "Prices for {} are stored but export '{}' failed; re-run the export",
                date,
                object_key
            );
            return Err(e.into());
        }

        Ok(IngestionReport {
            date,
            rows_written,
            object_key,
        })
    }
}

/// Object key for a date's export; re-runs overwrite the same object
pub fn price_export_key(date: NaiveDate) -> String {
    format!("prices-{}.csv", date.format("%Y-%m-%d"))
}

/// Header plus one `token,price` row per entry, sorted by token, 8 decimals
pub fn write_price_export(prices: &PriceTable) -> Result<Vec<u8>, IngestionError> {
    let mut rows: Vec<(&String, &f64)> = prices.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    csv.write_record(PRICE_EXPORT_HEADER)
        .map_err(|e| IngestionError::Export(format!("CSV write error: {e}")))?;

    for (token, price) in rows {
        csv.write_record([token.as_str(), &format!("{:.8}", price)])
            .map_err(|e| IngestionError::Export(format!("CSV write error: {e}")))?;
    }

    csv.into_inner()
        .map_err(|e| IngestionError::Export(format!("CSV flush error: {e}")))
}
