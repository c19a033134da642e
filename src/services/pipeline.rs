//! One daily run: resolve tickers, ingest prices, aggregate, load.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::metrics::AggregateRecord;
use crate::models::transaction::Transaction;
use crate::services::aggregator::{sort_records, TransactionAggregator};
use crate::services::analytics_store::{AnalyticsStore, StoreError};
use crate::services::price_ingestion::{IngestionError, IngestionReport, PriceIngestionJob};
use crate::services::price_resolver::{PriceIndex, PriceResolver, PriceResolverError, PriceTable};
use crate::services::symbol::normalize_symbol;
use crate::services::transactions_csv::unique_tickers;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to build price index: {0}")]
    Index(#[from] PriceResolverError),
    #[error("price ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
    #[error("failed to read stored prices: {0}")]
    PriceReadback(#[source] StoreError),
    #[error("failed to load aggregates: {0}")]
    Load(#[source] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSummary {
    pub resolved_tickers: usize,
    pub unresolved_tickers: Vec<String>,
    /// None when the date had already been ingested
    pub ingestion: Option<IngestionReport>,
    pub records: Vec<AggregateRecord>,
}

pub struct PipelineDeps {
    pub resolver: PriceResolver,
    pub job: PriceIngestionJob,
    pub store: Arc<dyn AnalyticsStore>,
    pub aggregator: Arc<dyn TransactionAggregator>,
}

/// Normalized ticker -> coin id for every distinct ticker the index knows,
/// plus the raw tickers it does not.
pub fn resolve_tickers(
    index: &PriceIndex,
    transactions: &[Transaction],
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut ticker_ids = BTreeMap::new();
    let mut unresolved = Vec::new();

    for ticker in unique_tickers(transactions) {
        let normalized = normalize_symbol(&ticker);
        match index.get(&normalized) {
            Some(id) => {
                ticker_ids.insert(normalized, id.to_string());
            }
            None => {
                tracing::warn!("No price id for ticker '{}' ({})", ticker, normalized);
                unresolved.push(ticker);
            }
        }
    }

    (ticker_ids, unresolved)
}

/// Transactions whose UTC day is `date`, plus the count of the others
pub fn transactions_on(
    date: NaiveDate,
    transactions: &[Transaction],
) -> (Vec<Transaction>, usize) {
    let on_date: Vec<Transaction> = transactions
        .iter()
        .filter(|txn| txn.timestamp.date_naive() == date)
        .cloned()
        .collect();
    let outside = transactions.len() - on_date.len();
    (on_date, outside)
}

/// Sorted, deduplicated ids; several tickers may share one id
pub fn distinct_coin_ids(ticker_ids: &BTreeMap<String, String>) -> Vec<String> {
    let mut coin_ids: Vec<String> = ticker_ids.values().cloned().collect();
    coin_ids.sort();
    coin_ids.dedup();
    coin_ids
}

pub async fn run_daily_pipeline(
    date: NaiveDate,
    transactions: &[Transaction],
    deps: &PipelineDeps,
) -> Result<PipelineSummary, PipelineError> {
    // Prices are for one day; other days' rows would be repriced wrongly
    let (transactions, outside) = transactions_on(date, transactions);
    if outside > 0 {
        tracing::info!("Ignoring {} transactions outside {}", outside, date);
    }

    let index = deps.resolver.build_index().await?;

    let (ticker_ids, unresolved) = resolve_tickers(&index, &transactions);

    if ticker_ids.is_empty() {
        tracing::warn!("No tickers could be resolved for {}, nothing to do", date);
        return Ok(PipelineSummary {
            unresolved_tickers: unresolved,
            ..Default::default()
        });
    }

    let coin_ids = distinct_coin_ids(&ticker_ids);

    tracing::info!(
        "Resolved {} tickers to {} coin ids for {}",
        ticker_ids.len(),
        coin_ids.len(),
        date
    );

    let ingestion = match deps.job.run(&coin_ids, date).await {
        Ok(report) => Some(report),
        Err(e) if e.is_refusal() => {
            tracing::info!("{}; using stored prices", e);
            None
        }
        Err(e) => return Err(e.into()),
    };

    let stored = deps
        .store
        .fetch_prices(&coin_ids, date)
        .await
        .map_err(PipelineError::PriceReadback)?;

    let prices: PriceTable = ticker_ids
        .iter()
        .filter_map(|(ticker, id)| stored.get(id).map(|price| (ticker.clone(), *price)))
        .collect();

    let mut records = deps.aggregator.aggregate(&transactions, &prices);
    sort_records(&mut records);

    let loaded = deps
        .store
        .replace_aggregates(&records)
        .await
        .map_err(PipelineError::Load)?;

    tracing::info!("Loaded {} aggregate records", loaded);

    Ok(PipelineSummary {
        resolved_tickers: ticker_ids.len(),
        unresolved_tickers: unresolved,
        ingestion,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::token::CoinListEntry;
    use crate::models::transaction::{TransactionNums, TransactionProps};
    use chrono::{TimeZone, Utc};

    fn txn(ticker: &str) -> Transaction {
        Transaction {
            timestamp: Utc.with_ymd_and_hms(2024, 4, 2, 12, 0, 0).unwrap(),
            event: "BUY_ITEMS".to_string(),
            project_id: "4974".to_string(),
            props: TransactionProps {
                currency_symbol: ticker.to_string(),
                chain_id: "137".to_string(),
                collection_address: None,
                currency_address: None,
            },
            nums: TransactionNums {
                currency_value_decimal: "1000000000000000000".to_string(),
            },
        }
    }

    fn coin(id: &str, symbol: &str) -> CoinListEntry {
        CoinListEntry {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
        }
    }

    #[test]
    fn test_resolve_tickers() {
        let index = PriceIndex::from_coins(&[
            coin("usd-coin", "usdc"),
            coin("weth", "weth"),
            coin("ethereum", "eth"),
        ]);
        let transactions = vec![txn("USDC.e"), txn("USDC"), txn("WETH"), txn("NOPE")];

        let (ticker_ids, unresolved) = resolve_tickers(&index, &transactions);

        assert_eq!(ticker_ids.get("USDC").map(String::as_str), Some("usd-coin"));
        // WETH normalizes to ETH before the lookup
        assert_eq!(ticker_ids.get("ETH").map(String::as_str), Some("ethereum"));
        assert_eq!(ticker_ids.len(), 2);
        assert_eq!(unresolved, vec!["NOPE".to_string()]);
        assert_eq!(
            distinct_coin_ids(&ticker_ids),
            vec!["ethereum".to_string(), "usd-coin".to_string()]
        );
    }

    #[test]
    fn test_transactions_on_filters_by_utc_day() {
        let mut late = txn("SFL");
        late.timestamp = Utc.with_ymd_and_hms(2024, 4, 1, 23, 59, 59).unwrap();
        let transactions = vec![late, txn("SFL"), txn("MATIC")];

        let (on_date, outside) = transactions_on(
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            &transactions,
        );

        assert_eq!(on_date.len(), 2);
        assert_eq!(outside, 1);
        assert!(on_date.iter().all(|t| t.timestamp.date_naive().to_string() == "2024-04-02"));
    }
}
