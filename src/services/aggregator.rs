//! Per-(day, project) aggregation of marketplace transactions.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::models::metrics::AggregateRecord;
use crate::models::transaction::Transaction;
use crate::services::price_resolver::PriceTable;
use crate::services::symbol::normalize_symbol;

/// Base units per display unit for 18-decimal currencies
const BASE_UNITS_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Turns a batch of transactions plus a price table into daily aggregates.
pub trait TransactionAggregator: Send + Sync {
    /// Records come back in no particular order; see [`sort_records`].
    fn aggregate(
        &self,
        transactions: &[Transaction],
        prices: &PriceTable,
    ) -> Vec<AggregateRecord>;
}

/// Groups by UTC calendar day and project id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyProjectAggregator;

impl DailyProjectAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl TransactionAggregator for DailyProjectAggregator {
    fn aggregate(
        &self,
        transactions: &[Transaction],
        prices: &PriceTable,
    ) -> Vec<AggregateRecord> {
        let mut totals: HashMap<(NaiveDate, String), AggregateRecord> = HashMap::new();
        let mut skipped = 0usize;

        for txn in transactions {
            let date = txn.timestamp.date_naive();

            let amount = match parse_token_amount(txn.raw_value()) {
                Some(amount) => amount,
                None => {
                    tracing::warn!(
                        project_id = %txn.project_id,
                        value = %txn.raw_value(),
                        "Error parsing currency value, skipping transaction"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let price_usd = match lookup_price(txn.ticker(), prices) {
                Some(price) => price,
                None => {
                    tracing::warn!(
                        project_id = %txn.project_id,
                        "Price not found for currency symbol: {}",
                        txn.ticker()
                    );
                    skipped += 1;
                    continue;
                }
            };

            let volume_usd = amount * price_usd;

            totals
                .entry((date, txn.project_id.clone()))
                .and_modify(|record| {
                    record.transaction_count += 1;
                    record.total_volume_usd += volume_usd;
                })
                .or_insert_with(|| AggregateRecord {
                    date,
                    project_id: txn.project_id.clone(),
                    transaction_count: 1,
                    total_volume_usd: volume_usd,
                });
        }

        tracing::debug!(
            "Aggregated {} transactions into {} records ({} skipped)",
            transactions.len() - skipped,
            totals.len(),
            skipped
        );

        totals.into_values().collect()
    }
}

/// Parse a base-unit amount and convert it to display units.
///
/// Accepts plain and scientific notation; `None` when the text is not a
/// finite number. Values beyond the 96-bit decimal range are scaled as
/// `f64` instead.
pub fn parse_token_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let exact = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .and_then(|value| value.checked_div(Decimal::from(BASE_UNITS_PER_TOKEN)))
        .and_then(|value| value.to_f64());

    match exact {
        Some(amount) => Some(amount),
        None => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|value| value / BASE_UNITS_PER_TOKEN as f64),
    }
}

/// Exact ticker first, then its normalized form
pub fn lookup_price(ticker: &str, prices: &PriceTable) -> Option<f64> {
    prices
        .get(ticker)
        .or_else(|| prices.get(&normalize_symbol(ticker)))
        .copied()
}

/// Stable (date, project_id) ordering for display and storage
pub fn sort_records(records: &mut [AggregateRecord]) {
    records.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.project_id.cmp(&b.project_id))
    });
}
