#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use marketplace_pipeline::models::metrics::AggregateRecord;
use marketplace_pipeline::models::token::CoinListEntry;
use marketplace_pipeline::services::analytics_store::{AnalyticsStore, StoreError};
use marketplace_pipeline::services::object_store::{ObjectStore, ObjectStoreError};
use marketplace_pipeline::services::price_resolver::PriceTable;
use marketplace_pipeline::services::price_source::{
    HistoricalPrice, PriceSource, PriceSourceError,
};
use sea_orm::DbErr;

/// Analytics store kept in memory, with a switch to make every call fail
#[derive(Default)]
pub struct MemoryAnalyticsStore {
    prices: Mutex<Vec<(String, NaiveDate, f64)>>,
    aggregates: Mutex<Vec<AggregateRecord>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryAnalyticsStore {
    pub fn price_rows(&self) -> Vec<(String, NaiveDate, f64)> {
        self.prices.lock().unwrap().clone()
    }

    pub fn aggregate_rows(&self) -> Vec<AggregateRecord> {
        self.aggregates.lock().unwrap().clone()
    }

    pub fn seed_aggregates(&self, records: Vec<AggregateRecord>) {
        self.aggregates.lock().unwrap().extend(records);
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Database(DbErr::Custom(
                "connection refused".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryAnalyticsStore {
    async fn has_prices_for_date(&self, date: NaiveDate) -> Result<bool, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self.prices.lock().unwrap().iter().any(|(_, d, _)| *d == date))
    }

    async fn insert_prices(
        &self,
        date: NaiveDate,
        prices: &PriceTable,
    ) -> Result<usize, StoreError> {
        self.check(&self.fail_writes)?;
        let mut rows = self.prices.lock().unwrap();
        for token in prices.keys() {
            if rows.iter().any(|(t, d, _)| t == token && *d == date) {
                return Err(StoreError::Database(DbErr::Custom(format!(
                    "duplicate key ({}, {})",
                    token, date
                ))));
            }
        }
        rows.extend(prices.iter().map(|(token, price)| (token.clone(), date, *price)));
        Ok(prices.len())
    }

    async fn fetch_prices(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, StoreError> {
        self.check(&self.fail_reads)?;
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|(token, d, _)| *d == date && coin_ids.contains(token))
            .map(|(token, _, price)| (token.clone(), *price))
            .collect())
    }

    async fn replace_aggregates(&self, records: &[AggregateRecord]) -> Result<usize, StoreError> {
        self.check(&self.fail_writes)?;
        let mut rows = self.aggregates.lock().unwrap();
        rows.retain(|row| !records.iter().any(|r| r.date == row.date));
        rows.extend(records.iter().cloned());
        Ok(records.len())
    }

    async fn fetch_metrics(&self, date: NaiveDate) -> Result<Vec<AggregateRecord>, StoreError> {
        self.check(&self.fail_reads)?;
        let mut rows: Vec<AggregateRecord> = self
            .aggregates
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        Ok(rows)
    }
}

/// Object store kept in memory
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    pub fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn objects(&self) -> BTreeMap<String, Vec<u8>> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Upload {
                key: key.to_string(),
                message: "bucket unreachable".to_string(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }
}

/// Price service with a fixed listing and fixed per-coin outcomes
pub struct StubPriceSource {
    coins: Vec<CoinListEntry>,
    prices: HashMap<String, Option<f64>>,
    pub history_calls: AtomicUsize,
}

impl StubPriceSource {
    /// `prices`: Some(p) for a price, None for "no market data";
    /// coins missing from the map fail with a hard error
    pub fn new(coins: &[(&str, &str)], prices: &[(&str, Option<f64>)]) -> Arc<Self> {
        Arc::new(Self {
            coins: coins
                .iter()
                .map(|(id, symbol)| CoinListEntry {
                    id: id.to_string(),
                    symbol: symbol.to_string(),
                    name: id.to_string(),
                })
                .collect(),
            prices: prices
                .iter()
                .map(|(id, price)| (id.to_string(), *price))
                .collect(),
            history_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PriceSource for StubPriceSource {
    async fn fetch_coins_list(&self) -> Result<Vec<CoinListEntry>, PriceSourceError> {
        Ok(self.coins.clone())
    }

    async fn fetch_historical_price(
        &self,
        coin_id: &str,
        _date: NaiveDate,
    ) -> Result<HistoricalPrice, PriceSourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        match self.prices.get(coin_id) {
            Some(Some(price)) => Ok(HistoricalPrice::Usd(*price)),
            Some(None) => Ok(HistoricalPrice::NoMarketData),
            None => Err(PriceSourceError::MissingUsdPrice {
                coin_id: coin_id.to_string(),
            }),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
