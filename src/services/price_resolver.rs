//! Ticker → price-service id resolution and historical price fetching.

use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::token::CoinListEntry;
use crate::services::price_source::{PriceSource, PriceSourceError};
use crate::services::symbol::normalize_symbol;

/// Preferred price-service id for tickers shared by several listings
/// (native network coin over bridged or wrapped variants).
pub const CANONICAL_COIN_IDS: &[(&str, &str)] = &[
    ("MATIC", "matic-network"),
    ("ETH", "ethereum"),
    ("BTC", "bitcoin"),
    ("USDC", "usd-coin"),
    ("USDT", "tether"),
];

/// USD prices for one date, keyed by coin id or ticker.
/// A value of 0 means the service had no market data.
pub type PriceTable = HashMap<String, f64>;

fn canonical_coin_id(symbol: &str) -> Option<&'static str> {
    CANONICAL_COIN_IDS
        .iter()
        .find(|(ticker, _)| *ticker == symbol)
        .map(|(_, id)| *id)
}

/// Uppercase ticker → coin id, one id per ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceIndex {
    ids: HashMap<String, String>,
}

impl PriceIndex {
    /// Build the index from a listing.
    ///
    /// The first id seen for a ticker is kept, unless a later entry carries
    /// the canonical id for that ticker.
    pub fn from_coins(coins: &[CoinListEntry]) -> Self {
        let mut ids: HashMap<String, String> = HashMap::with_capacity(coins.len());

        for coin in coins {
            let symbol = coin.symbol.to_uppercase();
            let is_canonical = canonical_coin_id(&symbol) == Some(coin.id.as_str());

            match ids.entry(symbol) {
                Entry::Vacant(entry) => {
                    entry.insert(coin.id.clone());
                }
                Entry::Occupied(mut entry) => {
                    if is_canonical {
                        entry.insert(coin.id.clone());
                    }
                }
            }
        }

        Self { ids }
    }

    /// Exact lookup by uppercase ticker
    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.ids.get(symbol).map(String::as_str)
    }

    /// Lookup of a raw transaction ticker through its normalized form
    pub fn resolve(&self, ticker: &str) -> Option<&str> {
        self.get(&normalize_symbol(ticker))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PriceResolverError {
    #[error("failed to fetch coin listing: {0}")]
    Listing(#[source] PriceSourceError),
    #[error("failed to fetch price for coin {coin_id}: {source}")]
    Lookup {
        coin_id: String,
        #[source]
        source: PriceSourceError,
    },
}

#[derive(Clone)]
pub struct PriceResolver {
    source: Arc<dyn PriceSource>,
    request_delay: Duration,
    concurrency: usize,
}

impl PriceResolver {
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            request_delay: Duration::ZERO,
            concurrency: 1,
        }
    }

    /// Pause between sequential lookups (rate limiting)
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Number of lookups in flight at once; 1 keeps them sequential
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn build_index(&self) -> Result<PriceIndex, PriceResolverError> {
        let coins = self
            .source
            .fetch_coins_list()
            .await
            .map_err(PriceResolverError::Listing)?;

        let index = PriceIndex::from_coins(&coins);

        tracing::info!(
            "Built price index: {} tickers from {} listed coins",
            index.len(),
            coins.len()
        );

        Ok(index)
    }

    /// Fetch USD prices for `coin_ids` on `date`.
    ///
    /// Any lookup error fails the whole batch; coins without market data
    /// get the 0 sentinel.
    pub async fn fetch_prices(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, PriceResolverError> {
        tracing::info!("Fetching {} prices for {}", coin_ids.len(), date);

        let prices = if self.concurrency > 1 {
            self.fetch_prices_concurrent(coin_ids, date).await?
        } else {
            self.fetch_prices_sequential(coin_ids, date).await?
        };

        let missing = prices.values().filter(|price| **price == 0.0).count();
        if missing > 0 {
            tracing::warn!("{} of {} coins had no market data on {}", missing, prices.len(), date);
        }

        Ok(prices)
    }

    async fn fetch_prices_sequential(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, PriceResolverError> {
        let mut prices = PriceTable::with_capacity(coin_ids.len());

        for (index, coin_id) in coin_ids.iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let price = self
                .source
                .fetch_historical_price(coin_id, date)
                .await
                .map_err(|source| PriceResolverError::Lookup {
                    coin_id: coin_id.clone(),
                    source,
                })?;

            tracing::debug!("Price for {} on {}: {:?}", coin_id, date, price);
            prices.insert(coin_id.clone(), price.usd_or_zero());
        }

        Ok(prices)
    }

    async fn fetch_prices_concurrent(
        &self,
        coin_ids: &[String],
        date: NaiveDate,
    ) -> Result<PriceTable, PriceResolverError> {
        let source = &self.source;

        stream::iter(coin_ids.iter().cloned())
            .map(|coin_id| async move {
                match source.fetch_historical_price(&coin_id, date).await {
                    Ok(price) => Ok((coin_id, price.usd_or_zero())),
                    Err(source) => Err(PriceResolverError::Lookup { coin_id, source }),
                }
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }
}
