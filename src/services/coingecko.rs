use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::models::token::CoinListEntry;
use crate::services::price_source::{HistoricalPrice, PriceSource, PriceSourceError};

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    cache: Arc<Cache<String, HistoricalPrice>>,
}

#[derive(Debug, Deserialize)]
struct CoinHistoryResponse {
    #[serde(default)]
    id: Option<String>,
    // Anything other than an object here means no market data
    #[serde(default)]
    market_data: Option<serde_json::Value>,
}

impl CoinGeckoService {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PriceSourceError> {
        let cache = Cache::builder()
            .max_capacity(10_000) // One entry per (coin, date) looked up
            .time_to_live(Duration::from_secs(3600)) // 1 hour TTL
            .build();

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(cache),
        })
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, PriceSourceError> {
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(query);

        if let Some(api_key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PriceSourceError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoService {
    async fn fetch_coins_list(&self) -> Result<Vec<CoinListEntry>, PriceSourceError> {
        tracing::info!("Fetching coins from CoinGecko /coins/list");

        let url = format!("{}/coins/list", self.base_url);
        let body = self.get(&url, &[]).await?;

        let coins: Vec<CoinListEntry> = serde_json::from_str(&body)
            .map_err(|e| PriceSourceError::Decode(format!("coins list: {}", e)))?;

        tracing::info!("Fetched {} coins from CoinGecko", coins.len());

        Ok(coins)
    }

    async fn fetch_historical_price(
        &self,
        coin_id: &str,
        date: NaiveDate,
    ) -> Result<HistoricalPrice, PriceSourceError> {
        let cache_key = format!("{}_{}", coin_id, date);

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached);
        }

        let url = format!("{}/coins/{}/history", self.base_url, coin_id);
        let formatted_date = format_history_date(date);

        tracing::debug!("Fetching {} price for {} from CoinGecko", formatted_date, coin_id);

        let body = self
            .get(&url, &[("date", formatted_date.as_str()), ("localization", "false")])
            .await?;

        let price = parse_historical_price(coin_id, &body)?;

        self.cache.insert(cache_key, price).await;

        Ok(price)
    }
}

/// CoinGecko's history endpoint expects dd-mm-yyyy
pub fn format_history_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Classify a `/coins/{id}/history` body.
///
/// No `market_data` (or no `current_price` inside it) is the soft
/// [`HistoricalPrice::NoMarketData`] outcome; a missing, non-numeric or
/// non-positive `usd` entry is an error.
pub fn parse_historical_price(
    coin_id: &str,
    body: &str,
) -> Result<HistoricalPrice, PriceSourceError> {
    let response: CoinHistoryResponse = serde_json::from_str(body)
        .map_err(|e| PriceSourceError::Decode(format!("history for {}: {}", coin_id, e)))?;

    let current_price = match response
        .market_data
        .as_ref()
        .and_then(|market_data| market_data.get("current_price"))
        .and_then(|current_price| current_price.as_object())
    {
        Some(current_price) => current_price,
        None => {
            tracing::warn!(
                "No market data for token {}",
                response.id.as_deref().unwrap_or(coin_id)
            );
            return Ok(HistoricalPrice::NoMarketData);
        }
    };

    let usd = current_price
        .get("usd")
        .ok_or_else(|| PriceSourceError::MissingUsdPrice {
            coin_id: coin_id.to_string(),
        })?;

    match usd.as_f64() {
        Some(price) if price.is_finite() && price > 0.0 => Ok(HistoricalPrice::Usd(price)),
        _ => Err(PriceSourceError::InvalidUsdPrice {
            coin_id: coin_id.to_string(),
            value: usd.to_string(),
        }),
    }
}
