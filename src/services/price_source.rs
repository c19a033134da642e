use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::token::CoinListEntry;

/// Outcome of a single historical lookup that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoricalPrice {
    /// Positive USD price for the requested date
    Usd(f64),
    /// The service knows the coin but has no market data for that date
    NoMarketData,
}

impl HistoricalPrice {
    /// Price to store, with 0 standing in for "no market data"
    pub fn usd_or_zero(self) -> f64 {
        match self {
            HistoricalPrice::Usd(price) => price,
            HistoricalPrice::NoMarketData => 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PriceSourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid price service response: {0}")]
    Decode(String),
    #[error("missing USD price for {coin_id}")]
    MissingUsdPrice { coin_id: String },
    #[error("invalid USD price for {coin_id}: {value}")]
    InvalidUsdPrice { coin_id: String, value: String },
}

/// External source of coin listings and historical USD prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Full listing of known coins (id, ticker, name)
    async fn fetch_coins_list(&self) -> Result<Vec<CoinListEntry>, PriceSourceError>;

    /// USD price of `coin_id` on `date`
    async fn fetch_historical_price(
        &self,
        coin_id: &str,
        date: NaiveDate,
    ) -> Result<HistoricalPrice, PriceSourceError>;
}
