//! Runtime configuration, read once from the environment (and `.env`).

use chrono::{Days, NaiveDate, Utc};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TRANSACTIONS_CSV: &str = "data/sample.csv";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_delay: Duration,
    pub concurrency: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub coingecko: CoinGeckoConfig,
    pub object_store: ObjectStoreConfig,
    /// Day whose prices are ingested and whose metrics are displayed
    pub ingest_date: NaiveDate,
    pub transactions_csv: PathBuf,
    pub bind_addr: SocketAddr,
}

impl PipelineConfig {
    /// Load from process environment after applying `.env`, if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let coingecko = CoinGeckoConfig {
            base_url: var("COINGECKO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
            api_key: var("COINGECKO_API_KEY"),
            request_delay: Duration::from_millis(parse_or(
                "COINGECKO_REQUEST_DELAY_MS",
                var("COINGECKO_REQUEST_DELAY_MS"),
                120,
            )?),
            concurrency: parse_or("COINGECKO_CONCURRENCY", var("COINGECKO_CONCURRENCY"), 1)?,
            timeout: Duration::from_secs(parse_or(
                "HTTP_TIMEOUT_SECS",
                var("HTTP_TIMEOUT_SECS"),
                30,
            )?),
        };

        let object_store = ObjectStoreConfig {
            endpoint: var("S3_ENDPOINT").unwrap_or_else(|| "http://localhost:9000".to_string()),
            region: var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            bucket: var("S3_BUCKET").unwrap_or_else(|| "currency-data".to_string()),
            access_key: var("S3_ACCESS_KEY").ok_or(ConfigError::Missing("S3_ACCESS_KEY"))?,
            secret_key: var("S3_SECRET_KEY").ok_or(ConfigError::Missing("S3_SECRET_KEY"))?,
        };

        let ingest_date = match var("INGEST_DATE") {
            Some(value) => parse_date("INGEST_DATE", &value)?,
            None => default_ingest_date(),
        };

        let transactions_csv = PathBuf::from(
            var("TRANSACTIONS_CSV").unwrap_or_else(|| DEFAULT_TRANSACTIONS_CSV.to_string()),
        );

        let bind_addr = parse_or(
            "BIND_ADDR",
            var("BIND_ADDR"),
            DEFAULT_BIND_ADDR
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::Invalid {
                    name: "BIND_ADDR",
                    value: DEFAULT_BIND_ADDR.to_string(),
                })?,
        )?;

        Ok(Self {
            database_url,
            coingecko,
            object_store,
            ingest_date,
            transactions_csv,
            bind_addr,
        })
    }
}

/// Yesterday (UTC), the most recent complete day
pub fn default_ingest_date() -> NaiveDate {
    let today = Utc::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}

pub fn parse_date(name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
