// src/bin/ingest_token_prices.rs
//
// One-off price ingestion for INGEST_DATE (default: yesterday UTC), covering
// every ticker found in TRANSACTIONS_CSV. Exits cleanly when the date was
// already ingested.

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_pipeline::{
    config::PipelineConfig,
    services::{
        analytics_store::SeaOrmAnalyticsStore,
        coingecko::CoinGeckoService,
        object_store::S3ObjectStore,
        pipeline::{distinct_coin_ids, resolve_tickers},
        price_ingestion::PriceIngestionJob,
        price_resolver::PriceResolver,
        transactions_csv::read_transactions_file,
    },
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketplace_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let coingecko = CoinGeckoService::new(
        config.coingecko.base_url.clone(),
        config.coingecko.api_key.clone(),
        config.coingecko.timeout,
    )?;
    let resolver = PriceResolver::new(Arc::new(coingecko))
        .with_request_delay(config.coingecko.request_delay)
        .with_concurrency(config.coingecko.concurrency);

    let transactions = read_transactions_file(&config.transactions_csv)?;
    let index = resolver.build_index().await?;
    let (ticker_ids, unresolved) = resolve_tickers(&index, &transactions);
    let coin_ids = distinct_coin_ids(&ticker_ids);

    if coin_ids.is_empty() {
        println!("No resolvable tickers in {}", config.transactions_csv.display());
        return Ok(());
    }

    let object_store = S3ObjectStore::new(&config.object_store);
    object_store.ensure_bucket().await?;

    let job = PriceIngestionJob::new(
        resolver,
        Arc::new(SeaOrmAnalyticsStore::new(db)),
        Arc::new(object_store),
    );

    match job.run(&coin_ids, config.ingest_date).await {
        Ok(report) => {
            println!(
                "Stored {} prices for {} and uploaded {}",
                report.rows_written, report.date, report.object_key
            );
        }
        Err(e) if e.is_refusal() => {
            println!("{}", e);
        }
        Err(e) => return Err(e.into()),
    }

    if !unresolved.is_empty() {
        println!("Tickers without a price id: {}", unresolved.join(", "));
    }

    Ok(())
}
