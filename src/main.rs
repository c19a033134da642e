use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_pipeline::{
    build_router,
    config::PipelineConfig,
    services::{
        aggregator::DailyProjectAggregator,
        analytics_store::{AnalyticsStore, SeaOrmAnalyticsStore},
        coingecko::CoinGeckoService,
        metrics_table::render_metrics_table,
        object_store::S3ObjectStore,
        pipeline::{run_daily_pipeline, PipelineDeps},
        price_ingestion::PriceIngestionJob,
        price_resolver::PriceResolver,
        transactions_csv::read_transactions_file,
    },
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketplace_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let store: Arc<dyn AnalyticsStore> = Arc::new(SeaOrmAnalyticsStore::new(db));

    let coingecko = CoinGeckoService::new(
        config.coingecko.base_url.clone(),
        config.coingecko.api_key.clone(),
        config.coingecko.timeout,
    )?;
    let resolver = PriceResolver::new(Arc::new(coingecko))
        .with_request_delay(config.coingecko.request_delay)
        .with_concurrency(config.coingecko.concurrency);

    let object_store = S3ObjectStore::new(&config.object_store);
    object_store.ensure_bucket().await?;

    let transactions = read_transactions_file(&config.transactions_csv)?;

    let deps = PipelineDeps {
        resolver: resolver.clone(),
        job: PriceIngestionJob::new(resolver, store.clone(), Arc::new(object_store)),
        store: store.clone(),
        aggregator: Arc::new(DailyProjectAggregator::new()),
    };

    let summary = run_daily_pipeline(config.ingest_date, &transactions, &deps).await?;

    tracing::info!(
        "Pipeline finished for {}: {} tickers resolved, {} unresolved, {} aggregate records",
        config.ingest_date,
        summary.resolved_tickers,
        summary.unresolved_tickers.len(),
        summary.records.len()
    );

    let metrics = store.fetch_metrics(config.ingest_date).await?;
    println!("Marketplace metrics for {}", config.ingest_date);
    println!("{}", render_metrics_table(&metrics));

    let app = build_router(AppState { store });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
