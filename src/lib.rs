// src/lib.rs

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::analytics_store::AnalyticsStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AnalyticsStore>,
}

pub mod entities {
    pub mod prelude;
    pub mod marketplace_analytics;
    pub mod token_prices;
}

pub mod services {
    pub mod aggregator;
    pub mod analytics_store;
    pub mod coingecko;
    pub mod metrics_table;
    pub mod object_store;
    pub mod pipeline;
    pub mod price_ingestion;
    pub mod price_resolver;
    pub mod price_source;
    pub mod symbol;
    pub mod transactions_csv;
}

pub mod config;
pub mod models;
pub mod handlers;

/// Read-side HTTP surface
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics::get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
