mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

use marketplace_pipeline::{build_router, models::metrics::AggregateRecord, AppState};

use crate::common::{date, MemoryAnalyticsStore};

fn record(day: u32, project_id: &str, count: u64, volume: f64) -> AggregateRecord {
    AggregateRecord {
        date: date(2024, 4, day),
        project_id: project_id.to_string(),
        transaction_count: count,
        total_volume_usd: volume,
    }
}

fn build_test_router(store: Arc<MemoryAnalyticsStore>) -> Router {
    build_router(AppState { store })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();

    (status, json)
}

#[tokio::test]
async fn test_get_metrics_returns_records_for_date() {
    let store = Arc::new(MemoryAnalyticsStore::default());
    store.seed_aggregates(vec![
        record(2, "4974", 2, 12.5),
        record(2, "1660", 1, 0.7),
        record(3, "4974", 9, 99.0),
    ]);

    let (status, json) = get(build_test_router(store), "/metrics?date=2024-04-02").await;

    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().expect("Response should be an array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["project_id"], "1660");
    assert_eq!(rows[0]["date"], "2024-04-02");
    assert_eq!(rows[1]["project_id"], "4974");
    assert_eq!(rows[1]["transaction_count"], 2);
    assert_eq!(rows[1]["total_volume_usd"], 12.5);
}

#[tokio::test]
async fn test_get_metrics_empty_day() {
    let store = Arc::new(MemoryAnalyticsStore::default());

    let (status, json) = get(build_test_router(store), "/metrics?date=2024-04-02").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Array(vec![]));
}

#[tokio::test]
async fn test_get_metrics_missing_date() {
    let store = Arc::new(MemoryAnalyticsStore::default());

    let (status, json) = get(build_test_router(store), "/metrics").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Missing 'date'"));
}

#[tokio::test]
async fn test_get_metrics_malformed_date() {
    let store = Arc::new(MemoryAnalyticsStore::default());

    let (status, json) = get(build_test_router(store), "/metrics?date=02-04-2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid date format"));
}

#[tokio::test]
async fn test_get_metrics_store_failure() {
    let store = Arc::new(MemoryAnalyticsStore::default());
    store.fail_reads.store(true, Ordering::SeqCst);

    let (status, json) = get(build_test_router(store), "/metrics?date=2024-04-02").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("Failed to fetch metrics"));
}
