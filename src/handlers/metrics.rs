use axum::{extract::{Query, State}, http::StatusCode, Json};

use crate::{
    models::{
        metrics::{AggregateRecord, MetricsQuery},
        token::ErrorResponse,
    },
    AppState,
};

/// Handler for GET /metrics?date=YYYY-MM-DD
/// Returns the stored per-project aggregates for one day
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<AggregateRecord>>, (StatusCode, Json<ErrorResponse>)> {
    let date = query.parse_date().map_err(|error| {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
    })?;

    tracing::info!("Fetching metrics for {}", date);

    let records = state.store.fetch_metrics(date).await.map_err(|e| {
        tracing::error!("Failed to fetch metrics for {}: {}", date, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to fetch metrics: {}", e),
            }),
        )
    })?;

    Ok(Json(records))
}
