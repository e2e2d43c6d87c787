//! HTTP endpoint handlers

use crate::api::error::ApiError;
use crate::service::{AppState, HealthCheck, HealthStatus};
use crate::types::{LeaderboardEntry, MatchupItem, SubmitRequest, SubmitResponse, VoteRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

/// Service information and endpoint list
pub async fn root_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/matchup",
            "/vote",
            "/leaderboard-data",
            "/submit",
            "/health",
            "/alive",
            "/metrics"
        ]
    }))
}

/// `GET /matchup`: two random items, or `[]` when there are not enough
pub async fn matchup_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MatchupItem>>, ApiError> {
    Ok(Json(state.matchup()?))
}

/// `POST /vote`
pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        state.metrics().record_vote_rejected("invalid_input");
        ApiError::from(rejection)
    })?;

    state.vote(request)?;
    Ok(Json(json!({ "status": "ok" })))
}

/// `GET /leaderboard-data`
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(state.leaderboard()?))
}

/// `POST /submit`
pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.submit(request)?))
}

/// `GET /health`: full report, 503 when unhealthy
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let health = HealthCheck::check(&state);
    let status = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    (status, Json(health))
}

/// `GET /alive`: liveness probe
pub async fn alive_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::liveness_check(&state) {
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
        _ => (StatusCode::OK, "Alive"),
    }
}

/// `GET /metrics`: Prometheus text exposition
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metric_families = state.metrics().registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => {
            debug!("Serving {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, encoder.format_type().to_string())],
                metrics_output,
            )
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                "Failed to encode metrics".to_string(),
            )
        }
    }
}
