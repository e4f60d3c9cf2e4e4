use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};

use super::{
    models::{
        AbortRequest, AbortResponse, HealthResponse, NetworkResponse, ScanRequest, SignalRequest,
        SignalResponse,
    },
    state::AppState,
    utils::read_json,
    validation::{self, RequestValidationError},
};
use crate::api::error::ApiError;
use crate::links::ConnectionInfo;
use crate::scheduler::AbortOutcome;

fn invalid(err: RequestValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

/// Bulk link scan (POST /links/scan)
///
/// Classifies every address and admits the accepted ones at `low` priority.
/// While the connection gate is closed nothing is admitted and the report
/// carries the reason.
pub async fn scan_links(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: ScanRequest = read_json(&headers, body).await?;
    validation::validate_scan(&request).map_err(invalid)?;

    let report = state.feed.scan(&request.addresses).await;
    Ok((StatusCode::OK, Json(report)))
}

/// Attention signal (POST /links/signal)
pub async fn link_signal(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: SignalRequest = read_json(&headers, body).await?;
    validation::validate_signal(&request).map_err(invalid)?;

    let outcome = state.feed.signal(&request.address, request.signal).await;
    Ok(Json(SignalResponse {
        address: request.address,
        outcome,
    }))
}

/// Manual abort (POST /resources/abort)
///
/// Returns 404 for addresses never admitted. Aborting a finished resource is
/// not an error; the response reports `already_finished`.
pub async fn abort_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let request: AbortRequest = read_json(&headers, body).await?;
    validation::validate_abort(&request).map_err(invalid)?;

    let outcome = state.scheduler.abort(request.address.trim()).await;
    if outcome == AbortOutcome::Unknown {
        return Err(ApiError::NotFound(request.address));
    }

    Ok(Json(AbortResponse {
        address: request.address,
        outcome,
    }))
}

/// Resources in scheduling order (GET /resources)
pub async fn list_resources(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.resources().await)
}

/// Status board rows (GET /board)
pub async fn board(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.board.rows())
}

/// Hint counters (GET /metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduler.metrics().snapshot())
}

/// Connection report (PUT /network)
///
/// Replaces the connection the gate is evaluated against.
pub async fn update_network(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let connection: ConnectionInfo = read_json(&headers, body).await?;
    state.feed.set_connection(connection);

    Ok(Json(NetworkResponse {
        connection: state.feed.connection(),
        gated: state.feed.gate_reason(),
    }))
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        scheduler_id: state.scheduler.id(),
        max_concurrency: state.scheduler.policy().max_concurrency,
        active_slots: state.scheduler.active_slots().await,
        resources: state.scheduler.resources().await.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
