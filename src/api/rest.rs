// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Handlers only read snapshots produced
// by the poller; parameter changes are validated, persisted, and followed by
// an on-demand refresh so that fresh tables supersede the old ones.
//
// CORS is configured permissively for the dashboard front-end.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::{AppState, SymbolSnapshot};
use crate::signals::{export_signals_csv, SignalParameters};

type ApiError = (StatusCode, Json<serde_json::Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/symbols", get(symbols))
        .route("/api/v1/signals/:symbol", get(signals))
        .route("/api/v1/signals/:symbol/chart", get(chart))
        .route("/api/v1/signals/:symbol/csv", get(signals_csv))
        .route("/api/v1/params", get(get_params).post(set_params))
        .route("/api/v1/refresh", axum::routing::post(refresh))
        .route("/api/v1/errors", get(errors))
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
}

fn find_snapshot(state: &AppState, symbol: &str) -> Result<SymbolSnapshot, ApiError> {
    let symbol = symbol.to_uppercase();
    state.snapshot(&symbol).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("no signals available for '{symbol}'"),
        )
    })
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.symbols())
}

// =============================================================================
// Signals
// =============================================================================

async fn signals(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(find_snapshot(&state, &symbol)?))
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = find_snapshot(&state, &symbol)?;
    Ok(Json(snapshot.signals.one_day.chart_points()))
}

#[derive(Deserialize)]
struct CsvQuery {
    #[serde(default)]
    complete_only: bool,
}

async fn signals_csv(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<CsvQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = find_snapshot(&state, &symbol)?;
    let body = export_signals_csv(&snapshot.signals, query.complete_only).map_err(|e| {
        warn!(symbol = %snapshot.symbol, error = %e, "CSV export failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"signals.csv\"",
            ),
        ],
        body,
    ))
}

// =============================================================================
// Parameters
// =============================================================================

async fn get_params(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.signal_params())
}

async fn set_params(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SignalParameters>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    let config = state.set_signal_params(params);
    info!(params = ?params, "signal parameters updated via API");

    // Save to disk (best-effort).
    if let Err(e) = config.save(&state.config_path) {
        warn!(error = %e, "failed to save signal parameters to disk");
    }

    state.request_refresh();
    Ok(Json(params))
}

// =============================================================================
// Refresh / errors
// =============================================================================

async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.request_refresh();
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "refresh requested" })),
    )
}

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.errors())
}
