//! HTTP API for nmtscope
//!
//! ## Endpoint Map
//!
//! | Route                         | Description                          |
//! |-------------------------------|--------------------------------------|
//! | `GET /health`                 | Liveness probe                       |
//! | `GET /api/nmt?begin=&end=`    | Reports captured in `[begin, end]`   |
//!
//! `begin` and `end` are unix seconds. Both are required and `begin` must be
//! strictly less than `end`; anything else is rejected with 400 before the
//! store is touched.

use crate::report::{ReportStore, ReportsResponse};
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for report handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ReportStore>,
}

/// Build the complete HTTP application with tracing and CORS layers
pub fn build_app(state: ApiState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(reports_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

/// Router for the report query endpoint
pub fn reports_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/nmt", get(list_reports))
        .with_state(state)
}

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    begin: Option<String>,
    end: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Validate `begin`/`end` into an ordered window
fn parse_window(params: &ReportsQuery) -> Result<(i64, i64), String> {
    let (begin, end) = match (params.begin.as_deref(), params.end.as_deref()) {
        (Some(begin), Some(end)) if !begin.is_empty() && !end.is_empty() => (begin, end),
        _ => return Err("begin and end are required".to_string()),
    };

    let begin: i64 = begin
        .parse()
        .map_err(|e| format!("invalid begin timestamp: {}", e))?;
    let end: i64 = end
        .parse()
        .map_err(|e| format!("invalid end timestamp: {}", e))?;

    if begin >= end {
        return Err("begin must be less than end".to_string());
    }
    Ok((begin, end))
}

fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({"error": {"code": code, "message": message.into()}})),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/nmt
async fn list_reports(
    State(state): State<ApiState>,
    Query(params): Query<ReportsQuery>,
) -> Response {
    let (begin, end) = match parse_window(&params) {
        Ok(window) => window,
        Err(message) => return api_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
    };

    match state.store.query(begin, end).await {
        Ok(mut reports) => {
            reports.sort_by_key(|r| (r.created, r.pid));
            Json(ReportsResponse { data: reports }).into_response()
        }
        Err(e) => {
            tracing::error!(begin, end, error = %e, "Report query failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "QUERY_FAILED", e.to_string())
        }
    }
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(parsed)
    }
}
