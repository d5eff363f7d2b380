//! REST API handlers for NexGen cost intelligence
//!
//! These handlers use the shared AnalyticsService.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::{AnalyticsService, CacheStatus, Predictions};
use crate::model::{InvoiceAnomaly, DEFAULT_ANOMALY_TOLERANCE};
use crate::models::{FeedbackCost, FleetAsset, MergedOrder};
use crate::pipeline::{
    CarrierSummary, FleetSummary, LeakageReport, Overview, RatingCostSummary, RoutePerformance,
    RouteSummary, StatusSummary, WarehouseSummary,
};
use crate::recommendations::StrategyPlan;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
    pub cache: CacheStatus,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!("Request failed: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{:#}", e),
        }),
    )
}

fn bad_request(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

/// Non-negative, finite query value
fn check_non_negative(name: &str, value: f64) -> Result<f64, (StatusCode, Json<ErrorResponse>)> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(bad_request(format!("{} must be a non-negative number, got {}", name, value)))
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct LeakageQuery {
    pub threshold: Option<f64>,
}

#[derive(Deserialize)]
pub struct ToleranceQuery {
    pub tolerance: Option<f64>,
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<AnalyticsService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/overview
pub async fn get_overview(State(service): State<AppState>) -> ApiResult<Overview> {
    service.get_overview().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/orders?limit=N
pub async fn get_orders(
    State(service): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<MergedOrder>> {
    let limit = params.limit.unwrap_or(100);
    service.get_orders(limit).await.map(Json).map_err(internal_error)
}

/// GET /api/v1/leakage?threshold=X
pub async fn get_leakage(
    State(service): State<AppState>,
    Query(params): Query<LeakageQuery>,
) -> ApiResult<LeakageReport> {
    let threshold = params
        .threshold
        .map(|t| check_non_negative("threshold", t))
        .transpose()?;
    service.get_leakage(threshold).await.map(Json).map_err(internal_error)
}

/// GET /api/v1/routes
pub async fn get_routes(State(service): State<AppState>) -> ApiResult<Vec<RouteSummary>> {
    service.get_routes().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/routes/performance
pub async fn get_route_performance(
    State(service): State<AppState>,
) -> ApiResult<Vec<RoutePerformance>> {
    service.get_route_performance().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/warehouses
pub async fn get_warehouses(State(service): State<AppState>) -> ApiResult<WarehouseSummary> {
    service.get_warehouses().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/fleet
pub async fn get_fleet(State(service): State<AppState>) -> ApiResult<Vec<FleetSummary>> {
    service.get_fleet().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/fleet/vehicles?limit=N
pub async fn get_vehicles(
    State(service): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<FleetAsset>> {
    let limit = params.limit.unwrap_or(100);
    service.get_vehicles(limit).await.map(Json).map_err(internal_error)
}

/// GET /api/v1/carriers
pub async fn get_carriers(State(service): State<AppState>) -> ApiResult<Vec<CarrierSummary>> {
    service.get_carriers().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/statuses
pub async fn get_statuses(State(service): State<AppState>) -> ApiResult<Vec<StatusSummary>> {
    service.get_statuses().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/feedback
pub async fn get_feedback(State(service): State<AppState>) -> ApiResult<Vec<RatingCostSummary>> {
    service.get_feedback().await.map(Json).map_err(internal_error)
}

/// GET /api/v1/feedback/orders?limit=N
pub async fn get_feedback_orders(
    State(service): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<FeedbackCost>> {
    let limit = params.limit.unwrap_or(100);
    service
        .get_feedback_orders(limit)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/v1/predictions?limit=N
pub async fn get_predictions(
    State(service): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Predictions> {
    let limit = params.limit.unwrap_or(100);
    service.get_predictions(limit).await.map(Json).map_err(internal_error)
}

/// GET /api/v1/anomalies?tolerance=X
pub async fn get_anomalies(
    State(service): State<AppState>,
    Query(params): Query<ToleranceQuery>,
) -> ApiResult<Vec<InvoiceAnomaly>> {
    let tolerance =
        check_non_negative("tolerance", params.tolerance.unwrap_or(DEFAULT_ANOMALY_TOLERANCE))?;
    service.get_anomalies(tolerance).await.map(Json).map_err(internal_error)
}

/// GET /api/v1/recommendations
pub async fn get_recommendations(
    State(service): State<AppState>,
    Query(params): Query<ToleranceQuery>,
) -> ApiResult<Vec<StrategyPlan>> {
    let tolerance =
        check_non_negative("tolerance", params.tolerance.unwrap_or(DEFAULT_ANOMALY_TOLERANCE))?;
    service
        .get_recommendations(tolerance)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// GET /api/v1/cache
pub async fn get_cache(State(service): State<AppState>) -> Json<CacheStatus> {
    Json(service.cache_status())
}

/// POST /api/v1/cache/invalidate
pub async fn invalidate_cache(State(service): State<AppState>) -> Json<InvalidateResponse> {
    let invalidated = service.invalidate_cache();
    Json(InvalidateResponse {
        invalidated,
        cache: service.cache_status(),
    })
}
