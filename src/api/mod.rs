//! API module for NexGen cost intelligence
//!
//! JSON REST interface over a [`Session`](crate::session::Session).

pub mod handlers;
pub mod service;

pub use service::AnalyticsService;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<AnalyticsService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/api/v1/health", get(handlers::health))
        // Merged view and KPIs
        .route("/api/v1/overview", get(handlers::get_overview))
        .route("/api/v1/orders", get(handlers::get_orders))
        .route("/api/v1/leakage", get(handlers::get_leakage))
        // Summaries
        .route("/api/v1/routes", get(handlers::get_routes))
        .route("/api/v1/routes/performance", get(handlers::get_route_performance))
        .route("/api/v1/warehouses", get(handlers::get_warehouses))
        .route("/api/v1/fleet", get(handlers::get_fleet))
        .route("/api/v1/fleet/vehicles", get(handlers::get_vehicles))
        .route("/api/v1/carriers", get(handlers::get_carriers))
        .route("/api/v1/statuses", get(handlers::get_statuses))
        .route("/api/v1/feedback", get(handlers::get_feedback))
        .route("/api/v1/feedback/orders", get(handlers::get_feedback_orders))
        // Cost model
        .route("/api/v1/predictions", get(handlers::get_predictions))
        .route("/api/v1/anomalies", get(handlers::get_anomalies))
        .route("/api/v1/recommendations", get(handlers::get_recommendations))
        // Cache
        .route("/api/v1/cache", get(handlers::get_cache))
        .route("/api/v1/cache/invalidate", post(handlers::invalidate_cache))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestConfig, SessionConfig};
    use crate::loader::fixtures;
    use crate::session::Session;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn fixture_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        fixtures::write_all(dir.path());
        let config = SessionConfig::new(dir.path()).with_forest(ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        });
        let service = Arc::new(AnalyticsService::new(Session::new(config)));
        (dir, create_router(service))
    }

    async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri).await
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = fixture_app();
        let (status, body) = get_json(&app, "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_overview() {
        let (_dir, app) = fixture_app();
        let (status, body) = get_json(&app, "/api/v1/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_orders"], 4);
        assert_eq!(body["leakage_orders"], 1);
        assert_eq!(body["cost_breakdown"].as_array().unwrap().len(), 7);

        let points = body["delay_vs_rating"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2]["order_id"], "ORD003");
        assert_eq!(points[2]["delivery_delay"], 4.0);
        assert_eq!(points[2]["customer_rating"], 2.0);
    }

    #[tokio::test]
    async fn test_fleet_vehicles() {
        let (_dir, app) = fixture_app();
        let (status, body) = get_json(&app, "/api/v1/fleet/vehicles").await;
        assert_eq!(status, StatusCode::OK);
        let vehicles = body.as_array().unwrap();
        assert_eq!(vehicles.len(), 3);
        assert_eq!(vehicles[0]["Vehicle_ID"], "VEH001");
        assert_eq!(vehicles[1]["Vehicle_Type"], "Small_Van");

        let (_, body) = get_json(&app, "/api/v1/fleet/vehicles?limit=1").await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_orders() {
        let (_dir, app) = fixture_app();
        let (status, body) = get_json(&app, "/api/v1/feedback/orders").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["Order_ID"], "ORD001");
        assert_eq!(rows[0]["Total_Cost"], 200.0);
        assert_eq!(rows[0]["feedback"]["Would_Recommend"], "Maybe");
        assert!(rows[1]["feedback"].is_null());

        let (_, body) = get_json(&app, "/api/v1/feedback/orders?limit=2").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, summary) = get_json(&app, "/api/v1/feedback").await;
        assert_eq!(summary[1]["rating"], 3);
        assert_eq!(summary[1]["would_recommend"], "Maybe");
    }

    #[tokio::test]
    async fn test_orders_limit_and_null_ratio() {
        let (_dir, app) = fixture_app();
        let (status, body) = get_json(&app, "/api/v1/orders?limit=3").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Order_ID"], "ORD001");
        assert_eq!(rows[0]["Total_Cost"], 200.0);
        assert_eq!(rows[0]["Delivery_Delay"], 2.0);
        // zero order value
        assert!(rows[2]["Cost_to_OrderValue"].is_null());
    }

    #[tokio::test]
    async fn test_leakage_threshold() {
        let (_dir, app) = fixture_app();

        let (_, body) = get_json(&app, "/api/v1/leakage").await;
        assert_eq!(body["threshold"], 0.6);
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
        assert_eq!(body["orders"][0]["order_id"], "ORD002");

        let (_, body) = get_json(&app, "/api/v1/leakage?threshold=0.1").await;
        assert_eq!(body["orders"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_query_is_400() {
        let (_dir, app) = fixture_app();
        let (status, _) = get_json(&app, "/api/v1/leakage?threshold=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&app, "/api/v1/leakage?threshold=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("threshold"));

        let (status, _) = get_json(&app, "/api/v1/anomalies?tolerance=-0.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summaries() {
        let (_dir, app) = fixture_app();

        let (_, routes) = get_json(&app, "/api/v1/routes").await;
        assert_eq!(routes[0]["route"], "Mumbai-Delhi");
        assert_eq!(routes[0]["orders"], 2);

        let (_, warehouses) = get_json(&app, "/api/v1/warehouses").await;
        assert_eq!(warehouses["mean_storage_cost"], 5.0);
        assert_eq!(warehouses["rows_above_mean"], 1);

        let (_, fleet) = get_json(&app, "/api/v1/fleet").await;
        assert_eq!(fleet.as_array().unwrap().len(), 2);

        let (_, carriers) = get_json(&app, "/api/v1/carriers").await;
        assert_eq!(carriers[0]["carrier"], "QuickShip");
    }

    #[tokio::test]
    async fn test_predictions_and_recommendations() {
        let (_dir, app) = fixture_app();

        let (status, body) = get_json(&app, "/api/v1/predictions?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"]["training_rows"], 3);
        assert_eq!(body["model"]["trees"], 10);
        assert_eq!(body["predictions"].as_array().unwrap().len(), 2);

        let (status, body) = get_json(&app, "/api/v1/recommendations").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert_eq!(body[1]["strategy"], "optimize_routes");
    }

    #[tokio::test]
    async fn test_cache_invalidation() {
        let (_dir, app) = fixture_app();

        let (_, cache) = get_json(&app, "/api/v1/cache").await;
        assert_eq!(cache["cached"], false);

        get_json(&app, "/api/v1/overview").await;
        let (_, cache) = get_json(&app, "/api/v1/cache").await;
        assert_eq!(cache["cached"], true);
        assert!(cache["loaded_at"].is_string());

        let (status, body) = send(&app, Method::POST, "/api/v1/cache/invalidate").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["invalidated"], true);
        assert_eq!(body["cache"]["cached"], false);
    }

    #[tokio::test]
    async fn test_missing_data_is_500() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(AnalyticsService::new(Session::new(SessionConfig::new(
            dir.path(),
        ))));
        let app = create_router(service);

        let (status, body) = get_json(&app, "/api/v1/overview").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("orders"));
    }
}
