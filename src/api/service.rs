//! Shared business logic for the cost API
//!
//! Pipeline work is synchronous and reads files on a cache miss, so every
//! call runs on the blocking pool with its own freshly built pipeline.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::model::{CostPrediction, InvoiceAnomaly, ModelSummary};
use crate::models::{FeedbackCost, FleetAsset, MergedOrder};
use crate::pipeline::{
    CarrierSummary, FleetSummary, LeakageReport, MetricsPipeline, Overview, RatingCostSummary,
    RoutePerformance, RouteSummary, StatusSummary, WarehouseSummary,
};
use crate::recommendations::{recommend, StrategyPlan};
use crate::session::Session;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Predictions {
    pub model: ModelSummary,
    pub predictions: Vec<CostPrediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub data_dir: String,
    pub cached: bool,
    pub loaded_at: Option<String>,
}

// ============================================================================
// Analytics Service
// ============================================================================

pub struct AnalyticsService {
    session: Arc<Session>,
}

impl AnalyticsService {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn with_pipeline<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Session, &MetricsPipeline) -> Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let pipeline = session
                .pipeline()
                .with_context(|| format!("building pipeline from {:?}", session.data_dir()))?;
            f(&session, &pipeline)
        })
        .await
        .context("pipeline task failed")?
    }

    pub async fn get_overview(&self) -> Result<Overview> {
        self.with_pipeline(|_, p| Ok(p.overview())).await
    }

    pub async fn get_orders(&self, limit: usize) -> Result<Vec<MergedOrder>> {
        self.with_pipeline(move |_, p| Ok(p.merged().iter().take(limit).cloned().collect()))
            .await
    }

    pub async fn get_leakage(&self, threshold: Option<f64>) -> Result<LeakageReport> {
        self.with_pipeline(move |_, p| {
            Ok(p.leakage_report(threshold.unwrap_or(p.config().leakage_threshold)))
        })
        .await
    }

    pub async fn get_routes(&self) -> Result<Vec<RouteSummary>> {
        self.with_pipeline(|_, p| Ok(p.route_summary())).await
    }

    pub async fn get_route_performance(&self) -> Result<Vec<RoutePerformance>> {
        self.with_pipeline(|_, p| Ok(p.route_performance())).await
    }

    pub async fn get_warehouses(&self) -> Result<WarehouseSummary> {
        self.with_pipeline(|_, p| Ok(p.warehouse_summary())).await
    }

    pub async fn get_fleet(&self) -> Result<Vec<FleetSummary>> {
        self.with_pipeline(|_, p| Ok(p.fleet_summary())).await
    }

    pub async fn get_vehicles(&self, limit: usize) -> Result<Vec<FleetAsset>> {
        self.with_pipeline(move |_, p| Ok(p.fleet().iter().take(limit).cloned().collect()))
            .await
    }

    pub async fn get_carriers(&self) -> Result<Vec<CarrierSummary>> {
        self.with_pipeline(|_, p| Ok(p.carrier_summary())).await
    }

    pub async fn get_statuses(&self) -> Result<Vec<StatusSummary>> {
        self.with_pipeline(|_, p| Ok(p.status_summary())).await
    }

    pub async fn get_feedback(&self) -> Result<Vec<RatingCostSummary>> {
        self.with_pipeline(|_, p| Ok(p.rating_cost_summary())).await
    }

    pub async fn get_feedback_orders(&self, limit: usize) -> Result<Vec<FeedbackCost>> {
        self.with_pipeline(move |_, p| {
            let mut joined = p.feedback_costs();
            joined.truncate(limit);
            Ok(joined)
        })
        .await
    }

    pub async fn get_predictions(&self, limit: usize) -> Result<Predictions> {
        self.with_pipeline(move |session, p| {
            let model = session.cost_model(p)?;
            let mut predictions = model.predictions(p.merged());
            predictions.truncate(limit);
            Ok(Predictions {
                model: model.summary(p.merged()),
                predictions,
            })
        })
        .await
    }

    pub async fn get_anomalies(&self, tolerance: f64) -> Result<Vec<InvoiceAnomaly>> {
        self.with_pipeline(move |session, p| {
            let model = session.cost_model(p)?;
            Ok(model.invoice_anomalies(p.merged(), tolerance))
        })
        .await
    }

    pub async fn get_recommendations(&self, tolerance: f64) -> Result<Vec<StrategyPlan>> {
        self.with_pipeline(move |session, p| {
            let model = session.cost_model(p)?;
            let anomalies = model.invoice_anomalies(p.merged(), tolerance);
            Ok(recommend(p, &anomalies))
        })
        .await
    }

    pub fn cache_status(&self) -> CacheStatus {
        CacheStatus {
            data_dir: self.session.data_dir().display().to_string(),
            cached: self.session.is_cached(),
            loaded_at: self.session.loaded_at().map(|t| t.to_rfc3339()),
        }
    }

    /// Drop cached datasets; returns whether anything was cached
    pub fn invalidate_cache(&self) -> bool {
        self.session.invalidate()
    }
}
