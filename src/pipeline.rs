//! Metrics pipeline
//!
//! Joins orders with delivery, route and cost rows (left-outer, keyed on
//! order id), derives Total_Cost, Cost_to_OrderValue and Delivery_Delay, and
//! aggregates the result into the summary views the report and API serve.
//!
//! A pipeline is immutable once built. Every view is computed fresh from the
//! merged rows; nothing is written back to the loaded datasets.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{MissingCostPolicy, PipelineConfig};
use crate::loader::Datasets;
use crate::models::{
    CostBreakdown, FeedbackCost, FeedbackRecord, FleetAsset, MergedOrder,
};
use crate::schema::COST_COMPONENTS;
use crate::stats::{difference, mean, ratio, Mean};

// ============================================================================
// Summary Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub route: String,
    pub orders: usize,
    pub avg_distance_km: Option<f64>,
    pub avg_toll_charges: Option<f64>,
    pub avg_fuel_consumption_l: Option<f64>,
    pub avg_total_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePerformance {
    pub route: String,
    pub avg_distance_km: Option<f64>,
    pub avg_toll_charges: Option<f64>,
    pub avg_traffic_delay_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStorageCost {
    pub location: String,
    pub rows: usize,
    pub avg_storage_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseSummary {
    pub locations: Vec<LocationStorageCost>,
    /// Mean storage cost per unit over all warehouse rows
    pub mean_storage_cost: Option<f64>,
    /// Rows whose storage cost is strictly above `mean_storage_cost`
    pub rows_above_mean: usize,
    /// Locations whose mean storage cost is strictly above `mean_storage_cost`
    pub locations_above_mean: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub vehicle_type: String,
    pub vehicles: usize,
    pub avg_age_years: Option<f64>,
    pub avg_fuel_efficiency: Option<f64>,
    pub avg_co2_emissions: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierSummary {
    pub carrier: String,
    pub orders: usize,
    pub avg_cost_to_order_value: Option<f64>,
    pub leakage_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub status: String,
    pub orders: usize,
    pub avg_delivery_delay: Option<f64>,
    pub avg_cost_to_order_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingCostSummary {
    pub rating: i64,
    pub would_recommend: String,
    pub orders: usize,
    pub avg_cost_to_order_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostComponentAverage {
    pub component: &'static str,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayRatingPoint {
    pub order_id: String,
    pub delivery_delay: f64,
    pub customer_rating: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_orders: usize,
    pub avg_cost_to_order_value: Option<f64>,
    /// Mean over the delivery table, matched to an order or not
    pub avg_customer_rating: Option<f64>,
    pub cost_breakdown: Vec<CostComponentAverage>,
    pub leakage_orders: usize,
    pub delayed_orders: usize,
    pub first_order_date: Option<String>,
    pub last_order_date: Option<String>,
    pub delay_vs_rating: Vec<DelayRatingPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakageOrder {
    pub order_id: String,
    pub carrier: Option<String>,
    pub order_value: Option<f64>,
    pub total_cost: Option<f64>,
    pub cost_to_order_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakageReport {
    pub threshold: f64,
    pub avg_cost_to_order_value: Option<f64>,
    pub orders: Vec<LeakageOrder>,
}

// ============================================================================
// Derivations
// ============================================================================

/// Sum of the seven cost components under `policy`
pub fn total_cost(costs: Option<&CostBreakdown>, policy: MissingCostPolicy) -> Option<f64> {
    let costs = costs?;
    match policy {
        MissingCostPolicy::Propagate => costs.complete_components().map(|c| c.iter().sum()),
        MissingCostPolicy::TreatAsZero => {
            let components = costs.components();
            if components.iter().all(Option::is_none) {
                return None;
            }
            Some(components.iter().map(|c| c.unwrap_or(0.0)).sum())
        }
    }
}

/// Index `rows` by order id; the first row for an id wins
fn index_by_order<'a, T>(
    rows: &'a [T],
    order_id: impl Fn(&T) -> &str,
    table: &str,
) -> HashMap<&'a str, &'a T> {
    let mut index: HashMap<&str, &T> = HashMap::with_capacity(rows.len());
    let mut duplicates = 0usize;
    for row in rows {
        let id = order_id(row);
        if index.contains_key(id) {
            duplicates += 1;
        } else {
            index.insert(id, row);
        }
    }
    if duplicates > 0 {
        warn!(
            "{} duplicate order ids in {} ignored; first occurrence kept",
            duplicates, table
        );
    }
    index
}

fn group_by<'a, K, T, F>(rows: impl IntoIterator<Item = &'a T>, key: F) -> BTreeMap<K, Vec<&'a T>>
where
    K: Ord,
    T: 'a,
    F: Fn(&T) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&T>> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(row);
        }
    }
    groups
}

// ============================================================================
// Metrics Pipeline
// ============================================================================

pub struct MetricsPipeline {
    config: PipelineConfig,
    datasets: Arc<Datasets>,
    merged: Vec<MergedOrder>,
}

impl MetricsPipeline {
    /// Join and derive the merged order view from loaded datasets
    pub fn build(datasets: Arc<Datasets>, config: PipelineConfig) -> Self {
        let delivery_index = index_by_order(&datasets.delivery, |d| d.order_id.as_str(), "delivery");
        let route_index = index_by_order(&datasets.routes, |r| r.order_id.as_str(), "routes");
        let cost_index = index_by_order(&datasets.costs, |c| c.order_id.as_str(), "costs");

        let merged: Vec<MergedOrder> = datasets
            .orders
            .iter()
            .map(|order| {
                let id = order.order_id.as_str();
                let delivery = delivery_index.get(id).map(|d| (*d).clone());
                let route = route_index.get(id).map(|r| (*r).clone());
                let costs = cost_index.get(id).map(|c| (*c).clone());

                let total_cost = total_cost(costs.as_ref(), config.missing_costs);
                let cost_to_order_value = ratio(total_cost, order.order_value);
                let delivery_delay = delivery
                    .as_ref()
                    .and_then(|d| difference(d.actual_days, d.promised_days));

                MergedOrder {
                    order: order.clone(),
                    delivery,
                    route,
                    costs,
                    total_cost,
                    cost_to_order_value,
                    delivery_delay,
                }
            })
            .collect();

        let indeterminate = merged
            .iter()
            .filter(|m| m.cost_to_order_value.is_none())
            .count();
        info!(
            "Built merged view: {} orders, {} without a cost-to-order-value ratio",
            merged.len(),
            indeterminate
        );

        Self {
            config,
            datasets,
            merged,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The merged order view, one row per order in source order
    pub fn merged(&self) -> &[MergedOrder] {
        &self.merged
    }

    /// Fleet table, unmodified
    pub fn fleet(&self) -> &[FleetAsset] {
        &self.datasets.fleet
    }

    /// Orders whose cost-to-order-value ratio is strictly above `threshold`
    pub fn cost_leakage(&self, threshold: f64) -> Vec<&MergedOrder> {
        self.merged
            .iter()
            .filter(|m| m.cost_to_order_value.is_some_and(|r| r > threshold))
            .collect()
    }

    /// Cost leakage at the configured threshold
    pub fn cost_leakage_default(&self) -> Vec<&MergedOrder> {
        self.cost_leakage(self.config.leakage_threshold)
    }

    pub fn leakage_report(&self, threshold: f64) -> LeakageReport {
        let orders = self
            .cost_leakage(threshold)
            .into_iter()
            .filter_map(|m| {
                Some(LeakageOrder {
                    order_id: m.order.order_id.clone(),
                    carrier: m.carrier().map(str::to_string),
                    order_value: m.order.order_value,
                    total_cost: m.total_cost,
                    cost_to_order_value: m.cost_to_order_value?,
                })
            })
            .collect();

        LeakageReport {
            threshold,
            avg_cost_to_order_value: self.avg_cost_to_order_value(),
            orders,
        }
    }

    pub fn avg_cost_to_order_value(&self) -> Option<f64> {
        mean(self.merged.iter().map(|m| m.cost_to_order_value))
    }

    /// Per-route means of distance, tolls, fuel and Total_Cost.
    /// Orders without a route are left out.
    pub fn route_summary(&self) -> Vec<RouteSummary> {
        group_by(&self.merged, |m| m.route_name().map(str::to_string))
            .into_iter()
            .map(|(route, rows)| RouteSummary {
                route,
                orders: rows.len(),
                avg_distance_km: mean(rows.iter().map(|m| m.route.as_ref().and_then(|r| r.distance_km))),
                avg_toll_charges: mean(rows.iter().map(|m| m.route.as_ref().and_then(|r| r.toll_charges))),
                avg_fuel_consumption_l: mean(
                    rows.iter().map(|m| m.route.as_ref().and_then(|r| r.fuel_consumption_l)),
                ),
                avg_total_cost: mean(rows.iter().map(|m| m.total_cost)),
            })
            .collect()
    }

    /// Per-route means of distance, tolls and traffic delay
    pub fn route_performance(&self) -> Vec<RoutePerformance> {
        group_by(&self.merged, |m| m.route_name().map(str::to_string))
            .into_iter()
            .map(|(route, rows)| RoutePerformance {
                route,
                avg_distance_km: mean(rows.iter().map(|m| m.route.as_ref().and_then(|r| r.distance_km))),
                avg_toll_charges: mean(rows.iter().map(|m| m.route.as_ref().and_then(|r| r.toll_charges))),
                avg_traffic_delay_minutes: mean(
                    rows.iter()
                        .map(|m| m.route.as_ref().and_then(|r| r.traffic_delay_minutes)),
                ),
            })
            .collect()
    }

    pub fn warehouse_summary(&self) -> WarehouseSummary {
        let rows = &self.datasets.warehouse;
        let mean_storage_cost = mean(rows.iter().map(|w| w.storage_cost_per_unit));

        let locations: Vec<LocationStorageCost> = group_by(rows, |w| Some(w.location.clone()))
            .into_iter()
            .map(|(location, group)| LocationStorageCost {
                location,
                rows: group.len(),
                avg_storage_cost: mean(group.iter().map(|w| w.storage_cost_per_unit)),
            })
            .collect();

        let (rows_above_mean, locations_above_mean) = match mean_storage_cost {
            Some(global) => (
                rows.iter()
                    .filter(|w| w.storage_cost_per_unit.is_some_and(|c| c > global))
                    .count(),
                locations
                    .iter()
                    .filter(|l| l.avg_storage_cost.is_some_and(|c| c > global))
                    .count(),
            ),
            None => (0, 0),
        };

        WarehouseSummary {
            locations,
            mean_storage_cost,
            rows_above_mean,
            locations_above_mean,
        }
    }

    pub fn fleet_summary(&self) -> Vec<FleetSummary> {
        group_by(&self.datasets.fleet, |v| Some(v.vehicle_type.clone()))
            .into_iter()
            .map(|(vehicle_type, group)| FleetSummary {
                vehicle_type,
                vehicles: group.len(),
                avg_age_years: mean(group.iter().map(|v| v.age_years)),
                avg_fuel_efficiency: mean(group.iter().map(|v| v.fuel_efficiency)),
                avg_co2_emissions: mean(group.iter().map(|v| v.co2_emissions)),
            })
            .collect()
    }

    /// Per-carrier cost ratio, highest average ratio first
    pub fn carrier_summary(&self) -> Vec<CarrierSummary> {
        let threshold = self.config.leakage_threshold;
        let mut carriers: Vec<CarrierSummary> =
            group_by(&self.merged, |m| m.carrier().map(str::to_string))
                .into_iter()
                .map(|(carrier, rows)| CarrierSummary {
                    carrier,
                    orders: rows.len(),
                    avg_cost_to_order_value: mean(rows.iter().map(|m| m.cost_to_order_value)),
                    leakage_orders: rows
                        .iter()
                        .filter(|m| m.cost_to_order_value.is_some_and(|r| r > threshold))
                        .count(),
                })
                .collect();

        carriers.sort_by(|a, b| {
            b.avg_cost_to_order_value
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.avg_cost_to_order_value.unwrap_or(f64::NEG_INFINITY))
        });
        carriers
    }

    pub fn status_summary(&self) -> Vec<StatusSummary> {
        group_by(&self.merged, |m| m.status().map(|s| s.label().to_string()))
            .into_iter()
            .map(|(status, rows)| StatusSummary {
                status,
                orders: rows.len(),
                avg_delivery_delay: mean(rows.iter().map(|m| m.delivery_delay)),
                avg_cost_to_order_value: mean(rows.iter().map(|m| m.cost_to_order_value)),
            })
            .collect()
    }

    /// Mean of each cost component over orders with a cost row
    pub fn cost_breakdown_averages(&self) -> Vec<CostComponentAverage> {
        let mut means = [Mean::default(); 7];
        for costs in self.merged.iter().filter_map(|m| m.costs.as_ref()) {
            for (acc, value) in means.iter_mut().zip(costs.components()) {
                acc.push(value);
            }
        }

        COST_COMPONENTS
            .into_iter()
            .zip(means)
            .map(|(component, acc)| CostComponentAverage {
                component,
                average: acc.value(),
            })
            .collect()
    }

    /// Orders with both a delay and a customer rating
    pub fn delay_vs_rating(&self) -> Vec<DelayRatingPoint> {
        self.merged
            .iter()
            .filter_map(|m| {
                Some(DelayRatingPoint {
                    order_id: m.order.order_id.clone(),
                    delivery_delay: m.delivery_delay?,
                    customer_rating: m.customer_rating()?,
                    status: m.status()?.label().to_string(),
                })
            })
            .collect()
    }

    pub fn overview(&self) -> Overview {
        let mut dates: Vec<_> = self.merged.iter().filter_map(|m| m.order.parsed_date()).collect();
        dates.sort();

        Overview {
            total_orders: self.merged.len(),
            avg_cost_to_order_value: self.avg_cost_to_order_value(),
            avg_customer_rating: mean(self.datasets.delivery.iter().map(|d| d.customer_rating)),
            cost_breakdown: self.cost_breakdown_averages(),
            leakage_orders: self.cost_leakage_default().len(),
            delayed_orders: self
                .merged
                .iter()
                .filter(|m| m.status().is_some_and(|s| s.is_delayed()))
                .count(),
            first_order_date: dates.first().map(|d| d.to_string()),
            last_order_date: dates.last().map(|d| d.to_string()),
            delay_vs_rating: self.delay_vs_rating(),
        }
    }

    /// Left join of the merged view with `feedback` on order id.
    /// Built on demand and not retained.
    pub fn feedback_join(&self, feedback: &[FeedbackRecord]) -> Vec<FeedbackCost> {
        let index = index_by_order(feedback, |f| f.order_id.as_str(), "feedback");
        let joined: Vec<FeedbackCost> = self
            .merged
            .iter()
            .map(|m| FeedbackCost {
                order: m.clone(),
                feedback: index.get(m.order_id()).map(|f| (*f).clone()),
            })
            .collect();
        debug!("Joined {} orders with feedback", joined.len());
        joined
    }

    /// Feedback join against the loaded feedback table
    pub fn feedback_costs(&self) -> Vec<FeedbackCost> {
        self.feedback_join(&self.datasets.feedback)
    }

    /// Cost ratio by (rounded) feedback rating and would-recommend answer;
    /// orders without a rating are left out
    pub fn rating_cost_summary(&self) -> Vec<RatingCostSummary> {
        let joined = self.feedback_costs();
        group_by(&joined, |fc| {
            let feedback = fc.feedback.as_ref()?;
            let rating = feedback.rating?.round() as i64;
            Some((rating, String::from(feedback.would_recommend.clone())))
        })
        .into_iter()
        .map(|((rating, would_recommend), rows)| RatingCostSummary {
            rating,
            would_recommend,
            orders: rows.len(),
            avg_cost_to_order_value: mean(rows.iter().map(|fc| fc.order.cost_to_order_value)),
        })
        .collect()
    }
}
