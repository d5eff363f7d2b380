//! Cost optimisation strategies
//!
//! Five fixed strategies, each with an estimated savings percentage and a
//! playbook of actions. [`recommend`] ties each one to the current data: the
//! carriers, routes, vehicles or invoices it should start with, and the slice
//! of spend the savings percentage applies to.

use serde::Serialize;

use crate::model::InvoiceAnomaly;
use crate::pipeline::MetricsPipeline;
use crate::stats::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RenegotiateCarriers,
    OptimizeRoutes,
    ConsolidateDeliveries,
    ProactiveMaintenance,
    AutomateInvoiceValidation,
}

struct StrategyDef {
    strategy: Strategy,
    name: &'static str,
    savings_pct: f64,
    playbook: Vec<&'static str>,
}

fn strategy_definitions() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            strategy: Strategy::RenegotiateCarriers,
            name: "Renegotiate Carrier Contracts",
            savings_pct: 10.0,
            playbook: vec![
                "Focus on carriers with high average cost-to-order-value ratios",
                "Use predicted cost benchmarks to set negotiation thresholds",
            ],
        },
        StrategyDef {
            strategy: Strategy::OptimizeRoutes,
            name: "Optimize Routes",
            savings_pct: 15.0,
            playbook: vec![
                "Identify routes with high toll charges or long traffic delays",
                "Apply dynamic route optimization to reduce delays and costs",
            ],
        },
        StrategyDef {
            strategy: Strategy::ConsolidateDeliveries,
            name: "Consolidate Deliveries",
            savings_pct: 12.0,
            playbook: vec!["Combine smaller deliveries to cut per-order fuel and packaging costs"],
        },
        StrategyDef {
            strategy: Strategy::ProactiveMaintenance,
            name: "Proactive Maintenance",
            savings_pct: 8.0,
            playbook: vec![
                "Track fleet age and fuel efficiency trends",
                "Schedule maintenance before costly breakdowns",
                "Plan replacement of old, inefficient vehicles",
            ],
        },
        StrategyDef {
            strategy: Strategy::AutomateInvoiceValidation,
            name: "Automate Invoice Validation",
            savings_pct: 10.0,
            playbook: vec!["Compare booked costs with predicted cost benchmarks to flag billing anomalies"],
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyPlan {
    pub strategy: Strategy,
    pub name: String,
    pub savings_pct: f64,
    /// Spend the savings percentage applies to (INR)
    pub addressable_cost: f64,
    pub estimated_savings: f64,
    /// Carriers, routes, vehicles or orders to start with
    pub focus: Vec<String>,
    pub actions: Vec<String>,
}

/// Build one plan per strategy, in fixed order
pub fn recommend(pipeline: &MetricsPipeline, anomalies: &[InvoiceAnomaly]) -> Vec<StrategyPlan> {
    strategy_definitions()
        .into_iter()
        .map(|def| {
            let (focus, addressable_cost) = match def.strategy {
                Strategy::RenegotiateCarriers => carrier_focus(pipeline),
                Strategy::OptimizeRoutes => route_focus(pipeline),
                Strategy::ConsolidateDeliveries => consolidation_focus(pipeline),
                Strategy::ProactiveMaintenance => maintenance_focus(pipeline),
                Strategy::AutomateInvoiceValidation => (
                    anomalies.iter().map(|a| a.order_id.clone()).collect(),
                    anomalies.iter().map(|a| a.total_cost).sum(),
                ),
            };

            StrategyPlan {
                strategy: def.strategy,
                name: def.name.to_string(),
                savings_pct: def.savings_pct,
                addressable_cost,
                estimated_savings: addressable_cost * def.savings_pct / 100.0,
                focus,
                actions: def.playbook.iter().map(|s| s.to_string()).collect(),
            }
        })
        .collect()
}

/// Carriers whose mean ratio is above the overall mean, and their spend
fn carrier_focus(pipeline: &MetricsPipeline) -> (Vec<String>, f64) {
    let Some(overall) = pipeline.avg_cost_to_order_value() else {
        return (Vec::new(), 0.0);
    };

    let carriers: Vec<String> = pipeline
        .carrier_summary()
        .into_iter()
        .filter(|c| c.avg_cost_to_order_value.is_some_and(|r| r > overall))
        .map(|c| c.carrier)
        .collect();

    let spend = pipeline
        .merged()
        .iter()
        .filter(|row| row.carrier().is_some_and(|c| carriers.iter().any(|f| f == c)))
        .filter_map(|row| row.total_cost)
        .sum();

    (carriers, spend)
}

/// Routes whose mean toll is above the mean over routes, and their spend
fn route_focus(pipeline: &MetricsPipeline) -> (Vec<String>, f64) {
    let routes = pipeline.route_summary();
    let Some(overall) = mean(routes.iter().map(|r| r.avg_toll_charges)) else {
        return (Vec::new(), 0.0);
    };

    let expensive: Vec<String> = routes
        .into_iter()
        .filter(|r| r.avg_toll_charges.is_some_and(|t| t > overall))
        .map(|r| r.route)
        .collect();

    let spend = pipeline
        .merged()
        .iter()
        .filter(|row| row.route_name().is_some_and(|r| expensive.iter().any(|e| e == r)))
        .filter_map(|row| row.total_cost)
        .sum();

    (expensive, spend)
}

/// Fuel and packaging spend of orders below the mean order value
fn consolidation_focus(pipeline: &MetricsPipeline) -> (Vec<String>, f64) {
    let merged = pipeline.merged();
    let Some(avg_value) = mean(merged.iter().map(|row| row.order.order_value)) else {
        return (Vec::new(), 0.0);
    };

    let small: Vec<_> = merged
        .iter()
        .filter(|row| row.order.order_value.is_some_and(|v| v < avg_value))
        .collect();

    let spend = small
        .iter()
        .filter_map(|row| row.costs.as_ref())
        .map(|c| c.fuel.unwrap_or(0.0) + c.packaging.unwrap_or(0.0))
        .sum();

    (small.iter().map(|row| row.order_id().to_string()).collect(), spend)
}

/// Vehicles older and less efficient than the fleet mean; addressable spend
/// is the maintenance component over all orders
fn maintenance_focus(pipeline: &MetricsPipeline) -> (Vec<String>, f64) {
    let fleet = pipeline.fleet();
    let avg_age = mean(fleet.iter().map(|v| v.age_years));
    let avg_efficiency = mean(fleet.iter().map(|v| v.fuel_efficiency));

    let vehicles = match (avg_age, avg_efficiency) {
        (Some(age), Some(efficiency)) => fleet
            .iter()
            .filter(|v| {
                v.age_years.is_some_and(|a| a > age)
                    && v.fuel_efficiency.is_some_and(|e| e < efficiency)
            })
            .map(|v| v.vehicle_id.clone())
            .collect(),
        _ => Vec::new(),
    };

    let spend = pipeline
        .merged()
        .iter()
        .filter_map(|row| row.costs.as_ref()?.maintenance)
        .sum();

    (vehicles, spend)
}
