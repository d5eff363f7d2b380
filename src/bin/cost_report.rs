//! Cost Intelligence Report - Where is money leaking?
//! Overview KPIs, cost leakage, optimisation opportunities and strategies
//!
//! Run: ./target/release/cost_report [section] [--data-dir data]
//! Sections: all, overview, leakage, optimization, recommendations

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nexgen_cost_intel::model::DEFAULT_ANOMALY_TOLERANCE;
use nexgen_cost_intel::recommendations::recommend;
use nexgen_cost_intel::{DataArgs, MetricsPipeline, Session};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    All,
    Overview,
    Leakage,
    Optimization,
    Recommendations,
}

#[derive(Parser, Debug)]
#[command(name = "cost_report", about = "Print the cost intelligence report")]
struct Cli {
    #[arg(value_enum, default_value_t = Section::All)]
    section: Section,

    #[command(flatten)]
    data: DataArgs,

    /// Relative deviation from the predicted cost that flags an invoice
    #[arg(long, default_value_t = DEFAULT_ANOMALY_TOLERANCE)]
    tolerance: f64,

    /// Rows to show in long tables
    #[arg(long, default_value_t = 15)]
    top: usize,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(70));
}

/// Fixed-width cell for an optional value
fn cell(value: Option<f64>, width: usize, precision: usize) -> String {
    match value {
        Some(v) => format!("{:>width$.precision$}", v, width = width, precision = precision),
        None => format!("{:>width$}", "n/a", width = width),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let session = Session::new(cli.data.session_config());
    let pipeline = session
        .pipeline()
        .with_context(|| format!("loading datasets from {:?}", session.data_dir()))?;

    println!("\n{}", "█".repeat(80));
    println!("{}  NEXGEN COST INTELLIGENCE REPORT  {}", "█".repeat(22), "█".repeat(23));
    println!("{}\n", "█".repeat(80));

    match cli.section {
        Section::All => {
            run_overview_section(&pipeline);
            run_leakage_section(&pipeline, cli.top);
            run_optimization_section(&pipeline);
            run_recommendations_section(&session, &pipeline, cli.tolerance, cli.top)?;
        }
        Section::Overview => run_overview_section(&pipeline),
        Section::Leakage => run_leakage_section(&pipeline, cli.top),
        Section::Optimization => run_optimization_section(&pipeline),
        Section::Recommendations => {
            run_recommendations_section(&session, &pipeline, cli.tolerance, cli.top)?
        }
    }

    println!("\n{}", "█".repeat(80));
    Ok(())
}

fn run_overview_section(pipeline: &MetricsPipeline) {
    print_section_header("1. OVERVIEW");

    let overview = pipeline.overview();
    print_subsection("Key Metrics");
    println!("  Total Orders:          {:>12}", overview.total_orders);
    println!("  Avg Cost/Order Value:  {}", cell(overview.avg_cost_to_order_value, 12, 3));
    println!("  Avg Customer Rating:   {}", cell(overview.avg_customer_rating, 12, 2));
    println!("  Leakage Orders:        {:>12}", overview.leakage_orders);
    println!("  Delayed Orders:        {:>12}", overview.delayed_orders);
    if let (Some(first), Some(last)) = (&overview.first_order_date, &overview.last_order_date) {
        println!("  Order Dates:           {} to {}", first, last);
    }

    print_subsection("Cost Breakdown (mean per order, INR)");
    for component in &overview.cost_breakdown {
        println!("  {:26} {}", component.component, cell(component.average, 12, 2));
    }

    print_subsection("Delivery Status");
    println!("  {:20} {:>8} {:>12} {:>14}", "Status", "Orders", "Avg Delay", "Cost/Value");
    println!("  {}", "─".repeat(58));
    for row in pipeline.status_summary() {
        println!(
            "  {:20} {:>8} {} {}",
            row.status,
            row.orders,
            cell(row.avg_delivery_delay, 12, 2),
            cell(row.avg_cost_to_order_value, 14, 3)
        );
    }
}

fn run_leakage_section(pipeline: &MetricsPipeline, top: usize) {
    print_section_header("2. COST LEAKAGE");

    let report = pipeline.leakage_report(pipeline.config().leakage_threshold);
    print_subsection(&format!(
        "Orders with Cost-to-OrderValue > {} ({} orders)",
        report.threshold,
        report.orders.len()
    ));
    println!(
        "  {:12} {:20} {:>14} {:>14} {:>10}",
        "Order", "Carrier", "Order Value", "Total Cost", "Ratio"
    );
    println!("  {}", "─".repeat(74));
    for order in report.orders.iter().take(top) {
        println!(
            "  {:12} {:20} {} {} {:>10.3}",
            order.order_id,
            order.carrier.as_deref().unwrap_or("-"),
            cell(order.order_value, 14, 2),
            cell(order.total_cost, 14, 2),
            order.cost_to_order_value
        );
    }
    if report.orders.len() > top {
        println!("  ... {} more", report.orders.len() - top);
    }

    print_subsection("Carriers by Cost-to-OrderValue");
    println!("  {:22} {:>8} {:>12} {:>10}", "Carrier", "Orders", "Cost/Value", "Leakage");
    println!("  {}", "─".repeat(56));
    for row in pipeline.carrier_summary() {
        println!(
            "  {:22} {:>8} {} {:>10}",
            row.carrier,
            row.orders,
            cell(row.avg_cost_to_order_value, 12, 3),
            row.leakage_orders
        );
    }

    print_subsection("Customer Rating vs Cost-to-OrderValue");
    println!("  {:>8} {:12} {:>8} {:>12}", "Rating", "Recommend", "Orders", "Cost/Value");
    println!("  {}", "─".repeat(43));
    for row in pipeline.rating_cost_summary() {
        println!(
            "  {:>8} {:12} {:>8} {}",
            row.rating,
            row.would_recommend,
            row.orders,
            cell(row.avg_cost_to_order_value, 12, 3)
        );
    }
}

fn run_optimization_section(pipeline: &MetricsPipeline) {
    print_section_header("3. OPTIMIZATION OPPORTUNITIES");

    print_subsection("Routes");
    println!(
        "  {:24} {:>7} {:>11} {:>10} {:>10} {:>12} {:>11}",
        "Route", "Orders", "Dist (km)", "Toll", "Fuel (L)", "Total Cost", "Delay (m)"
    );
    println!("  {}", "─".repeat(90));
    let performance = pipeline.route_performance();
    for (summary, perf) in pipeline.route_summary().iter().zip(&performance) {
        println!(
            "  {:24} {:>7} {} {} {} {} {}",
            summary.route,
            summary.orders,
            cell(summary.avg_distance_km, 11, 1),
            cell(summary.avg_toll_charges, 10, 1),
            cell(summary.avg_fuel_consumption_l, 10, 1),
            cell(summary.avg_total_cost, 12, 2),
            cell(perf.avg_traffic_delay_minutes, 11, 1)
        );
    }

    let warehouses = pipeline.warehouse_summary();
    print_subsection("Warehouse Storage Cost per Unit");
    println!("  {:20} {:>8} {:>12}", "Location", "Rows", "Avg Cost");
    println!("  {}", "─".repeat(42));
    for location in &warehouses.locations {
        println!(
            "  {:20} {:>8} {}",
            location.location,
            location.rows,
            cell(location.avg_storage_cost, 12, 2)
        );
    }
    println!();
    println!("  Mean storage cost:      {}", cell(warehouses.mean_storage_cost, 10, 2));
    println!("  Rows above mean:        {:>10}", warehouses.rows_above_mean);
    println!("  Locations above mean:   {:>10}", warehouses.locations_above_mean);

    print_subsection("Fleet by Vehicle Type");
    println!(
        "  {:20} {:>9} {:>10} {:>12} {:>12}",
        "Vehicle Type", "Vehicles", "Avg Age", "Efficiency", "CO2/km"
    );
    println!("  {}", "─".repeat(68));
    for row in pipeline.fleet_summary() {
        println!(
            "  {:20} {:>9} {} {} {}",
            row.vehicle_type,
            row.vehicles,
            cell(row.avg_age_years, 10, 1),
            cell(row.avg_fuel_efficiency, 12, 2),
            cell(row.avg_co2_emissions, 12, 3)
        );
    }
}

fn run_recommendations_section(
    session: &Session,
    pipeline: &MetricsPipeline,
    tolerance: f64,
    top: usize,
) -> Result<()> {
    print_section_header("4. RECOMMENDATIONS");

    let model = session.cost_model(pipeline).context("fitting cost model")?;
    let summary = model.summary(pipeline.merged());

    print_subsection("Predicted vs Actual Total Cost");
    println!("  Trees:                 {:>12}", summary.trees);
    println!("  Training Rows:         {:>12}", summary.training_rows);
    println!("  R²:                    {}", cell(summary.r_squared, 12, 4));
    println!("  Mean Abs Error (INR):  {}", cell(summary.mean_absolute_error, 12, 2));

    let anomalies = model.invoice_anomalies(pipeline.merged(), tolerance);
    print_subsection(&format!(
        "Invoice Anomalies (> {:.0}% from prediction, {} orders)",
        tolerance * 100.0,
        anomalies.len()
    ));
    for anomaly in anomalies.iter().take(top) {
        println!(
            "  {:12} actual {:>12.2}  predicted {:>12.2}  {:>+8.1}%",
            anomaly.order_id,
            anomaly.total_cost,
            anomaly.predicted_cost,
            anomaly.deviation * 100.0
        );
    }

    print_subsection("Cost Optimization Strategies");
    let plans = recommend(pipeline, &anomalies);
    for (i, plan) in plans.iter().enumerate() {
        println!(
            "\n  {}. {} (~{:.0}% savings, est. INR {:.2} of {:.2})",
            i + 1,
            plan.name,
            plan.savings_pct,
            plan.estimated_savings,
            plan.addressable_cost
        );
        for action in &plan.actions {
            println!("     - {}", action);
        }
        if !plan.focus.is_empty() {
            let shown: Vec<&str> = plan.focus.iter().take(top).map(String::as_str).collect();
            println!("     Focus: {}", shown.join(", "));
        }
    }

    let total: f64 = plans.iter().map(|p| p.estimated_savings).sum();
    println!("\n  Total estimated savings: INR {:.2}", total);

    Ok(())
}
