//! Load the NexGen datasets, build the merged view and log a summary
//!
//! Run: ./target/release/cost_intel [--data-dir data] [--json]

use anyhow::{Context, Result};
use clap::Parser;
use nexgen_cost_intel::{DataArgs, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cost_intel", about = "Build the merged cost view and log a summary")]
struct Cli {
    #[command(flatten)]
    data: DataArgs,

    /// Print the overview KPIs as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let session = Session::new(cli.data.session_config());

    let pipeline = session
        .pipeline()
        .with_context(|| format!("loading datasets from {:?}", session.data_dir()))?;

    let overview = pipeline.overview();
    info!("=== Merged Order View ===");
    info!("Orders: {}", overview.total_orders);
    match overview.avg_cost_to_order_value {
        Some(r) => info!("Avg Cost-to-OrderValue: {:.3}", r),
        None => warn!("No order has a defined cost-to-order-value ratio"),
    }
    if let Some(rating) = overview.avg_customer_rating {
        info!("Avg customer rating: {:.2}", rating);
    }
    info!(
        "Leakage orders (> {}): {}",
        pipeline.config().leakage_threshold,
        overview.leakage_orders
    );
    info!("Delayed orders: {}", overview.delayed_orders);

    let routes = pipeline.route_summary();
    info!("Routes: {}", routes.len());

    let warehouses = pipeline.warehouse_summary();
    info!(
        "Warehouse locations: {} ({} rows above mean storage cost)",
        warehouses.locations.len(),
        warehouses.rows_above_mean
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    }

    Ok(())
}
