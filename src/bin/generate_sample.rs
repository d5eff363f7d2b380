//! Sample data generator for the NexGen cost datasets
//!
//! Writes all seven CSV files with internally consistent rows: order values,
//! routes, delivery outcomes, cost components, fleet, warehouse and feedback.
//!
//! Usage:
//!   cargo run --release --bin generate_sample -- [OPTIONS]
//!
//! Options:
//!   --orders <N>           Orders to generate (default: 200)
//!   --vehicles <N>         Fleet size (default: 50)
//!   --warehouse-rows <N>   Warehouse inventory rows (default: 35)
//!   --coverage <F>         Chance an order has each joined row (default: 0.95)
//!   --missing-cost-rate <F> Chance a cost row lacks one component (default: 0.02)
//!   --seed <N>             Random seed for reproducibility (optional)
//!   --output-dir <PATH>    Output directory (default: data)

use anyhow::{bail, Result};
use clap::Parser;
use nexgen_cost_intel::sample::{generate, write_datasets, SampleConfig};
use nexgen_cost_intel::schema::DatasetId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Sample data generator for the cost datasets
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Generate a synthetic seven-file NexGen dataset")]
struct Args {
    /// Number of orders
    #[arg(long, default_value = "200")]
    orders: usize,

    /// Number of vehicles in the fleet table
    #[arg(long, default_value = "50")]
    vehicles: usize,

    /// Number of warehouse inventory rows
    #[arg(long, default_value = "35")]
    warehouse_rows: usize,

    /// Probability (0.0 - 1.0) that an order has a delivery, route and cost row
    #[arg(long, default_value = "0.95")]
    coverage: f64,

    /// Probability (0.0 - 1.0) that a cost row is missing one component
    #[arg(long, default_value = "0.02")]
    missing_cost_rate: f64,

    /// Probability (0.0 - 1.0) that a delivered order has feedback
    #[arg(long, default_value = "0.4")]
    feedback_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let args = Args::parse();

    for (name, p) in [
        ("coverage", args.coverage),
        ("missing-cost-rate", args.missing_cost_rate),
        ("feedback-rate", args.feedback_rate),
    ] {
        if !(0.0..=1.0).contains(&p) {
            bail!("--{} must be between 0.0 and 1.0, got {}", name, p);
        }
    }

    println!("🔧 NexGen Sample Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Orders:            {}", args.orders);
    println!("Vehicles:          {}", args.vehicles);
    println!("Warehouse rows:    {}", args.warehouse_rows);
    println!("Coverage:          {:.1}%", args.coverage * 100.0);
    println!("Missing cost rate: {:.1}%", args.missing_cost_rate * 100.0);
    println!("Feedback rate:     {:.1}%", args.feedback_rate * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:       {}", seed);
    }
    println!("Output:            {}", args.output_dir.display());
    println!();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let config = SampleConfig {
        orders: args.orders,
        vehicles: args.vehicles,
        warehouse_rows: args.warehouse_rows,
        coverage: args.coverage,
        missing_cost_rate: args.missing_cost_rate,
        feedback_rate: args.feedback_rate,
        ..SampleConfig::default()
    };

    println!("🏭 Generating sample data...");
    let datasets = generate(&config, &mut rng);
    write_datasets(&args.output_dir, &datasets)?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for dataset in DatasetId::ALL {
        println!(
            "{:28} {:>8} rows",
            dataset.file_name(),
            datasets.row_count(dataset)
        );
    }

    Ok(())
}
