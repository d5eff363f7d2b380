//! REST API Server for NexGen Cost Intelligence
//!
//! Usage:
//!   ./target/release/api_server [options]
//!
//! Options:
//!   --port PORT         Port to listen on (default: 8080)
//!   --data-dir PATH     Directory with the seven CSV files (default: data)
//!   --cache-ttl-secs N  Reload datasets after N seconds (default: never)
//!   --preload           Load datasets before accepting requests
//!
//! REST endpoints:
//!   GET  /api/v1/health               - Health check
//!   GET  /api/v1/overview             - KPIs and cost breakdown
//!   GET  /api/v1/orders               - Merged order view (?limit=N)
//!   GET  /api/v1/leakage              - Cost leakage (?threshold=X)
//!   GET  /api/v1/routes               - Route summary
//!   GET  /api/v1/routes/performance   - Route distance, toll and delay
//!   GET  /api/v1/warehouses           - Warehouse storage costs
//!   GET  /api/v1/fleet                - Fleet by vehicle type
//!   GET  /api/v1/fleet/vehicles       - Fleet table (?limit=N)
//!   GET  /api/v1/carriers             - Carriers by cost ratio
//!   GET  /api/v1/statuses             - Delivery status summary
//!   GET  /api/v1/feedback             - Rating vs cost ratio
//!   GET  /api/v1/feedback/orders      - Orders joined with feedback (?limit=N)
//!   GET  /api/v1/predictions          - Cost model predictions (?limit=N)
//!   GET  /api/v1/anomalies            - Invoice anomalies (?tolerance=X)
//!   GET  /api/v1/recommendations      - Optimisation strategies
//!   GET  /api/v1/cache                - Dataset cache status
//!   POST /api/v1/cache/invalidate     - Drop cached datasets

use anyhow::{Context, Result};
use clap::Parser;
use nexgen_cost_intel::api::{create_router, AnalyticsService};
use nexgen_cost_intel::{DataArgs, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "api_server", about = "Serve the cost intelligence REST API")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Load datasets before accepting requests
    #[arg(long)]
    preload: bool,

    #[command(flatten)]
    data: DataArgs,
}

fn print_banner(port: u16, data_dir: &str) {
    println!("============================================================");
    println!("         NEXGEN COST INTELLIGENCE API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!("  Data:     {}", data_dir);
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health              Health check");
    println!("  GET  /api/v1/overview            KPIs");
    println!("  GET  /api/v1/orders              Merged orders");
    println!("  GET  /api/v1/leakage             Cost leakage");
    println!("  GET  /api/v1/routes              Route summary");
    println!("  GET  /api/v1/routes/performance  Route performance");
    println!("  GET  /api/v1/warehouses          Warehouse costs");
    println!("  GET  /api/v1/fleet               Fleet summary");
    println!("  GET  /api/v1/fleet/vehicles      Fleet table");
    println!("  GET  /api/v1/carriers            Carrier summary");
    println!("  GET  /api/v1/statuses            Delivery statuses");
    println!("  GET  /api/v1/feedback            Rating vs cost");
    println!("  GET  /api/v1/feedback/orders     Orders with feedback");
    println!("  GET  /api/v1/predictions         Cost predictions");
    println!("  GET  /api/v1/anomalies           Invoice anomalies");
    println!("  GET  /api/v1/recommendations     Strategies");
    println!("  GET  /api/v1/cache               Cache status");
    println!("  POST /api/v1/cache/invalidate    Drop cache");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let cli = Cli::parse();
    let config = cli.data.session_config();
    print_banner(cli.port, &config.data_dir.display().to_string());

    let service = Arc::new(AnalyticsService::new(Session::new(config)));

    if cli.preload {
        let warm = Arc::clone(&service);
        tokio::task::spawn_blocking(move || warm.session().datasets())
            .await
            .context("preload task failed")?
            .context("preloading datasets")?;
        tracing::info!("Datasets preloaded");
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", cli.port).parse()?;
    let app = create_router(service);
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
