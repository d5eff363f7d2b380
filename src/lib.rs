//! NexGen logistics cost intelligence
//!
//! Loads the seven operational CSV datasets, joins orders with their delivery,
//! route and cost rows, and derives the cost views used to find leakage and
//! savings opportunities.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod recommendations;
pub mod sample;
pub mod schema;
pub mod session;
pub mod stats;

pub use config::{DataArgs, SessionConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::MetricsPipeline;
pub use session::Session;
