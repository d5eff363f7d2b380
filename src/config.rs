//! Pipeline, model, cache and session configuration
//!
//! Every binary shares the same command-line surface through [`DataArgs`],
//! flattened into its own `clap` parser.

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::schema::DEFAULT_LEAKAGE_THRESHOLD;

/// How Total_Cost treats a cost breakdown with some components missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MissingCostPolicy {
    /// Any missing component makes Total_Cost missing
    #[default]
    Propagate,
    /// Missing components count as zero. An order with no cost row, or a
    /// row with every component blank, still has no Total_Cost.
    TreatAsZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub leakage_threshold: f64,
    pub missing_costs: MissingCostPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            leakage_threshold: DEFAULT_LEAKAGE_THRESHOLD,
            missing_costs: MissingCostPolicy::default(),
        }
    }
}

/// Random forest settings for the cost model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub seed: u64,
    /// `None` grows each tree until its leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// Lifetime of cached datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Loaded once, kept until explicitly invalidated or the session is dropped
    #[default]
    SessionLifetime,
    /// Reloaded when older than the given age
    Ttl(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub data_dir: PathBuf,
    pub cache_policy: CachePolicy,
    pub pipeline: PipelineConfig,
    pub forest: ForestConfig,
}

impl SessionConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_policy: CachePolicy::default(),
            pipeline: PipelineConfig::default(),
            forest: ForestConfig::default(),
        }
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }
}

/// Command-line options shared by every binary
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding the seven source CSV files
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Cost-to-order-value ratio above which an order counts as leakage
    #[arg(long, default_value_t = DEFAULT_LEAKAGE_THRESHOLD)]
    pub leakage_threshold: f64,

    /// How to total a cost breakdown with missing components
    #[arg(long, value_enum, default_value_t = MissingCostPolicy::Propagate)]
    pub missing_costs: MissingCostPolicy,

    /// Reload datasets after this many seconds (default: never)
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Number of trees in the cost model
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Random seed for the cost model
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Maximum tree depth (default: unbounded)
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl DataArgs {
    pub fn session_config(&self) -> SessionConfig {
        let cache_policy = match self.cache_ttl_secs {
            Some(secs) => CachePolicy::Ttl(Duration::from_secs(secs)),
            None => CachePolicy::SessionLifetime,
        };

        SessionConfig::new(self.data_dir.clone())
            .with_cache_policy(cache_policy)
            .with_pipeline(PipelineConfig {
                leakage_threshold: self.leakage_threshold,
                missing_costs: self.missing_costs,
            })
            .with_forest(ForestConfig {
                n_estimators: self.trees.max(1),
                seed: self.seed,
                max_depth: self.max_depth,
                ..ForestConfig::default()
            })
    }
}
