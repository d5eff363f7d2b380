//! Analysis session
//!
//! A [`Session`] owns its configuration and its own dataset cache. Two
//! sessions never share cached data, so independent analyses (tests, or two
//! data directories served side by side) cannot see each other's state.
//! Dropping the session drops its cache.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::cache::DatasetCache;
use crate::config::SessionConfig;
use crate::error::PipelineResult;
use crate::loader::Datasets;
use crate::model::CostModel;
use crate::pipeline::MetricsPipeline;

pub struct Session {
    config: SessionConfig,
    cache: DatasetCache,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let cache = DatasetCache::new(config.cache_policy);
        Self { config, cache }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn datasets(&self) -> PipelineResult<Arc<Datasets>> {
        self.cache.get_or_load(&self.config.data_dir)
    }

    /// Build a fresh pipeline over the (cached) datasets
    pub fn pipeline(&self) -> PipelineResult<MetricsPipeline> {
        Ok(MetricsPipeline::build(self.datasets()?, self.config.pipeline))
    }

    /// Fit the cost model on a pipeline's merged rows
    pub fn cost_model(&self, pipeline: &MetricsPipeline) -> PipelineResult<CostModel> {
        CostModel::fit(pipeline.merged(), self.config.forest)
    }

    /// Forget the cached datasets; the next call reloads from disk
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(&self.config.data_dir)
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_cached(&self.config.data_dir)
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.cache.loaded_at(&self.config.data_dir)
    }
}
