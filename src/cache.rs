//! Dataset cache
//!
//! Loaded datasets are kept per data directory behind an `RwLock`: any number
//! of readers share the cached `Arc<Datasets>`, and a reload takes the write
//! lock so only one thread reads the files. Entries live for the owning
//! session unless a TTL is configured or they are invalidated by hand.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::CachePolicy;
use crate::error::PipelineResult;
use crate::loader::{load_datasets, Datasets};

/// Cache key: the directory the seven files were read from
pub type SourceKey = PathBuf;

struct CachedEntry {
    datasets: Arc<Datasets>,
    loaded_at: Instant,
    loaded_at_utc: DateTime<Utc>,
}

impl CachedEntry {
    fn is_fresh(&self, policy: CachePolicy) -> bool {
        match policy {
            CachePolicy::SessionLifetime => true,
            CachePolicy::Ttl(ttl) => self.loaded_at.elapsed() < ttl,
        }
    }
}

pub struct DatasetCache {
    policy: CachePolicy,
    entries: RwLock<HashMap<SourceKey, CachedEntry>>,
}

impl DatasetCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached datasets for `dir`, loading them from disk when absent or stale
    pub fn get_or_load(&self, dir: &Path) -> PipelineResult<Arc<Datasets>> {
        self.get_or_load_with(dir, load_datasets)
    }

    /// As [`get_or_load`](Self::get_or_load) with a custom loader
    pub fn get_or_load_with<F>(&self, dir: &Path, load: F) -> PipelineResult<Arc<Datasets>>
    where
        F: FnOnce(&Path) -> PipelineResult<Datasets>,
    {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(dir).filter(|e| e.is_fresh(self.policy)) {
                debug!("Dataset cache hit for {:?}", dir);
                return Ok(Arc::clone(&entry.datasets));
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        // another writer may have loaded while we waited
        if let Some(entry) = entries.get(dir).filter(|e| e.is_fresh(self.policy)) {
            return Ok(Arc::clone(&entry.datasets));
        }

        let datasets = Arc::new(load(dir)?);
        entries.insert(
            dir.to_path_buf(),
            CachedEntry {
                datasets: Arc::clone(&datasets),
                loaded_at: Instant::now(),
                loaded_at_utc: Utc::now(),
            },
        );
        info!("Cached datasets for {:?}", dir);

        Ok(datasets)
    }

    /// Drop the entry for `dir`; returns whether one was cached
    pub fn invalidate(&self, dir: &Path) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(dir)
            .is_some();
        if removed {
            info!("Invalidated dataset cache for {:?}", dir);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether a fresh entry exists for `dir`
    pub fn is_cached(&self, dir: &Path) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dir)
            .is_some_and(|e| e.is_fresh(self.policy))
    }

    pub fn loaded_at(&self, dir: &Path) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dir)
            .map(|e| e.loaded_at_utc)
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
