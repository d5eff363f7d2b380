//! Error taxonomy for loading and metric derivation
//!
//! Missing or indeterminate arithmetic is not an error here: derived columns
//! carry `None` instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::DatasetId;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source file is missing, unreadable, or not valid CSV for its record type
    #[error("failed to load {dataset} from {}: {source}", .path.display())]
    Load {
        dataset: DatasetId,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from a source header
    #[error("{dataset} is missing required column '{column}'")]
    Schema {
        dataset: DatasetId,
        column: &'static str,
    },

    #[error("cost model error: {0}")]
    Model(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
