use pecluster_hdbscan::ClusteringError;
use pecluster_umap::UmapError;
use thiserror::Error;

use crate::platform::PlatformError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage was invoked before the stage producing its input
    #[error("{missing} not available, run `{run_first}` first")]
    Precondition {
        missing: &'static str,
        run_first: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("API token not found in environment variable `{0}`")]
    MissingToken(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Data(#[from] pecluster::Error),
    #[error(transparent)]
    Projection(#[from] UmapError),
    #[error(transparent)]
    Clustering(#[from] ClusteringError),
    #[error(transparent)]
    ConfigFormat(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
