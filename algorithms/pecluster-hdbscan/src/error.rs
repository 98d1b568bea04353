use thiserror::Error;

use crate::hyperparams::HdbscanParamsError;

pub type Result<T> = std::result::Result<T, ClusteringError>;

#[derive(Error, Debug)]
pub enum ClusteringError {
    #[error(transparent)]
    InvalidParams(#[from] HdbscanParamsError),
    #[error("observations contain non-finite values")]
    NonFinite,
    /// The clustering backend rejected the observations
    #[error("clustering failed: {0}")]
    Backend(String),
}
