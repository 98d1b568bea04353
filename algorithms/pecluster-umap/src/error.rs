use thiserror::Error;

pub type Result<T> = std::result::Result<T, UmapError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UmapError {
    #[error("at least 2 samples needed, got {0}")]
    NotEnoughSamples(usize),
    #[error("observations contain non-finite values")]
    NonFinite,
    #[error("observations have no features")]
    NoFeatures,
    #[error(transparent)]
    NeighborIndex(#[from] linfa_nn::BuildError),
    #[error(transparent)]
    NeighborQuery(#[from] linfa_nn::NnError),
    #[error("number of neighbors must be at least 2, got {0}")]
    TooFewNeighbors(usize),
    #[error("embedding needs at least one component")]
    NoComponents,
    #[error("minimum distance must be non-negative and not larger than the spread")]
    InvalidMinDist,
    #[error("spread must be positive")]
    NonPositiveSpread,
    #[error("learning rate must be positive")]
    NonPositiveLearningRate,
    #[error("number of epochs must be positive")]
    NoEpochs,
    #[error("negative sample rate must be positive")]
    NoNegativeSamples,
}
