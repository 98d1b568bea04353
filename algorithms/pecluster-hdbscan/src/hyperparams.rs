use pecluster::{param_guard::TransformGuard, ParamGuard};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use thiserror::Error;

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The set of hyperparameters that can be specified for the execution of
/// the [HDBSCAN algorithm](crate::Hdbscan).
pub struct HdbscanValidParams {
    pub(crate) min_cluster_size: usize,
    pub(crate) min_samples: usize,
}

impl HdbscanValidParams {
    /// Smallest group of observations reported as a cluster
    pub fn min_cluster_size(&self) -> usize {
        self.min_cluster_size
    }

    /// Neighborhood size used to estimate the density around an observation
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Helper struct for building a set of [HDBSCAN hyperparameters](HdbscanValidParams)
pub struct HdbscanParams(HdbscanValidParams);

#[derive(Error, Debug)]
pub enum HdbscanParamsError {
    #[error("min_cluster_size must be at least 2, got {0}")]
    MinClusterSize(usize),
    #[error("min_samples must be at least 1")]
    MinSamples,
}

impl HdbscanParams {
    pub(crate) fn new(min_cluster_size: usize) -> Self {
        Self(HdbscanValidParams {
            min_cluster_size,
            min_samples: 10,
        })
    }

    /// Set the neighborhood size of the density estimate
    ///
    /// Larger values make the clustering more conservative, more observations end up as noise.
    pub fn min_samples(mut self, min_samples: usize) -> Self {
        self.0.min_samples = min_samples;
        self
    }
}

impl ParamGuard for HdbscanParams {
    type Checked = HdbscanValidParams;
    type Error = HdbscanParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.min_cluster_size < 2 {
            Err(HdbscanParamsError::MinClusterSize(self.0.min_cluster_size))
        } else if self.0.min_samples == 0 {
            Err(HdbscanParamsError::MinSamples)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
impl TransformGuard for HdbscanParams {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hdbscan;

    #[test]
    fn min_cluster_size_at_least_2() {
        let res = Hdbscan::params(1).check();
        assert!(matches!(res, Err(HdbscanParamsError::MinClusterSize(1))));
        assert!(Hdbscan::params(2).check().is_ok());
    }

    #[test]
    fn min_samples_positive() {
        let res = Hdbscan::params(10).min_samples(0).check();
        assert!(matches!(res, Err(HdbscanParamsError::MinSamples)));
    }

    #[test]
    fn defaults() {
        let params = Hdbscan::params(500).check_unwrap();
        assert_eq!(params.min_cluster_size(), 500);
        assert_eq!(params.min_samples(), 10);
    }
}
