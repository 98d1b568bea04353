use std::collections::HashMap;

use hdbscan::HdbscanHyperParams;
use ndarray::{Array1, ArrayBase, Data, Ix2};
use pecluster::{traits::Transformer, Float};

use crate::error::{ClusteringError, Result};
use crate::hyperparams::{HdbscanParams, HdbscanValidParams};

/// Label of observations which belong to no cluster
pub const NOISE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Hierarchical Density-Based Spatial Clustering of Applications with Noise
///
/// HDBSCAN builds a hierarchy of density based clusterings and keeps the clusters which persist
/// over the widest range of densities. Clusters may have different densities and no number of
/// clusters has to be chosen upfront. Observations in sparse regions are labelled as noise.
///
/// Labels are `i32` values, `-1` marks noise and clusters are numbered from zero. The numbering
/// has no meaning beyond a single run.
///
/// This wraps the [`hdbscan`](https://docs.rs/hdbscan) crate with the euclidean distance.
///
/// ## Tutorial
///
/// ```rust
/// use ndarray::array;
/// use pecluster::traits::Transformer;
/// use pecluster_hdbscan::Hdbscan;
///
/// let embedding = array![
///     [1.0, 1.1], [1.2, 1.0], [0.9, 1.0], [1.1, 1.2], [1.0, 0.9],
///     [5.0, 5.1], [5.2, 5.0], [4.9, 5.0], [5.1, 5.2], [5.0, 4.9],
///     [20.0, -20.0],
/// ];
///
/// let labels = Hdbscan::params(3)
///     .min_samples(2)
///     .transform(&embedding)
///     .unwrap();
///
/// assert_eq!(labels.len(), 11);
/// assert_eq!(labels[10], -1);
/// ```
pub struct Hdbscan;

impl Hdbscan {
    /// Configures the hyperparameters with the minimum cluster size
    ///
    /// Defaults are provided if the optional parameters are not specified:
    /// * `min_samples = 10`
    pub fn params(min_cluster_size: usize) -> HdbscanParams {
        HdbscanParams::new(min_cluster_size)
    }
}

impl<F: Float, D: Data<Elem = F>> Transformer<&ArrayBase<D, Ix2>, Result<Array1<i32>>>
    for HdbscanValidParams
{
    /// Assign every observation a cluster label or [`NOISE`]
    ///
    /// Labels keep the row order and clusters are numbered by the first row they contain, so the
    /// same observations always get the same labels. With fewer observations than the minimum
    /// cluster size or the density neighborhood there is no cluster to find and every
    /// observation is noise.
    fn transform(&self, observations: &ArrayBase<D, Ix2>) -> Result<Array1<i32>> {
        let n_samples = observations.nrows();
        if observations.iter().any(|x| !x.is_finite()) {
            return Err(ClusteringError::NonFinite);
        }
        if n_samples < self.min_cluster_size() || n_samples <= self.min_samples() {
            return Ok(Array1::from_elem(n_samples, NOISE));
        }

        let data = observations
            .outer_iter()
            .map(|row| row.to_vec())
            .collect::<Vec<_>>();
        let hyper_params = HdbscanHyperParams::builder()
            .min_cluster_size(self.min_cluster_size())
            .min_samples(self.min_samples())
            .build();

        let labels = hdbscan::Hdbscan::new(&data, hyper_params)
            .cluster()
            .map_err(|err| ClusteringError::Backend(format!("{:?}", err)))?;

        Ok(renumber(&labels))
    }
}

/// Number clusters in the order of their first row, noise stays noise
///
/// The backend numbers clusters in no particular order.
fn renumber(labels: &[i32]) -> Array1<i32> {
    let mut mapping = HashMap::new();
    labels
        .iter()
        .map(|label| {
            if *label == NOISE {
                NOISE
            } else {
                let next = mapping.len() as i32;
                *mapping.entry(*label).or_insert(next)
            }
        })
        .collect()
}
