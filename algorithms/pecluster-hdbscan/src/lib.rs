//! Density based clustering of low dimensional embeddings
//!
//! `pecluster-hdbscan` assigns the rows of an embedding to clusters of varying density with
//! HDBSCAN and marks the remaining rows as noise. The parameters follow the builder and
//! [`ParamGuard`](pecluster::ParamGuard) conventions of the other pecluster algorithms.
mod algorithm;
mod error;
mod hyperparams;

pub use algorithm::{Hdbscan, NOISE};
pub use error::{ClusteringError, Result};
pub use hyperparams::{HdbscanParams, HdbscanParamsError, HdbscanValidParams};
