//! Uniform Manifold Approximation and Projection
//!
//! UMAP embeds observations into a low dimensional space while preserving their local
//! neighborhood structure. It first builds a fuzzy graph of the `n_neighbors` nearest neighbors of
//! every observation, then optimizes a layout whose pairwise memberships follow the graph as
//! closely as possible. With a small `min_dist` the layout packs similar observations tightly,
//! which makes it a good pre-processing step for density based clustering.
//!
//! The implementation computes exact neighbors and starts from a random layout, it is meant for
//! datasets of up to a few ten thousand observations. The layout is fully determined by the
//! random number generator, which defaults to a fixed seed.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use pecluster::traits::Transformer;
//! use pecluster_umap::UmapParams;
//!
//! let observations = array![
//!     [0.0, 0.1, 0.2],
//!     [0.1, 0.0, 0.2],
//!     [0.2, 0.1, 0.0],
//!     [5.0, 5.1, 5.2],
//!     [5.1, 5.0, 5.2],
//!     [5.2, 5.1, 5.0],
//! ];
//!
//! let embedding = UmapParams::new(2)
//!     .n_neighbors(3)
//!     .n_epochs(50)
//!     .transform(&observations)
//!     .unwrap();
//! assert_eq!(embedding.dim(), (6, 2));
//! ```
mod algorithm;
mod error;
mod hyperparams;

pub use algorithm::Umap;
pub use error::{Result, UmapError};
pub use hyperparams::{UmapParams, UmapValidParams};
