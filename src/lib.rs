//! `pecluster` segments the prediction explanations of a model into interpretable clusters.
//!
//! ## The big picture
//!
//! A predictive-modeling platform explains every prediction with a ranked list of reasons, each a
//! feature name and the strength of its contribution. Observations which are scored high for the
//! same reasons belong together, even if their raw values differ. `pecluster` turns the
//! explanation table into a feature-strength matrix, projects it to a low dimensional embedding,
//! clusters the embedding and summarizes every cluster by its mean explanation strength and its
//! mean raw values.
//!
//! This crate holds the data types and the pure transformations of that pipeline:
//!
//! * [`Table`](table::Table): named columns of mixed cells, used for explanations and raw data
//! * [`ExplanationSchema`](schema::ExplanationSchema): layout of the explanation table per
//!   target type
//! * [`StrengthMatrix`](reshape::StrengthMatrix): one column per distinct feature name
//! * [`summarize`](summary::summarize): per-cluster means of both views
//!
//! The projection lives in `pecluster-umap`, the clustering in `pecluster-hdbscan` and the
//! orchestration against the platform in `pecluster-pipeline`.

pub mod error;
pub mod param_guard;
pub mod prelude;
pub mod reshape;
pub mod schema;
pub mod summary;
pub mod table;
pub mod traits;

mod float;

pub use error::{Error, Result};
pub use float::Float;
pub use param_guard::ParamGuard;
pub use reshape::{BlankNames, StrengthMatrix};
pub use schema::{ExplanationSchema, TargetType};
pub use summary::ClusterSummary;
pub use table::{Cell, Table};

#[cfg(feature = "benchmarks")]
pub mod benchmarks;
