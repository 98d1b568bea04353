//! Cluster the prediction explanations of a DataRobot model
//!
//! `pecluster-pipeline` drives a full run: the dataset is uploaded to the platform and scored,
//! the prediction explanations are computed and fetched, reshaped into a strength per feature,
//! embedded with UMAP, clustered with HDBSCAN and finally summarized per cluster.
//!
//! ```no_run
//! use pecluster_pipeline::{ExplanationClustering, HttpPlatform, PipelineConfig};
//!
//! # fn main() -> pecluster_pipeline::Result<()> {
//! let config = PipelineConfig::from_path("pecluster.toml")?;
//! let platform = HttpPlatform::new(&config.platform, config.platform.token()?)?;
//!
//! let mut clustering =
//!     ExplanationClustering::from_csv_path(platform, config, "customers.csv")?;
//! let summary = clustering.run()?;
//! summary.to_table().to_csv(std::io::stdout())?;
//! # Ok(())
//! # }
//! ```
//!
//! The platform is accessed through the [`Platform`](platform::Platform) trait, so the pipeline
//! can run against any implementation of it.
pub mod config;
mod error;
mod pipeline;
pub mod platform;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{ExplanationClustering, Stage};
pub use platform::{HttpPlatform, Platform};
