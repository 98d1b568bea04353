//! Access to the modeling platform
//!
//! The pipeline talks to the platform through the narrow [`Platform`] trait, one method per
//! remote operation it needs. Every method blocks until the remote job behind it has finished.
//! [`HttpPlatform`] implements the trait on top of the DataRobot REST API.
use std::fmt;

use pecluster::{Table, TargetType};
use thiserror::Error;

mod http;
mod records;

pub use http::HttpPlatform;
pub use records::{ExplanationPage, ExplanationRecord, PredictionValue, Reason};

pub type Result<T> = std::result::Result<T, PlatformError>;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(id: S) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name::new(id)
            }
        }
    };
}

identifier!(
    /// Identifier of a platform project
    ProjectId
);
identifier!(
    /// Identifier of a model within a project
    ModelId
);
identifier!(
    /// Identifier of a dataset uploaded for scoring
    DatasetId
);
identifier!(
    /// Identifier of a computed set of prediction explanations
    ExplanationsId
);

#[derive(Error, Debug)]
pub enum PlatformError {
    /// The job was requested before, for feature impact this means it exists or is running
    #[error("job has already been requested")]
    AlreadyRequested,
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("job at {url} finished with status `{status}`")]
    JobFailed { url: String, status: String },
    #[error("job at {url} did not complete within {waited_secs} seconds")]
    Timeout { url: String, waited_secs: u64 },
    #[error("unexpected response from {url}: {reason}")]
    UnexpectedResponse { url: String, reason: String },
    #[error("poll interval must be a non-negative number of seconds, got {0}")]
    InvalidPollInterval(f64),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] pecluster::Error),
}

/// Remote operations needed to compute prediction explanations
pub trait Platform {
    /// Target type of the project, selects the layout of the explanation table
    fn target_type(&self, project: &ProjectId) -> Result<TargetType>;

    /// Upload a dataset for scoring
    fn upload_dataset(&self, project: &ProjectId, data: &Table) -> Result<DatasetId>;

    /// Score an uploaded dataset and wait for the predictions
    fn request_predictions(
        &self,
        project: &ProjectId,
        model: &ModelId,
        dataset: &DatasetId,
    ) -> Result<()>;

    /// Compute feature impact and wait for it
    ///
    /// Fails with [`PlatformError::AlreadyRequested`] if it was requested before.
    fn request_feature_impact(&self, project: &ProjectId, model: &ModelId) -> Result<()>;

    /// Look up the explanation initialization of a model
    ///
    /// Fails with [`PlatformError::NotFound`] if it was never computed.
    fn explanations_initialization(&self, project: &ProjectId, model: &ModelId) -> Result<()>;

    /// Compute the explanation initialization of a model and wait for it
    fn create_explanations_initialization(
        &self,
        project: &ProjectId,
        model: &ModelId,
    ) -> Result<()>;

    /// Compute up to `max_explanations` reasons per row of a scored dataset and wait for them
    ///
    /// No strength thresholds are applied.
    fn compute_explanations(
        &self,
        project: &ProjectId,
        model: &ModelId,
        dataset: &DatasetId,
        max_explanations: usize,
    ) -> Result<ExplanationsId>;

    /// Fetch all computed explanations as a table in the layout of `target`
    fn fetch_explanations(
        &self,
        project: &ProjectId,
        explanations: &ExplanationsId,
        target: TargetType,
        max_explanations: usize,
    ) -> Result<Table>;
}
