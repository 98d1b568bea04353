use std::path::Path;

use ndarray::{Array1, Array2};
use pecluster::prelude::*;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::platform::{DatasetId, Platform, PlatformError};

/// Progress of a clustering run
///
/// Stages are ordered, a stage can only be entered once the previous one is done. Entering a
/// stage again discards the results of all later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Idle,
    Uploaded,
    Predicted,
    ExplanationsFetched,
    Reshaped,
    Projected,
    Clustered,
    Summarized,
}

/// Segment the prediction explanations of a dataset into clusters
///
/// The dataset is uploaded to the platform, scored and explained by the configured model. The
/// explanations are spread into a feature-strength matrix, embedded with UMAP and clustered with
/// HDBSCAN. The summary finally puts the mean explanation strength and mean raw value of every
/// cluster side by side.
///
/// Every stage has its own method and keeps its result until an earlier stage is run again,
/// [`run`](ExplanationClustering::run) runs them all.
pub struct ExplanationClustering<P> {
    platform: P,
    config: PipelineConfig,
    data: Table,
    stage: Stage,
    target: Option<TargetType>,
    dataset: Option<DatasetId>,
    explanations: Option<Table>,
    strengths: Option<StrengthMatrix>,
    embedding: Option<Array2<f64>>,
    labels: Option<Array1<i32>>,
    summary: Option<ClusterSummary>,
}

impl<P: Platform> ExplanationClustering<P> {
    pub fn new(platform: P, config: PipelineConfig, data: Table) -> Result<Self> {
        config.validate()?;

        Ok(ExplanationClustering {
            platform,
            config,
            data,
            stage: Stage::Idle,
            target: None,
            dataset: None,
            explanations: None,
            strengths: None,
            embedding: None,
            labels: None,
            summary: None,
        })
    }

    /// Read the dataset from a CSV file with a header row
    pub fn from_csv_path<Q: AsRef<Path>>(
        platform: P,
        config: PipelineConfig,
        path: Q,
    ) -> Result<Self> {
        let data = Table::from_csv_path(path)?;
        Self::new(platform, config, data)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The dataset to explain
    pub fn data(&self) -> &Table {
        &self.data
    }

    /// Target type of the project, known after the upload
    pub fn target_type(&self) -> Option<TargetType> {
        self.target
    }

    pub fn dataset(&self) -> Option<&DatasetId> {
        self.dataset.as_ref()
    }

    pub fn explanations(&self) -> Option<&Table> {
        self.explanations.as_ref()
    }

    pub fn strengths(&self) -> Option<&StrengthMatrix> {
        self.strengths.as_ref()
    }

    pub fn embedding(&self) -> Option<&Array2<f64>> {
        self.embedding.as_ref()
    }

    pub fn labels(&self) -> Option<&Array1<i32>> {
        self.labels.as_ref()
    }

    pub fn summary(&self) -> Option<&ClusterSummary> {
        self.summary.as_ref()
    }

    /// Move to `stage` and drop everything computed after it
    fn enter(&mut self, stage: Stage) {
        if stage < Stage::Summarized {
            self.summary = None;
        }
        if stage < Stage::Clustered {
            self.labels = None;
        }
        if stage < Stage::Projected {
            self.embedding = None;
        }
        if stage < Stage::Reshaped {
            self.strengths = None;
        }
        if stage < Stage::ExplanationsFetched {
            self.explanations = None;
        }
        if stage < Stage::Uploaded {
            self.dataset = None;
            self.target = None;
        }
        debug!(?stage, "entered stage");
        self.stage = stage;
    }

    /// Upload the dataset for scoring
    pub fn upload(&mut self) -> Result<&DatasetId> {
        let project = self.config.project();
        info!(
            project = %project,
            rows = self.data.nrows(),
            "uploading dataset"
        );

        let target = self.platform.target_type(&project)?;
        let dataset = self.platform.upload_dataset(&project, &self.data)?;
        debug!(dataset = %dataset, target = %target, "dataset uploaded");

        self.enter(Stage::Uploaded);
        self.target = Some(target);
        Ok(self.dataset.insert(dataset))
    }

    /// Score the uploaded dataset with the model
    pub fn predict(&mut self) -> Result<()> {
        let dataset = self.dataset.clone().ok_or(PipelineError::Precondition {
            missing: "uploaded dataset",
            run_first: "upload",
        })?;
        let (project, model) = (self.config.project(), self.config.model());
        info!(model = %model, "requesting predictions");

        self.platform
            .request_predictions(&project, &model, &dataset)?;

        self.enter(Stage::Predicted);
        Ok(())
    }

    /// Compute the prediction explanations of the scored dataset and fetch them as a table
    ///
    /// Feature impact and the explanation initialization of the model are computed first unless
    /// they exist already.
    pub fn fetch_explanations(&mut self) -> Result<&Table> {
        let precondition = PipelineError::Precondition {
            missing: "predictions",
            run_first: "predict",
        };
        if self.stage < Stage::Predicted {
            return Err(precondition);
        }
        let (dataset, target) = match (self.dataset.clone(), self.target) {
            (Some(dataset), Some(target)) => (dataset, target),
            _ => return Err(precondition),
        };
        let (project, model) = (self.config.project(), self.config.model());
        let n_reasons = self.config.n_reasons;

        match self.platform.request_feature_impact(&project, &model) {
            Ok(()) => debug!("feature impact computed"),
            Err(PlatformError::AlreadyRequested) => {
                warn!(model = %model, "feature impact already requested")
            }
            Err(err) => return Err(err.into()),
        }

        match self.platform.explanations_initialization(&project, &model) {
            Ok(()) => debug!("explanation initialization exists"),
            Err(PlatformError::NotFound(_)) => {
                info!(model = %model, "computing explanation initialization");
                self.platform.create_explanations_initialization(&project, &model)?;
            }
            Err(err) => return Err(err.into()),
        }

        info!(n_reasons, "computing prediction explanations, this may take a while");
        let explanations_id = self
            .platform
            .compute_explanations(&project, &model, &dataset, n_reasons)?;
        let explanations = self
            .platform
            .fetch_explanations(&project, &explanations_id, target, n_reasons)?;
        debug!(
            rows = explanations.nrows(),
            columns = explanations.ncols(),
            "fetched explanations"
        );

        self.enter(Stage::ExplanationsFetched);
        Ok(self.explanations.insert(explanations))
    }

    /// Upload, score and explain the dataset
    pub fn retrieve_explanations(&mut self) -> Result<&Table> {
        self.upload()?;
        self.predict()?;
        self.fetch_explanations()
    }

    /// Spread the explanations into one strength column per feature
    pub fn reshape(&mut self) -> Result<&StrengthMatrix> {
        let (explanations, target) = match (&self.explanations, self.target) {
            (Some(explanations), Some(target)) => (explanations, target),
            _ => {
                return Err(PipelineError::Precondition {
                    missing: "explanation table",
                    run_first: "retrieve_explanations",
                })
            }
        };
        info!("reshaping explanations into a strength per feature");

        let strengths = self
            .config
            .strength_params(target)
            .transform(explanations)?;
        debug!(
            rows = strengths.nrows(),
            features = strengths.ncols(),
            nonzero = strengths.count_nonzero(),
            "strength matrix"
        );

        self.enter(Stage::Reshaped);
        Ok(self.strengths.insert(strengths))
    }

    /// Embed the strength matrix with UMAP
    pub fn project(&mut self) -> Result<&Array2<f64>> {
        let strengths = self
            .strengths
            .as_ref()
            .ok_or(PipelineError::Precondition {
                missing: "strength matrix",
                run_first: "reshape",
            })?;
        info!(
            n_components = self.config.projection.n_components,
            "applying UMAP dimensionality reduction"
        );

        let embedding = self
            .config
            .projection
            .params()
            .transform(&strengths.records())?;

        self.enter(Stage::Projected);
        Ok(self.embedding.insert(embedding))
    }

    /// Cluster the embedding with HDBSCAN
    pub fn cluster(&mut self) -> Result<&Array1<i32>> {
        let embedding = self
            .embedding
            .as_ref()
            .ok_or(PipelineError::Precondition {
                missing: "embedding",
                run_first: "project",
            })?;
        info!("applying HDBSCAN clustering");

        let labels = self.config.clustering.params().transform(embedding)?;
        debug!(
            noise = labels.iter().filter(|l| **l < 0).count(),
            clusters = labels.iter().copied().max().map_or(0, |l| l + 1),
            "clustered"
        );

        self.enter(Stage::Clustered);
        Ok(self.labels.insert(labels))
    }

    /// Summarize explanation strengths and raw values by cluster
    pub fn summarize(&mut self) -> Result<&ClusterSummary> {
        let (labels, strengths, explanations) =
            match (&self.labels, &self.strengths, &self.explanations) {
                (Some(labels), Some(strengths), Some(explanations)) => {
                    (labels, strengths, explanations)
                }
                _ => {
                    return Err(PipelineError::Precondition {
                        missing: "cluster labels",
                        run_first: "cluster",
                    })
                }
            };
        info!("calculating results");

        let predictions = prediction_scores(explanations, self.target)?;
        let summary = summarize(strengths, predictions.view(), &self.data, labels.view())?;

        self.enter(Stage::Summarized);
        Ok(self.summary.insert(summary))
    }

    /// Run every stage from the upload to the summary
    pub fn run(&mut self) -> Result<&ClusterSummary> {
        self.retrieve_explanations()?;
        self.reshape()?;
        self.project()?;
        self.cluster()?;
        self.summarize()
    }
}

/// Numeric prediction of every explained row
///
/// Binary models may report the predicted class label instead of a score, the probability of
/// the second class (`class_1_probability`) is used then.
fn prediction_scores(explanations: &Table, target: Option<TargetType>) -> Result<Array1<f64>> {
    match explanations.numeric_column("prediction") {
        Err(pecluster::Error::NotNumeric { .. }) if target == Some(TargetType::Binary) => {
            debug!("predictions are class labels, summarizing the class_1 probability");
            Ok(explanations.numeric_column("class_1_probability")?)
        }
        res => Ok(res?),
    }
}
