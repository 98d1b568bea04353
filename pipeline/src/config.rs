//! Configuration of a clustering run
//!
//! A run is configured from a TOML file. Only the project and model are required:
//!
//! ```toml
//! project_id = "5f3a..."
//! model_id = "5f3b..."
//! n_reasons = 5
//!
//! [platform]
//! endpoint = "https://app.datarobot.com/api/v2"
//! token_env = "DATAROBOT_API_TOKEN"
//!
//! [projection]
//! n_neighbors = 30
//! min_dist = 0.0
//!
//! [clustering]
//! min_samples = 10
//! min_cluster_size = 500
//!
//! [reshape]
//! blank_bucket = "unknown"
//! ```
//!
//! The API token itself is never part of the file, it is read from the environment variable
//! named by `platform.token_env`.
use std::env;
use std::fs;
use std::path::Path;

use pecluster::prelude::*;
use pecluster::reshape::{StrengthParams, MAX_REASONS};
use pecluster_hdbscan::{ClusteringError, Hdbscan, HdbscanParams};
use pecluster_umap::{Umap, UmapParams};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::platform::{ModelId, ProjectId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub project_id: String,
    pub model_id: String,
    /// Number of reasons computed per observation, between 1 and 10
    #[serde(default = "default_n_reasons")]
    pub n_reasons: usize,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub reshape: ReshapeConfig,
}

fn default_n_reasons() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub endpoint: String,
    /// Environment variable holding the API token
    pub token_env: String,
    pub poll_interval_secs: f64,
    /// Upper bound on waiting for upload, prediction and initialization jobs
    pub max_wait_secs: u64,
    /// Upper bound on waiting for the explanation job
    pub explanation_max_wait_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            endpoint: "https://app.datarobot.com/api/v2".to_string(),
            token_env: "DATAROBOT_API_TOKEN".to_string(),
            poll_interval_secs: 1.0,
            max_wait_secs: 600,
            explanation_max_wait_secs: 10_000,
        }
    }
}

impl PlatformConfig {
    /// Read the API token from the environment
    pub fn token(&self) -> Result<String> {
        env::var(&self.token_env).map_err(|_| PipelineError::MissingToken(self.token_env.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub n_neighbors: usize,
    pub min_dist: f64,
    pub n_components: usize,
    pub seed: u64,
    /// Optimization epochs, chosen from the dataset size if absent
    pub n_epochs: Option<usize>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig {
            n_neighbors: 30,
            min_dist: 0.0,
            n_components: 2,
            seed: 42,
            n_epochs: None,
        }
    }
}

impl ProjectionConfig {
    pub fn params(&self) -> UmapParams<f64, Xoshiro256Plus> {
        let params = Umap::params(self.n_components)
            .n_neighbors(self.n_neighbors)
            .min_dist(self.min_dist)
            .with_rng(Xoshiro256Plus::seed_from_u64(self.seed));
        match self.n_epochs {
            Some(n_epochs) => params.n_epochs(n_epochs),
            None => params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub min_samples: usize,
    pub min_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            min_samples: 10,
            min_cluster_size: 500,
        }
    }
}

impl ClusteringConfig {
    pub fn params(&self) -> HdbscanParams {
        Hdbscan::params(self.min_cluster_size).min_samples(self.min_samples)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReshapeConfig {
    /// Collect the strength of reasons without a feature name in this column instead of
    /// dropping them
    pub blank_bucket: Option<String>,
}

impl ReshapeConfig {
    pub fn blank_names(&self) -> BlankNames {
        match &self.blank_bucket {
            Some(name) => BlankNames::Bucket(name.clone()),
            None => BlankNames::Skip,
        }
    }
}

impl PipelineConfig {
    /// Configuration with default settings for the given project and model
    pub fn new<S: Into<String>, T: Into<String>>(project_id: S, model_id: T) -> Self {
        PipelineConfig {
            project_id: project_id.into(),
            model_id: model_id.into(),
            n_reasons: default_n_reasons(),
            platform: PlatformConfig::default(),
            projection: ProjectionConfig::default(),
            clustering: ClusteringConfig::default(),
            reshape: ReshapeConfig::default(),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_reasons == 0 || self.n_reasons > MAX_REASONS {
            return Err(PipelineError::InvalidConfig(format!(
                "n_reasons must be between 1 and {}, got {}",
                MAX_REASONS, self.n_reasons
            )));
        }
        if self.project_id.trim().is_empty() || self.model_id.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "project_id and model_id must not be empty".to_string(),
            ));
        }
        if self.platform.poll_interval_secs < 0.0 || !self.platform.poll_interval_secs.is_finite()
        {
            return Err(PipelineError::InvalidConfig(
                "poll_interval_secs must be a non-negative number".to_string(),
            ));
        }
        self.projection.params().check_ref()?;
        self.clustering.params().check_ref().map_err(ClusteringError::from)?;
        Ok(())
    }

    pub fn project(&self) -> ProjectId {
        ProjectId::new(self.project_id.as_str())
    }

    pub fn model(&self) -> ModelId {
        ModelId::new(self.model_id.as_str())
    }

    /// Reshaping parameters for explanations of the given target type
    pub fn strength_params(&self, target: TargetType) -> StrengthParams {
        StrengthMatrix::params(target)
            .n_reasons(self.n_reasons)
            .blank_names(self.reshape.blank_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            project_id = "p1"
            model_id = "m1"
            "#,
        )
        .unwrap();

        assert_eq!(config, PipelineConfig::new("p1", "m1"));
        assert_eq!(config.n_reasons, 5);
        assert_eq!(config.platform.token_env, "DATAROBOT_API_TOKEN");
        assert_eq!(config.platform.explanation_max_wait_secs, 10_000);
        assert_eq!(config.projection.n_neighbors, 30);
        assert_eq!(config.clustering.min_cluster_size, 500);
        assert_eq!(config.reshape.blank_names(), BlankNames::Skip);
    }

    #[test]
    fn sections_override_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            project_id = "p1"
            model_id = "m1"
            n_reasons = 3

            [projection]
            n_neighbors = 10

            [clustering]
            min_cluster_size = 20

            [reshape]
            blank_bucket = "unknown"
            "#,
        )
        .unwrap();

        assert_eq!(config.n_reasons, 3);
        assert_eq!(config.projection.n_neighbors, 10);
        assert_eq!(config.projection.seed, 42);
        assert_eq!(config.clustering.min_cluster_size, 20);
        assert_eq!(config.clustering.min_samples, 10);
        assert_eq!(
            config.reshape.blank_names(),
            BlankNames::Bucket("unknown".to_string())
        );
    }

    #[test]
    fn n_reasons_in_range() {
        let mut config = PipelineConfig::new("p1", "m1");
        config.n_reasons = 11;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        config.n_reasons = 0;
        assert!(config.validate().is_err());

        config.n_reasons = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ids_are_required() {
        let res = PipelineConfig::from_toml("model_id = \"m1\"");
        assert!(matches!(res, Err(PipelineError::ConfigFormat(_))));
    }

    #[test]
    fn invalid_algorithm_params() {
        let mut config = PipelineConfig::new("p1", "m1");
        config.clustering.min_cluster_size = 1;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Clustering(_))
        ));

        let mut config = PipelineConfig::new("p1", "m1");
        config.projection.n_neighbors = 1;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Projection(_))
        ));
    }
}
