use std::fs::File;
use std::io;
use std::path::PathBuf;

use pecluster_pipeline::{ExplanationClustering, HttpPlatform, PipelineConfig};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

/// Cluster the prediction explanations of a dataset scored by a DataRobot model
///
/// The summary reports the mean prediction of every cluster. Binary models predicting class
/// labels are summarized by the probability of the second class instead.
#[derive(Debug, StructOpt)]
struct Options {
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    /// TOML configuration file
    config: PathBuf,
    #[structopt(parse(from_os_str))]
    /// CSV file with the dataset to explain
    data: PathBuf,
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    /// Write the summary to this CSV file instead of stdout
    output: Option<PathBuf>,
    #[structopt(long = "project-id")]
    /// Override the project of the configuration
    project_id: Option<String>,
    #[structopt(long = "model-id")]
    /// Override the model of the configuration
    model_id: Option<String>,
    #[structopt(short = "n", long = "n-reasons")]
    /// Override the number of reasons per observation
    n_reasons: Option<usize>,
    #[structopt(long = "min-cluster-size")]
    /// Override the minimum cluster size
    min_cluster_size: Option<usize>,
    #[structopt(long = "min-samples")]
    /// Override the density neighborhood of the clustering
    min_samples: Option<usize>,
    #[structopt(long = "n-neighbors")]
    /// Override the neighborhood size of the projection
    n_neighbors: Option<usize>,
}

impl Options {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(project_id) = &self.project_id {
            config.project_id = project_id.clone();
        }
        if let Some(model_id) = &self.model_id {
            config.model_id = model_id.clone();
        }
        if let Some(n_reasons) = self.n_reasons {
            config.n_reasons = n_reasons;
        }
        if let Some(min_cluster_size) = self.min_cluster_size {
            config.clustering.min_cluster_size = min_cluster_size;
        }
        if let Some(min_samples) = self.min_samples {
            config.clustering.min_samples = min_samples;
        }
        if let Some(n_neighbors) = self.n_neighbors {
            config.projection.n_neighbors = n_neighbors;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let opt = Options::from_args();
    let mut config = PipelineConfig::from_path(&opt.config)?;
    opt.apply(&mut config);

    let platform = HttpPlatform::new(&config.platform, config.platform.token()?)?;
    let mut clustering = ExplanationClustering::from_csv_path(platform, config, &opt.data)?;
    let summary = clustering.run()?.to_table();

    match &opt.output {
        Some(path) => summary.to_csv(File::create(path)?)?,
        None => summary.to_csv(io::stdout())?,
    }

    Ok(())
}
