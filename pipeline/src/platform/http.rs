use std::thread;
use std::time::{Duration, Instant};

use pecluster::{Table, TargetType};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::records::{records_to_table, ExplanationPage};
use super::{DatasetId, ExplanationsId, ModelId, Platform, PlatformError, ProjectId, Result};
use crate::config::PlatformConfig;

/// Number of explanation rows requested per page
const PAGE_LIMIT: usize = 1000;
/// Error name of a feature impact job that was requested before
const JOB_ALREADY_ADDED: &str = "JobAlreadyAdded";

#[derive(Deserialize)]
struct Resource {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Project {
    target_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_name: Option<String>,
}

#[derive(Deserialize)]
struct JobStatus {
    #[serde(default)]
    status: String,
}

/// [`Platform`] on top of the DataRobot REST API
///
/// Asynchronous jobs answer with `202 Accepted` and the location of a status resource. The status
/// is polled until it redirects to the finished resource, so automatic redirects are disabled.
pub struct HttpPlatform {
    client: Client,
    endpoint: String,
    token: String,
    poll_interval: Duration,
    max_wait: Duration,
    explanation_max_wait: Duration,
}

impl HttpPlatform {
    pub fn new(config: &PlatformConfig, token: String) -> Result<HttpPlatform> {
        let poll_interval = config.poll_interval_secs;
        if !poll_interval.is_finite() || poll_interval < 0.0 {
            return Err(PlatformError::InvalidPollInterval(poll_interval));
        }
        let client = Client::builder().redirect(Policy::none()).build()?;

        Ok(HttpPlatform {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token,
            poll_interval: Duration::from_secs_f64(poll_interval),
            max_wait: Duration::from_secs(config.max_wait_secs),
            explanation_max_wait: Duration::from_secs(config.explanation_max_wait_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.token)
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url).bearer_auth(&self.token)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = success(self.get(url).send()?)?;
        Ok(response.json()?)
    }

    /// Submit an asynchronous job and wait until it has finished, returns the location of the
    /// finished resource
    fn run_job(&self, request: RequestBuilder, max_wait: Duration) -> Result<String> {
        let response = success(request.send()?)?;
        let status_url = location(&response)?;
        self.wait_for_job(&status_url, max_wait)
    }

    fn wait_for_job(&self, status_url: &str, max_wait: Duration) -> Result<String> {
        let start = Instant::now();
        loop {
            let response = self.get(status_url).send()?;
            match response.status() {
                StatusCode::SEE_OTHER => return location(&response),
                StatusCode::OK => {
                    let job: JobStatus = response.json()?;
                    debug!(url = status_url, status = %job.status, "polled job");
                    match job.status.to_lowercase().as_str() {
                        "error" | "aborted" | "failed" => {
                            return Err(PlatformError::JobFailed {
                                url: status_url.to_string(),
                                status: job.status,
                            })
                        }
                        "completed" => return Ok(status_url.to_string()),
                        _ => {}
                    }
                }
                _ => return Err(status_error(response)),
            }

            if start.elapsed() >= max_wait {
                return Err(PlatformError::Timeout {
                    url: status_url.to_string(),
                    waited_secs: start.elapsed().as_secs(),
                });
            }
            thread::sleep(self.poll_interval);
        }
    }

    fn resource_id(&self, url: &str) -> Result<String> {
        let resource: Resource = self.get_json(url)?;
        Ok(resource.id)
    }
}

fn status_error(response: Response) -> PlatformError {
    let url = response.url().to_string();
    let status = response.status();
    let body = response.text().unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        PlatformError::NotFound(url)
    } else {
        PlatformError::Status {
            url,
            status: status.as_u16(),
            body,
        }
    }
}

fn success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response))
    }
}

/// True if a `422` body reports a job that was requested before
fn is_job_already_added(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error_name)
        .map_or(false, |name| name == JOB_ALREADY_ADDED)
}

fn location(response: &Response) -> Result<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| PlatformError::UnexpectedResponse {
            url: response.url().to_string(),
            reason: "missing Location header".to_string(),
        })
}

impl Platform for HttpPlatform {
    fn target_type(&self, project: &ProjectId) -> Result<TargetType> {
        let url = self.url(&format!("projects/{}/", project));
        let Project { target_type } = self.get_json(&url)?;
        let target_type = target_type.ok_or_else(|| PlatformError::UnexpectedResponse {
            url,
            reason: "project has no target type".to_string(),
        })?;
        Ok(target_type.parse::<TargetType>()?)
    }

    fn upload_dataset(&self, project: &ProjectId, data: &Table) -> Result<DatasetId> {
        let url = self.url(&format!("projects/{}/predictionDatasets/fileUploads/", project));
        let file = Part::bytes(data.to_csv_bytes()?)
            .file_name("dataset.csv")
            .mime_str("text/csv")?;
        let request = self.post(&url).multipart(Form::new().part("file", file));

        let dataset_url = self.run_job(request, self.max_wait)?;
        Ok(DatasetId::new(self.resource_id(&dataset_url)?))
    }

    fn request_predictions(
        &self,
        project: &ProjectId,
        model: &ModelId,
        dataset: &DatasetId,
    ) -> Result<()> {
        let url = self.url(&format!("projects/{}/predictions/", project));
        let request = self.post(&url).json(&json!({
            "modelId": model.as_str(),
            "datasetId": dataset.as_str(),
        }));
        self.run_job(request, self.max_wait)?;
        Ok(())
    }

    fn request_feature_impact(&self, project: &ProjectId, model: &ModelId) -> Result<()> {
        let url = self.url(&format!("projects/{}/models/{}/featureImpact/", project, model));
        let response = self.post(&url).send()?;
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let url = response.url().to_string();
            let body = response.text().unwrap_or_default();
            return Err(if is_job_already_added(&body) {
                PlatformError::AlreadyRequested
            } else {
                PlatformError::Status {
                    url,
                    status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                    body,
                }
            });
        }
        let status_url = location(&success(response)?)?;
        self.wait_for_job(&status_url, self.max_wait)?;
        Ok(())
    }

    fn explanations_initialization(&self, project: &ProjectId, model: &ModelId) -> Result<()> {
        let url = self.url(&format!(
            "projects/{}/models/{}/predictionExplanationsInitialization/",
            project, model
        ));
        success(self.get(&url).send()?)?;
        Ok(())
    }

    fn create_explanations_initialization(
        &self,
        project: &ProjectId,
        model: &ModelId,
    ) -> Result<()> {
        let url = self.url(&format!(
            "projects/{}/models/{}/predictionExplanationsInitialization/",
            project, model
        ));
        self.run_job(self.post(&url), self.max_wait)?;
        Ok(())
    }

    fn compute_explanations(
        &self,
        project: &ProjectId,
        model: &ModelId,
        dataset: &DatasetId,
        max_explanations: usize,
    ) -> Result<ExplanationsId> {
        let url = self.url(&format!("projects/{}/predictionExplanations/", project));
        let request = self.post(&url).json(&json!({
            "modelId": model.as_str(),
            "datasetId": dataset.as_str(),
            "maxExplanations": max_explanations,
            "thresholdLow": null,
            "thresholdHigh": null,
        }));

        let records_url = self.run_job(request, self.explanation_max_wait)?;
        Ok(ExplanationsId::new(self.resource_id(&records_url)?))
    }

    fn fetch_explanations(
        &self,
        project: &ProjectId,
        explanations: &ExplanationsId,
        target: TargetType,
        max_explanations: usize,
    ) -> Result<Table> {
        let mut next = Some(self.url(&format!(
            "projects/{}/predictionExplanations/{}/?limit={}",
            project, explanations, PAGE_LIMIT
        )));

        let mut records = Vec::new();
        while let Some(url) = next {
            let page: ExplanationPage = self.get_json(&url)?;
            debug!(url = %url, rows = page.data.len(), "fetched explanation page");
            records.extend(page.data);
            next = page.next;
        }

        Ok(records_to_table(&records, target, max_explanations)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_already_added_body() {
        assert!(is_job_already_added(
            r#"{"message": "Feature Impact is in progress", "errorName": "JobAlreadyAdded"}"#
        ));
        assert!(!is_job_already_added(
            r#"{"message": "Model is not trained", "errorName": "InvalidModel"}"#
        ));
        assert!(!is_job_already_added(r#"{"message": "no error name"}"#));
        assert!(!is_job_already_added("not json"));
        assert!(!is_job_already_added(""));
    }

    #[test]
    fn invalid_poll_interval() {
        for interval in [-1.0, f64::NAN, f64::INFINITY] {
            let config = PlatformConfig {
                poll_interval_secs: interval,
                ..PlatformConfig::default()
            };
            let res = HttpPlatform::new(&config, "token".to_string());
            assert!(matches!(res, Err(PlatformError::InvalidPollInterval(_))));
        }

        let config = PlatformConfig {
            poll_interval_secs: 0.0,
            ..PlatformConfig::default()
        };
        assert!(HttpPlatform::new(&config, "token".to_string()).is_ok());
    }
}
