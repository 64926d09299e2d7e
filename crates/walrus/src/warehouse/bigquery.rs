//! BigQuery load jobs over the v2 REST API.
//!
//! A load is a `jobs.insert` call carrying a `load` configuration. The job
//! then runs server-side; waiting means polling `jobs.get` until the job
//! state is `DONE` and checking `status.errorResult`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{LoadJob, LoadRequest, TokenSource, WarehouseService};
use crate::config::BigQueryConfig;
use crate::error::{ClientBuildSnafu, HttpSnafu, WarehouseError};

const STATE_DONE: &str = "DONE";

// ============ Wire types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobInsert<'a> {
    job_reference: JobReference<'a>,
    configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobReference<'a> {
    project_id: &'a str,
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadConfiguration<'a> {
    source_uris: Vec<String>,
    source_format: &'static str,
    destination_table: TableReference<'a>,
    write_disposition: &'static str,
    create_disposition: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableReference<'a> {
    project_id: &'a str,
    dataset_id: &'a str,
    table_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    #[serde(default)]
    job_reference: Option<ReturnedJobReference>,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReturnedJobReference {
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

impl Job {
    fn is_done(&self) -> bool {
        self.status.state == STATE_DONE
    }
}

// ============ Service ============

/// Submits load jobs to BigQuery.
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    config: BigQueryConfig,
    tokens: TokenSource,
}

impl BigQueryWarehouse {
    /// Build a client, resolving credentials per [`TokenSource::resolve`].
    pub fn new(config: BigQueryConfig) -> Result<Self, WarehouseError> {
        let tokens = TokenSource::resolve(config.access_token.as_deref());
        Self::with_token_source(config, tokens)
    }

    /// Build a client with an explicit token source.
    pub fn with_token_source(
        config: BigQueryConfig,
        tokens: TokenSource,
    ) -> Result<Self, WarehouseError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("walrus/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    fn jobs_url(&self, project: &str) -> String {
        format!(
            "{}/bigquery/v2/projects/{}/jobs",
            self.config.endpoint.trim_end_matches('/'),
            project
        )
    }

    fn insert_body<'a>(&'a self, request: &'a LoadRequest, job_id: &'a str) -> JobInsert<'a> {
        let destination = &request.destination;

        JobInsert {
            job_reference: JobReference {
                project_id: &destination.project,
                job_id,
                location: self.config.location.as_deref(),
            },
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![request.source.uri()],
                    source_format: request.format.as_bigquery(),
                    destination_table: TableReference {
                        project_id: &destination.project,
                        dataset_id: &destination.dataset,
                        table_id: &destination.table,
                    },
                    write_disposition: self.config.write_disposition.as_bigquery(),
                    create_disposition: self.config.create_disposition.as_bigquery(),
                },
            },
        }
    }
}

#[async_trait]
impl WarehouseService for BigQueryWarehouse {
    async fn submit_load(&self, request: &LoadRequest) -> Result<Box<dyn LoadJob>, WarehouseError> {
        let job_id = format!("walrus_load_{}", Uuid::now_v7().simple());
        let url = self.jobs_url(&request.destination.project);
        let token = self.tokens.token(&self.client).await?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&self.insert_body(request, &job_id))
            .send()
            .await
            .context(HttpSnafu {
                operation: "jobs.insert",
            })?;
        let job = read_job(response, "jobs.insert").await?;

        info!(
            job_id = %job_id,
            source = %request.source,
            destination = %request.destination,
            "Submitted load job"
        );

        let location = job
            .job_reference
            .as_ref()
            .and_then(|reference| reference.location.clone())
            .or_else(|| self.config.location.clone());

        Ok(Box::new(BigQueryLoadJob {
            client: self.client.clone(),
            tokens: self.tokens.clone(),
            status_url: format!("{url}/{job_id}"),
            location,
            job_id,
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            last: job,
        }))
    }

    fn name(&self) -> &str {
        "bigquery"
    }
}

/// Handle to a running BigQuery job.
struct BigQueryLoadJob {
    client: reqwest::Client,
    tokens: TokenSource,
    status_url: String,
    location: Option<String>,
    job_id: String,
    poll_interval: Duration,
    last: Job,
}

impl BigQueryLoadJob {
    async fn refresh(&mut self) -> Result<(), WarehouseError> {
        let token = self.tokens.token(&self.client).await?;

        let mut request = self.client.get(&self.status_url).bearer_auth(&token);
        if let Some(location) = &self.location {
            request = request.query(&[("location", location.as_str())]);
        }

        let response = request.send().await.context(HttpSnafu {
            operation: "jobs.get",
        })?;
        self.last = read_job(response, "jobs.get").await?;

        debug!(job_id = %self.job_id, state = %self.last.status.state, "Polled load job");
        Ok(())
    }

    fn outcome(&self) -> Result<(), WarehouseError> {
        match &self.last.status.error_result {
            Some(error) => Err(WarehouseError::JobFailed {
                job_id: self.job_id.clone(),
                reason: error.reason.clone(),
                message: error.message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LoadJob for BigQueryLoadJob {
    fn id(&self) -> &str {
        &self.job_id
    }

    async fn wait(&mut self) -> Result<(), WarehouseError> {
        while !self.last.is_done() {
            tokio::time::sleep(self.poll_interval).await;
            self.refresh().await?;
        }
        self.outcome()
    }
}

/// Decode a job resource, turning non-2xx answers into [`WarehouseError::Api`].
async fn read_job(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<Job, WarehouseError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);

        return Err(WarehouseError::Api {
            operation,
            status: status.as_u16(),
            message,
        });
    }

    response.json().await.context(HttpSnafu { operation })
}
