//! HTTP client for the training-job service.
//!
//! Every call fetches a fresh password-scoped token from the auth endpoint
//! and sends it as `X-Auth-Token`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::config::AiccConfig;
use crate::error::{Error, Result};
use crate::types::{Job, JobCreateOption, LogResp, TerminateBody};

const TOKEN_HEADER: &str = "x-subject-token";
const AUTH_HEADER: &str = "X-Auth-Token";

/// Client for the training-job REST API.
#[derive(Debug, Clone)]
pub struct AiccClient {
    /// Configuration for the client.
    config: Arc<AiccConfig>,
    /// `{endpoint}/v2/{project_id}/training-jobs`.
    jobs_url: String,
    http_client: reqwest::Client,
}

impl AiccClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` when the HTTP client cannot be built and
    /// `Error::UrlParse` when the endpoint does not form a valid job URL.
    pub fn with_config(config: AiccConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config_error(format!("Failed to build HTTP client: {e}")))?;

        let jobs_url = format!(
            "{}/v2/{}/training-jobs",
            config.endpoint.as_str().trim_end_matches('/'),
            config.project_id
        );
        Url::parse(&jobs_url)?;

        Ok(Self {
            config: Arc::new(config),
            jobs_url,
            http_client,
        })
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/{job_id}", self.jobs_url)
    }

    /// Create a job, returning its id. Expects `201 Created`.
    pub async fn create_job(&self, options: &JobCreateOption) -> Result<String> {
        let response = self
            .send(self.request(Method::POST, &self.jobs_url).json(options))
            .await?;
        let job: Job = expect_json(response, StatusCode::CREATED, "create job").await?;

        if job.metadata.id.is_empty() {
            return Err(Error::invalid_response("created job has no id"));
        }
        info!(job_id = %job.metadata.id, name = %options.metadata.name, "Created training job");
        Ok(job.metadata.id)
    }

    /// Fetch a job. Expects `200 OK`.
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let response = self
            .send(self.request(Method::GET, &self.job_url(job_id)))
            .await?;
        expect_json(response, StatusCode::OK, "get job").await
    }

    /// Delete a job. Expects `202 Accepted`.
    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        let response = self
            .send(self.request(Method::DELETE, &self.job_url(job_id)))
            .await?;
        expect_status(&response, StatusCode::ACCEPTED, "delete job")?;
        info!(job_id = %job_id, "Deleted training job");
        Ok(())
    }

    /// Force-stop a job. Expects `200 OK`.
    pub async fn terminate_job(&self, job_id: &str) -> Result<()> {
        let url = format!("{}/actions", self.job_url(job_id));
        let response = self
            .send(
                self.request(Method::POST, &url)
                    .json(&TerminateBody::terminate()),
            )
            .await?;
        expect_status(&response, StatusCode::OK, "terminate job")?;
        info!(job_id = %job_id, "Terminated training job");
        Ok(())
    }

    /// Temporary download URL of the first worker's log. Expects `200 OK`.
    pub async fn log_url(&self, job_id: &str) -> Result<String> {
        let url = format!("{}/tasks/worker-0/logs/url", self.job_url(job_id));
        let response = self.send(self.request(Method::GET, &url)).await?;
        let log: LogResp = expect_json(response, StatusCode::OK, "get log url").await?;
        Ok(log.obs_url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.token_with_retry().await?;
        Ok(request.header(AUTH_HEADER, token).send().await?)
    }

    /// Fetch a token, retrying transient failures with exponential backoff:
    /// - Retry 1: wait 500ms
    /// - Retry 2: wait 1s
    ///
    /// Max attempts: 3
    async fn token_with_retry(&self) -> Result<String> {
        const MAX_ATTEMPTS: u32 = 3;
        const BASE_DELAY_MS: u64 = 500;

        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);

            match self.token().await {
                Ok(token) => return Ok(token),
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS || !e.is_retryable() {
                        return Err(e);
                    }

                    let delay_ms = BASE_DELAY_MS
                        .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
                    debug!(attempt, delay_ms, error = %e, "Retrying token request");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn token(&self) -> Result<String> {
        let body = serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.config.user,
                            "password": self.config.password,
                            "domain": { "name": self.config.domain }
                        }
                    }
                },
                "scope": {
                    "project": { "name": self.config.project }
                }
            }
        });

        let response = self
            .http_client
            .post(self.config.auth_endpoint.as_str())
            .json(&body)
            .send()
            .await?;

        response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::auth_failed(format!(
                    "no {TOKEN_HEADER} header in response ({})",
                    response.status()
                ))
            })
    }
}

fn expect_status(response: &Response, expected: StatusCode, operation: &str) -> Result<()> {
    if response.status() == expected {
        Ok(())
    } else {
        Err(Error::unexpected_status(operation, response.status()))
    }
}

async fn expect_json<T: DeserializeOwned>(
    response: Response,
    expected: StatusCode,
    operation: &str,
) -> Result<T> {
    expect_status(&response, expected, operation)?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AlgorithmOption, EngineOption, LogExportPathOption, MetadataOption, ResourceOption,
        SpecOption,
    };
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    async fn server_with_token() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).insert_header(TOKEN_HEADER, "tok-1"))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> Result<AiccClient> {
        let config = AiccConfig {
            domain: "d".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
            project: "proj".to_string(),
            project_id: "pid".to_string(),
            auth_endpoint: Url::parse(&format!("{}/v3/auth/tokens", server.uri()))?,
            endpoint: Url::parse(&server.uri())?,
            timeout: Duration::from_secs(5),
        };
        AiccClient::with_config(config)
    }

    fn create_option() -> JobCreateOption {
        JobCreateOption {
            kind: "job".to_string(),
            metadata: MetadataOption {
                name: "demou1-1700000000-finetune".to_string(),
                desc: String::new(),
            },
            algorithm: AlgorithmOption {
                working_dir: "/w".to_string(),
                code_dir: "/c/".to_string(),
                command: "python train-lora.py".to_string(),
                engine: EngineOption {
                    image_url: "img".to_string(),
                },
                parameters: vec![],
                environments: std::collections::BTreeMap::new(),
                inputs: vec![],
                outputs: vec![],
            },
            spec: SpecOption {
                resource: ResourceOption {
                    flavor_id: "f".to_string(),
                    pool_id: "p".to_string(),
                    pool_name: "n".to_string(),
                    node_count: 1,
                },
                log_export_path: LogExportPathOption {
                    obs_url: "logs/".to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_create_job_returns_id() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path("/v2/pid/training-jobs"))
            .and(header(AUTH_HEADER, "tok-1"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"metadata": {"id": "job-42"}})),
            )
            .mount(&server)
            .await;

        let id = client(&server)?.create_job(&create_option()).await?;
        assert_eq!(id, "job-42");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_job_rejects_other_status() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path("/v2/pid/training-jobs"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let result = client(&server)?.create_job(&create_option()).await;
        assert!(matches!(
            result,
            Err(Error::UnexpectedStatus { status: 400, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_job_parses_status() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("GET"))
            .and(path("/v2/pid/training-jobs/job-42"))
            .and(header(AUTH_HEADER, "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "metadata": {"id": "job-42"},
                "status": {"phase": "Running", "duration": 125_000, "start_time": 1}
            })))
            .mount(&server)
            .await;

        let job = client(&server)?.get_job("job-42").await?;
        assert_eq!(job.status.phase, "Running");
        assert_eq!(job.status.duration, 125_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_terminate_posts_action() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path("/v2/pid/training-jobs/job-42/actions"))
            .and(body_json(serde_json::json!({"action_type": "terminate"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)?.terminate_job("job-42").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_expects_accepted() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/pid/training-jobs/job-42"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = client(&server)?.delete_job("job-42").await;
        assert!(matches!(
            result,
            Err(Error::UnexpectedStatus { status: 200, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_log_url() -> TestResult {
        let server = server_with_token().await;
        Mock::given(method("GET"))
            .and(path("/v2/pid/training-jobs/job-42/tasks/worker-0/logs/url"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"obs_url": "https://obs/log?sig"})),
            )
            .mount(&server)
            .await;

        let url = client(&server)?.log_url("job-42").await?;
        assert_eq!(url, "https://obs/log?sig");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_failure() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client(&server)?.get_job("job-42").await;
        assert!(matches!(result, Err(Error::AuthFailed { .. })));
        Ok(())
    }
}
