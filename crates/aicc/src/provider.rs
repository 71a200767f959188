//! The job service as seen by the watch engine and by the web layer.

use async_trait::async_trait;
use tracing::debug;
use tunewatch_core::{FinetuneSpec, JobDetail, JobHandle, JobManager, TrainingStatus};
use tunewatch_reconciler::JobStatusProvider;

use crate::client::AiccClient;
use crate::config::{FinetuneConfig, ModelConfig};
use crate::error::{Error, Result};
use crate::storage::ObsHelper;
use crate::types::{
    AlgorithmOption, EngineOption, InputOutputOption, JobCreateOption, LogExportPathOption,
    MetadataOption, ParameterOption, ResourceOption, SpecOption,
};

const OBS_DELIMITER: &str = "/";
const MODEL_PATH_KEY: &str = "model_path";
const DATA_PATH_KEY: &str = "finetune_data_path";

/// Job service backed by the AICC REST API and object storage.
#[derive(Debug, Clone)]
pub struct AiccProvider {
    client: AiccClient,
    storage: ObsHelper,
    finetune: FinetuneConfig,
}

impl AiccProvider {
    pub const fn new(client: AiccClient, storage: ObsHelper, finetune: FinetuneConfig) -> Self {
        Self {
            client,
            storage,
            finetune,
        }
    }

    fn model_config(&self, spec: &FinetuneSpec) -> Result<&ModelConfig> {
        let model = spec.model_or_default();
        self.finetune
            .model(model.as_str())
            .ok_or_else(|| Error::UnsupportedModel {
                model: model.as_str().to_string(),
            })
    }
}

/// Object-storage folders a job reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    pub log_dir: String,
    pub output_dir: String,
    pub input_dir: String,
}

impl JobLayout {
    /// Folders are `{base}{task}/{user}/` under each configured base.
    pub fn new(config: &ModelConfig, spec: &FinetuneSpec) -> Self {
        let suffix = format!(
            "{task}{OBS_DELIMITER}{user}{OBS_DELIMITER}",
            task = spec.task,
            user = spec.user
        );
        Self {
            log_dir: format!("{}{suffix}", config.log_dir),
            output_dir: format!("{}{suffix}", config.output_dir),
            input_dir: format!("{}{suffix}", config.input_dir),
        }
    }
}

/// Build the job creation request for `spec`.
pub fn create_option(
    config: &ModelConfig,
    spec: &FinetuneSpec,
    layout: &JobLayout,
    timestamp: i64,
) -> JobCreateOption {
    let parameters = spec
        .hyperparameters
        .iter()
        .map(|kv| ParameterOption {
            name: kv.key.as_str().to_string(),
            value: kv.value_or_empty().to_string(),
        })
        .collect();

    let environments = spec
        .env
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), kv.value_or_empty().to_string()))
        .collect();

    JobCreateOption {
        kind: "job".to_string(),
        metadata: MetadataOption {
            name: format!(
                "{}{}-{timestamp}-{}",
                spec.name.as_str(),
                spec.user,
                spec.task
            ),
            desc: spec.desc.as_str().to_string(),
        },
        algorithm: AlgorithmOption {
            working_dir: config.working_dir.clone(),
            code_dir: config.code_dir.clone(),
            command: spec.command().to_string(),
            engine: EngineOption {
                image_url: config.image_url.clone(),
            },
            parameters,
            environments,
            inputs: vec![
                InputOutputOption::obs(MODEL_PATH_KEY, config.model_dir.clone()),
                InputOutputOption::obs(DATA_PATH_KEY, layout.input_dir.clone()),
            ],
            outputs: vec![InputOutputOption::obs(
                config.output_key.clone(),
                layout.output_dir.clone(),
            )],
        },
        spec: SpecOption {
            resource: ResourceOption {
                flavor_id: config.flavor_id.clone(),
                pool_id: config.pool_id.clone(),
                pool_name: config.pool_name.clone(),
                node_count: 1,
            },
            log_export_path: LogExportPathOption {
                obs_url: layout.log_dir.clone(),
            },
        },
    }
}

#[async_trait]
impl JobManager for AiccProvider {
    async fn create(&self, spec: &FinetuneSpec) -> tunewatch_core::Result<JobHandle> {
        let config = self.model_config(spec)?;
        let layout = JobLayout::new(config, spec);
        let option = create_option(config, spec, &layout, chrono::Utc::now().timestamp());

        debug!(
            finetune_id = %spec.id,
            user = %spec.user,
            task = %spec.task,
            "Creating job"
        );
        let job_id = self.client.create_job(&option).await?;

        Ok(JobHandle::new(job_id, layout.log_dir, layout.output_dir))
    }

    async fn delete(&self, job_id: &str) -> tunewatch_core::Result<()> {
        Ok(self.client.delete_job(job_id).await?)
    }

    async fn terminate(&self, job_id: &str) -> tunewatch_core::Result<()> {
        Ok(self.client.terminate_job(job_id).await?)
    }

    async fn log_download_url(&self, job_id: &str) -> tunewatch_core::Result<String> {
        Ok(self.client.log_url(job_id).await?)
    }

    async fn file_download_url(&self, path: &str) -> tunewatch_core::Result<String> {
        Ok(self.storage.sign(path).await?)
    }
}

#[async_trait]
impl JobStatusProvider for AiccProvider {
    async fn get_detail(&self, job_id: &str) -> tunewatch_reconciler::Result<JobDetail> {
        let job = self
            .client
            .get_job(job_id)
            .await
            .map_err(|e| e.into_probe("status"))?;

        Ok(JobDetail::new(
            TrainingStatus::from_phase(&job.status.phase),
            job.status.duration / 1000,
        ))
    }

    async fn terminate(&self, job_id: &str) -> tunewatch_reconciler::Result<()> {
        self.client
            .terminate_job(job_id)
            .await
            .map_err(|e| e.into_probe("terminate"))
    }

    async fn locate_log(&self, log_dir: &str) -> tunewatch_reconciler::Result<String> {
        self.storage
            .locate_log(log_dir)
            .await
            .map_err(|e| e.into_probe("log"))
    }

    async fn package_output(&self, output_dir: &str) -> tunewatch_reconciler::Result<String> {
        self.storage
            .package_output(output_dir)
            .await
            .map_err(|e| e.into_probe("output"))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use tunewatch_core::{Account, FinetuneDesc, FinetuneName, KeyValue, ModelName};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{AiccConfig, ObsConfig, UploadConfig};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn model_config() -> ModelConfig {
        ModelConfig {
            pool_id: "pool-1".to_string(),
            pool_name: "pool".to_string(),
            flavor_id: "gpu.large".to_string(),
            output_key: "output_path".to_string(),
            output_dir: "finetune/output/".to_string(),
            working_dir: "/home/work".to_string(),
            code_dir: "/code/".to_string(),
            input_dir: "finetune/input/".to_string(),
            log_dir: "finetune/logs/".to_string(),
            model_dir: "models/wukong/".to_string(),
            image_url: "swr.example.com/wukong:1.0".to_string(),
        }
    }

    fn spec(model: &str) -> tunewatch_core::Result<FinetuneSpec> {
        Ok(FinetuneSpec {
            id: "ft-1".to_string(),
            user: Account::new("alice")?,
            model: ModelName::parse(model),
            task: "finetune".to_string(),
            name: FinetuneName::new("lora")?,
            desc: FinetuneDesc::new("first try")?,
            hyperparameters: vec![KeyValue::new("epochs", "3")?, KeyValue::new("lr", "")?],
            env: vec![KeyValue::new("SEED", "7")?],
        })
    }

    async fn provider(
        server: &MockServer,
    ) -> std::result::Result<AiccProvider, Box<dyn std::error::Error>> {
        let client = AiccClient::with_config(AiccConfig {
            domain: "d".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
            project: "proj".to_string(),
            project_id: "pid".to_string(),
            auth_endpoint: Url::parse(&format!("{}/v3/auth/tokens", server.uri()))?,
            endpoint: Url::parse(&server.uri())?,
            timeout: Duration::from_secs(5),
        })?;

        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).insert_header("x-subject-token", "tok"))
            .mount(server)
            .await;

        let storage = ObsHelper::new(
            ObsConfig {
                access_key: "ak".to_string(),
                secret_key: "sk".to_string(),
                endpoint: "obs.example.com".to_string(),
                bucket: "bucket".to_string(),
            },
            UploadConfig {
                upload_work_dir: PathBuf::from("/tmp/tunewatch-test"),
                upload_folder_shell: PathBuf::from("/bin/false"),
                download_expiry: 3600,
                obsutil_path: "obsutil".to_string(),
            },
        );

        let mut finetune = FinetuneConfig::default();
        finetune.models.insert("wukong".to_string(), model_config());
        Ok(AiccProvider::new(client, storage, finetune))
    }

    #[test]
    fn test_layout_per_task_and_user() -> TestResult {
        let layout = JobLayout::new(&model_config(), &spec("wukong")?);
        assert_eq!(layout.log_dir, "finetune/logs/finetune/alice/");
        assert_eq!(layout.output_dir, "finetune/output/finetune/alice/");
        assert_eq!(layout.input_dir, "finetune/input/finetune/alice/");
        Ok(())
    }

    #[test]
    fn test_create_option() -> TestResult {
        let config = model_config();
        let spec = spec("wukong")?;
        let layout = JobLayout::new(&config, &spec);
        let option = create_option(&config, &spec, &layout, 1_700_000_000);

        assert_eq!(option.metadata.name, "loraalice-1700000000-finetune");
        assert_eq!(option.metadata.desc, "first try");
        assert_eq!(option.algorithm.command, "python train-lora.py");
        assert_eq!(
            option.algorithm.parameters,
            vec![
                ParameterOption {
                    name: "epochs".to_string(),
                    value: "3".to_string()
                },
                ParameterOption {
                    name: "lr".to_string(),
                    value: String::new()
                },
            ]
        );
        assert_eq!(
            option.algorithm.environments.get("SEED").map(String::as_str),
            Some("7")
        );
        assert_eq!(
            option.algorithm.inputs,
            vec![
                InputOutputOption::obs("model_path", "models/wukong/"),
                InputOutputOption::obs("finetune_data_path", "finetune/input/finetune/alice/"),
            ]
        );
        assert_eq!(
            option.algorithm.outputs,
            vec![InputOutputOption::obs(
                "output_path",
                "finetune/output/finetune/alice/"
            )]
        );
        assert_eq!(option.spec.log_export_path.obs_url, layout.log_dir);
        assert_eq!(option.spec.resource.node_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_returns_handle_with_layout() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/pid/training-jobs"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"metadata": {"id": "job-7"}})),
            )
            .mount(&server)
            .await;

        let handle = provider(&server).await?.create(&spec("")?).await?;
        assert_eq!(
            handle,
            JobHandle::new(
                "job-7",
                "finetune/logs/finetune/alice/",
                "finetune/output/finetune/alice/"
            )
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_model() -> TestResult {
        let server = MockServer::start().await;
        let result = provider(&server).await?.create(&spec("pangu")?).await;
        assert!(matches!(
            result,
            Err(tunewatch_core::Error::UnsupportedModel { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_detail_maps_phase_and_duration() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/pid/training-jobs/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "metadata": {"id": "job-7"},
                "status": {"phase": "COMPLETED", "duration": 120_999}
            })))
            .mount(&server)
            .await;

        let detail = provider(&server).await?.get_detail("job-7").await?;
        assert_eq!(detail, JobDetail::new(TrainingStatus::Completed, 120));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_detail_failure_is_probe_error() -> TestResult {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/pid/training-jobs/job-7"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = provider(&server).await?.get_detail("job-7").await;
        assert!(matches!(
            result,
            Err(tunewatch_reconciler::Error::ProbeFailed { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_output_dir_packages_nothing() -> TestResult {
        let server = MockServer::start().await;
        let archive = provider(&server).await?.package_output("").await?;
        assert!(archive.is_empty());
        Ok(())
    }
}
