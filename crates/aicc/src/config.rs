//! Configuration for the job service, object storage and report endpoint.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Credentials and endpoints of the training-job service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiccConfig {
    /// Account domain used for the password-scoped token.
    pub domain: String,
    pub user: String,
    pub password: String,
    /// Project name the token is scoped to.
    pub project: String,
    /// Project id embedded in job URLs.
    pub project_id: String,
    /// Token endpoint.
    pub auth_endpoint: Url,
    /// Job service endpoint.
    pub endpoint: Url,

    /// Timeout for requests.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
}

impl AiccConfig {
    /// Check that every credential is present.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        require("aicc.domain", &self.domain)?;
        require("aicc.user", &self.user)?;
        require("aicc.password", &self.password)?;
        require("aicc.project", &self.project)?;
        require("aicc.project_id", &self.project_id)
    }
}

/// Object storage access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsConfig {
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: String,
    pub bucket: String,
}

impl ObsConfig {
    /// # Errors
    ///
    /// Returns `Error::ConfigError` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        require("obs.access_key", &self.access_key)?;
        require("obs.secret_key", &self.secret_key)?;
        require("obs.endpoint", &self.endpoint)?;
        require("obs.bucket", &self.bucket)
    }
}

/// Output packaging and download signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Parent of the scratch directories used while packaging output.
    pub upload_work_dir: PathBuf,

    /// Script that zips an object-storage folder and uploads the archive.
    /// Invoked as `script <tempdir> <obsutil> <bucket> <folder>`; prints the
    /// archive's object key.
    pub upload_folder_shell: PathBuf,

    /// Lifetime of signed download URLs, in seconds. Non-positive means
    /// the default.
    #[serde(default = "default_download_expiry")]
    pub download_expiry: i64,

    /// Path to the storage CLI.
    #[serde(default = "default_obsutil_path")]
    pub obsutil_path: String,
}

impl UploadConfig {
    pub fn set_default(&mut self) {
        if self.download_expiry <= 0 {
            self.download_expiry = default_download_expiry();
        }
    }

    /// # Errors
    ///
    /// Returns `Error::ConfigError` when a path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.upload_work_dir.as_os_str().is_empty() {
            return Err(Error::config_error("upload.upload_work_dir is required"));
        }
        if self.upload_folder_shell.as_os_str().is_empty() {
            return Err(Error::config_error("upload.upload_folder_shell is required"));
        }
        require("upload.obsutil_path", &self.obsutil_path)
    }

    /// Signed URL lifetime, falling back to the default.
    pub fn download_expiry(&self) -> u64 {
        u64::try_from(self.download_expiry)
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_DOWNLOAD_EXPIRY_SECS)
    }
}

/// Job settings for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub pool_id: String,
    pub pool_name: String,
    pub flavor_id: String,
    /// Name of the job output the results are written to.
    pub output_key: String,
    pub output_dir: String,
    pub working_dir: String,
    pub code_dir: String,
    pub input_dir: String,
    pub log_dir: String,
    /// Object-storage folder holding the base checkpoint.
    #[serde(rename = "ckpt_file")]
    pub model_dir: String,
    pub image_url: String,
}

impl ModelConfig {
    fn validate(&self, model: &str) -> Result<()> {
        let fields = [
            ("pool_id", &self.pool_id),
            ("pool_name", &self.pool_name),
            ("flavor_id", &self.flavor_id),
            ("output_key", &self.output_key),
            ("output_dir", &self.output_dir),
            ("code_dir", &self.code_dir),
            ("input_dir", &self.input_dir),
            ("log_dir", &self.log_dir),
            ("ckpt_file", &self.model_dir),
            ("image_url", &self.image_url),
        ];
        fields
            .iter()
            .try_for_each(|(name, value)| require(&format!("finetune.{model}.{name}"), value))
    }
}

/// Job settings keyed by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinetuneConfig {
    pub models: BTreeMap<String, ModelConfig>,
}

impl FinetuneConfig {
    /// Settings for `model`, if it is supported.
    pub fn model(&self, model: &str) -> Option<&ModelConfig> {
        self.models.get(model)
    }

    /// # Errors
    ///
    /// Returns `Error::ConfigError` when no model is configured or a model
    /// config is incomplete.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(Error::config_error("finetune: at least one model is required"));
        }
        self.models
            .iter()
            .try_for_each(|(model, config)| config.validate(model))
    }
}

/// Where job snapshots are reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base URL of the service that stores finetune results.
    pub endpoint: Url,

    /// Timeout for report requests.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
}

impl ReportConfig {
    /// Create a config for `endpoint` with the default timeout.
    pub const fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: default_timeout(),
        }
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config_error(format!("{name} is required")));
    }
    Ok(())
}

/// Default lifetime of signed download URLs.
pub const DEFAULT_DOWNLOAD_EXPIRY_SECS: u64 = 3600;

const fn default_download_expiry() -> i64 {
    3600
}

fn default_obsutil_path() -> String {
    if let Ok(path) = which::which("obsutil") {
        return path.to_string_lossy().to_string();
    }
    "obsutil".to_string()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelConfig {
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

    #[test]
    fn test_download_expiry_default() {
        let mut upload = UploadConfig {
            upload_work_dir: PathBuf::from("/tmp/upload"),
            upload_folder_shell: PathBuf::from("/opt/upload.sh"),
            download_expiry: -1,
            obsutil_path: "obsutil".to_string(),
        };
        assert_eq!(upload.download_expiry(), 3600);
        upload.set_default();
        assert_eq!(upload.download_expiry, 3600);
        assert!(upload.validate().is_ok());
    }

    #[test]
    fn test_finetune_config_requires_complete_models() {
        let mut finetune = FinetuneConfig::default();
        assert!(finetune.validate().is_err());

        finetune.models.insert("wukong".to_string(), model());
        assert!(finetune.validate().is_ok());
        assert!(finetune.model("wukong").is_some());
        assert!(finetune.model("pangu").is_none());

        let mut broken = model();
        broken.log_dir.clear();
        finetune.models.insert("pangu".to_string(), broken);
        let err = finetune.validate().err().map(|e| e.to_string());
        assert_eq!(
            err,
            Some("configuration error: finetune.pangu.log_dir is required".to_string())
        );
    }

    #[test]
    fn test_model_config_reads_ckpt_file() -> std::result::Result<(), serde_json::Error> {
        let config: ModelConfig = serde_json::from_value(serde_json::json!({
            "pool_id": "p", "pool_name": "n", "flavor_id": "f",
            "output_key": "o", "output_dir": "od/", "working_dir": "w",
            "code_dir": "c/", "input_dir": "i/", "log_dir": "l/",
            "ckpt_file": "m/", "image_url": "img"
        }))?;
        assert_eq!(config.model_dir, "m/");
        Ok(())
    }

    #[test]
    fn test_aicc_config_validation() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config: AiccConfig = serde_json::from_value(serde_json::json!({
            "domain": "d", "user": "u", "password": "", "project": "p",
            "project_id": "pid",
            "auth_endpoint": "https://iam.example.com/v3/auth/tokens",
            "endpoint": "https://modelarts.example.com"
        }))?;
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(matches!(config.validate(), Err(Error::ConfigError { .. })));
        Ok(())
    }
}
