//! Application configuration.
//!
//! One file holds every section. YAML is the default format; a `.toml`
//! extension selects TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tunewatch_aicc::{AiccConfig, FinetuneConfig, ObsConfig, ReportConfig, UploadConfig};
use tunewatch_reconciler::WatchConfig;
use tunewatch_web::ServerConfig;

/// Errors raised while loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] tunewatch_aicc::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub watch: WatchConfig,
    pub finetune: FinetuneConfig,
    pub aicc: AiccConfig,
    pub upload: UploadConfig,
    pub obs: ObsConfig,
    pub report: ReportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Read, normalize and validate the config at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a required
    /// value is missing.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let mut config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        config.set_default();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error for malformed YAML or missing sections.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// # Errors
    ///
    /// Returns an error for malformed TOML or missing sections.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace unset or non-positive values with defaults.
    pub fn set_default(&mut self) {
        self.watch.set_default();
        self.upload.set_default();
    }

    /// # Errors
    ///
    /// Returns the first missing or empty required value.
    pub fn validate(&self) -> Result<()> {
        self.aicc.validate()?;
        self.obs.validate()?;
        self.upload.validate()?;
        self.finetune.validate()?;
        Ok(())
    }
}
