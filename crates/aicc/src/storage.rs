//! Object storage access through the `obsutil` CLI.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{ObsConfig, UploadConfig};
use crate::error::{Error, Result};

const OBS_SCHEME: &str = "obs://";

/// Locates logs, packages job output and signs download URLs.
#[derive(Debug, Clone)]
pub struct ObsHelper {
    obs: ObsConfig,
    upload: UploadConfig,
}

impl ObsHelper {
    /// Create a helper. Call [`ObsHelper::init`] once before first use.
    pub const fn new(obs: ObsConfig, upload: UploadConfig) -> Self {
        Self { obs, upload }
    }

    /// Store the credentials in the CLI's config and create the upload
    /// work directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the CLI cannot be configured or the work
    /// directory cannot be created.
    pub async fn init(&self) -> Result<()> {
        run(
            &self.upload.obsutil_path,
            &[
                "config".to_string(),
                format!("-i={}", self.obs.access_key),
                format!("-k={}", self.obs.secret_key),
                format!("-e={}", self.obs.endpoint),
            ],
        )
        .await
        .map_err(|e| Error::execution_failed(format!("obsutil config failed: {e}")))?;

        tokio::fs::create_dir_all(&self.upload.upload_work_dir).await?;

        info!(
            bucket = %self.obs.bucket,
            work_dir = %self.upload.upload_work_dir.display(),
            "Object storage helper ready"
        );
        Ok(())
    }

    /// Key of the first object under `log_dir`, or an empty string when
    /// the folder holds nothing but itself.
    pub async fn locate_log(&self, log_dir: &str) -> Result<String> {
        let prefix = if log_dir.ends_with('/') {
            log_dir.to_string()
        } else {
            format!("{log_dir}/")
        };

        let listing = run(
            &self.upload.obsutil_path,
            &["ls".to_string(), self.object_url(&prefix), "-s".to_string()],
        )
        .await?;

        let key = first_key(&listing, &self.object_url(""), &prefix).unwrap_or_default();
        debug!(log_dir = %prefix, key = %key, "Located log");
        Ok(key)
    }

    /// Zip everything under `output_dir` and upload the archive, returning
    /// its key. An empty `output_dir` packages nothing and returns an empty
    /// key.
    pub async fn package_output(&self, output_dir: &str) -> Result<String> {
        if output_dir.is_empty() {
            return Ok(String::new());
        }

        let scratch = tempfile::Builder::new()
            .prefix("upload")
            .tempdir_in(&self.upload.upload_work_dir)?;

        let args = [
            path_arg(scratch.path()),
            self.upload.obsutil_path.clone(),
            self.obs.bucket.clone(),
            output_dir.to_string(),
        ];
        let script = path_arg(&self.upload.upload_folder_shell);

        let stdout = run(&script, &args).await.map_err(|e| {
            Error::execution_failed(format!("run upload folder shell, err={e}, params={args:?}"))
        })?;

        let key = stdout.strip_suffix('\n').unwrap_or(&stdout).to_string();
        info!(output_dir = %output_dir, archive = %key, "Packaged job output");
        Ok(key)
    }

    /// Signed GET URL for `key`, valid for the configured download expiry.
    pub async fn sign(&self, key: &str) -> Result<String> {
        let output = run(
            &self.upload.obsutil_path,
            &[
                "sign".to_string(),
                self.object_url(key),
                format!("-e={}", self.upload.download_expiry()),
            ],
        )
        .await?;

        output
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http://") || line.starts_with("https://"))
            .map(ToString::to_string)
            .ok_or_else(|| Error::invalid_response(format!("no signed url for {key}")))
    }

    fn object_url(&self, key: &str) -> String {
        format!("{OBS_SCHEME}{}/{key}", self.obs.bucket)
    }
}

/// First listed key below `prefix` that is not `prefix` itself.
fn first_key(listing: &str, bucket_url: &str, prefix: &str) -> Option<String> {
    listing
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(bucket_url))
        .find(|key| key.starts_with(prefix) && *key != prefix)
        .map(ToString::to_string)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Run a program and return its stdout.
async fn run(program: &str, args: &[String]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::execution_failed(format!("Failed to spawn {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::execution_failed(format!(
            "{program} exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
