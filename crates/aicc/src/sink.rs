//! Report sink that stores job snapshots through the finetune REST API.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use tunewatch_reconciler::{JobIndex, JobSnapshot, ReportSink};

use crate::config::ReportConfig;
use crate::error::{Error, Result};

const REPORT_PATH: &str = "api/v1/aiccfinetune";

/// PUTs each snapshot to `{endpoint}/api/v1/aiccfinetune/{user}/{model}/{finetune_id}`.
#[derive(Debug)]
pub struct HttpReportSink {
    base_url: String,
    http_client: Client,
    closed: AtomicBool,
}

impl HttpReportSink {
    /// Create a sink for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: &ReportConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.endpoint.as_str().trim_end_matches('/').to_string(),
            http_client,
            closed: AtomicBool::new(false),
        })
    }

    fn report_url(&self, index: &JobIndex) -> String {
        format!(
            "{}/{REPORT_PATH}/{}/{}/{}",
            self.base_url, index.user, index.model, index.finetune_id
        )
    }

    async fn put(&self, index: &JobIndex, snapshot: &JobSnapshot) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::SinkClosed);
        }

        let response = self
            .http_client
            .put(self.report_url(index))
            .json(snapshot)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status("report", status));
        }

        debug!(
            finetune_id = %index.finetune_id,
            status = %snapshot.status,
            "Reported snapshot"
        );
        Ok(())
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn report(
        &self,
        index: &JobIndex,
        snapshot: &JobSnapshot,
    ) -> tunewatch_reconciler::Result<()> {
        self.put(index, snapshot)
            .await
            .map_err(|e| tunewatch_reconciler::Error::report_failed(e.to_string()))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Report sink closed");
        }
    }
}
