//! Request and response bodies of the finetune API.

use serde::{Deserialize, Serialize};
use tunewatch_core::{
    Account, Error, FinetuneDesc, FinetuneName, FinetuneSpec, KeyValue, ModelName, Result,
};

/// Body of `POST /api/v1/aiccfinetune`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFinetuneRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub finetune_id: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, rename = "hyperparameter")]
    pub hyperparameters: Vec<KeyValueRequest>,
    #[serde(default)]
    pub env: Vec<KeyValueRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyValueRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl CreateFinetuneRequest {
    /// Validate every field and build the finetune spec.
    ///
    /// # Errors
    ///
    /// Returns the first validation error: missing finetune id, invalid
    /// account, name or description, or an entry with an empty key.
    pub fn into_spec(self) -> Result<FinetuneSpec> {
        if self.finetune_id.trim().is_empty() {
            return Err(Error::invalid_record("finetune_id is required"));
        }

        Ok(FinetuneSpec {
            id: self.finetune_id,
            user: Account::new(self.user)?,
            model: ModelName::parse(&self.model),
            task: self.task,
            name: FinetuneName::new(self.name)?,
            desc: FinetuneDesc::new(self.desc)?,
            hyperparameters: to_key_values(self.hyperparameters)?,
            env: to_key_values(self.env)?,
        })
    }
}

fn to_key_values(entries: Vec<KeyValueRequest>) -> Result<Vec<KeyValue>> {
    entries
        .into_iter()
        .map(|kv| KeyValue::new(kv.key, kv.value))
        .collect()
}

/// Success envelope: every 2xx body is `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}

/// A temporary download URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlResponse {
    pub url: String,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    /// Jobs currently tracked by the watch loop.
    pub tracked: usize,
    pub capacity: usize,
}
