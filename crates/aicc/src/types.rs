//! Wire types of the training-job service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of a job creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobCreateOption {
    pub kind: String,
    pub metadata: MetadataOption,
    pub algorithm: AlgorithmOption,
    pub spec: SpecOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataOption {
    pub name: String,
    #[serde(rename = "description")]
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmOption {
    pub working_dir: String,
    pub code_dir: String,
    pub command: String,
    pub engine: EngineOption,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterOption>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, String>,
    pub inputs: Vec<InputOutputOption>,
    pub outputs: Vec<InputOutputOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineOption {
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterOption {
    pub name: String,
    pub value: String,
}

/// A named job input or output backed by an object-storage folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputOutputOption {
    pub name: String,
    pub remote: RemoteOption,
}

impl InputOutputOption {
    pub fn obs(name: impl Into<String>, obs_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: RemoteOption {
                obs: ObsOption {
                    obs_url: obs_url.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOption {
    pub obs: ObsOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObsOption {
    pub obs_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecOption {
    pub resource: ResourceOption,
    pub log_export_path: LogExportPathOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOption {
    pub flavor_id: String,
    pub pool_id: String,
    pub pool_name: String,
    pub node_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogExportPathOption {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub obs_url: String,
}

/// A job as returned by the job service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub metadata: JobMetadata,
    #[serde(default)]
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub phase: String,
    /// Run time in milliseconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub start_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogResp {
    #[serde(default)]
    pub obs_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminateBody {
    pub action_type: String,
}

impl TerminateBody {
    pub fn terminate() -> Self {
        Self {
            action_type: "terminate".to_string(),
        }
    }
}
