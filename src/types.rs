//! Domain types crossing the plugin protocol boundary.
//!
//! Everything here is a request/response value with no persistence of its
//! own: created per call, consumed by exactly one converter round trip,
//! and discarded.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a loaded plugin instance.
///
/// Stable for the plugin's lifetime and used as the dispatch key for
/// every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Create a plugin id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PluginId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// User-supplied elastic profile configuration.
///
/// Ordered so that encoded request bodies are deterministic for a given
/// input; opaque to this layer beyond validation.
pub type ElasticProfileConfiguration = BTreeMap<String, String>;

/// Snapshot of an already-provisioned agent, passed into work-assignment
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetadata {
    /// Identifier the plugin assigned to the agent.
    #[serde(rename = "agent_id")]
    pub elastic_agent_id: String,
    /// Agent lifecycle state (idle, building, lost contact, ...).
    pub agent_state: String,
    /// Build state reported by the agent.
    pub build_state: String,
    /// Hash of the configuration the agent was provisioned with.
    pub config_hash: String,
}

/// Fully-qualified reference to one job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdentifier {
    pub pipeline_name: String,
    pub pipeline_counter: u64,
    pub stage_name: String,
    pub stage_counter: u64,
    pub job_name: String,
}

impl JobIdentifier {
    /// Flat `pipeline/counter/stage/counter/job` rendering, used by older
    /// protocol revisions and for log correlation.
    pub fn locator(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.pipeline_name,
            self.pipeline_counter,
            self.stage_name,
            self.stage_counter,
            self.job_name
        )
    }
}

impl fmt::Display for JobIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator())
    }
}

/// Plugin icon: a content type plus base64-encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub content_type: String,
    pub data: String,
}

impl Image {
    /// Render as a `data:` URI suitable for embedding.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.data)
    }
}

/// One field of the elastic profile schema a plugin exposes for its
/// profile editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileField {
    pub key: String,
    pub required: bool,
    pub secure: bool,
}

/// A single validation failure reported by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationError {
    #[serde(default)]
    pub key: String,
    pub message: String,
}

/// Ordered sequence of validation failures; empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Wrap a list of failures.
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// True when the plugin reported no failures.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The reported failures, in plugin order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}
