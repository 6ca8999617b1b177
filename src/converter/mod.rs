//! Per-version payload converters.
//!
//! One pure codec per protocol revision: a converter translates domain
//! values into the wire body for an operation, and a raw response body
//! back into a domain result. Converters do no I/O — identical domain
//! input yields identical wire output — and are selected solely by the
//! resolved [`ProtocolVersion`] through the explicit dispatch tables
//! below. Adding a revision means adding one variant here and extending
//! [`ProtocolVersion::SUPPORTED`]; the façade's operation signatures
//! never change.

mod v1;
mod v2;
mod v3;
mod v4;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::capabilities::Capabilities;
use crate::types::{
    AgentMetadata, ElasticProfileConfiguration, Image, JobIdentifier, ProfileField,
    ValidationError, ValidationResult,
};
use crate::version::ProtocolVersion;

/// Decode-side failure detail.
///
/// The façade wraps this with plugin, operation, and version context
/// before surfacing it as a `MalformedResponse`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CodecError(String);

impl CodecError {
    fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Payload codec for one protocol revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    V1,
    V2,
    V3,
    V4,
}

impl Converter {
    /// Select the codec for a resolved protocol version.
    pub fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V1 => Self::V1,
            ProtocolVersion::V2 => Self::V2,
            ProtocolVersion::V3 => Self::V3,
            ProtocolVersion::V4 => Self::V4,
        }
    }

    /// The revision this codec speaks.
    pub fn version(self) -> ProtocolVersion {
        match self {
            Self::V1 => ProtocolVersion::V1,
            Self::V2 => ProtocolVersion::V2,
            Self::V3 => ProtocolVersion::V3,
            Self::V4 => ProtocolVersion::V4,
        }
    }

    // ---- operations the revision defines ----

    /// Capability discovery arrived in 3.0; earlier plugins advertise
    /// nothing.
    pub fn defines_capability_discovery(self) -> bool {
        matches!(self, Self::V3 | Self::V4)
    }

    /// Plugin-level status reports arrived in 3.0.
    pub fn defines_plugin_status_report(self) -> bool {
        matches!(self, Self::V3 | Self::V4)
    }

    /// Per-agent status reports arrived in 4.0.
    pub fn defines_agent_status_report(self) -> bool {
        matches!(self, Self::V4)
    }

    /// Job completion notification arrived in 4.0.
    pub fn defines_job_completion(self) -> bool {
        matches!(self, Self::V4)
    }

    // ---- encode ----

    /// Request body for agent creation. Every revision carries the job
    /// reference so the plugin can tag the provisioned agent.
    pub fn create_agent_body(
        self,
        auto_register_key: &str,
        environment: Option<&str>,
        configuration: &ElasticProfileConfiguration,
        job: &JobIdentifier,
    ) -> String {
        match self {
            Self::V1 => v1::create_agent_body(auto_register_key, configuration, job),
            Self::V2 => v2::create_agent_body(auto_register_key, environment, configuration, job),
            Self::V3 | Self::V4 => {
                v3::create_agent_body(auto_register_key, environment, configuration, job)
            }
        }
    }

    /// Request body for the work-assignment decision.
    pub fn should_assign_work_body(
        self,
        agent: &AgentMetadata,
        environment: Option<&str>,
        configuration: &ElasticProfileConfiguration,
        job: &JobIdentifier,
    ) -> String {
        match self {
            Self::V1 => v1::should_assign_work_body(agent, configuration, job),
            Self::V2 => v2::should_assign_work_body(agent, environment, configuration, job),
            Self::V3 | Self::V4 => {
                v3::should_assign_work_body(agent, environment, configuration, job)
            }
        }
    }

    /// Request body for elastic profile validation.
    pub fn validate_profile_body(self, configuration: &ElasticProfileConfiguration) -> String {
        match self {
            // 4.0 namespaced the request; earlier revisions send the bare object
            Self::V1 | Self::V2 | Self::V3 => json!(configuration).to_string(),
            Self::V4 => v4::validate_profile_body(configuration),
        }
    }

    /// Request body for a per-agent status report. Only 4.0 defines the
    /// operation; the façade gates before encoding.
    pub fn agent_status_report_body(self, job: &JobIdentifier, elastic_agent_id: &str) -> String {
        v4::agent_status_report_body(job, elastic_agent_id)
    }

    /// Request body for the job completion notification. Only 4.0 defines
    /// the operation; the façade gates before encoding.
    pub fn job_completion_body(self, elastic_agent_id: &str, job: &JobIdentifier) -> String {
        v4::job_completion_body(elastic_agent_id, job)
    }

    // ---- decode ----

    /// Decode the work-assignment decision.
    pub fn should_assign_work_from_response(self, body: Option<&str>) -> Result<bool, CodecError> {
        match self {
            Self::V1 | Self::V2 | Self::V3 => v1::should_assign_work_from_response(body),
            Self::V4 => v4::should_assign_work_from_response(body),
        }
    }

    /// Decode discovered capabilities. Revisions without capability
    /// discovery (and absent responses) decode to the all-false default.
    pub fn capabilities_from_response(self, body: Option<&str>) -> Result<Capabilities, CodecError> {
        match self {
            Self::V1 | Self::V2 => Ok(Capabilities::none()),
            Self::V3 => v3::capabilities_from_response(body),
            Self::V4 => v4::capabilities_from_response(body),
        }
    }

    /// Decode the plugin icon. The shape is shared by every revision.
    pub fn image_from_response(self, body: Option<&str>) -> Result<Image, CodecError> {
        let image: Image = serde_json::from_str(require_body(body)?)?;
        if image.content_type.trim().is_empty() {
            return Err(CodecError::new("icon response is missing a content type"));
        }
        Ok(image)
    }

    /// Decode the elastic profile field schema.
    pub fn profile_metadata_from_response(
        self,
        body: Option<&str>,
    ) -> Result<Vec<ProfileField>, CodecError> {
        let fields: Vec<WireProfileField> = serde_json::from_str(require_body(body)?)?;

        fields
            .into_iter()
            .map(|field| {
                if field.key.trim().is_empty() {
                    return Err(CodecError::new("profile metadata entry has a blank key"));
                }
                Ok(ProfileField {
                    key: field.key,
                    required: field.metadata.required,
                    secure: field.metadata.secure,
                })
            })
            .collect()
    }

    /// Decode the profile editor template.
    pub fn profile_view_from_response(self, body: Option<&str>) -> Result<String, CodecError> {
        let map = object_from(require_body(body)?)?;
        string_field(&map, "template")
    }

    /// Decode a profile validation result. An empty error sequence is a
    /// fully valid success, not an error.
    pub fn validation_result_from_response(
        self,
        body: Option<&str>,
    ) -> Result<ValidationResult, CodecError> {
        let errors: Vec<ValidationError> = serde_json::from_str(require_body(body)?)?;
        Ok(ValidationResult::new(errors))
    }

    /// Decode a rendered status report view.
    pub fn status_report_from_response(self, body: Option<&str>) -> Result<String, CodecError> {
        let map = object_from(require_body(body)?)?;
        string_field(&map, "view")
    }
}

/// Wire shape of one profile schema entry.
#[derive(Debug, Deserialize)]
struct WireProfileField {
    key: String,
    #[serde(default)]
    metadata: WireProfileFieldMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireProfileFieldMetadata {
    required: bool,
    secure: bool,
}

fn require_body(body: Option<&str>) -> Result<&str, CodecError> {
    optional_body(body).ok_or_else(|| CodecError::new("plugin returned no response body"))
}

fn optional_body(body: Option<&str>) -> Option<&str> {
    body.filter(|raw| !raw.trim().is_empty())
}

fn object_from(raw: &str) -> Result<Map<String, Value>, CodecError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(CodecError::new(format!("expected a JSON object, got {}", json_kind(&other)))),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<String, CodecError> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => {
            Err(CodecError::new(format!("'{key}' must be a string, got {}", json_kind(other))))
        }
        None => Err(CodecError::new(format!("response is missing the '{key}' key"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
