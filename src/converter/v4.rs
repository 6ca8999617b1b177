//! Wire shapes for protocol 4.0.
//!
//! 4.0 namespaced the profile validation request, moved the
//! work-assignment answer into an `{"assign": <bool>}` document, grew the
//! capability record to its full shape, and added the per-agent status
//! report and job completion operations.

use serde_json::{json, Value};

use super::CodecError;
use crate::capabilities::Capabilities;
use crate::types::{ElasticProfileConfiguration, JobIdentifier};

pub(super) fn validate_profile_body(configuration: &ElasticProfileConfiguration) -> String {
    json!({ "elastic-profile-configuration": configuration }).to_string()
}

pub(super) fn agent_status_report_body(job: &JobIdentifier, elastic_agent_id: &str) -> String {
    json!({
        "elastic_agent_id": elastic_agent_id,
        "job_identifier": job,
    })
    .to_string()
}

pub(super) fn job_completion_body(elastic_agent_id: &str, job: &JobIdentifier) -> String {
    json!({
        "elastic_agent_id": elastic_agent_id,
        "job_identifier": job,
    })
    .to_string()
}

pub(super) fn should_assign_work_from_response(body: Option<&str>) -> Result<bool, CodecError> {
    let map = super::object_from(super::require_body(body)?)?;
    match map.get("assign") {
        Some(Value::Bool(assign)) => Ok(*assign),
        Some(other) => Err(CodecError::new(format!(
            "'assign' must be a boolean, got {}",
            super::json_kind(other)
        ))),
        None => Err(CodecError::new("response is missing the 'assign' key")),
    }
}

pub(super) fn capabilities_from_response(body: Option<&str>) -> Result<Capabilities, CodecError> {
    match super::optional_body(body) {
        Some(raw) => Ok(serde_json::from_str(raw)?),
        None => Ok(Capabilities::none()),
    }
}
