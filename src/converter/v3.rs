//! Wire shapes for protocol 3.0.
//!
//! 3.0 replaced the flat job locator with a structured `job_identifier`
//! and introduced capability discovery, carrying a single
//! `supports_status_report` flag for the plugin-level status report.

use serde_json::{json, Value};

use super::CodecError;
use crate::capabilities::Capabilities;
use crate::types::{AgentMetadata, ElasticProfileConfiguration, JobIdentifier};

pub(super) fn create_agent_body(
    auto_register_key: &str,
    environment: Option<&str>,
    configuration: &ElasticProfileConfiguration,
    job: &JobIdentifier,
) -> String {
    json!({
        "auto_register_key": auto_register_key,
        "environment": environment,
        "properties": configuration,
        "job_identifier": job,
    })
    .to_string()
}

pub(super) fn should_assign_work_body(
    agent: &AgentMetadata,
    environment: Option<&str>,
    configuration: &ElasticProfileConfiguration,
    job: &JobIdentifier,
) -> String {
    json!({
        "agent": agent,
        "environment": environment,
        "properties": configuration,
        "job_identifier": job,
    })
    .to_string()
}

/// 3.0 predates the full capability record; the only flag it knows maps
/// onto the plugin-level status report. Absent flags (and absent bodies)
/// decode to unsupported.
pub(super) fn capabilities_from_response(body: Option<&str>) -> Result<Capabilities, CodecError> {
    let Some(raw) = super::optional_body(body) else {
        return Ok(Capabilities::none());
    };

    let map = super::object_from(raw)?;
    let supports_status_report = match map.get("supports_status_report") {
        None => false,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(CodecError::new(format!(
                "'supports_status_report' must be a boolean, got {}",
                super::json_kind(other)
            )))
        }
    };

    Ok(Capabilities { supports_plugin_status_report: supports_status_report, ..Capabilities::none() })
}
