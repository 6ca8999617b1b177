//! Wire shapes for protocol 1.0.
//!
//! The oldest revision: requests reference the job through a flat
//! `job_locator` string, predate agent environments, and answer the
//! work-assignment question with a bare boolean literal.

use serde_json::json;

use super::CodecError;
use crate::types::{AgentMetadata, ElasticProfileConfiguration, JobIdentifier};

pub(super) fn create_agent_body(
    auto_register_key: &str,
    configuration: &ElasticProfileConfiguration,
    job: &JobIdentifier,
) -> String {
    json!({
        "auto_register_key": auto_register_key,
        "properties": configuration,
        "job_locator": job.locator(),
    })
    .to_string()
}

pub(super) fn should_assign_work_body(
    agent: &AgentMetadata,
    configuration: &ElasticProfileConfiguration,
    job: &JobIdentifier,
) -> String {
    json!({
        "agent": agent,
        "properties": configuration,
        "job_locator": job.locator(),
    })
    .to_string()
}

/// Revisions up to 3.0 answer with a bare `true`/`false` literal; anything
/// else is malformed.
pub(super) fn should_assign_work_from_response(body: Option<&str>) -> Result<bool, CodecError> {
    let raw = super::require_body(body)?;
    serde_json::from_str::<bool>(raw.trim())
        .map_err(|_| CodecError::new(format!("expected a boolean decision, got '{}'", raw.trim())))
}
