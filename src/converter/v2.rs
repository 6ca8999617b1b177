//! Wire shapes for protocol 2.0.
//!
//! 2.0 added the agent environment to provisioning and assignment
//! requests; everything else kept the 1.0 shapes.

use serde_json::json;

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
        "job_locator": job.locator(),
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
        "job_locator": job.locator(),
    })
    .to_string()
}
