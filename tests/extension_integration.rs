//! Integration tests for the elastic agent extension façade.
//!
//! Every test drives the public façade through a scripted in-memory
//! message channel that records each dispatch, so zero-dispatch
//! guarantees (capability gates, advisory no-ops) are asserted against
//! the actual call log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use armada::{
    AgentMetadata, Capabilities, ChannelError, ChannelResponse, ElasticAgentExtension,
    ElasticProfileConfiguration, ExtensionError, JobIdentifier, MessageChannel, PluginId,
    ProtocolVersion, StaticPluginRegistry,
};

/// Records every dispatch and answers from a per-operation script.
struct RecordingChannel {
    responses: Mutex<HashMap<String, Result<ChannelResponse, ChannelError>>>,
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl RecordingChannel {
    fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()) }
    }

    fn respond(self, operation: &str, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(operation.to_string(), Ok(ChannelResponse::with_body(body)));
        self
    }

    fn respond_empty(self, operation: &str) -> Self {
        self.responses.lock().unwrap().insert(operation.to_string(), Ok(ChannelResponse::empty()));
        self
    }

    fn fail(self, operation: &str, err: ChannelError) -> Self {
        self.responses.lock().unwrap().insert(operation.to_string(), Err(err));
        self
    }

    fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl MessageChannel for RecordingChannel {
    fn send(
        &self,
        plugin_id: &PluginId,
        operation: &str,
        body: Option<&str>,
    ) -> Result<ChannelResponse, ChannelError> {
        self.calls.lock().unwrap().push((
            plugin_id.to_string(),
            operation.to_string(),
            body.map(ToString::to_string),
        ));
        self.responses
            .lock()
            .unwrap()
            .get(operation)
            .cloned()
            .unwrap_or_else(|| Ok(ChannelResponse::empty()))
    }
}

fn extension_for(
    channel: Arc<RecordingChannel>,
    plugin: &str,
    versions: &[&str],
) -> ElasticAgentExtension {
    let mut registry = StaticPluginRegistry::new();
    registry.insert(plugin, versions.iter().copied());
    ElasticAgentExtension::new(channel, Arc::new(registry))
}

fn docker() -> PluginId {
    PluginId::from("cd.docker.swarm")
}

fn job() -> JobIdentifier {
    JobIdentifier {
        pipeline_name: "up42".to_string(),
        pipeline_counter: 98,
        stage_name: "up42_stage".to_string(),
        stage_counter: 1,
        job_name: "up42_job".to_string(),
    }
}

fn agent() -> AgentMetadata {
    AgentMetadata {
        elastic_agent_id: "ea-42".to_string(),
        agent_state: "Idle".to_string(),
        build_state: "Idle".to_string(),
        config_hash: "c0ffee".to_string(),
    }
}

fn profile() -> ElasticProfileConfiguration {
    let mut configuration = ElasticProfileConfiguration::new();
    configuration.insert("Image".to_string(), "alpine:latest".to_string());
    configuration.insert("MaxMemory".to_string(), "1G".to_string());
    configuration
}

#[test]
fn resolves_highest_common_version_for_dispatch() {
    // Advertising {2.0, 3.0} against a host speaking 1.0..4.0 must land on
    // 3.0, observable through the structured job_identifier request shape.
    let channel =
        Arc::new(RecordingChannel::new().respond("elastic-agent.should-assign-work", "true"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["2.0", "3.0"]);

    let assign = extension
        .should_assign_work(&docker(), &agent(), Some("staging"), &profile(), &job())
        .unwrap();

    assert!(assign);
    let calls = channel.calls();
    assert_eq!(calls.len(), 1);
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["job_identifier"]["pipeline_name"], "up42");
    assert!(body.get("job_locator").is_none());
}

#[test]
fn legacy_plugin_gets_legacy_request_shape() {
    let channel =
        Arc::new(RecordingChannel::new().respond("elastic-agent.should-assign-work", "false"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["1.0"]);

    let assign = extension
        .should_assign_work(&docker(), &agent(), Some("staging"), &profile(), &job())
        .unwrap();

    assert!(!assign);
    let calls = channel.calls();
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["job_locator"], "up42/98/up42_stage/1/up42_job");
    // 1.0 predates environments
    assert!(body.get("environment").is_none());
}

#[test]
fn no_compatible_version_fails_without_dispatch() {
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["9.9", "10.0"]);

    let err = extension.server_ping(&docker()).unwrap_err();

    assert!(matches!(err, ExtensionError::NoCompatibleVersion { .. }));
    assert_eq!(channel.call_count(), 0);
}

#[test]
fn malformed_assignment_response_fails_closed() {
    // Scenario: the plugin answers the boolean question with garbage. The
    // typed call reports MalformedResponse; the fail-closed helper maps it
    // to "do not assign".
    let channel = Arc::new(
        RecordingChannel::new().respond("elastic-agent.should-assign-work", r#"{"sure":"why not"}"#),
    );
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let err = extension
        .should_assign_work(&docker(), &agent(), None, &profile(), &job())
        .unwrap_err();
    assert!(matches!(err, ExtensionError::MalformedResponse { .. }));

    let decision =
        extension.should_assign_work_or_deny(&docker(), &agent(), None, &profile(), &job());
    assert!(!decision);
}

#[test]
fn v4_assignment_uses_the_assign_document() {
    let channel = Arc::new(
        RecordingChannel::new().respond("elastic-agent.should-assign-work", r#"{"assign": true}"#),
    );
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0", "4.0"]);

    let assign =
        extension.should_assign_work(&docker(), &agent(), None, &profile(), &job()).unwrap();

    assert!(assign);
}

#[test]
fn validate_profile_decodes_errors_in_plugin_order() {
    let channel = Arc::new(RecordingChannel::new().respond(
        "elastic-agent.validate-profile",
        r#"[
            {"key": "Image", "message": "Image must not be blank"},
            {"key": "MaxMemory", "message": "Invalid size"}
        ]"#,
    ));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let result = extension.validate_profile(&docker(), &profile()).unwrap();

    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 2);
    assert_eq!(result.errors()[0].key, "Image");
    assert_eq!(result.errors()[1].message, "Invalid size");

    // 4.0 namespaces the request body
    let calls = channel.calls();
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["elastic-profile-configuration"]["Image"], "alpine:latest");
}

#[test]
fn empty_validation_result_is_valid() {
    let channel =
        Arc::new(RecordingChannel::new().respond("elastic-agent.validate-profile", "[]"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["2.0"]);

    let result = extension.validate_profile(&docker(), &profile()).unwrap();

    assert!(result.is_valid());
    // pre-4.0 revisions send the bare configuration object
    let calls = channel.calls();
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["Image"], "alpine:latest");
}

#[test]
fn create_agent_is_fire_and_forget_and_tags_the_job() {
    let channel = Arc::new(RecordingChannel::new().respond_empty("elastic-agent.create-agent"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0"]);

    extension
        .create_agent(&docker(), "auto-register-key", Some("staging"), &profile(), &job())
        .unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "elastic-agent.create-agent");
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["auto_register_key"], "auto-register-key");
    assert_eq!(body["job_identifier"]["job_name"], "up42_job");
}

#[test]
fn server_ping_is_idempotent_and_propagates_failures() {
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0"]);

    extension.server_ping(&docker()).unwrap();
    extension.server_ping(&docker()).unwrap();
    assert_eq!(channel.call_count(), 2);

    let dead = Arc::new(RecordingChannel::new().fail(
        "elastic-agent.server-ping",
        ChannelError::Unreachable("connection reset".to_string()),
    ));
    let extension = extension_for(Arc::clone(&dead), "cd.docker.swarm", &["3.0"]);

    let err = extension.server_ping(&docker()).unwrap_err();
    match err {
        ExtensionError::PluginUnreachable { operation, reason, .. } => {
            assert_eq!(operation, "elastic-agent.server-ping");
            assert_eq!(reason, "connection reset");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn capabilities_decode_is_stable_across_calls() {
    let channel = Arc::new(RecordingChannel::new().respond(
        "elastic-agent.get-capabilities",
        r#"{"supports_plugin_status_report": true, "supports_agent_status_report": true}"#,
    ));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let first = extension.get_capabilities(&docker()).unwrap();
    let second = extension.get_capabilities(&docker()).unwrap();

    assert_eq!(first, second);
    assert!(first.supports_plugin_status_report);
    assert!(first.supports_agent_status_report);
    // absent from the response, defaults to false
    assert!(!first.supports_cluster_profiles);
}

#[test]
fn v3_capabilities_map_the_single_status_flag() {
    let channel = Arc::new(RecordingChannel::new().respond(
        "elastic-agent.get-capabilities",
        r#"{"supports_status_report": true}"#,
    ));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0"]);

    let caps = extension.get_capabilities(&docker()).unwrap();

    assert!(caps.supports_plugin_status_report);
    assert!(!caps.supports_agent_status_report);
}

#[test]
fn pre_v3_capability_discovery_never_touches_the_wire() {
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["1.0", "2.0"]);

    let caps = extension.get_capabilities(&docker()).unwrap();

    assert_eq!(caps, Capabilities::default());
    assert_eq!(channel.call_count(), 0);
}

#[test]
fn job_completion_is_advisory_on_older_revisions() {
    // Scenario: a 3.0 plugin never hears about job completion; the call
    // succeeds with zero dispatches.
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0"]);

    extension.notify_job_completion(&docker(), "ea-42", &job()).unwrap();

    assert_eq!(channel.call_count(), 0);
}

#[test]
fn job_completion_dispatches_on_v4() {
    let channel = Arc::new(RecordingChannel::new().respond_empty("elastic-agent.job-completion"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    extension.notify_job_completion(&docker(), "ea-42", &job()).unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 1);
    let body: serde_json::Value = serde_json::from_str(calls[0].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["elastic_agent_id"], "ea-42");
    assert_eq!(body["job_identifier"]["pipeline_counter"], 98);
}

#[test]
fn status_report_gate_trips_before_dispatch() {
    // Scenario: capabilities say unsupported; the façade refuses without
    // invoking the channel.
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let err = extension.get_plugin_status_report(&docker(), &Capabilities::none()).unwrap_err();

    assert!(matches!(err, ExtensionError::UnsupportedOperation { .. }));
    assert_eq!(channel.call_count(), 0);
}

#[test]
fn status_report_gate_also_checks_the_revision() {
    // A capability flag cached from some other source cannot force a
    // dispatch onto a revision that never defined the operation.
    let channel = Arc::new(RecordingChannel::new());
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["2.0"]);

    let capabilities = Capabilities {
        supports_plugin_status_report: true,
        supports_agent_status_report: true,
        supports_cluster_profiles: false,
    };

    let err = extension.get_plugin_status_report(&docker(), &capabilities).unwrap_err();
    assert!(matches!(err, ExtensionError::UnsupportedOperation { .. }));

    let err =
        extension.get_agent_status_report(&docker(), &job(), "ea-42", &capabilities).unwrap_err();
    assert!(matches!(err, ExtensionError::UnsupportedOperation { .. }));

    assert_eq!(channel.call_count(), 0);
}

#[test]
fn status_reports_render_views() {
    let channel = Arc::new(
        RecordingChannel::new()
            .respond("elastic-agent.status-report", r#"{"view": "<div>cluster</div>"}"#)
            .respond("elastic-agent.agent-status-report", r#"{"view": "<div>agent</div>"}"#),
    );
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let capabilities = Capabilities {
        supports_plugin_status_report: true,
        supports_agent_status_report: true,
        supports_cluster_profiles: false,
    };

    let plugin_view = extension.get_plugin_status_report(&docker(), &capabilities).unwrap();
    assert_eq!(plugin_view, "<div>cluster</div>");

    let agent_view =
        extension.get_agent_status_report(&docker(), &job(), "ea-42", &capabilities).unwrap();
    assert_eq!(agent_view, "<div>agent</div>");

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    let body: serde_json::Value = serde_json::from_str(calls[1].2.as_deref().unwrap()).unwrap();
    assert_eq!(body["elastic_agent_id"], "ea-42");
}

#[test]
fn icon_round_trip_and_missing_content_type() {
    let channel = Arc::new(RecordingChannel::new().respond(
        "elastic-agent.get-icon",
        r#"{"content_type": "image/svg+xml", "data": "PHN2Zz48L3N2Zz4="}"#,
    ));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["3.0"]);

    let icon = extension.get_icon(&docker()).unwrap();
    assert_eq!(icon.content_type, "image/svg+xml");
    assert_eq!(icon.data_uri(), "data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=");

    let bad = Arc::new(
        RecordingChannel::new().respond("elastic-agent.get-icon", r#"{"data": "PHN2Zz4="}"#),
    );
    let extension = extension_for(Arc::clone(&bad), "cd.docker.swarm", &["3.0"]);

    let err = extension.get_icon(&docker()).unwrap_err();
    assert!(matches!(err, ExtensionError::MalformedResponse { .. }));
}

#[test]
fn profile_metadata_and_view_round_trip() {
    let channel = Arc::new(
        RecordingChannel::new()
            .respond(
                "elastic-agent.get-profile-metadata",
                r#"[{"key": "Image", "metadata": {"required": true, "secure": false}}]"#,
            )
            .respond("elastic-agent.get-profile-view", r#"{"template": "<form></form>"}"#),
    );
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["4.0"]);

    let fields = extension.get_profile_metadata(&docker()).unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].key, "Image");
    assert!(fields[0].required);

    let view = extension.get_profile_view(&docker()).unwrap();
    assert_eq!(view, "<form></form>");
}

#[test]
fn malformed_response_reports_resolved_version() {
    let channel =
        Arc::new(RecordingChannel::new().respond("elastic-agent.get-profile-view", "not json"));
    let extension = extension_for(Arc::clone(&channel), "cd.docker.swarm", &["2.0", "3.0"]);

    let err = extension.get_profile_view(&docker()).unwrap_err();

    match err {
        ExtensionError::MalformedResponse { version, operation, .. } => {
            assert_eq!(version, ProtocolVersion::V3);
            assert_eq!(operation, "elastic-agent.get-profile-view");
        }
        other => panic!("unexpected error: {other}"),
    }
}
