//! The stable extension API over the versioned wire protocol.
//!
//! Every operation follows the same template: resolve the protocol
//! version for the target plugin, build the request body through the
//! matching converter, invoke the message channel, and decode the
//! response through the same converter. The per-operation special-casing
//! lives in two explicit closures (an encoder and a decoder, each
//! possibly a no-op) passed to one generic `perform` routine.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::capabilities::Capabilities;
use crate::channel::{ChannelError, MessageChannel, PluginRegistry};
use crate::converter::{CodecError, Converter};
use crate::error::{ExtensionError, ExtensionResult};
use crate::types::{
    AgentMetadata, ElasticProfileConfiguration, Image, JobIdentifier, PluginId, ProfileField,
    ValidationResult,
};
use crate::version::VersionResolver;

/// Wire operation names, stable across protocol revisions.
pub mod operation {
    pub const GET_ICON: &str = "elastic-agent.get-icon";
    pub const GET_CAPABILITIES: &str = "elastic-agent.get-capabilities";
    pub const GET_PROFILE_METADATA: &str = "elastic-agent.get-profile-metadata";
    pub const GET_PROFILE_VIEW: &str = "elastic-agent.get-profile-view";
    pub const VALIDATE_PROFILE: &str = "elastic-agent.validate-profile";
    pub const CREATE_AGENT: &str = "elastic-agent.create-agent";
    pub const SERVER_PING: &str = "elastic-agent.server-ping";
    pub const SHOULD_ASSIGN_WORK: &str = "elastic-agent.should-assign-work";
    pub const PLUGIN_STATUS_REPORT: &str = "elastic-agent.status-report";
    pub const AGENT_STATUS_REPORT: &str = "elastic-agent.agent-status-report";
    pub const JOB_COMPLETION: &str = "elastic-agent.job-completion";
}

use operation::{
    AGENT_STATUS_REPORT, CREATE_AGENT, GET_CAPABILITIES, GET_ICON, GET_PROFILE_METADATA,
    GET_PROFILE_VIEW, JOB_COMPLETION, PLUGIN_STATUS_REPORT, SERVER_PING, SHOULD_ASSIGN_WORK,
    VALIDATE_PROFILE,
};

/// Host-side façade over elastic agent provisioning plugins.
///
/// Callers get one stable, strongly-typed API regardless of which
/// protocol revision is actually spoken to a given plugin. Each operation
/// is a single synchronous request/response exchange; the channel may
/// block for the duration of the plugin round trip. The façade holds no
/// mutable state, so concurrent calls need no coordination here.
pub struct ElasticAgentExtension {
    channel: Arc<dyn MessageChannel>,
    registry: Arc<dyn PluginRegistry>,
    resolver: VersionResolver,
}

impl ElasticAgentExtension {
    /// Build a façade over an injected transport and plugin metadata
    /// source.
    pub fn new(channel: Arc<dyn MessageChannel>, registry: Arc<dyn PluginRegistry>) -> Self {
        Self { channel, registry, resolver: VersionResolver::new() }
    }

    /// Build a façade negotiating over a restricted version set.
    pub fn with_resolver(
        channel: Arc<dyn MessageChannel>,
        registry: Arc<dyn PluginRegistry>,
        resolver: VersionResolver,
    ) -> Self {
        Self { channel, registry, resolver }
    }

    /// Fetch the plugin's icon.
    pub fn get_icon(&self, plugin_id: &PluginId) -> ExtensionResult<Image> {
        self.perform(plugin_id, GET_ICON, |_| None, Converter::image_from_response)
    }

    /// Discover which optional operations the plugin supports.
    ///
    /// Plugins on revisions that predate capability discovery simply
    /// advertise nothing; this never hard-fails for an older plugin.
    pub fn get_capabilities(&self, plugin_id: &PluginId) -> ExtensionResult<Capabilities> {
        let converter = self.resolved_converter(plugin_id)?;
        if !converter.defines_capability_discovery() {
            debug!(
                plugin = %plugin_id,
                version = %converter.version(),
                "protocol revision predates capability discovery"
            );
            return Ok(Capabilities::none());
        }

        self.exchange(plugin_id, GET_CAPABILITIES, converter, None, |c, body| {
            c.capabilities_from_response(body)
        })
    }

    /// Fetch the field schema for building an elastic profile editor.
    pub fn get_profile_metadata(&self, plugin_id: &PluginId) -> ExtensionResult<Vec<ProfileField>> {
        self.perform(
            plugin_id,
            GET_PROFILE_METADATA,
            |_| None,
            Converter::profile_metadata_from_response,
        )
    }

    /// Fetch the render template for the elastic profile editor.
    pub fn get_profile_view(&self, plugin_id: &PluginId) -> ExtensionResult<String> {
        self.perform(plugin_id, GET_PROFILE_VIEW, |_| None, Converter::profile_view_from_response)
    }

    /// Ask the plugin to validate a user-authored elastic profile.
    ///
    /// An empty error sequence is a fully valid success.
    pub fn validate_profile(
        &self,
        plugin_id: &PluginId,
        configuration: &ElasticProfileConfiguration,
    ) -> ExtensionResult<ValidationResult> {
        self.perform(
            plugin_id,
            VALIDATE_PROFILE,
            |converter| Some(converter.validate_profile_body(configuration)),
            Converter::validation_result_from_response,
        )
    }

    /// Ask the plugin to provision a new agent for `job`.
    ///
    /// Fire-and-forget: success is the absence of a channel error.
    pub fn create_agent(
        &self,
        plugin_id: &PluginId,
        auto_register_key: &str,
        environment: Option<&str>,
        configuration: &ElasticProfileConfiguration,
        job: &JobIdentifier,
    ) -> ExtensionResult<()> {
        self.perform(
            plugin_id,
            CREATE_AGENT,
            |converter| {
                Some(converter.create_agent_body(auto_register_key, environment, configuration, job))
            },
            |_, _| Ok(()),
        )
    }

    /// Liveness heartbeat. No payload either way; channel failures
    /// propagate unmodified — this is how the host detects a dead plugin.
    pub fn server_ping(&self, plugin_id: &PluginId) -> ExtensionResult<()> {
        self.perform(plugin_id, SERVER_PING, |_| None, |_, _| Ok(()))
    }

    /// Ask the plugin whether `agent` should run `job`.
    ///
    /// The decision gates job dispatch. A decode failure surfaces as
    /// [`ExtensionError::MalformedResponse`]; use
    /// [`Self::should_assign_work_or_deny`] where the caller needs the
    /// fail-closed mapping applied for it.
    pub fn should_assign_work(
        &self,
        plugin_id: &PluginId,
        agent: &AgentMetadata,
        environment: Option<&str>,
        configuration: &ElasticProfileConfiguration,
        job: &JobIdentifier,
    ) -> ExtensionResult<bool> {
        self.perform(
            plugin_id,
            SHOULD_ASSIGN_WORK,
            |converter| {
                Some(converter.should_assign_work_body(agent, environment, configuration, job))
            },
            Converter::should_assign_work_from_response,
        )
    }

    /// Fail-closed work-assignment decision: any error resolves to "do
    /// not assign".
    pub fn should_assign_work_or_deny(
        &self,
        plugin_id: &PluginId,
        agent: &AgentMetadata,
        environment: Option<&str>,
        configuration: &ElasticProfileConfiguration,
        job: &JobIdentifier,
    ) -> bool {
        match self.should_assign_work(plugin_id, agent, environment, configuration, job) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(
                    plugin = %plugin_id,
                    job = %job,
                    error = %err,
                    "work assignment check failed, refusing to assign"
                );
                false
            }
        }
    }

    /// Fetch the plugin-level status report view.
    ///
    /// `capabilities` is the caller's cached discovery result; the façade
    /// is the last line of defense and refuses to dispatch when either
    /// the capability flag is off or the resolved revision does not
    /// define the operation.
    pub fn get_plugin_status_report(
        &self,
        plugin_id: &PluginId,
        capabilities: &Capabilities,
    ) -> ExtensionResult<String> {
        let converter = self.resolved_converter(plugin_id)?;
        if !capabilities.supports_plugin_status_report || !converter.defines_plugin_status_report()
        {
            return Err(self.unsupported(plugin_id, PLUGIN_STATUS_REPORT, converter));
        }

        self.exchange(plugin_id, PLUGIN_STATUS_REPORT, converter, None, |c, body| {
            c.status_report_from_response(body)
        })
    }

    /// Fetch the status report view for one provisioned agent.
    pub fn get_agent_status_report(
        &self,
        plugin_id: &PluginId,
        job: &JobIdentifier,
        elastic_agent_id: &str,
        capabilities: &Capabilities,
    ) -> ExtensionResult<String> {
        let converter = self.resolved_converter(plugin_id)?;
        if !capabilities.supports_agent_status_report || !converter.defines_agent_status_report() {
            return Err(self.unsupported(plugin_id, AGENT_STATUS_REPORT, converter));
        }

        let body = converter.agent_status_report_body(job, elastic_agent_id);
        self.exchange(plugin_id, AGENT_STATUS_REPORT, converter, Some(body), |c, response| {
            c.status_report_from_response(response)
        })
    }

    /// Tell the plugin the job running on `elastic_agent_id` finished.
    ///
    /// Advisory, never load-bearing: on revisions that lack the
    /// operation this is a no-op with a diagnostic note, not an error.
    pub fn notify_job_completion(
        &self,
        plugin_id: &PluginId,
        elastic_agent_id: &str,
        job: &JobIdentifier,
    ) -> ExtensionResult<()> {
        let converter = self.resolved_converter(plugin_id)?;
        if !converter.defines_job_completion() {
            debug!(
                plugin = %plugin_id,
                version = %converter.version(),
                job = %job,
                "protocol revision does not define job completion, skipping notification"
            );
            return Ok(());
        }

        let body = converter.job_completion_body(elastic_agent_id, job);
        self.exchange(plugin_id, JOB_COMPLETION, converter, Some(body), |_, _| Ok(()))
    }

    /// Resolve the protocol version for `plugin_id` and pick its codec.
    fn resolved_converter(&self, plugin_id: &PluginId) -> ExtensionResult<Converter> {
        let version = self.resolver.resolve(self.registry.as_ref(), plugin_id)?;
        Ok(Converter::for_version(version))
    }

    /// Resolve, encode, dispatch, decode — the shared operation template.
    fn perform<T>(
        &self,
        plugin_id: &PluginId,
        operation: &str,
        encode: impl FnOnce(Converter) -> Option<String>,
        decode: impl FnOnce(Converter, Option<&str>) -> Result<T, CodecError>,
    ) -> ExtensionResult<T> {
        let converter = self.resolved_converter(plugin_id)?;
        let body = encode(converter);
        self.exchange(plugin_id, operation, converter, body, decode)
    }

    /// Dispatch one request and decode its response through `converter`.
    fn exchange<T>(
        &self,
        plugin_id: &PluginId,
        operation: &str,
        converter: Converter,
        body: Option<String>,
        decode: impl FnOnce(Converter, Option<&str>) -> Result<T, CodecError>,
    ) -> ExtensionResult<T> {
        let version = converter.version();
        debug!(plugin = %plugin_id, operation, version = %version, "dispatching plugin request");

        let response = self
            .channel
            .send(plugin_id, operation, body.as_deref())
            .map_err(|err| channel_failure(plugin_id, operation, err))?;

        if let Some(handled) = response.handled_version {
            if handled != version {
                debug!(
                    plugin = %plugin_id,
                    operation,
                    resolved = %version,
                    handled = %handled,
                    "plugin responded with a different protocol version"
                );
            }
        }

        decode(converter, response.body.as_deref()).map_err(|err| {
            ExtensionError::MalformedResponse {
                plugin_id: plugin_id.to_string(),
                operation: operation.to_string(),
                version,
                detail: err.to_string(),
            }
        })
    }

    fn unsupported(
        &self,
        plugin_id: &PluginId,
        operation: &str,
        converter: Converter,
    ) -> ExtensionError {
        ExtensionError::UnsupportedOperation {
            plugin_id: plugin_id.to_string(),
            operation: operation.to_string(),
            version: converter.version(),
        }
    }
}

fn channel_failure(plugin_id: &PluginId, operation: &str, err: ChannelError) -> ExtensionError {
    match err {
        ChannelError::Unreachable(reason) => ExtensionError::PluginUnreachable {
            plugin_id: plugin_id.to_string(),
            operation: operation.to_string(),
            reason,
        },
        ChannelError::ExecutionFailed(message) => ExtensionError::PluginExecutionFailed {
            plugin_id: plugin_id.to_string(),
            operation: operation.to_string(),
            message,
        },
    }
}
