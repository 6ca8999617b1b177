//! Transport boundary for plugin request/response exchange.
//!
//! The actual transport (subprocess pipe, HTTP, in-process registry) is an
//! injected dependency; this layer only defines the contract it must
//! satisfy. A channel call may block the calling thread for the duration
//! of the plugin round trip; timeouts and per-plugin serialization are the
//! channel implementation's concern.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::PluginId;
use crate::version::ProtocolVersion;

/// Raw response from a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelResponse {
    /// Response body, if the plugin produced one.
    pub body: Option<String>,
    /// Protocol version the plugin actually used to respond, when the
    /// transport reports it.
    pub handled_version: Option<ProtocolVersion>,
}

impl ChannelResponse {
    /// Response carrying a body and no version information.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self { body: Some(body.into()), handled_version: None }
    }

    /// Empty success response.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Channel-level failures.
///
/// These are the only two ways a transport may fail; the façade maps them
/// onto the extension error taxonomy, adding plugin and operation context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Plugin not found, crashed, or the transport is down.
    #[error("{0}")]
    Unreachable(String),
    /// The plugin handled the request and returned a declared error.
    #[error("{0}")]
    ExecutionFailed(String),
}

/// Request/response channel keyed by plugin id and operation name.
pub trait MessageChannel: Send + Sync {
    /// Send `body` to the plugin's handler for `operation` and wait for
    /// the response.
    fn send(
        &self,
        plugin_id: &PluginId,
        operation: &str,
        body: Option<&str>,
    ) -> Result<ChannelResponse, ChannelError>;
}

/// Source of plugin protocol metadata, queried during version
/// negotiation.
pub trait PluginRegistry: Send + Sync {
    /// Protocol versions the plugin declares it can speak, as raw strings.
    fn advertised_versions(&self, plugin_id: &PluginId) -> Result<Vec<String>, ChannelError>;
}

/// Fixed, in-memory [`PluginRegistry`].
///
/// Useful when plugin metadata is known up front (and in tests).
#[derive(Debug, Clone, Default)]
pub struct StaticPluginRegistry {
    versions: HashMap<String, Vec<String>>,
}

impl StaticPluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin with its advertised versions.
    pub fn insert(
        &mut self,
        plugin_id: impl Into<PluginId>,
        versions: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.versions.insert(
            plugin_id.into().as_str().to_string(),
            versions.into_iter().map(Into::into).collect(),
        );
    }
}

impl PluginRegistry for StaticPluginRegistry {
    fn advertised_versions(&self, plugin_id: &PluginId) -> Result<Vec<String>, ChannelError> {
        self.versions
            .get(plugin_id.as_str())
            .cloned()
            .ok_or_else(|| ChannelError::Unreachable(format!("plugin '{plugin_id}' is not loaded")))
    }
}
