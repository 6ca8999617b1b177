//! Extension protocol error types.

use thiserror::Error;

use crate::version::ProtocolVersion;

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;

/// Errors that can occur while talking to an elastic agent plugin.
///
/// This layer never retries and never swallows a failure; every variant
/// carries the plugin, operation, and (where known) protocol version so
/// callers can act on the context without re-deriving it.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// Version negotiation failed: the plugin and the host share no
    /// protocol revision.
    #[error("no compatible protocol version for plugin '{plugin_id}' (plugin advertises [{advertised}], host supports [{supported}])")]
    NoCompatibleVersion { plugin_id: String, advertised: String, supported: String },

    /// The plugin process or its connection is gone.
    #[error("plugin '{plugin_id}' is unreachable during '{operation}': {reason}")]
    PluginUnreachable { plugin_id: String, operation: String, reason: String },

    /// The plugin handled the request and explicitly reported an error.
    #[error("plugin '{plugin_id}' failed while handling '{operation}': {message}")]
    PluginExecutionFailed { plugin_id: String, operation: String, message: String },

    /// The plugin responded, but the body does not match the shape the
    /// resolved protocol version defines.
    #[error("malformed '{operation}' response from plugin '{plugin_id}' (protocol {version}): {detail}")]
    MalformedResponse {
        plugin_id: String,
        operation: String,
        version: ProtocolVersion,
        detail: String,
    },

    /// The operation is not defined for the resolved protocol version or
    /// the plugin does not advertise the capability.
    #[error("plugin '{plugin_id}' does not support '{operation}' (protocol {version})")]
    UnsupportedOperation { plugin_id: String, operation: String, version: ProtocolVersion },
}
