//! Optional operations a plugin build may or may not support.

use serde::Deserialize;

/// Capability flags discovered from a plugin.
///
/// Produced once per plugin by [`crate::facade::ElasticAgentExtension::get_capabilities`]
/// and treated as read-only afterwards; caching (and invalidation) is the
/// caller's responsibility. Any flag absent from a plugin's response
/// decodes to `false` rather than an error, so plugins written against
/// older schema revisions simply advertise fewer features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Plugin can render a plugin-level status report view.
    pub supports_plugin_status_report: bool,
    /// Plugin can render a per-agent status report view.
    pub supports_agent_status_report: bool,
    /// Plugin understands cluster profiles.
    pub supports_cluster_profiles: bool,
}

impl Capabilities {
    /// Capabilities of a plugin that advertises nothing.
    pub fn none() -> Self {
        Self::default()
    }
}
