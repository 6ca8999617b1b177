//! Protocol versions and version negotiation.
//!
//! The host declares a fixed, non-empty set of protocol revisions it can
//! speak; each plugin advertises its own set. Negotiation picks the
//! greatest common revision and never silently falls back to an assumed
//! one.

use std::fmt;

use crate::channel::PluginRegistry;
use crate::error::{ExtensionError, ExtensionResult};
use crate::types::PluginId;

/// A revision of the wire contract between host and plugin.
///
/// The set is closed and known at build time; the derived `Ord` follows
/// revision order and is the total order used for negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
    V4,
}

impl ProtocolVersion {
    /// Every revision this host can speak, in ascending order.
    pub const SUPPORTED: [Self; 4] = [Self::V1, Self::V2, Self::V3, Self::V4];

    /// Wire rendering of the revision.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
            Self::V3 => "3.0",
            Self::V4 => "4.0",
        }
    }

    /// Parse an advertised version string.
    ///
    /// Unknown strings yield `None`; a plugin ahead of (or behind) this
    /// host is not an error until the whole intersection turns out empty.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1.0" => Some(Self::V1),
            "2.0" => Some(Self::V2),
            "3.0" => Some(Self::V3),
            "4.0" => Some(Self::V4),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the greatest revision present in both `supported` and
/// `advertised`.
///
/// Advertised strings the host does not recognize are skipped. An empty
/// intersection fails with [`ExtensionError::NoCompatibleVersion`]
/// carrying both sets for diagnostics.
pub fn negotiate(
    plugin_id: &PluginId,
    supported: &[ProtocolVersion],
    advertised: &[String],
) -> ExtensionResult<ProtocolVersion> {
    advertised
        .iter()
        .filter_map(|raw| ProtocolVersion::parse(raw))
        .filter(|version| supported.contains(version))
        .max()
        .ok_or_else(|| ExtensionError::NoCompatibleVersion {
            plugin_id: plugin_id.to_string(),
            advertised: advertised.join(", "),
            supported: supported
                .iter()
                .map(|version| version.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Resolves the protocol revision to speak to a given plugin.
///
/// Stateless beyond the host-declared version set; plugin metadata comes
/// from the injected [`PluginRegistry`].
#[derive(Debug, Clone)]
pub struct VersionResolver {
    supported: Vec<ProtocolVersion>,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionResolver {
    /// Resolver over the full host-declared version set.
    pub fn new() -> Self {
        Self { supported: ProtocolVersion::SUPPORTED.to_vec() }
    }

    /// Resolver restricted to a subset of revisions.
    ///
    /// # Panics
    ///
    /// Panics if `supported` is empty; the host set is non-empty by
    /// contract.
    pub fn with_supported(supported: Vec<ProtocolVersion>) -> Self {
        assert!(!supported.is_empty(), "host must support at least one protocol version");
        Self { supported }
    }

    /// The revisions this resolver negotiates over.
    pub fn supported(&self) -> &[ProtocolVersion] {
        &self.supported
    }

    /// Resolve the single revision to use for `plugin_id`.
    pub fn resolve(
        &self,
        registry: &dyn PluginRegistry,
        plugin_id: &PluginId,
    ) -> ExtensionResult<ProtocolVersion> {
        let advertised = registry.advertised_versions(plugin_id).map_err(|err| {
            ExtensionError::PluginUnreachable {
                plugin_id: plugin_id.to_string(),
                operation: "version-negotiation".to_string(),
                reason: err.to_string(),
            }
        })?;

        negotiate(plugin_id, &self.supported, &advertised)
    }
}
