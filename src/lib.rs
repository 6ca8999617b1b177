//! # Armada
//!
//! Version-tolerant protocol layer for elastic agent provisioning
//! plugins.
//!
//! An orchestrating server talks to externally loaded plugins that
//! provision build agents on demand. The host never links against plugin
//! code: it speaks a declared wire protocol over an injected
//! [`MessageChannel`], and keeps working as plugins evolve their
//! supported protocol revision independently of the host's release
//! cycle.
//!
//! ## Architecture
//!
//! - [`ElasticAgentExtension`] is the single stable API surface callers
//!   use, independent of protocol version.
//! - [`VersionResolver`] negotiates the greatest mutually supported
//!   [`ProtocolVersion`] per plugin.
//! - [`Converter`] is one pure payload codec per protocol revision,
//!   selected through an explicit dispatch table.
//! - [`Capabilities`] describes the optional operations a plugin build
//!   supports; flags absent from older plugins decode to `false`.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use armada::{ElasticAgentExtension, MessageChannel, PluginId, PluginRegistry};
//!
//! # fn transport() -> Arc<dyn MessageChannel> { unimplemented!() }
//! # fn registry() -> Arc<dyn PluginRegistry> { unimplemented!() }
//! let extension = ElasticAgentExtension::new(transport(), registry());
//! let capabilities = extension.get_capabilities(&PluginId::from("docker.swarm"))?;
//! # Ok::<(), armada::ExtensionError>(())
//! ```

#![forbid(unsafe_code)]

pub mod capabilities;
pub mod channel;
pub mod converter;
pub mod error;
pub mod facade;
pub mod types;
pub mod version;

pub use capabilities::Capabilities;
pub use channel::{
    ChannelError, ChannelResponse, MessageChannel, PluginRegistry, StaticPluginRegistry,
};
pub use converter::{CodecError, Converter};
pub use error::{ExtensionError, ExtensionResult};
pub use facade::ElasticAgentExtension;
pub use types::{
    AgentMetadata, ElasticProfileConfiguration, Image, JobIdentifier, PluginId, ProfileField,
    ValidationError, ValidationResult,
};
pub use version::{negotiate, ProtocolVersion, VersionResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
