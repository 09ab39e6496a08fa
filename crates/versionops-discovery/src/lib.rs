//! versionops-discovery: Plugin-based software discovery
//!
//! Runs the enabled discovery plugins concurrently, isolates their failures and
//! merges their facts into a single deterministic [`InventorySnapshot`].
//!
//! [`InventorySnapshot`]: versionops_api::InventorySnapshot

pub mod engine;
pub mod error;
pub mod merge;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod types;
pub mod version;

pub use engine::DiscoveryEngine;
pub use error::DiscoveryError;
pub use plugin::DiscoveryPlugin;
pub use plugins::{
    BinaryProbe, BinaryProber, CustomPlugin, PackageManagerScanner, ServiceManagerExtractor,
};
pub use registry::{DiscoverySettings, PluginRegistry};
pub use types::{DiscoveryOutcome, DiscoveryPluginResult};
pub use version::VersionPattern;
