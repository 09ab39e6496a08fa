//! Discovery plugin contract

use async_trait::async_trait;
use versionops_api::{ApplicationRecord, DiscoveryMethod};

use crate::error::DiscoveryError;

/// A source of `(name, version, evidence)` facts.
///
/// Implementations return errors instead of aborting; the engine additionally
/// contains panics and enforces a per-plugin timeout.
#[async_trait]
pub trait DiscoveryPlugin: Send + Sync {
    /// Stable identifier, unique within a registry
    fn id(&self) -> &str;

    /// Variant of this plugin, which also sets its merge priority
    fn method(&self) -> DiscoveryMethod;

    /// Discover installed applications
    async fn discover(&self) -> Result<Vec<ApplicationRecord>, DiscoveryError>;
}
