//! Fixed-order plugin registry

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use versionops_api::{ApplicationConfig, DiscoveryMethod};
use versionops_exec::CommandExecutor;

use crate::plugin::DiscoveryPlugin;
use crate::plugins::{
    BinaryProbe, BinaryProber, CustomPlugin, PackageManagerScanner, ServiceManagerExtractor,
    default_probes,
};

/// Settings for the built-in plugins (`[discovery]` config table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Timeout for each external command, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// Probe list replacing the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binaries: Option<Vec<BinaryProbe>>,

    /// Locally declared custom plugins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<ApplicationConfig>,
}

fn default_command_timeout() -> u64 {
    30
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            command_timeout: default_command_timeout(),
            binaries: None,
            custom: Vec::new(),
        }
    }
}

impl DiscoverySettings {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }

    /// Configured probes, or the built-in list
    #[must_use]
    pub fn probes(&self) -> Vec<BinaryProbe> {
        self.binaries.clone().unwrap_or_else(default_probes)
    }
}

/// Plugins in registration order.
///
/// Registration order is the tie-break between plugins of equal merge priority,
/// so it must be stable across cycles.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn DiscoveryPlugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in plugins followed by the configured custom ones
    #[must_use]
    pub fn standard(settings: &DiscoverySettings, executor: Arc<dyn CommandExecutor>) -> Self {
        let timeout = settings.command_timeout();
        let mut registry = Self::new();

        registry.register(Arc::new(PackageManagerScanner::new(executor.clone(), timeout)));
        registry.register(Arc::new(ServiceManagerExtractor::new(executor.clone(), timeout)));
        registry.register(Arc::new(BinaryProber::new(
            executor.clone(),
            settings.probes(),
            timeout,
        )));
        registry.add_custom(&settings.custom, executor, timeout);

        registry
    }

    /// Append a plugin; it ranks after every plugin registered before it
    pub fn register(&mut self, plugin: Arc<dyn DiscoveryPlugin>) {
        debug!(plugin = plugin.id(), method = %plugin.method(), "registered plugin");
        self.plugins.push(plugin);
    }

    /// Register custom plugin definitions. Invalid definitions are logged and
    /// skipped. Returns the number registered.
    pub fn add_custom(
        &mut self,
        configs: &[ApplicationConfig],
        executor: Arc<dyn CommandExecutor>,
        command_timeout: Duration,
    ) -> usize {
        let mut added = 0;
        for config in configs {
            match CustomPlugin::new(config.clone(), executor.clone(), command_timeout) {
                Ok(plugin) => {
                    self.register(Arc::new(plugin));
                    added += 1;
                }
                Err(e) => error!(app = %config.name, error = %e, "invalid custom plugin definition"),
            }
        }
        added
    }

    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn DiscoveryPlugin>] {
        &self.plugins
    }

    /// Plugins whose method is in `enabled`, in registration order
    pub fn enabled<'a>(
        &'a self,
        enabled: &'a std::collections::BTreeSet<DiscoveryMethod>,
    ) -> impl Iterator<Item = &'a Arc<dyn DiscoveryPlugin>> + 'a {
        self.plugins
            .iter()
            .filter(move |plugin| enabled.contains(&plugin.method()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.id()))
            .finish()
    }
}
