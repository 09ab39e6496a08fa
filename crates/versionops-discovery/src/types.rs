//! Per-plugin results and cycle outcome

use std::time::Duration;

use versionops_api::{ApplicationRecord, DiscoveryMethod, InventorySnapshot};

use crate::error::DiscoveryError;

/// Outcome of one plugin in one cycle
#[derive(Debug, Clone)]
pub struct DiscoveryPluginResult {
    pub plugin_id: String,
    pub method: DiscoveryMethod,
    /// Records in the order the plugin produced them
    pub records: Vec<ApplicationRecord>,
    pub succeeded: bool,
    pub error: Option<DiscoveryError>,
    pub duration: Duration,
}

impl DiscoveryPluginResult {
    pub fn succeeded(
        plugin_id: impl Into<String>,
        method: DiscoveryMethod,
        records: Vec<ApplicationRecord>,
        duration: Duration,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            method,
            records,
            succeeded: true,
            error: None,
            duration,
        }
    }

    pub fn failed(
        plugin_id: impl Into<String>,
        method: DiscoveryMethod,
        error: DiscoveryError,
        duration: Duration,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            method,
            records: Vec::new(),
            succeeded: false,
            error: Some(error),
            duration,
        }
    }
}

/// Merged snapshot plus every plugin result of the cycle, for diagnostics
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub snapshot: InventorySnapshot,
    pub results: Vec<DiscoveryPluginResult>,
}

impl DiscoveryOutcome {
    /// Results of plugins that failed
    pub fn failures(&self) -> impl Iterator<Item = &DiscoveryPluginResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// `(plugin_id, error)` pairs of failed plugins
    #[must_use]
    pub fn errors(&self) -> Vec<(String, DiscoveryError)> {
        self.failures()
            .filter_map(|r| r.error.clone().map(|e| (r.plugin_id.clone(), e)))
            .collect()
    }
}
