//! Discovery cycle orchestration

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use versionops_api::{DiscoveryMethod, InventorySnapshot};

use crate::error::DiscoveryError;
use crate::merge::merge;
use crate::plugin::DiscoveryPlugin;
use crate::registry::PluginRegistry;
use crate::types::{DiscoveryOutcome, DiscoveryPluginResult};

const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Runs enabled plugins and merges their facts into a snapshot.
///
/// Plugins run concurrently on a pool of `max_concurrency` permits, each under
/// its own timeout. A plugin that errors, panics, times out or is cancelled
/// yields a failed [`DiscoveryPluginResult`]; the cycle itself never fails.
pub struct DiscoveryEngine {
    registry: PluginRegistry,
    host_id: String,
    plugin_timeout: Duration,
    max_concurrency: usize,
}

impl DiscoveryEngine {
    pub fn new(registry: PluginRegistry, host_id: impl Into<String>) -> Self {
        Self {
            registry,
            host_id: host_id.into(),
            plugin_timeout: DEFAULT_PLUGIN_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_plugin_timeout(mut self, timeout: Duration) -> Self {
        self.plugin_timeout = timeout;
        self
    }

    /// Pool size; values below one are raised to one
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    #[must_use]
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    /// Run one discovery cycle over the plugins whose method is enabled.
    ///
    /// Returns once every plugin has completed, failed, timed out or been
    /// abandoned on cancellation.
    #[instrument(skip_all, fields(host = %self.host_id))]
    pub async fn run_cycle(
        &self,
        enabled: &BTreeSet<DiscoveryMethod>,
        cancel: &CancellationToken,
    ) -> DiscoveryOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let tasks = self.registry.enabled(enabled).map(|plugin| {
            run_plugin(
                plugin.clone(),
                semaphore.clone(),
                self.plugin_timeout,
                cancel.clone(),
            )
        });

        // join_all keeps registration order, which the merge tie-break relies on
        let mut results = join_all(tasks).await;

        for result in &mut results {
            for record in &mut result.records {
                record.discovery_method = result.method;
            }
        }

        let snapshot = InventorySnapshot::new(&self.host_id, Utc::now(), merge(&results));
        let outcome = DiscoveryOutcome { snapshot, results };

        info!(
            plugins = outcome.results.len(),
            failed = outcome.failure_count(),
            records = outcome.snapshot.len(),
            "discovery cycle finished"
        );

        outcome
    }
}

async fn run_plugin(
    plugin: Arc<dyn DiscoveryPlugin>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    cancel: CancellationToken,
) -> DiscoveryPluginResult {
    let id = plugin.id().to_string();
    let method = plugin.method();

    let _permit = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            return DiscoveryPluginResult::failed(id, method, DiscoveryError::Cancelled, Duration::ZERO);
        }
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                return DiscoveryPluginResult::failed(id, method, DiscoveryError::Cancelled, Duration::ZERO);
            }
        },
    };

    let start = Instant::now();
    let task_plugin = plugin.clone();
    let mut handle = tokio::spawn(async move { task_plugin.discover().await });

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            handle.abort();
            Err(DiscoveryError::Cancelled)
        }
        joined = tokio::time::timeout(timeout, &mut handle) => match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(join_failure(e)),
            Err(_) => {
                handle.abort();
                Err(DiscoveryError::Timeout(timeout))
            }
        },
    };

    let duration = start.elapsed();
    match outcome {
        Ok(records) => {
            info!(plugin = %id, count = records.len(), ?duration, "plugin succeeded");
            DiscoveryPluginResult::succeeded(id, method, records, duration)
        }
        Err(error) => {
            warn!(plugin = %id, %error, ?duration, "plugin failed");
            DiscoveryPluginResult::failed(id, method, error, duration)
        }
    }
}

fn join_failure(err: JoinError) -> DiscoveryError {
    if !err.is_panic() {
        return DiscoveryError::Cancelled;
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    DiscoveryError::Panicked(message)
}
