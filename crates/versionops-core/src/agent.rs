//! Assembly of a scheduler from configuration

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{info, warn};
use url::Url;
use versionops_api::HostRegistration;
use versionops_client::{HttpClient, Reporter};
use versionops_discovery::{DiscoveryEngine, PluginRegistry};
use versionops_exec::CommandExecutor;

use crate::config::AgentConfig;
use crate::error::CoreError;
use crate::scheduler::Scheduler;
use crate::store::StateStore;

/// Build a ready-to-run scheduler from validated configuration.
///
/// With `register_host` enabled, the host is announced to the backend first;
/// a failed registration is logged and the agent starts anyway. With
/// `remote_plugins` enabled, custom definitions are fetched from the backend
/// once; a failed fetch is logged and the local definitions are used.
///
/// # Errors
/// Returns `CoreError::ConfigError` if the configuration is invalid
pub async fn build_scheduler(
    config: &AgentConfig,
    executor: Arc<dyn CommandExecutor>,
) -> Result<Scheduler, CoreError> {
    config.validate()?;

    let client = HttpClient::new(
        &config.backend_url,
        config.token.expose(),
        config.retry.request_timeout(),
    )
    .map_err(|e| CoreError::ConfigError(format!("cannot create backend client: {e}")))?;

    let host_id = if config.register_host {
        register(&client, config).await
    } else {
        None
    };

    let mut registry = PluginRegistry::standard(&config.discovery, executor.clone());

    if config.remote_plugins {
        match client.application_configs().await {
            Ok(configs) => {
                let added =
                    registry.add_custom(&configs, executor, config.discovery.command_timeout());
                info!(fetched = configs.len(), added, "registered remote plugin definitions");
            }
            Err(e) => warn!(error = %e, "cannot fetch remote plugin definitions, using local ones"),
        }
    }

    info!(
        host = %config.hostname,
        plugins = registry.len(),
        enabled = ?config.enabled_plugins,
        "discovery configured"
    );

    let engine = DiscoveryEngine::new(registry, &config.hostname)
        .with_plugin_timeout(config.plugin_timeout())
        .with_max_concurrency(config.max_concurrent_plugins);
    let reporter = Reporter::new(Arc::new(client), config.retry.policy());

    let mut scheduler = Scheduler::new(
        engine,
        reporter,
        StateStore::at_path(&config.state_path),
        config.enabled_plugins.clone(),
        config.interval(),
    );
    if let Some(host_id) = host_id {
        scheduler.record_registration(host_id);
    }
    Ok(scheduler)
}

/// Registration body for this host
#[must_use]
pub fn registration(config: &AgentConfig, ip_address: IpAddr) -> HostRegistration {
    HostRegistration {
        hostname: config.hostname.clone(),
        ip_address: ip_address.to_string(),
        os_type: std::env::consts::OS.to_string(),
        agent_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Address of the local interface that routes to `backend`.
///
/// Connecting a UDP socket picks a route without sending anything.
pub async fn outbound_ip(backend: &Url) -> Option<IpAddr> {
    let host = backend.host_str()?.trim_start_matches('[').trim_end_matches(']');
    let port = backend.port_or_known_default()?;
    let bind = if host.contains(':') { "[::]:0" } else { "0.0.0.0:0" };

    let socket = UdpSocket::bind(bind).await.ok()?;
    socket.connect((host, port)).await.ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

async fn register(client: &HttpClient, config: &AgentConfig) -> Option<String> {
    let ip = outbound_ip(client.base_url())
        .await
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    match client.register(&registration(config, ip)).await {
        Ok(response) => {
            info!(host_id = ?response.host_id, %ip, "registered with backend");
            response.host_id
        }
        Err(e) => {
            warn!(error = %e, "host registration failed, continuing without it");
            None
        }
    }
}
