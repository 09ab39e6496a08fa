//! systemd service installation

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{WrapErr, bail};
use tracing::info;
use versionops_exec::{CommandExecutor, quote};

pub const SERVICE_NAME: &str = "versionops-agent";

const RELOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Unit file running the agent as a daemon with the given config
pub fn render_unit(agent: &Path, config: &Path) -> String {
    format!(
        "[Unit]
Description=VersionOps Agent
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
ExecStart={agent} run --daemon --config {config}
Restart=always
RestartSec=10
User=root

[Install]
WantedBy=multi-user.target
",
        agent = quote(&agent.to_string_lossy()),
        config = quote(&config.to_string_lossy()),
    )
}

/// Write the unit into `unit_dir` and, unless `executor` is `None`, reload
/// systemd. Returns the path of the unit file.
pub async fn install(
    unit_dir: &Path,
    agent: &Path,
    config: &Path,
    executor: Option<&dyn CommandExecutor>,
) -> eyre::Result<PathBuf> {
    let unit_path = unit_dir.join(format!("{SERVICE_NAME}.service"));

    std::fs::write(&unit_path, render_unit(agent, config))
        .wrap_err_with(|| format!("cannot write {} (run with sudo?)", unit_path.display()))?;
    info!(path = %unit_path.display(), "service file written");

    if let Some(executor) = executor {
        let result = executor
            .run_with_timeout("systemctl daemon-reload", RELOAD_TIMEOUT)
            .await
            .wrap_err("cannot run systemctl")?;
        if !result.success() {
            bail!("systemctl daemon-reload failed: {}", result.stderr.trim());
        }
        info!("systemd reloaded");
    }

    Ok(unit_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_runs_daemon_with_config() {
        let unit = render_unit(
            Path::new("/usr/local/bin/versionops-agent"),
            Path::new("/etc/versionops-agent/config.toml"),
        );

        assert!(unit.contains(
            "ExecStart=/usr/local/bin/versionops-agent run --daemon --config /etc/versionops-agent/config.toml"
        ));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("RestartSec=10"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn test_unit_quotes_paths_with_spaces() {
        let unit = render_unit(Path::new("/opt/my agent/bin"), Path::new("/etc/a.toml"));

        assert!(unit.contains("ExecStart='/opt/my agent/bin' run"));
    }

    #[tokio::test]
    async fn test_install_writes_unit_without_reload() {
        let dir = tempfile::tempdir().unwrap();

        let path = install(
            dir.path(),
            Path::new("/usr/bin/versionops-agent"),
            Path::new("/etc/versionops-agent/config.toml"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(path, dir.path().join("versionops-agent.service"));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("[Unit]"));
    }

    #[tokio::test]
    async fn test_install_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();

        let result = install(
            &dir.path().join("absent"),
            Path::new("/usr/bin/versionops-agent"),
            Path::new("/etc/a.toml"),
            None,
        )
        .await;

        assert!(result.is_err());
    }
}
