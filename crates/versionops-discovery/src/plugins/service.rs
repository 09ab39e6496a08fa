//! systemd service metadata extractor

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, instrument};
use versionops_api::{ApplicationRecord, Confidence, DiscoveryMethod};
use versionops_exec::{CommandExecutor, quote_all};

use crate::error::DiscoveryError;
use crate::plugin::DiscoveryPlugin;
use crate::version::VersionPattern;

const LIST_UNITS: &str =
    "systemctl list-units --type=service --state=running --no-legend --plain --no-pager";

// Version-looking path segment: /postgresql/14/bin, /opt/app-1.2.3/
static PATH_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[/-]v?(\d+(?:\.\d+)*)(?:/|$)").expect("static regex")
});

// Leading version in a template instance: postgresql@14-main
static INSTANCE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+(?:\.\d+)*)").expect("static regex"));

/// Properties of one unit from `systemctl show`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct UnitInfo {
    id: String,
    description: String,
    exec_start: String,
    fragment_path: String,
}

impl UnitInfo {
    /// Application name and template instance, `postgresql@14-main.service` →
    /// (`postgresql`, `Some("14-main")`)
    fn name_and_instance(&self) -> (&str, Option<&str>) {
        let base = self.id.strip_suffix(".service").unwrap_or(&self.id);
        match base.split_once('@') {
            Some((name, instance)) => (name, Some(instance).filter(|i| !i.is_empty())),
            None => (base, None),
        }
    }

    /// Executable path from `ExecStart={ path=/usr/sbin/nginx ; argv[]=... }`
    fn exec_path(&self) -> Option<&str> {
        let start = self.exec_start.find("path=")? + "path=".len();
        let rest = &self.exec_start[start..];
        let end = rest.find([' ', ';']).unwrap_or(rest.len());
        Some(&rest[..end]).filter(|p| !p.is_empty())
    }

    /// Infer a version from description, executable path, then instance name
    fn version(&self, dotted: &VersionPattern) -> Option<String> {
        if let Some(version) = dotted.find(&self.description) {
            return Some(version);
        }
        if let Some(version) = self
            .exec_path()
            .and_then(|path| PATH_VERSION.captures(path))
            .and_then(|c| c.get(1))
        {
            return Some(version.as_str().to_string());
        }
        let (_, instance) = self.name_and_instance();
        instance
            .and_then(|i| INSTANCE_VERSION.captures(i))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn parse_unit_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|unit| unit.ends_with(".service"))
        .map(ToString::to_string)
        .collect()
}

// Blocks of Key=Value lines separated by blank lines
fn parse_show_output(output: &str) -> Vec<UnitInfo> {
    let mut units = Vec::new();
    let mut current = UnitInfo::default();

    for line in output.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !current.id.is_empty() {
                units.push(std::mem::take(&mut current));
            }
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "Id" => current.id = value.to_string(),
            "Description" => current.description = value.to_string(),
            "ExecStart" => current.exec_start = value.to_string(),
            "FragmentPath" => current.fragment_path = value.to_string(),
            _ => {}
        }
    }

    units
}

/// Infers versions of running services from their unit metadata
pub struct ServiceManagerExtractor {
    executor: Arc<dyn CommandExecutor>,
    command_timeout: Duration,
}

impl ServiceManagerExtractor {
    pub fn new(executor: Arc<dyn CommandExecutor>, command_timeout: Duration) -> Self {
        Self {
            executor,
            command_timeout,
        }
    }

    async fn run(&self, cmd: &str) -> Result<String, DiscoveryError> {
        let result = self
            .executor
            .run_with_timeout(cmd, self.command_timeout)
            .await?;
        if !result.success() {
            return Err(DiscoveryError::CommandFailed {
                status: result.status,
                message: result.stderr,
            });
        }
        Ok(result.stdout)
    }
}

#[async_trait]
impl DiscoveryPlugin for ServiceManagerExtractor {
    fn id(&self) -> &str {
        "service-manager"
    }

    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::ServiceManager
    }

    #[instrument(skip(self), fields(plugin = "service-manager"))]
    async fn discover(&self) -> Result<Vec<ApplicationRecord>, DiscoveryError> {
        if self.executor.which("systemctl").await.is_none() {
            return Err(DiscoveryError::Unavailable("systemctl not found".into()));
        }

        let units = parse_unit_list(&self.run(LIST_UNITS).await?);
        if units.is_empty() {
            debug!("no running service units");
            return Ok(Vec::new());
        }

        let show = format!(
            "systemctl show --no-pager --property=Id,Description,ExecStart,FragmentPath {}",
            quote_all(&units)
        );
        let infos = parse_show_output(&self.run(&show).await?);

        let dotted = VersionPattern::dotted();
        let mut records = Vec::new();

        for unit in &infos {
            let Some(version) = unit.version(&dotted) else {
                debug!(unit = %unit.id, "no version in unit metadata");
                continue;
            };
            let (name, _) = unit.name_and_instance();
            let mut record = ApplicationRecord::new(name, version, DiscoveryMethod::ServiceManager)
                .with_confidence(Confidence::Low);
            if !unit.fragment_path.is_empty() {
                record = record.with_evidence(&unit.fragment_path);
            }
            records.push(record);
        }

        info!(units = infos.len(), count = records.len(), "extracted service versions");

        Ok(records)
    }
}
