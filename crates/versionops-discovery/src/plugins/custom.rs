//! Custom plugins built from `ApplicationConfig` definitions

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use versionops_api::{ApplicationConfig, ApplicationRecord, Confidence, DiscoveryMethod};
use versionops_exec::{CommandExecutor, quote};

use crate::error::DiscoveryError;
use crate::plugin::DiscoveryPlugin;
use crate::version::{DEFAULT_VERSION_REGEX, VersionPattern};

const DEFAULT_VERSION_COMMAND: &str = "--version";

/// Discovery driven by an external definition: candidate paths, a version
/// command and a version regex.
pub struct CustomPlugin {
    id: String,
    config: ApplicationConfig,
    pattern: VersionPattern,
    executor: Arc<dyn CommandExecutor>,
    command_timeout: Duration,
}

impl std::fmt::Debug for CustomPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPlugin")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CustomPlugin {
    /// Build a plugin from a definition
    ///
    /// # Errors
    /// Returns `DiscoveryError::InvalidPattern` if the definition's regex is invalid
    pub fn new(
        config: ApplicationConfig,
        executor: Arc<dyn CommandExecutor>,
        command_timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let pattern =
            VersionPattern::new(config.version_regex.as_deref().unwrap_or(DEFAULT_VERSION_REGEX))?;
        Ok(Self {
            id: format!("custom:{}", config.name),
            config,
            pattern,
            executor,
            command_timeout,
        })
    }

    /// Shell command revealing the version of the executable at `path`.
    ///
    /// - `{path}` placeholder or a pipe: run as a shell command
    /// - leading `-`: passed as a single argument to `path`
    /// - otherwise: the words after the first are passed to `path`
    fn version_command(&self, path: &str) -> String {
        let command = self
            .config
            .version_command
            .as_deref()
            .unwrap_or(DEFAULT_VERSION_COMMAND)
            .trim();

        if command.contains("{path}") || command.contains('|') {
            return command.replace("{path}", &quote(path));
        }
        if command.starts_with('-') {
            return format!("{} {}", quote(path), quote(command));
        }

        let args: Vec<&str> = command.split_whitespace().skip(1).collect();
        if args.is_empty() {
            format!("{} {}", quote(path), DEFAULT_VERSION_COMMAND)
        } else {
            let quoted: Vec<String> = args.iter().map(|a| quote(a)).collect();
            format!("{} {}", quote(path), quoted.join(" "))
        }
    }

    async fn version_at(&self, path: &str) -> Option<String> {
        let cmd = self.version_command(path);
        match self.executor.run_with_timeout(&cmd, self.command_timeout).await {
            Ok(result) if result.success() => self.pattern.find_in_output(&result),
            Ok(result) => {
                debug!(path, status = result.status, "version command exited non-zero");
                None
            }
            Err(e) => {
                debug!(path, error = %e, "version command failed");
                None
            }
        }
    }
}

#[async_trait]
impl DiscoveryPlugin for CustomPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Custom
    }

    #[instrument(skip(self), fields(plugin = %self.id))]
    async fn discover(&self) -> Result<Vec<ApplicationRecord>, DiscoveryError> {
        let mut records = Vec::new();

        for path in &self.config.default_paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                continue;
            }
            if let Some(version) = self.version_at(path).await {
                info!(app = self.config.label(), %version, path = %path, "found application");
                records.push(
                    ApplicationRecord::new(&self.config.name, version, DiscoveryMethod::Custom)
                        .with_evidence(path)
                        .with_confidence(Confidence::Medium),
                );
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::ScriptedExecutor;
    use versionops_exec::CommandResult;

    fn plugin(config: ApplicationConfig, executor: ScriptedExecutor) -> CustomPlugin {
        CustomPlugin::new(config, Arc::new(executor), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_version_command_forms() {
        let flag = plugin(
            ApplicationConfig::new("app").with_version_command("-V"),
            ScriptedExecutor::new(),
        );
        assert_eq!(flag.version_command("/opt/app/bin/app"), "/opt/app/bin/app -V");

        let words = plugin(
            ApplicationConfig::new("app").with_version_command("app version --short"),
            ScriptedExecutor::new(),
        );
        assert_eq!(words.version_command("/usr/bin/app"), "/usr/bin/app version --short");

        let shell = plugin(
            ApplicationConfig::new("app").with_version_command("{path} info | grep Version"),
            ScriptedExecutor::new(),
        );
        assert_eq!(
            shell.version_command("/srv/my app"),
            "'/srv/my app' info | grep Version"
        );

        let default = plugin(ApplicationConfig::new("app"), ScriptedExecutor::new());
        assert_eq!(default.version_command("/usr/bin/app"), "/usr/bin/app --version");
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let result = CustomPlugin::new(
            ApplicationConfig::new("app").with_version_regex("(["),
            Arc::new(ScriptedExecutor::new()),
            Duration::from_secs(5),
        );

        assert!(matches!(result, Err(DiscoveryError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_discover_existing_paths_only() {
        let dir = std::env::temp_dir();
        let existing = dir.to_string_lossy().to_string();
        let config = ApplicationConfig::new("tool")
            .with_path("/definitely/not/here/tool")
            .with_path(&existing)
            .with_version_command("--version");
        let executor = ScriptedExecutor::new().respond(
            &quote(&existing),
            CommandResult::ok("tool 3.2.1 (build 77)"),
        );
        let plugin = plugin(config, executor);

        let records = plugin.discover().await.unwrap();

        assert_eq!(plugin.id(), "custom:tool");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "3.2.1");
        assert_eq!(records[0].discovery_method, DiscoveryMethod::Custom);
        assert_eq!(records[0].confidence, Confidence::Medium);
    }
}
