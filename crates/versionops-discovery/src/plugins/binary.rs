//! Binary version prober

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use versionops_api::{ApplicationRecord, Confidence, DiscoveryMethod};
use versionops_exec::{CommandExecutor, quote_all};

use crate::error::DiscoveryError;
use crate::plugin::DiscoveryPlugin;
use crate::version::VersionPattern;

/// An executable to probe for its version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryProbe {
    /// Application name reported in records
    pub name: String,
    /// Candidate paths; when empty the name is resolved on `PATH`
    #[serde(default)]
    pub paths: Vec<String>,
    /// Version-revealing arguments
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Version regex; defaults to the first dotted number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

fn default_args() -> Vec<String> {
    vec!["--version".to_string()]
}

impl BinaryProbe {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
            args: args.iter().map(ToString::to_string).collect(),
            pattern: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }
}

/// Built-in probe list
#[must_use]
pub fn default_probes() -> Vec<BinaryProbe> {
    vec![
        BinaryProbe::new("nginx", &["-v"]),
        BinaryProbe::new("apache2", &["-v"]),
        BinaryProbe::new("httpd", &["-v"]),
        BinaryProbe::new("python3", &["--version"]),
        BinaryProbe::new("node", &["--version"]),
        BinaryProbe::new("docker", &["--version"]),
        BinaryProbe::new("git", &["--version"]),
        BinaryProbe::new("openssl", &["version"]),
        BinaryProbe::new("java", &["-version"]),
        BinaryProbe::new("postgres", &["--version"]),
        BinaryProbe::new("redis-server", &["--version"]),
        BinaryProbe::new("mysql", &["--version"]),
        BinaryProbe::new("go", &["version"]),
    ]
}

/// Probes a configured set of executables with version flags.
///
/// Missing binaries, failing commands and unparsable output are skipped; the
/// plugin itself only fails if the executor is unusable.
pub struct BinaryProber {
    executor: Arc<dyn CommandExecutor>,
    probes: Vec<(BinaryProbe, VersionPattern)>,
    command_timeout: Duration,
}

impl BinaryProber {
    /// Create a prober. Probes with an invalid pattern are dropped with a warning.
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        probes: Vec<BinaryProbe>,
        command_timeout: Duration,
    ) -> Self {
        let probes = probes
            .into_iter()
            .filter_map(|probe| {
                let pattern = match &probe.pattern {
                    Some(p) => match VersionPattern::new(p) {
                        Ok(pattern) => pattern,
                        Err(e) => {
                            warn!(binary = %probe.name, error = %e, "skipping probe");
                            return None;
                        }
                    },
                    None => VersionPattern::dotted(),
                };
                Some((probe, pattern))
            })
            .collect();

        Self {
            executor,
            probes,
            command_timeout,
        }
    }

    async fn resolve(&self, probe: &BinaryProbe) -> Option<String> {
        if probe.paths.is_empty() {
            return self.executor.which(&probe.name).await;
        }
        for path in &probe.paths {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Some(path.clone());
            }
        }
        None
    }

    async fn probe(&self, probe: &BinaryProbe, pattern: &VersionPattern) -> Option<ApplicationRecord> {
        let path = self.resolve(probe).await?;

        let mut words = vec![path.clone()];
        words.extend(probe.args.iter().cloned());
        let cmd = quote_all(&words);

        let result = match self.executor.run_with_timeout(&cmd, self.command_timeout).await {
            Ok(result) => result,
            Err(e) => {
                debug!(binary = %probe.name, error = %e, "probe failed");
                return None;
            }
        };

        if !result.success() {
            debug!(binary = %probe.name, status = result.status, "probe exited non-zero");
            return None;
        }

        let Some(version) = pattern.find_in_output(&result) else {
            debug!(binary = %probe.name, "no version in probe output");
            return None;
        };

        Some(
            ApplicationRecord::new(&probe.name, version, DiscoveryMethod::BinaryProber)
                .with_evidence(path)
                .with_confidence(Confidence::High),
        )
    }
}

#[async_trait]
impl DiscoveryPlugin for BinaryProber {
    fn id(&self) -> &str {
        "binary-prober"
    }

    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::BinaryProber
    }

    #[instrument(skip(self), fields(plugin = "binary-prober", probes = self.probes.len()))]
    async fn discover(&self) -> Result<Vec<ApplicationRecord>, DiscoveryError> {
        let mut records = Vec::new();

        for (probe, pattern) in &self.probes {
            if let Some(record) = self.probe(probe, pattern).await {
                records.push(record);
            }
        }

        info!(count = records.len(), "probed binaries");

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::ScriptedExecutor;
    use versionops_exec::CommandResult;

    fn stderr_only(text: &str) -> CommandResult {
        let mut result = CommandResult::ok("");
        result.stderr = text.to_string();
        result
    }

    #[tokio::test]
    async fn test_probe_found_on_path() {
        let executor = ScriptedExecutor::new()
            .respond("command -v nginx", CommandResult::ok("/usr/sbin/nginx\n"))
            .respond("/usr/sbin/nginx -v", stderr_only("nginx version: nginx/1.18.0"));
        let prober = BinaryProber::new(
            Arc::new(executor),
            vec![BinaryProbe::new("nginx", &["-v"])],
            Duration::from_secs(5),
        );

        let records = prober.discover().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "1.18.0");
        assert_eq!(records[0].discovery_method, DiscoveryMethod::BinaryProber);
    }

    #[tokio::test]
    async fn test_unparsable_and_missing_binaries_are_omitted() {
        let executor = ScriptedExecutor::new()
            .respond("command -v weird", CommandResult::ok("/usr/bin/weird\n"))
            .respond("/usr/bin/weird --version", CommandResult::ok("weird edition, no numbers"))
            .respond("command -v node", CommandResult::ok("/usr/bin/node\n"))
            .respond("/usr/bin/node --version", CommandResult::ok("v20.5.1\n"));
        let prober = BinaryProber::new(
            Arc::new(executor),
            vec![
                BinaryProbe::new("weird", &["--version"]),
                BinaryProbe::new("absent", &["--version"]),
                BinaryProbe::new("node", &["--version"]),
            ],
            Duration::from_secs(5),
        );

        let records = prober.discover().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "node");
        assert_eq!(records[0].version, "20.5.1");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_omitted() {
        let executor = ScriptedExecutor::new()
            .respond("command -v java", CommandResult::ok("/usr/bin/java\n"))
            .respond("/usr/bin/java -version", CommandResult::failed(1, "version 1.2.3"));
        let prober = BinaryProber::new(
            Arc::new(executor),
            vec![BinaryProbe::new("java", &["-version"])],
            Duration::from_secs(5),
        );

        assert!(prober.discover().await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_probe_pattern_is_dropped() {
        let mut probe = BinaryProbe::new("app", &["--version"]);
        probe.pattern = Some("(".to_string());

        let prober = BinaryProber::new(
            Arc::new(ScriptedExecutor::new()),
            vec![probe, BinaryProbe::new("git", &["--version"])],
            Duration::from_secs(5),
        );

        assert_eq!(prober.probes.len(), 1);
    }

    #[test]
    fn test_probe_deserializes_with_defaults() {
        let probe: BinaryProbe = serde_json::from_str(r#"{"name": "terraform"}"#).unwrap();

        assert_eq!(probe.args, vec!["--version"]);
        assert!(probe.paths.is_empty());
    }
}
