//! Agent configuration
//!
//! Read from a TOML file; every key except `backend_url` and `token` has a
//! default. Lookup order: explicit path, `VERSIONOPS_CONFIG`, the system path,
//! then the user config directory.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use url::Url;
use versionops_api::DiscoveryMethod;
use versionops_client::RetryPolicy;
use versionops_discovery::DiscoverySettings;

use crate::error::CoreError;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "VERSIONOPS_CONFIG";
/// System-wide config file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/versionops-agent/config.toml";
/// Default location of the persisted agent state
pub const DEFAULT_STATE_PATH: &str = "/var/lib/versionops-agent/state.json";
/// Default log file; an empty `log_file` disables file logging
pub const DEFAULT_LOG_FILE: &str = "/var/log/versionops-agent.log";

/// Backend credential. Never shown by `Debug` or `Display`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw secret, for the `Authorization` header only
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(***)")
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("<not set>")
        } else {
            f.write_str("***configured***")
        }
    }
}

/// Log verbosity as written in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "DEBUG", alias = "debug")]
    Debug,
    #[default]
    #[serde(rename = "INFO", alias = "info")]
    Info,
    #[serde(rename = "WARNING", alias = "warning", alias = "WARN", alias = "warn")]
    Warning,
    #[serde(rename = "ERROR", alias = "error")]
    Error,
}

impl LogLevel {
    /// `tracing` filter directive
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{other}' (expected DEBUG, INFO, WARNING or ERROR)"
            )),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// `[retry]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Total requests per report, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

/// Complete agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Backend base URL, e.g. `https://versionops.example.com`
    #[serde(default)]
    pub backend_url: String,

    #[serde(default, alias = "service_token", skip_serializing_if = "Token::is_empty")]
    pub token: Token,

    /// Host identifier sent with every snapshot
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Seconds between cycles in daemon mode
    #[serde(default = "default_interval", alias = "collection_interval")]
    pub interval: u64,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log lines are appended here as well as written to stderr
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_enabled_plugins")]
    pub enabled_plugins: BTreeSet<DiscoveryMethod>,

    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Fetch custom plugin definitions from the backend at startup
    #[serde(default)]
    pub remote_plugins: bool,

    /// Announce the host to the backend at startup
    #[serde(default = "default_register_host")]
    pub register_host: bool,

    /// Per-plugin time budget in seconds
    #[serde(default = "default_plugin_timeout")]
    pub plugin_timeout: u64,

    #[serde(default = "default_max_concurrent_plugins")]
    pub max_concurrent_plugins: usize,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,
}

fn default_interval() -> u64 {
    300
}

fn default_enabled_plugins() -> BTreeSet<DiscoveryMethod> {
    DiscoveryMethod::all().iter().copied().collect()
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_register_host() -> bool {
    true
}

fn default_plugin_timeout() -> u64 {
    60
}

fn default_max_concurrent_plugins() -> usize {
    4
}

/// Kernel hostname, falling back to `localhost`
#[must_use]
pub fn default_hostname() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|name| name.trim().to_string())
        .chain(std::env::var("HOSTNAME").ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            token: Token::default(),
            hostname: default_hostname(),
            interval: default_interval(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            log_file: default_log_file(),
            enabled_plugins: default_enabled_plugins(),
            state_path: default_state_path(),
            remote_plugins: false,
            register_host: default_register_host(),
            plugin_timeout: default_plugin_timeout(),
            max_concurrent_plugins: default_max_concurrent_plugins(),
            retry: RetrySettings::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

impl AgentConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if the document is not valid configuration
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::ConfigError(e.to_string()))
    }

    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Config file to use: `explicit`, then `VERSIONOPS_CONFIG`, then the
    /// first existing default location, else the system path.
    #[must_use]
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        let candidates = [
            Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            dirs::config_dir().map(|p| p.join("versionops-agent/config.toml")),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|p| p.exists())
            .unwrap_or_else(|| PathBuf::from(SYSTEM_CONFIG_PATH))
    }

    /// Load from the located file, or defaults if it does not exist
    ///
    /// # Errors
    /// Returns error if an existing file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> Result<(Self, PathBuf), CoreError> {
        let path = Self::locate(explicit);
        if path.exists() {
            debug!(path = %path.display(), "loading configuration");
            return Ok((Self::load(&path)?, path));
        }

        warn!(path = %path.display(), "no config file found, using defaults");
        Ok((Self::default(), path))
    }

    /// Write the configuration, readable by the owner only
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let io_err = |source| CoreError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::ConfigError(e.to_string()))?;

        // Temp files are created 0600, so the token is never world-readable
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        Ok(())
    }

    /// Check the minimum needed to run a reporting loop
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` describing the first problem found
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.backend_url.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "backend_url is not set (use `config --backend <url>`)".into(),
            ));
        }
        let url = Url::parse(&self.backend_url)
            .map_err(|e| CoreError::ConfigError(format!("invalid backend_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::ConfigError(format!(
                "backend_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.token.is_empty() {
            return Err(CoreError::ConfigError(
                "token is not set (use `config --token <token>`)".into(),
            ));
        }
        if self.interval == 0 {
            return Err(CoreError::ConfigError("interval must be at least 1 second".into()));
        }
        if self.hostname.trim().is_empty() {
            return Err(CoreError::ConfigError("hostname is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::ConfigError("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, backend_url: Option<String>, token: Option<String>) {
        if let Some(url) = backend_url {
            self.backend_url = url;
        }
        if let Some(token) = token {
            self.token = Token::new(token);
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    #[must_use]
    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout)
    }

    /// Log file to append to, `None` when file logging is off
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        Some(self.log_file.as_path()).filter(|p| !p.as_os_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AgentConfig {
        AgentConfig {
            backend_url: "https://versionops.example.com".into(),
            token: Token::new("s3cr3t"),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();

        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.enabled_plugins.len(), 4);
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert!(!config.remote_plugins);
        assert!(config.register_host);
        assert_eq!(config.log_file(), Some(Path::new(DEFAULT_LOG_FILE)));
        assert!(!config.hostname.is_empty());
    }

    #[test]
    fn test_empty_log_file_disables_file_logging() {
        let config = AgentConfig::from_toml_str(
            r#"
            log_file = ""
            register_host = false
            "#,
        )
        .unwrap();

        assert_eq!(config.log_file(), None);
        assert!(!config.register_host);
    }

    #[test]
    fn test_parse_full_file() {
        let config = AgentConfig::from_toml_str(
            r#"
            backend_url = "https://versionops.example.com"
            service_token = "abc"
            hostname = "web-01"
            collection_interval = 60
            log_level = "WARNING"
            log_format = "json"
            enabled_plugins = ["package-manager", "custom"]
            remote_plugins = true

            [retry]
            max_attempts = 3

            [discovery]
            command_timeout = 10

            [[discovery.binaries]]
            name = "terraform"
            args = ["version"]

            [[discovery.custom]]
            name = "mytool"
            default_paths = ["/opt/mytool/bin/mytool"]
            version_command = "-V"
            "#,
        )
        .unwrap();

        assert_eq!(config.token.expose(), "abc");
        assert_eq!(config.interval, 60);
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.enabled_plugins,
            BTreeSet::from([DiscoveryMethod::PackageManager, DiscoveryMethod::Custom])
        );
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 2_000);
        assert_eq!(config.discovery.command_timeout, 10);
        assert_eq!(config.discovery.probes()[0].name, "terraform");
        assert_eq!(config.discovery.custom[0].name, "mytool");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_minimum() {
        let mut config = valid();
        config.backend_url = String::new();
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));

        let mut config = valid();
        config.backend_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.token = Token::new("  ");
        assert!(config.validate().is_err());

        let mut config = valid();
        config.interval = 0;
        assert!(config.validate().is_err());

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_token_is_redacted() {
        let config = valid();

        assert!(!format!("{config:?}").contains("s3cr3t"));
        assert_eq!(config.token.to_string(), "***configured***");
        assert_eq!(Token::default().to_string(), "<not set>");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut config = valid();
        config.hostname = "db-02".into();
        config.log_level = LogLevel::Debug;

        config.save(&path).unwrap();
        let loaded = AgentConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_is_owner_only_from_creation() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        valid().save(&path).unwrap();
        assert_eq!(mode(&path), 0o600);

        // A world-readable file left by an older writer is replaced, not reused
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        valid().save(&path).unwrap();
        assert_eq!(mode(&path), 0o600);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_overrides() {
        let mut config = AgentConfig::default();
        config.apply_overrides(Some("http://localhost:8000".into()), Some("tok".into()));

        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.token.expose(), "tok");
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let explicit = Path::new("/tmp/custom.toml");

        assert_eq!(AgentConfig::locate(Some(explicit)), explicit);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap().as_filter(), "debug");
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
