//! Custom discovery definitions

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Definition of a custom discovery plugin.
///
/// Served by the backend at `/api/agent/application-configs` or declared locally
/// under `[[discovery.custom]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApplicationConfig {
    /// Application name reported in records
    pub name: String,
    /// Human-readable name, used in logs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Candidate executable paths, checked in order
    #[serde(default)]
    pub default_paths: Vec<String>,
    /// Version flag, argument list or shell command with a `{path}` placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_command: Option<String>,
    /// Regex whose first capture group is the version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_regex: Option<String>,
}

impl ApplicationConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            default_paths: Vec::new(),
            version_command: None,
            version_regex: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.default_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn with_version_command(mut self, command: impl Into<String>) -> Self {
        self.version_command = Some(command.into());
        self
    }

    #[must_use]
    pub fn with_version_regex(mut self, regex: impl Into<String>) -> Self {
        self.version_regex = Some(regex.into());
        self
    }

    /// Name for log output
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
