//! Tolerant version matching over unstructured command output

use std::sync::LazyLock;

use regex::Regex;
use versionops_exec::CommandResult;

use crate::error::DiscoveryError;

/// Default pattern for custom definitions: a three-part version
pub const DEFAULT_VERSION_REGEX: &str = r"(\d+\.\d+\.\d+)";

/// Pattern for probes and service metadata: the first dotted number
pub const DOTTED_VERSION_REGEX: &str = r"(\d+(?:\.\d+)+)";

static DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DOTTED_VERSION_REGEX).expect("static regex"));

/// Compiled version pattern.
///
/// The first capture group is the version; a pattern without groups yields the
/// whole match. No match is not an error.
#[derive(Debug, Clone)]
pub struct VersionPattern {
    regex: Regex,
}

impl VersionPattern {
    /// Compile a user-supplied pattern
    ///
    /// # Errors
    /// Returns `DiscoveryError::InvalidPattern` if the regex does not compile
    pub fn new(pattern: &str) -> Result<Self, DiscoveryError> {
        let regex = Regex::new(pattern)
            .map_err(|e| DiscoveryError::InvalidPattern(format!("{pattern}: {e}")))?;
        Ok(Self { regex })
    }

    /// Pattern matching the first dotted number, e.g. `1.18.0` or `15.3`
    #[must_use]
    pub fn dotted() -> Self {
        Self {
            regex: DOTTED.clone(),
        }
    }

    /// Extract a version from text
    #[must_use]
    pub fn find(&self, text: &str) -> Option<String> {
        let captures = self.regex.captures(text)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Extract a version from a command's stdout, falling back to stderr
    #[must_use]
    pub fn find_in_output(&self, result: &CommandResult) -> Option<String> {
        self.find(&result.stdout).or_else(|| self.find(&result.stderr))
    }
}
