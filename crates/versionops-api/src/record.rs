//! Application records produced by discovery plugins

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Source a record was discovered from.
///
/// Doubles as the plugin variant identifier used in `enabled_plugins`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
    /// Platform package database (dpkg, rpm, pacman)
    PackageManager,
    /// Service unit metadata (systemd)
    ServiceManager,
    /// Executable probed with a version flag
    BinaryProber,
    /// Externally configured definition
    Custom,
}

/// Merge priority, highest first. The only place the tie-break order is defined.
pub const PRIORITY: [DiscoveryMethod; 4] = [
    DiscoveryMethod::PackageManager,
    DiscoveryMethod::ServiceManager,
    DiscoveryMethod::BinaryProber,
    DiscoveryMethod::Custom,
];

impl DiscoveryMethod {
    /// All known methods in priority order
    #[must_use]
    pub fn all() -> &'static [DiscoveryMethod] {
        &PRIORITY
    }

    /// Rank in [`PRIORITY`]; lower wins
    #[must_use]
    pub fn rank(self) -> usize {
        PRIORITY
            .iter()
            .position(|m| *m == self)
            .unwrap_or(PRIORITY.len())
    }

    /// Whether `self` beats `other` when both report the same application
    #[must_use]
    pub fn outranks(self, other: DiscoveryMethod) -> bool {
        self.rank() < other.rank()
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMethod::PackageManager => "package-manager",
            DiscoveryMethod::ServiceManager => "service-manager",
            DiscoveryMethod::BinaryProber => "binary-prober",
            DiscoveryMethod::Custom => "custom",
        }
    }
}

impl std::fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscoveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "package-manager" | "packages" => Ok(DiscoveryMethod::PackageManager),
            "service-manager" | "services" => Ok(DiscoveryMethod::ServiceManager),
            "binary-prober" | "binaries" => Ok(DiscoveryMethod::BinaryProber),
            "custom" => Ok(DiscoveryMethod::Custom),
            _ => Err(format!(
                "unknown plugin: {s}. Use 'package-manager', 'service-manager', 'binary-prober' or 'custom'"
            )),
        }
    }
}

/// How much a version fact can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// A single `(name, version, evidence)` fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApplicationRecord {
    /// Application name, the merge key
    pub name: String,
    /// Version string as reported by the source
    pub version: String,
    /// Source that produced this record
    pub discovery_method: DiscoveryMethod,
    /// File or database backing the fact
    #[schema(value_type = Option<String>)]
    pub evidence_source_path: Option<PathBuf>,
    pub confidence: Confidence,
}

impl ApplicationRecord {
    /// Create a new record with high confidence and no evidence path
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        discovery_method: DiscoveryMethod,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            discovery_method,
            evidence_source_path: None,
            confidence: Confidence::High,
        }
    }

    /// Set evidence path
    #[must_use]
    pub fn with_evidence(mut self, path: impl Into<PathBuf>) -> Self {
        self.evidence_source_path = Some(path.into());
        self
    }

    /// Set confidence
    #[must_use]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}
