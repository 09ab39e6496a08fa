//! Package database scanner (dpkg, rpm, pacman)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use versionops_api::{ApplicationRecord, Confidence, DiscoveryMethod};
use versionops_exec::CommandExecutor;

use crate::error::DiscoveryError;
use crate::plugin::DiscoveryPlugin;

/// Supported package databases, probed in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageDatabase {
    /// Debian/Ubuntu
    Dpkg,
    /// Fedora/RHEL/SUSE
    Rpm,
    /// Arch
    Pacman,
}

impl PackageDatabase {
    const ALL: [PackageDatabase; 3] = [
        PackageDatabase::Dpkg,
        PackageDatabase::Rpm,
        PackageDatabase::Pacman,
    ];

    /// Binary whose presence selects this database
    #[must_use]
    pub fn tool(self) -> &'static str {
        match self {
            PackageDatabase::Dpkg => "dpkg-query",
            PackageDatabase::Rpm => "rpm",
            PackageDatabase::Pacman => "pacman",
        }
    }

    /// Listing command, one package per line
    #[must_use]
    pub fn list_command(self) -> &'static str {
        match self {
            PackageDatabase::Dpkg => {
                r"dpkg-query -W -f='${binary:Package}\t${Version}\t${Status}\n'"
            }
            PackageDatabase::Rpm => r"rpm -qa --queryformat '%{NAME}\t%{VERSION}-%{RELEASE}\n'",
            PackageDatabase::Pacman => "pacman -Q",
        }
    }

    /// On-disk database backing the facts
    #[must_use]
    pub fn evidence_path(self) -> &'static str {
        match self {
            PackageDatabase::Dpkg => "/var/lib/dpkg/status",
            PackageDatabase::Rpm => "/var/lib/rpm",
            PackageDatabase::Pacman => "/var/lib/pacman/local",
        }
    }

    /// Parse listing output into `(name, version)` pairs
    #[must_use]
    pub fn parse(self, output: &str) -> Vec<(String, String)> {
        match self {
            PackageDatabase::Dpkg => parse_dpkg(output),
            PackageDatabase::Rpm => parse_rpm(output),
            PackageDatabase::Pacman => parse_pacman(output),
        }
    }
}

impl std::fmt::Display for PackageDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageDatabase::Dpkg => write!(f, "dpkg"),
            PackageDatabase::Rpm => write!(f, "rpm"),
            PackageDatabase::Pacman => write!(f, "pacman"),
        }
    }
}

// Format: name\tversion\tstatus
// Example: nginx\t1.18.0-6ubuntu14.4\tinstall ok installed
fn parse_dpkg(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let version = fields.next()?.trim();
            let status = fields.next().unwrap_or("install ok installed");

            // Removed packages linger as "deinstall ok config-files"
            if status.split_whitespace().last() != Some("installed") {
                return None;
            }
            if name.is_empty() || version.is_empty() {
                return None;
            }
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

// Format: name\tversion-release
fn parse_rpm(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let (name, version) = line.split_once('\t')?;
            let (name, version) = (name.trim(), version.trim());
            if name.is_empty() || version.is_empty() || name == "gpg-pubkey" {
                return None;
            }
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

// Format: name version
fn parse_pacman(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let version = parts.next()?;
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

/// Scans the platform package database, one record per installed package
pub struct PackageManagerScanner {
    executor: Arc<dyn CommandExecutor>,
    command_timeout: Duration,
}

impl PackageManagerScanner {
    pub fn new(executor: Arc<dyn CommandExecutor>, command_timeout: Duration) -> Self {
        Self {
            executor,
            command_timeout,
        }
    }

    /// First package database whose tool is installed
    async fn detect(&self) -> Option<PackageDatabase> {
        for database in PackageDatabase::ALL {
            if self.executor.which(database.tool()).await.is_some() {
                return Some(database);
            }
        }
        None
    }
}

#[async_trait]
impl DiscoveryPlugin for PackageManagerScanner {
    fn id(&self) -> &str {
        "package-manager"
    }

    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::PackageManager
    }

    #[instrument(skip(self), fields(plugin = "package-manager"))]
    async fn discover(&self) -> Result<Vec<ApplicationRecord>, DiscoveryError> {
        let database = self.detect().await.ok_or_else(|| {
            DiscoveryError::Unavailable("no supported package database (dpkg, rpm, pacman)".into())
        })?;

        debug!(%database, "querying package database");

        let result = self
            .executor
            .run_with_timeout(database.list_command(), self.command_timeout)
            .await?;

        if !result.success() {
            return Err(DiscoveryError::CommandFailed {
                status: result.status,
                message: result.stderr,
            });
        }

        let records: Vec<ApplicationRecord> = database
            .parse(&result.stdout)
            .into_iter()
            .map(|(name, version)| {
                ApplicationRecord::new(name, version, DiscoveryMethod::PackageManager)
                    .with_evidence(database.evidence_path())
                    .with_confidence(Confidence::High)
            })
            .collect();

        info!(%database, count = records.len(), "collected packages");

        Ok(records)
    }
}
