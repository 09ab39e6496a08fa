//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use versionops_core::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "versionops-agent", version)]
#[command(about = "Application version discovery and reporting agent", long_about = None)]
#[command(after_help = "Examples:
  versionops-agent config --backend https://app.versionops.io --token YOUR_TOKEN
  versionops-agent install
  versionops-agent run --once
  versionops-agent run --daemon")]
pub struct Cli {
    /// Config file path (default: $VERSIONOPS_CONFIG, then /etc/versionops-agent/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configure the agent, or show the current configuration
    Config(ConfigArgs),
    /// Install the systemd service
    Install(InstallArgs),
    /// Run discovery and reporting
    Run(RunArgs),
    /// Show the last persisted agent state
    Status(StatusArgs),
    /// Print the OpenAPI document of the backend contract
    Schema,
    /// Show version and platform
    Version,
}

#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// Backend URL
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Service token
    #[arg(short, long)]
    pub token: Option<String>,

    /// Override hostname
    #[arg(long)]
    pub hostname: Option<String>,

    /// Collection interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// DEBUG, INFO, WARNING or ERROR
    #[arg(long)]
    pub log_level: Option<LogLevel>,
}

impl ConfigArgs {
    /// Whether any setting was given, i.e. the file should be written
    pub fn has_changes(&self) -> bool {
        self.backend.is_some()
            || self.token.is_some()
            || self.hostname.is_some()
            || self.interval.is_some()
            || self.log_level.is_some()
    }
}

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Directory receiving the unit file
    #[arg(long, default_value = "/etc/systemd/system")]
    pub unit_dir: PathBuf,

    /// Skip `systemctl daemon-reload`
    #[arg(long)]
    pub no_reload: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct RunMode {
    /// Run as daemon
    #[arg(short, long)]
    pub daemon: bool,

    /// Run once and exit
    #[arg(short, long)]
    pub once: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub mode: RunMode,

    /// Override service token
    #[arg(short, long)]
    pub token: Option<String>,

    /// Override backend URL
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print the state as JSON
    #[arg(long)]
    pub json: bool,
}

/// Backend URLs are stored without a trailing slash
pub fn normalize_backend(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["versionops-agent", "run"]).is_err());
        assert!(Cli::try_parse_from(["versionops-agent", "run", "--once", "--daemon"]).is_err());

        let cli = Cli::try_parse_from(["versionops-agent", "run", "-o", "-b", "http://x/"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert!(args.mode.once);
                assert_eq!(args.backend.as_deref(), Some("http://x/"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["versionops-agent", "status", "-c", "/tmp/agent.toml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/agent.toml")));
    }

    #[test]
    fn test_config_log_level_parses() {
        let cli =
            Cli::try_parse_from(["versionops-agent", "config", "--log-level", "warn"]).unwrap();
        match cli.command {
            Commands::Config(args) => {
                assert_eq!(args.log_level, Some(LogLevel::Warning));
                assert!(args.has_changes());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!ConfigArgs::default().has_changes());
    }

    #[test]
    fn test_schema_takes_no_arguments() {
        let cli = Cli::try_parse_from(["versionops-agent", "schema"]).unwrap();

        assert!(matches!(cli.command, Commands::Schema));
        assert!(Cli::try_parse_from(["versionops-agent", "schema", "--json"]).is_err());
    }

    #[test]
    fn test_normalize_backend() {
        assert_eq!(normalize_backend("https://app.example.com/ "), "https://app.example.com");
    }
}
