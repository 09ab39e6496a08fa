//! versionops agent
//!
//! Discovers installed applications and their versions and reports the
//! inventory to the VersionOps backend, once or on an interval.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use versionops_api::{IngestApiDoc, ReportOutcome};
use versionops_core::{AgentConfig, LogFormat, LogLevel, StateStore, Token, build_scheduler};
use versionops_exec::{CommandExecutor, LocalExecutor};

mod cli;
mod install;
mod logging;
mod status;

use cli::{Cli, Commands, ConfigArgs, InstallArgs, RunArgs, StatusArgs, normalize_backend};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // `run` sets up logging once its configuration is known
    if !matches!(cli.command, Commands::Run(_)) {
        logging::init(LogLevel::Warning, LogFormat::Plain, false, None)?;
    }

    match cli.command {
        Commands::Config(args) => configure(cli.config.as_deref(), args),
        Commands::Install(args) => install_service(cli.config.as_deref(), args).await,
        Commands::Run(args) => run(cli.config.as_deref(), args).await,
        Commands::Status(args) => show_status(cli.config.as_deref(), &args),
        Commands::Schema => {
            println!("{}", IngestApiDoc::to_pretty_json()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("versionops-agent v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "Platform: {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<(AgentConfig, PathBuf)> {
    AgentConfig::load_default(path).wrap_err("cannot load configuration")
}

fn configure(path: Option<&Path>, args: ConfigArgs) -> Result<ExitCode> {
    let (mut config, path) = load_config(path)?;

    if !args.has_changes() {
        println!("Current configuration:");
        println!("  Config file: {}", path.display());
        println!(
            "  Backend URL: {}",
            if config.backend_url.is_empty() {
                "<not set>"
            } else {
                config.backend_url.as_str()
            }
        );
        println!("  Token:       {}", config.token);
        println!("  Hostname:    {}", config.hostname);
        println!("  Interval:    {}s", config.interval);
        println!("  Log level:   {}", config.log_level);
        println!(
            "  Log file:    {}",
            config
                .log_file()
                .map_or_else(|| "<disabled>".to_string(), |p| p.display().to_string())
        );
        println!(
            "  Plugins:     {}",
            config
                .enabled_plugins
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("  State file:  {}", config.state_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(backend) = args.backend {
        config.backend_url = normalize_backend(&backend);
        println!("Backend URL set to: {}", config.backend_url);
    }
    if let Some(token) = args.token {
        config.token = Token::new(token);
        println!("Service token configured");
    }
    if let Some(hostname) = args.hostname {
        println!("Hostname set to: {hostname}");
        config.hostname = hostname;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
        println!("Collection interval set to: {interval}s");
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
        println!("Log level set to: {level}");
    }

    config
        .save(&path)
        .wrap_err_with(|| format!("cannot save configuration to {}", path.display()))?;
    println!("Configuration saved to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

async fn install_service(path: Option<&Path>, args: InstallArgs) -> Result<ExitCode> {
    let agent = std::env::current_exe().wrap_err("cannot determine agent path")?;
    let config = AgentConfig::locate(path);
    let executor = LocalExecutor::new();
    let reload = (!args.no_reload).then_some(&executor as &dyn CommandExecutor);

    let unit = install::install(&args.unit_dir, &agent, &config, reload).await?;

    println!("Service file created: {}", unit.display());
    println!("\nTo start the agent:");
    println!("  sudo systemctl enable --now {}", install::SERVICE_NAME);
    println!("\nTo check status:");
    println!("  sudo systemctl status {}", install::SERVICE_NAME);
    Ok(ExitCode::SUCCESS)
}

async fn run(path: Option<&Path>, args: RunArgs) -> Result<ExitCode> {
    let (mut config, path) = load_config(path)?;
    config.apply_overrides(args.backend.as_deref().map(normalize_backend), args.token);

    logging::init(
        config.log_level,
        config.log_format,
        args.verbose,
        config.log_file(),
    )?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        backend = %config.backend_url,
        token = %config.token,
        "versionops agent starting"
    );

    let mut scheduler = build_scheduler(&config, Arc::new(LocalExecutor::new()))
        .await
        .wrap_err("invalid configuration")?;
    spawn_signal_handler(scheduler.cancellation_token());

    if args.mode.daemon {
        scheduler.run_daemon().await?;
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = scheduler.run_once().await?;
    if outcome != ReportOutcome::Success {
        warn!(%outcome, "inventory was not delivered");
    }
    Ok(ExitCode::from(exit_status(outcome)))
}

/// Process status for a single run: zero only when the inventory was delivered
fn exit_status(outcome: ReportOutcome) -> u8 {
    match outcome {
        ReportOutcome::Success => 0,
        ReportOutcome::Failed | ReportOutcome::None => 1,
    }
}

fn show_status(path: Option<&Path>, args: &StatusArgs) -> Result<ExitCode> {
    let (config, _) = load_config(path)?;
    let state = StateStore::at_path(&config.state_path).load();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("State file:       {}", config.state_path.display());
        print!("{}", status::render(&state));
    }
    Ok(ExitCode::SUCCESS)
}

/// Cancel `token` on SIGINT or SIGTERM
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
                        _ = term.recv() => info!("SIGTERM received, shutting down"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("interrupt received, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupt received, shutting down");
        }

        token.cancel();
    });
}
