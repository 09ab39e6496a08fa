//! Tracing subscriber setup

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};
use versionops_core::{LogFormat, LogLevel};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter for the agent: `RUST_LOG` wins over the configured level, unless
/// `verbose` forces debug output.
pub fn filter(level: LogLevel, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(LogLevel::Debug.as_filter());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Plain => fmt::layer().with_ansi(ansi).with_writer(writer).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

/// Open `path` for appending, creating it and its directory if needed
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean for
/// command output, and are appended to `log_file` when one is given.
///
/// An unwritable log file is reported on stderr and skipped.
pub fn init(
    level: LogLevel,
    format: LogFormat,
    verbose: bool,
    log_file: Option<&Path>,
) -> eyre::Result<()> {
    let mut layers = vec![layer(format, io::stderr, true)];

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => layers.push(layer(format, Arc::new(file), false)),
            Err(e) => eprintln!(
                "warning: cannot open log file {}: {e}, logging to stderr only",
                path.display()
            ),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter(level, verbose))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(filter(LogLevel::Error, true).to_string(), "debug");
    }

    #[test]
    fn test_log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log/versionops-agent.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_log_file_in_unwritable_place_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("agent.log")).is_err());
    }
}
