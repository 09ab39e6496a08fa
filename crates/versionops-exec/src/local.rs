//! Version commands run on this host

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::CommandExecutor;

/// Runs commands through `sh -c` on the local machine.
///
/// Commands see no stdin and the `C` locale, so version strings come out in the
/// form the parsers expect. A child is killed when its future is dropped,
/// which is how timeouts and cancelled cycles stop it.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn spawn(cmd: &str) -> Result<Child, ExecError> {
        Command::new("sh")
            .args(["-c", cmd])
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let started = Instant::now();
        let output = Self::spawn(cmd)?
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult::from_output(&output, started.elapsed());
        debug!(cmd, exit = result.status, elapsed = ?result.duration, "command finished");
        Ok(result)
    }

    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError> {
        tokio::time::timeout(timeout, self.run(cmd))
            .await
            .unwrap_or_else(|_| {
                warn!(cmd, ?timeout, "command killed after timeout");
                Err(ExecError::Timeout { timeout })
            })
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_both_streams_and_status() {
        let result = LocalExecutor::new()
            .run("echo 'git version 2.43.0'; echo warning >&2; exit 3")
            .await
            .unwrap();

        assert_eq!(result.status, 3);
        assert_eq!(result.stdout, "git version 2.43.0\n");
        assert_eq!(result.stderr, "warning\n");
    }

    #[tokio::test]
    async fn test_command_reading_stdin_sees_eof() {
        let result = LocalExecutor::new()
            .run_with_timeout("cat", Duration::from_secs(5))
            .await
            .unwrap();

        assert!(result.success());
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_locale_is_pinned() {
        let result = LocalExecutor::new().run("echo $LC_ALL").await.unwrap();

        assert_eq!(result.stdout.trim(), "C");
    }

    #[tokio::test]
    async fn test_timed_out_command_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-running");
        let cmd = format!("sleep 1 && touch {}", crate::shell::quote(&marker.to_string_lossy()));

        let result = LocalExecutor::new()
            .run_with_timeout(&cmd, Duration::from_millis(100))
            .await;
        assert!(result.unwrap_err().is_timeout());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_which() {
        let executor = LocalExecutor::new();

        assert!(executor.which("sh").await.is_some());
        assert!(executor.which("definitely-not-a-real-binary-4242").await.is_none());
    }
}
