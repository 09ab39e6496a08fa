//! Command executor trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::CommandResult;

/// Capability to run shell commands on the host
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command through `sh -c`
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Run a command, giving up after `timeout`
    async fn run_with_timeout(
        &self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    fn executor_type(&self) -> &'static str;

    /// Resolve an executable on `PATH`, `None` when absent
    async fn which(&self, program: &str) -> Option<String> {
        let cmd = format!("command -v {}", crate::shell::quote(program));
        match self.run(&cmd).await {
            Ok(result) if result.success() => {
                let path = result.stdout.trim();
                (!path.is_empty()).then(|| path.to_string())
            }
            _ => None,
        }
    }
}
