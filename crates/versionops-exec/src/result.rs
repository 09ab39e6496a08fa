//! Result types for command execution

use std::process::Output;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Result of a finished process. A child killed by a signal has no exit
    /// code and reports `-1`.
    #[must_use]
    pub fn from_output(output: &Output, duration: Duration) -> Self {
        Self {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
        }
    }

    /// Successful result with the given stdout, handy for tests and mocks
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// Failed result with the given status and stderr
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Combine stdout and stderr
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    use super::*;

    fn output(status: ExitStatus, stdout: &[u8]) -> Output {
        Output {
            status,
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
        }
    }

    #[test]
    fn test_from_output_keeps_exit_code_and_replaces_bad_utf8() {
        // Raw wait status: exit code in the high byte
        let result = CommandResult::from_output(
            &output(ExitStatus::from_raw(2 << 8), b"v1.2\xff"),
            Duration::from_millis(7),
        );

        assert_eq!(result.status, 2);
        assert_eq!(result.stdout, "v1.2\u{fffd}");
        assert_eq!(result.duration, Duration::from_millis(7));
    }

    #[test]
    fn test_killed_process_has_no_exit_code() {
        // SIGKILL
        let result = CommandResult::from_output(&output(ExitStatus::from_raw(9), b""), Duration::ZERO);

        assert_eq!(result.status, -1);
        assert!(!result.success());
    }
}
