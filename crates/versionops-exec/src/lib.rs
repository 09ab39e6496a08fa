//! versionops-exec: Local command execution
//!
//! Runs version-revealing commands on the host with per-command timeouts.

pub mod error;
pub mod local;
pub mod result;
pub mod shell;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use shell::{quote, quote_all};
pub use traits::CommandExecutor;
