//! versionops-core: Agent configuration, state and scheduling
//!
//! Ties discovery and reporting together:
//! - [`AgentConfig`]: TOML configuration with defaults and validation
//! - [`StateStore`]: atomic persistence of [`AgentState`]
//! - [`Scheduler`]: the `Idle → Discovering → Reporting → Sleeping` loop

pub mod agent;
pub mod agent_state;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod state;
pub mod store;

pub use agent::build_scheduler;
pub use agent_state::AgentState;
pub use config::{AgentConfig, LogFormat, LogLevel, RetrySettings, Token};
pub use error::{CoreError, StateError};
pub use scheduler::Scheduler;
pub use state::SchedulerState;
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, StateStore};
