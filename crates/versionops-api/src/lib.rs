//! versionops-api: Shared wire types
//!
//! Application records, inventory snapshots and the backend ingestion contract
//! used by discovery, the reporter, the scheduler and the CLI.

pub mod config;
pub mod events;
pub mod record;
pub mod requests;
pub mod responses;
pub mod snapshot;

pub use config::ApplicationConfig;
pub use events::AgentEvent;
pub use record::{ApplicationRecord, Confidence, DiscoveryMethod};
pub use requests::{HostRegistration, RegistrationResponse};
pub use responses::{IngestApiDoc, IngestResponse, ReportOutcome};
pub use snapshot::{InventorySnapshot, SCHEMA_VERSION};
