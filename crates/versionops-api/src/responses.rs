//! Backend responses and report outcomes

use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApplicationConfig;
use crate::record::{ApplicationRecord, Confidence, DiscoveryMethod};
use crate::requests::{HostRegistration, RegistrationResponse};
use crate::snapshot::InventorySnapshot;

/// Body returned by the ingestion endpoint on success.
///
/// Only informational; a 2xx with an unparsable body still counts as delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    /// Number of records the backend stored
    #[serde(default)]
    pub accepted: Option<usize>,
    /// Backend-side host identifier
    #[serde(default)]
    pub host_id: Option<String>,
}

/// Final outcome of the latest report attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportOutcome {
    /// No report attempted yet
    #[default]
    None,
    Success,
    Failed,
}

impl std::fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportOutcome::None => write!(f, "none"),
            ReportOutcome::Success => write!(f, "success"),
            ReportOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// OpenAPI document for the agent-facing backend contract
#[derive(OpenApi)]
#[openapi(components(schemas(
    InventorySnapshot,
    ApplicationRecord,
    DiscoveryMethod,
    Confidence,
    IngestResponse,
    ApplicationConfig,
    HostRegistration,
    RegistrationResponse
)))]
pub struct IngestApiDoc;

impl IngestApiDoc {
    /// Render the document as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if the document cannot be serialized.
    pub fn to_pretty_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
