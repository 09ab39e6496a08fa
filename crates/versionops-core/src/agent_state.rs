//! Persisted agent state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use versionops_api::{InventorySnapshot, ReportOutcome};
use versionops_client::ReportAttempt;

/// What the agent remembers between cycles and restarts.
///
/// Absent fields deserialize to their zero values and unknown fields are
/// ignored, so older and newer agents can read each other's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentState {
    pub last_snapshot: Option<InventorySnapshot>,
    pub last_report_at: Option<DateTime<Utc>>,
    pub last_report_outcome: ReportOutcome,
    /// Error of the last failed report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_error: Option<String>,
    pub cycle_count: u64,
    /// Identifier assigned by the backend at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_host_id: Option<String>,
}

impl AgentState {
    /// Record a cycle whose report attempt has fully resolved
    pub fn complete_cycle(&mut self, snapshot: InventorySnapshot, attempt: &ReportAttempt) {
        self.cycle_count += 1;
        self.last_snapshot = Some(snapshot);
        self.last_report_at = Some(attempt.started_at);
        self.last_report_outcome = attempt.outcome;
        self.last_report_error = attempt.error.as_ref().map(ToString::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_unknown_fields() {
        let state: AgentState =
            serde_json::from_str(r#"{"cycle_count": 7, "added_in_v9": {"x": 1}}"#).unwrap();

        assert_eq!(state.cycle_count, 7);
        assert_eq!(state.last_report_outcome, ReportOutcome::None);
        assert!(state.last_snapshot.is_none());
        assert!(state.backend_host_id.is_none());
    }

    #[test]
    fn test_default_is_zero_value() {
        let state = AgentState::default();

        assert_eq!(state.cycle_count, 0);
        assert!(state.last_report_at.is_none());
        assert_eq!(state.last_report_outcome, ReportOutcome::None);
    }
}
