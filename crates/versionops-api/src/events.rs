//! Agent lifecycle events

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::responses::ReportOutcome;

/// Events published by the scheduler to in-process observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum AgentEvent {
    PhaseChanged {
        from: String,
        to: String,
    },
    CycleCompleted {
        cycle: u64,
        records: usize,
        plugin_failures: usize,
        outcome: ReportOutcome,
    },
    ShuttingDown {
        reason: String,
    },
}
