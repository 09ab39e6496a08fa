//! Human readable rendering of the persisted agent state

use std::fmt::Write;

use versionops_core::AgentState;

/// Multi-line summary of `state`
pub fn render(state: &AgentState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Cycles completed: {}", state.cycle_count);
    match state.last_report_at {
        Some(at) => {
            let _ = writeln!(
                out,
                "Last report:      {} ({})",
                at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                state.last_report_outcome
            );
        }
        None => {
            let _ = writeln!(out, "Last report:      never");
        }
    }
    if let Some(error) = &state.last_report_error {
        let _ = writeln!(out, "Last error:       {error}");
    }
    if let Some(host_id) = &state.backend_host_id {
        let _ = writeln!(out, "Backend host id:  {host_id}");
    }

    let Some(snapshot) = &state.last_snapshot else {
        return out;
    };

    let _ = writeln!(
        out,
        "\nApplications on {} ({}):",
        snapshot.host_id(),
        snapshot.len()
    );
    let width = snapshot
        .records()
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0);
    for record in snapshot.records() {
        let _ = writeln!(
            out,
            "  {:<width$}  {:<16}  {}",
            record.name, record.version, record.discovery_method
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use versionops_api::{ApplicationRecord, DiscoveryMethod, InventorySnapshot, ReportOutcome};

    use super::*;

    #[test]
    fn test_fresh_state() {
        let out = render(&AgentState::default());

        assert!(out.contains("Cycles completed: 0"));
        assert!(out.contains("never"));
        assert!(!out.contains("Applications"));
    }

    #[test]
    fn test_state_with_snapshot_and_error() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let state = AgentState {
            last_snapshot: Some(InventorySnapshot::new(
                "web-01",
                at,
                vec![
                    ApplicationRecord::new("nginx", "1.18.0", DiscoveryMethod::PackageManager),
                    ApplicationRecord::new("git", "2.43.0", DiscoveryMethod::BinaryProber),
                ],
            )),
            last_report_at: Some(at),
            last_report_outcome: ReportOutcome::Failed,
            last_report_error: Some("authentication rejected (status 401)".into()),
            cycle_count: 4,
            backend_host_id: Some("h-7".into()),
        };

        let out = render(&state);

        assert!(out.contains("2026-03-01T12:00:00Z (failed)"));
        assert!(out.contains("Last error:       authentication rejected"));
        assert!(out.contains("Backend host id:  h-7"));
        assert!(out.contains("Applications on web-01 (2):"));
        assert!(out.contains("nginx  1.18.0"));
        assert!(out.contains("binary-prober"));
    }
}
