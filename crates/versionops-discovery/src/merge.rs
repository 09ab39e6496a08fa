//! Merge of per-plugin results into one record per application name

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};
use versionops_api::{ApplicationRecord, DiscoveryMethod};

use crate::types::DiscoveryPluginResult;

/// Merge the records of all successful results.
///
/// `results` must be in plugin registration order. For each name the record of
/// the highest-priority method wins; between equal priorities the earlier
/// plugin wins. A plugin repeating a name keeps its first record. Output is
/// sorted by name.
pub fn merge(results: &[DiscoveryPluginResult]) -> Vec<ApplicationRecord> {
    let mut merged: BTreeMap<String, (DiscoveryMethod, ApplicationRecord)> = BTreeMap::new();

    for result in results.iter().filter(|r| r.succeeded) {
        let mut seen = HashSet::new();

        for record in &result.records {
            if !seen.insert(record.name.as_str()) {
                warn!(
                    plugin = %result.plugin_id,
                    app = %record.name,
                    version = %record.version,
                    "duplicate application in plugin output, keeping first"
                );
                continue;
            }

            match merged.entry(record.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert((result.method, record.clone()));
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get().0;
                    if result.method.outranks(current) {
                        debug!(
                            app = %record.name,
                            winner = %result.method,
                            loser = %current,
                            "higher priority source replaces record"
                        );
                        slot.insert((result.method, record.clone()));
                    } else if slot.get().1.version != record.version {
                        debug!(
                            app = %record.name,
                            kept = %slot.get().1.version,
                            dropped = %record.version,
                            "conflicting version from lower priority source"
                        );
                    }
                }
            }
        }
    }

    merged.into_values().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::DiscoveryError;

    fn result(id: &str, method: DiscoveryMethod, apps: &[(&str, &str)]) -> DiscoveryPluginResult {
        let records = apps
            .iter()
            .map(|(name, version)| ApplicationRecord::new(*name, *version, method))
            .collect();
        DiscoveryPluginResult::succeeded(id, method, records, Duration::ZERO)
    }

    fn versions(records: &[ApplicationRecord]) -> Vec<(&str, &str)> {
        records
            .iter()
            .map(|r| (r.name.as_str(), r.version.as_str()))
            .collect()
    }

    #[test]
    fn test_package_manager_beats_binary_prober() {
        let results = vec![
            result("binary-prober", DiscoveryMethod::BinaryProber, &[("app", "1.3.0")]),
            result("package-manager", DiscoveryMethod::PackageManager, &[("app", "1.2.0")]),
        ];

        let merged = merge(&results);

        assert_eq!(versions(&merged), vec![("app", "1.2.0")]);
        assert_eq!(merged[0].discovery_method, DiscoveryMethod::PackageManager);
    }

    #[test]
    fn test_full_priority_order() {
        let results = vec![
            result("custom:db", DiscoveryMethod::Custom, &[("db", "4")]),
            result("binary-prober", DiscoveryMethod::BinaryProber, &[("db", "3"), ("web", "3")]),
            result("service-manager", DiscoveryMethod::ServiceManager, &[("db", "2"), ("web", "2")]),
            result("package-manager", DiscoveryMethod::PackageManager, &[("db", "1")]),
        ];

        assert_eq!(versions(&merge(&results)), vec![("db", "1"), ("web", "2")]);
    }

    #[test]
    fn test_equal_priority_first_registered_wins() {
        let results = vec![
            result("custom:a", DiscoveryMethod::Custom, &[("tool", "1.0.0")]),
            result("custom:b", DiscoveryMethod::Custom, &[("tool", "2.0.0")]),
        ];

        assert_eq!(versions(&merge(&results)), vec![("tool", "1.0.0")]);
    }

    #[test]
    fn test_duplicate_within_plugin_keeps_first() {
        let results = vec![result(
            "package-manager",
            DiscoveryMethod::PackageManager,
            &[("libssl", "3.0.2"), ("libssl", "1.1.1")],
        )];

        assert_eq!(versions(&merge(&results)), vec![("libssl", "3.0.2")]);
    }

    #[test]
    fn test_failed_results_are_ignored() {
        let results = vec![
            DiscoveryPluginResult::failed(
                "package-manager",
                DiscoveryMethod::PackageManager,
                DiscoveryError::Timeout(Duration::from_secs(1)),
                Duration::from_secs(1),
            ),
            result("binary-prober", DiscoveryMethod::BinaryProber, &[("git", "2.43.0")]),
        ];

        assert_eq!(versions(&merge(&results)), vec![("git", "2.43.0")]);
    }

    #[test]
    fn test_output_sorted_and_deterministic() {
        let results = vec![
            result("binary-prober", DiscoveryMethod::BinaryProber, &[("zsh", "5.9"), ("awk", "5.1")]),
            result("package-manager", DiscoveryMethod::PackageManager, &[("nginx", "1.18.0")]),
        ];

        let first = merge(&results);
        let second = merge(&results);

        assert_eq!(
            versions(&first),
            vec![("awk", "5.1"), ("nginx", "1.18.0"), ("zsh", "5.9")]
        );
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
