//! Inventory snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::record::ApplicationRecord;

/// Current snapshot wire schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Immutable point-in-time inventory of a host.
///
/// Fields are private; a new cycle always builds a new snapshot. Records are
/// sorted by name and names are unique, whether built or deserialized. The
/// payload is a full replacement of the host's inventory, never a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "SnapshotFields")]
pub struct InventorySnapshot {
    host_id: String,
    taken_at: DateTime<Utc>,
    schema_version: u32,
    records: Vec<ApplicationRecord>,
}

impl InventorySnapshot {
    /// Build a snapshot, sorting records by name. Of several records sharing a
    /// name, the first one given is kept.
    pub fn new(
        host_id: impl Into<String>,
        taken_at: DateTime<Utc>,
        mut records: Vec<ApplicationRecord>,
    ) -> Self {
        // Stable sort, so the first of equal names stays first
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records.dedup_by(|later, kept| later.name == kept.name);

        Self {
            host_id: host_id.into(),
            taken_at,
            schema_version: SCHEMA_VERSION,
            records,
        }
    }

    #[must_use]
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    #[must_use]
    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    /// Look up a record by application name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ApplicationRecord> {
        self.records
            .binary_search_by(|r| r.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.records[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable key identifying this snapshot for idempotent delivery
    #[must_use]
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.host_id, self.taken_at.timestamp_millis())
    }
}

/// Wire form, checked before it becomes a snapshot
#[derive(Deserialize)]
struct SnapshotFields {
    host_id: String,
    taken_at: DateTime<Utc>,
    schema_version: u32,
    records: Vec<ApplicationRecord>,
}

impl TryFrom<SnapshotFields> for InventorySnapshot {
    type Error = String;

    fn try_from(fields: SnapshotFields) -> Result<Self, Self::Error> {
        let mut records = fields.records;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = records.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(format!("duplicate record for application '{}'", pair[0].name));
        }

        Ok(Self {
            host_id: fields.host_id,
            taken_at: fields.taken_at,
            schema_version: fields.schema_version,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DiscoveryMethod;

    fn snapshot() -> InventorySnapshot {
        InventorySnapshot::new(
            "web-01",
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            vec![
                ApplicationRecord::new("git", "2.39.2", DiscoveryMethod::PackageManager),
                ApplicationRecord::new("nginx", "1.18.0", DiscoveryMethod::PackageManager),
            ],
        )
    }

    #[test]
    fn test_get_by_name() {
        let snapshot = snapshot();
        assert_eq!(snapshot.get("nginx").unwrap().version, "1.18.0");
        assert!(snapshot.get("redis").is_none());
    }

    #[test]
    fn test_payload_shape() {
        let json = serde_json::to_value(snapshot()).unwrap();

        assert_eq!(json["host_id"], "web-01");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["records"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_idempotency_key_is_stable() {
        assert_eq!(snapshot().idempotency_key(), "web-01:1700000000000");
        assert_eq!(snapshot().idempotency_key(), snapshot().idempotency_key());
    }

    #[test]
    fn test_new_sorts_and_keeps_first_of_duplicate_names() {
        let snapshot = InventorySnapshot::new(
            "web-01",
            Utc::now(),
            vec![
                ApplicationRecord::new("zsh", "5.9", DiscoveryMethod::BinaryProber),
                ApplicationRecord::new("nginx", "1.18.0", DiscoveryMethod::PackageManager),
                ApplicationRecord::new("awk", "5.2.1", DiscoveryMethod::PackageManager),
                ApplicationRecord::new("awk", "20240728", DiscoveryMethod::BinaryProber),
            ],
        );

        let names: Vec<&str> = snapshot.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["awk", "nginx", "zsh"]);
        assert_eq!(snapshot.get("awk").unwrap().version, "5.2.1");
        assert_eq!(snapshot.get("zsh").unwrap().version, "5.9");
    }

    #[test]
    fn test_deserialize_sorts_records() {
        let mut json = serde_json::to_value(snapshot()).unwrap();
        json["records"].as_array_mut().unwrap().reverse();

        let decoded: InventorySnapshot = serde_json::from_value(json).unwrap();

        assert_eq!(decoded, snapshot());
        assert_eq!(decoded.get("git").unwrap().version, "2.39.2");
    }

    #[test]
    fn test_deserialize_rejects_duplicate_names() {
        let mut json = serde_json::to_value(snapshot()).unwrap();
        let first = json["records"][0].clone();
        json["records"].as_array_mut().unwrap().push(first);

        let err = serde_json::from_value::<InventorySnapshot>(json).unwrap_err();

        assert!(err.to_string().contains("duplicate record for application 'git'"));
    }
}
