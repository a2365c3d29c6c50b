//! Evidence clusters - growing sets of records believed to describe one document

use crate::record::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable cluster identifier, assigned once and preserved across re-scans
///
/// UUIDv7, so ids created earlier sort lower - the "lowest cluster id"
/// tie-break therefore prefers the oldest cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(u128);

impl ClusterId {
    /// Generate a new UUIDv7-based ClusterId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClusterId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ClusterId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid cluster id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A set of evidence records believed to describe one real document
///
/// Members are append-only: clusters grow and never split automatically.
/// The representative fields are derived and recomputed on every merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCluster {
    /// Stable identifier
    pub id: ClusterId,

    /// Member record ids (append-only)
    pub members: Vec<RecordId>,

    /// Best-known path for display and fuzzy matching, derived
    pub representative_path: String,

    /// Best-known content hint, derived
    pub representative_hint: Option<String>,

    /// When the cluster was opened (epoch ms)
    pub created_at_ms: u64,
}

impl EvidenceCluster {
    /// Open a new singleton cluster
    pub fn open(
        id: ClusterId,
        first_member: RecordId,
        representative_path: String,
        representative_hint: Option<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            members: vec![first_member],
            representative_path,
            representative_hint,
            created_at_ms,
        }
    }

    /// Number of member records
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members (should never persist)
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_id_round_trip() {
        let id = ClusterId::new();
        assert_eq!(ClusterId::from_string(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_cluster_id_age_ordering() {
        let older = ClusterId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = ClusterId::new();
        assert!(older < newer, "older cluster ids must sort lower");
    }

    #[test]
    fn test_open_singleton() {
        let member = RecordId::new();
        let cluster = EvidenceCluster::open(
            ClusterId::new(),
            member,
            "tmp/draft.md".to_string(),
            None,
            1_000,
        );
        assert_eq!(cluster.len(), 1);
        assert_eq!(cluster.members[0], member);
        assert!(!cluster.is_empty());
    }
}
