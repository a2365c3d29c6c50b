//! In-memory working state for correlation
//!
//! The [`ClusterIndex`] is rebuilt from the store at the start of every scan
//! and mutated only by the single correlation pass (single-writer
//! discipline). It carries inverted indexes for the exact-match tiers and a
//! natural-key map so replayed observations are recognized instead of
//! re-clustered.

use kintsugi_domain::{ClusterId, EvidenceCluster, EvidenceRecord, ObservedPath};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Natural identity of an observation, the replay/idempotence key
pub type NaturalKey = (String, String, u64);

/// Per-cluster summary maintained during correlation
#[derive(Debug, Clone)]
pub struct ClusterSummary {
    /// Cluster id
    pub id: ClusterId,
    /// Number of member records
    pub member_count: usize,
    /// Best-known display path, recomputed on every merge
    pub representative_path: String,
    /// Best-known content hint, recomputed on every merge
    pub representative_hint: Option<String>,
    /// Earliest trusted instant across members
    pub earliest_ms: Option<u64>,
    /// Latest trusted instant across members
    pub latest_ms: Option<u64>,
    /// Signature stems of members, the fuzzy-match vocabulary
    pub stems: BTreeSet<String>,
    // Rank of the current representative; higher-ranked members displace it
    representative_rank: u8,
}

impl ClusterSummary {
    /// Distance from an instant to this cluster's observed time range
    /// (0 when the instant falls inside the range)
    pub fn temporal_distance(&self, at_ms: u64) -> Option<u64> {
        let (earliest, latest) = (self.earliest_ms?, self.latest_ms?);
        if at_ms < earliest {
            Some(earliest - at_ms)
        } else if at_ms > latest {
            Some(at_ms - latest)
        } else {
            Some(0)
        }
    }
}

/// How good a record is as a cluster representative
fn representative_rank(record: &EvidenceRecord) -> u8 {
    match (&record.observed_path, record.content_hint.as_deref().is_some_and(|h| !h.is_empty())) {
        (ObservedPath::Real(_), true) => 3,
        (ObservedPath::Real(_), false) => 2,
        (ObservedPath::Synthetic(_), true) => 1,
        (ObservedPath::Synthetic(_), false) => 0,
    }
}

/// The correlation working state: cluster summaries plus inverted indexes
#[derive(Debug, Default)]
pub struct ClusterIndex {
    clusters: BTreeMap<ClusterId, ClusterSummary>,
    by_hash: HashMap<String, BTreeSet<ClusterId>>,
    by_signature: HashMap<String, BTreeSet<ClusterId>>,
    known: HashMap<NaturalKey, ClusterId>,
    last_issued: u128,
}

impl ClusterIndex {
    /// Empty index (first scan against a fresh store)
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from persisted clusters and their members
    ///
    /// The persisted representative wins over the recomputed one; the store
    /// is the source of truth for derived state between scans.
    pub fn rebuild<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (EvidenceCluster, Vec<EvidenceRecord>)>,
    {
        let mut index = Self::new();
        for (cluster, members) in entries {
            for record in &members {
                index.insert_member(cluster.id, record);
            }
            if let Some(summary) = index.clusters.get_mut(&cluster.id) {
                summary.representative_path = cluster.representative_path.clone();
                summary.representative_hint = cluster.representative_hint.clone();
            }
            index.last_issued = index.last_issued.max(cluster.id.value());
        }
        index
    }

    /// Number of clusters tracked
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether the index tracks no clusters
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Summary for one cluster
    pub fn get(&self, id: ClusterId) -> Option<&ClusterSummary> {
        self.clusters.get(&id)
    }

    /// All summaries in id order (deterministic iteration)
    pub fn summaries(&self) -> impl Iterator<Item = &ClusterSummary> {
        self.clusters.values()
    }

    /// Cluster that already holds an observation with this natural key
    pub fn known_cluster(&self, key: &NaturalKey) -> Option<ClusterId> {
        self.known.get(key).copied()
    }

    /// Clusters containing a member with this content hash
    pub fn clusters_with_hash(&self, hash: &str) -> impl Iterator<Item = ClusterId> + '_ {
        self.by_hash.get(hash).into_iter().flatten().copied()
    }

    /// Clusters containing a member with this canonical path signature
    pub fn clusters_with_signature(&self, canonical: &str) -> impl Iterator<Item = ClusterId> + '_ {
        self.by_signature.get(canonical).into_iter().flatten().copied()
    }

    /// Issue a fresh cluster id, strictly greater than any id seen so far
    ///
    /// UUIDv7s created within the same millisecond are not ordered by
    /// creation; bumping keeps the "lowest cluster id" tie-break equal to
    /// "oldest cluster" even inside one fast scan pass.
    pub fn issue_cluster_id(&mut self) -> ClusterId {
        let mut value = ClusterId::new().value();
        if value <= self.last_issued {
            value = self.last_issued + 1;
        }
        self.last_issued = value;
        ClusterId::from_value(value)
    }

    /// Register a record as a member and update every derived structure.
    /// Creates the summary on first insertion.
    pub fn insert_member(&mut self, cluster_id: ClusterId, record: &EvidenceRecord) {
        let summary = self.clusters.entry(cluster_id).or_insert_with(|| ClusterSummary {
            id: cluster_id,
            member_count: 0,
            representative_path: record.observed_path.as_str().to_string(),
            representative_hint: None,
            earliest_ms: None,
            latest_ms: None,
            stems: BTreeSet::new(),
            representative_rank: 0,
        });

        summary.member_count += 1;

        let rank = representative_rank(record);
        if summary.member_count == 1 || rank > summary.representative_rank {
            summary.representative_path = record.observed_path.as_str().to_string();
            summary.representative_rank = rank;
            if let Some(hint) = record.content_hint.as_deref().filter(|h| !h.is_empty()) {
                summary.representative_hint = Some(hint.to_string());
            }
        } else if summary.representative_hint.is_none() {
            if let Some(hint) = record.content_hint.as_deref().filter(|h| !h.is_empty()) {
                summary.representative_hint = Some(hint.to_string());
            }
        }

        for stamp in record.stamps.iter().filter(|s| !s.suspect) {
            summary.earliest_ms = Some(summary.earliest_ms.map_or(stamp.at_ms, |e| e.min(stamp.at_ms)));
            summary.latest_ms = Some(summary.latest_ms.map_or(stamp.at_ms, |l| l.max(stamp.at_ms)));
        }

        if let Some(sig) = &record.path_signature {
            summary.stems.insert(sig.stem.clone());
            self.by_signature.entry(sig.canonical()).or_default().insert(cluster_id);
        }
        if let Some(hash) = record.content_hash.as_deref().filter(|h| !h.is_empty()) {
            self.by_hash.entry(hash.to_string()).or_default().insert(cluster_id);
        }

        let (source, path, at) = record.natural_key();
        self.known.insert((source.to_string(), path.to_string(), at), cluster_id);
        self.last_issued = self.last_issued.max(cluster_id.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintsugi_domain::{PathSignature, Stamp, StampKind};

    fn record(source: &str, path: &str, at_ms: u64) -> EvidenceRecord {
        let mut r = EvidenceRecord::new(source, ObservedPath::Real(path.to_string()), at_ms + 10);
        r.stamps.push(Stamp::new(StampKind::Modified, at_ms));
        r.path_signature = Some(PathSignature::from_canonical(path.trim_start_matches('/')));
        r
    }

    #[test]
    fn test_insert_builds_indexes() {
        let mut index = ClusterIndex::new();
        let id = index.issue_cluster_id();
        let mut r = record("tmp_scan", "/tmp/draft.md", 500);
        r.content_hash = Some("abc".to_string());
        index.insert_member(id, &r);

        assert_eq!(index.len(), 1);
        assert_eq!(index.clusters_with_hash("abc").collect::<Vec<_>>(), vec![id]);
        assert_eq!(index.clusters_with_signature("tmp/draft.md").collect::<Vec<_>>(), vec![id]);
        assert_eq!(
            index.known_cluster(&("tmp_scan".to_string(), "/tmp/draft.md".to_string(), 510)),
            Some(id)
        );

        let summary = index.get(id).unwrap();
        assert_eq!(summary.member_count, 1);
        assert_eq!(summary.earliest_ms, Some(500));
        assert_eq!(summary.latest_ms, Some(500));
    }

    #[test]
    fn test_representative_prefers_real_with_hint() {
        let mut index = ClusterIndex::new();
        let id = index.issue_cluster_id();

        let bare = record("recents", "/tmp/draft.md.swp", 100);
        index.insert_member(id, &bare);

        let mut hinted = record("tmp_scan", "/tmp/draft.md", 200);
        hinted.content_hint = Some("# Draft".to_string());
        index.insert_member(id, &hinted);

        let summary = index.get(id).unwrap();
        assert_eq!(summary.representative_path, "/tmp/draft.md");
        assert_eq!(summary.representative_hint.as_deref(), Some("# Draft"));
    }

    #[test]
    fn test_temporal_distance() {
        let mut index = ClusterIndex::new();
        let id = index.issue_cluster_id();
        index.insert_member(id, &record("a", "/tmp/x.md", 1_000));
        index.insert_member(id, &record("b", "/tmp/x.md", 2_000));

        let summary = index.get(id).unwrap();
        assert_eq!(summary.temporal_distance(1_500), Some(0));
        assert_eq!(summary.temporal_distance(500), Some(500));
        assert_eq!(summary.temporal_distance(2_600), Some(600));
    }

    #[test]
    fn test_issued_ids_strictly_increase() {
        let mut index = ClusterIndex::new();
        let a = index.issue_cluster_id();
        let b = index.issue_cluster_id();
        let c = index.issue_cluster_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_rebuild_keeps_persisted_representative() {
        let r = record("tmp_scan", "/tmp/draft.md", 500);
        let cluster = EvidenceCluster::open(
            ClusterId::new(),
            r.id,
            "/persisted/path.md".to_string(),
            Some("persisted hint".to_string()),
            400,
        );
        let index = ClusterIndex::rebuild(vec![(cluster.clone(), vec![r])]);

        let summary = index.get(cluster.id).unwrap();
        assert_eq!(summary.representative_path, "/persisted/path.md");
        assert_eq!(summary.representative_hint.as_deref(), Some("persisted hint"));
    }
}
