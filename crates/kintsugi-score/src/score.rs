//! Cluster scoring: evidence threshold, confidence factors, summaries

use crate::config::ScoringWeights;
use kintsugi_domain::{
    Confidence, EvidenceCluster, EvidenceRecord, ObservedPath, ReconstructedArtifact,
    TimelineEvent,
};
use std::collections::{BTreeMap, BTreeSet};

/// Source count at which the diversity factor saturates
const DIVERSITY_SATURATION: f64 = 3.0;

/// Content-presence contribution of a member with recoverable bytes
const HASH_PRESENCE: f64 = 1.0;

/// Content-presence contribution of a member with only a text hint
const HINT_PRESENCE: f64 = 0.5;

/// Minimum evidence threshold: a cluster earns an artifact once it has two
/// members, or one member carrying actual content evidence. A lone
/// filename-in-a-list sighting never materializes anything.
pub fn meets_evidence_threshold(members: &[EvidenceRecord]) -> bool {
    members.len() >= 2 || members.iter().any(|m| m.has_content_evidence())
}

/// Score a cluster into a reconstructed artifact
///
/// Pure function of the member set; returns `None` while the cluster is
/// below the evidence threshold. `temporal_window_ms` is the span at which
/// the temporal-spread factor saturates (the correlation window is a natural
/// choice).
pub fn score_cluster(
    cluster: &EvidenceCluster,
    members: &[EvidenceRecord],
    weights: &ScoringWeights,
    temporal_window_ms: u64,
    now_ms: u64,
) -> Option<ReconstructedArtifact> {
    if members.is_empty() || !meets_evidence_threshold(members) {
        return None;
    }

    let diversity = source_diversity(members);
    let spread = temporal_spread(members, temporal_window_ms);
    let presence = content_presence(members);

    let weighted = weights.source_diversity * diversity
        + weights.temporal_spread * spread
        + weights.content_presence * presence;
    let confidence = Confidence::new(weighted / weights.total());

    tracing::debug!(
        cluster = %cluster.id,
        diversity,
        spread,
        presence,
        confidence = %confidence,
        "scored cluster"
    );

    Some(ReconstructedArtifact {
        id: cluster.id,
        confidence,
        best_name: best_name(cluster, members),
        preview: preview(members),
        origin_apps: origin_apps(members),
        timeline: timeline(members),
        stale: false,
        scored_at_ms: now_ms,
    })
}

/// Distinct contributing sources, saturating at three
fn source_diversity(members: &[EvidenceRecord]) -> f64 {
    let sources: BTreeSet<&str> = members.iter().map(|m| m.source_id.as_str()).collect();
    (sources.len() as f64 / DIVERSITY_SATURATION).min(1.0)
}

/// Trusted-sighting span normalized by the window; a cluster that is all one
/// instant scores zero on this factor
fn temporal_spread(members: &[EvidenceRecord], temporal_window_ms: u64) -> f64 {
    let instants: BTreeSet<u64> = members
        .iter()
        .flat_map(|m| m.stamps.iter())
        .filter(|s| !s.suspect)
        .map(|s| s.at_ms)
        .collect();

    match (instants.first(), instants.last()) {
        (Some(&first), Some(&last)) if last > first => {
            ((last - first) as f64 / temporal_window_ms as f64).min(1.0)
        }
        _ => 0.0,
    }
}

/// Fraction of members carrying recoverable content; bytes beat hints
fn content_presence(members: &[EvidenceRecord]) -> f64 {
    let sum: f64 = members
        .iter()
        .map(|m| {
            if m.content_hash.as_deref().is_some_and(|h| !h.is_empty()) {
                HASH_PRESENCE
            } else if m.content_hint.as_deref().is_some_and(|h| !h.is_empty()) {
                HINT_PRESENCE
            } else {
                0.0
            }
        })
        .sum();
    sum / members.len() as f64
}

/// Best-guess document name
///
/// Prefer a member with a real path and a content hint; else the most
/// frequent signature stem; ties break lexicographically.
fn best_name(cluster: &EvidenceCluster, members: &[EvidenceRecord]) -> String {
    let hinted_stem = members
        .iter()
        .filter(|m| {
            matches!(m.observed_path, ObservedPath::Real(_))
                && m.content_hint.as_deref().is_some_and(|h| !h.is_empty())
        })
        .filter_map(stem_of)
        .min();
    if let Some(name) = hinted_stem {
        return name;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for stem in members.iter().filter_map(stem_of) {
        *counts.entry(stem).or_insert(0) += 1;
    }
    // Reversed stem in the key: among equal counts the lexicographically
    // first stem wins
    if let Some((stem, _)) = counts.iter().max_by_key(|(stem, count)| (**count, std::cmp::Reverse((*stem).clone()))) {
        return stem.clone();
    }

    // Metadata-only synthetic cluster: fall back to the representative
    cluster
        .representative_path
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(&cluster.representative_path)
        .to_string()
}

fn stem_of(member: &EvidenceRecord) -> Option<String> {
    member
        .path_signature
        .as_ref()
        .map(|s| s.stem.clone())
        .or_else(|| member.observed_path.file_name().map(String::from))
}

/// Longest hint wins; ties break lexicographically
fn preview(members: &[EvidenceRecord]) -> Option<String> {
    members
        .iter()
        .filter_map(|m| m.content_hint.as_deref())
        .filter(|h| !h.is_empty())
        .min_by_key(|h| (std::cmp::Reverse(h.len()), h.to_string()))
        .map(String::from)
}

/// Distinct `app` extrinsic values; falls back to source ids
fn origin_apps(members: &[EvidenceRecord]) -> Vec<String> {
    let apps: BTreeSet<String> = members
        .iter()
        .filter_map(|m| m.extrinsic.get("app"))
        .filter(|a| !a.is_empty())
        .cloned()
        .collect();
    if !apps.is_empty() {
        return apps.into_iter().collect();
    }
    let sources: BTreeSet<String> = members.iter().map(|m| m.source_id.clone()).collect();
    sources.into_iter().collect()
}

/// All trusted sightings, ordered
fn timeline(members: &[EvidenceRecord]) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = members
        .iter()
        .flat_map(|m| {
            m.stamps
                .iter()
                .filter(|s| !s.suspect)
                .map(|s| TimelineEvent {
                    at_ms: s.at_ms,
                    kind: s.kind,
                    source_id: m.source_id.clone(),
                })
        })
        .collect();
    events.sort();
    events.dedup();
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintsugi_domain::{ClusterId, PathSignature, Stamp, StampKind};

    const HOUR_MS: u64 = 60 * 60 * 1000;
    const DAY_MS: u64 = 24 * HOUR_MS;

    fn member(source: &str, path: &str, at_ms: u64) -> EvidenceRecord {
        let mut r = EvidenceRecord::new(source, ObservedPath::Real(path.to_string()), at_ms);
        r.stamps.push(Stamp::new(StampKind::Modified, at_ms));
        r.path_signature = Some(PathSignature::from_canonical(path.trim_start_matches('/')));
        r
    }

    fn cluster_of(members: &[EvidenceRecord]) -> EvidenceCluster {
        let mut cluster = EvidenceCluster::open(
            ClusterId::new(),
            members[0].id,
            members[0].observed_path.as_str().to_string(),
            None,
            0,
        );
        for m in &members[1..] {
            cluster.members.push(m.id);
        }
        cluster
    }

    fn score(members: &[EvidenceRecord]) -> Option<ReconstructedArtifact> {
        score_cluster(
            &cluster_of(members),
            members,
            &ScoringWeights::default(),
            DAY_MS,
            1_000 * DAY_MS,
        )
    }

    #[test]
    fn test_threshold_gate_blocks_bare_sighting() {
        // A lone recents-list sighting: no hash, no hint
        let members = vec![member("vscode_recents", "/tmp/Untitled-1.md", DAY_MS)];
        assert!(!meets_evidence_threshold(&members));
        assert!(score(&members).is_none());
    }

    #[test]
    fn test_threshold_gate_opens_with_hint() {
        let mut m = member("vscode_recents", "/tmp/Untitled-1.md", DAY_MS);
        m.content_hint = Some("# notes".to_string());
        let members = vec![m];
        assert!(meets_evidence_threshold(&members));
        assert!(score(&members).is_some());
    }

    #[test]
    fn test_threshold_gate_opens_with_second_member() {
        let members = vec![
            member("vscode_recents", "/tmp/Untitled-1.md", DAY_MS),
            member("tmp_scan", "/tmp/Untitled-1.md", DAY_MS + HOUR_MS),
        ];
        assert!(meets_evidence_threshold(&members));
    }

    #[test]
    fn test_two_sources_score_above_one() {
        let one_source = vec![
            member("tmp_scan", "/tmp/a.md", DAY_MS),
            member("tmp_scan", "/tmp/a.md", DAY_MS + HOUR_MS),
        ];
        let two_sources = vec![
            member("tmp_scan", "/tmp/a.md", DAY_MS),
            member("vscode_recents", "/tmp/a.md", DAY_MS + HOUR_MS),
        ];
        let lo = score(&one_source).unwrap().confidence.value();
        let hi = score(&two_sources).unwrap().confidence.value();
        assert!(hi > lo, "evidence diversity must raise confidence ({hi} vs {lo})");
    }

    #[test]
    fn test_single_instant_scores_below_spread() {
        let pile_up = vec![
            member("a", "/tmp/a.md", DAY_MS),
            member("b", "/tmp/a.md", DAY_MS),
        ];
        let spread = vec![
            member("a", "/tmp/a.md", DAY_MS),
            member("b", "/tmp/a.md", DAY_MS + 12 * HOUR_MS),
        ];
        let lo = score(&pile_up).unwrap().confidence.value();
        let hi = score(&spread).unwrap().confidence.value();
        assert!(hi > lo, "a cluster that is all one instant scores lower");
    }

    #[test]
    fn test_content_bytes_beat_metadata_only() {
        let metadata_only = vec![
            member("a", "/tmp/a.md", DAY_MS),
            member("b", "/tmp/a.md", DAY_MS + HOUR_MS),
        ];
        let mut with_bytes = metadata_only.clone();
        with_bytes[1].content_hash = Some("abc123".to_string());

        let lo = score(&metadata_only).unwrap().confidence.value();
        let hi = score(&with_bytes).unwrap().confidence.value();
        assert!(hi > lo);
    }

    #[test]
    fn test_two_source_fusion_confidence_in_expected_band() {
        let t1 = 100 * DAY_MS;
        let recents = member("vscode_recents", "/tmp/Untitled-1.md", t1);
        let mut swap = member("tmp_scan", "/tmp/Untitled-1.md", t1 + 5 * 60 * 1000);
        swap.content_hash = Some("abc123".to_string());

        let artifact = score(&[recents, swap]).unwrap();
        assert!(artifact.confidence.value() > 0.0);
        assert_eq!(artifact.origin_apps, vec!["tmp_scan".to_string(), "vscode_recents".to_string()]);
        assert_eq!(artifact.best_name, "Untitled-1.md");
        assert_eq!(artifact.timeline.len(), 2);
        assert!(artifact.timeline[0].at_ms <= artifact.timeline[1].at_ms);
    }

    #[test]
    fn test_best_name_prefers_hinted_real_path() {
        let mut hinted = member("tmp_scan", "/docs/real-draft.md", DAY_MS);
        hinted.content_hint = Some("# Draft".to_string());
        let members = vec![
            member("recents", "/tmp/other-name.md", DAY_MS),
            member("recents", "/tmp/other-name.md", DAY_MS + 1),
            hinted,
        ];
        assert_eq!(score(&members).unwrap().best_name, "real-draft.md");
    }

    #[test]
    fn test_best_name_falls_back_to_most_frequent_stem() {
        let members = vec![
            member("a", "/one/common.md", DAY_MS),
            member("b", "/two/common.md", DAY_MS + 1),
            member("c", "/three/rare.md", DAY_MS + 2),
        ];
        assert_eq!(score(&members).unwrap().best_name, "common.md");
    }

    #[test]
    fn test_preview_takes_longest_hint() {
        let mut a = member("a", "/tmp/a.md", DAY_MS);
        a.content_hint = Some("short".to_string());
        let mut b = member("b", "/tmp/a.md", DAY_MS + 1);
        b.content_hint = Some("a much longer preview".to_string());
        assert_eq!(score(&[a, b]).unwrap().preview.as_deref(), Some("a much longer preview"));
    }

    #[test]
    fn test_origin_apps_prefer_extrinsic_app() {
        let mut a = member("tmp_scan", "/tmp/a.md", DAY_MS);
        a.extrinsic.insert("app".to_string(), "TextEdit".to_string());
        let b = member("vscode_recents", "/tmp/a.md", DAY_MS + 1);
        assert_eq!(score(&[a, b]).unwrap().origin_apps, vec!["TextEdit".to_string()]);
    }

    #[test]
    fn test_timeline_excludes_suspect_stamps() {
        let mut a = member("a", "/tmp/a.md", DAY_MS);
        a.stamps.push(Stamp { kind: StampKind::Created, at_ms: 0, suspect: true });
        let b = member("b", "/tmp/a.md", DAY_MS + 1);

        let artifact = score(&[a, b]).unwrap();
        assert_eq!(artifact.timeline.len(), 2, "suspect stamps stay off the timeline");
    }

    #[test]
    fn test_rescore_is_wholesale_replacement() {
        // Scoring twice with one more member yields a self-consistent new
        // artifact, not a patched old one
        let a = member("a", "/tmp/a.md", DAY_MS);
        let b = member("b", "/tmp/a.md", DAY_MS + HOUR_MS);
        let c = member("c", "/tmp/a.md", DAY_MS + 2 * HOUR_MS);

        let before = score(&[a.clone(), b.clone()]).unwrap();
        let after = score(&[a, b, c]).unwrap();
        assert_eq!(after.timeline.len(), 3);
        assert!(after.confidence.value() >= before.confidence.value());
    }
}
