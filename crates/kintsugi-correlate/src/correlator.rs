//! The correlation pass: deterministic assignment of records to clusters

use crate::config::CorrelateConfig;
use crate::error::CorrelateError;
use crate::index::ClusterIndex;
use crate::similarity::token_set_similarity;
use kintsugi_domain::{
    ClusterId, ClusterUpdate, EvidenceRecord, MatchRule, MergeSuggestion,
};
use std::collections::{BTreeMap, BTreeSet};

/// Everything one correlation pass decided
#[derive(Debug, Default)]
pub struct CorrelationOutput {
    /// One member assignment per genuinely new record
    pub updates: Vec<ClusterUpdate>,
    /// Cross-cluster bridges, logged but never applied
    pub suggestions: Vec<MergeSuggestion>,
    /// Records skipped because their natural key was already clustered
    pub replayed: usize,
}

impl CorrelationOutput {
    /// Ids of every cluster that gained a member this pass
    pub fn touched_clusters(&self) -> BTreeSet<ClusterId> {
        self.updates.iter().map(|u| u.cluster_id).collect()
    }
}

/// A candidate cluster for one record, at the tier it matched
#[derive(Debug, Clone, Copy)]
struct Candidate {
    rule: MatchRule,
    member_count: usize,
}

/// The Correlation Engine
///
/// Pure over its inputs: given the same set of normalized records and the
/// same starting index, the final cluster assignment is identical regardless
/// of the order records arrived in (adapter completion order is not
/// controlled, so this is load-bearing, not a nicety).
pub struct Correlator {
    config: CorrelateConfig,
}

impl Correlator {
    /// Create a correlator with a validated configuration
    pub fn new(config: CorrelateConfig) -> Result<Self, CorrelateError> {
        config.validate().map_err(CorrelateError::Config)?;
        Ok(Self { config })
    }

    /// Correlator with default thresholds
    pub fn default_config() -> Self {
        Self { config: CorrelateConfig::default() }
    }

    /// The active configuration
    pub fn config(&self) -> &CorrelateConfig {
        &self.config
    }

    /// Assign a batch of normalized records to clusters
    ///
    /// Records are first sorted into the total order
    /// `(content_hash, path_signature, earliest stamp, source_id, id)` and
    /// then processed one at a time against the shared index.
    pub fn correlate(
        &self,
        mut records: Vec<EvidenceRecord>,
        index: &mut ClusterIndex,
    ) -> CorrelationOutput {
        records.sort_by_key(total_order_key);

        let mut output = CorrelationOutput::default();

        for record in records {
            let (source, path, at) = record.natural_key();
            let key = (source.to_string(), path.to_string(), at);
            if index.known_cluster(&key).is_some() {
                output.replayed += 1;
                continue;
            }

            let candidates = self.candidates(&record, index);

            let Some((&winner, winning)) = candidates
                .iter()
                .min_by_key(|(id, c)| (c.rule, std::cmp::Reverse(c.member_count), **id))
            else {
                // No candidate cleared the acceptance threshold: open a
                // singleton cluster
                let cluster_id = index.issue_cluster_id();
                index.insert_member(cluster_id, &record);
                output.updates.push(self.update_for(cluster_id, record, true, index));
                continue;
            };

            tracing::debug!(
                record = %record.id,
                cluster = %winner,
                rule = %winning.rule,
                "record matched existing cluster"
            );

            // Every other matched cluster is a bridge this record must not
            // merge; surface it for human review instead.
            for (&other, candidate) in candidates.iter().filter(|(id, _)| **id != winner) {
                tracing::warn!(
                    record = %record.id,
                    assigned = %winner,
                    other = %other,
                    rule = %candidate.rule,
                    "cross-cluster bridge detected; logging merge suggestion"
                );
                output.suggestions.push(MergeSuggestion {
                    record_id: record.id,
                    assigned_cluster: winner,
                    other_cluster: other,
                    rule: candidate.rule,
                    observed_at_ms: record.collected_at_ms,
                });
            }

            index.insert_member(winner, &record);
            output.updates.push(self.update_for(winner, record, false, index));
        }

        output
    }

    /// Candidate clusters for one record, best tier kept per cluster
    fn candidates(
        &self,
        record: &EvidenceRecord,
        index: &ClusterIndex,
    ) -> BTreeMap<ClusterId, Candidate> {
        fn note(found: &mut BTreeMap<ClusterId, Candidate>, id: ClusterId, rule: MatchRule, member_count: usize) {
            let entry = found.entry(id).or_insert(Candidate { rule, member_count });
            if rule < entry.rule {
                entry.rule = rule;
            }
        }

        let mut found: BTreeMap<ClusterId, Candidate> = BTreeMap::new();

        // Tier 1: exact content-hash match
        if let Some(hash) = record.content_hash.as_deref().filter(|h| !h.is_empty()) {
            for id in index.clusters_with_hash(hash) {
                let count = index.get(id).map_or(0, |s| s.member_count);
                note(&mut found, id, MatchRule::ContentHash, count);
            }
        }

        // Tier 2: exact path-signature match
        if let Some(sig) = &record.path_signature {
            for id in index.clusters_with_signature(&sig.canonical()) {
                let count = index.get(id).map_or(0, |s| s.member_count);
                note(&mut found, id, MatchRule::PathSignature, count);
            }
        }

        // Tier 3: fuzzy filename similarity gated by temporal proximity.
        // Needs both a stem to compare and a trusted instant to anchor on.
        if let (Some(sig), Some(at_ms)) = (&record.path_signature, record.earliest_stamp_ms()) {
            for summary in index.summaries() {
                if found.contains_key(&summary.id) {
                    continue;
                }
                let close_enough = summary
                    .temporal_distance(at_ms)
                    .is_some_and(|d| d <= self.config.temporal_window_ms);
                if !close_enough {
                    continue;
                }
                let similarity = summary
                    .stems
                    .iter()
                    .map(|stem| token_set_similarity(&sig.stem, stem))
                    .fold(0.0_f64, f64::max);
                if similarity >= self.config.fuzzy_match_threshold {
                    note(&mut found, summary.id, MatchRule::Fuzzy, summary.member_count);
                }
            }
        }

        found
    }

    fn update_for(
        &self,
        cluster_id: ClusterId,
        record: EvidenceRecord,
        opened: bool,
        index: &ClusterIndex,
    ) -> ClusterUpdate {
        let (representative_path, representative_hint) = index
            .get(cluster_id)
            .map(|s| (s.representative_path.clone(), s.representative_hint.clone()))
            .unwrap_or_else(|| (record.observed_path.as_str().to_string(), None));

        ClusterUpdate { cluster_id, record, opened, representative_path, representative_hint }
    }
}

/// The total order used to break all batch-internal ambiguity
fn total_order_key(record: &EvidenceRecord) -> (String, String, u64, String, kintsugi_domain::RecordId) {
    (
        record.content_hash.clone().unwrap_or_default(),
        record
            .path_signature
            .as_ref()
            .map(|s| s.canonical())
            .unwrap_or_default(),
        record.earliest_stamp_ms().unwrap_or(u64::MAX),
        record.source_id.clone(),
        record.id,
    )
}
