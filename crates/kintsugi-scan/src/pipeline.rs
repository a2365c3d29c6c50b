//! The scan pipeline: adapters -> normalize -> correlate -> score -> ingest
//!
//! One tokio task per enabled adapter, each under its own time budget; a
//! slow adapter degrades, a broken one fails, and the scan proceeds either
//! way. The collector drains the merged channel in arrival order - safe
//! because correlation re-sorts into a content-derived total order before
//! assigning anything - then applies the whole result as one transactional
//! batch.

use crate::adapter::{ScanContext, SourceAdapter};
use crate::adapters::{RecentsAdapter, TempScanAdapter};
use crate::config::KintsugiConfig;
use crate::error::ScanError;
use crate::summary::{ScanSummary, SourceReport, SourceStatus};
use kintsugi_correlate::{ClusterIndex, Correlator};
use kintsugi_domain::{
    ArtifactStore, EvidenceCluster, EvidenceRecord, IngestBatch, ReconstructedArtifact,
};
use kintsugi_normalize::{NormalizeOutcome, Normalizer};
use kintsugi_score::{score_cluster, ScoringWeights};
use kintsugi_store::{SqliteStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Ingest attempts before a busy database fails the batch
pub const DEFAULT_MAX_INGEST_ATTEMPTS: u32 = 4;

/// Base delay for ingest conflict backoff; doubles per attempt
const INGEST_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Capacity of the merged adapter channel
const CHANNEL_CAPACITY: usize = 256;

/// One configured, reusable pipeline
pub struct ScanPipeline {
    normalizer: Normalizer,
    correlator: Correlator,
    weights: ScoringWeights,
    temporal_window_ms: u64,
    adapter_timeout: Duration,
    max_ingest_attempts: u32,
}

impl ScanPipeline {
    /// Build a pipeline from configuration
    pub fn from_config(config: &KintsugiConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::new(config.normalize_config())?,
            correlator: Correlator::new(config.correlate_config())?,
            weights: config.scoring_weights,
            temporal_window_ms: config.correlate_config().temporal_window_ms,
            adapter_timeout: config.adapter_timeout(),
            max_ingest_attempts: DEFAULT_MAX_INGEST_ATTEMPTS,
        })
    }

    /// Run one scan: drive the adapters, fuse their evidence, persist the
    /// result. Always yields a summary; per-source failure never aborts.
    pub async fn run(
        &self,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: &mut SqliteStore,
        now_ms: u64,
    ) -> Result<ScanSummary, ScanError> {
        self.run_with_cancel(adapters, store, now_ms, CancellationToken::new())
            .await
    }

    /// Like [`ScanPipeline::run`], but cancellable mid-flight. Cancelling
    /// stops the adapters; evidence already collected is still normalized,
    /// correlated, and committed as a normal (smaller) batch.
    pub async fn run_with_cancel(
        &self,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: &mut SqliteStore,
        now_ms: u64,
        cancel: CancellationToken,
    ) -> Result<ScanSummary, ScanError> {
        let started = std::time::Instant::now();
        let mut index = rebuild_index(store)?;
        tracing::info!(
            clusters = index.len(),
            adapters = adapters.len(),
            "scan starting"
        );

        let (collected, sources) = self.drive_adapters(adapters, now_ms, cancel).await;

        // Normalize, keeping rejects for the audit trail
        let mut records = Vec::new();
        let mut rejected = Vec::new();
        for record in collected {
            match self.normalizer.normalize(record, now_ms) {
                NormalizeOutcome::Accepted(record) => records.push(record),
                NormalizeOutcome::Rejected(reject) => {
                    tracing::warn!(
                        source = %reject.record.source_id,
                        reason = %reject.reason,
                        "record rejected"
                    );
                    rejected.push(reject);
                }
            }
        }

        let records_processed = records.len();
        let records_rejected = rejected.len();

        let output = self.correlator.correlate(records, &mut index);
        let touched = output.touched_clusters();
        let artifacts = self.rescore(store, &index, &output.updates, &touched, now_ms)?;

        let summary_counts = (
            output.updates.iter().filter(|u| u.opened).count(),
            output.suggestions.len(),
            artifacts.len(),
            output.replayed,
        );

        let batch = IngestBatch {
            updates: output.updates,
            artifacts,
            suggestions: output.suggestions,
            rejected,
        };
        let rows_applied = self.ingest_with_retry(store, &batch).await?;

        let summary = ScanSummary {
            sources,
            records_processed,
            records_rejected,
            records_replayed: summary_counts.3,
            clusters_touched: touched.len(),
            clusters_opened: summary_counts.0,
            artifacts_materialized: summary_counts.2,
            merge_suggestions: summary_counts.1,
            rows_applied,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            processed = summary.records_processed,
            rejected = summary.records_rejected,
            touched = summary.clusters_touched,
            artifacts = summary.artifacts_materialized,
            applied = summary.rows_applied,
            "scan finished"
        );
        Ok(summary)
    }

    /// Spawn one task per adapter and drain the merged channel
    async fn drive_adapters(
        &self,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        now_ms: u64,
        cancel: CancellationToken,
    ) -> (Vec<EvidenceRecord>, Vec<SourceReport>) {
        let ctx = ScanContext::with_cancel(cancel);
        let (tx, mut rx) = mpsc::channel::<EvidenceRecord>(CHANNEL_CAPACITY);
        let timeout = self.adapter_timeout;

        let mut handles = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let tx = tx.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(drive_one(adapter, ctx, tx, now_ms, timeout)));
        }
        drop(tx);

        let mut collected = Vec::new();
        while let Some(record) = rx.recv().await {
            collected.push(record);
        }

        let mut sources = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => sources.push(report),
                Err(e) => sources.push(SourceReport {
                    source_id: "unknown".to_string(),
                    status: SourceStatus::Failed,
                    records_emitted: 0,
                    detail: Some(format!("adapter task panicked: {}", e)),
                }),
            }
        }
        (collected, sources)
    }

    /// Rescore every cluster that gained members this scan
    ///
    /// Members are the store's persisted set plus this batch's assignments;
    /// the batch is not ingested yet, so both halves are needed.
    fn rescore(
        &self,
        store: &SqliteStore,
        index: &ClusterIndex,
        updates: &[kintsugi_domain::ClusterUpdate],
        touched: &std::collections::BTreeSet<kintsugi_domain::ClusterId>,
        now_ms: u64,
    ) -> Result<Vec<ReconstructedArtifact>, StoreError> {
        let mut artifacts = Vec::new();
        for &cluster_id in touched {
            let mut members = store.cluster_members(cluster_id)?;
            members.extend(
                updates
                    .iter()
                    .filter(|u| u.cluster_id == cluster_id)
                    .map(|u| u.record.clone()),
            );

            let summary = match index.get(cluster_id) {
                Some(summary) => summary,
                None => continue,
            };
            let cluster = EvidenceCluster {
                id: cluster_id,
                members: members.iter().map(|r| r.id).collect(),
                representative_path: summary.representative_path.clone(),
                representative_hint: summary.representative_hint.clone(),
                created_at_ms: members.iter().map(|r| r.collected_at_ms).min().unwrap_or(now_ms),
            };

            if let Some(artifact) =
                score_cluster(&cluster, &members, &self.weights, self.temporal_window_ms, now_ms)
            {
                artifacts.push(artifact);
            }
        }
        Ok(artifacts)
    }

    /// Apply the batch, retrying with exponential backoff while the database
    /// is busy; any other error fails immediately
    async fn ingest_with_retry(
        &self,
        store: &mut SqliteStore,
        batch: &IngestBatch,
    ) -> Result<usize, ScanError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut attempt = 0;
        loop {
            match store.ingest(batch) {
                Ok(applied) => return Ok(applied),
                Err(StoreError::Conflict(message)) => {
                    attempt += 1;
                    if attempt >= self.max_ingest_attempts {
                        tracing::error!(attempt, %message, "ingest conflict, retries exhausted");
                        return Err(StoreError::Conflict(message).into());
                    }
                    let delay = INGEST_BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "ingest conflict, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Run one adapter under its time budget and report how it fared
async fn drive_one(
    adapter: Arc<dyn SourceAdapter>,
    ctx: ScanContext,
    tx: mpsc::Sender<EvidenceRecord>,
    now_ms: u64,
    timeout: Duration,
) -> SourceReport {
    let source_id = adapter.source_id().to_string();
    let field_map = adapter.field_map();
    let emitted = Arc::new(AtomicUsize::new(0));

    let (raw_tx, mut raw_rx) = mpsc::channel(64);
    let forward = {
        let emitted = Arc::clone(&emitted);
        let source_id = source_id.clone();
        async move {
            while let Some(raw) = raw_rx.recv().await {
                let record = field_map.to_record(&source_id, raw, now_ms);
                if tx.send(record).await.is_err() {
                    break;
                }
                emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
    };

    let work = async { tokio::join!(adapter.scan(ctx, raw_tx), forward).0 };
    let outcome = tokio::time::timeout(timeout, work).await;
    let records_emitted = emitted.load(Ordering::Relaxed);

    match outcome {
        Ok(Ok(())) => {
            tracing::debug!(source = %source_id, records_emitted, "adapter finished");
            SourceReport {
                source_id,
                status: SourceStatus::Succeeded,
                records_emitted,
                detail: None,
            }
        }
        Ok(Err(e)) => {
            tracing::error!(source = %source_id, error = %e, "adapter failed");
            SourceReport {
                source_id,
                status: SourceStatus::Failed,
                records_emitted,
                detail: Some(e.to_string()),
            }
        }
        Err(_) => {
            tracing::warn!(source = %source_id, budget_secs = timeout.as_secs(), "adapter timed out");
            SourceReport {
                source_id,
                status: SourceStatus::Degraded,
                records_emitted,
                detail: Some(format!("timed out after {}s", timeout.as_secs())),
            }
        }
    }
}

/// Load persisted clusters and their members into a fresh correlation index
fn rebuild_index(store: &SqliteStore) -> Result<ClusterIndex, StoreError> {
    let clusters = store.list_clusters()?;
    let mut entries = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let members = store.cluster_members(cluster.id)?;
        entries.push((cluster, members));
    }
    Ok(ClusterIndex::rebuild(entries))
}

/// Instantiate the built-in adapters the configuration enables
pub fn built_in_adapters(config: &KintsugiConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if config.source_enabled("tmp_scan") && !config.scan_roots.is_empty() {
        adapters.push(Arc::new(TempScanAdapter::new(config.scan_roots.clone())));
    }
    for recents in &config.recents_files {
        if config.source_enabled(&recents.source_id) {
            adapters.push(Arc::new(RecentsAdapter::new(
                recents.source_id.clone(),
                recents.path.clone(),
            )));
        }
    }
    adapters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_adapters_respect_enabled_sources() {
        let mut config = KintsugiConfig::default();
        config.recents_files.push(crate::config::RecentsSource {
            source_id: "vscode_recents".to_string(),
            path: "/tmp/recents.json".into(),
        });
        assert_eq!(built_in_adapters(&config).len(), 2);

        config.enabled_sources = vec!["vscode_recents".to_string()];
        let adapters = built_in_adapters(&config);
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].source_id(), "vscode_recents");
    }
}
