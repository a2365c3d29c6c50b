//! End-to-end pipeline tests: real adapters over a temp directory, real
//! SQLite store, full normalize -> correlate -> score -> ingest flow.

use kintsugi_domain::{ArtifactQuery, ArtifactStore, StampKind};
use kintsugi_scan::adapter::{RawEvidence, ScanContext, SourceAdapter};
use kintsugi_scan::{
    built_in_adapters, FieldMap, KintsugiConfig, RecentsSource, ScanError, ScanPipeline,
    SourceStatus,
};
use kintsugi_store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// Config wired to a temp scan root and an optional recents file
fn config_for(root: PathBuf, recents: Option<PathBuf>) -> KintsugiConfig {
    let mut config = KintsugiConfig::default();
    config.scan_roots = vec![root];
    config.recents_files = recents
        .into_iter()
        .map(|path| RecentsSource {
            source_id: "vscode_recents".to_string(),
            path,
        })
        .collect();
    config
}

#[tokio::test]
async fn test_scan_fuses_swap_file_original_and_recents_entry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("draft.md"), "# Quarterly draft\nbody\n").unwrap();
    std::fs::write(dir.path().join(".~draft.md.swp"), "# Quarterly draft\nswap\n").unwrap();

    let recents_path = dir.path().join("recents.json");
    std::fs::write(
        &recents_path,
        format!(
            r#"[{{"path": "/home/me/notes/draft.md", "opened_at_ms": {}, "app": "Code"}}]"#,
            now_ms()
        ),
    )
    .unwrap();

    let config = config_for(dir.path().to_path_buf(), Some(recents_path.clone()));
    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    // The recents file itself is a .json inside the scanned root, so
    // tmp_scan observes it too: four records total, three of one document
    let summary = pipeline
        .run(built_in_adapters(&config), &mut store, now_ms())
        .await
        .unwrap();

    assert!(summary.all_sources_succeeded());
    assert_eq!(summary.records_rejected, 0);
    assert!(summary.records_processed >= 3);

    // The swap file, the original, and the recents sighting share one
    // cluster: same stripped stem, overlapping instants
    let artifacts = store.list_artifacts(&ArtifactQuery::default()).unwrap();
    let fused = artifacts
        .iter()
        .find(|a| a.best_name == "draft.md")
        .expect("fused draft.md artifact");
    assert!(fused.confidence.value() > 0.0);
    assert!(fused.origin_apps.contains(&"Code".to_string()));
    assert!(fused.timeline.iter().any(|e| e.kind == StampKind::Referenced));
    assert!(fused.timeline.iter().any(|e| e.kind == StampKind::Modified));

    let members = store.cluster_members(fused.id).unwrap();
    assert!(members.len() >= 3, "expected fusion, got {} members", members.len());
}

#[tokio::test]
async fn test_rescan_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("draft.md"), "# Draft\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "meeting notes\n").unwrap();

    let config = config_for(dir.path().to_path_buf(), None);
    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();
    let at = now_ms();

    let first = pipeline
        .run(built_in_adapters(&config), &mut store, at)
        .await
        .unwrap();
    assert_eq!(first.records_processed, 2);
    assert!(first.rows_applied >= 2);

    // Same wall clock, untouched files: every observation replays
    let second = pipeline
        .run(built_in_adapters(&config), &mut store, at)
        .await
        .unwrap();
    assert_eq!(second.rows_applied, 0);
    assert_eq!(second.records_replayed, 2);
    assert_eq!(second.clusters_touched, 0);

    assert_eq!(store.list_clusters().unwrap().len(), first.clusters_opened);
}

#[tokio::test]
async fn test_failed_source_does_not_abort_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("draft.md"), "# Draft\nbody\n").unwrap();

    let config = config_for(
        dir.path().to_path_buf(),
        Some(PathBuf::from("/nonexistent/recents.json")),
    );
    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = pipeline
        .run(built_in_adapters(&config), &mut store, now_ms())
        .await
        .unwrap();

    let failed = summary
        .sources
        .iter()
        .find(|s| s.source_id == "vscode_recents")
        .unwrap();
    assert_eq!(failed.status, SourceStatus::Failed);
    assert!(failed.detail.is_some());

    let walked = summary
        .sources
        .iter()
        .find(|s| s.source_id == "tmp_scan")
        .unwrap();
    assert_eq!(walked.status, SourceStatus::Succeeded);
    assert_eq!(summary.records_processed, 1);
    assert!(!store.list_artifacts(&ArtifactQuery::default()).unwrap().is_empty());
}

#[tokio::test]
async fn test_path_only_singleton_materializes_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let recents_path = dir.path().join("recents.json");
    std::fs::write(&recents_path, r#"["/home/me/ghost.md"]"#).unwrap();

    let mut config = config_for(dir.path().to_path_buf(), Some(recents_path));
    config.enabled_sources = vec!["vscode_recents".to_string()];

    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = pipeline
        .run(built_in_adapters(&config), &mut store, now_ms())
        .await
        .unwrap();

    // The sighting is kept as a cluster member, but a lone filename in a
    // list clears no evidence threshold
    assert_eq!(summary.records_processed, 1);
    assert_eq!(summary.clusters_opened, 1);
    assert_eq!(summary.artifacts_materialized, 0);
    assert!(store.list_artifacts(&ArtifactQuery::default()).unwrap().is_empty());
    assert_eq!(store.list_clusters().unwrap().len(), 1);
}

/// Adapter that never finishes; used to exercise the time budget
struct StuckAdapter;

#[async_trait::async_trait]
impl SourceAdapter for StuckAdapter {
    fn source_id(&self) -> &str {
        "stuck"
    }

    fn field_map(&self) -> FieldMap {
        FieldMap::path_only("path")
    }

    async fn scan(
        &self,
        _ctx: ScanContext,
        tx: mpsc::Sender<RawEvidence>,
    ) -> Result<(), ScanError> {
        let mut raw = RawEvidence::default();
        raw.fields.insert("path".to_string(), "/tmp/partial.md".to_string());
        let _ = tx.send(raw).await;
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Adapter that keeps producing until it is told to stop
struct EndlessAdapter;

#[async_trait::async_trait]
impl SourceAdapter for EndlessAdapter {
    fn source_id(&self) -> &str {
        "endless"
    }

    fn field_map(&self) -> FieldMap {
        FieldMap::with_content("path", "first_line", "sha256")
    }

    async fn scan(
        &self,
        ctx: ScanContext,
        tx: mpsc::Sender<RawEvidence>,
    ) -> Result<(), ScanError> {
        let mut n = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(std::time::Duration::from_millis(5)) => {
                    let mut raw = RawEvidence::default();
                    raw.fields.insert("path".to_string(), format!("/tmp/stream-{n}.md"));
                    raw.fields.insert("first_line".to_string(), "streamed".to_string());
                    raw.fields.insert("sha256".to_string(), format!("sha256:{n:08x}"));
                    raw.stamps.push(kintsugi_domain::Stamp::new(StampKind::Modified, now_ms()));
                    if tx.send(raw).await.is_err() {
                        return Ok(());
                    }
                    n += 1;
                }
            }
        }
    }
}

#[tokio::test]
async fn test_cancelled_scan_stops_sources_and_commits_what_it_has() {
    let config = config_for(PathBuf::from("/nonexistent"), None);
    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    let cancel = kintsugi_scan::CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = pipeline
        .run_with_cancel(vec![Arc::new(EndlessAdapter)], &mut store, now_ms(), cancel)
        .await
        .unwrap();

    // Cancellation is a clean stop, not a failure: the adapter finishes
    // within its budget and the partial evidence lands in one batch
    assert_eq!(summary.sources[0].status, SourceStatus::Succeeded);
    assert!(summary.records_processed >= 1);
    assert_eq!(summary.records_processed, summary.sources[0].records_emitted);
    assert_eq!(
        store.list_clusters().unwrap().len(),
        summary.clusters_opened
    );
    assert!(!store.list_artifacts(&ArtifactQuery::default()).unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_adapter_degrades_but_its_records_are_kept() {
    let mut config = config_for(PathBuf::from("/nonexistent"), None);
    config.adapter_timeout_secs = 1;

    let pipeline = ScanPipeline::from_config(&config).unwrap();
    let mut store = SqliteStore::in_memory().unwrap();

    let summary = pipeline
        .run(vec![Arc::new(StuckAdapter)], &mut store, now_ms())
        .await
        .unwrap();

    let stuck = &summary.sources[0];
    assert_eq!(stuck.status, SourceStatus::Degraded);
    assert_eq!(stuck.records_emitted, 1);
    // The record it got out before the deadline was rejected (no stamps, no
    // content) but still audited, not lost
    assert_eq!(summary.records_rejected, 1);
    assert_eq!(store.list_rejected().unwrap().len(), 1);
}
