//! Recents-list adapter
//!
//! Parses an application's recently-opened JSON list into referenced-only
//! sightings: a path and an instant, no content. A document that exists
//! nowhere else on disk can still surface here, which is exactly the
//! evidence a deleted draft leaves behind.

use crate::adapter::{FieldMap, RawEvidence, ScanContext, SourceAdapter};
use crate::error::ScanError;
use kintsugi_domain::{Stamp, StampKind};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tokio::sync::mpsc;

/// One entry in a recents file: either a bare path string or an object with
/// a path and an optional timestamp
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecentsEntry {
    Bare(String),
    Detailed {
        path: String,
        #[serde(default)]
        opened_at_ms: Option<u64>,
        #[serde(default)]
        app: Option<String>,
    },
}

/// Adapter over one recents JSON file
///
/// The source id is configurable (one deployment may watch several apps'
/// lists); entries without their own timestamp borrow the list file's mtime,
/// a real upper bound on when the reference was written.
pub struct RecentsAdapter {
    source_id: String,
    path: PathBuf,
}

impl RecentsAdapter {
    /// Adapter reporting under `source_id`, reading `path`
    pub fn new(source_id: impl Into<String>, path: PathBuf) -> Self {
        Self {
            source_id: source_id.into(),
            path,
        }
    }

    fn unavailable(&self, message: String) -> ScanError {
        ScanError::SourceUnavailable {
            source_id: self.source_id.clone(),
            message,
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for RecentsAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn field_map(&self) -> FieldMap {
        FieldMap::path_only("path")
    }

    async fn scan(
        &self,
        ctx: ScanContext,
        tx: mpsc::Sender<RawEvidence>,
    ) -> Result<(), ScanError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.unavailable(format!("{}: {}", self.path.display(), e)))?;
        let entries: Vec<RecentsEntry> = serde_json::from_str(&text)
            .map_err(|e| self.unavailable(format!("{}: {}", self.path.display(), e)))?;

        let list_mtime_ms = tokio::fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);

        for entry in entries {
            if ctx.cancel.is_cancelled() {
                break;
            }

            let (path, opened_at_ms, app) = match entry {
                RecentsEntry::Bare(path) => (path, None, None),
                RecentsEntry::Detailed { path, opened_at_ms, app } => (path, opened_at_ms, app),
            };

            let mut raw = RawEvidence::default();
            raw.fields.insert("path".to_string(), path);
            if let Some(app) = app {
                raw.fields.insert("app".to_string(), app);
            }
            if let Some(at_ms) = opened_at_ms.or(list_mtime_ms) {
                raw.stamps.push(Stamp::new(StampKind::Referenced, at_ms));
            }

            if tx.send(raw).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(json: &str) -> Vec<RawEvidence> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recents.json");
        std::fs::write(&path, json).unwrap();

        let adapter = RecentsAdapter::new("vscode_recents", path);
        let (tx, mut rx) = mpsc::channel(16);
        adapter.scan(ScanContext::new(), tx).await.unwrap();

        let mut seen = Vec::new();
        while let Some(raw) = rx.recv().await {
            seen.push(raw);
        }
        seen
    }

    #[tokio::test]
    async fn test_mixed_entry_shapes() {
        let seen = run(
            r#"[
                "/home/me/notes/draft.md",
                {"path": "/home/me/report.md", "opened_at_ms": 1700000000000, "app": "Code"}
            ]"#,
        )
        .await;

        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0].fields.get("path").map(String::as_str),
            Some("/home/me/notes/draft.md")
        );
        // Bare entries borrow the list file's mtime
        assert_eq!(seen[0].stamps.len(), 1);
        assert_eq!(seen[0].stamps[0].kind, StampKind::Referenced);

        assert_eq!(seen[1].stamps[0].at_ms, 1_700_000_000_000);
        assert_eq!(seen[1].fields.get("app").map(String::as_str), Some("Code"));
        // Path-only sources carry no content evidence
        assert!(!seen[1].fields.contains_key("sha256"));
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let adapter = RecentsAdapter::new("vscode_recents", PathBuf::from("/nonexistent.json"));
        let (tx, _rx) = mpsc::channel(4);
        let err = adapter.scan(ScanContext::new(), tx).await.unwrap_err();
        assert!(matches!(err, ScanError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recents.json");
        std::fs::write(&path, "{not json").unwrap();

        let adapter = RecentsAdapter::new("vscode_recents", path);
        let (tx, _rx) = mpsc::channel(4);
        let err = adapter.scan(ScanContext::new(), tx).await.unwrap_err();
        assert!(matches!(err, ScanError::SourceUnavailable { .. }));
    }
}
