//! The source-adapter contract
//!
//! Adapters are producers, nothing more: they stream [`RawEvidence`] into a
//! channel and declare a [`FieldMap`] telling the pipeline which raw field
//! feeds which canonical record field. All cleanup, clustering, and scoring
//! happen downstream; an adapter never interprets its own evidence.

use crate::error::ScanError;
use kintsugi_domain::{EvidenceRecord, ObservedPath, RecordId, Stamp};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One raw observation as an adapter saw it: named string fields plus any
/// timestamps it could read. Field names are the adapter's own vocabulary.
#[derive(Debug, Clone, Default)]
pub struct RawEvidence {
    /// Raw field name -> value
    pub fields: BTreeMap<String, String>,
    /// Timestamps observed at the source (suspect-flagging happens later)
    pub stamps: Vec<Stamp>,
}

/// Declares which raw field feeds which canonical record field
///
/// Integrating a new source is a data-mapping exercise, not a subclassing
/// one: the pipeline applies the map mechanically, and every unmapped field
/// survives as extrinsic metadata.
#[derive(Debug, Clone)]
pub struct FieldMap {
    /// Raw field carrying the observed path (or synthetic identifier)
    pub path: String,
    /// Whether the path field is a synthetic identifier rather than a
    /// filesystem path
    pub synthetic: bool,
    /// Raw field carrying the content hint, if the source has one
    pub content_hint: Option<String>,
    /// Raw field carrying the content hash, if the source has one
    pub content_hash: Option<String>,
}

impl FieldMap {
    /// Map for a filesystem-like source with content evidence
    pub fn with_content(path: &str, hint: &str, hash: &str) -> Self {
        Self {
            path: path.to_string(),
            synthetic: false,
            content_hint: Some(hint.to_string()),
            content_hash: Some(hash.to_string()),
        }
    }

    /// Map for a metadata-only source (no hint, no hash)
    pub fn path_only(path: &str) -> Self {
        Self {
            path: path.to_string(),
            synthetic: false,
            content_hint: None,
            content_hash: None,
        }
    }

    /// Apply the map to one raw observation
    ///
    /// A missing path field yields a record with an empty observed path; the
    /// Normalizer rejects it with an audit reason rather than dropping it
    /// here silently.
    pub fn to_record(
        &self,
        source_id: &str,
        mut raw: RawEvidence,
        collected_at_ms: u64,
    ) -> EvidenceRecord {
        let path_value = raw.fields.remove(&self.path).unwrap_or_default();
        let observed_path = if self.synthetic {
            ObservedPath::Synthetic(path_value)
        } else {
            ObservedPath::Real(path_value)
        };

        let content_hint = self
            .content_hint
            .as_ref()
            .and_then(|f| raw.fields.remove(f))
            .filter(|v| !v.is_empty());
        let content_hash = self
            .content_hash
            .as_ref()
            .and_then(|f| raw.fields.remove(f))
            .filter(|v| !v.is_empty());

        EvidenceRecord {
            id: RecordId::new(),
            source_id: source_id.to_string(),
            observed_path,
            path_signature: None,
            content_hint,
            content_hash,
            stamps: raw.stamps,
            extrinsic: raw.fields,
            collected_at_ms,
        }
    }
}

/// Shared per-scan context handed to every adapter
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Cooperative cancellation; adapters should check it between units of
    /// work and stop promptly when it fires
    pub cancel: CancellationToken,
}

impl ScanContext {
    /// Context with a fresh cancellation token
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Context driven by an external token, e.g. a Ctrl-C handler
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of raw evidence
///
/// `scan` streams observations into `tx` and returns when the source is
/// exhausted. Send errors mean the collector went away; treat them as
/// cancellation, not failure.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source id recorded on every evidence record
    fn source_id(&self) -> &str;

    /// How this adapter's raw fields map onto a canonical record
    fn field_map(&self) -> FieldMap;

    /// Stream raw evidence until exhausted or cancelled
    async fn scan(
        &self,
        ctx: ScanContext,
        tx: mpsc::Sender<RawEvidence>,
    ) -> Result<(), ScanError>;
}
