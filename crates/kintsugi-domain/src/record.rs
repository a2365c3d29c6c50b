//! Evidence records - the fundamental unit of observation

use crate::signature::PathSignature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for an evidence record, based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability (creation order == id order)
/// - 128-bit uniqueness with no coordination between adapters
/// - RFC 9562-standard string form for logs and exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u128);

impl RecordId {
    /// Generate a new UUIDv7-based RecordId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a RecordId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a RecordId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid record id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since the Unix epoch encoded in the UUIDv7
    pub fn timestamp_ms(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Best-known location of an observation
///
/// Sources that never saw a real filesystem path (cache blobs, carved
/// fragments) report a synthetic identifier instead; synthetic paths lose
/// every best-name tie-break against real ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ObservedPath {
    /// A filesystem path as reported by the adapter
    Real(String),
    /// A synthetic identifier for path-less evidence (e.g. `cache:0a3f…`)
    Synthetic(String),
}

impl ObservedPath {
    /// The path or identifier as a string
    pub fn as_str(&self) -> &str {
        match self {
            ObservedPath::Real(p) => p,
            ObservedPath::Synthetic(s) => s,
        }
    }

    /// Whether this is a synthetic identifier rather than a real path
    pub fn is_synthetic(&self) -> bool {
        matches!(self, ObservedPath::Synthetic(_))
    }

    /// Final path component, if any
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ObservedPath::Real(p) => p.rsplit('/').next().filter(|s| !s.is_empty()),
            ObservedPath::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for ObservedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of instant a source attached to an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampKind {
    /// Document was created
    Created,
    /// Document was modified
    Modified,
    /// Document was accessed/opened
    Accessed,
    /// Document was deleted
    Deleted,
    /// Document was referenced (e.g. appeared in a recents list)
    Referenced,
}

impl StampKind {
    /// Stable string form used in storage and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            StampKind::Created => "created",
            StampKind::Modified => "modified",
            StampKind::Accessed => "accessed",
            StampKind::Deleted => "deleted",
            StampKind::Referenced => "referenced",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "created" => Ok(StampKind::Created),
            "modified" => Ok(StampKind::Modified),
            "accessed" => Ok(StampKind::Accessed),
            "deleted" => Ok(StampKind::Deleted),
            "referenced" => Ok(StampKind::Referenced),
            _ => Err(format!("Unknown stamp kind: {}", s)),
        }
    }
}

impl fmt::Display for StampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (kind, instant) pair attached to a record
///
/// `suspect` is set by the normalizer for instants outside the sane range
/// (before the epoch, or past wall-clock plus skew tolerance). Suspect stamps
/// are retained for audit but excluded from correlation and timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// What the instant means
    pub kind: StampKind,
    /// Milliseconds since the Unix epoch
    pub at_ms: u64,
    /// Flagged out-of-range by the normalizer
    #[serde(default)]
    pub suspect: bool,
}

impl Stamp {
    /// A trusted stamp
    pub fn new(kind: StampKind, at_ms: u64) -> Self {
        Self { kind, at_ms, suspect: false }
    }
}

/// One immutable observation from one source about a possible document
///
/// Records are never mutated after creation; re-scans produce new records.
/// The natural identity of an observation is
/// `(source_id, observed_path, collected_at_ms)` - replaying the same
/// observation must not duplicate state downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Unique identifier
    pub id: RecordId,

    /// Adapter/origin that produced this record (e.g. "vscode_recents")
    pub source_id: String,

    /// Best-known path or synthetic identifier
    pub observed_path: ObservedPath,

    /// Join key derived by the normalizer; `None` until normalized or for
    /// synthetic paths with no usable filename
    pub path_signature: Option<PathSignature>,

    /// Optional short text/preview extracted from the source
    pub content_hint: Option<String>,

    /// Optional hash of recoverable content bytes
    pub content_hash: Option<String>,

    /// Timestamps the source attached; any subset may be present
    pub stamps: Vec<Stamp>,

    /// Adapter-specific key/value metadata (file size, app name, encoding)
    pub extrinsic: BTreeMap<String, String>,

    /// When the adapter collected this observation (epoch ms)
    pub collected_at_ms: u64,
}

impl EvidenceRecord {
    /// Minimal record: everything optional left empty
    pub fn new(source_id: impl Into<String>, observed_path: ObservedPath, collected_at_ms: u64) -> Self {
        Self {
            id: RecordId::new(),
            source_id: source_id.into(),
            observed_path,
            path_signature: None,
            content_hint: None,
            content_hash: None,
            stamps: Vec::new(),
            extrinsic: BTreeMap::new(),
            collected_at_ms,
        }
    }

    /// Natural identity used for idempotent replay
    pub fn natural_key(&self) -> (&str, &str, u64) {
        (&self.source_id, self.observed_path.as_str(), self.collected_at_ms)
    }

    /// Earliest trusted instant, if any
    pub fn earliest_stamp_ms(&self) -> Option<u64> {
        self.stamps
            .iter()
            .filter(|s| !s.suspect)
            .map(|s| s.at_ms)
            .min()
    }

    /// Whether this record carries actual content evidence (hash or hint),
    /// as opposed to being a bare filename sighting
    pub fn has_content_evidence(&self) -> bool {
        self.content_hash.as_deref().is_some_and(|h| !h.is_empty())
            || self.content_hint.as_deref().is_some_and(|h| !h.is_empty())
    }
}
