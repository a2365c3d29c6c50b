//! Filesystem adapter for orphaned temp and autosave files
//!
//! Walks the configured roots looking for text-like leftovers: editor swap
//! files, autosaves, backup tildes, partial downloads. Binary files, cloud
//! placeholders, and symlinks are skipped; a per-scan byte budget bounds the
//! damage on pathological trees.

use crate::adapter::{FieldMap, RawEvidence, ScanContext, SourceAdapter};
use crate::error::ScanError;
use kintsugi_domain::{Stamp, StampKind};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Extensions worth probing; everything else is skipped without a read
const TEXT_EXTS: &[&str] = &[
    "txt", "md", "markdown", "rst", "json", "yaml", "yml", "toml", "log", "bak", "tmp", "swp",
];

/// Head sample read for the text-likeness probe
const SAMPLE_BYTES: usize = 4096;

/// Default cap on bytes read per scan (300 MB)
pub const DEFAULT_BYTE_BUDGET: u64 = 300 * 1024 * 1024;

/// Longest content hint kept from a file's first line
const MAX_HINT_CHARS: usize = 120;

/// Built-in filesystem adapter, `source_id = "tmp_scan"`
pub struct TempScanAdapter {
    roots: Vec<PathBuf>,
    byte_budget: u64,
}

impl TempScanAdapter {
    /// Adapter over the given roots with the default byte budget
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            byte_budget: DEFAULT_BYTE_BUDGET,
        }
    }

    /// Override the per-scan byte budget
    pub fn with_byte_budget(mut self, byte_budget: u64) -> Self {
        self.byte_budget = byte_budget;
        self
    }
}

#[async_trait::async_trait]
impl SourceAdapter for TempScanAdapter {
    fn source_id(&self) -> &str {
        "tmp_scan"
    }

    fn field_map(&self) -> FieldMap {
        FieldMap::with_content("path", "first_line", "sha256")
    }

    async fn scan(
        &self,
        ctx: ScanContext,
        tx: mpsc::Sender<RawEvidence>,
    ) -> Result<(), ScanError> {
        let roots = self.roots.clone();
        let byte_budget = self.byte_budget;

        // The walk is blocking I/O; keep it off the async workers
        let handle = tokio::task::spawn_blocking(move || {
            walk_roots(&roots, byte_budget, &ctx, &tx);
        });
        handle.await.map_err(|e| ScanError::SourceUnavailable {
            source_id: "tmp_scan".to_string(),
            message: format!("walk task failed: {}", e),
        })
    }
}

fn walk_roots(
    roots: &[PathBuf],
    byte_budget: u64,
    ctx: &ScanContext,
    tx: &mpsc::Sender<RawEvidence>,
) {
    let mut bytes_read: u64 = 0;
    let mut emitted = 0usize;
    let mut skipped_binary = 0usize;
    let mut skipped_cloud = 0usize;

    'roots: for root in roots {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "scan root does not exist, skipping");
            continue;
        }

        for entry in WalkDir::new(root).follow_links(false).into_iter().filter_map(|e| e.ok()) {
            if ctx.cancel.is_cancelled() {
                tracing::debug!("scan cancelled mid-walk");
                break 'roots;
            }
            if bytes_read >= byte_budget {
                tracing::warn!(bytes_read, byte_budget, "byte budget exhausted, stopping walk");
                break 'roots;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !extension_allowed(path) {
                continue;
            }
            if is_cloud_placeholder(path) {
                skipped_cloud += 1;
                continue;
            }

            match probe_file(path, byte_budget - bytes_read) {
                Some(probe) => {
                    bytes_read += probe.bytes_read;
                    let raw = raw_evidence(path, &entry, probe);
                    if tx.blocking_send(raw).is_err() {
                        // Collector went away; treat as cancellation
                        break 'roots;
                    }
                    emitted += 1;
                }
                None => {
                    skipped_binary += 1;
                }
            }
        }
    }

    tracing::info!(emitted, skipped_binary, skipped_cloud, bytes_read, "tmp_scan walk finished");
}

struct FileProbe {
    text: String,
    sha256: String,
    size: u64,
    bytes_read: u64,
}

/// Read and probe one candidate; `None` means unreadable, over budget, or
/// not text-like
fn probe_file(path: &Path, remaining_budget: u64) -> Option<FileProbe> {
    // Stat before reading so an oversized file never costs a full slurp
    if std::fs::metadata(path).ok()?.len() > remaining_budget {
        return None;
    }

    let sample = read_head(path, SAMPLE_BYTES)?;
    if sample.is_empty() || !looks_like_text(&sample) {
        return None;
    }

    // Full read for the content hash; re-check in case the file grew
    let data = std::fs::read(path).ok()?;
    if data.len() as u64 > remaining_budget {
        return None;
    }
    let text = decode_text(&data)?;

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = format!("sha256:{:x}", hasher.finalize());

    Some(FileProbe {
        text,
        sha256,
        size: data.len() as u64,
        bytes_read: data.len() as u64,
    })
}

fn raw_evidence(path: &Path, entry: &walkdir::DirEntry, probe: FileProbe) -> RawEvidence {
    let mut raw = RawEvidence::default();
    raw.fields.insert("path".to_string(), path.to_string_lossy().into_owned());
    raw.fields.insert("sha256".to_string(), probe.sha256);
    raw.fields.insert("size".to_string(), probe.size.to_string());
    if let Some(line) = first_line(&probe.text) {
        raw.fields.insert("first_line".to_string(), line);
    }

    if let Ok(meta) = entry.metadata() {
        if let Some(at_ms) = system_time_ms(meta.modified().ok()) {
            raw.stamps.push(Stamp::new(StampKind::Modified, at_ms));
        }
        if let Some(at_ms) = system_time_ms(meta.created().ok()) {
            raw.stamps.push(Stamp::new(StampKind::Created, at_ms));
        }
        if let Some(at_ms) = system_time_ms(meta.accessed().ok()) {
            raw.stamps.push(Stamp::new(StampKind::Accessed, at_ms));
        }
    }
    raw
}

fn extension_allowed(path: &Path) -> bool {
    // A trailing backup tilde hides the real extension: "draft.md~"
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let trimmed = name.trim_end_matches('~');
    Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEXT_EXTS.contains(&e.to_ascii_lowercase().as_str()))
}

fn is_cloud_placeholder(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    name.ends_with(".icloud") || name.ends_with(".cloud") || name.starts_with(".cloudf")
}

fn read_head(path: &Path, limit: usize) -> Option<Vec<u8>> {
    use std::io::Read;
    let mut file = std::fs::File::open(path).ok()?;
    let mut buf = vec![0u8; limit];
    let n = file.read(&mut buf).ok()?;
    buf.truncate(n);
    Some(buf)
}

/// A sample is text when it decodes cleanly with no embedded NUL
/// characters; NUL-riddled decodings are binaries (images, executables)
fn looks_like_text(sample: &[u8]) -> bool {
    !sample.is_empty() && decode_text(sample).is_some()
}

fn decode_text(data: &[u8]) -> Option<String> {
    // ASCII-range UTF-16 is also valid UTF-8 (every other byte a NUL), so
    // an embedded NUL sends us to the UTF-16 readings instead
    match std::str::from_utf8(data) {
        Ok(s) if !s.contains('\0') => return Some(s.to_string()),
        _ => {}
    }
    decode_utf16(data, u16::from_le_bytes)
        .or_else(|| decode_utf16(data, u16::from_be_bytes))
        .filter(|s| !s.contains('\0'))
}

fn decode_utf16(data: &[u8], from_bytes: fn([u8; 2]) -> u16) -> Option<String> {
    // Odd trailing byte just means the sample cut a code unit in half
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();
    if units.is_empty() {
        return None;
    }
    String::from_utf16(&units).ok()
}

fn first_line(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let capped: String = line.chars().take(MAX_HINT_CHARS).collect();
    Some(capped)
}

fn system_time_ms(time: Option<SystemTime>) -> Option<u64> {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(extension_allowed(Path::new("/tmp/draft.md")));
        assert!(extension_allowed(Path::new("/tmp/.~draft.md.swp")));
        assert!(extension_allowed(Path::new("/tmp/draft.md~")));
        assert!(extension_allowed(Path::new("/tmp/notes.TXT")));
        assert!(!extension_allowed(Path::new("/tmp/photo.jpg")));
        assert!(!extension_allowed(Path::new("/tmp/no_extension")));
    }

    #[test]
    fn test_cloud_placeholder_detection() {
        assert!(is_cloud_placeholder(Path::new("/x/draft.md.icloud")));
        assert!(is_cloud_placeholder(Path::new("/x/report.docx.CLOUD")));
        assert!(is_cloud_placeholder(Path::new("/x/.cloudf-token")));
        assert!(!is_cloud_placeholder(Path::new("/x/draft.md")));
    }

    #[test]
    fn test_text_probe() {
        assert!(looks_like_text(b"# Quarterly notes\nplain text"));
        assert!(!looks_like_text(&[0u8; 64]));

        // UTF-16 LE "hi"
        assert!(looks_like_text(&[0x68, 0x00, 0x69, 0x00]));

        // No NULs, but an unpaired surrogate in every decoding
        assert!(!looks_like_text(&[0xd8, 0xd8, 0x41, 0x41]));
    }

    #[test]
    fn test_utf16_decodes_to_real_text() {
        // Despite being half NUL bytes, UTF-16 content must yield the
        // actual characters, never the NUL-laced UTF-8 reading
        assert_eq!(decode_text(&[0x68, 0x00, 0x69, 0x00]).as_deref(), Some("hi"));

        let bom_le = [0xff, 0xfe, 0x68, 0x00, 0x69, 0x00];
        assert_eq!(decode_text(&bom_le).as_deref(), Some("\u{feff}hi"));
    }

    #[test]
    fn test_probe_skips_file_over_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.log");
        std::fs::write(&path, "x".repeat(64)).unwrap();

        assert!(probe_file(&path, 16).is_none());
        assert!(probe_file(&path, 64).is_some());
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n\n  # Title  \nbody"), Some("# Title".to_string()));
        assert_eq!(first_line("   \n\t\n"), None);
        let long = "x".repeat(500);
        assert_eq!(first_line(&long).unwrap().len(), MAX_HINT_CHARS);
    }

    #[tokio::test]
    async fn test_scan_emits_text_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("draft.md"), "# Draft\nbody\n").unwrap();
        std::fs::write(dir.path().join("blob.tmp"), [0u8; 256]).unwrap();
        std::fs::write(dir.path().join("photo.jpg"), [0xffu8, 0xd8, 0xff]).unwrap();

        let adapter = TempScanAdapter::new(vec![dir.path().to_path_buf()]);
        let (tx, mut rx) = mpsc::channel(16);
        adapter.scan(ScanContext::new(), tx).await.unwrap();

        let mut seen = Vec::new();
        while let Some(raw) = rx.recv().await {
            seen.push(raw);
        }
        assert_eq!(seen.len(), 1);
        let raw = &seen[0];
        assert!(raw.fields.get("path").unwrap().ends_with("draft.md"));
        assert_eq!(raw.fields.get("first_line").map(String::as_str), Some("# Draft"));
        assert!(raw.fields.get("sha256").unwrap().starts_with("sha256:"));
        assert!(raw.stamps.iter().any(|s| s.kind == StampKind::Modified));
    }

    #[tokio::test]
    async fn test_missing_root_is_not_an_error() {
        let adapter = TempScanAdapter::new(vec![PathBuf::from("/nonexistent/kintsugi-test")]);
        let (tx, mut rx) = mpsc::channel(4);
        adapter.scan(ScanContext::new(), tx).await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
