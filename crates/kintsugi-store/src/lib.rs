//! Kintsugi Storage Layer
//!
//! SQLite-backed implementation of the [`ArtifactStore`] trait.
//!
//! # Architecture
//!
//! - One `records` table of immutable observations, deduplicated on the
//!   natural key `(source_id, observed_path, collected_at)` so replayed
//!   scans are idempotent
//! - Append-only `cluster_members` with a uniqueness constraint (a record
//!   belongs to at most one cluster)
//! - `artifacts` replaced wholesale on rescore; the retention sweep only
//!   ever marks them stale
//! - `ingest` runs inside a single transaction: a batch commits completely
//!   or not at all, so a crash mid-scan can never leave a half-merged
//!   cluster behind
//!
//! On open the store checks its own invariants and refuses to start on a
//! violation - silently "repairing" forensic state could destroy evidence.
//!
//! # Examples
//!
//! ```no_run
//! use kintsugi_store::SqliteStore;
//!
//! let store = SqliteStore::open("kintsugi.db").unwrap();
//! // Store is now ready for ingest and queries
//! ```

#![warn(missing_docs)]

use kintsugi_domain::{
    ArtifactQuery, ArtifactStore, ClusterId, Confidence, EvidenceCluster, EvidenceRecord,
    IngestBatch, MatchRule, MergeSuggestion, ObservedPath, PathSignature, RecordId,
    ReconstructedArtifact, RejectReason, RejectedRecord, Stamp, TimelineEvent,
};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// Concurrent access conflict (busy/locked database); retryable
    #[error("Store conflict: {0}")]
    Conflict(String),

    /// Invalid data in a batch or a row
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Persisted state violates a store invariant; fatal for this run
    #[error("Corrupt persisted state: {0}")]
    Corrupt(String),

    /// JSON (de)serialization error for a stored column
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                StoreError::Conflict(e.to_string())
            }
            _ => StoreError::Database(e),
        }
    }
}

/// SQLite-based implementation of [`ArtifactStore`]
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe; each worker needs its own
/// `SqliteStore`. The single-writer discipline for durable state is the
/// `ingest` transaction itself.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    ///
    /// Use [`SqliteStore::in_memory`] for tests.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory store
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(include_str!("schema.sql"))?;
        let store = Self { conn };
        store.check_invariants()?;
        Ok(store)
    }

    /// Verify structural invariants; any violation is fatal for the run.
    /// Repairing silently could destroy evidence lineage, so we refuse.
    fn check_invariants(&self) -> Result<(), StoreError> {
        let orphan_members: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cluster_members m
             LEFT JOIN records r ON m.record_id = r.id
             WHERE r.id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if orphan_members > 0 {
            return Err(StoreError::Corrupt(format!(
                "{} cluster memberships reference missing records",
                orphan_members
            )));
        }

        let orphan_clusters: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cluster_members m
             LEFT JOIN clusters c ON m.cluster_id = c.id
             WHERE c.id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if orphan_clusters > 0 {
            return Err(StoreError::Corrupt(format!(
                "{} cluster memberships reference missing clusters",
                orphan_clusters
            )));
        }

        let orphan_artifacts: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM artifacts a
             LEFT JOIN clusters c ON a.cluster_id = c.id
             WHERE c.id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if orphan_artifacts > 0 {
            return Err(StoreError::Corrupt(format!(
                "{} artifacts reference missing clusters",
                orphan_artifacts
            )));
        }

        Ok(())
    }

    fn id_to_bytes(value: u128) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn bytes_to_u128(bytes: &[u8]) -> Result<u128, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for an id, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    fn apply_update(
        tx: &Transaction<'_>,
        update: &kintsugi_domain::ClusterUpdate,
    ) -> Result<usize, StoreError> {
        let cluster_bytes = Self::id_to_bytes(update.cluster_id.value());
        let record = &update.record;

        if update.opened {
            tx.execute(
                "INSERT OR IGNORE INTO clusters (id, representative_path, representative_hint, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    &cluster_bytes,
                    &update.representative_path,
                    &update.representative_hint,
                    record.collected_at_ms as i64,
                ],
            )?;
        } else {
            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM clusters WHERE id = ?1",
                    params![&cluster_bytes],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);
            if !exists {
                return Err(StoreError::InvalidData(format!(
                    "update targets unknown cluster {}",
                    update.cluster_id
                )));
            }
        }

        // Representatives are derived state, recomputed on every merge
        tx.execute(
            "UPDATE clusters SET representative_path = ?2, representative_hint = ?3 WHERE id = ?1",
            params![&cluster_bytes, &update.representative_path, &update.representative_hint],
        )?;

        // Dedup the record on its natural key: a replayed observation reuses
        // the already-stored record row
        let existing: Option<Vec<u8>> = tx
            .query_row(
                "SELECT id FROM records WHERE source_id = ?1 AND observed_path = ?2 AND collected_at = ?3",
                params![
                    &record.source_id,
                    record.observed_path.as_str(),
                    record.collected_at_ms as i64,
                ],
                |row| row.get(0),
            )
            .optional()?;

        let record_bytes = match existing {
            Some(bytes) => bytes,
            None => {
                let bytes = Self::id_to_bytes(record.id.value());
                tx.execute(
                    "INSERT INTO records
                     (id, source_id, observed_path, synthetic, path_signature, content_hint,
                      content_hash, stamps, extrinsic, collected_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        &bytes,
                        &record.source_id,
                        record.observed_path.as_str(),
                        record.observed_path.is_synthetic() as i64,
                        record.path_signature.as_ref().map(|s| s.canonical()),
                        &record.content_hint,
                        &record.content_hash,
                        serde_json::to_string(&record.stamps)?,
                        serde_json::to_string(&record.extrinsic)?,
                        record.collected_at_ms as i64,
                    ],
                )?;
                bytes
            }
        };

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO cluster_members (cluster_id, record_id, added_at)
             VALUES (?1, ?2, ?3)",
            params![&cluster_bytes, &record_bytes, record.collected_at_ms as i64],
        )?;

        Ok(inserted)
    }

    fn read_record(row: &rusqlite::Row<'_>) -> Result<EvidenceRecord, rusqlite::Error> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_u128(&id_bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e))
        })?;

        let source_id: String = row.get(1)?;
        let path: String = row.get(2)?;
        let synthetic: bool = row.get(3)?;
        let signature: Option<String> = row.get(4)?;
        let content_hint: Option<String> = row.get(5)?;
        let content_hash: Option<String> = row.get(6)?;
        let stamps_json: String = row.get(7)?;
        let extrinsic_json: String = row.get(8)?;
        let collected_at: i64 = row.get(9)?;

        let stamps: Vec<Stamp> = serde_json::from_str(&stamps_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let extrinsic = serde_json::from_str(&extrinsic_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(EvidenceRecord {
            id: RecordId::from_value(id),
            source_id,
            observed_path: if synthetic {
                ObservedPath::Synthetic(path)
            } else {
                ObservedPath::Real(path)
            },
            path_signature: signature.map(|s| PathSignature::from_canonical(&s)),
            content_hint,
            content_hash,
            stamps,
            extrinsic,
            collected_at_ms: collected_at as u64,
        })
    }

    fn read_artifact(row: &rusqlite::Row<'_>) -> Result<ReconstructedArtifact, rusqlite::Error> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_u128(&id_bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e))
        })?;

        let confidence: f64 = row.get(1)?;
        let best_name: String = row.get(2)?;
        let preview: Option<String> = row.get(3)?;
        let origin_json: String = row.get(4)?;
        let timeline_json: String = row.get(5)?;
        let stale: bool = row.get(6)?;
        let scored_at: i64 = row.get(7)?;

        let origin_apps: Vec<String> = serde_json::from_str(&origin_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let timeline: Vec<TimelineEvent> = serde_json::from_str(&timeline_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ReconstructedArtifact {
            id: ClusterId::from_value(id),
            confidence: Confidence::new(confidence),
            best_name,
            preview,
            origin_apps,
            timeline,
            stale,
            scored_at_ms: scored_at as u64,
        })
    }

    fn member_ids(&self, cluster_bytes: &[u8]) -> Result<Vec<RecordId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id FROM cluster_members WHERE cluster_id = ?1
             ORDER BY added_at, record_id",
        )?;
        let ids = stmt
            .query_map(params![cluster_bytes], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|bytes| Self::bytes_to_u128(bytes).map(RecordId::from_value))
            .collect()
    }

    fn read_cluster_row(
        &self,
        id_bytes: Vec<u8>,
        representative_path: String,
        representative_hint: Option<String>,
        created_at: i64,
    ) -> Result<EvidenceCluster, StoreError> {
        let members = self.member_ids(&id_bytes)?;
        Ok(EvidenceCluster {
            id: ClusterId::from_value(Self::bytes_to_u128(&id_bytes)?),
            members,
            representative_path,
            representative_hint,
            created_at_ms: created_at as u64,
        })
    }
}

impl ArtifactStore for SqliteStore {
    type Error = StoreError;

    fn ingest(&mut self, batch: &IngestBatch) -> Result<usize, Self::Error> {
        let tx = self.conn.transaction()?;
        let mut applied = 0;

        for update in &batch.updates {
            applied += Self::apply_update(&tx, update)?;
        }

        for artifact in &batch.artifacts {
            let oldest = artifact.timeline.iter().map(|e| e.at_ms).min();
            let newest = artifact.newest_event_ms();
            tx.execute(
                "INSERT OR REPLACE INTO artifacts
                 (cluster_id, confidence, best_name, preview, origin_apps, timeline,
                  stale, scored_at, oldest_event, newest_event)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    Self::id_to_bytes(artifact.id.value()),
                    artifact.confidence.value(),
                    &artifact.best_name,
                    &artifact.preview,
                    serde_json::to_string(&artifact.origin_apps)?,
                    serde_json::to_string(&artifact.timeline)?,
                    artifact.stale as i64,
                    artifact.scored_at_ms as i64,
                    oldest.map(|v| v as i64),
                    newest.map(|v| v as i64),
                ],
            )?;
        }

        for suggestion in &batch.suggestions {
            tx.execute(
                "INSERT OR IGNORE INTO merge_suggestions
                 (record_id, assigned_cluster, other_cluster, rule, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Self::id_to_bytes(suggestion.record_id.value()),
                    Self::id_to_bytes(suggestion.assigned_cluster.value()),
                    Self::id_to_bytes(suggestion.other_cluster.value()),
                    suggestion.rule.as_str(),
                    suggestion.observed_at_ms as i64,
                ],
            )?;
        }

        for rejected in &batch.rejected {
            tx.execute(
                "INSERT OR IGNORE INTO rejected_records
                 (record_id, source_id, observed_path, reason, collected_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Self::id_to_bytes(rejected.record.id.value()),
                    &rejected.record.source_id,
                    rejected.record.observed_path.as_str(),
                    rejected.reason.as_str(),
                    rejected.record.collected_at_ms as i64,
                    serde_json::to_string(&rejected.record)?,
                ],
            )?;
        }

        tx.commit()?;

        tracing::debug!(
            updates = batch.updates.len(),
            artifacts = batch.artifacts.len(),
            suggestions = batch.suggestions.len(),
            rejected = batch.rejected.len(),
            applied,
            "ingest committed"
        );

        Ok(applied)
    }

    fn get_artifact(&self, id: ClusterId) -> Result<Option<ReconstructedArtifact>, Self::Error> {
        let artifact = self
            .conn
            .query_row(
                "SELECT cluster_id, confidence, best_name, preview, origin_apps, timeline,
                        stale, scored_at
                 FROM artifacts WHERE cluster_id = ?1",
                params![Self::id_to_bytes(id.value())],
                Self::read_artifact,
            )
            .optional()?;
        Ok(artifact)
    }

    fn get_cluster(&self, id: ClusterId) -> Result<Option<EvidenceCluster>, Self::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT id, representative_path, representative_hint, created_at
                 FROM clusters WHERE id = ?1",
                params![Self::id_to_bytes(id.value())],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((bytes, path, hint, created_at)) => {
                Ok(Some(self.read_cluster_row(bytes, path, hint, created_at)?))
            }
            None => Ok(None),
        }
    }

    fn cluster_members(&self, id: ClusterId) -> Result<Vec<EvidenceRecord>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.source_id, r.observed_path, r.synthetic, r.path_signature,
                    r.content_hint, r.content_hash, r.stamps, r.extrinsic, r.collected_at
             FROM cluster_members m
             JOIN records r ON r.id = m.record_id
             WHERE m.cluster_id = ?1
             ORDER BY m.added_at, r.id",
        )?;
        let records = stmt
            .query_map(params![Self::id_to_bytes(id.value())], Self::read_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn list_clusters(&self) -> Result<Vec<EvidenceCluster>, Self::Error> {
        let rows = {
            let mut stmt = self.conn.prepare(
                "SELECT id, representative_path, representative_hint, created_at
                 FROM clusters ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|(bytes, path, hint, created_at)| self.read_cluster_row(bytes, path, hint, created_at))
            .collect()
    }

    fn list_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<ReconstructedArtifact>, Self::Error> {
        let mut sql = String::from(
            "SELECT a.cluster_id, a.confidence, a.best_name, a.preview, a.origin_apps,
                    a.timeline, a.stale, a.scored_at
             FROM artifacts a
             JOIN clusters c ON c.id = a.cluster_id
             WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !query.include_stale {
            sql.push_str(" AND a.stale = 0");
        }
        if let Some(prefix) = &query.signature_prefix {
            // Match against member signatures, not the representative: the
            // representative path may keep a temp suffix the signature strips
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM cluster_members m
                              JOIN records r ON r.id = m.record_id
                              WHERE m.cluster_id = a.cluster_id
                                AND r.path_signature LIKE ?)",
            );
            params.push(Box::new(format!("{}%", prefix.trim_start_matches('/'))));
        }
        if let Some(min) = query.min_confidence {
            sql.push_str(" AND a.confidence >= ?");
            params.push(Box::new(min));
        }
        if let Some(max) = query.max_confidence {
            sql.push_str(" AND a.confidence <= ?");
            params.push(Box::new(max));
        }
        if let Some(since) = query.since_ms {
            sql.push_str(" AND a.newest_event IS NOT NULL AND a.newest_event >= ?");
            params.push(Box::new(since as i64));
        }
        if let Some(until) = query.until_ms {
            sql.push_str(" AND a.oldest_event IS NOT NULL AND a.oldest_event <= ?");
            params.push(Box::new(until as i64));
        }

        sql.push_str(" ORDER BY a.confidence DESC, a.cluster_id ASC");

        if query.limit.is_some() || query.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(query.limit.map(|l| l as i64).unwrap_or(-1)));
            params.push(Box::new(query.offset.unwrap_or(0) as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let artifacts = stmt
            .query_map(&param_refs[..], Self::read_artifact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artifacts)
    }

    fn list_suggestions(&self) -> Result<Vec<MergeSuggestion>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, assigned_cluster, other_cluster, rule, observed_at
             FROM merge_suggestions ORDER BY observed_at, record_id",
        )?;
        let suggestions = stmt
            .query_map([], |row| {
                let record_bytes: Vec<u8> = row.get(0)?;
                let assigned_bytes: Vec<u8> = row.get(1)?;
                let other_bytes: Vec<u8> = row.get(2)?;
                let rule_str: String = row.get(3)?;
                let observed_at: i64 = row.get(4)?;

                let to_conv = |idx: usize, e: StoreError| {
                    rusqlite::Error::FromSqlConversionFailure(
                        idx,
                        rusqlite::types::Type::Blob,
                        Box::new(e),
                    )
                };
                let record_id = Self::bytes_to_u128(&record_bytes).map_err(|e| to_conv(0, e))?;
                let assigned = Self::bytes_to_u128(&assigned_bytes).map_err(|e| to_conv(1, e))?;
                let other = Self::bytes_to_u128(&other_bytes).map_err(|e| to_conv(2, e))?;
                let rule = MatchRule::parse(&rule_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;

                Ok(MergeSuggestion {
                    record_id: RecordId::from_value(record_id),
                    assigned_cluster: ClusterId::from_value(assigned),
                    other_cluster: ClusterId::from_value(other),
                    rule,
                    observed_at_ms: observed_at as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }

    fn list_rejected(&self) -> Result<Vec<RejectedRecord>, Self::Error> {
        let rows = {
            let mut stmt = self.conn.prepare(
                "SELECT payload, reason FROM rejected_records ORDER BY collected_at, record_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|(payload, reason_str)| {
                let record: EvidenceRecord = serde_json::from_str(&payload)?;
                let reason = RejectReason::parse(&reason_str).map_err(StoreError::InvalidData)?;
                Ok(RejectedRecord { record, reason })
            })
            .collect()
    }

    fn sweep_stale(&mut self, max_age_ms: u64, now_ms: u64) -> Result<usize, Self::Error> {
        let cutoff = now_ms.saturating_sub(max_age_ms);
        let marked = self.conn.execute(
            "UPDATE artifacts SET stale = 1
             WHERE stale = 0 AND newest_event IS NOT NULL AND newest_event < ?1",
            params![cutoff as i64],
        )?;
        if marked > 0 {
            tracing::info!(marked, cutoff, "retention sweep marked artifacts stale");
        }
        Ok(marked)
    }
}
