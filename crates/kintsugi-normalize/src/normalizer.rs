//! The Normalizer: deterministic record cleanup and signature derivation

use crate::config::NormalizeConfig;
use crate::error::NormalizeError;
use kintsugi_domain::{
    EvidenceRecord, ObservedPath, PathSignature, RejectReason, RejectedRecord,
};
use regex::Regex;

/// Bound on fixpoint iterations when applying strip rules to a filename.
/// Real temp names never nest deeper than two or three markers.
const MAX_STRIP_PASSES: usize = 8;

/// Result of normalizing one record
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// Record is clean and carries a derived path signature where possible
    Accepted(EvidenceRecord),
    /// Record is malformed; kept for the audit trail, never clustered
    Rejected(RejectedRecord),
}

/// Deterministic, pure record normalizer
///
/// `normalize` takes the wall clock as an argument so repeated runs over the
/// same input agree byte-for-byte.
pub struct Normalizer {
    config: NormalizeConfig,
    rules: Vec<Regex>,
}

impl Normalizer {
    /// Build a normalizer, compiling the configured strip rules
    pub fn new(config: NormalizeConfig) -> Result<Self, NormalizeError> {
        config.validate().map_err(NormalizeError::Config)?;

        let rules = config
            .strip_rules
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| NormalizeError::InvalidRule {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { config, rules })
    }

    /// Normalizer with the default rule set
    pub fn with_defaults() -> Self {
        // The default rule set is known-good; a compile failure here is a bug
        // in this crate, not a runtime condition.
        match Self::new(NormalizeConfig::default()) {
            Ok(n) => n,
            Err(e) => unreachable!("default strip rules failed to compile: {}", e),
        }
    }

    /// Normalize one record: canonicalize its path, derive the signature,
    /// clamp timestamps, or reject it with a reason code
    pub fn normalize(&self, record: EvidenceRecord, now_ms: u64) -> NormalizeOutcome {
        if record.source_id.trim().is_empty() {
            return self.reject(record, RejectReason::EmptySourceId);
        }
        if record.observed_path.as_str().trim().is_empty() {
            return self.reject(record, RejectReason::EmptyPath);
        }
        if record.stamps.is_empty() && !record.has_content_evidence() {
            return self.reject(record, RejectReason::NoObservations);
        }

        let mut record = record;

        // Canonicalize real paths; synthetic identifiers pass through as-is
        if let ObservedPath::Real(raw) = &record.observed_path {
            let components = self.canonical_components(raw);
            if components.is_empty() {
                return self.reject(record, RejectReason::EmptyPath);
            }
            record.path_signature = Some(self.signature_from(&components));
            record.observed_path = ObservedPath::Real(format!("/{}", components.join("/")));
        }

        // Clamp timestamps: out-of-range instants are flagged, never dropped
        let ceiling = now_ms.saturating_add(self.config.skew_tolerance_ms);
        for stamp in &mut record.stamps {
            if stamp.at_ms == 0 || stamp.at_ms > ceiling {
                if !stamp.suspect {
                    tracing::debug!(
                        record = %record.id,
                        at_ms = stamp.at_ms,
                        "flagging out-of-range timestamp as suspect"
                    );
                }
                stamp.suspect = true;
            }
        }

        NormalizeOutcome::Accepted(record)
    }

    fn reject(&self, record: EvidenceRecord, reason: RejectReason) -> NormalizeOutcome {
        tracing::debug!(record = %record.id, source = %record.source_id, %reason, "rejecting record");
        NormalizeOutcome::Rejected(RejectedRecord { record, reason })
    }

    /// Lexical path canonicalization: separators unified, volume prefixes
    /// stripped, `.`/`..` resolved, optional lowercasing
    fn canonical_components(&self, raw: &str) -> Vec<String> {
        let mut s = raw.replace('\\', "/");
        if self.config.case_insensitive {
            s = s.to_lowercase();
        }

        // Windows verbatim prefix, then drive letter
        let s = s.strip_prefix("//?/").unwrap_or(&s);
        let s = match s.split_once(':') {
            Some((drive, rest)) if drive.len() == 1 && drive.chars().all(|c| c.is_ascii_alphabetic()) => rest,
            _ => s,
        };

        let mut components: Vec<String> = Vec::new();
        for part in s.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                other => components.push(other.to_string()),
            }
        }

        // macOS mounted-volume prefix: /Volumes/<name>/rest -> rest
        if components.len() > 2 && components[0] == "Volumes" {
            components.drain(0..2);
        }

        components
    }

    fn signature_from(&self, components: &[String]) -> PathSignature {
        let (file_name, parents) = components
            .split_last()
            .map(|(last, rest)| (last.as_str(), rest.to_vec()))
            .unwrap_or(("", Vec::new()));
        PathSignature::new(parents, self.strip_stem(file_name))
    }

    /// Apply the strip rules to a filename until it stops changing
    pub fn strip_stem(&self, file_name: &str) -> String {
        let mut name = file_name.to_string();
        for _ in 0..MAX_STRIP_PASSES {
            let mut changed = false;
            for rule in &self.rules {
                let next = rule.replace_all(&name, "").into_owned();
                if next != name && !next.is_empty() {
                    name = next;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        name
    }
}
