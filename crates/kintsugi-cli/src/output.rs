//! Output formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::Result;
use colored::*;
use kintsugi_domain::{MergeSuggestion, ReconstructedArtifact, RejectedRecord};
use kintsugi_scan::{ScanSummary, SourceStatus};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// JSON for automation
    Json,
    /// IDs only
    Quiet,
}

impl From<CliFormat> for OutputFormat {
    fn from(f: CliFormat) -> Self {
        match f {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a list of artifacts.
    pub fn format_artifacts(&self, artifacts: &[ReconstructedArtifact]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<_> = artifacts.iter().map(artifact_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(artifacts
                .iter()
                .map(|a| a.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => self.format_artifacts_table(artifacts),
        }
    }

    fn format_artifacts_table(&self, artifacts: &[ReconstructedArtifact]) -> Result<String> {
        if artifacts.is_empty() {
            return Ok(self.colorize("No artifacts found.", "yellow"));
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Name", "Confidence", "Apps", "Events", "Newest", "Stale"]);

        for artifact in artifacts {
            let id = artifact.id.to_string();
            builder.push_record([
                &id[..8],
                &artifact.best_name,
                &format!("{}", artifact.confidence),
                &artifact.origin_apps.join(", "),
                &artifact.timeline.len().to_string(),
                &artifact
                    .newest_event_ms()
                    .map(format_instant)
                    .unwrap_or_else(|| "-".to_string()),
                if artifact.stale { "yes" } else { "" },
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        Ok(table.to_string())
    }

    /// Format one artifact in full: summary fields plus the timeline.
    pub fn format_artifact_detail(&self, artifact: &ReconstructedArtifact) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&artifact_json(artifact))?),
            OutputFormat::Quiet => Ok(artifact.id.to_string()),
            OutputFormat::Table => {
                let mut out = String::new();
                out.push_str(&format!("{}  {}\n", self.colorize("Artifact", "cyan"), artifact.id));
                out.push_str(&format!("Name:       {}\n", artifact.best_name));
                out.push_str(&format!("Confidence: {}\n", artifact.confidence));
                out.push_str(&format!("Apps:       {}\n", artifact.origin_apps.join(", ")));
                if let Some(preview) = &artifact.preview {
                    out.push_str(&format!("Preview:    {}\n", preview));
                }
                if artifact.stale {
                    out.push_str(&format!("{}\n", self.colorize("Stale (past retention horizon)", "yellow")));
                }

                let mut builder = Builder::default();
                builder.push_record(["When", "Event", "Source"]);
                for event in &artifact.timeline {
                    builder.push_record([
                        &format_instant(event.at_ms),
                        event.kind.as_str(),
                        &event.source_id,
                    ]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                out.push_str(&table.to_string());
                Ok(out)
            }
        }
    }

    /// Format merge suggestions.
    pub fn format_suggestions(&self, suggestions: &[MergeSuggestion]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(
                &suggestions
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "record_id": s.record_id.to_string(),
                            "assigned_cluster": s.assigned_cluster.to_string(),
                            "other_cluster": s.other_cluster.to_string(),
                            "rule": s.rule.as_str(),
                            "observed_at_ms": s.observed_at_ms,
                        })
                    })
                    .collect::<Vec<_>>(),
            )?),
            OutputFormat::Quiet => Ok(suggestions
                .iter()
                .map(|s| s.record_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if suggestions.is_empty() {
                    return Ok(self.colorize("No merge suggestions pending.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Record", "Assigned", "Also matched", "Via", "When"]);
                for s in suggestions {
                    builder.push_record([
                        &s.record_id.to_string()[..8],
                        &s.assigned_cluster.to_string()[..8],
                        &s.other_cluster.to_string()[..8],
                        s.rule.as_str(),
                        &format_instant(s.observed_at_ms),
                    ]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format the rejected-record audit trail.
    pub fn format_rejected(&self, rejected: &[RejectedRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rejected)?),
            OutputFormat::Quiet => Ok(rejected
                .iter()
                .map(|r| r.record.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if rejected.is_empty() {
                    return Ok(self.colorize("No rejected records.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Source", "Observed path", "Reason"]);
                for r in rejected {
                    builder.push_record([
                        &r.record.source_id,
                        r.record.observed_path.as_str(),
                        r.reason.as_str(),
                    ]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format a scan summary with per-source status lines.
    pub fn format_summary(&self, summary: &ScanSummary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(summary)?);
        }

        let mut out = String::new();
        for source in &summary.sources {
            let status = match source.status {
                SourceStatus::Succeeded => self.colorize(source.status.as_str(), "green"),
                SourceStatus::Degraded => self.colorize(source.status.as_str(), "yellow"),
                SourceStatus::Failed => self.colorize(source.status.as_str(), "red"),
            };
            out.push_str(&format!(
                "{:<20} {} ({} records)",
                source.source_id, status, source.records_emitted
            ));
            if let Some(detail) = &source.detail {
                out.push_str(&format!(" - {}", detail));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "{} processed, {} rejected, {} replayed\n",
            summary.records_processed, summary.records_rejected, summary.records_replayed
        ));
        out.push_str(&format!(
            "{} clusters touched ({} opened), {} artifacts, {} merge suggestions\n",
            summary.clusters_touched,
            summary.clusters_opened,
            summary.artifacts_materialized,
            summary.merge_suggestions
        ));
        out.push_str(&self.success(&format!(
            "scan finished in {}ms, {} rows applied",
            summary.elapsed_ms, summary.rows_applied
        )));
        Ok(out)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }
        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

/// JSON shape for one artifact; ids rendered as UUID strings.
pub fn artifact_json(artifact: &ReconstructedArtifact) -> serde_json::Value {
    serde_json::json!({
        "id": artifact.id.to_string(),
        "confidence": artifact.confidence.value(),
        "best_name": artifact.best_name,
        "preview": artifact.preview,
        "origin_apps": artifact.origin_apps,
        "timeline": artifact.timeline.iter().map(|e| {
            serde_json::json!({
                "at_ms": e.at_ms,
                "kind": e.kind.as_str(),
                "source_id": e.source_id,
            })
        }).collect::<Vec<_>>(),
        "stale": artifact.stale,
        "scored_at_ms": artifact.scored_at_ms,
    })
}

fn format_instant(at_ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(at_ms as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| at_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintsugi_domain::{ClusterId, Confidence, StampKind, TimelineEvent};

    fn artifact() -> ReconstructedArtifact {
        ReconstructedArtifact {
            id: ClusterId::new(),
            confidence: Confidence::new(0.78),
            best_name: "draft.md".to_string(),
            preview: Some("# Quarterly draft".to_string()),
            origin_apps: vec!["Code".to_string()],
            timeline: vec![TimelineEvent {
                at_ms: 1_700_000_000_000,
                kind: StampKind::Modified,
                source_id: "tmp_scan".to_string(),
            }],
            stale: false,
            scored_at_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_table_output_contains_fields() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let out = formatter.format_artifacts(&[artifact()]).unwrap();
        assert!(out.contains("draft.md"));
        assert!(out.contains("0.78"));
    }

    #[test]
    fn test_json_output_round_trips() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let a = artifact();
        let out = formatter.format_artifacts(&[a.clone()]).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["id"], a.id.to_string());
        assert_eq!(parsed[0]["timeline"][0]["kind"], "modified");
    }

    #[test]
    fn test_quiet_output_is_ids_only() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let a = artifact();
        let out = formatter.format_artifacts(&[a.clone()]).unwrap();
        assert_eq!(out, a.id.to_string());
    }

    #[test]
    fn test_empty_table_message() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let out = formatter.format_artifacts(&[]).unwrap();
        assert!(out.contains("No artifacts"));
    }
}
