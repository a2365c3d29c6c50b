//! Configuration for the Normalizer

use serde::{Deserialize, Serialize};

/// Default tolerance for adapter clock skew (5 minutes)
pub const DEFAULT_SKEW_TOLERANCE_MS: u64 = 5 * 60 * 1000;

/// Configuration for the Normalizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Lowercase paths (set on case-insensitive filesystems only)
    pub case_insensitive: bool,

    /// Instants beyond wall-clock + this tolerance are flagged suspect
    pub skew_tolerance_ms: u64,

    /// Ordered regexes whose matches are removed from filenames when
    /// deriving the path signature stem; applied repeatedly until the name
    /// stops changing
    pub strip_rules: Vec<String>,
}

impl NormalizeConfig {
    /// Validate the configuration (rule compilation happens in
    /// `Normalizer::new`)
    pub fn validate(&self) -> Result<(), String> {
        if self.strip_rules.iter().any(|r| r.trim().is_empty()) {
            return Err("strip_rules must not contain empty patterns".to_string());
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    /// Defaults cover the common editor/OS temp-file shapes:
    /// vim swap files, Office lock files, backup tildes, partial downloads,
    /// autosave tokens, and long random hex suffixes.
    fn default() -> Self {
        Self {
            case_insensitive: false,
            skew_tolerance_ms: DEFAULT_SKEW_TOLERANCE_MS,
            strip_rules: vec![
                // Leading hidden/lock markers: ".~draft.md", "~$report.docx"
                r"^\.~".to_string(),
                r"^~\$".to_string(),
                // Trailing backup tilde: "draft.md~"
                r"~$".to_string(),
                // Swap/temp/backup/partial-download extensions
                r"\.(?:swp|swo|swx|tmp|bak|orig|crdownload|partial|part|download)$".to_string(),
                // TextEdit/sandbox random tokens: "draft.md.sb-92f01a-Hx3kPz"
                r"\.sb-[0-9A-Za-z]+-[0-9A-Za-z]+".to_string(),
                // Autosave tokens: "draft-autosave3.md"
                r"-autosave\d*".to_string(),
                // Long random hex suffixes: "draft.md.3f9c02d1e4"
                r"\.[0-9a-f]{8,}$".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(NormalizeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_rule_rejected() {
        let config = NormalizeConfig {
            strip_rules: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
