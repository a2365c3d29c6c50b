//! Path signatures - the primary join key across sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// A join key derived from an observed path
///
/// The parent components come from the canonicalized path; the stem is the
/// filename after the normalizer's suffix-strip rules. Two observations with
/// equal signatures are strong candidates for the same underlying document:
/// `/tmp/Untitled-1.md` and `/tmp/.~Untitled-1.md.swp` both produce
/// `tmp / Untitled-1.md`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathSignature {
    /// Parent path components, volume prefixes stripped
    pub components: Vec<String>,
    /// Filename with temp/random suffixes stripped
    pub stem: String,
}

impl PathSignature {
    /// Build a signature from parts
    pub fn new(components: Vec<String>, stem: impl Into<String>) -> Self {
        Self { components, stem: stem.into() }
    }

    /// Canonical string form, used as the storage column and prefix-query key
    pub fn canonical(&self) -> String {
        if self.components.is_empty() {
            self.stem.clone()
        } else {
            format!("{}/{}", self.components.join("/"), self.stem)
        }
    }

    /// Parse the canonical string form back into a signature
    pub fn from_canonical(s: &str) -> Self {
        let mut parts: Vec<String> = s.split('/').filter(|p| !p.is_empty()).map(String::from).collect();
        let stem = parts.pop().unwrap_or_default();
        Self { components: parts, stem }
    }
}

impl fmt::Display for PathSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let sig = PathSignature::new(
            vec!["tmp".to_string(), "notes".to_string()],
            "draft.md",
        );
        assert_eq!(sig.canonical(), "tmp/notes/draft.md");
        assert_eq!(PathSignature::from_canonical("tmp/notes/draft.md"), sig);
    }

    #[test]
    fn test_rootless_signature() {
        let sig = PathSignature::new(vec![], "draft.md");
        assert_eq!(sig.canonical(), "draft.md");
        assert_eq!(PathSignature::from_canonical("draft.md"), sig);
    }

    #[test]
    fn test_signature_ordering_is_stable() {
        let a = PathSignature::from_canonical("tmp/a.md");
        let b = PathSignature::from_canonical("tmp/b.md");
        assert!(a < b);
    }
}
