//! Token-set filename similarity
//!
//! Filenames are split into lowercase alphanumeric runs and compared as
//! sets (Jaccard index). Token order and separators carry no signal in
//! recovered filenames (`My Draft-final.md` vs `my_draft_final.md.bak`),
//! so a set comparison beats edit distance here.

use std::collections::BTreeSet;

/// Split a filename into lowercase alphanumeric tokens
pub fn tokenize(name: &str) -> BTreeSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Jaccard similarity of the token sets of two filenames, in [0.0, 1.0]
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);

    if ta.is_empty() && tb.is_empty() {
        return 0.0;
    }

    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("My Draft-final.md");
        let expected: BTreeSet<String> =
            ["my", "draft", "final", "md"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_identical_names() {
        assert_eq!(token_set_similarity("draft.md", "draft.md"), 1.0);
    }

    #[test]
    fn test_separator_and_case_invariance() {
        assert_eq!(token_set_similarity("My Draft-final.md", "my_draft_final.md"), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        // {untitled, 1, md} vs {untitled, 2, md}: 2 shared of 4 total
        let sim = token_set_similarity("Untitled-1.md", "Untitled-2.md");
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_names() {
        assert_eq!(token_set_similarity("draft.md", "budget.xlsx"), 0.0);
    }

    #[test]
    fn test_empty_names() {
        assert_eq!(token_set_similarity("", ""), 0.0);
        assert_eq!(token_set_similarity("draft.md", ""), 0.0);
    }
}
