//! Canonical identity of a suggested destination.
//!
//! Two suggestions are the same candidate when their existing path, their
//! new-folder flag and their new-folder names all match, no matter which
//! sample produced them.

use crate::suggestion::Suggestion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered between the existing path and the names to create.
const NEW_SEGMENT_MARKER: &str = "+new";

/// Ordered, hashable identity used to merge suggestions across samples.
///
/// `new_path` is `Some` exactly when the candidate proposes new folders, so
/// an existing folder never collides with a proposal to create one of the
/// same name. The derived ordering is lexical and doubles as the
/// deterministic tie-break in ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateKey {
    path: Vec<String>,
    new_path: Option<Vec<String>>,
}

impl CandidateKey {
    pub fn new(path: &[String], is_new_segment: bool, new_path: &[String]) -> Self {
        Self {
            path: path.to_vec(),
            new_path: is_new_segment.then(|| new_path.to_vec()),
        }
    }

    pub fn of(suggestion: &Suggestion) -> Self {
        Self::new(
            &suggestion.path,
            suggestion.is_new_segment,
            &suggestion.new_path,
        )
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn new_path(&self) -> Option<&[String]> {
        self.new_path.as_deref()
    }

    pub fn is_new_segment(&self) -> bool {
        self.new_path.is_some()
    }
}

impl From<&Suggestion> for CandidateKey {
    fn from(suggestion: &Suggestion) -> Self {
        Self::of(suggestion)
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments: Vec<&str> = self.path.iter().map(String::as_str).collect();
        if let Some(new_path) = &self.new_path {
            segments.push(NEW_SEGMENT_MARKER);
            segments.extend(new_path.iter().map(String::as_str));
        }
        if segments.is_empty() {
            return f.write_str("/");
        }
        f.write_str(&segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_existing_and_new_keys_differ() {
        let existing = CandidateKey::new(&names(&["Work", "Tax"]), false, &[]);
        let created = CandidateKey::new(&names(&["Work"]), true, &names(&["Tax"]));
        assert_ne!(existing, created);
        assert!(!existing.is_new_segment());
        assert!(created.is_new_segment());
    }

    #[test]
    fn test_new_path_depth_matters() {
        let one = CandidateKey::new(&names(&["Work"]), true, &names(&["Tax"]));
        let two = CandidateKey::new(&names(&["Work"]), true, &names(&["Tax", "2024"]));
        assert_ne!(one, two);
    }

    #[test]
    fn test_folder_named_like_marker_is_not_new() {
        let key = CandidateKey::new(&names(&["Work", "+new"]), false, &[]);
        assert!(!key.is_new_segment());
    }

    #[test]
    fn test_display() {
        let key = CandidateKey::new(&names(&["Work"]), true, &names(&["Tax", "2024"]));
        assert_eq!(key.to_string(), "Work/+new/Tax/2024");
        assert_eq!(CandidateKey::new(&[], false, &[]).to_string(), "/");
    }
}
