//! Taxonomy tree: the folder hierarchy items are filed into.
//!
//! The tree is plain recursive ownership: every node owns a sorted map of
//! its children. A leaf is a node with no children. The on-disk form is the
//! same shape as JSON, `{"Work": {"Invoices": {}}, "Personal": {}}`.
//!
//! The classification core only reads the tree. Generating it from a real
//! directory is handled by [`scan_directory`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write taxonomy {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid taxonomy JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scan root {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// A node in the taxonomy. Children are keyed by name, unique among siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyNode {
    children: BTreeMap<String, TaxonomyNode>,
}

impl TaxonomyNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, TaxonomyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, TaxonomyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let text = fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), TaxonomyError> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|source| TaxonomyError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn children(&self) -> &BTreeMap<String, TaxonomyNode> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&TaxonomyNode> {
        self.children.get(name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Insert (or reuse) a chain of descendants and return the deepest one.
    pub fn insert_path<I, S>(&mut self, path: I) -> &mut TaxonomyNode
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = self;
        for name in path {
            node = node.children.entry(name.into()).or_default();
        }
        node
    }

    /// Walk `path` from this node. The empty path resolves to `self`.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&TaxonomyNode> {
        let mut node = self;
        for name in path {
            node = node.children.get(name.as_ref())?;
        }
        Some(node)
    }

    pub fn contains_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        self.resolve(path).is_some()
    }

    /// Number of descendants (excluding this node).
    pub fn len(&self) -> usize {
        self.children.values().map(|c| 1 + c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.children
            .values()
            .map(|c| if c.is_leaf() { 1 } else { c.leaf_count() })
            .sum()
    }

    /// Depth of the deepest descendant; 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.children
            .values()
            .map(|c| 1 + c.depth())
            .max()
            .unwrap_or(0)
    }

    /// Indented, one-folder-per-line rendering for prompts.
    ///
    /// At most `max_lines` folders are listed; a trailing marker line states
    /// how many were left out.
    pub fn outline(&self, max_lines: usize) -> String {
        let mut lines = Vec::new();
        let mut omitted = 0usize;
        self.outline_into(0, max_lines, &mut lines, &mut omitted);
        if omitted > 0 {
            lines.push(format!("... ({omitted} more folders not shown)"));
        }
        lines.join("\n")
    }

    fn outline_into(
        &self,
        depth: usize,
        max_lines: usize,
        lines: &mut Vec<String>,
        omitted: &mut usize,
    ) {
        for (name, child) in &self.children {
            if lines.len() < max_lines {
                lines.push(format!("{}{}/", "  ".repeat(depth), name));
            } else {
                *omitted += 1;
            }
            child.outline_into(depth + 1, max_lines, lines, omitted);
        }
    }
}

// ============================================================================
// Directory scan
// ============================================================================

/// Options for building a taxonomy from a directory tree.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Maximum folder depth below the root. `None` is unlimited; `Some(0)`
    /// produces an empty tree.
    pub max_depth: Option<usize>,
    /// Folders that are listed as leaves but never descended into (project
    /// checkouts and the like). Relative entries are resolved against the root.
    pub stop_paths: BTreeSet<PathBuf>,
    /// Include folders whose name starts with `.`.
    pub include_hidden: bool,
}

impl ScanOptions {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_stop_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stop_paths.insert(path.into());
        self
    }
}

/// Build a taxonomy from the folders under `root`. Files are ignored.
///
/// Unreadable subdirectories are skipped with a warning rather than failing
/// the whole scan.
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Result<TaxonomyNode, TaxonomyError> {
    if !root.is_dir() {
        return Err(TaxonomyError::NotADirectory(root.to_path_buf()));
    }

    let stop_paths: BTreeSet<PathBuf> = options
        .stop_paths
        .iter()
        .map(|p| if p.is_relative() { root.join(p) } else { p.clone() })
        .collect();

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let include_hidden = options.include_hidden;
    let mut entries = walker.into_iter().filter_entry(move |e| {
        e.file_type().is_dir()
            && (include_hidden || !e.file_name().to_string_lossy().starts_with('.'))
    });

    let mut tree = TaxonomyNode::new();
    while let Some(next) = entries.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable folder during scan");
                continue;
            }
        };

        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        tree.insert_path(
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );

        if stop_paths.contains(entry.path()) {
            entries.skip_current_dir();
        }
    }

    tracing::debug!(
        root = %root.display(),
        folders = tree.len(),
        depth = tree.depth(),
        "scanned taxonomy"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TaxonomyNode {
        TaxonomyNode::from_json_str(
            r#"{"Work": {"Invoices": {}, "Reports": {"2024": {}}}, "Personal": {}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_paths() {
        let tree = sample_tree();
        assert!(tree.contains_path(&["Work", "Reports", "2024"]));
        assert!(tree.contains_path::<&str>(&[]));
        assert!(!tree.contains_path(&["Work", "Receipts"]));
        assert!(tree.resolve(&["Personal"]).unwrap().is_leaf());
    }

    #[test]
    fn test_counts() {
        let tree = sample_tree();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_outline_truncates() {
        let tree = sample_tree();
        let full = tree.outline(100);
        assert_eq!(
            full,
            "Personal/\nWork/\n  Invoices/\n  Reports/\n    2024/"
        );

        let short = tree.outline(2);
        assert!(short.starts_with("Personal/\nWork/"));
        assert!(short.ends_with("(3 more folders not shown)"));
    }

    #[test]
    fn test_json_shape_is_nested_objects() {
        let mut tree = TaxonomyNode::new();
        tree.insert_path(["A", "B"]);
        let json: serde_json::Value = serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"A": {"B": {}}}));
    }
}
