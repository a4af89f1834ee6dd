//! File trees produced by resolving source selectors.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SpecResult;
use crate::path::{PathNotation, RelativePath, ResolvedNotation};
use crate::pattern::ElementMatcher;

/// Default mode reported for files without permission information.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Default mode reported for directories without permission information.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// A single file or directory visible through a source selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileElement {
    /// Path relative to the selector's root.
    pub relative_path: RelativePath,
    /// Where the element lives on disk (or in memory).
    pub source: PathBuf,
    /// Permission bits.
    pub mode: u32,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl FileElement {
    /// Create a file element.
    pub fn file(source: impl Into<PathBuf>, relative_path: &str, size: u64, mode: u32) -> Self {
        Self {
            relative_path: RelativePath::parse(true, relative_path),
            source: source.into(),
            mode,
            size,
        }
    }

    /// Create a directory element.
    pub fn directory(source: impl Into<PathBuf>, relative_path: &str, mode: u32) -> Self {
        Self {
            relative_path: RelativePath::parse(false, relative_path),
            source: source.into(),
            mode,
            size: 0,
        }
    }

    /// Check if this element is a directory.
    pub fn is_directory(&self) -> bool {
        !self.relative_path.is_file()
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.relative_path.last_name().unwrap_or("")
    }

    /// Slash-joined relative path.
    pub fn path_string(&self) -> String {
        self.relative_path.path_string()
    }
}

/// An ordered collection of file elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    elements: Vec<FileElement>,
}

impl FileTree {
    /// Create a tree from elements.
    pub fn new(elements: Vec<FileElement>) -> Self {
        Self { elements }
    }

    /// An empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate trees, keeping their order.
    pub fn composite(trees: impl IntoIterator<Item = FileTree>) -> Self {
        Self {
            elements: trees.into_iter().flat_map(|t| t.elements).collect(),
        }
    }

    /// Keep the elements accepted by `matcher`.
    pub fn matching(&self, matcher: &ElementMatcher) -> Self {
        Self {
            elements: self
                .elements
                .iter()
                .filter(|e| matcher.is_satisfied_by(e))
                .cloned()
                .collect(),
        }
    }

    /// Iterate over all elements.
    pub fn iter(&self) -> impl Iterator<Item = &FileElement> {
        self.elements.iter()
    }

    /// Iterate over file elements only.
    pub fn files(&self) -> impl Iterator<Item = &FileElement> {
        self.elements.iter().filter(|e| !e.is_directory())
    }

    /// Relative paths of all file elements.
    pub fn file_paths(&self) -> Vec<String> {
        self.files().map(FileElement::path_string).collect()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the tree has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Consume into the element list.
    pub fn into_elements(self) -> Vec<FileElement> {
        self.elements
    }
}

impl IntoIterator for FileTree {
    type Item = FileElement;
    type IntoIter = std::vec::IntoIter<FileElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Turns source selectors into file trees.
pub trait FileResolver {
    /// Resolve every selector and concatenate the results in order.
    fn resolve_files_as_tree(&self, selectors: &[PathNotation]) -> SpecResult<FileTree>;
}

/// A file resolver over an in-memory set of roots.
///
/// Each root is keyed by the selector text that names it. Selectors naming
/// an unknown root resolve to nothing.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileResolver {
    roots: IndexMap<String, Vec<FileElement>>,
}

impl MemoryFileResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under `root`.
    pub fn add_file(&mut self, root: &str, relative_path: &str, size: u64) -> &mut Self {
        let source = Path::new(root).join(relative_path);
        self.root_mut(root)
            .push(FileElement::file(source, relative_path, size, DEFAULT_FILE_MODE));
        self
    }

    /// Register several files under `root`.
    pub fn add_files<'a>(&mut self, root: &str, paths: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for path in paths {
            self.add_file(root, path, 0);
        }
        self
    }

    /// Register a directory under `root`.
    pub fn add_dir(&mut self, root: &str, relative_path: &str) -> &mut Self {
        let source = Path::new(root).join(relative_path);
        self.root_mut(root)
            .push(FileElement::directory(source, relative_path, DEFAULT_DIR_MODE));
        self
    }

    fn root_mut(&mut self, root: &str) -> &mut Vec<FileElement> {
        self.roots.entry(normalize_root(root)).or_default()
    }
}

impl FileResolver for MemoryFileResolver {
    fn resolve_files_as_tree(&self, selectors: &[PathNotation]) -> SpecResult<FileTree> {
        let mut elements = Vec::new();
        for selector in selectors {
            let resolved = selector.resolve()?;
            let key = normalize_root(resolved.text());
            match self.roots.get(&key) {
                Some(root) => elements.extend(root.iter().cloned()),
                None => tracing::debug!(selector = %key, "no in-memory root for selector"),
            }
        }
        Ok(FileTree::new(elements))
    }
}

fn normalize_root(text: &str) -> String {
    let relative = RelativePath::parse(false, text).path_string();
    match PathNotation::parse(text) {
        PathNotation::Absolute(_) => format!("/{relative}"),
        _ => relative,
    }
}

/// Convert a resolved notation to a filesystem path below `base_dir`.
pub fn notation_to_path(base_dir: &Path, notation: &ResolvedNotation) -> PathBuf {
    match notation {
        ResolvedNotation::Absolute(text) => PathBuf::from(text),
        ResolvedNotation::Relative(text) => base_dir.join(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_element() {
        let element = FileElement::file("/src/a/b.txt", "a/b.txt", 12, DEFAULT_FILE_MODE);
        assert!(!element.is_directory());
        assert_eq!(element.name(), "b.txt");
        assert_eq!(element.path_string(), "a/b.txt");
    }

    #[test]
    fn test_composite_keeps_order() {
        let first = FileTree::new(vec![FileElement::file("x", "x", 0, 0)]);
        let second = FileTree::new(vec![FileElement::file("y", "y", 0, 0)]);
        let tree = FileTree::composite([first, second]);
        assert_eq!(tree.file_paths(), vec!["x", "y"]);
    }

    #[test]
    fn test_memory_resolver() {
        let mut resolver = MemoryFileResolver::new();
        resolver.add_files("src", ["a.txt", "b.txt"]);
        resolver.add_file("/abs/root/", "c.txt", 3);

        let tree = resolver
            .resolve_files_as_tree(&[PathNotation::from("./src"), PathNotation::from("/abs/root")])
            .unwrap();
        assert_eq!(tree.file_paths(), vec!["a.txt", "b.txt", "c.txt"]);

        let missing = resolver
            .resolve_files_as_tree(&[PathNotation::from("nowhere")])
            .unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_notation_to_path() {
        let base = Path::new("/project");
        let rel = ResolvedNotation::Relative("src".to_string());
        let abs = ResolvedNotation::Absolute("/opt/src".to_string());
        assert_eq!(notation_to_path(base, &rel), PathBuf::from("/project/src"));
        assert_eq!(notation_to_path(base, &abs), PathBuf::from("/opt/src"));
    }
}
