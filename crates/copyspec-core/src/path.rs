//! Relative paths and path notations.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::Rc;

use compact_str::CompactString;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{SpecError, SpecResult};

/// Maximum chain of deferred providers followed before giving up.
const MAX_DEFERRED_DEPTH: usize = 32;

/// A path relative to some root, split into segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RelativePath {
    segments: Vec<CompactString>,
    is_file: bool,
}

impl RelativePath {
    /// Create a path from already split segments.
    pub fn new<S: Into<CompactString>>(is_file: bool, segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            is_file,
        }
    }

    /// The empty directory path.
    pub fn empty_dir() -> Self {
        Self::default()
    }

    /// Parse a path, accepting both `/` and `\` as separators.
    pub fn parse(is_file: bool, path: &str) -> Self {
        Self::parse_with_parent(is_file, &Self::empty_dir(), path)
    }

    /// Parse a path and append it to `parent`.
    pub fn parse_with_parent(is_file: bool, parent: &RelativePath, path: &str) -> Self {
        let mut segments = parent.segments.clone();
        segments.extend(
            path.split(['/', '\\'])
                .filter(|s| !s.is_empty() && *s != ".")
                .map(CompactString::from),
        );
        Self { segments, is_file }
    }

    /// Path segments, root first.
    pub fn segments(&self) -> &[CompactString] {
        &self.segments
    }

    /// Whether this path denotes a file.
    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// Whether this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// The final segment.
    pub fn last_name(&self) -> Option<&str> {
        self.segments.last().map(CompactString::as_str)
    }

    /// The containing directory, or None for the empty path.
    pub fn parent(&self) -> Option<RelativePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            is_file: false,
        })
    }

    /// Replace the final segment.
    pub fn replace_last_name(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => *last = CompactString::from(name),
            None => segments.push(CompactString::from(name)),
        }
        Self {
            segments,
            is_file: self.is_file,
        }
    }

    /// Append `child` below this path.
    pub fn append(&self, child: &RelativePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(child.segments.iter().cloned());
        Self {
            segments,
            is_file: child.is_file,
        }
    }

    /// Whether `prefix` is a leading part of this path.
    pub fn starts_with(&self, prefix: &RelativePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Slash-joined representation.
    pub fn path_string(&self) -> String {
        self.segments.iter().join("/")
    }

    /// Slash-joined strings of every proper ancestor directory, shortest first.
    pub fn ancestor_strings(&self) -> Vec<String> {
        (1..self.segments.len())
            .map(|n| self.segments[..n].iter().join("/"))
            .collect()
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_string())
    }
}

/// Whether a textual path is treated as absolute.
///
/// Both the forward slash and the host separator count, on every platform.
pub fn is_absolute_notation(text: &str) -> bool {
    text.starts_with('/') || text.starts_with(std::path::MAIN_SEPARATOR)
}

/// A lazily evaluated path notation.
#[derive(Clone)]
pub struct DeferredPath(Rc<dyn Fn() -> Option<PathNotation>>);

impl DeferredPath {
    /// Wrap a provider.
    pub fn new(provider: impl Fn() -> Option<PathNotation> + 'static) -> Self {
        Self(Rc::new(provider))
    }

    /// Evaluate the provider.
    pub fn provide(&self) -> Option<PathNotation> {
        (self.0)()
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for DeferredPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeferredPath({:#x})", self.addr())
    }
}

/// A path expression as written by configuration code.
#[derive(Debug, Clone)]
pub enum PathNotation {
    /// A path starting at a root.
    Absolute(String),
    /// A path appended to whatever it is resolved against.
    Relative(String),
    /// A path computed when the notation is resolved.
    Deferred(DeferredPath),
}

/// A notation after deferred providers have been evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedNotation {
    /// Absolute path text.
    Absolute(String),
    /// Relative path text.
    Relative(String),
}

impl ResolvedNotation {
    /// The path text.
    pub fn text(&self) -> &str {
        match self {
            Self::Absolute(text) | Self::Relative(text) => text,
        }
    }

    /// Whether the notation is absolute.
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }
}

impl PathNotation {
    /// Classify a textual path.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        if is_absolute_notation(&text) {
            Self::Absolute(text)
        } else {
            Self::Relative(text)
        }
    }

    /// Create a deferred notation.
    pub fn deferred(provider: impl Fn() -> Option<PathNotation> + 'static) -> Self {
        Self::Deferred(DeferredPath::new(provider))
    }

    /// Convert a filesystem path; non UTF-8 paths are rejected.
    pub fn from_path(path: &Path) -> SpecResult<Self> {
        path.to_str()
            .map(Self::parse)
            .ok_or_else(|| SpecError::notation(format!("path {} is not valid UTF-8", path.display())))
    }

    /// Whether evaluation is deferred.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Evaluate deferred providers and validate the result.
    pub fn resolve(&self) -> SpecResult<ResolvedNotation> {
        let mut current = self.clone();
        for _ in 0..MAX_DEFERRED_DEPTH {
            let resolved = match current {
                Self::Absolute(text) => ResolvedNotation::Absolute(text),
                Self::Relative(text) => ResolvedNotation::Relative(text),
                Self::Deferred(provider) => {
                    current = provider
                        .provide()
                        .ok_or_else(|| SpecError::notation("deferred path produced no value"))?;
                    continue;
                }
            };
            if resolved.text().contains('\0') {
                return Err(SpecError::notation(format!(
                    "path {:?} contains a NUL character",
                    resolved.text()
                )));
            }
            return Ok(resolved);
        }
        Err(SpecError::notation("deferred path nested too deeply"))
    }
}

impl PartialEq for PathNotation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Absolute(a), Self::Absolute(b)) | (Self::Relative(a), Self::Relative(b)) => a == b,
            (Self::Deferred(a), Self::Deferred(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl Eq for PathNotation {}

impl Hash for PathNotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Absolute(text) | Self::Relative(text) => text.hash(state),
            Self::Deferred(provider) => provider.addr().hash(state),
        }
    }
}

impl From<&str> for PathNotation {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for PathNotation {
    fn from(text: String) -> Self {
        Self::parse(text)
    }
}

impl From<&String> for PathNotation {
    fn from(text: &String) -> Self {
        Self::parse(text.as_str())
    }
}

impl From<DeferredPath> for PathNotation {
    fn from(provider: DeferredPath) -> Self {
        Self::Deferred(provider)
    }
}

impl TryFrom<&Path> for PathNotation {
    type Error = SpecError;

    fn try_from(path: &Path) -> SpecResult<Self> {
        Self::from_path(path)
    }
}

impl fmt::Display for PathNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(text) | Self::Relative(text) => f.write_str(text),
            Self::Deferred(_) => f.write_str("<deferred>"),
        }
    }
}
