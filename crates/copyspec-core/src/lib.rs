//! Core types for copyspec.
//!
//! This crate provides the value types shared by the specification tree:
//! relative paths and path notations, include/exclude pattern sets, file
//! trees and the [`FileResolver`] collaborator, per-file copy details, root
//! defaults, and errors.

mod charset;
mod config;
mod details;
mod error;
mod path;
mod pattern;
mod tree;

pub use charset::{DEFAULT_CHARSET, canonical_charset, is_supported_charset, validate_charset};
pub use config::{DuplicatesStrategy, SpecDefaults, SpecDefaultsBuilder};
pub use details::{FileCopyDetails, LineFilter};
pub use error::{SpecError, SpecResult, SpecWarning, WarningKind};
pub use path::{DeferredPath, PathNotation, RelativePath, ResolvedNotation, is_absolute_notation};
pub use pattern::{ElementMatcher, ElementSpec, PathMatcher, PatternSet, path_matcher};
pub use tree::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, FileElement, FileResolver, FileTree, MemoryFileResolver,
    notation_to_path,
};
