//! Error and warning types for copy specification operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout copyspec.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors that can occur while configuring or resolving a copy spec.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A path notation could not be turned into a path.
    #[error("Invalid path notation: {message}")]
    InvalidNotation { message: String },

    /// Filtering charset is not known.
    #[error("filteringCharset {charset} is not supported")]
    UnsupportedCharset { charset: String },

    /// An operation that needs at least one pattern received none.
    #[error("must provide at least one pattern to {operation}")]
    EmptyPatterns { operation: &'static str },

    /// A glob pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A rename expression failed to compile.
    #[error("Invalid rename expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// The node is already a child of the parent.
    #[error("Spec is already attached to this parent")]
    AlreadyAttached,

    /// Attaching the node would make the tree cyclic.
    #[error("Cannot attach a spec beneath itself")]
    CyclicAttachment,

    /// Two planned entries target the same destination under a failing strategy.
    #[error("Encountered duplicate path \"{path}\" during copy operation configured with DuplicatesStrategy.FAIL")]
    DuplicateEntry { path: String },

    /// A spec document could not be parsed.
    #[error("Invalid spec document: {message}")]
    InvalidDocument { message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpecError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid notation error.
    pub fn notation(message: impl Into<String>) -> Self {
        Self::InvalidNotation {
            message: message.into(),
        }
    }

    /// Whether this error is a configuration-time usage error.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::Io { .. })
    }
}

/// Kind of spec warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A deprecated calling convention was used; a fallback was applied.
    DeprecatedUsage,
    /// Duplicate destination paths were kept under the `Warn` strategy.
    DuplicatePath,
}

/// Non-fatal warning raised while configuring or resolving a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecWarning {
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl SpecWarning {
    /// Create a new spec warning.
    pub fn new(message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Create a deprecated usage warning.
    pub fn deprecated(message: impl Into<String>) -> Self {
        Self::new(message, WarningKind::DeprecatedUsage)
    }

    /// Create a duplicate path warning.
    pub fn duplicate_path(path: &str) -> Self {
        Self {
            message: format!("Encountered duplicate path \"{path}\" during copy operation"),
            kind: WarningKind::DuplicatePath,
        }
    }
}
