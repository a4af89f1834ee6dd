//! Filesystem source resolution for copyspec.
//!
//! This crate provides [`FsFileResolver`], a [`FileResolver`] that turns
//! source selectors into file trees by walking the local filesystem with
//! jwalk.
//!
//! # Example
//!
//! ```rust,no_run
//! use copyspec_core::{FileResolver, PathNotation};
//! use copyspec_scan::{FsFileResolver, FsResolverConfig};
//!
//! let config = FsResolverConfig::builder()
//!     .base_dir("/path/to/project")
//!     .include_hidden(false)
//!     .build()
//!     .unwrap();
//! let resolver = FsFileResolver::new(config);
//! let tree = resolver.resolve_files_as_tree(&[PathNotation::from("src")]).unwrap();
//!
//! println!("Total files: {}", tree.files().count());
//! ```

mod config;
mod resolver;

pub use config::{FsResolverConfig, FsResolverConfigBuilder};
pub use resolver::FsFileResolver;

// Re-export core types for convenience
pub use copyspec_core::{FileElement, FileResolver, FileTree, PathNotation, SpecError, SpecResult};
