//! Copy specification trees for copyspec.
//!
//! A [`CopySpec`] is one node of a tree of copy declarations. Each node holds
//! only what it sets itself; a [`SpecResolver`] computes the effective
//! configuration of a node by walking its ancestors.
//!
//! # Overview
//!
//! - **Inheritance**: scalars come from the nearest node that sets them,
//!   patterns and actions accumulate from the root down
//! - **Two orders**: structural order decides precedence, addition order
//!   decides addresses and whole-tree source order
//! - **Addressing**: [`SpecAddress`] names a node by the addition indices
//!   leading to it, rendered as `$1$2`
//! - **Listeners**: attaching a prebuilt subtree replays it to ancestor
//!   listeners, so [`SpecRegistry`] sees every node exactly once
//!
//! # Example
//!
//! ```rust
//! use copyspec_core::MemoryFileResolver;
//! use copyspec_tree::{CopyPlan, CopySpec};
//!
//! let mut files = MemoryFileResolver::new();
//! files.add_files("src", ["a.txt", "draft1.txt", "b.md"]);
//!
//! let root = CopySpec::new();
//! root.into_dir("out").include(["*.txt"]);
//! root.add_child().from(["src"]).exclude(["draft*.txt"]);
//!
//! let plan = CopyPlan::build(&root.resolver(), &files).unwrap();
//! assert_eq!(plan.file_destinations(), vec!["out/a.txt"]);
//! ```

mod actions;
mod address;
mod document;
mod plan;
mod registry;
mod resolver;
mod spec;

pub use actions::{CopyAction, RegexRenamer};
pub use address::SpecAddress;
pub use document::{RenameRule, SpecDocument};
pub use plan::{CopyPlan, PlannedCopy};
pub use registry::{RegisteredSpec, SpecRegistry};
pub use resolver::{EffectiveSettings, ParentScope, SpecResolver};
pub use spec::{CopySpec, SpecListener};

// Re-export core types for convenience
pub use copyspec_core::{
    DuplicatesStrategy, FileCopyDetails, FileElement, FileResolver, FileTree, PathNotation,
    RelativePath, SpecDefaults, SpecError, SpecResult, SpecWarning,
};
