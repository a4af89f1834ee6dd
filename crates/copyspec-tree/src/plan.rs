//! Resolved per-file copy plan.

use std::path::PathBuf;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, warn};

use copyspec_core::{
    DuplicatesStrategy, FileCopyDetails, FileResolver, SpecError, SpecResult, SpecWarning,
};

use crate::resolver::SpecResolver;

/// One entry of a [`CopyPlan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlannedCopy {
    /// Address key of the spec that produced the entry; empty for the root.
    pub spec_key: String,
    /// Where the bytes come from.
    pub source: PathBuf,
    /// Destination relative to the copy root.
    pub destination: String,
    /// Whether this entry is a directory.
    pub is_directory: bool,
    /// Destination permission bits.
    pub mode: u32,
    /// Number of queued content filters.
    pub filters: usize,
    #[serde(skip)]
    details: FileCopyDetails,
}

impl PlannedCopy {
    fn new(spec_key: &str, details: FileCopyDetails) -> Self {
        Self {
            spec_key: spec_key.to_string(),
            source: details.source().to_path_buf(),
            destination: details.path(),
            is_directory: details.is_directory(),
            mode: details.mode(),
            filters: details.filter_count(),
            details,
        }
    }

    /// The details after every action ran.
    pub fn details(&self) -> &FileCopyDetails {
        &self.details
    }
}

/// Every file and directory a spec tree copies, in execution order.
///
/// Specs are visited pre-order with children in structural order, so
/// prepended children take precedence when duplicates are dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyPlan {
    pub entries: Vec<PlannedCopy>,
    pub warnings: Vec<SpecWarning>,
}

impl CopyPlan {
    /// Resolve the tree below `root` against `files`.
    pub fn build(root: &SpecResolver, files: &dyn FileResolver) -> SpecResult<Self> {
        let mut planned = Vec::new();
        collect(root, "", files, &mut planned)?;

        let mut plan = CopyPlan::default();
        let mut seen: IndexSet<String> = IndexSet::new();
        for entry in planned {
            if entry.is_directory || seen.insert(entry.destination.clone()) {
                plan.entries.push(entry);
                continue;
            }
            match entry.details.duplicates_strategy() {
                DuplicatesStrategy::Include => plan.entries.push(entry),
                DuplicatesStrategy::Exclude => {
                    debug!(path = %entry.destination, "skipping duplicate");
                }
                DuplicatesStrategy::Warn => {
                    warn!(path = %entry.destination, "duplicate path in copy");
                    plan.warnings.push(SpecWarning::duplicate_path(&entry.destination));
                    plan.entries.push(entry);
                }
                DuplicatesStrategy::Fail => {
                    return Err(SpecError::DuplicateEntry {
                        path: entry.destination,
                    });
                }
            }
        }

        debug!(entries = plan.entries.len(), "built copy plan");
        Ok(plan)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is copied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destination paths of the file entries.
    pub fn file_destinations(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.is_directory)
            .map(|e| e.destination.clone())
            .collect()
    }
}

fn collect(
    resolver: &SpecResolver,
    key: &str,
    files: &dyn FileResolver,
    out: &mut Vec<PlannedCopy>,
) -> SpecResult<()> {
    let tree = resolver.own_source(files)?;
    if !tree.is_empty() {
        let destination = resolver.destination_path()?;
        let actions = resolver.all_actions();
        let strategy = resolver.duplicates_strategy();
        let file_mode = resolver.file_mode();
        let dir_mode = resolver.dir_mode();

        let mut entries = Vec::new();
        for element in tree {
            let path = destination.append(&element.relative_path);
            let mode = if element.is_directory() {
                dir_mode.unwrap_or(element.mode)
            } else {
                file_mode.unwrap_or(element.mode)
            };
            let mut details = FileCopyDetails::new(element, path, mode, strategy);
            if !details.is_directory() {
                for action in &actions {
                    action(&mut details);
                    if details.is_excluded() {
                        break;
                    }
                }
            }
            if !details.is_excluded() {
                entries.push(details);
            }
        }

        if !resolver.include_empty_dirs() {
            let kept: Vec<_> = entries
                .iter()
                .filter(|d| !d.is_directory())
                .map(|d| d.relative_path().clone())
                .collect();
            entries.retain(|d| {
                let dir = d.relative_path();
                !d.is_directory() || kept.iter().any(|f| f.len() > dir.len() && f.starts_with(dir))
            });
        }

        out.extend(entries.into_iter().map(|d| PlannedCopy::new(key, d)));
    }

    let spec = resolver.spec();
    for child in resolver.structural_children() {
        let index = spec.addition_index_of(child.spec()).unwrap_or_default();
        collect(&child, &format!("{key}${}", index + 1), files, out)?;
    }
    Ok(())
}
