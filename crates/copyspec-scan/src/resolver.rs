//! JWalk-based filesystem source resolution.

use std::fs::Metadata;
use std::path::Path;

use jwalk::{Parallelism, WalkDir};
use tracing::{debug, warn};

use copyspec_core::{
    DEFAULT_DIR_MODE, FileElement, FileResolver, FileTree, PathNotation,
    SpecError, SpecResult, notation_to_path,
};

use crate::config::FsResolverConfig;

/// Resolves source selectors against the local filesystem.
///
/// A selector naming a directory contributes every entry below it, with
/// paths relative to that directory. A selector naming a file contributes
/// the file alone. Missing selectors contribute nothing. Walks are serial
/// and sorted by name so repeated resolutions agree.
#[derive(Debug, Clone)]
pub struct FsFileResolver {
    config: FsResolverConfig,
}

impl FsFileResolver {
    /// Create a resolver.
    pub fn new(config: FsResolverConfig) -> Self {
        Self { config }
    }

    /// Create a resolver with default settings rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(FsResolverConfig::new(base_dir))
    }

    /// The active configuration.
    pub fn config(&self) -> &FsResolverConfig {
        &self.config
    }

    fn resolve_selector(&self, selector: &PathNotation, out: &mut Vec<FileElement>) -> SpecResult<()> {
        let notation = selector.resolve()?;
        let root = notation_to_path(&self.config.base_dir, &notation);

        let metadata = match std::fs::metadata(&root) {
            Ok(m) => m,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %root.display(), "source does not exist, skipping");
                return Ok(());
            }
            Err(err) => return Err(SpecError::io(&root, err)),
        };

        if metadata.is_file() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.push(FileElement::file(&root, &name, metadata.len(), file_mode(&metadata)));
            return Ok(());
        }

        self.walk_dir(&root, out);
        Ok(())
    }

    fn walk_dir(&self, root: &Path, out: &mut Vec<FileElement>) {
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(!self.config.include_hidden)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!(%path, error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let relative = relative.to_string_lossy();

            let file_type = entry.file_type();
            if file_type.is_dir() {
                let mode = entry.metadata().map(|m| dir_mode(&m)).unwrap_or(DEFAULT_DIR_MODE);
                out.push(FileElement::directory(&path, &relative, mode));
            } else if file_type.is_file() || file_type.is_symlink() {
                // Symlinks that were not followed are copied as the file they point to.
                match std::fs::metadata(&path) {
                    Ok(metadata) if metadata.is_file() => {
                        out.push(FileElement::file(
                            &path,
                            &relative,
                            metadata.len(),
                            file_mode(&metadata),
                        ));
                    }
                    Ok(_) => debug!(path = %path.display(), "skipping unfollowed directory link"),
                    Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable file"),
                }
            }
        }
    }
}

impl FileResolver for FsFileResolver {
    fn resolve_files_as_tree(&self, selectors: &[PathNotation]) -> SpecResult<FileTree> {
        let mut elements = Vec::new();
        for selector in selectors {
            self.resolve_selector(selector, &mut elements)?;
        }
        debug!(selectors = selectors.len(), elements = elements.len(), "resolved sources");
        Ok(FileTree::new(elements))
    }
}

// Cross-platform metadata helpers

/// Permission bits of a file.
#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &Metadata) -> u32 {
    copyspec_core::DEFAULT_FILE_MODE
}

/// Permission bits of a directory.
#[cfg(unix)]
fn dir_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn dir_mode(_metadata: &Metadata) -> u32 {
    DEFAULT_DIR_MODE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir(root.join("src/empty")).unwrap();
        fs::write(root.join("src/b.txt"), "bb").unwrap();
        fs::write(root.join("src/a.txt"), "a").unwrap();
        fs::write(root.join("src/nested/c.md"), "ccc").unwrap();
        fs::write(root.join("src/.hidden"), "h").unwrap();
        fs::write(root.join("single.txt"), "single").unwrap();

        temp
    }

    fn paths(tree: &FileTree) -> Vec<String> {
        tree.iter().map(FileElement::path_string).collect()
    }

    #[test]
    fn test_directory_walk_is_sorted_and_relative() {
        let temp = create_test_tree();
        let resolver = FsFileResolver::with_base_dir(temp.path());

        let tree = resolver.resolve_files_as_tree(&[PathNotation::from("src")]).unwrap();
        assert_eq!(
            paths(&tree),
            vec![".hidden", "a.txt", "b.txt", "empty", "nested", "nested/c.md"]
        );
        let c = tree.iter().find(|e| e.name() == "c.md").unwrap();
        assert_eq!(c.size, 3);
        assert!(c.source.ends_with("src/nested/c.md"));
    }

    #[test]
    fn test_hidden_files_skipped() {
        let temp = create_test_tree();
        let config = FsResolverConfig::builder()
            .base_dir(temp.path())
            .include_hidden(false)
            .build()
            .unwrap();
        let tree = FsFileResolver::new(config)
            .resolve_files_as_tree(&[PathNotation::from("src")])
            .unwrap();
        assert!(!paths(&tree).contains(&".hidden".to_string()));
    }

    #[test]
    fn test_single_file_and_missing_selectors() {
        let temp = create_test_tree();
        let resolver = FsFileResolver::with_base_dir(temp.path());
        let absolute = temp.path().join("single.txt");

        let tree = resolver
            .resolve_files_as_tree(&[
                PathNotation::from("missing"),
                PathNotation::from_path(&absolute).unwrap(),
            ])
            .unwrap();
        assert_eq!(paths(&tree), vec!["single.txt"]);
    }

    #[test]
    fn test_max_depth() {
        let temp = create_test_tree();
        let config = FsResolverConfig::builder()
            .base_dir(temp.path())
            .max_depth(Some(1_usize))
            .build()
            .unwrap();
        let tree = FsFileResolver::new(config)
            .resolve_files_as_tree(&[PathNotation::from("src")])
            .unwrap();
        assert!(!paths(&tree).contains(&"nested/c.md".to_string()));
        assert!(paths(&tree).contains(&"nested".to_string()));
    }
}
