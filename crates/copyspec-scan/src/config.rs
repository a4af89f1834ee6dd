//! Filesystem resolver configuration.

use std::path::PathBuf;

use derive_builder::Builder;

/// Configuration for [`FsFileResolver`](crate::FsFileResolver).
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct FsResolverConfig {
    /// Directory relative selectors are resolved against.
    pub base_dir: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    pub include_hidden: bool,

    /// Maximum depth below each selector root (None = unlimited).
    #[builder(default)]
    pub max_depth: Option<usize>,
}

impl FsResolverConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.base_dir {
            Some(ref base_dir) if base_dir.as_os_str().is_empty() => {
                Err("Base directory cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Base directory is required".to_string()),
        }
    }
}

impl FsResolverConfig {
    /// Create a configuration with defaults for the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            follow_symlinks: false,
            include_hidden: true,
            max_depth: None,
        }
    }

    /// Create a new configuration builder.
    pub fn builder() -> FsResolverConfigBuilder {
        FsResolverConfigBuilder::default()
    }
}
