//! TOML description of a spec tree.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use copyspec_core::{DuplicatesStrategy, SpecDefaults, SpecError, SpecResult};

use crate::spec::CopySpec;

/// A regex rename rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameRule {
    /// Expression matched against file names.
    pub from: String,
    /// Replacement, may reference groups as `$1`.
    pub to: String,
}

/// Declarative form of a spec and its children.
///
/// ```toml
/// from = ["src"]
/// into = "dist"
/// include = ["**/*.rs"]
///
/// [defaults]
/// case_sensitive = false
///
/// [[child]]
/// from = ["docs"]
/// into = "doc"
/// prepend = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecDocument {
    /// Root defaults; only allowed on the outermost table.
    pub defaults: Option<SpecDefaults>,
    pub from: Vec<String>,
    pub into: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub case_sensitive: Option<bool>,
    pub include_empty_dirs: Option<bool>,
    pub duplicates: Option<DuplicatesStrategy>,
    pub filtering_charset: Option<String>,
    pub file_mode: Option<u32>,
    pub dir_mode: Option<u32>,
    pub rename: Vec<RenameRule>,
    pub expand: BTreeMap<String, String>,
    /// Place this child before its existing siblings.
    pub prepend: bool,
    #[serde(rename = "child")]
    pub children: Vec<SpecDocument>,
}

impl SpecDocument {
    /// Parse a document from TOML text.
    pub fn from_toml(text: &str) -> SpecResult<Self> {
        toml::from_str(text).map_err(|e| SpecError::InvalidDocument {
            message: e.to_string(),
        })
    }

    /// Read and parse a document file.
    pub fn load(path: &Path) -> SpecResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SpecError::io(path, e))?;
        debug!(path = %path.display(), "loaded spec document");
        Self::from_toml(&text)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> SpecResult<String> {
        toml::to_string(self).map_err(|e| SpecError::InvalidDocument {
            message: e.to_string(),
        })
    }

    /// Build a fresh root spec.
    pub fn build(&self) -> SpecResult<CopySpec> {
        let root = match &self.defaults {
            Some(defaults) => CopySpec::with_defaults(defaults.clone())?,
            None => CopySpec::new(),
        };
        self.configure(&root)?;
        Ok(root)
    }

    /// Configure an existing spec. Root defaults are ignored here; the spec
    /// keeps the defaults it was created with.
    pub fn apply_to(&self, spec: &CopySpec) -> SpecResult<()> {
        self.configure(spec)
    }

    fn configure(&self, spec: &CopySpec) -> SpecResult<()> {
        spec.from(&self.from);
        if let Some(into) = &self.into {
            spec.into_dir(into);
        }
        spec.include(self.include.iter().cloned());
        spec.exclude(self.exclude.iter().cloned());
        if let Some(case_sensitive) = self.case_sensitive {
            spec.set_case_sensitive(case_sensitive);
        }
        if let Some(include_empty_dirs) = self.include_empty_dirs {
            spec.set_include_empty_dirs(include_empty_dirs);
        }
        if self.duplicates.is_some() {
            spec.set_duplicates_strategy(self.duplicates);
        }
        if let Some(charset) = &self.filtering_charset {
            spec.set_filtering_charset(charset)?;
        }
        if self.file_mode.is_some() {
            spec.set_file_mode(self.file_mode);
        }
        if self.dir_mode.is_some() {
            spec.set_dir_mode(self.dir_mode);
        }
        for rule in &self.rename {
            spec.rename_regex(&rule.from, &rule.to)?;
        }
        if !self.expand.is_empty() {
            spec.expand(self.expand.clone());
        }

        for child in &self.children {
            if child.defaults.is_some() {
                return Err(SpecError::InvalidDocument {
                    message: "defaults are only allowed at the top level".to_string(),
                });
            }
            let node = if child.prepend {
                spec.add_first()
            } else {
                spec.add_child()
            };
            child.configure(&node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
from = ["src"]
into = "dist"
include = ["**/*.txt"]
duplicates = "warn"
file_mode = 0o644

[defaults]
case_sensitive = false

[[rename]]
from = '(.*)\.txt'
to = '$1.md'

[[child]]
from = ["docs"]
into = "doc"
filtering_charset = "latin1"

[[child]]
from = ["extra"]
prepend = true
"#;

    #[test]
    fn test_parse_and_build() {
        let doc = SpecDocument::from_toml(DOC).unwrap();
        assert_eq!(doc.children.len(), 2);
        assert!(doc.children[1].prepend);

        let root = doc.build().unwrap();
        assert!(!root.is_case_sensitive());
        assert_eq!(root.duplicates_strategy(), DuplicatesStrategy::Warn);
        assert_eq!(root.file_mode(), Some(0o644));
        assert!(root.has_custom_actions());

        let children = root.children();
        assert_eq!(children[0].sources()[0].to_string(), "extra");
        assert_eq!(children[1].filtering_charset(), "ISO-8859-1");
        assert_eq!(
            children[1].resolver().destination_path().unwrap().path_string(),
            "dist/doc"
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SpecDocument::from_toml("form = [\"src\"]").unwrap_err();
        assert!(matches!(err, SpecError::InvalidDocument { .. }));
    }

    #[test]
    fn test_nested_defaults_rejected() {
        let doc = SpecDocument::from_toml("[[child]]\n[child.defaults]\ncase_sensitive = true\n").unwrap();
        assert!(matches!(doc.build(), Err(SpecError::InvalidDocument { .. })));
    }

    #[test]
    fn test_bad_charset_is_usage_error() {
        let doc = SpecDocument::from_toml("filtering_charset = \"klingon\"").unwrap();
        let err = doc.build().unwrap_err();
        assert!(matches!(err, SpecError::UnsupportedCharset { .. }));
        assert!(err.is_usage_error());
    }

    #[test]
    fn test_root_defaults_charset_checked() {
        let doc = SpecDocument::from_toml("[defaults]\nfiltering_charset = \"klingon-8\"").unwrap();
        let err = doc.build().unwrap_err();
        assert!(matches!(err, SpecError::InvalidConfig { .. }));
        assert!(err.is_usage_error());

        let doc = SpecDocument::from_toml("[defaults]\nfiltering_charset = \"latin1\"\n\n[[child]]\n").unwrap();
        let root = doc.build().unwrap();
        let child = &root.children()[0];
        assert_eq!(root.filtering_charset(), "ISO-8859-1");
        assert_eq!(child.resolver().filtering_charset(), "ISO-8859-1");
    }
}
