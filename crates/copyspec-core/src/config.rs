//! Root defaults and duplicate handling policy.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::charset::{DEFAULT_CHARSET, canonical_charset, validate_charset};
use crate::error::{SpecError, SpecResult};

/// How to handle files that map to an already planned destination path.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DuplicatesStrategy {
    /// Keep every duplicate.
    #[default]
    Include,
    /// Keep the first file for a path and drop later ones.
    Exclude,
    /// Keep every duplicate and log a warning.
    Warn,
    /// Abort resolution on the first duplicate.
    Fail,
}

/// Values a root resolver falls back to when no node in the chain sets them.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SpecDefaults {
    /// Match patterns case-sensitively.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Copy directories that end up without files.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_empty_dirs: bool,

    /// Duplicate handling policy.
    #[builder(default)]
    #[serde(default)]
    pub duplicates_strategy: DuplicatesStrategy,

    /// Charset used by content filters.
    #[builder(default = "DEFAULT_CHARSET.to_string()", setter(custom))]
    #[serde(default = "default_charset")]
    pub filtering_charset: String,

    /// File permission bits (None = keep source permissions).
    #[builder(default)]
    #[serde(default)]
    pub file_mode: Option<u32>,

    /// Directory permission bits (None = keep source permissions).
    #[builder(default)]
    #[serde(default)]
    pub dir_mode: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl SpecDefaultsBuilder {
    /// Charset used by content filters. Known aliases are stored by their
    /// canonical name.
    pub fn filtering_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        let charset = charset.into();
        let stored = canonical_charset(&charset).map_or(charset, str::to_string);
        self.filtering_charset = Some(stored);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(ref charset) = self.filtering_charset {
            validate_charset(charset).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl SpecDefaults {
    /// Create a new defaults builder.
    pub fn builder() -> SpecDefaultsBuilder {
        SpecDefaultsBuilder::default()
    }

    /// Check values that bypassed the builder, such as deserialized tables.
    ///
    /// The charset is replaced by its canonical name.
    pub fn validated(mut self) -> SpecResult<Self> {
        let charset = validate_charset(&self.filtering_charset).map_err(|e| {
            SpecError::InvalidConfig {
                message: e.to_string(),
            }
        })?;
        self.filtering_charset = charset.to_string();
        Ok(self)
    }
}

impl Default for SpecDefaults {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            include_empty_dirs: true,
            duplicates_strategy: DuplicatesStrategy::Include,
            filtering_charset: default_charset(),
            file_mode: None,
            dir_mode: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = SpecDefaults::default();
        assert!(defaults.case_sensitive);
        assert!(defaults.include_empty_dirs);
        assert_eq!(defaults.duplicates_strategy, DuplicatesStrategy::Include);
        assert_eq!(defaults.filtering_charset, "UTF-8");
        assert_eq!(defaults.file_mode, None);
    }

    #[test]
    fn test_builder() {
        let defaults = SpecDefaults::builder()
            .case_sensitive(false)
            .duplicates_strategy(DuplicatesStrategy::Fail)
            .file_mode(Some(0o644_u32))
            .build()
            .unwrap();

        assert!(!defaults.case_sensitive);
        assert!(defaults.include_empty_dirs);
        assert_eq!(defaults.duplicates_strategy, DuplicatesStrategy::Fail);
        assert_eq!(defaults.file_mode, Some(0o644));
    }

    #[test]
    fn test_builder_rejects_charset() {
        let result = SpecDefaults::builder().filtering_charset("nope").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_canonicalizes_charset() {
        let defaults = SpecDefaults::builder()
            .filtering_charset("latin1")
            .build()
            .unwrap();
        assert_eq!(defaults.filtering_charset, "ISO-8859-1");
    }

    #[test]
    fn test_validated_checks_deserialized_charset() {
        let defaults = SpecDefaults {
            filtering_charset: "cp1252".to_string(),
            ..SpecDefaults::default()
        };
        assert_eq!(defaults.validated().unwrap().filtering_charset, "windows-1252");

        let defaults = SpecDefaults {
            filtering_charset: "klingon-8".to_string(),
            ..SpecDefaults::default()
        };
        let err = defaults.validated().unwrap_err();
        assert!(matches!(err, SpecError::InvalidConfig { .. }));
        assert!(err.to_string().contains("klingon-8"));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("WARN".parse::<DuplicatesStrategy>().unwrap(), DuplicatesStrategy::Warn);
        assert_eq!(DuplicatesStrategy::Exclude.to_string(), "exclude");
    }
}
