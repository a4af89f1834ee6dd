//! Include/exclude pattern sets and the matchers built from them.

use std::fmt;
use std::rc::Rc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexSet;

use crate::error::{SpecError, SpecResult};
use crate::path::RelativePath;
use crate::tree::FileElement;

/// Predicate over file elements, used by include/exclude specs.
pub type ElementSpec = Rc<dyn Fn(&FileElement) -> bool>;

/// Include and exclude rules for a single spec node.
#[derive(Clone)]
pub struct PatternSet {
    includes: IndexSet<String>,
    excludes: IndexSet<String>,
    include_specs: Vec<ElementSpec>,
    exclude_specs: Vec<ElementSpec>,
    case_sensitive: bool,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            includes: IndexSet::new(),
            excludes: IndexSet::new(),
            include_specs: Vec::new(),
            exclude_specs: Vec::new(),
            case_sensitive: true,
        }
    }
}

impl PatternSet {
    /// Create an empty pattern set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add include globs.
    pub fn include<S: Into<String>>(&mut self, patterns: impl IntoIterator<Item = S>) -> &mut Self {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add an include predicate.
    pub fn include_spec(&mut self, spec: impl Fn(&FileElement) -> bool + 'static) -> &mut Self {
        self.include_specs.push(Rc::new(spec));
        self
    }

    /// Add already shared include predicates.
    pub fn include_specs(&mut self, specs: impl IntoIterator<Item = ElementSpec>) -> &mut Self {
        self.include_specs.extend(specs);
        self
    }

    /// Replace the include globs.
    pub fn set_includes<S: Into<String>>(&mut self, patterns: impl IntoIterator<Item = S>) -> &mut Self {
        self.includes.clear();
        self.include(patterns)
    }

    /// Add exclude globs.
    pub fn exclude<S: Into<String>>(&mut self, patterns: impl IntoIterator<Item = S>) -> &mut Self {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add an exclude predicate.
    pub fn exclude_spec(&mut self, spec: impl Fn(&FileElement) -> bool + 'static) -> &mut Self {
        self.exclude_specs.push(Rc::new(spec));
        self
    }

    /// Add already shared exclude predicates.
    pub fn exclude_specs(&mut self, specs: impl IntoIterator<Item = ElementSpec>) -> &mut Self {
        self.exclude_specs.extend(specs);
        self
    }

    /// Replace the exclude globs.
    pub fn set_excludes<S: Into<String>>(&mut self, patterns: impl IntoIterator<Item = S>) -> &mut Self {
        self.excludes.clear();
        self.exclude(patterns)
    }

    /// Include globs in insertion order.
    pub fn includes(&self) -> &IndexSet<String> {
        &self.includes
    }

    /// Exclude globs in insertion order.
    pub fn excludes(&self) -> &IndexSet<String> {
        &self.excludes
    }

    /// Include predicates.
    pub fn include_spec_list(&self) -> &[ElementSpec] {
        &self.include_specs
    }

    /// Exclude predicates.
    pub fn exclude_spec_list(&self) -> &[ElementSpec] {
        &self.exclude_specs
    }

    /// Set case sensitivity for glob matching.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> &mut Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Whether globs match case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Check if the set holds no rules at all.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
            && self.excludes.is_empty()
            && self.include_specs.is_empty()
            && self.exclude_specs.is_empty()
    }

    /// Compile the set into a matcher.
    pub fn matcher(&self) -> SpecResult<ElementMatcher> {
        let includes = if self.includes.is_empty() {
            None
        } else {
            Some(path_matcher(&self.includes, self.case_sensitive)?)
        };
        let excludes = if self.excludes.is_empty() {
            None
        } else {
            Some(path_matcher(&self.excludes, self.case_sensitive)?)
        };
        Ok(ElementMatcher {
            includes,
            excludes,
            include_specs: self.include_specs.clone(),
            exclude_specs: self.exclude_specs.clone(),
        })
    }
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("includes", &self.includes)
            .field("excludes", &self.excludes)
            .field("include_specs", &self.include_specs.len())
            .field("exclude_specs", &self.exclude_specs.len())
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

/// Compiled include/exclude rules.
///
/// An element is rejected when it, or any directory above it, matches an
/// exclude rule. Include rules only narrow files; directories pass through
/// so that matching files below them stay reachable.
pub struct ElementMatcher {
    includes: Option<PathMatcher>,
    excludes: Option<PathMatcher>,
    include_specs: Vec<ElementSpec>,
    exclude_specs: Vec<ElementSpec>,
}

impl ElementMatcher {
    /// Decide whether an element passes the rules.
    pub fn is_satisfied_by(&self, element: &FileElement) -> bool {
        if self.is_excluded(element) {
            return false;
        }
        if element.is_directory() {
            return true;
        }
        if self.includes.is_none() && self.include_specs.is_empty() {
            return true;
        }
        self.includes
            .as_ref()
            .is_some_and(|m| m.matches_path(&element.relative_path))
            || self.include_specs.iter().any(|spec| spec(element))
    }

    fn is_excluded(&self, element: &FileElement) -> bool {
        if let Some(excludes) = &self.excludes {
            if excludes.matches_path(&element.relative_path)
                || element
                    .relative_path
                    .ancestor_strings()
                    .iter()
                    .any(|dir| excludes.matches(dir))
            {
                return true;
            }
        }
        self.exclude_specs.iter().any(|spec| spec(element))
    }
}

/// Glob matcher over slash-separated relative paths.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    set: GlobSet,
    patterns: Vec<String>,
}

impl PathMatcher {
    /// Check a slash-separated path.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    /// Check a relative path.
    pub fn matches_path(&self, path: &RelativePath) -> bool {
        self.matches(&path.path_string())
    }

    /// Normalized source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Build a matcher accepting paths that match any of `patterns`.
///
/// `*` does not cross directory boundaries, `**` does, and a trailing
/// separator is shorthand for everything below that directory.
pub fn path_matcher<S: AsRef<str>>(
    patterns: impl IntoIterator<Item = S>,
    case_sensitive: bool,
) -> SpecResult<PathMatcher> {
    let mut builder = GlobSetBuilder::new();
    let mut normalized = Vec::new();
    for pattern in patterns {
        let pattern = normalize_pattern(pattern.as_ref());
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| SpecError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
        normalized.push(pattern);
    }
    let set = builder.build().map_err(|source| SpecError::InvalidPattern {
        pattern: normalized.join(", "),
        source,
    })?;
    Ok(PathMatcher {
        set,
        patterns: normalized,
    })
}

fn normalize_pattern(pattern: &str) -> String {
    let mut pattern = pattern.replace('\\', "/");
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    pattern
}
