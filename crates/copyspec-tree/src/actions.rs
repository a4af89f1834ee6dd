//! Per-file copy actions.

use std::rc::Rc;

use regex::Regex;

use copyspec_core::{FileCopyDetails, LineFilter, PathMatcher, SpecError, SpecResult};

/// A transform applied to every file a spec copies.
pub type CopyAction = Rc<dyn Fn(&mut FileCopyDetails)>;

/// Wrap a closure as a copy action.
pub fn action(f: impl Fn(&mut FileCopyDetails) + 'static) -> CopyAction {
    Rc::new(f)
}

/// Rename files through `renamer`; `None` leaves the name unchanged.
pub fn renaming(renamer: impl Fn(&str) -> Option<String> + 'static) -> CopyAction {
    Rc::new(move |details: &mut FileCopyDetails| {
        if let Some(name) = renamer(details.name()) {
            details.set_name(&name);
        }
    })
}

/// Queue a line filter on every file.
pub fn filtering(filter: LineFilter) -> CopyAction {
    Rc::new(move |details: &mut FileCopyDetails| details.filter(filter.clone()))
}

/// Queue `${name}` property expansion on every file.
pub fn expanding(properties: Vec<(String, String)>) -> CopyAction {
    Rc::new(move |details: &mut FileCopyDetails| details.expand(properties.iter().cloned()))
}

/// Run `inner` only for files whose source path matches (or, when
/// `negate` is set, does not match) `matcher`.
pub fn matching(matcher: PathMatcher, negate: bool, inner: CopyAction) -> CopyAction {
    Rc::new(move |details: &mut FileCopyDetails| {
        if matcher.matches_path(details.source_path()) != negate {
            inner(details);
        }
    })
}

/// Regular expression based file name mapper.
#[derive(Debug, Clone)]
pub struct RegexRenamer {
    regex: Regex,
    replacement: String,
}

impl RegexRenamer {
    /// Compile a renamer. `$1`-style group references are allowed in `replacement`.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> SpecResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| SpecError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            regex,
            replacement: replacement.into(),
        })
    }

    /// Map a name, or `None` if the expression does not match it.
    pub fn transform(&self, name: &str) -> Option<String> {
        self.regex
            .is_match(name)
            .then(|| self.regex.replace_all(name, self.replacement.as_str()).into_owned())
    }

    /// The renamer as a copy action.
    pub fn into_action(self) -> CopyAction {
        renaming(move |name| self.transform(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copyspec_core::{DuplicatesStrategy, FileElement, path_matcher};

    fn details(path: &str) -> FileCopyDetails {
        let element = FileElement::file(path, path, 0, 0o644);
        let relative = element.relative_path.clone();
        FileCopyDetails::new(element, relative, 0o644, DuplicatesStrategy::Include)
    }

    #[test]
    fn test_regex_renamer() {
        let renamer = RegexRenamer::new(r"(.*)_OEM_BLUE_(.*)", "$1$2").unwrap();
        assert_eq!(renamer.transform("a_OEM_BLUE_b.txt").as_deref(), Some("ab.txt"));
        assert_eq!(renamer.transform("plain.txt"), None);
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            RegexRenamer::new("(", "x"),
            Err(SpecError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_renaming_action() {
        let action = RegexRenamer::new(r"\.txt$", ".md").unwrap().into_action();
        let mut file = details("docs/a.txt");
        action(&mut file);
        assert_eq!(file.path(), "docs/a.md");
    }

    #[test]
    fn test_matching_action() {
        let exclude = action(|d: &mut FileCopyDetails| d.exclude());
        let only_logs = matching(path_matcher(["**/*.log"], true).unwrap(), false, exclude.clone());
        let except_logs = matching(path_matcher(["**/*.log"], true).unwrap(), true, exclude);

        let mut log = details("x/y.log");
        only_logs(&mut log);
        assert!(log.is_excluded());

        let mut log = details("x/y.log");
        except_logs(&mut log);
        assert!(!log.is_excluded());

        let mut text = details("x/y.txt");
        except_logs(&mut text);
        assert!(text.is_excluded());
    }
}
