use copyspec_core::{
    DuplicatesStrategy, FileCopyDetails, FileElement, FileResolver, FileTree, MemoryFileResolver,
    PathNotation, PatternSet, RelativePath, SpecDefaults, SpecError, validate_charset,
};

#[test]
fn test_relative_path_operations() {
    let parent = RelativePath::parse(false, "rel/out");
    assert_eq!(parent.len(), 2);
    assert!(!parent.is_file());

    let child = RelativePath::parse_with_parent(true, &parent, "sub/file.txt");
    assert_eq!(child.path_string(), "rel/out/sub/file.txt");
    assert!(child.is_file());
    assert!(child.starts_with(&parent));

    // Display matches path_string
    assert_eq!(format!("{child}"), "rel/out/sub/file.txt");

    let empty = RelativePath::empty_dir();
    assert!(empty.is_empty());
    assert!(empty.parent().is_none());
    assert_eq!(empty.append(&child), child);
}

#[test]
fn test_notation_resolution() {
    let abs = PathNotation::from("/abs/out").resolve().unwrap();
    assert!(abs.is_absolute());

    let rel = PathNotation::from("rel/out").resolve().unwrap();
    assert!(!rel.is_absolute());
    assert_eq!(rel.text(), "rel/out");

    // Deferred providers can themselves return deferred notations
    let nested = PathNotation::deferred(|| {
        Some(PathNotation::deferred(|| Some(PathNotation::from("late"))))
    });
    assert_eq!(nested.resolve().unwrap().text(), "late");

    // A provider that never settles is rejected
    fn forever() -> Option<PathNotation> {
        Some(PathNotation::deferred(forever))
    }
    assert!(matches!(
        PathNotation::deferred(forever).resolve(),
        Err(SpecError::InvalidNotation { .. })
    ));
}

#[test]
fn test_pattern_set_scenario() {
    // Root includes *.txt, child excludes draft*.txt
    let mut merged = PatternSet::new();
    merged.include(["*.txt"]);
    merged.exclude(["draft*.txt"]);

    let tree = FileTree::new(vec![
        FileElement::file("a.txt", "a.txt", 1, 0o644),
        FileElement::file("draft1.txt", "draft1.txt", 1, 0o644),
        FileElement::file("b.md", "b.md", 1, 0o644),
    ]);

    let matched = tree.matching(&merged.matcher().unwrap());
    assert_eq!(matched.file_paths(), vec!["a.txt"]);
}

#[test]
fn test_memory_resolver_order() {
    let mut resolver = MemoryFileResolver::new();
    resolver.add_dir("src", "nested");
    resolver.add_file("src", "nested/a.txt", 10);
    resolver.add_files("assets", ["logo.png"]);

    let tree = resolver
        .resolve_files_as_tree(&[PathNotation::from("assets"), PathNotation::from("src")])
        .unwrap();

    let paths: Vec<String> = tree.iter().map(FileElement::path_string).collect();
    assert_eq!(paths, vec!["logo.png", "nested", "nested/a.txt"]);
    assert_eq!(tree.files().count(), 2);
}

#[test]
fn test_copy_details_mutation() {
    let element = FileElement::file("/src/a.txt", "a.txt", 4, 0o600);
    let mut details = FileCopyDetails::new(
        element,
        RelativePath::parse(true, "out/a.txt"),
        0o644,
        DuplicatesStrategy::Warn,
    );

    assert_eq!(details.name(), "a.txt");
    details.set_path("other/b.txt");
    assert_eq!(details.path(), "other/b.txt");
    details.set_mode(0o755);
    assert_eq!(details.mode(), 0o755);
    assert_eq!(details.duplicates_strategy(), DuplicatesStrategy::Warn);
    assert_eq!(details.source().to_str(), Some("/src/a.txt"));
}

#[test]
fn test_defaults_serde_fill_in() {
    let defaults: SpecDefaults = serde_json::from_str(r#"{"case_sensitive": false}"#).unwrap();
    assert!(!defaults.case_sensitive);
    assert!(defaults.include_empty_dirs);
    assert_eq!(defaults.filtering_charset, "UTF-8");
    assert_eq!(defaults.duplicates_strategy, DuplicatesStrategy::Include);
}

#[test]
fn test_charset_validation() {
    assert_eq!(validate_charset("iso-8859-1").unwrap(), "ISO-8859-1");
    assert!(validate_charset("not-a-charset").is_err());
}
