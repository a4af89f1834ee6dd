use std::cell::RefCell;
use std::rc::Rc;

use copyspec_core::{MemoryFileResolver, PathNotation, SpecDefaults, SpecError, WarningKind};
use copyspec_tree::{CopySpec, SpecAddress, SpecRegistry};

fn recorder(spec: &CopySpec) -> Rc<RefCell<Vec<(String, CopySpec)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    spec.add_child_spec_listener(move |address, child| {
        sink.borrow_mut().push((address.to_string(), child.clone()));
    });
    seen
}

fn source_names(spec: &CopySpec, files: &MemoryFileResolver) -> Vec<String> {
    spec.resolver()
        .all_source(files)
        .unwrap()
        .iter()
        .map(|e| e.source.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scalar_override_wins_nearest() {
    let defaults = SpecDefaults::builder()
        .include_empty_dirs(false)
        .build()
        .unwrap();
    let root = CopySpec::with_defaults(defaults).unwrap();
    let child = root.add_child();
    let grandchild = child.add_child();

    assert!(!grandchild.include_empty_dirs());
    child.set_include_empty_dirs(true);
    assert!(grandchild.include_empty_dirs());
    assert!(!root.include_empty_dirs());
}

#[test]
fn test_charset_alias_same_at_any_level() {
    let defaults = SpecDefaults::builder()
        .filtering_charset("latin1")
        .build()
        .unwrap();
    let root = CopySpec::with_defaults(defaults).unwrap();
    let child = root.add_child();
    let grandchild = child.add_child();
    grandchild.set_filtering_charset("latin1").unwrap();

    assert_eq!(child.filtering_charset(), "ISO-8859-1");
    assert_eq!(grandchild.filtering_charset(), child.filtering_charset());
}

#[test]
fn test_unsupported_root_charset_rejected() {
    let defaults = SpecDefaults {
        filtering_charset: "klingon-8".to_string(),
        ..SpecDefaults::default()
    };
    assert!(matches!(
        CopySpec::with_defaults(defaults),
        Err(SpecError::InvalidConfig { .. })
    ));
}

#[test]
fn test_case_insensitive_inherited() {
    let root = CopySpec::new();
    root.set_case_sensitive(false);
    let child = root.add_child();
    assert!(!child.resolver().is_case_sensitive());
    assert!(!child.resolver().pattern_set().is_case_sensitive());
}

#[test]
fn test_patterns_are_superset_of_ancestors() {
    let root = CopySpec::new();
    root.include(["*.txt"]).exclude(["*.bak"]);
    let child = root.add_child();
    child.exclude(["draft*.txt"]);
    let grandchild = child.add_child();
    grandchild.include(["*.md"]);

    let parent = child.resolver();
    let nested = grandchild.resolver();
    for include in parent.all_includes() {
        assert!(nested.all_includes().contains(&include));
    }
    for exclude in parent.all_excludes() {
        assert!(nested.all_excludes().contains(&exclude));
    }
}

#[test]
fn test_actions_are_parent_then_own() {
    let root = CopySpec::new();
    root.rename(|_| Some("root".into()));
    let child = root.add_child();
    child.rename(|_| Some("child".into()));
    child.append_caching_safe_action(|_| {});

    let parent_actions = root.resolver().all_actions();
    let actions = child.resolver().all_actions();
    assert_eq!(actions.len(), parent_actions.len() + child.own_actions().len());
    assert!(Rc::ptr_eq(&actions[0], &parent_actions[0]));
    for (merged, own) in actions[1..].iter().zip(child.own_actions()) {
        assert!(Rc::ptr_eq(merged, &own));
    }
}

#[test]
fn test_draft_exclude_scenario() {
    let mut files = MemoryFileResolver::new();
    files.add_files("src", ["a.txt", "draft1.txt", "b.md"]);

    let root = CopySpec::new();
    root.include(["*.txt"]);
    let child = root.add_child();
    child.from(["src"]).exclude(["draft*.txt"]);

    let own = child.resolver().own_source(&files).unwrap();
    assert_eq!(own.file_paths(), vec!["a.txt"]);
}

#[test]
fn test_destination_scenario() {
    let root = CopySpec::new();
    root.into_dir("rel/out");
    let absolute = root.add_child();
    absolute.into_dir("/abs/out");
    let relative = root.add_child();
    relative.into_dir("sub");

    let abs = absolute.resolver().destination_path().unwrap();
    assert_eq!(abs.path_string(), "abs/out");
    let rel = relative.resolver().destination_path().unwrap();
    assert_eq!(rel.path_string(), "rel/out/sub");
}

#[test]
fn test_deferred_destination() {
    let name = Rc::new(RefCell::new(String::from("first")));
    let provider = name.clone();
    let root = CopySpec::new();
    root.into_dir(PathNotation::deferred(move || {
        Some(PathNotation::from(provider.borrow().clone()))
    }));

    assert_eq!(root.resolver().destination_path().unwrap().path_string(), "first");
    *name.borrow_mut() = "second".into();
    assert_eq!(root.resolver().destination_path().unwrap().path_string(), "second");
}

#[test]
fn test_prebuilt_subtree_notifies_each_node_once() {
    let root = CopySpec::new();
    root.add_child();
    let first = recorder(&root);
    let second = recorder(&root);

    // Three nodes built before attachment.
    let subtree = CopySpec::new();
    let a = subtree.add_child();
    a.add_child();
    assert!(first.borrow().is_empty());

    root.with(&subtree).unwrap();

    for seen in [&first, &second] {
        let keys: Vec<_> = seen.borrow().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec!["$2", "$2$1", "$2$1$1"]);
        assert!(seen.borrow()[0].1.ptr_eq(&subtree));
        assert!(seen.borrow()[1].1.ptr_eq(&a));
    }
}

#[test]
fn test_late_descendants_bubble_up() {
    let root = CopySpec::new();
    let child = root.add_child();
    let seen = recorder(&root);

    let grandchild = child.add_child();
    let great = grandchild.add_child();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "$1$1");
    assert_eq!(seen[1].0, "$1$1$1");
    assert!(seen[1].1.ptr_eq(&great));
}

#[test]
fn test_addition_order_ignores_prepends() {
    let mut files = MemoryFileResolver::new();
    files.add_files("one", ["1.txt"]);
    files.add_files("two", ["2.txt"]);

    let appended = CopySpec::new();
    appended.add_child().from(["one"]);
    appended.add_child().from(["two"]);

    let prepended = CopySpec::new();
    prepended.add_child().from(["one"]);
    prepended.add_first().from(["two"]);

    assert_eq!(source_names(&appended, &files), source_names(&prepended, &files));
    assert!(prepended.children()[0].sources()[0] == PathNotation::from("two"));
}

#[test]
fn test_address_stable_under_unrelated_attach() {
    let root = CopySpec::new();
    let registry = SpecRegistry::attach(&root, "rootSpec");
    let a = root.add_child();
    let target = a.add_child();
    let before = registry.key_of(&target);

    let b = root.add_first();
    b.add_child();
    a.add_first();

    assert_eq!(before.as_deref(), Some("rootSpec$1$1"));
    assert_eq!(registry.key_of(&target), before);
    assert_eq!(registry.key_of(&b).as_deref(), Some("rootSpec$2"));
}

#[test]
fn test_identical_builds_produce_identical_keys() {
    let build = || {
        let root = CopySpec::new();
        let registry = SpecRegistry::attach(&root, "");
        let a = root.add_child();
        root.add_first().add_child();
        a.add_child_at(0);
        registry.keys()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_visit_is_pre_order_by_addition() {
    let root = CopySpec::new();
    let a = root.add_child();
    let b = root.add_first();
    a.add_child();
    b.add_child();

    let top = CopySpec::new();
    let mut keys = Vec::new();
    root.visit(&SpecAddress::new(&top, 0), &mut |address, _| {
        keys.push(address.to_string());
    });
    assert_eq!(keys, vec!["$1", "$1$1", "$1$1$1", "$1$2", "$1$2$1"]);
}

#[test]
fn test_missing_configure_warns() {
    let root = CopySpec::new();
    root.from_with("src", None::<fn(&CopySpec)>);

    let warnings = root.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::DeprecatedUsage);
    assert_eq!(root.sources(), vec![PathNotation::from("src")]);
}

#[test]
fn test_usage_errors_leave_tree_untouched() {
    let root = CopySpec::new();
    let child = root.add_child();

    assert!(matches!(child.with(&root), Err(SpecError::CyclicAttachment)));
    assert!(matches!(
        root.files_matching(Vec::<&str>::new(), |_| {}),
        Err(SpecError::EmptyPatterns { .. })
    ));
    assert!(matches!(
        root.set_filtering_charset("no-such-charset"),
        Err(SpecError::UnsupportedCharset { .. })
    ));

    assert_eq!(root.children().len(), 1);
    assert!(child.children().is_empty());
    assert!(!root.has_custom_actions());
    assert_eq!(root.filtering_charset(), "UTF-8");
}

#[test]
fn test_files_matching_uses_current_case_sensitivity() {
    let root = CopySpec::new();
    root.set_case_sensitive(false);
    let child = root.add_child();
    child.from(["src"]);
    child
        .files_matching(["**/*.TXT"], |details| details.set_mode(0o600))
        .unwrap();

    let mut files = MemoryFileResolver::new();
    files.add_files("src", ["a.txt"]);
    let plan = copyspec_tree::CopyPlan::build(&root.resolver(), &files).unwrap();
    assert_eq!(plan.entries[0].mode, 0o600);
}

#[test]
fn test_settings_serialize() {
    let root = CopySpec::new();
    root.into_dir("out").set_dir_mode(Some(0o755));
    let json = serde_json::to_value(root.resolver().settings().unwrap()).unwrap();
    assert_eq!(json["destination"], "out");
    assert_eq!(json["dir_mode"], 0o755);
    assert_eq!(json["duplicates_strategy"], "include");
}
