//! Copy specification nodes.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use tracing::{debug, warn};

use copyspec_core::{
    DuplicatesStrategy, FileCopyDetails, FileElement, PathNotation, PatternSet, SpecDefaults,
    SpecError, SpecResult, SpecWarning, path_matcher, validate_charset,
};

use crate::actions::{self, CopyAction, RegexRenamer};
use crate::address::SpecAddress;
use crate::resolver::SpecResolver;

/// Callback told about every spec added anywhere below the node it is
/// registered on. The address locates the new spec's parent relative to
/// that node.
pub type SpecListener = Rc<dyn Fn(&SpecAddress, &CopySpec)>;

pub(crate) struct SpecState {
    pub(crate) sources: IndexSet<PathNotation>,
    pub(crate) destination: Option<PathNotation>,
    pub(crate) patterns: PatternSet,
    pub(crate) actions: Vec<CopyAction>,
    has_custom_actions: bool,
    pub(crate) dir_mode: Option<u32>,
    pub(crate) file_mode: Option<u32>,
    pub(crate) case_sensitive: Option<bool>,
    pub(crate) include_empty_dirs: Option<bool>,
    pub(crate) duplicates_strategy: Option<DuplicatesStrategy>,
    pub(crate) filtering_charset: Option<String>,
    children: Vec<CopySpec>,
    children_by_addition: Vec<CopySpec>,
    listeners: Vec<SpecListener>,
    warnings: Vec<SpecWarning>,
    pub(crate) defaults: Rc<SpecDefaults>,
    owner: Option<Weak<RefCell<SpecState>>>,
}

impl SpecState {
    fn new(defaults: Rc<SpecDefaults>, owner: Option<Weak<RefCell<SpecState>>>) -> Self {
        Self {
            sources: IndexSet::new(),
            destination: None,
            patterns: PatternSet::new(),
            actions: Vec::new(),
            has_custom_actions: false,
            dir_mode: None,
            file_mode: None,
            case_sensitive: None,
            include_empty_dirs: None,
            duplicates_strategy: None,
            filtering_charset: None,
            children: Vec::new(),
            children_by_addition: Vec::new(),
            listeners: Vec::new(),
            warnings: Vec::new(),
            defaults,
            owner,
        }
    }
}

/// A node in a copy specification tree.
///
/// `CopySpec` is a shared handle: clones refer to the same node. A node
/// holds its own configuration only; anything inherited from ancestors is
/// computed by a [`SpecResolver`] each time it is asked for.
///
/// Children are kept twice. `children()` is the structural order, which
/// callers may change by inserting at a position. `children_in_addition_order()`
/// is the order children were first attached and never changes; addresses
/// and whole-tree source walks are based on it.
#[derive(Clone)]
pub struct CopySpec {
    inner: Rc<RefCell<SpecState>>,
}

impl CopySpec {
    /// Create a root spec with default settings.
    pub fn new() -> Self {
        Self::root(SpecDefaults::default())
    }

    /// Create a root spec whose resolvers fall back to `defaults`.
    ///
    /// Fails with [`SpecError::InvalidConfig`] when the defaults name an
    /// unsupported filtering charset.
    pub fn with_defaults(defaults: SpecDefaults) -> SpecResult<Self> {
        Ok(Self::root(defaults.validated()?))
    }

    fn root(defaults: SpecDefaults) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SpecState::new(Rc::new(defaults), None))),
        }
    }

    fn new_child(&self) -> Self {
        let defaults = self.inner.borrow().defaults.clone();
        let owner = Some(Rc::downgrade(&self.inner));
        Self {
            inner: Rc::new(RefCell::new(SpecState::new(defaults, owner))),
        }
    }

    pub(crate) fn state(&self) -> Ref<'_, SpecState> {
        self.inner.borrow()
    }

    /// Check if two handles refer to the same node.
    pub fn ptr_eq(&self, other: &CopySpec) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Root defaults used when nothing in the chain sets a value.
    pub fn defaults(&self) -> SpecDefaults {
        self.inner.borrow().defaults.as_ref().clone()
    }

    // ==================== Sources and destination ====================

    /// Add source selectors.
    pub fn from<P: Into<PathNotation>>(&self, sources: impl IntoIterator<Item = P>) -> &Self {
        self.inner
            .borrow_mut()
            .sources
            .extend(sources.into_iter().map(Into::into));
        self
    }

    /// Copy `source` through a new child configured by `configure`.
    ///
    /// Returns the child. Without a callback the source is added to this
    /// spec instead, a deprecation warning is raised and this spec is
    /// returned.
    pub fn from_with<P, F>(&self, source: P, configure: Option<F>) -> CopySpec
    where
        P: Into<PathNotation>,
        F: FnOnce(&CopySpec),
    {
        match configure {
            Some(configure) => {
                let child = self.add_child();
                child.from([source]);
                configure(&child);
                child
            }
            None => {
                self.nag_deprecated(
                    "Passing no configuration action to CopySpec.from() is deprecated.",
                );
                self.from([source]);
                self.clone()
            }
        }
    }

    /// Set the destination. Absolute paths replace the inherited destination,
    /// relative ones are appended to it.
    pub fn into_dir(&self, destination: impl Into<PathNotation>) -> &Self {
        self.inner.borrow_mut().destination = Some(destination.into());
        self
    }

    /// Copy into `destination` through a new child configured by `configure`.
    ///
    /// Same fallback as [`CopySpec::from_with`] when no callback is given.
    pub fn into_dir_with<P, F>(&self, destination: P, configure: Option<F>) -> CopySpec
    where
        P: Into<PathNotation>,
        F: FnOnce(&CopySpec),
    {
        match configure {
            Some(configure) => {
                let child = self.add_child();
                child.into_dir(destination);
                configure(&child);
                child
            }
            None => {
                self.nag_deprecated(
                    "Passing no configuration action to CopySpec.into() is deprecated.",
                );
                self.into_dir(destination);
                self.clone()
            }
        }
    }

    /// Source selectors in the order they were first added.
    pub fn sources(&self) -> Vec<PathNotation> {
        self.inner.borrow().sources.iter().cloned().collect()
    }

    /// This spec's own destination rule.
    pub fn destination(&self) -> Option<PathNotation> {
        self.inner.borrow().destination.clone()
    }

    // ==================== Children ====================

    /// Create a child at the end of the structural order.
    pub fn add_child(&self) -> CopySpec {
        let child = self.new_child();
        self.attach(None, &child);
        child
    }

    /// Create a child at the front of the structural order.
    pub fn add_first(&self) -> CopySpec {
        self.add_child_at(0)
    }

    /// Create a child at `position` in the structural order (clamped to the end).
    pub fn add_child_at(&self, position: usize) -> CopySpec {
        let child = self.new_child();
        self.attach(Some(position), &child);
        child
    }

    /// Create a child placed just before `sibling`, or at the end if
    /// `sibling` is not a child of this spec.
    pub fn add_child_before(&self, sibling: &CopySpec) -> CopySpec {
        let position = self
            .inner
            .borrow()
            .children
            .iter()
            .position(|c| c.ptr_eq(sibling));
        match position {
            Some(position) => self.add_child_at(position),
            None => self.add_child(),
        }
    }

    /// Attach an existing spec (possibly with its own subtree) as the last child.
    pub fn with(&self, other: &CopySpec) -> SpecResult<&Self> {
        if self.inner.borrow().children.iter().any(|c| c.ptr_eq(other)) {
            return Err(SpecError::AlreadyAttached);
        }
        if other.contains(self) {
            return Err(SpecError::CyclicAttachment);
        }
        self.attach(None, other);
        Ok(self)
    }

    /// Attach several existing specs, stopping at the first failure.
    pub fn with_all<'a>(&self, others: impl IntoIterator<Item = &'a CopySpec>) -> SpecResult<&Self> {
        for other in others {
            self.with(other)?;
        }
        Ok(self)
    }

    fn attach(&self, position: Option<usize>, child: &CopySpec) {
        let addition_index = {
            let mut state = self.inner.borrow_mut();
            let position = position.unwrap_or(state.children.len()).min(state.children.len());
            state.children.insert(position, child.clone());
            state.children_by_addition.push(child.clone());
            let addition_index = state.children_by_addition.len() - 1;
            debug!(position, addition_index, "attached child spec");
            addition_index
        };

        // Later additions below the child bubble up through this spec.
        let parent = Rc::downgrade(&self.inner);
        child.add_child_spec_listener(move |address, spec| {
            if let Some(inner) = parent.upgrade() {
                let owner = CopySpec { inner };
                let path = SpecAddress::new(&owner, addition_index).append(address);
                owner.fire_child_spec_listeners(&path, spec);
            }
        });

        // Replay what the child already holds.
        if self.has_listeners() {
            child.visit(&SpecAddress::new(self, addition_index), &mut |address, spec| {
                self.fire_child_spec_listeners(address, spec);
            });
        }
    }

    /// Children in structural order.
    pub fn children(&self) -> Vec<CopySpec> {
        self.inner.borrow().children.clone()
    }

    /// Children in the order they were first attached.
    pub fn children_in_addition_order(&self) -> Vec<CopySpec> {
        self.inner.borrow().children_by_addition.clone()
    }

    /// Position of `child` in the addition order.
    pub fn addition_index_of(&self, child: &CopySpec) -> Option<usize> {
        self.inner
            .borrow()
            .children_by_addition
            .iter()
            .position(|c| c.ptr_eq(child))
    }

    /// Check if `other` is this spec or one of its descendants.
    pub fn contains(&self, other: &CopySpec) -> bool {
        self.ptr_eq(other)
            || self
                .children_in_addition_order()
                .iter()
                .any(|child| child.contains(other))
    }

    // ==================== Listeners ====================

    /// Register a listener for specs added anywhere below this one.
    pub fn add_child_spec_listener(&self, listener: impl Fn(&SpecAddress, &CopySpec) + 'static) {
        self.inner.borrow_mut().listeners.push(Rc::new(listener));
    }

    /// Check if any listener has been registered.
    pub fn has_listeners(&self) -> bool {
        !self.inner.borrow().listeners.is_empty()
    }

    fn fire_child_spec_listeners(&self, address: &SpecAddress, spec: &CopySpec) {
        let listeners = self.inner.borrow().listeners.clone();
        for listener in listeners {
            listener(address, spec);
        }
    }

    /// Visit this spec and its descendants in pre-order, children in
    /// addition order. `parent_address` is the address handed to the visitor
    /// for this spec; descendants get it extended one segment per level.
    pub fn visit(&self, parent_address: &SpecAddress, visitor: &mut dyn FnMut(&SpecAddress, &CopySpec)) {
        visitor(parent_address, self);
        for (index, child) in self.children_in_addition_order().iter().enumerate() {
            child.visit(&parent_address.append_child(self, index), visitor);
        }
    }

    // ==================== Patterns ====================

    /// Add include globs.
    pub fn include<S: Into<String>>(&self, patterns: impl IntoIterator<Item = S>) -> &Self {
        self.inner.borrow_mut().patterns.include(patterns);
        self
    }

    /// Add an include predicate.
    pub fn include_spec(&self, spec: impl Fn(&FileElement) -> bool + 'static) -> &Self {
        self.inner.borrow_mut().patterns.include_spec(spec);
        self
    }

    /// Replace the include globs.
    pub fn set_includes<S: Into<String>>(&self, patterns: impl IntoIterator<Item = S>) -> &Self {
        self.inner.borrow_mut().patterns.set_includes(patterns);
        self
    }

    /// This spec's own include globs.
    pub fn includes(&self) -> Vec<String> {
        self.inner.borrow().patterns.includes().iter().cloned().collect()
    }

    /// Add exclude globs.
    pub fn exclude<S: Into<String>>(&self, patterns: impl IntoIterator<Item = S>) -> &Self {
        self.inner.borrow_mut().patterns.exclude(patterns);
        self
    }

    /// Add an exclude predicate.
    pub fn exclude_spec(&self, spec: impl Fn(&FileElement) -> bool + 'static) -> &Self {
        self.inner.borrow_mut().patterns.exclude_spec(spec);
        self
    }

    /// Replace the exclude globs.
    pub fn set_excludes<S: Into<String>>(&self, patterns: impl IntoIterator<Item = S>) -> &Self {
        self.inner.borrow_mut().patterns.set_excludes(patterns);
        self
    }

    /// This spec's own exclude globs.
    pub fn excludes(&self) -> Vec<String> {
        self.inner.borrow().patterns.excludes().iter().cloned().collect()
    }

    /// A copy of this spec's own pattern set.
    pub fn patterns(&self) -> PatternSet {
        self.inner.borrow().patterns.clone()
    }

    // ==================== Actions ====================

    /// Run `action` on every file copied by this spec.
    pub fn each_file(&self, action: impl Fn(&mut FileCopyDetails) + 'static) -> &Self {
        self.append_action(actions::action(action))
    }

    /// Filter file content line by line. Returning `None` drops the line.
    pub fn filter(&self, filter: impl Fn(&str) -> Option<String> + 'static) -> &Self {
        self.append_action(actions::filtering(Rc::new(filter)))
    }

    /// Expand `${name}` placeholders in file content.
    pub fn expand<K, V>(&self, properties: impl IntoIterator<Item = (K, V)>) -> &Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.append_action(actions::expanding(properties))
    }

    /// Rename files; `None` keeps the current name.
    pub fn rename(&self, renamer: impl Fn(&str) -> Option<String> + 'static) -> &Self {
        self.append_action(actions::renaming(renamer))
    }

    /// Rename files whose name matches `pattern`.
    pub fn rename_regex(&self, pattern: &str, replacement: &str) -> SpecResult<&Self> {
        let renamer = RegexRenamer::new(pattern, replacement)?;
        Ok(self.append_action(renamer.into_action()))
    }

    /// Run `action` on files whose source path matches any of `patterns`.
    pub fn files_matching<S: AsRef<str>>(
        &self,
        patterns: impl IntoIterator<Item = S>,
        action: impl Fn(&mut FileCopyDetails) + 'static,
    ) -> SpecResult<&Self> {
        self.append_matching(patterns, false, "match", actions::action(action))
    }

    /// Run `action` on files whose source path matches none of `patterns`.
    pub fn files_not_matching<S: AsRef<str>>(
        &self,
        patterns: impl IntoIterator<Item = S>,
        action: impl Fn(&mut FileCopyDetails) + 'static,
    ) -> SpecResult<&Self> {
        self.append_matching(patterns, true, "not match", actions::action(action))
    }

    fn append_matching<S: AsRef<str>>(
        &self,
        patterns: impl IntoIterator<Item = S>,
        negate: bool,
        operation: &'static str,
        action: CopyAction,
    ) -> SpecResult<&Self> {
        let patterns: Vec<S> = patterns.into_iter().collect();
        if patterns.is_empty() {
            return Err(SpecError::EmptyPatterns { operation });
        }
        let matcher = path_matcher(&patterns, self.is_case_sensitive())?;
        Ok(self.append_action(actions::matching(matcher, negate, action)))
    }

    /// Append an action that does not count as a custom action.
    pub fn append_caching_safe_action(&self, action: impl Fn(&mut FileCopyDetails) + 'static) -> &Self {
        self.inner.borrow_mut().actions.push(actions::action(action));
        self
    }

    fn append_action(&self, action: CopyAction) -> &Self {
        {
            let mut state = self.inner.borrow_mut();
            state.has_custom_actions = true;
            state.actions.push(action);
        }
        self
    }

    /// This spec's own actions, in registration order.
    pub fn own_actions(&self) -> Vec<CopyAction> {
        self.inner.borrow().actions.clone()
    }

    /// Check if this spec or any descendant transforms files.
    pub fn has_custom_actions(&self) -> bool {
        self.inner.borrow().has_custom_actions
            || self.children().iter().any(CopySpec::has_custom_actions)
    }

    // ==================== Scalar settings ====================

    /// Set case sensitivity for pattern matching.
    pub fn set_case_sensitive(&self, case_sensitive: bool) -> &Self {
        self.inner.borrow_mut().case_sensitive = Some(case_sensitive);
        self
    }

    /// Effective case sensitivity.
    pub fn is_case_sensitive(&self) -> bool {
        self.resolver().is_case_sensitive()
    }

    /// Set whether empty directories are copied.
    pub fn set_include_empty_dirs(&self, include_empty_dirs: bool) -> &Self {
        self.inner.borrow_mut().include_empty_dirs = Some(include_empty_dirs);
        self
    }

    /// Effective empty directory policy.
    pub fn include_empty_dirs(&self) -> bool {
        self.resolver().include_empty_dirs()
    }

    /// Set or clear the duplicate handling override.
    pub fn set_duplicates_strategy(&self, strategy: Option<DuplicatesStrategy>) -> &Self {
        self.inner.borrow_mut().duplicates_strategy = strategy;
        self
    }

    /// Effective duplicate handling.
    pub fn duplicates_strategy(&self) -> DuplicatesStrategy {
        self.resolver().duplicates_strategy()
    }

    /// Set or clear the file permission override.
    pub fn set_file_mode(&self, mode: Option<u32>) -> &Self {
        self.inner.borrow_mut().file_mode = mode;
        self
    }

    /// Effective file permissions.
    pub fn file_mode(&self) -> Option<u32> {
        self.resolver().file_mode()
    }

    /// Set or clear the directory permission override.
    pub fn set_dir_mode(&self, mode: Option<u32>) -> &Self {
        self.inner.borrow_mut().dir_mode = mode;
        self
    }

    /// Effective directory permissions.
    pub fn dir_mode(&self) -> Option<u32> {
        self.resolver().dir_mode()
    }

    /// Set the charset used by content filters. Unknown charsets are rejected
    /// and leave the current setting untouched.
    pub fn set_filtering_charset(&self, charset: &str) -> SpecResult<&Self> {
        let charset = validate_charset(charset)?;
        self.inner.borrow_mut().filtering_charset = Some(charset.to_string());
        Ok(self)
    }

    /// Effective filtering charset.
    pub fn filtering_charset(&self) -> String {
        self.resolver().filtering_charset()
    }

    // ==================== Resolution ====================

    /// Resolver for this spec. Specs created through `add_child*` resolve
    /// relative to the spec that created them; all others resolve as roots.
    pub fn resolver(&self) -> SpecResolver {
        let owner = self.inner.borrow().owner.as_ref().and_then(Weak::upgrade);
        match owner {
            Some(inner) => SpecResolver::relative_to(self, &CopySpec { inner }.resolver()),
            None => SpecResolver::root(self),
        }
    }

    /// Resolver treating this spec as the root of the tree.
    pub fn root_resolver(&self) -> SpecResolver {
        SpecResolver::root(self)
    }

    /// Resolver for this spec beneath `parent`.
    pub fn resolver_relative_to(&self, parent: &SpecResolver) -> SpecResolver {
        SpecResolver::relative_to(self, parent)
    }

    /// Walk this spec and its descendants with resolvers.
    pub fn walk(&self, visitor: &mut dyn FnMut(&SpecResolver)) {
        self.resolver().walk(visitor);
    }

    // ==================== Warnings ====================

    /// Warnings raised while configuring this spec.
    pub fn warnings(&self) -> Vec<SpecWarning> {
        self.inner.borrow().warnings.clone()
    }

    fn nag_deprecated(&self, message: &str) {
        warn!(target: "copyspec::deprecation", "{message}");
        self.inner
            .borrow_mut()
            .warnings
            .push(SpecWarning::deprecated(message));
    }
}

impl Default for CopySpec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CopySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("CopySpec")
            .field("sources", &state.sources)
            .field("destination", &state.destination)
            .field("patterns", &state.patterns)
            .field("actions", &state.actions.len())
            .field("children", &state.children.len())
            .finish()
    }
}
