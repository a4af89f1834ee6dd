//! Effective configuration of a spec in the context of its ancestors.

use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use copyspec_core::{
    DuplicatesStrategy, ElementSpec, FileResolver, FileTree, PatternSet, RelativePath,
    ResolvedNotation, SpecDefaults, SpecResult,
};

use crate::actions::CopyAction;
use crate::spec::{CopySpec, SpecState};

/// What a resolver inherits from.
#[derive(Clone)]
pub enum ParentScope {
    /// Top of the chain; unset values fall back to these defaults.
    Root(Rc<SpecDefaults>),
    /// Resolver of the enclosing spec.
    Child(Rc<SpecResolver>),
}

/// Computes a spec's effective settings by walking its ancestor chain.
///
/// Scalars come from the nearest spec that sets them, or the root defaults.
/// Patterns and actions accumulate from the root down. Nothing is cached:
/// every query reads the current state of the tree, and the same spec can be
/// resolved under different parents.
#[derive(Clone)]
pub struct SpecResolver {
    spec: CopySpec,
    parent: ParentScope,
}

impl SpecResolver {
    /// Resolve `spec` as the top of a tree.
    pub fn root(spec: &CopySpec) -> Self {
        let defaults = spec.state().defaults.clone();
        Self {
            spec: spec.clone(),
            parent: ParentScope::Root(defaults),
        }
    }

    /// Resolve `spec` beneath `parent`.
    pub fn relative_to(spec: &CopySpec, parent: &SpecResolver) -> Self {
        Self {
            spec: spec.clone(),
            parent: ParentScope::Child(Rc::new(parent.clone())),
        }
    }

    /// The spec being resolved.
    pub fn spec(&self) -> &CopySpec {
        &self.spec
    }

    /// The enclosing resolver, unless this is a root.
    pub fn parent(&self) -> Option<&SpecResolver> {
        match &self.parent {
            ParentScope::Root(_) => None,
            ParentScope::Child(parent) => Some(parent.as_ref()),
        }
    }

    /// Whether this resolver is the top of its chain.
    pub fn is_root(&self) -> bool {
        matches!(self.parent, ParentScope::Root(_))
    }

    fn inherit<T>(
        &self,
        own: &dyn Fn(&SpecState) -> Option<T>,
        fallback: &dyn Fn(&SpecDefaults) -> T,
    ) -> T {
        if let Some(value) = own(&*self.spec.state()) {
            return value;
        }
        match &self.parent {
            ParentScope::Root(defaults) => fallback(defaults),
            ParentScope::Child(parent) => parent.inherit(own, fallback),
        }
    }

    fn merged<T>(&self, own: &dyn Fn(&SpecState) -> Vec<T>) -> Vec<T> {
        let mut values = match &self.parent {
            ParentScope::Root(_) => Vec::new(),
            ParentScope::Child(parent) => parent.merged(own),
        };
        values.extend(own(&*self.spec.state()));
        values
    }

    // ==================== Scalars ====================

    /// Effective case sensitivity.
    pub fn is_case_sensitive(&self) -> bool {
        self.inherit(&|s| s.case_sensitive, &|d| d.case_sensitive)
    }

    /// Effective empty directory policy.
    pub fn include_empty_dirs(&self) -> bool {
        self.inherit(&|s| s.include_empty_dirs, &|d| d.include_empty_dirs)
    }

    /// Effective duplicate handling.
    pub fn duplicates_strategy(&self) -> DuplicatesStrategy {
        self.inherit(&|s| s.duplicates_strategy, &|d| d.duplicates_strategy)
    }

    /// Effective file permissions; `None` keeps the source permissions.
    pub fn file_mode(&self) -> Option<u32> {
        self.inherit(&|s| s.file_mode.map(Some), &|d| d.file_mode)
    }

    /// Effective directory permissions; `None` keeps the source permissions.
    pub fn dir_mode(&self) -> Option<u32> {
        self.inherit(&|s| s.dir_mode.map(Some), &|d| d.dir_mode)
    }

    /// Effective filtering charset.
    pub fn filtering_charset(&self) -> String {
        self.inherit(&|s| s.filtering_charset.clone(), &|d| {
            d.filtering_charset.clone()
        })
    }

    // ==================== Merged lists ====================

    /// Include globs of every spec from the root down to this one.
    pub fn all_includes(&self) -> Vec<String> {
        self.merged(&|s| s.patterns.includes().iter().cloned().collect())
    }

    /// Exclude globs of every spec from the root down to this one.
    pub fn all_excludes(&self) -> Vec<String> {
        self.merged(&|s| s.patterns.excludes().iter().cloned().collect())
    }

    /// Include predicates from the root down.
    pub fn all_include_specs(&self) -> Vec<ElementSpec> {
        self.merged(&|s| s.patterns.include_spec_list().to_vec())
    }

    /// Exclude predicates from the root down.
    pub fn all_exclude_specs(&self) -> Vec<ElementSpec> {
        self.merged(&|s| s.patterns.exclude_spec_list().to_vec())
    }

    /// Actions from the root down, in the order they apply.
    pub fn all_actions(&self) -> Vec<CopyAction> {
        self.merged(&|s| s.actions.clone())
    }

    /// Merged patterns with the effective case sensitivity.
    pub fn pattern_set(&self) -> PatternSet {
        let mut patterns = PatternSet::new();
        patterns
            .set_case_sensitive(self.is_case_sensitive())
            .include(self.all_includes())
            .include_specs(self.all_include_specs())
            .exclude(self.all_excludes())
            .exclude_specs(self.all_exclude_specs());
        patterns
    }

    // ==================== Destination and sources ====================

    /// Effective destination directory.
    ///
    /// An absolute destination replaces whatever the ancestors set; a
    /// relative one is appended to the parent's destination.
    pub fn destination_path(&self) -> SpecResult<RelativePath> {
        let parent_path = match &self.parent {
            ParentScope::Root(_) => RelativePath::empty_dir(),
            ParentScope::Child(parent) => parent.destination_path()?,
        };
        let destination = self.spec.state().destination.clone();
        let Some(destination) = destination else {
            return Ok(parent_path);
        };
        Ok(match destination.resolve()? {
            ResolvedNotation::Absolute(text) => RelativePath::parse(false, &text),
            ResolvedNotation::Relative(text) => {
                RelativePath::parse_with_parent(false, &parent_path, &text)
            }
        })
    }

    /// This spec's own sources, filtered through the merged patterns.
    pub fn own_source(&self, files: &dyn FileResolver) -> SpecResult<FileTree> {
        let sources: Vec<_> = self.spec.state().sources.iter().cloned().collect();
        if sources.is_empty() {
            return Ok(FileTree::empty());
        }
        let tree = files.resolve_files_as_tree(&sources)?;
        let matcher = self.pattern_set().matcher()?;
        Ok(tree.matching(&matcher))
    }

    /// Sources of this spec and all descendants, pre-order with children in
    /// addition order.
    pub fn all_source(&self, files: &dyn FileResolver) -> SpecResult<FileTree> {
        let mut trees = Vec::new();
        self.try_walk(&mut |resolver| -> SpecResult<()> {
            trees.push(resolver.own_source(files)?);
            Ok(())
        })?;
        debug!(specs = trees.len(), "collected sources");
        Ok(FileTree::composite(trees))
    }

    // ==================== Traversal ====================

    /// Resolvers for the children, in addition order.
    pub fn children(&self) -> Vec<SpecResolver> {
        self.spec
            .children_in_addition_order()
            .iter()
            .map(|child| SpecResolver::relative_to(child, self))
            .collect()
    }

    /// Resolvers for the children, in structural order.
    pub fn structural_children(&self) -> Vec<SpecResolver> {
        self.spec
            .children()
            .iter()
            .map(|child| SpecResolver::relative_to(child, self))
            .collect()
    }

    /// Visit this resolver and every descendant, pre-order, children in
    /// addition order.
    pub fn walk(&self, visitor: &mut dyn FnMut(&SpecResolver)) {
        visitor(self);
        for child in self.children() {
            child.walk(visitor);
        }
    }

    /// Like [`SpecResolver::walk`], stopping at the first error.
    pub fn try_walk<E>(
        &self,
        visitor: &mut dyn FnMut(&SpecResolver) -> Result<(), E>,
    ) -> Result<(), E> {
        visitor(self)?;
        for child in self.children() {
            child.try_walk(visitor)?;
        }
        Ok(())
    }

    /// Snapshot of the effective settings.
    pub fn settings(&self) -> SpecResult<EffectiveSettings> {
        Ok(EffectiveSettings {
            destination: self.destination_path()?.path_string(),
            sources: self.spec.sources().iter().map(ToString::to_string).collect(),
            includes: self.all_includes(),
            excludes: self.all_excludes(),
            case_sensitive: self.is_case_sensitive(),
            include_empty_dirs: self.include_empty_dirs(),
            duplicates_strategy: self.duplicates_strategy(),
            filtering_charset: self.filtering_charset(),
            file_mode: self.file_mode(),
            dir_mode: self.dir_mode(),
            actions: self.all_actions().len(),
        })
    }
}

impl std::fmt::Debug for SpecResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecResolver")
            .field("spec", &self.spec)
            .field("root", &self.is_root())
            .finish()
    }
}

/// Effective settings of one spec, as resolved at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    pub destination: String,
    pub sources: Vec<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub case_sensitive: bool,
    pub include_empty_dirs: bool,
    pub duplicates_strategy: DuplicatesStrategy,
    pub filtering_charset: String,
    pub file_mode: Option<u32>,
    pub dir_mode: Option<u32>,
    pub actions: usize,
}
