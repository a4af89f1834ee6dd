//! Stable addresses of specs within a tree.

use std::fmt;
use std::rc::Rc;

use crate::resolver::SpecResolver;
use crate::spec::CopySpec;

struct Segment {
    parent: Option<SpecAddress>,
    owner: CopySpec,
    addition_index: usize,
}

/// Position of a spec in a tree, as the chain of addition indices leading
/// to it.
///
/// Each segment names an owning spec and the index its child held in the
/// owner's addition order when it was attached. The addressed spec is the
/// child selected by the last segment. Addresses are immutable snapshots;
/// later attaches or structural reordering never change them.
#[derive(Clone)]
pub struct SpecAddress(Rc<Segment>);

impl SpecAddress {
    /// Address of `owner`'s child at `addition_index`, with `owner` as the top.
    pub fn new(owner: &CopySpec, addition_index: usize) -> Self {
        Self(Rc::new(Segment {
            parent: None,
            owner: owner.clone(),
            addition_index,
        }))
    }

    /// Extend this address by one level.
    pub fn append_child(&self, owner: &CopySpec, addition_index: usize) -> Self {
        Self(Rc::new(Segment {
            parent: Some(self.clone()),
            owner: owner.clone(),
            addition_index,
        }))
    }

    /// Rebase `relative` so that its top segment hangs below this address.
    pub fn append(&self, relative: &SpecAddress) -> Self {
        let base = match relative.parent() {
            Some(parent) => self.append(parent),
            None => self.clone(),
        };
        base.append_child(relative.owner(), relative.addition_index())
    }

    /// Address of the owner, if the owner is not the top.
    pub fn parent(&self) -> Option<&SpecAddress> {
        self.0.parent.as_ref()
    }

    /// The spec owning the last segment.
    pub fn owner(&self) -> &CopySpec {
        &self.0.owner
    }

    /// Index of the addressed spec in its owner's addition order.
    pub fn addition_index(&self) -> usize {
        self.0.addition_index
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        1 + self.parent().map_or(0, SpecAddress::depth)
    }

    /// The addressed spec, if the owner still has a child at the index.
    pub fn spec(&self) -> Option<CopySpec> {
        self.owner()
            .children_in_addition_order()
            .get(self.addition_index())
            .cloned()
    }

    /// Rebuild the owner's resolver from the top of the chain down, writing
    /// one `$n` token per segment to `key`.
    ///
    /// Resolve the addressed spec against the returned resolver.
    pub fn unroll(&self, key: &mut String) -> SpecResolver {
        let resolver = match self.parent() {
            Some(parent) => self.owner().resolver_relative_to(&parent.unroll(key)),
            None => self.owner().resolver(),
        };
        key.push('$');
        key.push_str(&(self.addition_index() + 1).to_string());
        resolver
    }
}

impl PartialEq for SpecAddress {
    fn eq(&self, other: &Self) -> bool {
        self.addition_index() == other.addition_index()
            && self.owner().ptr_eq(other.owner())
            && self.parent() == other.parent()
    }
}

impl Eq for SpecAddress {}

impl fmt::Display for SpecAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent}")?;
        }
        write!(f, "${}", self.addition_index() + 1)
    }
}

impl fmt::Debug for SpecAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpecAddress({self})")
    }
}
