//! Address book of every spec attached below a root.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::address::SpecAddress;
use crate::resolver::SpecResolver;
use crate::spec::CopySpec;

/// A spec recorded by a [`SpecRegistry`].
#[derive(Debug, Clone)]
pub struct RegisteredSpec {
    /// Registry prefix followed by the address tokens, e.g. `rootSpec$1$2`.
    pub key: String,
    /// Address of the spec relative to the registry's root.
    pub address: SpecAddress,
    /// The spec itself.
    pub spec: CopySpec,
}

impl RegisteredSpec {
    /// Resolver for the spec in the context of the registry's root.
    pub fn resolver(&self) -> SpecResolver {
        let mut key = String::new();
        let parent = self.address.unroll(&mut key);
        self.spec.resolver_relative_to(&parent)
    }
}

/// Records every spec added below a root, keyed by address.
///
/// Only specs attached after the registry is created are recorded. Entries
/// are kept in notification order, which is pre-order for subtrees attached
/// as a unit.
pub struct SpecRegistry {
    root: CopySpec,
    prefix: String,
    entries: Rc<RefCell<Vec<RegisteredSpec>>>,
}

impl SpecRegistry {
    /// Start recording additions below `root`.
    pub fn attach(root: &CopySpec, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let entries = Rc::new(RefCell::new(Vec::new()));

        // The root owns the listener; a strong link back would keep the
        // tree alive through the recorded addresses.
        let sink: Weak<RefCell<Vec<RegisteredSpec>>> = Rc::downgrade(&entries);
        let key_prefix = prefix.clone();
        root.add_child_spec_listener(move |address, spec| {
            let Some(entries) = sink.upgrade() else {
                return;
            };
            let key = format!("{key_prefix}{address}");
            debug!(%key, "registered child spec");
            entries.borrow_mut().push(RegisteredSpec {
                key,
                address: address.clone(),
                spec: spec.clone(),
            });
        });

        Self {
            root: root.clone(),
            prefix,
            entries,
        }
    }

    /// The observed root.
    pub fn root(&self) -> &CopySpec {
        &self.root
    }

    /// Key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Every recorded spec.
    pub fn entries(&self) -> Vec<RegisteredSpec> {
        self.entries.borrow().clone()
    }

    /// Recorded keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|e| e.key.clone()).collect()
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<RegisteredSpec> {
        self.entries.borrow().iter().find(|e| e.key == key).cloned()
    }

    /// Key of a recorded spec.
    pub fn key_of(&self, spec: &CopySpec) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.spec.ptr_eq(spec))
            .map(|e| e.key.clone())
    }

    /// Number of recorded specs.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_keys() {
        let root = CopySpec::new();
        let registry = SpecRegistry::attach(&root, "rootSpec");
        let a = root.add_child();
        a.add_child();
        root.add_first();

        assert_eq!(registry.keys(), vec!["rootSpec$1", "rootSpec$1$1", "rootSpec$2"]);
        assert_eq!(registry.key_of(&a).as_deref(), Some("rootSpec$1"));
        assert!(registry.get("rootSpec$9").is_none());
    }

    #[test]
    fn test_entry_resolver_inherits_from_root() {
        let root = CopySpec::new();
        root.into_dir("out").set_case_sensitive(false);
        let registry = SpecRegistry::attach(&root, "");

        let external = CopySpec::new();
        external.into_dir("lib");
        root.with(&external).unwrap();

        let entry = registry.get("$1").unwrap();
        let resolver = entry.resolver();
        assert!(!resolver.is_case_sensitive());
        assert_eq!(resolver.destination_path().unwrap().path_string(), "out/lib");
    }

    #[test]
    fn test_dropped_registry_stops_recording() {
        let root = CopySpec::new();
        let registry = SpecRegistry::attach(&root, "x");
        drop(registry);
        root.add_child();
        assert!(root.has_listeners());
    }
}
