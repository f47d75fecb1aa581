//! Descriptor matcher: the locally cached identity set.
//!
//! Holds an id -> descriptor registry and answers "which registered
//! identity, if any, does this descriptor belong to". The similarity
//! predicate is injected through the [`Recognizer`] capability and
//! treated as a pure boolean function of two descriptors.
//!
//! The scan is linear and returns the **first** similar entry, in
//! ascending id order -- deterministic for an unchanged registry. That
//! is first-match, not best-match, and it is acceptable because
//! registries hold a single building's roster; an installation with a
//! large roster would need an index, which this component deliberately
//! does not have.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::recognition::Recognizer;
use crate::types::Descriptor;

/// Identity registry with similarity-based lookup.
pub struct DescriptorMatcher {
    recognizer: Arc<dyn Recognizer>,
    registry: RwLock<BTreeMap<i64, Descriptor>>,
}

impl DescriptorMatcher {
    /// Creates an empty matcher around the injected similarity
    /// capability.
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bulk-merges entries into the registry, replace-or-insert per id
    /// (last writer wins). Entries are never removed by this component;
    /// removal is an administrative operation outside the core.
    pub fn update(&self, entries: impl IntoIterator<Item = (i64, Descriptor)>) {
        let mut registry = self.registry.write();
        for (id, descriptor) in entries {
            registry.insert(id, descriptor);
        }
    }

    /// First registered identity whose descriptor is similar to the
    /// input, scanning in ascending id order; `None` when nothing
    /// matches or the registry is empty.
    pub fn find_match(&self, descriptor: &Descriptor) -> Option<i64> {
        let registry = self.registry.read();
        registry
            .iter()
            .find(|(_, candidate)| self.recognizer.similar(descriptor, candidate))
            .map(|(id, _)| *id)
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }
}
