//! The lineage store: recorded parent -> copy edges.
//!
//! [`DescendantRegistry`] owns the mapping from an original object's
//! identifier to the ordered list of identifiers copied directly from it.
//! It is mutated only by copy and removal notifications and read by the
//! query operations in [`crate::query`].
//!
//! All access goes through a single [`parking_lot::RwLock`]. Mutations take
//! the write lock for their whole duration, and every query holds the read
//! lock for its whole traversal, so a reader never observes a retraction
//! halfway through.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::object::ObjectId;
use crate::snapshot::LineageSnapshot;

/// Map from an original's id to its direct copies, in recording order.
pub(crate) type DescendantMap = HashMap<ObjectId, Vec<ObjectId>>;

// ---------------------------------------------------------------------------
// DescendantRegistry
// ---------------------------------------------------------------------------

/// Thread-safe registry of copy lineages.
///
/// Construct one per process (or per test) and share it as
/// `Arc<DescendantRegistry>` with whatever delivers the copy/removal
/// notifications and whatever answers script queries.
///
/// Invariant: a key is present only while its list is non-empty.
#[derive(Debug, Default)]
pub struct DescendantRegistry {
    descendants: RwLock<DescendantMap>,
}

impl DescendantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `copy` was duplicated from `original`.
    ///
    /// Appends `copy` to the end of `original`'s list, creating the list on
    /// the first copy. Callers are expected to have already filtered the
    /// notification (user-exposed copies of root objects only).
    ///
    /// A self-copy (`original == copy`) is ignored: an object is never
    /// recorded as its own descendant.
    pub fn record_copy(&self, original: ObjectId, copy: ObjectId) {
        if original == copy {
            tracing::debug!(object = %original, "ignoring self-copy notification");
            return;
        }

        let mut map = self.descendants.write();
        let children = map.entry(original).or_default();
        children.push(copy);

        tracing::trace!(
            original = %original,
            copy = %copy,
            direct_descendants = children.len(),
            "recorded copy"
        );
    }

    /// Forget `id`: remove it from every descendant list and drop its own
    /// entry.
    ///
    /// Lists left empty by the removal are pruned. The whole retraction runs
    /// under the write lock. Retracting an unknown id is a no-op.
    ///
    /// Returns `true` if the registry changed.
    pub fn retract_object(&self, id: ObjectId) -> bool {
        let mut map = self.descendants.write();

        let mut references_removed = 0usize;
        map.retain(|_, children| {
            let before = children.len();
            children.retain(|child| *child != id);
            references_removed += before - children.len();
            !children.is_empty()
        });
        let own_entry = map.remove(&id);

        let changed = references_removed > 0 || own_entry.is_some();
        if changed {
            tracing::trace!(
                object = %id,
                references_removed,
                orphaned_descendants = own_entry.as_ref().map_or(0, Vec::len),
                "retracted object"
            );
        }
        changed
    }

    /// The direct copies of `id`, in recording order. Empty if none.
    pub fn direct_descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        self.descendants
            .read()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of originals that currently have at least one recorded copy.
    pub fn tracked_roots(&self) -> usize {
        self.descendants.read().len()
    }

    /// Total number of recorded parent -> copy edges.
    pub fn edge_count(&self) -> usize {
        self.descendants.read().values().map(Vec::len).sum()
    }

    /// Returns `true` if no copies are recorded.
    pub fn is_empty(&self) -> bool {
        self.descendants.read().is_empty()
    }

    /// Capture a read-only, key-sorted copy of the current state.
    pub fn snapshot(&self) -> LineageSnapshot {
        LineageSnapshot::from_map(&self.descendants.read())
    }

    /// Hold the read lock for the duration of a query.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, DescendantMap> {
        self.descendants.read()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> ObjectId {
        ObjectId::from_u128(n)
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = DescendantRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.tracked_roots(), 0);
        assert_eq!(registry.edge_count(), 0);
        assert!(registry.direct_descendants(id(1)).is_empty());
    }

    #[test]
    fn record_copy_preserves_insertion_order() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(1), id(4));
        registry.record_copy(id(1), id(2));
        registry.record_copy(id(1), id(3));

        assert_eq!(registry.direct_descendants(id(1)), vec![id(4), id(2), id(3)]);
        assert_eq!(registry.tracked_roots(), 1);
        assert_eq!(registry.edge_count(), 3);
    }

    #[test]
    fn self_copy_is_ignored() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(7), id(7));
        assert!(registry.is_empty());
    }

    #[test]
    fn retract_removes_from_every_list_and_own_entry() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(1), id(2));
        registry.record_copy(id(1), id(3));
        // Pathological: the same id listed under two originals.
        registry.record_copy(id(5), id(2));
        registry.record_copy(id(2), id(9));

        assert!(registry.retract_object(id(2)));

        assert_eq!(registry.direct_descendants(id(1)), vec![id(3)]);
        assert!(registry.direct_descendants(id(5)).is_empty());
        assert!(registry.direct_descendants(id(2)).is_empty());
        assert_eq!(registry.edge_count(), 1);
    }

    #[test]
    fn retract_prunes_emptied_lists() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(1), id(2));
        registry.retract_object(id(2));
        assert_eq!(registry.tracked_roots(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn retract_unknown_is_noop() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(1), id(2));
        let before = registry.snapshot();

        assert!(!registry.retract_object(id(99)));
        assert!(!registry.retract_object(id(99)));

        assert_eq!(registry.snapshot(), before);
    }

    #[test]
    fn retract_root_keeps_its_copies_listed_elsewhere() {
        let registry = DescendantRegistry::new();
        registry.record_copy(id(1), id(2));
        registry.record_copy(id(2), id(3));

        registry.retract_object(id(1));

        assert!(registry.direct_descendants(id(1)).is_empty());
        assert_eq!(registry.direct_descendants(id(2)), vec![id(3)]);
    }
}
