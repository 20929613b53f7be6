//! Ancestry queries over the lineage store.
//!
//! Two questions are answered against a consistent view of the
//! [`DescendantRegistry`]:
//!
//! - **Which objects descend from `root`?** A level-bounded breadth-first
//!   expansion ([`DescendantRegistry::descendants`]).
//! - **Does `candidate` descend from `ancestor`?** Either a direct-child
//!   lookup or a search of every generation
//!   ([`DescendantRegistry::is_descendant`]).
//!
//! # Level bounds
//!
//! A level count of `-1` means "all generations" and anything below `-1` is
//! treated the same way. A non-negative count `n` is checked only *after* a
//! generation has been expanded, so the traversal returns generations
//! `1..=n + 1`. In particular `levels == 0` still yields the direct copies.

use crate::object::ObjectId;
use crate::registry::{DescendantMap, DescendantRegistry};

// ---------------------------------------------------------------------------
// LevelBound
// ---------------------------------------------------------------------------

/// How far a descendant traversal may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelBound {
    /// Expand every generation.
    Unbounded,
    /// Stop once the generation counter exceeds this value.
    Generations(u32),
}

impl LevelBound {
    /// Convert a script-facing level count. Negative values are unbounded.
    pub fn from_levels(levels: i32) -> Self {
        match u32::try_from(levels) {
            Ok(n) => LevelBound::Generations(n),
            Err(_) => LevelBound::Unbounded,
        }
    }

    /// Whether expanding generation `generation` (1-based) trips the bound.
    fn exceeded_after(self, generation: u32) -> bool {
        match self {
            LevelBound::Unbounded => false,
            LevelBound::Generations(limit) => generation > limit,
        }
    }
}

impl From<i32> for LevelBound {
    fn from(levels: i32) -> Self {
        Self::from_levels(levels)
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Breadth-first collection of the descendants of `root`.
///
/// Results are grouped by generation, each generation in recording order.
/// Duplicates are not removed.
pub(crate) fn collect_descendants(
    map: &DescendantMap,
    root: ObjectId,
    bound: LevelBound,
) -> Vec<ObjectId> {
    let mut found = Vec::new();
    if root.is_zero() || !map.contains_key(&root) {
        return found;
    }

    let mut frontier = vec![root];
    let mut generation: u32 = 0;

    while !frontier.is_empty() {
        generation = generation.saturating_add(1);

        let mut next = Vec::new();
        for id in &frontier {
            if let Some(children) = map.get(id) {
                found.extend_from_slice(children);
                next.extend_from_slice(children);
            }
        }
        frontier = next;

        if bound.exceeded_after(generation) {
            break;
        }
    }

    found
}

// ---------------------------------------------------------------------------
// Query API
// ---------------------------------------------------------------------------

impl DescendantRegistry {
    /// Descendants of `root`, generation by generation.
    ///
    /// `levels` follows the script convention: `-1` (or lower) for every
    /// generation, otherwise see the module docs for the bound semantics.
    /// Unknown roots and [`ObjectId::ZERO`] yield an empty list.
    pub fn descendants(&self, root: ObjectId, levels: i32) -> Vec<ObjectId> {
        self.descendants_within(root, LevelBound::from_levels(levels))
    }

    /// Like [`descendants`](Self::descendants) with an explicit bound.
    pub fn descendants_within(&self, root: ObjectId, bound: LevelBound) -> Vec<ObjectId> {
        let map = self.read();
        collect_descendants(&map, root, bound)
    }

    /// Total number of descendants of `root` across every generation.
    pub fn descendant_count(&self, root: ObjectId) -> usize {
        self.descendants_within(root, LevelBound::Unbounded).len()
    }

    /// Whether `candidate` descends from `ancestor`.
    ///
    /// An object is never its own descendant. With `exhaustive == false`
    /// only the direct copies of `ancestor` are checked; otherwise every
    /// generation is searched.
    pub fn is_descendant(&self, ancestor: ObjectId, candidate: ObjectId, exhaustive: bool) -> bool {
        if ancestor == candidate {
            return false;
        }

        let map = self.read();
        if exhaustive {
            collect_descendants(&map, ancestor, LevelBound::Unbounded).contains(&candidate)
        } else {
            map.get(&ancestor)
                .is_some_and(|children| children.contains(&candidate))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
