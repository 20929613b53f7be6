//! Read-only snapshots of the lineage store.
//!
//! A [`LineageSnapshot`] is a key-sorted copy of the registry, used for
//! diagnostics and for comparing states in tests. Lineage is not persisted
//! across restarts, so there is no restore path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::object::ObjectId;
use crate::registry::DescendantMap;

/// Serializable view of every recorded parent -> copy edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageSnapshot {
    /// Original id -> direct copies in recording order.
    /// Uses `BTreeMap` for deterministic serialization order.
    pub entries: BTreeMap<ObjectId, Vec<ObjectId>>,
}

impl LineageSnapshot {
    pub(crate) fn from_map(map: &DescendantMap) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(original, copies)| (*original, copies.clone()))
                .collect(),
        }
    }

    /// Number of originals with at least one copy.
    pub fn root_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of parent -> copy edges.
    pub fn edge_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// blake3 digest of the snapshot contents, as a hex string.
    ///
    /// Two snapshots have the same digest iff they hold the same edges in the
    /// same per-original order.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (original, copies) in &self.entries {
            hasher.update(&original.to_u128().to_le_bytes());
            hasher.update(&(copies.len() as u64).to_le_bytes());
            for copy in copies {
                hasher.update(&copy.to_u128().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Pretty-printed JSON, for logs and debugging dumps.
    ///
    /// # Errors
    ///
    /// Propagates any `serde_json` serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
