//! Scion Lineage -- copy-lineage registry for simulated regions.
//!
//! Whenever an object in a region is duplicated, the region reports the
//! original and the copy. This crate records those parent -> copy edges in
//! a [`DescendantRegistry`](registry::DescendantRegistry) and answers
//! ancestry questions over the resulting forest:
//!
//! - the descendants of an object, optionally bounded by generation, and
//! - whether one object descends from another, directly or transitively.
//!
//! The registry is an ordinary value: construct it, wrap it in an `Arc`, and
//! hand it to whatever delivers notifications and answers queries.
//!
//! # Quick Start
//!
//! ```
//! use scion_lineage::prelude::*;
//!
//! let registry = DescendantRegistry::new();
//! let (a, b, c) = (ObjectId::random(), ObjectId::random(), ObjectId::random());
//!
//! registry.record_copy(a, b);
//! registry.record_copy(b, c);
//!
//! assert_eq!(registry.descendants(a, -1), vec![b, c]);
//! assert!(registry.is_descendant(a, c, true));
//! assert!(!registry.is_descendant(a, c, false));
//!
//! registry.retract_object(b);
//! assert!(registry.descendants(a, -1).is_empty());
//! ```

#![deny(unsafe_code)]

pub mod object;
pub mod query;
pub mod registry;
pub mod snapshot;

pub use object::ParseObjectIdError;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::object::{ObjectId, ParseObjectIdError};
    pub use crate::query::LevelBound;
    pub use crate::registry::DescendantRegistry;
    pub use crate::snapshot::LineageSnapshot;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
