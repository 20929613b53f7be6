//! Scion World -- regions, scene events, and the lineage region module.
//!
//! This crate connects the copy-lineage registry from `scion_lineage` to
//! simulated regions:
//!
//! - **`Scene`**: a minimal region object model. Object groups can be added,
//!   copied, and removed; copies and removals are announced to listeners.
//! - **`SceneEvents`** / **`SceneListener`**: per-scene observer registry.
//! - **`LineageConfig`**: the `"scion"` configuration section.
//! - **`LineageModule`**: region-module lifecycle that subscribes the
//!   registry to each region's events and registers the script functions
//!   `primDescendantsCount` and `primDescendantsCheck`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use scion_world::prelude::*;
//!
//! let mut module = LineageModule::new(Arc::new(DescendantRegistry::new()));
//! module.initialise(&LineageConfig::enabled());
//!
//! let scene = Arc::new(Scene::new("harbour"));
//! module.add_region(Arc::clone(&scene));
//!
//! let boat = scene.add_group(3);
//! let copy = scene.copy_group(boat, true).unwrap();
//!
//! let queries = module.queries();
//! assert_eq!(queries.count_descendants(boat), 1);
//! assert_eq!(queries.check_descendant(boat, &copy.to_string()), 1);
//!
//! scene.remove_group(copy).unwrap();
//! assert_eq!(queries.count_descendants(boat), 0);
//! ```

#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod events;
pub mod module;
pub mod scene;

use std::path::PathBuf;

use scion_lineage::object::ObjectId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// No group with this root id is in the scene.
    #[error("no object group rooted at {root}")]
    UnknownGroup { root: ObjectId },

    /// A group must have at least one part.
    #[error("object group has no parts")]
    EmptyGroup,

    /// The part already belongs to a group in this scene.
    #[error("part {part} is already in the scene")]
    DuplicatePart { part: ObjectId },
}

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bridge::{LineageQueries, ObjectLookup, CHECK_INVOCATION, COUNT_INVOCATION};
    pub use crate::config::{LineageConfig, LineageSection};
    pub use crate::events::{GroupRemoved, ListenerId, PartCopied, SceneEvents, SceneListener};
    pub use crate::module::{LineageListener, LineageModule};
    pub use crate::scene::{Scene, SceneObjectGroup};
    pub use crate::{ConfigError, SceneError};
    pub use scion_lineage::prelude::*;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
