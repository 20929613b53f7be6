//! The lineage region module.
//!
//! [`LineageModule`] ties one shared [`DescendantRegistry`] to every region
//! it is attached to. It follows the host's region-module lifecycle:
//!
//! 1. [`initialise`](LineageModule::initialise) reads the configuration.
//! 2. [`add_region`](LineageModule::add_region) subscribes to the scene's
//!    copy and removal events.
//! 3. [`region_loaded`](LineageModule::region_loaded) registers the script
//!    functions with the scene's [`ScriptModuleComms`] capability, if any.
//! 4. [`remove_region`](LineageModule::remove_region) and
//!    [`close`](LineageModule::close) detach again.
//!
//! A disabled module attaches to nothing and registers nothing.

use std::sync::Arc;

use parking_lot::RwLock;
use scion_lineage::object::ObjectId;
use scion_lineage::registry::DescendantRegistry;
use scion_script::ScriptModuleComms;

use crate::bridge::{LineageQueries, ObjectLookup};
use crate::config::LineageConfig;
use crate::events::{GroupRemoved, ListenerId, PartCopied, SceneListener};
use crate::scene::Scene;

// ---------------------------------------------------------------------------
// LineageListener
// ---------------------------------------------------------------------------

/// Feeds scene events into a [`DescendantRegistry`].
#[derive(Debug, Clone)]
pub struct LineageListener {
    registry: Arc<DescendantRegistry>,
}

impl LineageListener {
    pub fn new(registry: Arc<DescendantRegistry>) -> Self {
        Self { registry }
    }
}

impl SceneListener for LineageListener {
    /// Only user-exposed copies of root parts become lineage edges.
    fn on_part_copied(&self, event: &PartCopied) {
        if event.user_exposed && event.original_is_root {
            self.registry.record_copy(event.original, event.copy);
        }
    }

    fn on_group_removed(&self, event: &GroupRemoved) {
        self.registry.retract_object(event.root);
    }
}

// ---------------------------------------------------------------------------
// RegionSet
// ---------------------------------------------------------------------------

struct Region {
    scene: Arc<Scene>,
    listener: ListenerId,
}

/// Scenes the module is attached to, in attach order.
#[derive(Default)]
struct RegionSet {
    regions: RwLock<Vec<Region>>,
}

impl ObjectLookup for RegionSet {
    fn group_root_of(&self, part: ObjectId) -> Option<ObjectId> {
        self.regions
            .read()
            .iter()
            .find_map(|region| region.scene.try_get_part_group(part))
    }
}

// ---------------------------------------------------------------------------
// LineageModule
// ---------------------------------------------------------------------------

/// Region module that tracks copy lineages and exposes them to scripts.
pub struct LineageModule {
    enabled: bool,
    registry: Arc<DescendantRegistry>,
    listener: Arc<LineageListener>,
    regions: Arc<RegionSet>,
}

impl LineageModule {
    /// Module name used in logs.
    pub const NAME: &'static str = "Scion.PrimDescendants";

    /// Create a disabled module around `registry`.
    pub fn new(registry: Arc<DescendantRegistry>) -> Self {
        Self {
            enabled: false,
            listener: Arc::new(LineageListener::new(Arc::clone(&registry))),
            registry,
            regions: Arc::new(RegionSet::default()),
        }
    }

    /// Apply configuration. Call before attaching regions.
    pub fn initialise(&mut self, config: &LineageConfig) {
        self.enabled = config.is_enabled();
        if self.enabled {
            tracing::info!(module = Self::NAME, "Enabled");
        } else {
            tracing::info!(module = Self::NAME, "Disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The lineage store this module writes to.
    pub fn registry(&self) -> &Arc<DescendantRegistry> {
        &self.registry
    }

    /// Query surface resolving host parts through every attached region.
    pub fn queries(&self) -> LineageQueries {
        let lookup: Arc<dyn ObjectLookup> = self.regions.clone();
        LineageQueries::new(Arc::clone(&self.registry), lookup)
    }

    /// Number of attached regions.
    pub fn region_count(&self) -> usize {
        self.regions.regions.read().len()
    }

    /// Attach to a region's events. Does nothing when disabled or when the
    /// region is already attached.
    pub fn add_region(&self, scene: Arc<Scene>) {
        if !self.enabled {
            return;
        }

        let mut regions = self.regions.regions.write();
        if regions.iter().any(|region| region.scene.id() == scene.id()) {
            tracing::warn!(module = Self::NAME, scene = scene.name(), "region already attached");
            return;
        }

        let listener = scene.events().subscribe(self.listener.clone());
        tracing::debug!(
            module = Self::NAME,
            scene = scene.name(),
            region = %scene.id(),
            "attached to region events"
        );
        regions.push(Region { scene, listener });
    }

    /// Detach from a region. Returns `false` if it was not attached.
    pub fn remove_region(&self, scene: &Scene) -> bool {
        let mut regions = self.regions.regions.write();
        let Some(index) = regions.iter().position(|region| region.scene.id() == scene.id()) else {
            return false;
        };

        let region = regions.remove(index);
        region.scene.events().unsubscribe(region.listener);
        tracing::debug!(
            module = Self::NAME,
            scene = scene.name(),
            region = %scene.id(),
            "detached from region events"
        );
        true
    }

    /// Register the script functions with the region's script capability.
    ///
    /// Returns `true` if both functions were registered. A region without
    /// the capability is logged as an error and left without the functions;
    /// it is not fatal.
    pub fn region_loaded(&self, scene: &Scene) -> bool {
        if !self.enabled {
            return false;
        }

        let Some(comms) = scene.script_comms() else {
            tracing::error!(
                module = Self::NAME,
                scene = scene.name(),
                "ScriptModuleComms could not be found, cannot add script functions"
            );
            return false;
        };

        register_invocations(comms.as_ref(), &self.queries(), scene.name())
    }

    /// Detach from every region.
    pub fn close(&self) {
        let regions = std::mem::take(&mut *self.regions.regions.write());
        for region in &regions {
            region.scene.events().unsubscribe(region.listener);
        }
        tracing::debug!(module = Self::NAME, regions = regions.len(), "closed");
    }
}

fn register_invocations(comms: &dyn ScriptModuleComms, queries: &LineageQueries, scene: &str) -> bool {
    let mut registered = true;
    for invocation in queries.invocations() {
        let name = invocation.name().to_owned();
        if let Err(e) = comms.register_script_invocation(invocation) {
            tracing::error!(module = LineageModule::NAME, scene, name = %name, error = %e, "failed to register script function");
            registered = false;
        }
    }
    registered
}

impl std::fmt::Debug for LineageModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineageModule")
            .field("enabled", &self.enabled)
            .field("regions", &self.region_count())
            .field("tracked_roots", &self.registry.tracked_roots())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
