//! Scene event notifications.
//!
//! A [`Scene`](crate::scene::Scene) announces object copies and removals
//! through its [`SceneEvents`] source. Interested parties implement
//! [`SceneListener`] and subscribe; the returned [`ListenerId`] is used to
//! unsubscribe when the region goes away.
//!
//! Listeners are invoked synchronously on the thread that caused the event,
//! after the listener list lock has been released, so a listener may
//! subscribe or unsubscribe from within a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use scion_lineage::object::ObjectId;

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// A part was duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartCopied {
    /// The new part.
    pub copy: ObjectId,
    /// The part it was copied from.
    pub original: ObjectId,
    /// `false` for internal or transient copies that never become visible
    /// in the scene.
    pub user_exposed: bool,
    /// Whether `original` is the root part of its object group.
    pub original_is_root: bool,
}

/// An object group is about to leave the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRemoved {
    /// Root part id of the departing group.
    pub root: ObjectId,
}

// ---------------------------------------------------------------------------
// SceneListener
// ---------------------------------------------------------------------------

/// Receiver of scene notifications. Both callbacks default to no-ops.
pub trait SceneListener: Send + Sync {
    fn on_part_copied(&self, _event: &PartCopied) {}

    fn on_group_removed(&self, _event: &GroupRemoved) {}
}

/// Handle returned by [`SceneEvents::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ---------------------------------------------------------------------------
// SceneEvents
// ---------------------------------------------------------------------------

/// Per-scene event source.
#[derive(Default)]
pub struct SceneEvents {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn SceneListener>)>>,
}

impl SceneEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start delivering events to `listener`.
    pub fn subscribe(&self, listener: Arc<dyn SceneListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Stop delivering events to the listener registered as `id`.
    ///
    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver a [`PartCopied`] event to every listener.
    pub fn emit_part_copied(&self, event: &PartCopied) {
        for listener in self.current_listeners() {
            listener.on_part_copied(event);
        }
    }

    /// Deliver a [`GroupRemoved`] event to every listener.
    pub fn emit_group_removed(&self, event: &GroupRemoved) {
        for listener in self.current_listeners() {
            listener.on_group_removed(event);
        }
    }

    fn current_listeners(&self) -> Vec<Arc<dyn SceneListener>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl std::fmt::Debug for SceneEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
