//! Minimal region object model.
//!
//! A [`Scene`] holds object groups. Each [`SceneObjectGroup`] is a list of
//! parts whose first part is the *root*; the group is identified by its root
//! part's id. Copying a group announces one [`PartCopied`] per part, and
//! removing a group announces a [`GroupRemoved`] before the group leaves.
//!
//! Scenes also carry optional capabilities that region modules resolve when
//! the region finishes loading, such as the script invocation bridge.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use scion_lineage::object::ObjectId;
use scion_script::ScriptModuleComms;

use crate::events::{GroupRemoved, PartCopied, SceneEvents};
use crate::SceneError;

// ---------------------------------------------------------------------------
// SceneObjectGroup
// ---------------------------------------------------------------------------

/// A composite object: a root part plus any child parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneObjectGroup {
    parts: Vec<ObjectId>,
}

impl SceneObjectGroup {
    /// The root part id, which is also the group's id.
    pub fn root(&self) -> ObjectId {
        self.parts[0]
    }

    /// All part ids, root first.
    pub fn parts(&self) -> &[ObjectId] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn contains_part(&self, part: ObjectId) -> bool {
        self.parts.contains(&part)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SceneObjects {
    /// Root id -> group.
    groups: HashMap<ObjectId, SceneObjectGroup>,
    /// Part id -> owning group's root id.
    part_index: HashMap<ObjectId, ObjectId>,
}

impl SceneObjects {
    fn insert(&mut self, parts: Vec<ObjectId>) -> Result<ObjectId, SceneError> {
        let Some(&root) = parts.first() else {
            return Err(SceneError::EmptyGroup);
        };
        if let Some(&part) = parts.iter().find(|p| self.part_index.contains_key(p)) {
            return Err(SceneError::DuplicatePart { part });
        }

        for part in &parts {
            self.part_index.insert(*part, root);
        }
        self.groups.insert(root, SceneObjectGroup { parts });
        Ok(root)
    }
}

/// A simulated region.
///
/// Shared as `Arc<Scene>`; all methods take `&self`.
pub struct Scene {
    id: ObjectId,
    name: String,
    objects: RwLock<SceneObjects>,
    events: SceneEvents,
    script_comms: RwLock<Option<Arc<dyn ScriptModuleComms>>>,
}

impl Scene {
    /// Create an empty scene with no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::random(),
            name: name.into(),
            objects: RwLock::new(SceneObjects::default()),
            events: SceneEvents::new(),
            script_comms: RwLock::new(None),
        }
    }

    /// Create an empty scene that offers the script invocation bridge.
    pub fn with_script_comms(name: impl Into<String>, comms: Arc<dyn ScriptModuleComms>) -> Self {
        let scene = Self::new(name);
        scene.set_script_comms(Some(comms));
        scene
    }

    /// Region id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scene's event source.
    pub fn events(&self) -> &SceneEvents {
        &self.events
    }

    // -- Capabilities -------------------------------------------------------

    /// Install or remove the script invocation capability.
    pub fn set_script_comms(&self, comms: Option<Arc<dyn ScriptModuleComms>>) {
        *self.script_comms.write() = comms;
    }

    /// Resolve the script invocation capability, if the region offers it.
    pub fn script_comms(&self) -> Option<Arc<dyn ScriptModuleComms>> {
        self.script_comms.read().clone()
    }

    // -- Objects ------------------------------------------------------------

    /// Add a group with `part_count` freshly generated parts (at least one).
    /// Returns the root id.
    pub fn add_group(&self, part_count: usize) -> ObjectId {
        loop {
            let parts: Vec<ObjectId> = (0..part_count.max(1)).map(|_| ObjectId::random()).collect();
            // A v4 collision is practically impossible; retry rather than fail.
            if let Ok(root) = self.objects.write().insert(parts) {
                return root;
            }
        }
    }

    /// Add a group made of the given parts, root first.
    ///
    /// # Errors
    ///
    /// - [`SceneError::EmptyGroup`] if `parts` is empty.
    /// - [`SceneError::DuplicatePart`] if a part is already in the scene.
    pub fn add_group_with_parts(&self, parts: Vec<ObjectId>) -> Result<ObjectId, SceneError> {
        self.objects.write().insert(parts)
    }

    /// Duplicate a group part by part.
    ///
    /// Emits one [`PartCopied`] per part, root first, after the copy has
    /// been added to the scene. `user_exposed` is `false` for internal
    /// copies (for example a copy taken into inventory).
    ///
    /// Returns the copy's root id.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownGroup`] if `root` is not a group in this scene.
    pub fn copy_group(&self, root: ObjectId, user_exposed: bool) -> Result<ObjectId, SceneError> {
        let events: Vec<PartCopied> = {
            let mut objects = self.objects.write();
            let original = objects
                .groups
                .get(&root)
                .cloned()
                .ok_or(SceneError::UnknownGroup { root })?;

            let copies: Vec<ObjectId> = original.parts().iter().map(|_| ObjectId::random()).collect();
            objects.insert(copies.clone())?;

            original
                .parts()
                .iter()
                .zip(&copies)
                .map(|(from, to)| PartCopied {
                    copy: *to,
                    original: *from,
                    user_exposed,
                    original_is_root: *from == root,
                })
                .collect()
        };

        let copy_root = events[0].copy;
        tracing::debug!(
            scene = %self.name,
            original = %root,
            copy = %copy_root,
            parts = events.len(),
            user_exposed,
            "copied object group"
        );

        for event in &events {
            self.events.emit_part_copied(event);
        }
        Ok(copy_root)
    }

    /// Remove a group from the scene.
    ///
    /// Emits [`GroupRemoved`] while the group is still present, then removes
    /// it and returns it.
    ///
    /// # Errors
    ///
    /// [`SceneError::UnknownGroup`] if `root` is not a group in this scene.
    pub fn remove_group(&self, root: ObjectId) -> Result<SceneObjectGroup, SceneError> {
        if !self.objects.read().groups.contains_key(&root) {
            return Err(SceneError::UnknownGroup { root });
        }

        self.events.emit_group_removed(&GroupRemoved { root });

        let mut objects = self.objects.write();
        let group = objects
            .groups
            .remove(&root)
            .ok_or(SceneError::UnknownGroup { root })?;
        for part in group.parts() {
            objects.part_index.remove(part);
        }

        tracing::debug!(scene = %self.name, root = %root, "removed object group");
        Ok(group)
    }

    /// The group rooted at `root`.
    pub fn group(&self, root: ObjectId) -> Option<SceneObjectGroup> {
        self.objects.read().groups.get(&root).cloned()
    }

    /// Root id of the group that owns `part`.
    pub fn try_get_part_group(&self, part: ObjectId) -> Option<ObjectId> {
        self.objects.read().part_index.get(&part).copied()
    }

    /// Number of groups in the scene.
    pub fn group_count(&self) -> usize {
        self.objects.read().groups.len()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("groups", &self.group_count())
            .field("events", &self.events)
            .field("script_comms", &self.script_comms.read().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SceneListener;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        copies: Mutex<Vec<PartCopied>>,
        removals: Mutex<Vec<(GroupRemoved, bool)>>,
        scene: Mutex<Option<Arc<Scene>>>,
    }

    impl SceneListener for Recorder {
        fn on_part_copied(&self, event: &PartCopied) {
            self.copies.lock().push(*event);
        }

        fn on_group_removed(&self, event: &GroupRemoved) {
            // Record whether the group was still present when notified.
            let present = self
                .scene
                .lock()
                .as_ref()
                .is_some_and(|scene| scene.group(event.root).is_some());
            self.removals.lock().push((*event, present));
        }
    }

    fn id(n: u128) -> ObjectId {
        ObjectId::from_u128(n)
    }

    #[test]
    fn add_group_indexes_every_part() {
        let scene = Scene::new("test");
        let root = scene
            .add_group_with_parts(vec![id(1), id(2), id(3)])
            .unwrap();

        assert_eq!(root, id(1));
        for n in 1..=3 {
            assert_eq!(scene.try_get_part_group(id(n)), Some(root));
        }
        assert_eq!(scene.try_get_part_group(id(4)), None);
        assert_eq!(scene.group(root).unwrap().part_count(), 3);
    }

    #[test]
    fn add_group_rejects_empty_and_duplicate_parts() {
        let scene = Scene::new("test");
        assert!(matches!(
            scene.add_group_with_parts(vec![]),
            Err(SceneError::EmptyGroup)
        ));

        scene.add_group_with_parts(vec![id(1), id(2)]).unwrap();
        let err = scene.add_group_with_parts(vec![id(5), id(2)]).unwrap_err();
        assert!(matches!(err, SceneError::DuplicatePart { part } if part == id(2)));
        assert_eq!(scene.group_count(), 1);
    }

    #[test]
    fn add_group_generates_at_least_one_part() {
        let scene = Scene::new("test");
        let root = scene.add_group(0);
        assert_eq!(scene.group(root).unwrap().parts(), &[root]);
    }

    #[test]
    fn copy_group_emits_one_event_per_part_root_first() {
        let scene = Scene::new("test");
        let recorder = Arc::new(Recorder::default());
        scene.events().subscribe(recorder.clone());

        let root = scene.add_group_with_parts(vec![id(1), id(2)]).unwrap();
        let copy_root = scene.copy_group(root, true).unwrap();

        let copies = recorder.copies.lock().clone();
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0].original, id(1));
        assert_eq!(copies[0].copy, copy_root);
        assert!(copies[0].original_is_root);
        assert!(copies[0].user_exposed);
        assert_eq!(copies[1].original, id(2));
        assert!(!copies[1].original_is_root);

        let copy = scene.group(copy_root).unwrap();
        assert_eq!(copy.parts(), &[copies[0].copy, copies[1].copy]);
        assert_eq!(scene.group_count(), 2);
    }

    #[test]
    fn internal_copy_is_flagged() {
        let scene = Scene::new("test");
        let recorder = Arc::new(Recorder::default());
        scene.events().subscribe(recorder.clone());

        let root = scene.add_group(1);
        scene.copy_group(root, false).unwrap();

        assert!(!recorder.copies.lock()[0].user_exposed);
    }

    #[test]
    fn copy_unknown_group_fails() {
        let scene = Scene::new("test");
        let err = scene.copy_group(id(9), true).unwrap_err();
        assert!(matches!(err, SceneError::UnknownGroup { root } if root == id(9)));
    }

    #[test]
    fn remove_group_notifies_before_removal() {
        let scene = Arc::new(Scene::new("test"));
        let recorder = Arc::new(Recorder::default());
        *recorder.scene.lock() = Some(Arc::clone(&scene));
        scene.events().subscribe(recorder.clone());

        let root = scene.add_group_with_parts(vec![id(1), id(2)]).unwrap();
        let removed = scene.remove_group(root).unwrap();

        assert_eq!(removed.parts(), &[id(1), id(2)]);
        assert_eq!(
            *recorder.removals.lock(),
            vec![(GroupRemoved { root }, true)]
        );
        assert!(scene.group(root).is_none());
        assert_eq!(scene.try_get_part_group(id(2)), None);

        // Break the Arc cycle.
        recorder.scene.lock().take();
    }

    #[test]
    fn remove_unknown_group_fails_without_event() {
        let scene = Scene::new("test");
        let recorder = Arc::new(Recorder::default());
        scene.events().subscribe(recorder.clone());

        assert!(scene.remove_group(id(3)).is_err());
        assert!(recorder.removals.lock().is_empty());
    }

    #[test]
    fn script_comms_capability_is_optional() {
        let scene = Scene::new("bare");
        assert!(scene.script_comms().is_none());

        let comms: Arc<dyn ScriptModuleComms> = Arc::new(scion_script::ScriptComms::new());
        let scene = Scene::with_script_comms("scripted", comms);
        assert!(scene.script_comms().is_some());

        scene.set_script_comms(None);
        assert!(scene.script_comms().is_none());
    }
}
