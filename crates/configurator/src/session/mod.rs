//! Editor session state
//!
//! One `SceneSession` owns the `SceneConfig` of a single configurator
//! instance, with undo/redo history and a version counter for render caches.

mod history;

use shared::{
    CameraState, ComponentId, ComponentNode, LightingConfig, MaterialDefinition, SceneConfig,
    UiToggles,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::normalize::{normalize, normalize_config};
use crate::visibility;

/// Maximum number of undo snapshots kept
pub const MAX_UNDO: usize = 100;

/// Scene config with undo/redo history
#[derive(Default)]
pub struct SceneSession {
    /// Current document
    config: SceneConfig,
    pub(crate) undo_stack: Vec<SceneConfig>,
    pub(crate) redo_stack: Vec<SceneConfig>,
    /// Monotonically increasing version counter for cache invalidation
    pub(crate) version: u64,
}

fn find_node_mut<'a>(nodes: &'a mut [ComponentNode], id: &str) -> Option<&'a mut ComponentNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_node(nodes: &mut Vec<ComponentNode>, id: &str) -> bool {
    if let Some(pos) = nodes.iter().position(|n| n.id == id) {
        nodes.remove(pos);
        return true;
    }
    nodes.iter_mut().any(|n| remove_node(&mut n.children, id))
}

impl SceneSession {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config: normalize_config(&config),
            ..Self::default()
        }
    }

    /// Session over an untrusted persisted document
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            config: normalize(value),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Current version (increments on every change)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Save current state to undo stack
    fn save_undo(&mut self) {
        self.undo_stack.push(self.config.clone());
        if self.undo_stack.len() > MAX_UNDO {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Swap in `next` as an undoable step; returns false when nothing changed
    fn apply(&mut self, next: SceneConfig) -> bool {
        if next == self.config {
            return false;
        }
        self.save_undo();
        self.config = next;
        self.version += 1;
        true
    }

    fn apply_normalized(&mut self, next: SceneConfig) -> bool {
        self.apply(normalize_config(&next))
    }

    // ── Visibility ──────────────────────────────────────────

    pub fn toggle_visibility(&mut self, id: &str) -> bool {
        let next = visibility::toggle_visibility(&self.config, id);
        self.apply(next)
    }

    pub fn set_visibility(&mut self, id: &str, visible: bool) -> bool {
        let next = visibility::set_visibility(&self.config, id, visible);
        self.apply(next)
    }

    pub fn reset_visibility(&mut self) -> bool {
        let next = visibility::reset_visibility(&self.config);
        self.apply(next)
    }

    // ── Camera, lighting, UI ────────────────────────────────

    /// Store a committed camera pose, sanitized like any loaded one; camera
    /// moves are not undoable
    pub fn commit_camera(&mut self, camera: CameraState) -> bool {
        let mut candidate = self.config.clone();
        candidate.camera = camera;
        let camera = normalize_config(&candidate).camera;
        if camera == self.config.camera {
            return false;
        }
        self.config.camera = camera;
        self.version += 1;
        true
    }

    pub fn set_lighting(&mut self, lighting: LightingConfig) -> bool {
        let next = SceneConfig { lighting, ..self.config.clone() };
        self.apply_normalized(next)
    }

    pub fn set_ui(&mut self, ui: UiToggles) -> bool {
        let next = SceneConfig { ui, ..self.config.clone() };
        self.apply(next)
    }

    // ── Materials and components ────────────────────────────

    /// Replace the material with the same id, or append it
    pub fn upsert_material(&mut self, material: MaterialDefinition) -> bool {
        let mut next = self.config.clone();
        match next.materials.iter_mut().find(|m| m.id == material.id) {
            Some(slot) => *slot = material,
            None => next.materials.push(material),
        }
        self.apply_normalized(next)
    }

    /// Edit one node in place; unknown ids change nothing
    pub fn update_node(&mut self, id: &str, edit: impl FnOnce(&mut ComponentNode)) -> bool {
        let mut next = self.config.clone();
        let Some(node) = find_node_mut(&mut next.components, id) else {
            tracing::debug!(id, "update for unknown component ignored");
            return false;
        };
        edit(node);
        self.apply_normalized(next)
    }

    /// Add a node under `parent` (or as a root); an empty id gets a fresh uuid
    pub fn add_component(&mut self, parent: Option<&str>, mut node: ComponentNode) -> Option<ComponentId> {
        if node.id.is_empty() {
            node.id = uuid::Uuid::new_v4().to_string();
        }
        if self.config.find_component(&node.id).is_some() {
            tracing::debug!(id = %node.id, "component id already in use");
            return None;
        }
        let id = node.id.clone();
        let mut next = self.config.clone();
        next.visibility.insert(id.clone(), node.visible);
        match parent {
            Some(parent_id) => find_node_mut(&mut next.components, parent_id)?.children.push(node),
            None => next.components.push(node),
        }
        self.apply_normalized(next).then_some(id)
    }

    /// Remove a node and its subtree
    pub fn remove_component(&mut self, id: &str) -> bool {
        let mut next = self.config.clone();
        if !remove_node(&mut next.components, id) {
            return false;
        }
        let remaining = visibility::all_visible(&next.components);
        next.visibility.retain(|k, _| remaining.contains_key(k));
        self.apply(next)
    }

    /// Replace the whole document (e.g. after a reload)
    pub fn replace(&mut self, config: SceneConfig) -> bool {
        self.apply_normalized(config)
    }

    // ── Saving ──────────────────────────────────────────────

    /// Stamp `updatedAt` and return the document to persist
    pub fn commit_at(&mut self, now: OffsetDateTime) -> SceneConfig {
        match now.format(&Rfc3339) {
            Ok(stamp) => self.config.updated_at = stamp,
            Err(e) => tracing::warn!(error = %e, "could not format commit timestamp"),
        }
        self.config.clone()
    }

    pub fn commit(&mut self) -> SceneConfig {
        self.commit_at(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{box_part, door_scene, material};
    use shared::MaterialKind;

    #[test]
    fn test_visibility_ops_bump_version() {
        let mut s = SceneSession::new(door_scene());
        assert_eq!(s.version(), 0);
        assert!(s.toggle_visibility("glass"));
        assert_eq!(s.version(), 1);
        assert!(!s.config().find_component("glass").unwrap().visible);
        // Unknown id is a no-op
        assert!(!s.toggle_visibility("nope"));
        assert_eq!(s.version(), 1);
        assert!(s.reset_visibility());
        assert!(s.config().find_component("glass").unwrap().visible);
    }

    #[test]
    fn test_set_lighting_is_sanitized() {
        let mut s = SceneSession::new(door_scene());
        let lighting = LightingConfig {
            bounds_x: [500.0, -500.0],
            intensity: 50.0,
            shadow_catcher_diameter: 10.0,
            ..LightingConfig::default()
        };
        assert!(s.set_lighting(lighting));
        let l = &s.config().lighting;
        assert_eq!(l.bounds_x, [-500.0, 500.0]);
        assert_eq!(l.intensity, shared::MAX_LIGHT_INTENSITY);
        assert_eq!(l.shadow_catcher_diameter, shared::MIN_SHADOW_CATCHER_DIAMETER);
    }

    #[test]
    fn test_upsert_material() {
        let mut s = SceneSession::new(door_scene());
        let count = s.config().materials.len();
        assert!(s.upsert_material(material("oak", MaterialKind::Painted, "#ffffff")));
        assert_eq!(s.config().materials.len(), count);
        assert_eq!(s.config().material("oak").unwrap().kind, MaterialKind::Painted);
        assert!(s.upsert_material(material("steel", MaterialKind::Metal, "#888888")));
        assert_eq!(s.config().materials.len(), count + 1);
    }

    #[test]
    fn test_update_node() {
        let mut s = SceneSession::new(door_scene());
        assert!(s.update_node("handle", |n| n.position = [300.0, 1000.0, 30.0]));
        assert_eq!(s.config().find_component("handle").unwrap().position, [300.0, 1000.0, 30.0]);
        assert!(!s.update_node("missing", |n| n.visible = false));
        // Non-finite edits are repaired
        assert!(s.update_node("handle", |n| n.position = [f64::NAN, 0.0, 0.0]));
        assert_eq!(s.config().find_component("handle").unwrap().position, [0.0; 3]);
    }

    #[test]
    fn test_add_and_remove_component() {
        let mut s = SceneSession::new(door_scene());
        let id = s.add_component(Some("frame"), box_part("", "Mullion", 40.0, 1800.0, 44.0, [0.0; 3])).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert!(s.config().find_component(&id).is_some());
        assert!(s.add_component(None, box_part("door", "Dup", 1.0, 1.0, 1.0, [0.0; 3])).is_none());
        assert!(s.add_component(Some("ghost"), box_part("x", "X", 1.0, 1.0, 1.0, [0.0; 3])).is_none());

        assert!(s.remove_component("frame"));
        assert!(s.config().find_component(&id).is_none());
        assert!(!s.config().visibility.contains_key(&id));
        assert!(!s.remove_component("frame"));
    }

    #[test]
    fn test_commit_camera_sanitizes_pose() {
        let mut s = SceneSession::new(door_scene());
        let mut camera = s.config().camera.clone();
        camera.position = [f64::NAN, 0.0, 0.0];
        camera.zoom = -4.0;
        camera.fov = 900.0;
        assert!(s.commit_camera(camera.clone()));

        let stored = &s.config().camera;
        assert!(stored.position.iter().all(|v| v.is_finite()));
        assert!(stored.zoom > 0.0);
        assert_eq!(stored.fov, crate::normalize::MAX_FOV);
        assert_eq!(&normalize_config(s.config()), s.config());
        // The same bad input sanitizes to what is already stored
        assert!(!s.commit_camera(camera));
    }

    #[test]
    fn test_commit_camera_not_undoable() {
        let mut s = SceneSession::new(door_scene());
        let mut camera = s.config().camera.clone();
        camera.zoom = 2.0;
        assert!(s.commit_camera(camera.clone()));
        assert!(!s.commit_camera(camera));
        assert_eq!(s.version(), 1);
        assert!(!s.can_undo());
    }

    #[test]
    fn test_commit_stamps_rfc3339() {
        let mut s = SceneSession::new(door_scene());
        let at = OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap();
        let doc = s.commit_at(at);
        assert_eq!(doc.updated_at, "2026-01-01T00:00:00Z");
        assert_eq!(s.config().updated_at, doc.updated_at);
        let doc = s.commit();
        assert!(OffsetDateTime::parse(&doc.updated_at, &Rfc3339).is_ok());
    }

    #[test]
    fn test_replace_normalizes() {
        let mut s = SceneSession::default();
        let mut config = door_scene();
        config.camera.fov = 500.0;
        assert!(s.replace(config));
        assert_eq!(s.config().camera.fov, crate::normalize::MAX_FOV);
    }
}
