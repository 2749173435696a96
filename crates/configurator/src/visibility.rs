//! Visibility overlay and the baked per-node flags.
//!
//! The overlay is the source of truth. Every operation that changes it
//! re-bakes the tree in the same returned `SceneConfig`, so the flat map and
//! the node flags can never be observed disagreeing.

use std::collections::BTreeMap;

use shared::{ComponentId, ComponentNode, SceneConfig, VisibilityMap};

use crate::tree::ComponentTree;

/// Overlay with every node in the forest visible
pub fn all_visible(nodes: &[ComponentNode]) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for root in nodes {
        root.walk(&mut |node| {
            map.insert(node.id.clone(), true);
        });
    }
    map
}

/// A node's own flag: overlay entry if present, else its default
fn own_flag(node: &ComponentNode, overlay: &VisibilityMap) -> bool {
    overlay.get(&node.id).copied().unwrap_or(node.visible)
}

/// Effective visibility of every node; a hidden ancestor hides its descendants
pub fn resolve_visibility(tree: &ComponentTree, overlay: &VisibilityMap) -> BTreeMap<ComponentId, bool> {
    let mut effective: Vec<bool> = vec![true; tree.len()];
    let mut out = BTreeMap::new();
    // Pre-order guarantees the parent is resolved first
    for index in tree.iter_depth_first() {
        let entry = tree.get(index);
        let inherited = entry.parent.map(|p| effective[p.index()]).unwrap_or(true);
        let visible = inherited && own_flag(&entry.data, overlay);
        effective[index.index()] = visible;
        out.insert(entry.data.id.clone(), visible);
    }
    out
}

/// New tree with each node's `visible` baked from the overlay; input untouched
pub fn apply_visibility_map(nodes: &[ComponentNode], overlay: &VisibilityMap) -> Vec<ComponentNode> {
    nodes
        .iter()
        .map(|node| ComponentNode {
            visible: own_flag(node, overlay),
            children: apply_visibility_map(&node.children, overlay),
            ..node.clone()
        })
        .collect()
}

/// Flip one component's own flag; unknown ids leave the config unchanged
pub fn toggle_visibility(config: &SceneConfig, id: &str) -> SceneConfig {
    let Some(node) = config.find_component(id) else {
        tracing::debug!(id, "toggle for unknown component ignored");
        return config.clone();
    };
    let current = own_flag(node, &config.visibility);
    set_visibility(config, id, !current)
}

pub fn set_visibility(config: &SceneConfig, id: &str, visible: bool) -> SceneConfig {
    if config.find_component(id).is_none() {
        tracing::debug!(id, "visibility for unknown component ignored");
        return config.clone();
    }
    let mut visibility = config.visibility.clone();
    visibility.insert(id.to_string(), visible);
    with_overlay(config, visibility)
}

/// Show everything again
pub fn reset_visibility(config: &SceneConfig) -> SceneConfig {
    with_overlay(config, all_visible(&config.components))
}

/// Replace the overlay and re-bake the tree in one step
pub fn with_overlay(config: &SceneConfig, visibility: VisibilityMap) -> SceneConfig {
    SceneConfig {
        components: apply_visibility_map(&config.components, &visibility),
        visibility,
        ..config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.components = vec![ComponentNode::new("door", "Door").with_children(vec![
            ComponentNode::new("frame", "Frame")
                .with_children(vec![ComponentNode::new("bead", "Glazing bead")]),
            ComponentNode::new("glass", "Glass"),
        ])];
        config.visibility = all_visible(&config.components);
        config
    }

    fn resolve(nodes: &[ComponentNode], overlay: &VisibilityMap) -> BTreeMap<ComponentId, bool> {
        resolve_visibility(&ComponentTree::from_nodes(nodes).unwrap(), overlay)
    }

    #[test]
    fn test_hidden_ancestor_hides_descendants() {
        let config = scene();
        let mut overlay = config.visibility.clone();
        overlay.insert("frame".into(), false);
        let eff = resolve(&config.components, &overlay);
        assert!(eff["door"]);
        assert!(!eff["frame"]);
        assert!(!eff["bead"]);
        assert!(eff["glass"]);
    }

    #[test]
    fn test_overlay_falls_back_to_node_flag() {
        let mut config = scene();
        config.components[0].children[1].visible = false;
        let eff = resolve(&config.components, &VisibilityMap::new());
        assert!(!eff["glass"]);
        assert!(eff["frame"]);
    }

    #[test]
    fn test_apply_is_pure_and_consistent() {
        let config = scene();
        let before = config.components.clone();
        let mut overlay = VisibilityMap::new();
        overlay.insert("glass".into(), false);
        overlay.insert("door".into(), true);
        let baked = apply_visibility_map(&config.components, &overlay);
        assert_eq!(config.components, before);
        assert_eq!(resolve(&baked, &VisibilityMap::new()), resolve(&config.components, &overlay));
    }

    #[test]
    fn test_toggle_updates_overlay_and_tree_together() {
        let config = scene();
        let toggled = toggle_visibility(&config, "glass");
        assert_eq!(toggled.visibility["glass"], false);
        assert!(!toggled.find_component("glass").unwrap().visible);
        // Original untouched
        assert!(config.find_component("glass").unwrap().visible);

        let back = toggle_visibility(&toggled, "glass");
        assert_eq!(back.visibility["glass"], true);
        assert!(back.find_component("glass").unwrap().visible);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let config = scene();
        assert_eq!(toggle_visibility(&config, "nope"), config);
    }

    #[test]
    fn test_reset_visibility() {
        let hidden = set_visibility(&scene(), "frame", false);
        let reset = reset_visibility(&hidden);
        assert!(reset.visibility.values().all(|v| *v));
        assert!(reset.find_component("frame").unwrap().visible);
    }
}
