//! Factory functions for creating test data.
//!
//! Provides helpers to construct `ComponentNode`, `MaterialDefinition` and
//! whole `SceneConfig` documents used in unit and integration tests.

use shared::*;

// ── Component factories ─────────────────────────────────────────

/// Box-shaped part at a position
pub fn box_part(id: &str, name: &str, w: f64, h: f64, d: f64, pos: [f64; 3]) -> ComponentNode {
    ComponentNode::new(id, name)
        .with_geometry(GeometrySpec::Box { width: w, height: h, depth: d })
        .at(pos)
}

/// Glazing pane tagged as glass
pub fn glass_pane(id: &str, w: f64, h: f64) -> ComponentNode {
    box_part(id, "Glass", w, h, 6.0, [0.0, 0.0, 0.0])
        .with_material("glass")
        .tagged("glass")
}

/// Lever handle loaded from the asset cache
pub fn handle(id: &str, pos: [f64; 3]) -> ComponentNode {
    ComponentNode::new(id, "Handle")
        .with_geometry(GeometrySpec::Gltf { asset_id: Some("lever-handle".into()), blob: None, scale: 1.0 })
        .with_material("chrome")
        .tagged("no-shadow")
        .at(pos)
}

/// Segmental arch head curve for a door of `width`
pub fn arch_head(width: f64, rise: f64, spring_line: f64) -> CurveDefinition {
    CurveDefinition::new(
        CurveShape::SegmentalArch { span: width, rise, origin: [0.0, spring_line] },
        48,
    )
}

// ── Material factories ──────────────────────────────────────────

pub fn material(id: &str, kind: MaterialKind, color: &str) -> MaterialDefinition {
    MaterialDefinition {
        id: id.to_string(),
        kind,
        base_color: color.to_string(),
        roughness: 0.5,
        metalness: if kind == MaterialKind::Metal { 1.0 } else { 0.0 },
        opacity: if kind == MaterialKind::Glass { 0.3 } else { 1.0 },
        maps: Vec::new(),
    }
}

pub fn door_materials() -> Vec<MaterialDefinition> {
    vec![
        material("oak", MaterialKind::Wood, "#8b5a2b"),
        material("glass", MaterialKind::Glass, "#ddeeff"),
        material("chrome", MaterialKind::Metal, "#c0c0c0"),
    ]
}

// ── Scene factories ─────────────────────────────────────────────

/// 914 x 2032 x 44 door: frame with two stiles, a glazed panel and a handle
pub fn door_scene() -> SceneConfig {
    let frame = ComponentNode::new("frame", "Frame")
        .with_children(vec![
            box_part("stile-l", "Left stile", 100.0, 2032.0, 44.0, [-407.0, 1016.0, 0.0]).with_material("oak"),
            box_part("stile-r", "Right stile", 100.0, 2032.0, 44.0, [407.0, 1016.0, 0.0]).with_material("oak"),
        ]);
    let panel = ComponentNode::new("panel", "Panel")
        .at([0.0, 1016.0, 0.0])
        .with_children(vec![glass_pane("glass", 600.0, 1600.0)]);
    let door = ComponentNode::new("door", "Door")
        .with_children(vec![frame, panel, handle("handle", [350.0, 1000.0, 30.0])]);

    let mut config = SceneConfig::default();
    config.components = vec![door];
    config.materials = door_materials();
    config.dimensions = ProductDimensions { width: 914.0, height: 2032.0, depth: 44.0 };
    config.lighting.bounds_x = [-457.0, 457.0];
    config.lighting.bounds_z = [-22.0, 22.0];
    config
}

/// Door scene with every component explicitly listed as visible
pub fn door_scene_with_overlay() -> SceneConfig {
    let mut config = door_scene();
    config.visibility = crate::visibility::all_visible(&config.components);
    config
}
