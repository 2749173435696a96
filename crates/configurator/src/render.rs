//! Render contract: everything the host renderer needs for one frame.
//!
//! The engine never touches GPU resources. It emits a flat list of
//! components with world transforms, effective visibility, geometry
//! descriptors and resolved materials, plus camera, lighting and UI state.

use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::Serialize;
use shared::{
    ComponentId, MaterialDefinition, MaterialKind, ProductDimensions, SceneConfig, UiToggles,
};

use crate::camera::{CameraController, CameraProjection, Viewport};
use crate::geometry::{dispatch_geometry, GeometryDescriptor};
use crate::lighting::{derive_lighting, LightingRig};
use crate::normalize::normalize_config;
use crate::tree::{ComponentTree, NodeIndex};
use crate::visibility::resolve_visibility;

/// Tag marking transparent parts
pub const TAG_GLASS: &str = "glass";
/// Tag for parts that must not cast shadows
pub const TAG_NO_SHADOW: &str = "no-shadow";

/// Material id used when a node has none or it does not resolve
pub const FALLBACK_MATERIAL_ID: &str = "__default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderHints {
    pub transparent: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderComponent {
    pub id: ComponentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ComponentId>,
    pub depth: usize,
    /// Column-major local-to-world matrix
    pub world_matrix: [f64; 16],
    /// Own flag combined with every ancestor's
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryDescriptor>,
    pub material: MaterialDefinition,
    pub hints: RenderHints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderScene {
    pub components: Vec<RenderComponent>,
    pub camera: CameraProjection,
    pub lighting: LightingRig,
    pub ui: UiToggles,
    pub dimensions: ProductDimensions,
}

impl RenderScene {
    pub fn component(&self, id: &str) -> Option<&RenderComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Components that should actually be drawn
    pub fn visible_components(&self) -> impl Iterator<Item = &RenderComponent> {
        self.components.iter().filter(|c| c.visible && c.geometry.is_some())
    }
}

fn local_matrix(position: [f64; 3], rotation: [f64; 3]) -> DMat4 {
    let rotation = DQuat::from_euler(EulerRot::XYZ, rotation[0], rotation[1], rotation[2]);
    DMat4::from_rotation_translation(rotation, DVec3::from_array(position))
}

fn resolve_material(config: &SceneConfig, id: Option<&str>, node: &str) -> MaterialDefinition {
    match id {
        Some(id) => config.material(id).cloned().unwrap_or_else(|| {
            tracing::debug!(node, material = id, "unknown material, using fallback");
            MaterialDefinition::fallback(FALLBACK_MATERIAL_ID)
        }),
        None => MaterialDefinition::fallback(FALLBACK_MATERIAL_ID),
    }
}

fn hints(tags: &std::collections::BTreeSet<String>, material: &MaterialDefinition) -> RenderHints {
    let transparent =
        tags.contains(TAG_GLASS) || material.kind == MaterialKind::Glass || material.opacity < 1.0;
    RenderHints {
        transparent,
        cast_shadow: !tags.contains(TAG_NO_SHADOW) && !transparent,
        receive_shadow: !transparent,
    }
}

/// Build the per-frame render contract
pub fn build_render_scene(config: &SceneConfig, camera: &CameraController) -> RenderScene {
    let normalized;
    let (config, tree) = match ComponentTree::from_nodes(&config.components) {
        Ok(tree) => (config, tree),
        Err(e) => {
            tracing::debug!(error = %e, "component tree invalid, rendering normalized copy");
            normalized = normalize_config(config);
            let tree = ComponentTree::from_nodes(&normalized.components).unwrap_or_default();
            (&normalized, tree)
        }
    };

    let effective = resolve_visibility(&tree, &config.visibility);
    let order = tree.iter_depth_first();
    let mut world: Vec<DMat4> = vec![DMat4::IDENTITY; tree.len()];
    let mut components = Vec::with_capacity(order.len());

    for index in order {
        let entry = tree.get(index);
        let node = &entry.data;
        let parent_world = entry.parent.map(|p: NodeIndex| world[p.index()]).unwrap_or(DMat4::IDENTITY);
        let matrix = parent_world * local_matrix(node.position, node.rotation);
        world[index.index()] = matrix;

        let material = resolve_material(config, node.material_id.as_deref(), &node.id);
        components.push(RenderComponent {
            id: node.id.clone(),
            name: node.name.clone(),
            parent: entry.parent.map(|p| tree.get(p).data.id.clone()),
            depth: entry.depth,
            world_matrix: matrix.to_cols_array(),
            visible: effective.get(&node.id).copied().unwrap_or(false),
            geometry: dispatch_geometry(node),
            hints: hints(&node.tags, &material),
            material,
        });
    }

    RenderScene {
        components,
        camera: camera.projection(&config.dimensions),
        lighting: derive_lighting(&config.lighting),
        ui: config.ui,
        dimensions: config.dimensions,
    }
}

/// Render contract for a viewport, using the config's own camera state
pub fn render_for_viewport(config: &SceneConfig, viewport: Viewport) -> RenderScene {
    let camera = CameraController::new(config.camera.clone(), viewport);
    build_render_scene(config, &camera)
}
