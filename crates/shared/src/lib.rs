use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

mod curve;

pub use curve::{
    clamp_resolution, resolution_from_f64, CurveDefinition, CurveShape, DEFAULT_RESOLUTION,
    MAX_RESOLUTION, MIN_RESOLUTION,
};

/// Stable identifier of a component, unique across the whole tree
pub type ComponentId = String;

/// Identifier of a material definition
pub type MaterialId = String;

/// Flat per-component visibility override, layered over `ComponentNode::visible`
pub type VisibilityMap = BTreeMap<ComponentId, bool>;

/// Current persisted format version
pub const SCENE_VERSION: u32 = 1;

/// Timestamp used when a document has never been committed
pub const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_cylinder_segments() -> u32 {
    32
}

fn default_tube_segments() -> u32 {
    12
}

fn default_lathe_segments() -> u32 {
    32
}

fn default_phi_length() -> f64 {
    std::f64::consts::TAU
}

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned box dimensions (width = X, height = Y, depth = Z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDims {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// Geometry parameters of a component, one variant per geometry kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GeometrySpec {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Cylinder {
        radius_top: f64,
        radius_bottom: f64,
        height: f64,
        #[serde(default = "default_cylinder_segments")]
        radial_segments: u32,
    },
    /// Outer polygon plus holes, extruded along +Z
    Extrude {
        shape: Vec<[f64; 2]>,
        #[serde(default)]
        holes: Vec<Vec<[f64; 2]>>,
        depth: f64,
    },
    /// Like `Extrude`, but the boundaries are chains of curve definitions
    ShapeExtrude {
        outline: Vec<CurveDefinition>,
        #[serde(default)]
        holes: Vec<Vec<CurveDefinition>>,
        depth: f64,
    },
    Tube {
        path: CurveDefinition,
        radius: f64,
        #[serde(default = "default_tube_segments")]
        radial_segments: u32,
        #[serde(default)]
        closed: bool,
    },
    /// Profile points are (radius, height), revolved about Y
    Lathe {
        profile: Vec<[f64; 2]>,
        #[serde(default = "default_lathe_segments")]
        segments: u32,
        #[serde(default)]
        phi_start: f64,
        #[serde(default = "default_phi_length")]
        phi_length: f64,
    },
    ProfileExtrude {
        profile: Vec<[f64; 2]>,
        path: CurveDefinition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<BoxDims>,
    },
    /// Resolved by the external asset cache, never built here
    Gltf {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        asset_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        blob: Option<String>,
        #[serde(default = "default_one")]
        scale: f64,
    },
    /// Raw triangle mesh: flat xyz vertex list plus triangle indices
    Custom {
        vertices: Vec<f64>,
        indices: Vec<u32>,
    },
}

impl GeometrySpec {
    /// JSON tag of the geometry kind
    pub fn kind(&self) -> &'static str {
        match self {
            GeometrySpec::Box { .. } => "box",
            GeometrySpec::Cylinder { .. } => "cylinder",
            GeometrySpec::Extrude { .. } => "extrude",
            GeometrySpec::ShapeExtrude { .. } => "shapeExtrude",
            GeometrySpec::Tube { .. } => "tube",
            GeometrySpec::Lathe { .. } => "lathe",
            GeometrySpec::ProfileExtrude { .. } => "profileExtrude",
            GeometrySpec::Gltf { .. } => "gltf",
            GeometrySpec::Custom { .. } => "custom",
        }
    }
}

/// Node geometry as persisted.
///
/// Anything that does not parse as a known kind is kept verbatim, so that a
/// save after load never loses data; such nodes simply render nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Spec(GeometrySpec),
    Unparsed(serde_json::Value),
}

impl Geometry {
    pub fn spec(&self) -> Option<&GeometrySpec> {
        match self {
            Geometry::Spec(spec) => Some(spec),
            Geometry::Unparsed(_) => None,
        }
    }
}

impl From<GeometrySpec> for Geometry {
    fn from(spec: GeometrySpec) -> Self {
        Geometry::Spec(spec)
    }
}

// ============================================================================
// Component tree
// ============================================================================

/// One part of the product (panel, frame member, hardware)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: ComponentId,
    #[serde(default)]
    pub name: String,
    /// Free-form part type ("panel", "frame", "hardware", ...)
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub position: [f64; 3],
    /// XYZ Euler angles in radians
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_id: Option<MaterialId>,
    /// Render hints such as "glass" or "no-shadow"
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    pub fn new(id: impl Into<ComponentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            visible: true,
            position: [0.0; 3],
            rotation: [0.0; 3],
            geometry: None,
            material_id: None,
            tags: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, spec: GeometrySpec) -> Self {
        self.geometry = Some(Geometry::Spec(spec));
        self
    }

    pub fn with_material(mut self, material_id: impl Into<MaterialId>) -> Self {
        self.material_id = Some(material_id.into());
        self
    }

    pub fn with_children(mut self, children: Vec<ComponentNode>) -> Self {
        self.children = children;
        self
    }

    pub fn at(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Depth-first visit of this node and all descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ComponentNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Count nodes in a forest
pub fn count_nodes(nodes: &[ComponentNode]) -> usize {
    let mut count = 0;
    for node in nodes {
        node.walk(&mut |_| count += 1);
    }
    count
}

// ============================================================================
// Materials
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Wood,
    Glass,
    Metal,
    Painted,
    #[default]
    Default,
}

impl MaterialKind {
    /// Lenient parse used by the normalizer; unknown names map to `Default`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "wood" | "timber" => MaterialKind::Wood,
            "glass" => MaterialKind::Glass,
            "metal" => MaterialKind::Metal,
            "painted" | "paint" => MaterialKind::Painted,
            _ => MaterialKind::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDefinition {
    pub id: MaterialId,
    #[serde(rename = "type", default)]
    pub kind: MaterialKind,
    /// `#rrggbb`
    pub base_color: String,
    pub roughness: f64,
    pub metalness: f64,
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default)]
    pub maps: Vec<String>,
}

pub const DEFAULT_BASE_COLOR: &str = "#cccccc";

impl MaterialDefinition {
    /// Neutral material used when a node has no (resolvable) material
    pub fn fallback(id: impl Into<MaterialId>) -> Self {
        Self {
            id: id.into(),
            kind: MaterialKind::Default,
            base_color: DEFAULT_BASE_COLOR.to_string(),
            roughness: 0.6,
            metalness: 0.0,
            opacity: 1.0,
            maps: Vec::new(),
        }
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Perspective,
    Ortho,
}

/// Orthographic zoom that means "not chosen by the user yet"
pub const ZOOM_SENTINEL: f64 = 1.0;
pub const DEFAULT_FOV: f64 = 45.0;

/// Pose of one camera mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPose {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub target: [f64; 3],
    pub zoom: f64,
    /// Vertical field of view in degrees
    pub fov: f64,
}

impl CameraPose {
    /// Initial pose of a mode before the user has moved the camera
    pub fn default_for(mode: CameraMode) -> Self {
        match mode {
            CameraMode::Perspective => Self {
                position: [1500.0, 1400.0, 3500.0],
                rotation: [0.0; 3],
                target: [0.0, 1000.0, 0.0],
                zoom: ZOOM_SENTINEL,
                fov: DEFAULT_FOV,
            },
            CameraMode::Ortho => Self {
                position: [0.0, 1000.0, 5000.0],
                rotation: [0.0; 3],
                target: [0.0, 1000.0, 0.0],
                zoom: ZOOM_SENTINEL,
                fov: DEFAULT_FOV,
            },
        }
    }
}

/// Persisted camera: the active mode's pose plus the parked pose of the other mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub mode: CameraMode,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub target: [f64; 3],
    pub zoom: f64,
    pub fov: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parked_pose: Option<CameraPose>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::from_pose(CameraMode::Perspective, CameraPose::default_for(CameraMode::Perspective))
    }
}

impl CameraState {
    pub fn from_pose(mode: CameraMode, pose: CameraPose) -> Self {
        Self {
            mode,
            position: pose.position,
            rotation: pose.rotation,
            target: pose.target,
            zoom: pose.zoom,
            fov: pose.fov,
            parked_pose: None,
        }
    }

    /// Pose of the active mode
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            rotation: self.rotation,
            target: self.target,
            zoom: self.zoom,
            fov: self.fov,
        }
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.rotation = pose.rotation;
        self.target = pose.target;
        self.zoom = pose.zoom;
        self.fov = pose.fov;
    }
}

// ============================================================================
// Lighting
// ============================================================================

pub const DEFAULT_BOUNDS: [f64; 2] = [-500.0, 500.0];
pub const MIN_SHADOW_CATCHER_DIAMETER: f64 = 500.0;
pub const MAX_LIGHT_INTENSITY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingConfig {
    /// Horizontal footprint along X, `[min, max]` in mm
    pub bounds_x: [f64; 2],
    /// Horizontal footprint along Z, `[min, max]` in mm
    pub bounds_z: [f64; 2],
    pub intensity: f64,
    pub ambient_intensity: f64,
    pub shadow_catcher_diameter: f64,
    pub cast_shadows: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            bounds_x: DEFAULT_BOUNDS,
            bounds_z: DEFAULT_BOUNDS,
            intensity: 1.0,
            ambient_intensity: 0.5,
            shadow_catcher_diameter: 3000.0,
            cast_shadows: true,
        }
    }
}

// ============================================================================
// UI toggles, dimensions, scene root
// ============================================================================

/// Non-geometric display toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiToggles {
    pub show_grid: bool,
    pub show_axes: bool,
    pub show_dimensions: bool,
    pub show_component_list: bool,
}

impl Default for UiToggles {
    fn default() -> Self {
        Self {
            show_grid: true,
            show_axes: false,
            show_dimensions: true,
            show_component_list: true,
        }
    }
}

/// Overall product size in mm
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDimensions {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

/// Complete serializable state of one configurator instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    pub version: u32,
    pub components: Vec<ComponentNode>,
    pub materials: Vec<MaterialDefinition>,
    pub camera: CameraState,
    pub lighting: LightingConfig,
    pub visibility: VisibilityMap,
    pub ui: UiToggles,
    pub dimensions: ProductDimensions,
    pub custom_data: serde_json::Map<String, serde_json::Value>,
    /// RFC 3339, stamped when the document is committed for saving
    pub updated_at: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            version: SCENE_VERSION,
            components: Vec::new(),
            materials: Vec::new(),
            camera: CameraState::default(),
            lighting: LightingConfig::default(),
            visibility: VisibilityMap::new(),
            ui: UiToggles::default(),
            dimensions: ProductDimensions::default(),
            custom_data: serde_json::Map::new(),
            updated_at: EPOCH_TIMESTAMP.to_string(),
        }
    }
}

impl SceneConfig {
    pub fn material(&self, id: &str) -> Option<&MaterialDefinition> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Find a node anywhere in the tree
    pub fn find_component(&self, id: &str) -> Option<&ComponentNode> {
        let mut found = None;
        for root in &self.components {
            root.walk(&mut |node| {
                if found.is_none() && node.id == id {
                    found = Some(node);
                }
            });
        }
        found
    }
}

/// Persistence address of one scene document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneKey {
    pub tenant_id: String,
    pub entity_type: String,
    pub entity_id: String,
}

impl SceneKey {
    pub fn new(
        tenant_id: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl std::fmt::Display for SceneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.entity_type, self.entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(val: &T) {
        let json = serde_json::to_string(val).expect("serialize");
        let back: T = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(*val, back);
    }

    // --- Geometry ---

    #[test]
    fn test_geometry_box_serde() {
        let g = GeometrySpec::Box { width: 914.0, height: 2032.0, depth: 44.0 };
        roundtrip(&g);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains(r#""type":"box""#));
    }

    #[test]
    fn test_geometry_kind_tags_match_serde() {
        let path = CurveDefinition::new(
            CurveShape::Polyline { points: vec![[0.0, 0.0], [100.0, 0.0]], closed: false },
            8,
        );
        let specs = vec![
            GeometrySpec::Cylinder { radius_top: 5.0, radius_bottom: 5.0, height: 10.0, radial_segments: 16 },
            GeometrySpec::Extrude { shape: vec![], holes: vec![], depth: 1.0 },
            GeometrySpec::ShapeExtrude { outline: vec![], holes: vec![], depth: 1.0 },
            GeometrySpec::Tube { path: path.clone(), radius: 2.0, radial_segments: 8, closed: false },
            GeometrySpec::Lathe { profile: vec![], segments: 12, phi_start: 0.0, phi_length: 1.0 },
            GeometrySpec::ProfileExtrude { profile: vec![], path, fallback: None },
            GeometrySpec::Gltf { asset_id: Some("handle-01".into()), blob: None, scale: 1.0 },
            GeometrySpec::Custom { vertices: vec![], indices: vec![] },
        ];
        for spec in specs {
            let json = serde_json::to_string(&spec).unwrap();
            assert!(json.contains(&format!(r#""type":"{}""#, spec.kind())), "{json}");
            roundtrip(&spec);
        }
    }

    #[test]
    fn test_geometry_camel_case_fields() {
        let json = r#"{"type":"cylinder","radiusTop":10,"radiusBottom":12,"height":40}"#;
        let g: GeometrySpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            g,
            GeometrySpec::Cylinder { radius_top: 10.0, radius_bottom: 12.0, height: 40.0, radial_segments: 32 }
        );
    }

    #[test]
    fn test_malformed_geometry_kept_verbatim() {
        let json = r#"{"type":"box","width":"wide"}"#;
        let g: Geometry = serde_json::from_str(json).unwrap();
        assert!(matches!(g, Geometry::Unparsed(_)));
        assert_eq!(serde_json::to_string(&g).unwrap(), r#"{"type":"box","width":"wide"}"#);

        let g: Geometry = serde_json::from_str(r#"{"type":"torus","r":3}"#).unwrap();
        assert!(g.spec().is_none());
    }

    #[test]
    fn test_well_formed_geometry_parses_as_spec() {
        let g: Geometry =
            serde_json::from_str(r#"{"type":"box","width":1,"height":2,"depth":3}"#).unwrap();
        assert!(matches!(g.spec(), Some(GeometrySpec::Box { .. })));
    }

    // --- Component tree ---

    #[test]
    fn test_component_defaults() {
        let node: ComponentNode = serde_json::from_str(r#"{"id":"leaf"}"#).unwrap();
        assert!(node.visible);
        assert_eq!(node.position, [0.0; 3]);
        assert!(node.children.is_empty());
        assert!(node.geometry.is_none());
    }

    #[test]
    fn test_component_tree_serde() {
        let door = ComponentNode::new("door", "Door")
            .with_children(vec![
                ComponentNode::new("stile-l", "Left stile")
                    .with_geometry(GeometrySpec::Box { width: 100.0, height: 2032.0, depth: 44.0 })
                    .with_material("oak"),
                ComponentNode::new("glass", "Glazing").tagged("glass"),
            ]);
        roundtrip(&door);
        let json = serde_json::to_string(&door).unwrap();
        assert!(json.contains(r#""materialId":"oak""#));
        assert!(json.contains(r#""tags":["glass"]"#));
        assert_eq!(count_nodes(std::slice::from_ref(&door)), 3);
    }

    // --- Materials ---

    #[test]
    fn test_material_kind_serde() {
        assert_eq!(serde_json::to_string(&MaterialKind::Painted).unwrap(), r#""painted""#);
        assert_eq!(MaterialKind::from_name("Timber"), MaterialKind::Wood);
        assert_eq!(MaterialKind::from_name("unobtainium"), MaterialKind::Default);
    }

    // --- Camera ---

    #[test]
    fn test_camera_state_serde() {
        let mut cam = CameraState::default();
        cam.parked_pose = Some(CameraPose::default_for(CameraMode::Ortho));
        roundtrip(&cam);
        let json = serde_json::to_string(&cam).unwrap();
        assert!(json.contains(r#""mode":"perspective""#));
        assert!(json.contains(r#""parkedPose""#));
    }

    #[test]
    fn test_camera_pose_accessors() {
        let mut cam = CameraState::default();
        let mut pose = cam.pose();
        pose.zoom = 2.5;
        cam.set_pose(pose);
        assert_eq!(cam.zoom, 2.5);
    }

    // --- Scene root ---

    #[test]
    fn test_scene_config_json_field_names() {
        let json = serde_json::to_string(&SceneConfig::default()).unwrap();
        for field in [
            "version", "components", "materials", "camera", "lighting", "visibility", "ui",
            "dimensions", "customData", "updatedAt",
        ] {
            assert!(json.contains(&format!(r#""{field}":"#)), "missing {field}");
        }
        assert!(json.contains(r#""boundsX":[-500.0,500.0]"#));
    }

    #[test]
    fn test_scene_config_roundtrip() {
        let mut scene = SceneConfig::default();
        scene.components.push(
            ComponentNode::new("frame", "Frame")
                .with_geometry(GeometrySpec::Box { width: 1.0, height: 1.0, depth: 1.0 }),
        );
        scene.materials.push(MaterialDefinition::fallback("paint"));
        scene.visibility.insert("frame".into(), false);
        roundtrip(&scene);
        assert!(scene.find_component("frame").is_some());
        assert!(scene.material("paint").is_some());
    }

    #[test]
    fn test_scene_key_display() {
        let key = SceneKey::new("acme", "quote-line", "42");
        assert_eq!(key.to_string(), "acme/quote-line/42");
        roundtrip(&key);
    }
}
