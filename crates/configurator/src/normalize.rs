//! Scene config sanitizer.
//!
//! Turns any JSON value into a fully valid `SceneConfig`. Nothing here returns
//! an error: each field that is missing or unusable gets a deterministic
//! default, and the correction is logged at debug level and recorded in a
//! `NormalizeReport`. Feeding the output back in yields the same config.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};
use shared::{
    CameraMode, CameraPose, CameraState, ComponentNode, Geometry, GeometrySpec, LightingConfig,
    MaterialDefinition, MaterialKind, ProductDimensions, SceneConfig, UiToggles, VisibilityMap,
    DEFAULT_BASE_COLOR, DEFAULT_FOV, EPOCH_TIMESTAMP, MAX_LIGHT_INTENSITY,
    MIN_SHADOW_CATCHER_DIAMETER, SCENE_VERSION, ZOOM_SENTINEL,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::camera::{MAX_ZOOM, MIN_ZOOM};
use crate::visibility::apply_visibility_map;

/// Deepest component nesting kept; deeper subtrees are dropped.
///
/// Each tree level costs two levels of JSON nesting, so a tree at this depth
/// plus its geometry stays well under serde_json's parse limit of 128.
pub const MAX_DEPTH: usize = 32;
/// Deepest free-form JSON kept in unparsed geometry and `customData`
pub const MAX_VALUE_NESTING: usize = 16;
pub const MIN_FOV: f64 = 10.0;
pub const MAX_FOV: f64 = 120.0;

/// One silent fix applied during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// JSON path of the corrected field, e.g. `components[0].children[2].id`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Diagnostics collected by `normalize_with_report`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub corrections: Vec<Correction>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Whether any correction touched `path` or something below it
    pub fn touches(&self, path: &str) -> bool {
        self.corrections.iter().any(|c| c.path.starts_with(path))
    }
}

/// Sanitize an arbitrary JSON document
pub fn normalize(input: &Value) -> SceneConfig {
    normalize_with_report(input).0
}

pub fn normalize_with_report(input: &Value) -> (SceneConfig, NormalizeReport) {
    let mut normalizer = Normalizer::default();
    let config = normalizer.scene(input);
    (config, normalizer.report)
}

/// Re-normalize an already typed config (non-finite floats become defaults)
pub fn normalize_config(config: &SceneConfig) -> SceneConfig {
    match serde_json::to_value(config) {
        Ok(value) => normalize(&value),
        Err(e) => {
            tracing::debug!(error = %e, "config not representable as JSON, using defaults");
            SceneConfig::default()
        }
    }
}

// ============================================================================
// Field helpers
// ============================================================================

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn vec3(value: Option<&Value>) -> Option<[f64; 3]> {
    let items = value?.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = finite(Some(item))?;
    }
    Some(out)
}

fn points2(value: &Value) -> Option<[f64; 2]> {
    let items = value.as_array()?;
    match items.as_slice() {
        [a, b] => Some([finite(Some(a))?, finite(Some(b))?]),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `#rrggbb` in lowercase; `#rgb` is expanded
fn hex_color(raw: &str) -> Option<String> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        3 => Some(format!(
            "#{}",
            hex.chars().flat_map(|c| [c, c]).collect::<String>().to_ascii_lowercase()
        )),
        _ => None,
    }
}

/// Levels of array/object nesting; scalars are 0
fn nesting(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(nesting).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(nesting).max().unwrap_or(0),
        _ => 0,
    }
}

// ============================================================================
// Normalizer
// ============================================================================

#[derive(Default)]
struct Normalizer {
    report: NormalizeReport,
    seen_ids: HashSet<String>,
}

impl Normalizer {
    fn correct(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let correction = Correction { path: path.into(), message: message.into() };
        tracing::debug!(path = %correction.path, "normalized: {}", correction.message);
        self.report.corrections.push(correction);
    }

    /// Present but unusable values are corrected; absent ones take the default silently
    fn number_or(&mut self, obj: &Map<String, Value>, key: &str, path: &str, default: f64) -> f64 {
        match obj.get(key) {
            None => default,
            Some(v) => match finite(Some(v)) {
                Some(n) => n,
                None => {
                    self.correct(format!("{path}.{key}"), "not a finite number");
                    default
                }
            },
        }
    }

    fn bool_or(&mut self, obj: &Map<String, Value>, key: &str, path: &str, default: bool) -> bool {
        match obj.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                self.correct(format!("{path}.{key}"), "not a boolean");
                default
            }
        }
    }

    fn vec3_or(&mut self, obj: &Map<String, Value>, key: &str, path: &str, default: [f64; 3]) -> [f64; 3] {
        match obj.get(key) {
            None => default,
            Some(v) => vec3(Some(v)).unwrap_or_else(|| {
                self.correct(format!("{path}.{key}"), "not a finite 3-vector");
                default
            }),
        }
    }

    fn clamped(&mut self, value: f64, min: f64, max: f64, path: String) -> f64 {
        let clamped = value.clamp(min, max);
        if clamped != value {
            self.correct(path, format!("{value} clamped to [{min}, {max}]"));
        }
        clamped
    }

    fn object<'a>(&mut self, root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
        match root.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::Object(obj)) => Some(obj),
            Some(_) => {
                self.correct(key, "not an object");
                None
            }
        }
    }

    fn array<'a>(&mut self, obj: &'a Map<String, Value>, key: &str, path: &str) -> &'a [Value] {
        match obj.get(key) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.correct(format!("{path}.{key}"), "not an array");
                &[]
            }
        }
    }

    // ── Root ──

    fn scene(&mut self, input: &Value) -> SceneConfig {
        let Some(root) = input.as_object() else {
            self.correct("$", "root is not an object, using defaults");
            return SceneConfig::default();
        };

        match root.get("version") {
            None => {}
            Some(v) if v.as_u64() == Some(SCENE_VERSION as u64) => {}
            Some(v) => self.correct("version", format!("{v} replaced by {SCENE_VERSION}")),
        }

        let raw_components = self.array(root, "components", "$");
        let components = raw_components
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| self.component(raw, &[i], 0))
            .collect::<Vec<_>>();
        let materials = self.materials(root);
        let camera = self.camera(root);
        let lighting = self.lighting(root);
        let visibility = self.visibility(root);
        let ui = self.ui(root);
        let dimensions = self.dimensions(root);

        let custom_data = match root.get("customData") {
            None | Some(Value::Null) => Map::new(),
            Some(value @ Value::Object(map)) if nesting(value) <= MAX_VALUE_NESTING => map.clone(),
            Some(Value::Object(_)) => {
                self.correct("customData", "nested too deeply");
                Map::new()
            }
            Some(_) => {
                self.correct("customData", "not an object");
                Map::new()
            }
        };

        let updated_at = match root.get("updatedAt").and_then(Value::as_str) {
            Some(s) if OffsetDateTime::parse(s, &Rfc3339).is_ok() => s.to_string(),
            None if root.get("updatedAt").is_none() => EPOCH_TIMESTAMP.to_string(),
            _ => {
                self.correct("updatedAt", "not an RFC 3339 timestamp");
                EPOCH_TIMESTAMP.to_string()
            }
        };

        SceneConfig {
            version: SCENE_VERSION,
            components: apply_visibility_map(&components, &visibility),
            materials,
            camera,
            lighting,
            visibility,
            ui,
            dimensions,
            custom_data,
            updated_at,
        }
    }

    // ── Components ──

    fn unique_id(&mut self, requested: Option<String>, trail: &[usize], path: &str) -> String {
        let base = match requested {
            Some(id) => id,
            None => {
                let generated = format!(
                    "node-{}",
                    trail.iter().map(ToString::to_string).collect::<Vec<_>>().join("-")
                );
                self.correct(format!("{path}.id"), format!("missing, assigned '{generated}'"));
                generated
            }
        };
        if self.seen_ids.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        let id = loop {
            let candidate = format!("{base}-dup{n}");
            if !self.seen_ids.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        self.correct(format!("{path}.id"), format!("duplicate '{base}' renamed to '{id}'"));
        self.seen_ids.insert(id.clone());
        id
    }

    fn component(&mut self, raw: &Value, trail: &[usize], depth: usize) -> Option<ComponentNode> {
        let path = component_path(trail);
        let Some(obj) = raw.as_object() else {
            self.correct(path, "component is not an object, dropped");
            return None;
        };
        if depth >= MAX_DEPTH {
            self.correct(path, format!("nesting deeper than {MAX_DEPTH}, subtree dropped"));
            return None;
        }

        let id = self.unique_id(non_empty_str(obj.get("id")), trail, &path);
        let name = obj.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let kind = obj.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
        let visible = self.bool_or(obj, "visible", &path, true);
        let position = self.vec3_or(obj, "position", &path, [0.0; 3]);
        let rotation = self.vec3_or(obj, "rotation", &path, [0.0; 3]);
        let geometry = self.geometry(obj.get("geometry"), &path);
        let material_id = non_empty_str(obj.get("materialId"));

        let mut tags = BTreeSet::new();
        for tag in self.array(obj, "tags", &path) {
            match tag.as_str().map(str::trim) {
                Some(t) if !t.is_empty() => {
                    tags.insert(t.to_string());
                }
                _ => self.correct(format!("{path}.tags"), "dropped non-string tag"),
            }
        }

        let raw_children = self.array(obj, "children", &path);
        let mut children = Vec::with_capacity(raw_children.len());
        for (i, child) in raw_children.iter().enumerate() {
            let mut child_trail = trail.to_vec();
            child_trail.push(i);
            if let Some(node) = self.component(child, &child_trail, depth + 1) {
                children.push(node);
            }
        }

        Some(ComponentNode {
            id,
            name,
            kind,
            visible,
            position,
            rotation,
            geometry,
            material_id,
            tags,
            children,
        })
    }

    fn geometry(&mut self, raw: Option<&Value>, path: &str) -> Option<Geometry> {
        match raw? {
            Value::Null => None,
            value @ Value::Object(_) => match serde_json::from_value::<GeometrySpec>(value.clone()) {
                Ok(spec) => Some(Geometry::Spec(spec)),
                Err(_) if nesting(value) > MAX_VALUE_NESTING => {
                    self.correct(format!("{path}.geometry"), "unparsed geometry nested too deeply, dropped");
                    None
                }
                // Kept verbatim so a later save loses nothing; not counted as a correction
                Err(e) => {
                    tracing::debug!(path, error = %e, "geometry kept unparsed");
                    Some(Geometry::Unparsed(value.clone()))
                }
            },
            _ => {
                self.correct(format!("{path}.geometry"), "not an object, dropped");
                None
            }
        }
    }

    // ── Materials ──

    fn materials(&mut self, root: &Map<String, Value>) -> Vec<MaterialDefinition> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (i, raw) in self.array(root, "materials", "$").iter().enumerate() {
            let path = format!("materials[{i}]");
            let Some(obj) = raw.as_object() else {
                self.correct(path, "material is not an object, dropped");
                continue;
            };
            let id = non_empty_str(obj.get("id")).unwrap_or_else(|| {
                self.correct(format!("{path}.id"), "missing");
                format!("material-{i}")
            });
            if !seen.insert(id.clone()) {
                self.correct(path, format!("duplicate material '{id}' dropped"));
                continue;
            }
            out.push(self.material(obj, id, &path));
        }
        out
    }

    fn material(&mut self, obj: &Map<String, Value>, id: String, path: &str) -> MaterialDefinition {
        let fallback = MaterialDefinition::fallback(id);
        let kind = match obj.get("type") {
            None => MaterialKind::Default,
            Some(Value::String(s)) => {
                let kind = MaterialKind::from_name(s);
                if kind == MaterialKind::Default && !s.eq_ignore_ascii_case("default") {
                    self.correct(format!("{path}.type"), format!("unknown type '{s}'"));
                }
                kind
            }
            Some(_) => {
                self.correct(format!("{path}.type"), "not a string");
                MaterialKind::Default
            }
        };
        let base_color = match obj.get("baseColor").and_then(Value::as_str).and_then(hex_color) {
            Some(color) => color,
            None => {
                if obj.contains_key("baseColor") {
                    self.correct(format!("{path}.baseColor"), "invalid colour");
                }
                DEFAULT_BASE_COLOR.to_string()
            }
        };
        let roughness = self.number_or(obj, "roughness", path, fallback.roughness);
        let metalness = self.number_or(obj, "metalness", path, fallback.metalness);
        let opacity = self.number_or(obj, "opacity", path, fallback.opacity);
        let maps = obj
            .get("maps")
            .and_then(Value::as_array)
            .map(|maps| maps.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        MaterialDefinition {
            kind,
            base_color,
            roughness: self.clamped(roughness, 0.0, 1.0, format!("{path}.roughness")),
            metalness: self.clamped(metalness, 0.0, 1.0, format!("{path}.metalness")),
            opacity: self.clamped(opacity, 0.0, 1.0, format!("{path}.opacity")),
            maps,
            ..fallback
        }
    }

    // ── Camera ──

    fn camera(&mut self, root: &Map<String, Value>) -> CameraState {
        let Some(obj) = self.object(root, "camera") else {
            return CameraState::default();
        };
        let mode = match obj.get("mode").and_then(Value::as_str) {
            Some("perspective") => CameraMode::Perspective,
            Some("ortho") | Some("orthographic") => CameraMode::Ortho,
            other => {
                if obj.contains_key("mode") {
                    self.correct("camera.mode", format!("unknown mode {other:?}"));
                }
                CameraMode::Perspective
            }
        };
        let pose = self.pose(obj, mode, "camera");
        let other = match mode {
            CameraMode::Perspective => CameraMode::Ortho,
            CameraMode::Ortho => CameraMode::Perspective,
        };
        let parked_pose = match obj.get("parkedPose") {
            None | Some(Value::Null) => None,
            Some(Value::Object(parked)) => Some(self.pose(parked, other, "camera.parkedPose")),
            Some(_) => {
                self.correct("camera.parkedPose", "not an object");
                None
            }
        };
        CameraState { parked_pose, ..CameraState::from_pose(mode, pose) }
    }

    fn pose(&mut self, obj: &Map<String, Value>, mode: CameraMode, path: &str) -> CameraPose {
        let defaults = CameraPose::default_for(mode);
        let zoom = match finite(obj.get("zoom")) {
            Some(z) if z > 0.0 => self.clamped(z, MIN_ZOOM, MAX_ZOOM, format!("{path}.zoom")),
            _ => {
                if obj.contains_key("zoom") {
                    self.correct(format!("{path}.zoom"), "not a positive number");
                }
                ZOOM_SENTINEL
            }
        };
        let fov = self.number_or(obj, "fov", path, DEFAULT_FOV);
        CameraPose {
            position: self.vec3_or(obj, "position", path, defaults.position),
            rotation: self.vec3_or(obj, "rotation", path, defaults.rotation),
            target: self.vec3_or(obj, "target", path, defaults.target),
            zoom,
            fov: self.clamped(fov, MIN_FOV, MAX_FOV, format!("{path}.fov")),
        }
    }

    // ── Lighting ──

    fn bounds(&mut self, obj: &Map<String, Value>, key: &str, default: [f64; 2]) -> [f64; 2] {
        let path = format!("lighting.{key}");
        match obj.get(key) {
            None => default,
            Some(value) => {
                if let Some(n) = finite(Some(value)) {
                    self.correct(path, format!("legacy scalar {n} expanded"));
                    return [-n.abs(), n.abs()];
                }
                match points2(value) {
                    Some([a, b]) if a > b => {
                        self.correct(path, "reversed bounds reordered");
                        [b, a]
                    }
                    Some(bounds) => bounds,
                    None => {
                        self.correct(path, "not a [min, max] pair");
                        default
                    }
                }
            }
        }
    }

    fn lighting(&mut self, root: &Map<String, Value>) -> LightingConfig {
        let defaults = LightingConfig::default();
        let Some(obj) = self.object(root, "lighting") else {
            return defaults;
        };
        let intensity = self.number_or(obj, "intensity", "lighting", defaults.intensity);
        let ambient = self.number_or(obj, "ambientIntensity", "lighting", defaults.ambient_intensity);
        let catcher = self.number_or(obj, "shadowCatcherDiameter", "lighting", defaults.shadow_catcher_diameter);
        LightingConfig {
            bounds_x: self.bounds(obj, "boundsX", defaults.bounds_x),
            bounds_z: self.bounds(obj, "boundsZ", defaults.bounds_z),
            intensity: self.clamped(intensity, 0.0, MAX_LIGHT_INTENSITY, "lighting.intensity".into()),
            ambient_intensity: self.clamped(ambient, 0.0, MAX_LIGHT_INTENSITY, "lighting.ambientIntensity".into()),
            shadow_catcher_diameter: self.clamped(
                catcher,
                MIN_SHADOW_CATCHER_DIAMETER,
                f64::MAX,
                "lighting.shadowCatcherDiameter".into(),
            ),
            cast_shadows: self.bool_or(obj, "castShadows", "lighting", defaults.cast_shadows),
        }
    }

    // ── Visibility, UI, dimensions ──

    fn visibility(&mut self, root: &Map<String, Value>) -> VisibilityMap {
        let mut map = VisibilityMap::new();
        let Some(obj) = self.object(root, "visibility") else {
            return map;
        };
        for (id, value) in obj {
            match value {
                Value::Bool(b) => {
                    map.insert(id.clone(), *b);
                }
                _ => self.correct(format!("visibility.{id}"), "not a boolean, dropped"),
            }
        }
        map
    }

    fn ui(&mut self, root: &Map<String, Value>) -> UiToggles {
        let defaults = UiToggles::default();
        let Some(obj) = self.object(root, "ui") else {
            return defaults;
        };
        UiToggles {
            show_grid: self.bool_or(obj, "showGrid", "ui", defaults.show_grid),
            show_axes: self.bool_or(obj, "showAxes", "ui", defaults.show_axes),
            show_dimensions: self.bool_or(obj, "showDimensions", "ui", defaults.show_dimensions),
            show_component_list: self.bool_or(obj, "showComponentList", "ui", defaults.show_component_list),
        }
    }

    fn dimensions(&mut self, root: &Map<String, Value>) -> ProductDimensions {
        let Some(obj) = self.object(root, "dimensions") else {
            return ProductDimensions::default();
        };
        let mut size = |key: &str| {
            let v = self.number_or(obj, key, "dimensions", 0.0);
            if v < 0.0 {
                self.correct(format!("dimensions.{key}"), "negative size");
                0.0
            } else {
                v
            }
        };
        ProductDimensions { width: size("width"), height: size("height"), depth: size("depth") }
    }
}

fn component_path(trail: &[usize]) -> String {
    let mut path = String::from("components");
    for (depth, i) in trail.iter().enumerate() {
        if depth > 0 {
            path.push_str(".children");
        }
        path.push_str(&format!("[{i}]"));
    }
    path
}
