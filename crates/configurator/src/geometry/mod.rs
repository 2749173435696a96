//! Geometry dispatch: one arm per geometry kind, producing render-ready descriptors.
//!
//! A node whose parameters cannot be built yields `None`; the failure is
//! logged at debug level and never affects other nodes.

mod extrude;
mod lathe;
pub mod mesh;
mod sweep;
mod triangulate;

use glam::DVec2;
use serde::Serialize;
use shared::{BoxDims, ComponentNode, CurveDefinition, Geometry, GeometrySpec};

use crate::curve::{chain_boundary, to_sweep_path};

pub use extrude::extrude_polygon;
pub use lathe::lathe_mesh;
pub use mesh::{box_mesh, custom_mesh, cylinder_mesh, MeshData};
pub use sweep::{profile_sweep_mesh, rail_frames, tube_mesh, Frame, SweepError};
pub use triangulate::{triangulate, Triangulation};

/// Opaque model reference resolved by the external asset cache
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GeometryDescriptor {
    Mesh(MeshData),
    Asset(AssetReference),
}

impl GeometryDescriptor {
    pub fn mesh(&self) -> Option<&MeshData> {
        match self {
            GeometryDescriptor::Mesh(mesh) => Some(mesh),
            GeometryDescriptor::Asset(_) => None,
        }
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn to_points(raw: &[[f64; 2]]) -> Vec<DVec2> {
    raw.iter().map(|p| DVec2::new(p[0], p[1])).collect()
}

/// Build the descriptor for a node's geometry
pub fn dispatch_geometry(node: &ComponentNode) -> Option<GeometryDescriptor> {
    let spec = match node.geometry.as_ref()? {
        Geometry::Spec(spec) => spec,
        Geometry::Unparsed(raw) => {
            tracing::debug!(node = %node.id, ?raw, "unrecognized geometry, node renders nothing");
            return None;
        }
    };
    let descriptor = build_geometry(spec);
    if descriptor.is_none() {
        tracing::debug!(node = %node.id, kind = spec.kind(), "geometry parameters unusable, node skipped");
    }
    descriptor
}

/// Build a descriptor from geometry parameters alone
pub fn build_geometry(spec: &GeometrySpec) -> Option<GeometryDescriptor> {
    let mesh = match spec {
        GeometrySpec::Box { width, height, depth } => build_box(&BoxDims {
            width: *width,
            height: *height,
            depth: *depth,
        }),
        GeometrySpec::Cylinder { radius_top, radius_bottom, height, radial_segments } => {
            let radii_ok = [*radius_top, *radius_bottom].iter().all(|r| r.is_finite() && *r >= 0.0);
            if !radii_ok || !positive(*height) || radius_top.max(*radius_bottom) <= 0.0 {
                return None;
            }
            Some(cylinder_mesh(*radius_top, *radius_bottom, *height, (*radial_segments).clamp(3, 256)))
        }
        GeometrySpec::Extrude { shape, holes, depth } => {
            let holes: Vec<Vec<DVec2>> = holes.iter().map(|h| to_points(h)).collect();
            extrude_polygon(&to_points(shape), &holes, *depth)
        }
        GeometrySpec::ShapeExtrude { outline, holes, depth } => build_shape_extrude(outline, holes, *depth),
        GeometrySpec::Tube { path, radius, radial_segments, closed } => {
            let rail = to_sweep_path(path)?;
            tube_mesh(&rail, *radius, *radial_segments, *closed)
                .map_err(|e| tracing::debug!(error = %e, "tube sweep failed"))
                .ok()
        }
        GeometrySpec::Lathe { profile, segments, phi_start, phi_length } => {
            lathe_mesh(profile, *segments, *phi_start, *phi_length)
        }
        GeometrySpec::ProfileExtrude { profile, path, fallback } => {
            build_profile_extrude(profile, path).or_else(|| fallback.as_ref().and_then(build_box))
        }
        GeometrySpec::Gltf { asset_id, blob, scale } => {
            let has_ref = |r: &Option<String>| r.as_deref().is_some_and(|s| !s.is_empty());
            if !has_ref(asset_id) && !has_ref(blob) {
                return None;
            }
            return Some(GeometryDescriptor::Asset(AssetReference {
                asset_id: asset_id.clone(),
                blob: blob.clone(),
                scale: if positive(*scale) { *scale } else { 1.0 },
            }));
        }
        GeometrySpec::Custom { vertices, indices } => custom_mesh(vertices, indices),
    }?;

    mesh.is_finite().then_some(GeometryDescriptor::Mesh(mesh))
}

fn build_box(dims: &BoxDims) -> Option<MeshData> {
    if !positive(dims.width) || !positive(dims.height) || !positive(dims.depth) {
        return None;
    }
    Some(box_mesh(dims.width, dims.height, dims.depth))
}

fn build_shape_extrude(outline: &[CurveDefinition], holes: &[Vec<CurveDefinition>], depth: f64) -> Option<MeshData> {
    let outer = chain_boundary(outline)?;
    let holes: Vec<Vec<DVec2>> = holes
        .iter()
        .filter_map(|hole| {
            let ring = chain_boundary(hole);
            if ring.is_none() {
                tracing::debug!("dropping unusable hole boundary");
            }
            ring
        })
        .collect();
    extrude_polygon(&outer, &holes, depth)
}

fn build_profile_extrude(profile: &[[f64; 2]], path: &CurveDefinition) -> Option<MeshData> {
    let rail = to_sweep_path(path)?;
    profile_sweep_mesh(&to_points(profile), &rail)
        .map_err(|e| tracing::debug!(error = %e, "profile sweep failed"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MeshValidator;
    use shared::CurveShape;

    fn node(spec: GeometrySpec) -> ComponentNode {
        ComponentNode::new("part", "Part").with_geometry(spec)
    }

    fn line_path(len: f64) -> CurveDefinition {
        CurveDefinition::new(
            CurveShape::Polyline { points: vec![[0.0, 0.0], [len, 0.0]], closed: false },
            8,
        )
    }

    fn assert_valid_mesh(desc: &GeometryDescriptor) {
        let mesh = desc.mesh().expect("mesh descriptor");
        let v = MeshValidator::new(mesh);
        assert!(v.validate_all().is_empty(), "{:?}", v.validate_all());
    }

    #[test]
    fn test_box_dispatch() {
        let desc = dispatch_geometry(&node(GeometrySpec::Box { width: 914.0, height: 2032.0, depth: 44.0 })).unwrap();
        assert_valid_mesh(&desc);
        assert!(dispatch_geometry(&node(GeometrySpec::Box { width: 0.0, height: 1.0, depth: 1.0 })).is_none());
    }

    #[test]
    fn test_cylinder_dispatch() {
        let spec = GeometrySpec::Cylinder { radius_top: 10.0, radius_bottom: 12.0, height: 40.0, radial_segments: 1 };
        let desc = dispatch_geometry(&node(spec)).unwrap();
        assert_valid_mesh(&desc);
        let spec = GeometrySpec::Cylinder { radius_top: 0.0, radius_bottom: 0.0, height: 40.0, radial_segments: 8 };
        assert!(dispatch_geometry(&node(spec)).is_none());
    }

    #[test]
    fn test_shape_extrude_arched_panel() {
        let arch = CurveDefinition::new(
            CurveShape::SegmentalArch { span: 900.0, rise: 200.0, origin: [0.0, 2000.0] },
            32,
        );
        let body = CurveDefinition::new(
            CurveShape::Polyline {
                points: vec![[450.0, 2000.0], [450.0, 0.0], [-450.0, 0.0], [-450.0, 2000.0]],
                closed: false,
            },
            8,
        );
        let pane = CurveDefinition::new(
            CurveShape::Polyline {
                points: vec![[-300.0, 300.0], [300.0, 300.0], [300.0, 1700.0], [-300.0, 1700.0]],
                closed: true,
            },
            8,
        );
        let spec = GeometrySpec::ShapeExtrude { outline: vec![arch, body], holes: vec![vec![pane]], depth: 44.0 };
        let desc = dispatch_geometry(&node(spec)).unwrap();
        assert_valid_mesh(&desc);
        let v = MeshValidator::new(desc.mesh().unwrap());
        assert!(v.assert_dimensions_approx([900.0, 2200.0, 44.0], 1e-2));
    }

    #[test]
    fn test_tube_dispatch() {
        let path = CurveDefinition::new(
            CurveShape::Arc { center: [0.0, 0.0], radius: 100.0, start_angle: 0.0, end_angle: std::f64::consts::PI },
            16,
        );
        let desc = dispatch_geometry(&node(GeometrySpec::Tube { path, radius: 8.0, radial_segments: 12, closed: false }))
            .unwrap();
        assert_valid_mesh(&desc);
    }

    #[test]
    fn test_profile_extrude_falls_back_to_box() {
        let degenerate = GeometrySpec::ProfileExtrude {
            profile: vec![[0.0, 0.0], [1.0, 0.0]],
            path: line_path(500.0),
            fallback: Some(BoxDims { width: 500.0, height: 40.0, depth: 20.0 }),
        };
        let desc = dispatch_geometry(&node(degenerate)).unwrap();
        let v = MeshValidator::new(desc.mesh().unwrap());
        assert!(v.assert_dimensions_approx([500.0, 40.0, 20.0], 1e-3));

        let no_fallback = GeometrySpec::ProfileExtrude {
            profile: vec![[0.0, 0.0], [1.0, 0.0]],
            path: line_path(500.0),
            fallback: None,
        };
        assert!(dispatch_geometry(&node(no_fallback)).is_none());
    }

    #[test]
    fn test_profile_extrude_along_path() {
        let spec = GeometrySpec::ProfileExtrude {
            profile: vec![[0.0, 0.0], [20.0, 0.0], [20.0, 15.0], [0.0, 15.0]],
            path: line_path(800.0),
            fallback: None,
        };
        assert_valid_mesh(&dispatch_geometry(&node(spec)).unwrap());
    }

    #[test]
    fn test_gltf_is_asset_reference() {
        let spec = GeometrySpec::Gltf { asset_id: Some("handle-lever".into()), blob: None, scale: -2.0 };
        let desc = dispatch_geometry(&node(spec)).unwrap();
        assert_eq!(
            desc,
            GeometryDescriptor::Asset(AssetReference {
                asset_id: Some("handle-lever".into()),
                blob: None,
                scale: 1.0,
            })
        );
        let empty = GeometrySpec::Gltf { asset_id: Some(String::new()), blob: None, scale: 1.0 };
        assert!(dispatch_geometry(&node(empty)).is_none());
    }

    #[test]
    fn test_lathe_and_custom_dispatch() {
        let lathe = GeometrySpec::Lathe {
            profile: vec![[0.0, 0.0], [15.0, 0.0], [15.0, 30.0], [0.0, 40.0]],
            segments: 24,
            phi_start: 0.0,
            phi_length: std::f64::consts::TAU,
        };
        assert_valid_mesh(&dispatch_geometry(&node(lathe)).unwrap());

        let custom = GeometrySpec::Custom {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
        };
        assert_valid_mesh(&dispatch_geometry(&node(custom)).unwrap());
    }

    #[test]
    fn test_missing_and_unparsed_geometry() {
        assert!(dispatch_geometry(&ComponentNode::new("group", "Group")).is_none());
        let mut n = ComponentNode::new("odd", "Odd");
        n.geometry = Some(Geometry::Unparsed(serde_json::json!({"type": "torus"})));
        assert!(dispatch_geometry(&n).is_none());
    }
}
