use glam::{DVec2, DVec3};

use super::mesh::MeshData;
use super::triangulate::triangulate;

// ── Extrude ─────────────────────────────────────────────────

/// Extrude a polygon with holes from z = 0 to z = `depth`.
///
/// Caps are ear-clipped; every ring gets flat-shaded side walls facing away
/// from the material.
pub fn extrude_polygon(outer: &[DVec2], holes: &[Vec<DVec2>], depth: f64) -> Option<MeshData> {
    if !(depth.is_finite() && depth > 0.0) {
        return None;
    }
    if !outer.iter().chain(holes.iter().flatten()).all(|p| p.is_finite()) {
        return None;
    }
    let tri = triangulate(outer, holes)?;
    let mut mesh = MeshData::default();

    // Bottom cap (faces -Z)
    let base = mesh.next_index();
    for p in &tri.points {
        mesh.push_vertex(p.extend(0.0), DVec3::NEG_Z);
    }
    for [a, b, c] in &tri.triangles {
        mesh.push_triangle(base + a, base + c, base + b);
    }

    // Top cap (faces +Z)
    let base = mesh.next_index();
    for p in &tri.points {
        mesh.push_vertex(p.extend(depth), DVec3::Z);
    }
    for [a, b, c] in &tri.triangles {
        mesh.push_triangle(base + a, base + b, base + c);
    }

    // Side walls: outer ring is CCW and holes CW, so the right-hand normal
    // always points out of the solid
    for &(start, len) in &tri.rings {
        let ring = &tri.points[start..start + len];
        for i in 0..len {
            let b0 = ring[i];
            let b1 = ring[(i + 1) % len];
            let edge = b1 - b0;
            let normal = DVec3::new(edge.y, -edge.x, 0.0).normalize_or_zero();
            mesh.push_quad(
                [b0.extend(0.0), b1.extend(0.0), b1.extend(depth), b0.extend(depth)],
                normal,
            );
        }
    }

    mesh.is_finite().then_some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MeshValidator;

    fn rect(w: f64, h: f64) -> Vec<DVec2> {
        vec![DVec2::ZERO, DVec2::new(w, 0.0), DVec2::new(w, h), DVec2::new(0.0, h)]
    }

    #[test]
    fn test_extrude_rectangle() {
        let mesh = extrude_polygon(&rect(100.0, 50.0), &[], 20.0).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty(), "{:?}", v.validate_all());
        // 2 cap triangles each side + 4 walls
        assert_eq!(v.triangle_count(), 2 + 2 + 8);
        assert!(v.assert_dimensions_approx([100.0, 50.0, 20.0], 1e-3));
        assert!(v.windings_match_normals());
        assert!((v.signed_volume() - 100_000.0).abs() < 1e-2);
    }

    #[test]
    fn test_extrude_with_hole() {
        let hole: Vec<DVec2> = rect(20.0, 20.0).iter().map(|p| *p + DVec2::new(40.0, 15.0)).collect();
        let mesh = extrude_polygon(&rect(100.0, 50.0), &[hole], 20.0).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty());
        // 4 outer walls + 4 hole walls, 2 triangles each
        let wall_tris = 16;
        assert!(v.triangle_count() > wall_tris);
        assert!(v.windings_match_normals());
        assert!((v.signed_volume() - (5000.0 - 400.0) * 20.0).abs() < 1e-2);
    }

    #[test]
    fn test_extrude_rejects_bad_depth() {
        assert!(extrude_polygon(&rect(1.0, 1.0), &[], 0.0).is_none());
        assert!(extrude_polygon(&rect(1.0, 1.0), &[], f64::NAN).is_none());
        assert!(extrude_polygon(&[DVec2::ZERO, DVec2::X], &[], 1.0).is_none());
    }
}
