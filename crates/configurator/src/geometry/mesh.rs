use glam::{DVec3, Vec3};
use serde::Serialize;

/// Floats per vertex: position(3) + normal(3)
pub const STRIDE: usize = 6;

/// CPU-side mesh data: interleaved [pos.x, pos.y, pos.z, norm.x, norm.y, norm.z]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Index the next pushed vertex will get
    pub fn next_index(&self) -> u32 {
        self.vertex_count() as u32
    }

    pub fn push_vertex(&mut self, pos: DVec3, normal: DVec3) -> u32 {
        let index = self.next_index();
        let pos = pos.as_vec3();
        let normal = normal.as_vec3();
        self.vertices
            .extend_from_slice(&[pos.x, pos.y, pos.z, normal.x, normal.y, normal.z]);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Flat-shaded quad a-b-c-d (counterclockwise seen from the front)
    pub fn push_quad(&mut self, corners: [DVec3; 4], normal: DVec3) {
        let base = self.next_index();
        for corner in corners {
            self.push_vertex(corner, normal);
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * STRIDE;
        Vec3::new(self.vertices[base], self.vertices[base + 1], self.vertices[base + 2])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let base = index * STRIDE + 3;
        Vec3::new(self.vertices[base], self.vertices[base + 1], self.vertices[base + 2])
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let count = self.vertex_count();
        if count == 0 {
            return None;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..count {
            let p = self.position(i);
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }

    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }
}

// ── Primitives (centred on the origin, Y up) ──

pub fn box_mesh(width: f64, height: f64, depth: f64) -> MeshData {
    let hw = width * 0.5;
    let hh = height * 0.5;
    let hd = depth * 0.5;
    let v = DVec3::new;

    let faces: [([DVec3; 4], DVec3); 6] = [
        // Front (+Z)
        ([v(-hw, -hh, hd), v(hw, -hh, hd), v(hw, hh, hd), v(-hw, hh, hd)], DVec3::Z),
        // Back (-Z)
        ([v(hw, -hh, -hd), v(-hw, -hh, -hd), v(-hw, hh, -hd), v(hw, hh, -hd)], DVec3::NEG_Z),
        // Right (+X)
        ([v(hw, -hh, hd), v(hw, -hh, -hd), v(hw, hh, -hd), v(hw, hh, hd)], DVec3::X),
        // Left (-X)
        ([v(-hw, -hh, -hd), v(-hw, -hh, hd), v(-hw, hh, hd), v(-hw, hh, -hd)], DVec3::NEG_X),
        // Top (+Y)
        ([v(-hw, hh, hd), v(hw, hh, hd), v(hw, hh, -hd), v(-hw, hh, -hd)], DVec3::Y),
        // Bottom (-Y)
        ([v(-hw, -hh, -hd), v(hw, -hh, -hd), v(hw, -hh, hd), v(-hw, -hh, hd)], DVec3::NEG_Y),
    ];

    let mut mesh = MeshData {
        vertices: Vec::with_capacity(24 * STRIDE),
        indices: Vec::with_capacity(36),
    };
    for (quad, normal) in faces {
        mesh.push_quad(quad, normal);
    }
    mesh
}

/// Cylinder or truncated cone along Y; a zero radius omits that cap
pub fn cylinder_mesh(radius_top: f64, radius_bottom: f64, height: f64, segments: u32) -> MeshData {
    let hh = height * 0.5;
    let mut mesh = MeshData::default();
    // Side normals lean by the taper
    let slope = if height > 0.0 { (radius_bottom - radius_top) / height } else { 0.0 };

    for i in 0..segments {
        let a0 = i as f64 * std::f64::consts::TAU / segments as f64;
        let a1 = (i + 1) as f64 * std::f64::consts::TAU / segments as f64;
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();

        let n0 = DVec3::new(c0, slope, s0).normalize();
        let n1 = DVec3::new(c1, slope, s1).normalize();

        let base = mesh.push_vertex(DVec3::new(radius_bottom * c0, -hh, radius_bottom * s0), n0);
        mesh.push_vertex(DVec3::new(radius_top * c0, hh, radius_top * s0), n0);
        mesh.push_vertex(DVec3::new(radius_top * c1, hh, radius_top * s1), n1);
        mesh.push_vertex(DVec3::new(radius_bottom * c1, -hh, radius_bottom * s1), n1);

        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    if radius_top > 0.0 {
        add_cap(&mut mesh, radius_top, hh, segments, true);
    }
    if radius_bottom > 0.0 {
        add_cap(&mut mesh, radius_bottom, -hh, segments, false);
    }
    mesh
}

fn add_cap(mesh: &mut MeshData, radius: f64, y: f64, segments: u32, top: bool) {
    let normal = if top { DVec3::Y } else { DVec3::NEG_Y };
    let center = mesh.push_vertex(DVec3::new(0.0, y, 0.0), normal);
    for i in 0..=segments {
        let a = i as f64 * std::f64::consts::TAU / segments as f64;
        mesh.push_vertex(DVec3::new(radius * a.cos(), y, radius * a.sin()), normal);
    }
    for i in 0..segments {
        let a = center + 1 + i;
        let b = a + 1;
        if top {
            mesh.push_triangle(center, b, a);
        } else {
            mesh.push_triangle(center, a, b);
        }
    }
}

/// Raw triangle mesh from a flat xyz list, with smooth per-vertex normals
pub fn custom_mesh(positions: &[f64], indices: &[u32]) -> Option<MeshData> {
    if positions.is_empty() || positions.len() % 3 != 0 || indices.is_empty() || indices.len() % 3 != 0 {
        return None;
    }
    if !positions.iter().all(|v| v.is_finite()) {
        return None;
    }
    let count = positions.len() / 3;
    if indices.iter().any(|&i| i as usize >= count) {
        return None;
    }

    let points: Vec<DVec3> = positions
        .chunks_exact(3)
        .map(|c| DVec3::new(c[0], c[1], c[2]))
        .collect();

    let mut normals = vec![DVec3::ZERO; count];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        // Area-weighted face normal
        let face = (points[b] - points[a]).cross(points[c] - points[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    let mut mesh = MeshData::default();
    for (p, n) in points.iter().zip(&normals) {
        let n = n.try_normalize().unwrap_or(DVec3::Y);
        mesh.push_vertex(*p, n);
    }
    mesh.indices = indices.to_vec();
    Some(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_counts_and_bounds() {
        let mesh = box_mesh(914.0, 2032.0, 44.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(max - min, Vec3::new(914.0, 2032.0, 44.0));
    }

    #[test]
    fn test_cone_has_single_cap() {
        let cone = cylinder_mesh(0.0, 10.0, 20.0, 8);
        let cyl = cylinder_mesh(10.0, 10.0, 20.0, 8);
        // Side quads + one or two caps (centre + segments + 1 rim vertices)
        assert_eq!(cone.vertex_count(), 8 * 4 + 10);
        assert_eq!(cyl.vertex_count(), 8 * 4 + 2 * 10);
    }

    #[test]
    fn test_custom_mesh_validates_input() {
        let tri = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mesh = custom_mesh(&tri, &[0, 1, 2]).unwrap();
        assert_eq!(mesh.normal(0), Vec3::Z);

        assert!(custom_mesh(&tri, &[0, 1, 3]).is_none());
        assert!(custom_mesh(&tri[..8], &[0, 1, 2]).is_none());
        assert!(custom_mesh(&tri, &[0, 1]).is_none());
        assert!(custom_mesh(&[f64::NAN; 9], &[0, 1, 2]).is_none());
    }
}
