//! Mesh validation utilities.
//!
//! `MeshValidator` provides methods to check mesh data integrity:
//! correct stride, in-range indices, normalized normals, winding, AABB
//! dimensions and enclosed volume.

use glam::DVec3;

use crate::geometry::mesh::{MeshData, STRIDE};

/// Validator for `MeshData` integrity checks.
pub struct MeshValidator<'a> {
    mesh: &'a MeshData,
}

impl<'a> MeshValidator<'a> {
    /// Create a new validator for the given mesh.
    pub fn new(mesh: &'a MeshData) -> Self {
        Self { mesh }
    }

    /// Number of vertices (vertices buffer length / 6).
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len() / STRIDE
    }

    /// Number of triangles (indices buffer length / 3).
    pub fn triangle_count(&self) -> usize {
        self.mesh.indices.len() / 3
    }

    /// Check that the vertex buffer length is a multiple of the stride.
    pub fn is_stride_valid(&self) -> bool {
        self.mesh.vertices.len() % STRIDE == 0
    }

    /// Check that the index buffer length is a multiple of 3.
    pub fn is_index_stride_valid(&self) -> bool {
        self.mesh.indices.len() % 3 == 0
    }

    /// Check that all indices are within the valid vertex range.
    pub fn are_indices_in_range(&self) -> bool {
        let max_idx = self.vertex_count() as u32;
        self.mesh.indices.iter().all(|&i| i < max_idx)
    }

    /// Check that all vertex normals have unit length (within epsilon).
    pub fn are_normals_normalized(&self, epsilon: f32) -> bool {
        (0..self.vertex_count()).all(|i| (self.mesh.normal(i).length() - 1.0).abs() <= epsilon)
    }

    pub fn is_finite(&self) -> bool {
        self.mesh.is_finite()
    }

    fn corners(&self, tri: &[u32]) -> [DVec3; 3] {
        [
            self.mesh.position(tri[0] as usize).as_dvec3(),
            self.mesh.position(tri[1] as usize).as_dvec3(),
            self.mesh.position(tri[2] as usize).as_dvec3(),
        ]
    }

    /// Every non-degenerate triangle winds counterclockwise around its vertex normals.
    pub fn windings_match_normals(&self) -> bool {
        self.mesh.indices.chunks_exact(3).all(|tri| {
            let [a, b, c] = self.corners(tri);
            let face = (b - a).cross(c - a);
            if face.length_squared() < 1e-12 {
                return true;
            }
            let shading: DVec3 = tri
                .iter()
                .map(|&i| self.mesh.normal(i as usize).as_dvec3())
                .sum();
            face.dot(shading) > 0.0
        })
    }

    /// Volume enclosed by the triangles (positive when faces point outward).
    ///
    /// Only meaningful for closed meshes.
    pub fn signed_volume(&self) -> f64 {
        self.mesh
            .indices
            .chunks_exact(3)
            .map(|tri| {
                let [a, b, c] = self.corners(tri);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    /// Compute the dimensions (width, height, depth) of the bounding box.
    pub fn dimensions(&self) -> [f32; 3] {
        match self.mesh.bounds() {
            Some((min, max)) => (max - min).to_array(),
            None => [0.0; 3],
        }
    }

    /// Check that the AABB dimensions are approximately equal to `expected`.
    pub fn assert_dimensions_approx(&self, expected: [f32; 3], tolerance: f32) -> bool {
        let dims = self.dimensions();
        (dims[0] - expected[0]).abs() < tolerance
            && (dims[1] - expected[1]).abs() < tolerance
            && (dims[2] - expected[2]).abs() < tolerance
    }

    /// Run all validation checks and return a list of error messages.
    /// An empty list means the mesh is valid.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.is_stride_valid() {
            errors.push(format!(
                "Vertex buffer length {} is not a multiple of {}",
                self.mesh.vertices.len(),
                STRIDE
            ));
        }

        if !self.is_index_stride_valid() {
            errors.push(format!(
                "Index buffer length {} is not a multiple of 3",
                self.mesh.indices.len()
            ));
        }

        if !self.are_indices_in_range() {
            let max_idx = self.vertex_count() as u32;
            let out_of_range: Vec<_> = self
                .mesh
                .indices
                .iter()
                .filter(|&&i| i >= max_idx)
                .take(5)
                .collect();
            errors.push(format!(
                "Indices out of range (vertex_count={}): {:?}",
                max_idx, out_of_range
            ));
        } else if !self.windings_match_normals() {
            errors.push("Some triangles wind against their normals".to_string());
        }

        if !self.is_finite() {
            errors.push("Vertex buffer contains NaN or infinite values".to_string());
        }

        if self.vertex_count() > 0 && !self.are_normals_normalized(0.1) {
            errors.push("Some normals are not unit-length (epsilon=0.1)".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_triangle() -> MeshData {
        MeshData {
            vertices: vec![
                // vertex 0: pos(0,0,0) normal(0,0,1)
                0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
                // vertex 1: pos(1,0,0) normal(0,0,1)
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
                // vertex 2: pos(0,1,0) normal(0,0,1)
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            ],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_counts() {
        let mesh = simple_triangle();
        let v = MeshValidator::new(&mesh);
        assert_eq!(v.vertex_count(), 3);
        assert_eq!(v.triangle_count(), 1);
        assert!(v.validate_all().is_empty());
    }

    #[test]
    fn test_stride_invalid() {
        let bad = MeshData {
            vertices: vec![0.0; 10], // not multiple of 6
            indices: vec![],
        };
        let v = MeshValidator::new(&bad);
        assert!(!v.is_stride_valid());
    }

    #[test]
    fn test_indices_out_of_range() {
        let bad = MeshData {
            vertices: vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0], // 1 vertex
            indices: vec![0, 1, 2],
        };
        let v = MeshValidator::new(&bad);
        assert!(!v.are_indices_in_range());
        assert_eq!(v.validate_all().len(), 1);
    }

    #[test]
    fn test_normals_not_normalized() {
        let bad = MeshData {
            vertices: vec![0.0, 0.0, 0.0, 0.0, 0.0, 5.0], // normal length = 5
            indices: vec![],
        };
        let v = MeshValidator::new(&bad);
        assert!(!v.are_normals_normalized(0.01));
    }

    #[test]
    fn test_flipped_winding_detected() {
        let mut mesh = simple_triangle();
        mesh.indices = vec![0, 2, 1];
        let v = MeshValidator::new(&mesh);
        assert!(!v.windings_match_normals());
        assert!(!v.validate_all().is_empty());
    }

    #[test]
    fn test_box_volume_and_dimensions() {
        let mesh = crate::geometry::mesh::box_mesh(2.0, 3.0, 4.0);
        let v = MeshValidator::new(&mesh);
        assert!((v.signed_volume() - 24.0).abs() < 1e-6);
        assert!(v.assert_dimensions_approx([2.0, 3.0, 4.0], 1e-4));
        assert!(!v.assert_dimensions_approx([3.0, 3.0, 4.0], 1e-4));
    }
}
