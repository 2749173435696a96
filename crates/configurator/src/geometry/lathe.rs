use std::f64::consts::TAU;

use glam::{DVec2, DVec3};

use super::mesh::MeshData;

// ── Revolve ─────────────────────────────────────────────────

/// Revolve a (radius, height) profile about the Y axis.
///
/// The profile should run bottom to top so faces point away from the axis.
/// A sweep of `phi_length >= 2π` closes the seam; shorter sweeps stay open.
pub fn lathe_mesh(profile: &[[f64; 2]], segments: u32, phi_start: f64, phi_length: f64) -> Option<MeshData> {
    if profile.len() < 2 || !phi_start.is_finite() || !phi_length.is_finite() || phi_length <= 0.0 {
        return None;
    }
    if !profile.iter().flatten().all(|v| v.is_finite()) {
        return None;
    }

    let segments = segments.clamp(3, 256);
    let angle = phi_length.min(TAU);
    let full_revolution = angle >= TAU - 1e-9;
    let steps = if full_revolution { segments as usize } else { segments as usize + 1 };

    // Points left of the axis are folded onto it
    let profile: Vec<DVec2> = profile.iter().map(|p| DVec2::new(p[0].max(0.0), p[1])).collect();

    let rings: Vec<Vec<DVec3>> = (0..steps)
        .map(|s| {
            let phi = phi_start + s as f64 / segments as f64 * angle;
            let (sin, cos) = phi.sin_cos();
            profile
                .iter()
                .map(|p| DVec3::new(p.x * sin, p.y, p.x * cos))
                .collect()
        })
        .collect();

    let ring_count = rings.len();
    let mut mesh = MeshData::default();
    for s in 0..segments as usize {
        let s_next = if full_revolution {
            (s + 1) % ring_count
        } else {
            s + 1
        };
        for p in 0..profile.len() - 1 {
            let p00 = rings[s][p];
            let p01 = rings[s][p + 1];
            let p10 = rings[s_next][p];
            let p11 = rings[s_next][p + 1];

            // Diagonal cross product survives quads collapsed onto the axis
            let face_n = (p11 - p00).cross(p01 - p10).normalize_or_zero();
            if face_n == DVec3::ZERO {
                continue;
            }
            mesh.push_quad([p00, p10, p11, p01], face_n);
        }
    }

    (!mesh.is_empty() && mesh.is_finite()).then_some(mesh)
}
