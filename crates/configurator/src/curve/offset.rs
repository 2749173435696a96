//! Parallel curves at a signed perpendicular distance

use glam::DVec2;

use super::FlatCurve;

/// Corner miters longer than this multiple of the distance are clipped
const MITER_LIMIT: f64 = 4.0;

/// Displace every sampled point along its normal by `distance`.
///
/// Smooth curves move exactly along their normals (for arcs this is the
/// radial direction, so the result is again a circle). Sharp polylines get
/// a miter correction so straight edges stay `distance` away.
pub fn offset_curve(curve: &FlatCurve, distance: f64) -> FlatCurve {
    if distance == 0.0 || !distance.is_finite() {
        return curve.clone();
    }

    let n = curve.points.len();
    let points = (0..n)
        .map(|i| {
            let normal = curve.normals[i];
            let scale = if curve.sharp { miter_scale(curve, i) } else { 1.0 };
            curve.points[i] + normal * distance * scale
        })
        .collect();

    FlatCurve {
        points,
        normals: curve.normals.clone(),
        closed: curve.closed,
        sharp: curve.sharp,
    }
}

/// 1 / cos(half corner angle), clamped at `MITER_LIMIT`
fn miter_scale(curve: &FlatCurve, i: usize) -> f64 {
    let n = curve.points.len();
    let prev = if i > 0 {
        i - 1
    } else if curve.closed {
        n - 1
    } else {
        return 1.0;
    };

    let dir = (curve.points[i] - curve.points[prev]).normalize_or_zero();
    let mut edge_normal = DVec2::new(-dir.y, dir.x);
    if edge_normal.dot(curve.normals[i]) < 0.0 {
        edge_normal = -edge_normal;
    }
    let cos_half = edge_normal.dot(curve.normals[i]);
    1.0 / cos_half.max(1.0 / MITER_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::super::sample::{sample_arc, sample_polyline};
    use super::*;

    #[test]
    fn test_arc_offset_changes_radius() {
        let arc = sample_arc(DVec2::ZERO, 100.0, 0.0, std::f64::consts::PI, 16).unwrap();
        let grown = offset_curve(&arc, 12.0);
        let shrunk = offset_curve(&arc, -12.0);
        for (g, s) in grown.points.iter().zip(&shrunk.points) {
            assert!((g.length() - 112.0).abs() < 1e-9);
            assert!((s.length() - 88.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_square_offset_keeps_edges_parallel() {
        let square = sample_polyline(&[[-50.0, -50.0], [50.0, -50.0], [50.0, 50.0], [-50.0, 50.0]], true)
            .unwrap();
        let out = offset_curve(&square, 10.0);
        for p in &out.points {
            assert!((p.x.abs() - 60.0).abs() < 1e-9, "{p:?}");
            assert!((p.y.abs() - 60.0).abs() < 1e-9, "{p:?}");
        }
        let inset = offset_curve(&square, -10.0);
        for p in &inset.points {
            assert!((p.x.abs() - 40.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_offset_is_identity() {
        let arc = sample_arc(DVec2::ZERO, 5.0, 0.0, 1.0, 8).unwrap();
        assert_eq!(offset_curve(&arc, 0.0), arc);
    }
}
