//! Tube and profile sweeps along a rail, using rotation-minimizing frames
//! (parallel transport) so the cross-section does not twist.

use glam::{DQuat, DVec2, DVec3};

use super::mesh::MeshData;
use super::triangulate::triangulate;
use crate::curve::{dedup_points, signed_area, SweepPath};

const EPS: f64 = 1e-9;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SweepError {
    #[error("rail requires at least {0} distinct points")]
    RailTooShort(usize),
    #[error("rail must have finite points")]
    NonFiniteRail,
    #[error("radius must be finite and > 0")]
    InvalidRadius,
    #[error("profile requires at least 3 distinct finite points")]
    InvalidProfile,
    #[error("profile cap could not be triangulated")]
    CapTriangulation,
}

/// Orthonormal frame; `binormal = tangent × normal`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: DVec3,
    pub normal: DVec3,
    pub binormal: DVec3,
}

impl Frame {
    /// Start frame; for rails in the XY plane the binormal is +Z
    fn initial(tangent: DVec3) -> Self {
        let reference = if tangent.z.abs() < 0.9 { DVec3::Z } else { DVec3::X };
        let binormal = (reference - tangent * tangent.dot(reference)).normalize();
        let normal = binormal.cross(tangent);
        Self { tangent, normal, binormal }
    }

    fn transported(&self, tangent: DVec3) -> Self {
        let axis = self.tangent.cross(tangent);
        let normal = if axis.length_squared() < EPS * EPS {
            if self.tangent.dot(tangent) < 0.0 { -self.normal } else { self.normal }
        } else {
            let angle = self.tangent.dot(tangent).clamp(-1.0, 1.0).acos();
            DQuat::from_axis_angle(axis.normalize(), angle) * self.normal
        };
        let normal = (normal - tangent * tangent.dot(normal)).normalize_or_zero();
        let normal = if normal == DVec3::ZERO { self.normal } else { normal };
        Self { tangent, normal, binormal: tangent.cross(normal) }
    }

    /// Point of the cross-section plane at local (x, y)
    fn place(&self, origin: DVec3, local: DVec2) -> DVec3 {
        origin + self.normal * local.x + self.binormal * local.y
    }
}

/// Drop repeated rail points and check the rail is usable
fn clean_rail(path: &SweepPath, closed: bool) -> Result<Vec<DVec3>, SweepError> {
    if !path.points.iter().all(|p| p.is_finite()) {
        return Err(SweepError::NonFiniteRail);
    }
    let mut points = path.points.clone();
    points.dedup_by(|b, a| a.distance(*b) < EPS);
    if closed && points.len() > 1 && points[0].distance(points[points.len() - 1]) < EPS {
        points.pop();
    }
    let needed = if closed { 3 } else { 2 };
    if points.len() < needed {
        return Err(SweepError::RailTooShort(needed));
    }
    Ok(points)
}

/// Parallel-transport frames along the rail; closed rails get their
/// residual twist spread evenly so the seam lines up
pub fn rail_frames(points: &[DVec3], closed: bool) -> Vec<Frame> {
    let n = points.len();
    let tangents: Vec<DVec3> = (0..n)
        .map(|i| {
            let (prev, next) = if closed {
                (points[(i + n - 1) % n], points[(i + 1) % n])
            } else {
                (points[i.saturating_sub(1)], points[(i + 1).min(n - 1)])
            };
            let incoming = (points[i] - prev).normalize_or_zero();
            let outgoing = (next - points[i]).normalize_or_zero();
            let t = (incoming + outgoing).normalize_or_zero();
            match (t == DVec3::ZERO, outgoing == DVec3::ZERO) {
                (false, _) => t,
                (true, false) => outgoing,
                (true, true) => incoming,
            }
        })
        .collect();

    let mut frames = Vec::with_capacity(n);
    frames.push(Frame::initial(tangents[0]));
    for t in tangents.iter().skip(1) {
        let next = frames[frames.len() - 1].transported(*t);
        frames.push(next);
    }

    if closed && n > 2 {
        let wrapped = frames[n - 1].transported(tangents[0]);
        let cos = wrapped.normal.dot(frames[0].normal).clamp(-1.0, 1.0);
        let mut theta = cos.acos();
        if wrapped.normal.cross(frames[0].normal).dot(tangents[0]) < 0.0 {
            theta = -theta;
        }
        if theta.abs() > EPS {
            for (i, frame) in frames.iter_mut().enumerate().skip(1) {
                let twist = DQuat::from_axis_angle(frame.tangent, theta * i as f64 / n as f64);
                frame.normal = twist * frame.normal;
                frame.binormal = frame.tangent.cross(frame.normal);
            }
        }
    }
    frames
}

// ── Tube ────────────────────────────────────────────────────

/// Circular cross-section of `radius` swept along `path`, smooth shaded.
///
/// Open tubes get flat end caps.
pub fn tube_mesh(path: &SweepPath, radius: f64, radial_segments: u32, closed: bool) -> Result<MeshData, SweepError> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(SweepError::InvalidRadius);
    }
    let closed = closed || path.closed;
    let rail = clean_rail(path, closed)?;
    let frames = rail_frames(&rail, closed);
    let radial = radial_segments.clamp(3, 128);
    let m = rail.len() as u32;

    let circle: Vec<DVec2> = (0..radial)
        .map(|j| DVec2::from_angle(j as f64 * std::f64::consts::TAU / radial as f64))
        .collect();

    let mut mesh = MeshData::default();
    for (p, frame) in rail.iter().zip(&frames) {
        for dir in &circle {
            let outward = frame.place(DVec3::ZERO, *dir);
            mesh.push_vertex(*p + outward * radius, outward);
        }
    }

    let spans = if closed { m } else { m - 1 };
    for i in 0..spans {
        let i1 = (i + 1) % m;
        for j in 0..radial {
            let j1 = (j + 1) % radial;
            let a = i * radial + j;
            let b = i1 * radial + j;
            let c = i1 * radial + j1;
            let d = i * radial + j1;
            mesh.push_triangle(a, d, c);
            mesh.push_triangle(a, c, b);
        }
    }

    if !closed {
        let last = rail.len() - 1;
        let disc: Vec<DVec2> = circle.iter().map(|d| *d * radius).collect();
        add_fan_cap(&mut mesh, rail[0], &frames[0], &disc, false);
        add_fan_cap(&mut mesh, rail[last], &frames[last], &disc, true);
    }
    Ok(mesh)
}

/// Flat cap over a convex section; `at_end` faces along the tangent
fn add_fan_cap(mesh: &mut MeshData, origin: DVec3, frame: &Frame, section: &[DVec2], at_end: bool) {
    let normal = if at_end { frame.tangent } else { -frame.tangent };
    let center = mesh.push_vertex(origin, normal);
    for p in section {
        mesh.push_vertex(frame.place(origin, *p), normal);
    }
    let count = section.len() as u32;
    for j in 0..count {
        let a = center + 1 + j;
        let b = center + 1 + (j + 1) % count;
        if at_end {
            mesh.push_triangle(center, a, b);
        } else {
            mesh.push_triangle(center, b, a);
        }
    }
}

// ── Profile sweep ───────────────────────────────────────────

/// Closed 2D profile swept along `path`; x maps to the frame normal, y to
/// the binormal (+Z for rails in the XY plane).
pub fn profile_sweep_mesh(profile: &[DVec2], path: &SweepPath) -> Result<MeshData, SweepError> {
    let mut section = profile.to_vec();
    dedup_points(&mut section, true);
    if section.len() < 3 || !section.iter().all(|p| p.is_finite()) || signed_area(&section).abs() < EPS {
        return Err(SweepError::InvalidProfile);
    }
    if signed_area(&section) < 0.0 {
        section.reverse();
    }

    let closed = path.closed;
    let rail = clean_rail(path, closed)?;
    let frames = rail_frames(&rail, closed);
    let rings: Vec<Vec<DVec3>> = rail
        .iter()
        .zip(&frames)
        .map(|(p, f)| section.iter().map(|s| f.place(*p, *s)).collect())
        .collect();

    let mut mesh = MeshData::default();
    let k = section.len();
    let spans = if closed { rings.len() } else { rings.len() - 1 };
    for i in 0..spans {
        let next = &rings[(i + 1) % rings.len()];
        let ring = &rings[i];
        for s in 0..k {
            let s1 = (s + 1) % k;
            let quad = [ring[s], ring[s1], next[s1], next[s]];
            let normal = (quad[2] - quad[0]).cross(quad[3] - quad[1]).normalize_or_zero();
            if normal != DVec3::ZERO {
                mesh.push_quad(quad, normal);
            }
        }
    }

    if !closed {
        let tri = triangulate(&section, &[]).ok_or(SweepError::CapTriangulation)?;
        let last = rail.len() - 1;
        for (origin, frame, at_end) in [(rail[0], frames[0], false), (rail[last], frames[last], true)] {
            let normal = if at_end { frame.tangent } else { -frame.tangent };
            let base = mesh.next_index();
            for p in &tri.points {
                mesh.push_vertex(frame.place(origin, *p), normal);
            }
            for [a, b, c] in &tri.triangles {
                if at_end {
                    mesh.push_triangle(base + a, base + b, base + c);
                } else {
                    mesh.push_triangle(base + a, base + c, base + b);
                }
            }
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MeshValidator;

    fn straight(len: f64) -> SweepPath {
        SweepPath { points: vec![DVec3::ZERO, DVec3::new(len, 0.0, 0.0)], closed: false }
    }

    fn square_loop() -> SweepPath {
        SweepPath {
            points: vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(100.0, 0.0, 0.0),
                DVec3::new(100.0, 100.0, 0.0),
                DVec3::new(0.0, 100.0, 0.0),
            ],
            closed: true,
        }
    }

    #[test]
    fn test_frames_stay_orthonormal() {
        let pts: Vec<DVec3> = (0..20)
            .map(|i| {
                let a = i as f64 * 0.3;
                DVec3::new(a.cos() * 50.0, a.sin() * 50.0, i as f64 * 5.0)
            })
            .collect();
        for f in rail_frames(&pts, false) {
            assert!((f.tangent.length() - 1.0).abs() < 1e-9);
            assert!((f.normal.length() - 1.0).abs() < 1e-9);
            assert!(f.tangent.dot(f.normal).abs() < 1e-9);
            assert!((f.tangent.cross(f.normal) - f.binormal).length() < 1e-9);
        }
    }

    #[test]
    fn test_planar_rail_keeps_binormal_up() {
        for f in rail_frames(&square_loop().points, true) {
            assert!((f.binormal - DVec3::Z).length() < 1e-9);
        }
    }

    #[test]
    fn test_straight_tube_dimensions() {
        let mesh = tube_mesh(&straight(200.0), 10.0, 16, false).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty(), "{:?}", v.validate_all());
        assert!(v.assert_dimensions_approx([200.0, 20.0, 20.0], 1e-3));
        // 16-gon prism area
        let area = 0.5 * 16.0 * 100.0 * (std::f64::consts::TAU / 16.0).sin();
        assert!((v.signed_volume() - area * 200.0).abs() < 1.0);
    }

    #[test]
    fn test_closed_tube_has_no_caps() {
        let mesh = tube_mesh(&square_loop(), 5.0, 8, false).unwrap();
        // 4 rings x 8 vertices, 4 spans x 8 quads
        assert_eq!(mesh.vertex_count(), 32);
        assert_eq!(mesh.triangle_count(), 64);
        assert!(MeshValidator::new(&mesh).windings_match_normals());
    }

    #[test]
    fn test_tube_errors() {
        assert_eq!(tube_mesh(&straight(1.0), 0.0, 8, false), Err(SweepError::InvalidRadius));
        let dot = SweepPath { points: vec![DVec3::ZERO, DVec3::ZERO], closed: false };
        assert_eq!(tube_mesh(&dot, 1.0, 8, false), Err(SweepError::RailTooShort(2)));
        let nan = SweepPath { points: vec![DVec3::NAN, DVec3::X], closed: false };
        assert_eq!(tube_mesh(&nan, 1.0, 8, false), Err(SweepError::NonFiniteRail));
    }

    #[test]
    fn test_profile_sweep_box_section() {
        let section = vec![
            DVec2::new(-10.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 30.0),
            DVec2::new(-10.0, 30.0),
        ];
        let mesh = profile_sweep_mesh(&section, &straight(500.0)).unwrap();
        let v = MeshValidator::new(&mesh);
        assert!(v.validate_all().is_empty(), "{:?}", v.validate_all());
        // Profile y maps to +Z for a rail in the XY plane
        assert!(v.assert_dimensions_approx([500.0, 20.0, 30.0], 1e-3));
        assert!((v.signed_volume() - 20.0 * 30.0 * 500.0).abs() < 1e-1);
    }

    #[test]
    fn test_profile_sweep_rejects_bad_profile() {
        let line = vec![DVec2::ZERO, DVec2::X];
        assert_eq!(profile_sweep_mesh(&line, &straight(10.0)), Err(SweepError::InvalidProfile));
    }
}
