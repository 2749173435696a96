//! Samplers turning each curve shape into points plus per-point normals.

use std::f64::consts::TAU;

use glam::DVec2;
use kurbo::{CubicBez, ParamCurve, ParamCurveDeriv, Point, QuadBez};

use super::presets::ArchCurve;
use super::FlatCurve;

const EPS: f64 = 1e-9;

pub(crate) fn to_vec(p: [f64; 2]) -> DVec2 {
    DVec2::new(p[0], p[1])
}

fn to_point(p: DVec2) -> Point {
    Point::new(p.x, p.y)
}

fn from_point(p: Point) -> DVec2 {
    DVec2::new(p.x, p.y)
}

/// Left-hand unit normal of a direction
fn left_normal(dir: DVec2) -> DVec2 {
    DVec2::new(-dir.y, dir.x).normalize_or_zero()
}

fn is_full_turn(sweep: f64) -> bool {
    sweep.abs() >= TAU - 1e-9
}

/// Signed area (positive when counterclockwise)
pub(crate) fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    area / 2.0
}

/// Drop consecutive duplicates (and the closing duplicate when `closed`)
pub(crate) fn dedup_points(points: &mut Vec<DVec2>, closed: bool) {
    points.dedup_by(|b, a| a.distance(*b) < EPS);
    if closed && points.len() > 1 {
        let first = points[0];
        if points.last().is_some_and(|last| last.distance(first) < EPS) {
            points.pop();
        }
    }
}

// ============================================================================
// Arcs and ellipses
// ============================================================================

pub fn sample_arc(center: DVec2, radius: f64, start: f64, end: f64, segments: u32) -> Option<FlatCurve> {
    if !(radius.is_finite() && radius > 0.0) || !start.is_finite() || !end.is_finite() {
        return None;
    }
    let sweep = end - start;
    if sweep.abs() < EPS {
        return None;
    }
    let closed = is_full_turn(sweep);
    let count = if closed { segments } else { segments + 1 };

    let mut points = Vec::with_capacity(count as usize);
    let mut normals = Vec::with_capacity(count as usize);
    for i in 0..count {
        let a = start + sweep * i as f64 / segments as f64;
        let dir = DVec2::new(a.cos(), a.sin());
        points.push(center + dir * radius);
        normals.push(dir);
    }
    Some(FlatCurve { points, normals, closed, sharp: false })
}

pub fn sample_ellipse(
    center: DVec2,
    radius_x: f64,
    radius_y: f64,
    rotation: f64,
    start: f64,
    end: f64,
    segments: u32,
) -> Option<FlatCurve> {
    let valid = |r: f64| r.is_finite() && r > 0.0;
    if !valid(radius_x) || !valid(radius_y) || !rotation.is_finite() {
        return None;
    }
    if !start.is_finite() || !end.is_finite() || (end - start).abs() < EPS {
        return None;
    }
    let sweep = end - start;
    let closed = is_full_turn(sweep);
    let count = if closed { segments } else { segments + 1 };
    let rot = DVec2::from_angle(rotation);

    let mut points = Vec::with_capacity(count as usize);
    let mut normals = Vec::with_capacity(count as usize);
    for i in 0..count {
        let t = start + sweep * i as f64 / segments as f64;
        let local = DVec2::new(radius_x * t.cos(), radius_y * t.sin());
        // Gradient of the implicit form, points away from the centre
        let grad = DVec2::new(t.cos() / radius_x, t.sin() / radius_y);
        points.push(center + rot.rotate(local));
        normals.push(rot.rotate(grad).normalize_or_zero());
    }
    Some(FlatCurve { points, normals, closed, sharp: false })
}

// ============================================================================
// Béziers and splines
// ============================================================================

/// One Bézier segment, evaluated with kurbo where it has a native type
enum Segment {
    Line(DVec2, DVec2),
    Quad(QuadBez),
    Cubic(CubicBez),
    General(Vec<DVec2>),
}

impl Segment {
    fn eval(&self, t: f64) -> (DVec2, DVec2) {
        match self {
            Segment::Line(a, b) => (a.lerp(*b, t), *b - *a),
            Segment::Quad(q) => (from_point(q.eval(t)), from_point(q.deriv().eval(t))),
            Segment::Cubic(c) => (from_point(c.eval(t)), from_point(c.deriv().eval(t))),
            Segment::General(ctrl) => de_casteljau(ctrl, t),
        }
    }
}

/// Point and derivative of an arbitrary-degree Bézier
fn de_casteljau(ctrl: &[DVec2], t: f64) -> (DVec2, DVec2) {
    let degree = ctrl.len().saturating_sub(1) as f64;
    let mut work = ctrl.to_vec();
    let mut tangent = DVec2::ZERO;
    while work.len() > 1 {
        if work.len() == 2 {
            tangent = (work[1] - work[0]) * degree;
        }
        for i in 0..work.len() - 1 {
            work[i] = work[i].lerp(work[i + 1], t);
        }
        work.pop();
    }
    (work.first().copied().unwrap_or(DVec2::ZERO), tangent)
}

fn cubic(p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2) -> Segment {
    Segment::Cubic(CubicBez::new(to_point(p0), to_point(p1), to_point(p2), to_point(p3)))
}

fn bezier_segments(ctrl: &[DVec2]) -> Vec<Segment> {
    match ctrl.len() {
        0 | 1 => Vec::new(),
        2 => vec![Segment::Line(ctrl[0], ctrl[1])],
        3 => vec![Segment::Quad(QuadBez::new(
            to_point(ctrl[0]),
            to_point(ctrl[1]),
            to_point(ctrl[2]),
        ))],
        n if (n - 1) % 3 == 0 => ctrl
            .windows(4)
            .step_by(3)
            .map(|w| cubic(w[0], w[1], w[2], w[3]))
            .collect(),
        _ => vec![Segment::General(ctrl.to_vec())],
    }
}

/// Catmull-Rom through `pts`, as cubic Bézier segments
fn catmull_rom_segments(pts: &[DVec2], closed: bool, tension: f64) -> Vec<Segment> {
    let n = pts.len();
    let at = |i: isize| -> DVec2 {
        if closed {
            pts[i.rem_euclid(n as isize) as usize]
        } else {
            pts[i.clamp(0, n as isize - 1) as usize]
        }
    };
    let tangent = |i: isize| (at(i + 1) - at(i - 1)) * tension;

    let count = if closed { n } else { n - 1 };
    (0..count as isize)
        .map(|i| {
            let p0 = at(i);
            let p1 = at(i + 1);
            cubic(p0, p0 + tangent(i) / 3.0, p1 - tangent(i + 1) / 3.0, p1)
        })
        .collect()
}

/// Sample a chain of segments with `segments` steps in total
fn sample_segments(chain: &[Segment], segments: u32, closed: bool) -> Option<FlatCurve> {
    if chain.is_empty() {
        return None;
    }
    let k = chain.len() as f64;
    let count = if closed { segments } else { segments + 1 };

    let mut points = Vec::with_capacity(count as usize);
    let mut tangents = Vec::with_capacity(count as usize);
    for i in 0..count {
        let u = i as f64 / segments as f64 * k;
        let index = (u.floor() as usize).min(chain.len() - 1);
        let (p, d) = chain[index].eval(u - index as f64);
        points.push(p);
        tangents.push(d);
    }

    // Degenerate derivatives (coincident control points) borrow the chord
    for i in 0..tangents.len() {
        if tangents[i].length_squared() < EPS * EPS {
            let prev = points[i.saturating_sub(1)];
            let next = points[(i + 1).min(points.len() - 1)];
            tangents[i] = next - prev;
        }
    }

    let mut normals: Vec<DVec2> = tangents.iter().map(|t| left_normal(*t)).collect();
    if closed && signed_area(&points) > 0.0 {
        // Counterclockwise loop: the left side is the inside
        normals.iter_mut().for_each(|n| *n = -*n);
    }
    Some(FlatCurve { points, normals, closed, sharp: false })
}

pub fn sample_bezier(ctrl: &[[f64; 2]], segments: u32) -> Option<FlatCurve> {
    let ctrl: Vec<DVec2> = ctrl.iter().copied().map(to_vec).collect();
    if ctrl.len() < 2 {
        return None;
    }
    sample_segments(&bezier_segments(&ctrl), segments, false)
}

pub fn sample_spline(pts: &[[f64; 2]], closed: bool, tension: f64, segments: u32) -> Option<FlatCurve> {
    let mut pts: Vec<DVec2> = pts.iter().copied().map(to_vec).collect();
    dedup_points(&mut pts, closed);
    let min_points = if closed { 3 } else { 2 };
    if pts.len() < min_points {
        return None;
    }
    let tension = if tension.is_finite() { tension } else { 0.5 };
    sample_segments(&catmull_rom_segments(&pts, closed, tension), segments, closed)
}

// ============================================================================
// Polylines
// ============================================================================

/// Polyline vertices are kept as-is; resolution does not apply
pub fn sample_polyline(pts: &[[f64; 2]], closed: bool) -> Option<FlatCurve> {
    let mut points: Vec<DVec2> = pts.iter().copied().map(to_vec).collect();
    dedup_points(&mut points, closed);
    let n = points.len();
    if n < 2 || (closed && n < 3) {
        return None;
    }

    let seg_normal = |i: usize| left_normal(points[(i + 1) % n] - points[i]);
    let mut normals = Vec::with_capacity(n);
    for i in 0..n {
        let normal = match (closed, i) {
            (false, 0) => seg_normal(0),
            (false, i) if i == n - 1 => seg_normal(n - 2),
            _ => {
                let before = seg_normal((i + n - 1) % n);
                let after = seg_normal(i);
                let bisector = (before + after).normalize_or_zero();
                // A full reversal has no bisector; keep the incoming side
                if bisector == DVec2::ZERO { before } else { bisector }
            }
        };
        normals.push(normal);
    }

    if closed && signed_area(&points) > 0.0 {
        normals.iter_mut().for_each(|v| *v = -*v);
    }
    Some(FlatCurve { points, normals, closed, sharp: true })
}

// ============================================================================
// Presets
// ============================================================================

/// Sample an arch's pieces, splitting `segments` between them as evenly as possible
pub fn sample_arch(arch: &ArchCurve, segments: u32) -> Option<FlatCurve> {
    let pieces = arch.pieces.len() as u32;
    if pieces == 0 {
        return None;
    }
    let base = segments / pieces;
    let extra = segments % pieces;

    let mut points: Vec<DVec2> = Vec::new();
    let mut normals: Vec<DVec2> = Vec::new();
    for (index, piece) in arch.pieces.iter().enumerate() {
        // Leading pieces take the remainder
        let per_piece = (base + u32::from((index as u32) < extra)).max(1);
        for i in 0..=per_piece {
            let t = i as f64 / per_piece as f64;
            let point = piece.point_at(t);
            let normal = piece.normal_at(t);
            if index > 0 && i == 0 {
                // Shared joint: average the two sides
                if let Some(last) = normals.last_mut() {
                    *last = (*last + normal).normalize_or_zero();
                }
                continue;
            }
            points.push(point);
            normals.push(normal);
        }
    }
    Some(FlatCurve { points, normals, closed: false, sharp: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_points_lie_on_circle() {
        let c = sample_arc(DVec2::new(10.0, 5.0), 50.0, 0.0, std::f64::consts::PI, 16).unwrap();
        assert_eq!(c.points.len(), 17);
        assert!(!c.closed);
        for (p, n) in c.points.iter().zip(&c.normals) {
            assert!(((*p - DVec2::new(10.0, 5.0)).length() - 50.0).abs() < 1e-9);
            assert!((n.length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_full_circle_is_closed_without_duplicate() {
        let c = sample_arc(DVec2::ZERO, 10.0, 0.0, TAU, 12).unwrap();
        assert!(c.closed);
        assert_eq!(c.points.len(), 12);
    }

    #[test]
    fn test_degenerate_arc_rejected() {
        assert!(sample_arc(DVec2::ZERO, 0.0, 0.0, 1.0, 8).is_none());
        assert!(sample_arc(DVec2::ZERO, 10.0, 1.0, 1.0, 8).is_none());
        assert!(sample_arc(DVec2::ZERO, f64::INFINITY, 0.0, 1.0, 8).is_none());
    }

    #[test]
    fn test_rotated_ellipse_extremes() {
        let c = sample_ellipse(DVec2::ZERO, 20.0, 10.0, std::f64::consts::FRAC_PI_2, 0.0, TAU, 8).unwrap();
        // Major axis now lies along Y
        assert!((c.points[0] - DVec2::new(0.0, 20.0)).length() < 1e-9);
        assert!((c.normals[0] - DVec2::new(0.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_cubic_bezier_endpoints() {
        let c = sample_bezier(&[[0.0, 0.0], [0.0, 100.0], [100.0, 100.0], [100.0, 0.0]], 10).unwrap();
        assert_eq!(c.points.len(), 11);
        assert!(c.points[0].distance(DVec2::ZERO) < 1e-9);
        assert!(c.points[10].distance(DVec2::new(100.0, 0.0)) < 1e-9);
        // Starts heading up: left normal points to -X
        assert!((c.normals[0] - DVec2::new(-1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_chained_cubics_pass_through_joints() {
        let ctrl = [
            [0.0, 0.0], [10.0, 10.0], [20.0, 10.0], [30.0, 0.0],
            [40.0, -10.0], [50.0, -10.0], [60.0, 0.0],
        ];
        let c = sample_bezier(&ctrl, 8).unwrap();
        assert!(c.points[4].distance(DVec2::new(30.0, 0.0)) < 1e-9);
        assert!(c.points[8].distance(DVec2::new(60.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_general_degree_bezier() {
        let ctrl = [[0.0, 0.0], [1.0, 2.0], [2.0, 2.0], [3.0, 2.0], [4.0, 0.0]];
        let c = sample_bezier(&ctrl, 8).unwrap();
        assert!(c.points[0].distance(DVec2::ZERO) < 1e-9);
        assert!(c.points[8].distance(DVec2::new(4.0, 0.0)) < 1e-9);
        // Symmetric control polygon peaks at the midpoint
        assert!((c.points[4].x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_quadratic_bezier_midpoint() {
        let c = sample_bezier(&[[0.0, 0.0], [50.0, 100.0], [100.0, 0.0]], 8).unwrap();
        assert!(c.points[4].distance(DVec2::new(50.0, 50.0)) < 1e-9);
    }

    #[test]
    fn test_spline_interpolates_points() {
        let pts = [[0.0, 0.0], [100.0, 50.0], [200.0, 0.0]];
        let c = sample_spline(&pts, false, 0.5, 16).unwrap();
        assert!(c.points[0].distance(DVec2::ZERO) < 1e-9);
        assert!(c.points[8].distance(DVec2::new(100.0, 50.0)) < 1e-9);
        assert!(c.points[16].distance(DVec2::new(200.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_closed_spline_normals_point_outward() {
        let pts = [[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        let c = sample_spline(&pts, true, 0.5, 16).unwrap();
        assert!(c.closed);
        assert_eq!(c.points.len(), 16);
        let centroid = DVec2::new(50.0, 50.0);
        for (p, n) in c.points.iter().zip(&c.normals) {
            assert!((*p - centroid).dot(*n) > 0.0);
        }
    }

    #[test]
    fn test_closed_polyline_outward_for_both_windings() {
        let ccw = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let mut cw = ccw;
        cw.reverse();
        for pts in [ccw, cw] {
            let c = sample_polyline(&pts, true).unwrap();
            assert!(c.sharp);
            for (p, n) in c.points.iter().zip(&c.normals) {
                assert!((*p - DVec2::new(5.0, 5.0)).dot(*n) > 0.0);
            }
        }
    }

    #[test]
    fn test_polyline_drops_duplicates() {
        let c = sample_polyline(&[[0.0, 0.0], [0.0, 0.0], [5.0, 0.0], [0.0, 0.0]], true);
        assert!(c.is_none());
        let c = sample_polyline(&[[0.0, 0.0], [0.0, 0.0], [5.0, 0.0]], false).unwrap();
        assert_eq!(c.points.len(), 2);
    }
}
