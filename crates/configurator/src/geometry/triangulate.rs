//! Ear-clipping triangulation of a polygon with holes.
//!
//! Holes are merged into the outer ring through bridge edges (rightmost hole
//! vertex first), then the single resulting ring is ear-clipped.

use glam::DVec2;

use crate::curve::{dedup_points, signed_area};

const EPS: f64 = 1e-12;

/// Triangles indexing into `points` (outer ring first, then each hole)
#[derive(Debug, Clone, PartialEq)]
pub struct Triangulation {
    /// Outer ring counterclockwise, holes clockwise
    pub points: Vec<DVec2>,
    /// Counterclockwise triangles
    pub triangles: Vec<[u32; 3]>,
    /// Start offset and length of each ring in `points`
    pub rings: Vec<(usize, usize)>,
}

pub fn triangulate(outer: &[DVec2], holes: &[Vec<DVec2>]) -> Option<Triangulation> {
    let mut outer = outer.to_vec();
    dedup_points(&mut outer, true);
    if outer.len() < 3 || signed_area(&outer).abs() < EPS {
        return None;
    }
    if signed_area(&outer) < 0.0 {
        outer.reverse();
    }

    let mut points = outer.clone();
    let mut rings = vec![(0, outer.len())];
    let mut ring: Vec<usize> = (0..outer.len()).collect();

    let mut hole_rings: Vec<Vec<usize>> = Vec::new();
    for hole in holes {
        let mut hole = hole.clone();
        dedup_points(&mut hole, true);
        if hole.len() < 3 || signed_area(&hole).abs() < EPS {
            tracing::debug!(points = hole.len(), "skipping degenerate hole");
            continue;
        }
        if signed_area(&hole) > 0.0 {
            hole.reverse();
        }
        let start = points.len();
        rings.push((start, hole.len()));
        hole_rings.push((start..start + hole.len()).collect());
        points.extend(hole);
    }

    // Bridge holes right to left so earlier bridges never block later ones
    hole_rings.sort_by(|a, b| {
        let ax = rightmost(a, &points).1;
        let bx = rightmost(b, &points).1;
        bx.total_cmp(&ax)
    });
    for hole in &hole_rings {
        ring = bridge_hole(&ring, hole, &points)?;
    }

    let triangles = earclip(ring, &points, area_tolerance(&points))?;
    Some(Triangulation { points, triangles, rings })
}

/// Orientation tolerance scaled to the squared size of the input
fn area_tolerance(points: &[DVec2]) -> f64 {
    let (min, max) = points
        .iter()
        .fold((DVec2::INFINITY, DVec2::NEG_INFINITY), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = (max - min).length_squared();
    (extent * 1e-12).max(EPS)
}

/// Position in `ring` of the vertex with the largest x, and that x
fn rightmost(ring: &[usize], points: &[DVec2]) -> (usize, f64) {
    let mut best = 0;
    for (i, &idx) in ring.iter().enumerate() {
        let p = points[idx];
        let b = points[ring[best]];
        if p.x > b.x || (p.x == b.x && p.y < b.y) {
            best = i;
        }
    }
    (best, points[ring[best]].x)
}

fn bridge_hole(ring: &[usize], hole: &[usize], points: &[DVec2]) -> Option<Vec<usize>> {
    let (hole_pos, _) = rightmost(hole, points);
    let h = points[hole[hole_pos]];
    let target = find_bridge(ring, h, points)?;

    // ring[..=target], hole from h around back to h, ring[target], rest of ring
    let mut merged = Vec::with_capacity(ring.len() + hole.len() + 2);
    merged.extend_from_slice(&ring[..=target]);
    for k in 0..=hole.len() {
        merged.push(hole[(hole_pos + k) % hole.len()]);
    }
    merged.push(ring[target]);
    merged.extend_from_slice(&ring[target + 1..]);
    Some(merged)
}

/// Ring position of a vertex visible from `h`, preferring the edge hit by a ray towards +X
fn find_bridge(ring: &[usize], h: DVec2, points: &[DVec2]) -> Option<usize> {
    let n = ring.len();
    let mut best_x = f64::INFINITY;
    let mut best_edge = None;
    for i in 0..n {
        let a = points[ring[i]];
        let b = points[ring[(i + 1) % n]];
        if (a.y > h.y) != (b.y > h.y) {
            let t = (h.y - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);
            if x >= h.x && x < best_x {
                best_x = x;
                best_edge = Some((i, (i + 1) % n));
            }
        }
    }

    if let Some((i, j)) = best_edge {
        let candidates = if points[ring[i]].x > points[ring[j]].x { [i, j] } else { [j, i] };
        for cand in candidates {
            if is_visible(h, points[ring[cand]], ring, points) {
                return Some(cand);
            }
        }
    }

    // Nearest visible vertex
    (0..n)
        .filter(|&i| is_visible(h, points[ring[i]], ring, points))
        .min_by(|&i, &j| {
            let di = points[ring[i]].distance_squared(h);
            let dj = points[ring[j]].distance_squared(h);
            di.total_cmp(&dj)
        })
}

fn is_visible(from: DVec2, to: DVec2, ring: &[usize], points: &[DVec2]) -> bool {
    let n = ring.len();
    (0..n).all(|i| {
        let a = points[ring[i]];
        let b = points[ring[(i + 1) % n]];
        !segments_cross(from, to, a, b)
    })
}

/// Proper crossing; touching at shared endpoints does not count
fn segments_cross(p1: DVec2, p2: DVec2, q1: DVec2, q2: DVec2) -> bool {
    let shares_end = |a: DVec2| a.distance_squared(p1) < EPS || a.distance_squared(p2) < EPS;
    if shares_end(q1) || shares_end(q2) {
        return false;
    }
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS)) && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
}

fn orient(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_in_triangle(a: DVec2, b: DVec2, c: DVec2, p: DVec2, eps: f64) -> bool {
    orient(a, b, p) >= -eps && orient(b, c, p) >= -eps && orient(c, a, p) >= -eps
}

fn earclip(mut ring: Vec<usize>, points: &[DVec2], eps: f64) -> Option<Vec<[u32; 3]>> {
    let mut triangles = Vec::with_capacity(ring.len().saturating_sub(2));
    let mut i = 0;
    let mut misses = 0;

    while ring.len() > 3 {
        let n = ring.len();
        i %= n;
        let prev = ring[(i + n - 1) % n];
        let cur = ring[i];
        let next = ring[(i + 1) % n];
        let (a, b, c) = (points[prev], points[cur], points[next]);
        let turn = orient(a, b, c);

        if turn.abs() <= eps {
            // Collinear vertex, or a zero-width spike left over from a bridge
            ring.remove(i);
            if a.distance_squared(c) < EPS && ring.len() > 3 {
                let next_pos = i % ring.len();
                ring.remove(next_pos);
            }
            misses = 0;
            continue;
        }

        if turn > eps && is_ear(&ring, i, points, eps) {
            triangles.push([prev as u32, cur as u32, next as u32]);
            ring.remove(i);
            misses = 0;
            continue;
        }

        i += 1;
        misses += 1;
        if misses > n {
            tracing::debug!(remaining = n, "ear clipping stalled");
            return None;
        }
    }

    if ring.len() == 3 {
        let (a, b, c) = (points[ring[0]], points[ring[1]], points[ring[2]]);
        if orient(a, b, c) > eps {
            triangles.push([ring[0] as u32, ring[1] as u32, ring[2] as u32]);
        }
    }
    (!triangles.is_empty()).then_some(triangles)
}

fn is_ear(ring: &[usize], i: usize, points: &[DVec2], eps: f64) -> bool {
    let n = ring.len();
    let a = points[ring[(i + n - 1) % n]];
    let b = points[ring[i]];
    let c = points[ring[(i + 1) % n]];

    ring.iter().all(|&idx| {
        let p = points[idx];
        // Bridge duplicates sit exactly on the triangle corners
        let is_corner = [a, b, c].iter().any(|q| q.distance_squared(p) < EPS);
        is_corner || !point_in_triangle(a, b, c, p, eps)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(-half, -half),
            DVec2::new(half, -half),
            DVec2::new(half, half),
            DVec2::new(-half, half),
        ]
    }

    fn area(t: &Triangulation) -> f64 {
        t.triangles
            .iter()
            .map(|[a, b, c]| {
                let (a, b, c) = (t.points[*a as usize], t.points[*b as usize], t.points[*c as usize]);
                orient(a, b, c) / 2.0
            })
            .sum()
    }

    #[test]
    fn test_square() {
        let t = triangulate(&square(1.0), &[]).unwrap();
        assert_eq!(t.triangles.len(), 2);
        assert!((area(&t) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_clockwise_outer_is_reoriented() {
        let mut cw = square(1.0);
        cw.reverse();
        let t = triangulate(&cw, &[]).unwrap();
        assert!(signed_area(&t.points[..4]) > 0.0);
        assert!((area(&t) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_concave_l_shape() {
        let l = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(0.0, 2.0),
        ];
        let t = triangulate(&l, &[]).unwrap();
        assert_eq!(t.triangles.len(), 4);
        assert!((area(&t) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_square_with_hole() {
        let t = triangulate(&square(10.0), &[square(2.0)]).unwrap();
        assert!((area(&t) - (400.0 - 16.0)).abs() < 1e-9);
        assert_eq!(t.rings, vec![(0, 4), (4, 4)]);
        // Holes are stored clockwise
        assert!(signed_area(&t.points[4..8]) < 0.0);
    }

    #[test]
    fn test_two_holes() {
        let left: Vec<DVec2> = square(1.0).iter().map(|p| *p + DVec2::new(-4.0, 0.0)).collect();
        let right: Vec<DVec2> = square(1.0).iter().map(|p| *p + DVec2::new(4.0, 0.0)).collect();
        let t = triangulate(&square(10.0), &[left, right]).unwrap();
        assert!((area(&t) - (400.0 - 8.0)).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(triangulate(&[DVec2::ZERO, DVec2::X], &[]).is_none());
        let line = vec![DVec2::ZERO, DVec2::X, DVec2::new(2.0, 0.0)];
        assert!(triangulate(&line, &[]).is_none());
        // Degenerate holes are skipped, not fatal
        let t = triangulate(&square(1.0), &[vec![DVec2::ZERO, DVec2::ZERO]]).unwrap();
        assert_eq!(t.rings.len(), 1);
    }
}
