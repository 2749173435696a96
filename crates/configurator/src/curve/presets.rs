//! Architectural arch presets expressed as circular arc pieces.
//!
//! All presets are built with the spring-line midpoint at the origin and run
//! left springer -> crown -> right springer.

use std::f64::consts::{PI, TAU};

use glam::DVec2;

/// One circular arc, swept linearly from `start_angle` to `end_angle` (radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPiece {
    pub center: DVec2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ArcPiece {
    pub fn angle_at(&self, t: f64) -> f64 {
        self.start_angle + (self.end_angle - self.start_angle) * t
    }

    pub fn point_at(&self, t: f64) -> DVec2 {
        let a = self.angle_at(t);
        self.center + DVec2::new(a.cos(), a.sin()) * self.radius
    }

    /// Unit vector pointing away from the centre
    pub fn normal_at(&self, t: f64) -> DVec2 {
        let a = self.angle_at(t);
        DVec2::new(a.cos(), a.sin())
    }

    pub fn sweep(&self) -> f64 {
        (self.end_angle - self.start_angle).abs()
    }
}

/// A preset flattened to its arc pieces
#[derive(Debug, Clone, PartialEq)]
pub struct ArchCurve {
    pub pieces: Vec<ArcPiece>,
    pub span: f64,
    /// Crown point
    pub apex: DVec2,
}

impl ArchCurve {
    /// Radius of the (first) arc piece
    pub fn radius(&self) -> f64 {
        self.pieces.first().map(|p| p.radius).unwrap_or(0.0)
    }

    pub fn translated(mut self, offset: DVec2) -> Self {
        for piece in &mut self.pieces {
            piece.center += offset;
        }
        self.apex += offset;
        self
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Circular segmental arch with chord `span` and sagitta `rise`.
///
/// `r = rise/2 + span²/(8·rise)`, centre `r - rise` below the spring line.
pub fn segmental_arch(span: f64, rise: f64) -> Option<ArchCurve> {
    if !positive(span) || !positive(rise) {
        return None;
    }
    let half = span / 2.0;
    let radius = rise / 2.0 + span * span / (8.0 * rise);
    let drop = radius - rise;
    let springer = drop.atan2(half);

    Some(ArchCurve {
        pieces: vec![ArcPiece {
            center: DVec2::new(0.0, -drop),
            radius,
            start_angle: PI - springer,
            end_angle: springer,
        }],
        span,
        apex: DVec2::new(0.0, rise),
    })
}

/// Radius head: an arc of `radius` springing at `spring_line_height`,
/// spanning `span`, crown at `spring_line_height + sagitta`.
///
/// A radius shorter than half the span cannot reach both springers and is
/// raised to `span / 2` (a semicircular head).
pub fn radius_head(radius: f64, spring_line_height: f64, span: f64) -> Option<ArchCurve> {
    if !positive(radius) || !positive(span) || !spring_line_height.is_finite() {
        return None;
    }
    let half = span / 2.0;
    let radius = radius.max(half);
    let sagitta = radius - (radius * radius - half * half).max(0.0).sqrt();
    let drop = radius - sagitta;
    let springer = drop.atan2(half);

    Some(ArchCurve {
        pieces: vec![ArcPiece {
            center: DVec2::new(0.0, spring_line_height - drop),
            radius,
            start_angle: PI - springer,
            end_angle: springer,
        }],
        span,
        apex: DVec2::new(0.0, spring_line_height + sagitta),
    })
}

/// Two-centred (gothic) arch: mirrored arcs of `shoulder_radius` meeting at
/// a point `apex_height` above the spring line.
///
/// The radius is raised to half the springer-to-apex chord when too small.
pub fn gothic_arch(span: f64, apex_height: f64, shoulder_radius: f64) -> Option<ArchCurve> {
    if !positive(span) || !positive(apex_height) || !positive(shoulder_radius) {
        return None;
    }
    let half = span / 2.0;
    let apex = DVec2::new(0.0, apex_height);
    let springer = DVec2::new(half, 0.0);

    let chord = springer - apex;
    let chord_len = chord.length();
    let radius = shoulder_radius.max(chord_len / 2.0);
    let mid = (apex + springer) / 2.0;
    let along = (radius * radius - chord_len * chord_len / 4.0).max(0.0).sqrt();
    // Centre lies on the inner side of the chord (down-left for the right arc)
    let inward = DVec2::new(chord.y, -chord.x) / chord_len;
    let center = mid + inward * along;

    let apex_angle = (apex - center).y.atan2((apex - center).x);
    let mut springer_angle = (springer - center).y.atan2((springer - center).x);
    if springer_angle > apex_angle {
        springer_angle -= TAU;
    }

    let right = ArcPiece {
        center,
        radius,
        start_angle: apex_angle,
        end_angle: springer_angle,
    };
    let left = ArcPiece {
        center: DVec2::new(-center.x, center.y),
        radius,
        start_angle: PI - springer_angle,
        end_angle: PI - apex_angle,
    };

    Some(ArchCurve {
        pieces: vec![left, right],
        span,
        apex,
    })
}
