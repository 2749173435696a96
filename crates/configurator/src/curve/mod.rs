//! Curve flattening: curve definitions and arch presets to point sequences.
//!
//! Everything here is pure and total. Unusable input (non-finite numbers,
//! too few points, zero radii) yields `None` instead of a panic.

mod offset;
mod presets;
mod sample;

use glam::{DVec2, DVec3};
use shared::{CurveDefinition, CurveShape};

pub use offset::offset_curve;
pub use presets::{gothic_arch, radius_head, segmental_arch, ArcPiece, ArchCurve};
pub(crate) use sample::{dedup_points, signed_area};

/// A curve sampled into points, each with the direction a positive offset moves it
#[derive(Debug, Clone, PartialEq)]
pub struct FlatCurve {
    pub points: Vec<DVec2>,
    /// Unit normals (outward for closed curves and arcs, left-hand for open curves)
    pub normals: Vec<DVec2>,
    /// The last point connects back to the first (no duplicate endpoint)
    pub closed: bool,
    /// Corners are real vertices rather than samples of a smooth curve
    pub sharp: bool,
}

impl FlatCurve {
    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p.is_finite()) && self.normals.iter().all(|n| n.is_finite())
    }
}

/// A curve lifted onto the XY plane for sweeping
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPath {
    pub points: Vec<DVec3>,
    pub closed: bool,
}

/// Build the arc pieces of an arch preset, translated to its origin
pub fn preset_arch(shape: &CurveShape) -> Option<ArchCurve> {
    let (arch, origin) = match shape {
        CurveShape::SegmentalArch { span, rise, origin } => (segmental_arch(*span, *rise), origin),
        CurveShape::RadiusHead { radius, spring_line_height, span, origin } => {
            (radius_head(*radius, *spring_line_height, *span), origin)
        }
        CurveShape::GothicArch { span, apex_height, shoulder_radius, origin } => {
            (gothic_arch(*span, *apex_height, *shoulder_radius), origin)
        }
        _ => return None,
    };
    let origin = sample::to_vec(*origin);
    if !origin.is_finite() {
        return None;
    }
    Some(arch?.translated(origin))
}

/// Flatten a curve definition into `resolution` segments, offset applied
pub fn flatten(def: &CurveDefinition) -> Option<FlatCurve> {
    let segments = shared::clamp_resolution(def.resolution);

    let base = match &def.shape {
        CurveShape::Arc { center, radius, start_angle, end_angle } => {
            // Inward offsets past the centre would turn the arc inside out
            if radius + def.offset <= 0.0 {
                tracing::debug!(radius, offset = def.offset, "arc offset collapses the curve");
                return None;
            }
            sample::sample_arc(sample::to_vec(*center), *radius, *start_angle, *end_angle, segments)
        }
        CurveShape::Ellipse { center, radius_x, radius_y, rotation, start_angle, end_angle } => {
            // Inward offsets reaching the tightest curvature radius fold the curve
            let tightest = radius_x.min(*radius_y).powi(2) / radius_x.max(*radius_y);
            if -def.offset >= tightest {
                tracing::debug!(radius_x, radius_y, offset = def.offset, "ellipse offset collapses the curve");
                return None;
            }
            sample::sample_ellipse(
                sample::to_vec(*center),
                *radius_x,
                *radius_y,
                *rotation,
                *start_angle,
                *end_angle,
                segments,
            )
        }
        CurveShape::Bezier { points } => sample::sample_bezier(points, segments),
        CurveShape::Polyline { points, closed } => sample::sample_polyline(points, *closed),
        CurveShape::Spline { points, closed, tension } => {
            sample::sample_spline(points, *closed, *tension, segments)
        }
        shape => preset_arch(shape).and_then(|arch| sample::sample_arch(&arch, segments)),
    }?;

    let curve = offset_curve(&base, def.offset);
    curve.is_finite().then_some(curve)
}

/// Flattened points as plain pairs; empty when the curve is unusable
pub fn flatten_points(def: &CurveDefinition) -> Vec<[f64; 2]> {
    flatten(def)
        .map(|c| c.points.iter().map(|p| [p.x, p.y]).collect())
        .unwrap_or_default()
}

/// Lift a flattened curve onto the XY plane (z = 0)
pub fn to_sweep_path(def: &CurveDefinition) -> Option<SweepPath> {
    let curve = flatten(def)?;
    if curve.points.len() < 2 {
        return None;
    }
    Some(SweepPath {
        points: curve.points.iter().map(|p| p.extend(0.0)).collect(),
        closed: curve.closed,
    })
}

/// Chain several curves end to end into one closed boundary.
///
/// Joints where one curve ends on the next one's start are merged.
pub fn chain_boundary(defs: &[CurveDefinition]) -> Option<Vec<DVec2>> {
    let mut boundary: Vec<DVec2> = Vec::new();
    for def in defs {
        let curve = flatten(def)?;
        boundary.extend(curve.points);
    }
    dedup_points(&mut boundary, true);
    (boundary.len() >= 3).then_some(boundary)
}
