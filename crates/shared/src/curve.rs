//! Abstract curve definitions consumed by the curve flattener.

use serde::{Deserialize, Deserializer, Serialize};

/// Fewest segments a curve is flattened into (below this arcs look faceted)
pub const MIN_RESOLUTION: u32 = 8;
/// Most segments a curve is flattened into
pub const MAX_RESOLUTION: u32 = 256;
pub const DEFAULT_RESOLUTION: u32 = 32;

/// Clamp a requested segment count into the supported range
pub fn clamp_resolution(requested: u32) -> u32 {
    requested.clamp(MIN_RESOLUTION, MAX_RESOLUTION)
}

/// Resolution from an arbitrary JSON number (fractional, negative, huge)
pub fn resolution_from_f64(raw: f64) -> u32 {
    if !raw.is_finite() {
        return DEFAULT_RESOLUTION;
    }
    raw.round()
        .clamp(MIN_RESOLUTION as f64, MAX_RESOLUTION as f64) as u32
}

fn default_resolution() -> u32 {
    DEFAULT_RESOLUTION
}

fn deserialize_resolution<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(resolution_from_f64(raw))
}

fn default_end_angle() -> f64 {
    std::f64::consts::TAU
}

fn default_tension() -> f64 {
    0.5
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// Geometric shape of a curve, in millimetres on the XY plane.
///
/// Angles are radians. Arcs and ellipses sweep from `start_angle` to
/// `end_angle` (counterclockwise when `end > start`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CurveShape {
    Arc {
        center: [f64; 2],
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Ellipse {
        center: [f64; 2],
        radius_x: f64,
        radius_y: f64,
        #[serde(default)]
        rotation: f64,
        #[serde(default)]
        start_angle: f64,
        #[serde(default = "default_end_angle")]
        end_angle: f64,
    },
    /// 2 points: line, 3: quadratic, 4: cubic, 3n+1: chained cubics
    Bezier {
        points: Vec<[f64; 2]>,
    },
    Polyline {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        closed: bool,
    },
    /// Catmull-Rom spline through `points`
    Spline {
        points: Vec<[f64; 2]>,
        #[serde(default)]
        closed: bool,
        #[serde(default = "default_tension")]
        tension: f64,
    },

    // ── Architectural presets ──
    // `origin` is the midpoint of the spring line (radius head: of the sill).

    SegmentalArch {
        span: f64,
        rise: f64,
        #[serde(default)]
        origin: [f64; 2],
    },
    RadiusHead {
        radius: f64,
        spring_line_height: f64,
        span: f64,
        #[serde(default)]
        origin: [f64; 2],
    },
    GothicArch {
        span: f64,
        apex_height: f64,
        shoulder_radius: f64,
        #[serde(default)]
        origin: [f64; 2],
    },
}

impl CurveShape {
    /// Whether the shape is one of the named architectural presets
    pub fn is_preset(&self) -> bool {
        matches!(
            self,
            CurveShape::SegmentalArch { .. }
                | CurveShape::RadiusHead { .. }
                | CurveShape::GothicArch { .. }
        )
    }
}

/// A curve plus its flattening parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveDefinition {
    #[serde(flatten)]
    pub shape: CurveShape,
    /// Segment count used when flattening; always within [8, 256]
    #[serde(
        default = "default_resolution",
        deserialize_with = "deserialize_resolution"
    )]
    pub resolution: u32,
    /// Signed perpendicular distance in mm (+ outward, - inward)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: f64,
}

impl CurveDefinition {
    pub fn new(shape: CurveShape, resolution: u32) -> Self {
        Self {
            shape,
            resolution: clamp_resolution(resolution),
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn set_resolution(&mut self, requested: u32) {
        self.resolution = clamp_resolution(requested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_clamped_on_construction() {
        let shape = CurveShape::Polyline { points: vec![], closed: false };
        assert_eq!(CurveDefinition::new(shape.clone(), 4).resolution, 8);
        assert_eq!(CurveDefinition::new(shape.clone(), 1000).resolution, 256);
        assert_eq!(CurveDefinition::new(shape, 64).resolution, 64);
    }

    #[test]
    fn test_resolution_clamped_on_deserialize() {
        let c: CurveDefinition = serde_json::from_str(
            r#"{"type":"arc","center":[0,0],"radius":10,"startAngle":0,"endAngle":3.14,"resolution":4}"#,
        )
        .unwrap();
        assert_eq!(c.resolution, 8);

        let c: CurveDefinition = serde_json::from_str(
            r#"{"type":"polyline","points":[[0,0],[1,1]],"resolution":1000.7}"#,
        )
        .unwrap();
        assert_eq!(c.resolution, 256);
    }

    #[test]
    fn test_missing_resolution_uses_default() {
        let c: CurveDefinition =
            serde_json::from_str(r#"{"type":"segmentalArch","span":1000,"rise":300}"#).unwrap();
        assert_eq!(c.resolution, DEFAULT_RESOLUTION);
        assert_eq!(c.offset, 0.0);
        assert!(c.shape.is_preset());
    }

    #[test]
    fn test_curve_json_shape() {
        let c = CurveDefinition::new(
            CurveShape::GothicArch {
                span: 900.0,
                apex_height: 700.0,
                shoulder_radius: 800.0,
                origin: [0.0, 2000.0],
            },
            48,
        )
        .with_offset(-12.0);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains(r#""type":"gothicArch""#));
        assert!(json.contains(r#""apexHeight":700.0"#));
        assert!(json.contains(r#""offset":-12.0"#));
        let back: CurveDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_unknown_curve_type_fails() {
        let result: Result<CurveDefinition, _> =
            serde_json::from_str(r#"{"type":"nurbs","points":[]}"#);
        assert!(result.is_err());
    }
}
