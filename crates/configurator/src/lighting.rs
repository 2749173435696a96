//! Three-point studio rig derived purely from the product's horizontal footprint.

use serde::Serialize;
use shared::{LightingConfig, MIN_SHADOW_CATCHER_DIAMETER};

/// Smallest footprint extent used for placement (mm)
pub const MIN_EXTENT: f64 = 100.0;

const KEY_DISTANCE: f64 = 1.5;
const KEY_HEIGHT: f64 = 1.2;
const KEY_OFFSET: f64 = 0.7;
const FILL_OFFSET: [f64; 2] = [-0.5, 0.6];
const FILL_HEIGHT: f64 = 0.6;
const RIM_OFFSET: [f64; 2] = [-0.3, -0.9];
const RIM_HEIGHT: f64 = 0.8;
const FILL_INTENSITY: f64 = 0.5;
const RIM_INTENSITY: f64 = 0.7;
const SHADOW_MARGIN: f64 = 0.5;
const SHADOW_FAR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionalLight {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub intensity: f64,
    pub cast_shadow: bool,
}

/// Orthographic frustum of the key light's shadow map
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowCamera {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub near: f64,
    pub far: f64,
}

/// Ground disc that only receives shadows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowCatcher {
    pub center: [f64; 3],
    pub diameter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingRig {
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
    pub rim: DirectionalLight,
    pub ambient_intensity: f64,
    pub shadow_camera: ShadowCamera,
    pub shadow_catcher: ShadowCatcher,
    /// Set when the derived values were unusable and the fixed rig was substituted
    pub fallback: bool,
}

impl LightingRig {
    /// Hard-coded rig for a 1 m footprint at the origin
    pub fn safe() -> Self {
        Self {
            key: DirectionalLight {
                position: [1050.0, 1200.0, 1050.0],
                target: [0.0; 3],
                intensity: 1.0,
                cast_shadow: true,
            },
            fill: DirectionalLight {
                position: [-750.0, 720.0, 900.0],
                target: [0.0; 3],
                intensity: 0.5,
                cast_shadow: false,
            },
            rim: DirectionalLight {
                position: [-450.0, 960.0, -1350.0],
                target: [0.0; 3],
                intensity: 0.7,
                cast_shadow: false,
            },
            ambient_intensity: 0.5,
            shadow_camera: ShadowCamera {
                left: -1000.0,
                right: 1000.0,
                top: 1000.0,
                bottom: -1000.0,
                near: 1.0,
                far: 4000.0,
            },
            shadow_catcher: ShadowCatcher { center: [0.0; 3], diameter: 3000.0 },
            fallback: true,
        }
    }

    fn is_usable(&self) -> bool {
        let lights = [self.key, self.fill, self.rim];
        let finite = lights.iter().all(|l| {
            l.position.iter().chain(&l.target).all(|v| v.is_finite()) && l.intensity.is_finite()
        });
        let cam = &self.shadow_camera;
        finite
            && self.ambient_intensity.is_finite()
            && lights.iter().all(|l| l.position[1] > 0.0 && l.intensity >= 0.0)
            // An all-black rig is never usable
            && (self.key.intensity > 0.0 || self.ambient_intensity > 0.0)
            && [cam.left, cam.right, cam.top, cam.bottom, cam.near, cam.far].iter().all(|v| v.is_finite())
            && cam.right > 0.0
            && cam.far > cam.near
            && self.shadow_catcher.diameter.is_finite()
            && self.shadow_catcher.diameter > 0.0
    }
}

fn midpoint(bounds: [f64; 2]) -> f64 {
    (bounds[0] + bounds[1]) / 2.0
}

/// Derive the rig from `bounds_x`/`bounds_z`; unusable results fall back to `LightingRig::safe`
pub fn derive_lighting(config: &LightingConfig) -> LightingRig {
    let cx = midpoint(config.bounds_x);
    let cz = midpoint(config.bounds_z);
    let span_x = (config.bounds_x[1] - config.bounds_x[0]).abs();
    let span_z = (config.bounds_z[1] - config.bounds_z[0]).abs();
    let extent = span_x.max(span_z).max(MIN_EXTENT);

    let distance = extent * KEY_DISTANCE;
    let key_height = extent * KEY_HEIGHT;
    let target = [cx, 0.0, cz];

    let light = |offset: [f64; 2], height: f64, intensity: f64, cast_shadow: bool| DirectionalLight {
        position: [cx + offset[0] * distance, height, cz + offset[1] * distance],
        target,
        intensity,
        cast_shadow,
    };

    let intensity = config.intensity;
    let half = extent / 2.0 + extent * SHADOW_MARGIN;
    let rig = LightingRig {
        key: light([KEY_OFFSET, KEY_OFFSET], key_height, intensity, config.cast_shadows),
        fill: light(FILL_OFFSET, key_height * FILL_HEIGHT, intensity * FILL_INTENSITY, false),
        rim: light(RIM_OFFSET, key_height * RIM_HEIGHT, intensity * RIM_INTENSITY, false),
        ambient_intensity: config.ambient_intensity,
        shadow_camera: ShadowCamera {
            left: -half,
            right: half,
            top: half,
            bottom: -half,
            near: 1.0,
            far: extent * SHADOW_FAR,
        },
        shadow_catcher: ShadowCatcher {
            center: target,
            diameter: config.shadow_catcher_diameter.max(MIN_SHADOW_CATCHER_DIAMETER),
        },
        fallback: false,
    };

    if rig.is_usable() {
        rig
    } else {
        tracing::debug!(?config.bounds_x, ?config.bounds_z, "lighting derivation not finite, using safe rig");
        LightingRig::safe()
    }
}
