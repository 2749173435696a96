//! Camera controller: perspective/orthographic mode switching, drag
//! lifecycle and debounced commits of the persisted pose.
//!
//! Live mutations apply immediately to `state()`. The persisted copy only
//! changes through `tick`, once the debounce window has passed without any
//! interaction, or through `teardown`.

use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use serde::Serialize;
use shared::{CameraMode, CameraPose, CameraState, ProductDimensions, ZOOM_SENTINEL};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);
/// Orthographic frustum height in world units (mm)
pub const DEFAULT_FRUSTUM_HEIGHT: f64 = 2000.0;
/// Space left around the product by auto-zoom
pub const DEFAULT_FIT_MARGIN: f64 = 1.2;

pub const MIN_ZOOM: f64 = 0.01;
pub const MAX_ZOOM: f64 = 100.0;

const NEAR: f32 = 1.0;
const FAR: f32 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 800.0, height: 600.0 }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width over height; 1 for degenerate sizes
    pub fn aspect(&self) -> f64 {
        let aspect = self.width / self.height;
        if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        }
    }
}

/// Unzoomed orthographic frustum bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrthoFrustum {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Matrices handed to the renderer, column-major
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraProjection {
    pub mode: CameraMode,
    pub view: [f32; 16],
    pub projection: [f32; 16],
    pub zoom: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frustum: Option<OrthoFrustum>,
    pub fallback: bool,
}

impl CameraProjection {
    /// Default perspective view of a door-sized product
    pub fn safe(viewport: Viewport) -> Self {
        let pose = CameraPose::default_for(CameraMode::Perspective);
        let view = Mat4::look_at_rh(to_vec3(pose.position), to_vec3(pose.target), Vec3::Y);
        let projection = Mat4::perspective_rh_gl(
            (pose.fov as f32).to_radians(),
            viewport.aspect() as f32,
            NEAR,
            FAR,
        );
        Self {
            mode: CameraMode::Perspective,
            view: view.to_cols_array(),
            projection: projection.to_cols_array(),
            zoom: ZOOM_SENTINEL,
            frustum: None,
            fallback: true,
        }
    }

    fn is_finite(&self) -> bool {
        self.view.iter().chain(&self.projection).all(|v| v.is_finite()) && self.zoom.is_finite()
    }
}

fn to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

/// Zoom that fits a `product_w` x `product_h` rectangle into the ortho frustum.
///
/// Returns `None` when the product has no usable size.
pub fn auto_zoom(product_w: f64, product_h: f64, viewport: Viewport, frustum_height: f64, margin: f64) -> Option<f64> {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(product_w) || !usable(product_h) || !usable(frustum_height) || !usable(margin) {
        return None;
    }
    let frustum_w = frustum_height * viewport.aspect();
    let zoom = (frustum_w / (product_w * margin)).min(frustum_height / (product_h * margin));
    Some(zoom.clamp(MIN_ZOOM, MAX_ZOOM))
}

pub struct CameraController {
    state: CameraState,
    committed: CameraState,
    viewport: Viewport,
    interacting: bool,
    /// Time of the last change still waiting to be committed
    pending_since: Option<Instant>,
    debounce: Duration,
    frustum_height: f64,
    fit_margin: f64,
}

impl CameraController {
    pub fn new(state: CameraState, viewport: Viewport) -> Self {
        Self {
            committed: state.clone(),
            state,
            viewport,
            interacting: false,
            pending_since: None,
            debounce: DEFAULT_DEBOUNCE,
            frustum_height: DEFAULT_FRUSTUM_HEIGHT,
            fit_margin: DEFAULT_FIT_MARGIN,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_frustum(mut self, frustum_height: f64, fit_margin: f64) -> Self {
        if frustum_height.is_finite() && frustum_height > 0.0 {
            self.frustum_height = frustum_height;
        }
        if fit_margin.is_finite() && fit_margin > 0.0 {
            self.fit_margin = fit_margin;
        }
        self
    }

    /// Live state, including uncommitted changes
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Last committed state
    pub fn committed(&self) -> &CameraState {
        &self.committed
    }

    pub fn mode(&self) -> CameraMode {
        self.state.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn has_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    fn mark_dirty(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// Park the active pose and switch to the other mode
    pub fn toggle_mode(&mut self, now: Instant) {
        let next = match self.state.mode {
            CameraMode::Perspective => CameraMode::Ortho,
            CameraMode::Ortho => CameraMode::Perspective,
        };
        let outgoing = self.state.pose();
        let incoming = self.state.parked_pose.take().unwrap_or_else(|| CameraPose::default_for(next));
        self.state = CameraState {
            parked_pose: Some(outgoing),
            ..CameraState::from_pose(next, incoming)
        };
        tracing::debug!(mode = ?next, "camera mode switched");
        self.mark_dirty(now);
    }

    pub fn begin_interaction(&mut self, _now: Instant) {
        self.interacting = true;
    }

    /// End of a drag; the debounce window starts now
    pub fn end_interaction(&mut self, now: Instant) {
        self.interacting = false;
        self.mark_dirty(now);
    }

    /// Live pose update from the orbit controls
    pub fn set_pose(&mut self, pose: CameraPose, now: Instant) {
        self.state.set_pose(pose);
        self.mark_dirty(now);
    }

    /// Explicit zoom; exactly `ZOOM_SENTINEL` hands control back to auto-fit
    pub fn set_zoom(&mut self, zoom: f64, now: Instant) {
        if !zoom.is_finite() || zoom <= 0.0 {
            tracing::debug!(zoom, "ignoring unusable zoom");
            return;
        }
        self.state.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.mark_dirty(now);
    }

    /// Only the orthographic frustum depends on the viewport
    pub fn resize(&mut self, width: f64, height: f64) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.viewport = Viewport::new(width, height);
        }
    }

    /// Unzoomed orthographic frustum for the current viewport
    pub fn ortho_frustum(&self) -> OrthoFrustum {
        let half_h = self.frustum_height / 2.0;
        let half_w = half_h * self.viewport.aspect();
        OrthoFrustum { left: -half_w, right: half_w, top: half_h, bottom: -half_h }
    }

    /// Zoom used for rendering; the sentinel in ortho mode means auto-fit
    pub fn effective_zoom(&self, product: &ProductDimensions) -> f64 {
        if self.state.mode == CameraMode::Ortho && self.state.zoom == ZOOM_SENTINEL {
            auto_zoom(product.width, product.height, self.viewport, self.frustum_height, self.fit_margin)
                .unwrap_or(ZOOM_SENTINEL)
        } else {
            self.state.zoom
        }
    }

    /// Pose to persist, once the idle window has elapsed without interaction
    pub fn tick(&mut self, now: Instant) -> Option<CameraState> {
        let since = self.pending_since?;
        if self.interacting || now.saturating_duration_since(since) < self.debounce {
            return None;
        }
        Some(self.commit())
    }

    /// Pending pose, if any, for a synchronous flush on shutdown
    pub fn teardown(&mut self) -> Option<CameraState> {
        self.pending_since?;
        self.interacting = false;
        Some(self.commit())
    }

    fn commit(&mut self) -> CameraState {
        self.pending_since = None;
        self.committed = self.state.clone();
        self.committed.clone()
    }

    pub fn projection(&self, product: &ProductDimensions) -> CameraProjection {
        let eye = to_vec3(self.state.position);
        let target = to_vec3(self.state.target);
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let zoom = self.effective_zoom(product);

        let (projection, frustum) = match self.state.mode {
            CameraMode::Perspective => {
                let fov = (self.state.fov as f32).to_radians();
                (Mat4::perspective_rh_gl(fov, self.viewport.aspect() as f32, NEAR, FAR), None)
            }
            CameraMode::Ortho => {
                let f = self.ortho_frustum();
                let z = zoom as f32;
                let m = Mat4::orthographic_rh_gl(
                    f.left as f32 / z,
                    f.right as f32 / z,
                    f.bottom as f32 / z,
                    f.top as f32 / z,
                    NEAR,
                    FAR,
                );
                (m, Some(f))
            }
        };

        let out = CameraProjection {
            mode: self.state.mode,
            view: view.to_cols_array(),
            projection: projection.to_cols_array(),
            zoom,
            frustum,
            fallback: false,
        };
        if eye.distance_squared(target) > 0.0 && out.is_finite() {
            out
        } else {
            tracing::debug!(mode = ?self.state.mode, "camera projection not finite, using safe default");
            CameraProjection::safe(self.viewport)
        }
    }
}
