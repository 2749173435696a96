// Library crate: scene-config engine shared by the CLI, the scene-state
// service and integration tests. Renderer resources stay with the host.

pub mod camera;
pub mod curve;
pub mod fixtures;
pub mod geometry;
pub mod lighting;
pub mod normalize;
pub mod persistence;
pub mod render;
pub mod session;
pub mod settings;
pub mod tree;
pub mod validation;
pub mod visibility;

pub use camera::{CameraController, CameraProjection, Viewport};
pub use geometry::{dispatch_geometry, GeometryDescriptor, MeshData};
pub use lighting::{derive_lighting, LightingRig};
pub use normalize::{normalize, normalize_config, normalize_with_report, NormalizeReport};
pub use persistence::{load_scene, Loaded, PersistenceError, SceneStore};
pub use render::{build_render_scene, render_for_viewport, RenderScene};
pub use session::SceneSession;
pub use settings::EngineSettings;
pub use tree::ComponentTree;
pub use visibility::{apply_visibility_map, resolve_visibility, toggle_visibility};
