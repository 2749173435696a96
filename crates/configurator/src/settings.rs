//! Engine settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::{CameraController, DEFAULT_DEBOUNCE, DEFAULT_FIT_MARGIN, DEFAULT_FRUSTUM_HEIGHT};
use crate::persistence::FileSceneStore;

const ENV_PREFIX: &str = "CONFIGURATOR_";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "configurator", "configurator")
}

/// All engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Idle time before camera and scene changes are persisted
    pub debounce_ms: u64,
    /// Orthographic frustum height in mm
    pub frustum_height: f64,
    /// Space left around the product by ortho auto-zoom
    pub fit_margin: f64,
    /// Root of the file store; platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// Scene-state service; the file store is used when unset
    pub remote_base_url: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            frustum_height: DEFAULT_FRUSTUM_HEIGHT,
            fit_margin: DEFAULT_FIT_MARGIN,
            data_dir: None,
            remote_base_url: None,
        }
    }
}

impl EngineSettings {
    /// Settings file, then `CONFIGURATOR_*` environment overrides
    pub fn load() -> Self {
        let mut settings = project_dirs()
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_default();
        settings.apply_env(|name| std::env::var(name).ok());
        settings
    }

    /// Read one settings file; unreadable or malformed files yield `None`
    pub fn load_from(path: &Path) -> Option<Self> {
        let json = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
                None
            }
        }
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());

        if let Some(ms) = var("DEBOUNCE_MS").and_then(|v| v.trim().parse().ok()) {
            self.debounce_ms = ms;
        }
        if let Some(h) = var("FRUSTUM_HEIGHT").and_then(|v| v.trim().parse::<f64>().ok()) {
            if h.is_finite() && h > 0.0 {
                self.frustum_height = h;
            }
        }
        if let Some(m) = var("FIT_MARGIN").and_then(|v| v.trim().parse::<f64>().ok()) {
            if m.is_finite() && m > 0.0 {
                self.fit_margin = m;
            }
        }
        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var("REMOTE_URL") {
            self.remote_base_url = Some(url);
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Apply the camera-related settings to a controller
    pub fn configure_camera(&self, camera: CameraController) -> CameraController {
        camera
            .with_debounce(self.debounce())
            .with_frustum(self.frustum_height, self.fit_margin)
    }

    /// File store rooted at `data_dir`, or at the platform data dir
    pub fn file_store(&self) -> FileSceneStore {
        let root = self
            .data_dir
            .clone()
            .or_else(FileSceneStore::default_root)
            .unwrap_or_else(|| PathBuf::from("scenes"));
        FileSceneStore::new(root)
    }
}
