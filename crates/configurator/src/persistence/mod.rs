//! Scene persistence: key-addressed stores, normalized loading and
//! debounced saving.
//!
//! Load failures degrade to "not found" so the configurator always starts.
//! Save failures are reported once as a warning and never retried.

mod file;
mod http;
mod memory;
mod saver;

use std::future::Future;
use std::path::PathBuf;

use shared::{SceneConfig, SceneKey};

use crate::normalize::normalize;

pub use file::FileSceneStore;
pub use http::HttpSceneStore;
pub use memory::MemorySceneStore;
pub use saver::{DebouncedSaver, SaveWarning};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("invalid scene key segment '{0}'")]
    InvalidKey(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scene document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("scene service answered {0}")]
    Status(u16),
    #[error("store rejected the write: {0}")]
    Rejected(String),
    #[error("save task did not complete: {0}")]
    Interrupted(String),
}

/// Backend holding one JSON document per `SceneKey`
pub trait SceneStore: Send + Sync + 'static {
    /// Raw stored document, `None` when nothing is stored under `key`
    fn load(
        &self,
        key: &SceneKey,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, PersistenceError>> + Send;

    /// Overwrite the document stored under `key`
    fn save(
        &self,
        key: &SceneKey,
        config: &SceneConfig,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Result of loading a scene
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Found(SceneConfig),
    NotFound,
}

impl Loaded {
    /// The stored config, or defaults when nothing was stored
    pub fn into_config(self) -> SceneConfig {
        match self {
            Loaded::Found(config) => config,
            Loaded::NotFound => SceneConfig::default(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Loaded::Found(_))
    }
}

/// Load and normalize; any failure is logged and treated as not found
pub async fn load_scene<S: SceneStore>(store: &S, key: &SceneKey) -> Loaded {
    match store.load(key).await {
        Ok(Some(value)) => Loaded::Found(normalize(&value)),
        Ok(None) => Loaded::NotFound,
        Err(e) => {
            tracing::warn!(%key, error = %e, "scene load failed, starting from defaults");
            Loaded::NotFound
        }
    }
}

/// Key segments become path and URL segments, so only a safe alphabet is allowed
pub fn validate_key(key: &SceneKey) -> Result<(), PersistenceError> {
    for segment in [&key.tenant_id, &key.entity_type, &key.entity_id] {
        let safe = !segment.is_empty()
            && segment.len() <= 128
            && !segment.starts_with('.')
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !safe {
            return Err(PersistenceError::InvalidKey(segment.clone()));
        }
    }
    Ok(())
}
