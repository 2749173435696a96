use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use shared::{SceneConfig, SceneKey};

use super::{validate_key, PersistenceError, SceneStore};

/// One JSON file per key: `<root>/<tenant>/<entityType>/<entityId>.json`
#[derive(Debug, Clone)]
pub struct FileSceneStore {
    root: PathBuf,
}

impl FileSceneStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform data directory
    pub fn default_root() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "configurator", "configurator")
            .map(|dirs| dirs.data_dir().join("scenes"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &SceneKey) -> Result<PathBuf, PersistenceError> {
        validate_key(key)?;
        Ok(self
            .root
            .join(&key.tenant_id)
            .join(&key.entity_type)
            .join(format!("{}.json", key.entity_id)))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io { path: path.to_path_buf(), source }
}

impl SceneStore for FileSceneStore {
    async fn load(&self, key: &SceneKey) -> Result<Option<serde_json::Value>, PersistenceError> {
        let path = self.path_for(key)?;
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn save(&self, key: &SceneKey, config: &SceneConfig) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        let json = serde_json::to_string_pretty(config)?;
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(io_error(&dir))?;

        // Write beside the target then rename, so readers never see a partial file
        let tmp = dir.join(format!(".{}.{}.tmp", key.entity_id, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&path)(e));
        }
        tracing::debug!(%key, path = %path.display(), "scene saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::door_scene;

    fn temp_store() -> FileSceneStore {
        FileSceneStore::new(std::env::temp_dir().join(format!("scene-store-{}", uuid::Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = temp_store();
        let key = SceneKey::new("acme", "door", "42");
        assert_eq!(store.load(&key).await.unwrap(), None);

        let config = door_scene();
        store.save(&key, &config).await.unwrap();
        let path = store.path_for(&key).unwrap();
        assert!(path.ends_with("acme/door/42.json"));

        let value = store.load(&key).await.unwrap().unwrap();
        let back: SceneConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);

        // No temp files left behind
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = temp_store();
        let key = SceneKey::new("acme", "door", "7");
        let mut config = door_scene();
        store.save(&key, &config).await.unwrap();
        config.ui.show_grid = false;
        store.save(&key, &config).await.unwrap();
        let value = store.load(&key).await.unwrap().unwrap();
        assert_eq!(value["ui"]["showGrid"], serde_json::json!(false));
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn test_invalid_key_and_corrupt_file() {
        let store = temp_store();
        let bad = SceneKey::new("acme", "..", "1");
        assert!(matches!(store.load(&bad).await, Err(PersistenceError::InvalidKey(_))));

        let key = SceneKey::new("acme", "door", "broken");
        let path = store.path_for(&key).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(store.load(&key).await, Err(PersistenceError::Json(_))));
        let _ = std::fs::remove_dir_all(store.root());
    }
}
