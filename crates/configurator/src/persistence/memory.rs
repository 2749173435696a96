use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use shared::{SceneConfig, SceneKey};
use tokio::sync::Mutex;

use super::{validate_key, PersistenceError, SceneStore};

/// In-process store, used by tests and by hosts without durable storage
#[derive(Debug, Default)]
pub struct MemorySceneStore {
    docs: Mutex<HashMap<SceneKey, serde_json::Value>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    save_latency_ms: AtomicU64,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every save take `latency` before it lands
    pub fn set_save_latency(&self, latency: Duration) {
        self.save_latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Store a document verbatim, bypassing serialization
    pub async fn insert_raw(&self, key: &SceneKey, value: serde_json::Value) {
        self.docs.lock().await.insert(key.clone(), value);
    }

    pub async fn get_raw(&self, key: &SceneKey) -> Option<serde_json::Value> {
        self.docs.lock().await.get(key).cloned()
    }
}

impl SceneStore for MemorySceneStore {
    async fn load(&self, key: &SceneKey) -> Result<Option<serde_json::Value>, PersistenceError> {
        validate_key(key)?;
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("load disabled".into()));
        }
        Ok(self.docs.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &SceneKey, config: &SceneConfig) -> Result<(), PersistenceError> {
        validate_key(key)?;
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected("save disabled".into()));
        }
        let latency = self.save_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let value = serde_json::to_value(config)?;
        self.docs.lock().await.insert(key.clone(), value);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
