use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shared::{SceneConfig, SceneKey};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{PersistenceError, SceneStore};

/// A save that failed; delivered once, never retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveWarning {
    pub key: SceneKey,
    pub message: String,
}

type SaveTask = JoinHandle<Result<(), PersistenceError>>;

/// State shared between the saver and its timer
#[derive(Default)]
struct Slot {
    /// Bumped by every `schedule` and `flush`; a timer only acts on its own
    generation: u64,
    config: Option<SceneConfig>,
    /// Save handed off by the last timer, possibly still running
    saving: Option<SaveTask>,
}

type SharedSlot = Arc<Mutex<Slot>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Last-write-wins saver with a single pending slot and one cancellable timer.
///
/// Each `schedule` replaces the pending document and restarts the timer.
/// When the timer fires, the write runs as its own task so that cancelling
/// the timer never interrupts it. `flush`/`shutdown` wait for that write,
/// then write whatever is still pending.
pub struct DebouncedSaver<S: SceneStore> {
    store: Arc<S>,
    key: SceneKey,
    delay: Duration,
    slot: SharedSlot,
    timer: Option<JoinHandle<()>>,
    warnings: mpsc::UnboundedSender<SaveWarning>,
}

impl<S: SceneStore> DebouncedSaver<S> {
    /// Must be called inside a tokio runtime; warnings arrive on the returned receiver
    pub fn new(store: Arc<S>, key: SceneKey, delay: Duration) -> (Self, mpsc::UnboundedReceiver<SaveWarning>) {
        let (warnings, rx) = mpsc::unbounded_channel();
        let saver = Self {
            store,
            key,
            delay,
            slot: SharedSlot::default(),
            timer: None,
            warnings,
        };
        (saver, rx)
    }

    pub fn key(&self) -> &SceneKey {
        &self.key
    }

    /// A document is waiting for its timer
    pub fn has_pending(&self) -> bool {
        lock(&self.slot).config.is_some()
    }

    /// The timer holds no awaits past its sleep, so aborting it never splits a handoff
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Replace the pending document and restart the idle timer
    pub fn schedule(&mut self, config: SceneConfig) {
        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.config = Some(config);
            slot.generation
        };
        self.cancel_timer();

        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let shared = Arc::clone(&self.slot);
        let warnings = self.warnings.clone();
        // Deadline fixed now, not when the task is first polled
        let deadline = tokio::time::Instant::now() + self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut slot = lock(&shared);
            if slot.generation != generation {
                return;
            }
            let Some(config) = slot.config.take() else {
                return;
            };
            let previous = slot.saving.take();
            slot.saving = Some(tokio::spawn(async move {
                // Keep writes ordered
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                let result = store.save(&key, &config).await;
                if let Err(e) = &result {
                    report(&warnings, &key, e);
                }
                result
            }));
        }));
    }

    /// Wait for an in-flight write, then write the pending document now, if any
    pub async fn flush(&mut self) -> Result<(), PersistenceError> {
        let (config, saving) = {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            (slot.config.take(), slot.saving.take())
        };
        self.cancel_timer();

        let mut result = match saving {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "in-flight scene save did not complete");
                    Err(PersistenceError::Interrupted(e.to_string()))
                }
            },
            None => Ok(()),
        };
        if let Some(config) = config {
            result = self.store.save(&self.key, &config).await;
            if let Err(e) = &result {
                report(&self.warnings, &self.key, e);
            }
        }
        result
    }

    /// Teardown: cancel the timer and flush synchronously
    pub async fn shutdown(mut self) -> Result<(), PersistenceError> {
        self.flush().await
    }
}

impl<S: SceneStore> Drop for DebouncedSaver<S> {
    fn drop(&mut self) {
        self.cancel_timer();
        if self.has_pending() {
            tracing::warn!(key = %self.key, "saver dropped with an unsaved scene; call shutdown() first");
        }
    }
}

fn report(warnings: &mpsc::UnboundedSender<SaveWarning>, key: &SceneKey, error: &PersistenceError) {
    tracing::warn!(%key, %error, "scene save failed");
    let _ = warnings.send(SaveWarning { key: key.clone(), message: error.to_string() });
}
