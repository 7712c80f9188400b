use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};

/// Ordered list of plugin ids for explicit chained execution.
///
/// Independent of the active set: a queued plugin need not be active. Edits
/// are allowed while a run is in flight and take effect on the next run.
#[derive(Default)]
pub struct Queue {
    ids: Mutex<Vec<String>>,
    run_lock: Mutex<()>,
    processing: AtomicBool,
}

/// Held for the duration of one queue run.
pub(crate) struct QueueRun<'a> {
    _lock: MutexGuard<'a, ()>,
    processing: &'a AtomicBool,
}

impl Drop for QueueRun<'_> {
    fn drop(&mut self) {
        self.processing.store(false, Ordering::SeqCst);
    }
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any run in flight, then marks the queue as processing.
    pub(crate) async fn begin(&self) -> QueueRun<'_> {
        let lock = self.run_lock.lock().await;
        self.processing.store(true, Ordering::SeqCst);
        QueueRun { _lock: lock, processing: &self.processing }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub async fn ids(&self) -> Vec<String> {
        self.ids.lock().await.clone()
    }

    pub async fn set(&self, ids: Vec<String>) {
        *self.ids.lock().await = ids;
    }

    pub async fn push(&self, id: &str) {
        self.ids.lock().await.push(id.to_string());
    }

    /// Returns false if `index` is past the end.
    pub async fn insert(&self, index: usize, id: &str) -> bool {
        let mut ids = self.ids.lock().await;
        if index > ids.len() {
            return false;
        }
        ids.insert(index, id.to_string());
        true
    }

    pub async fn remove(&self, index: usize) -> Option<String> {
        let mut ids = self.ids.lock().await;
        (index < ids.len()).then(|| ids.remove(index))
    }

    /// Removes the first occurrence of `id`.
    pub async fn remove_id(&self, id: &str) -> bool {
        let mut ids = self.ids.lock().await;
        match ids.iter().position(|q| q == id) {
            Some(pos) => {
                ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub async fn move_item(&self, from: usize, to: usize) -> bool {
        let mut ids = self.ids.lock().await;
        if from >= ids.len() || to >= ids.len() {
            return false;
        }
        let id = ids.remove(from);
        ids.insert(to, id);
        true
    }

    pub async fn clear(&self) {
        self.ids.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
