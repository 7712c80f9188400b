use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::plugins::{Plugin, PluginInfo};

#[derive(Default)]
struct Catalog {
    plugins: HashMap<String, Arc<dyn Plugin>>,
    /// Registration order; an overwrite keeps the original slot
    order: Vec<String>,
}

/// In-memory catalog of the plugins available to this process.
///
/// Never persisted; build one per process (or per test) and share it via `Arc`.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Catalog>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled from a static definition list
    pub async fn with_plugins(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        let registry = Self::new();
        for p in plugins {
            registry.register(p).await;
        }
        registry
    }

    /// Insert `plugin`, replacing any earlier registration with the same id.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) {
        let id = plugin.id().to_string();
        let mut catalog = self.inner.write().await;
        if catalog.plugins.insert(id.clone(), plugin).is_some() {
            warn!(plugin = %id, "plugin registered twice; last registration wins");
        } else {
            debug!(plugin = %id, "plugin registered");
            catalog.order.push(id);
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.inner.read().await.plugins.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.plugins.contains_key(id)
    }

    /// All plugins in registration order.
    pub async fn all(&self) -> Vec<Arc<dyn Plugin>> {
        let catalog = self.inner.read().await;
        catalog
            .order
            .iter()
            .filter_map(|id| catalog.plugins.get(id).cloned())
            .collect()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }

    pub async fn describe(&self) -> Vec<PluginInfo> {
        self.all()
            .await
            .iter()
            .map(|p| PluginInfo::of(p.as_ref()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn unregister(&self, id: &str) -> bool {
        let mut catalog = self.inner.write().await;
        let removed = catalog.plugins.remove(id).is_some();
        if removed {
            catalog.order.retain(|o| o != id);
        }
        removed
    }

    pub async fn clear(&self) {
        let mut catalog = self.inner.write().await;
        catalog.plugins.clear();
        catalog.order.clear();
    }
}
